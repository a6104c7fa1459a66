use envconfig::Envconfig;
use rstest::fixture;

/// Two serial ports wired to each other (TX to RX), e.g. two USB adapters
/// with crossed lines.
#[derive(Clone, Debug, Envconfig, Eq, PartialEq)]
pub struct HardwareConfig {
    #[envconfig(from = "BAUDPROBE_TEST_PORT_1")]
    pub port_1: String,
    #[envconfig(from = "BAUDPROBE_TEST_PORT_2")]
    pub port_2: String,
}

#[fixture]
pub fn hw_config() -> HardwareConfig {
    HardwareConfig::init_from_env().unwrap()
}
