use std::fmt;
use std::io::{self, Read};
use std::time::Duration;

use log::{debug, trace};
use serialport::{SerialPort, SerialPortInfo, SerialPortType};

use crate::{Error, Result};

/// A serial port as shown in the port menu.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PortDescriptor {
    /// Device path or name, e.g. `/dev/ttyUSB0` or `COM3`.
    pub path: String,
    /// Human readable description, possibly empty.
    pub description: String,
}

impl PortDescriptor {
    /// Describe a port by hand.
    pub fn new(path: impl Into<String>, description: impl Into<String>) -> Self {
        PortDescriptor {
            path: path.into(),
            description: description.into(),
        }
    }
}

impl fmt::Display for PortDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.description.is_empty() {
            write!(f, "{}", self.path)
        } else {
            write!(f, "{} ({})", self.path, self.description)
        }
    }
}

impl From<SerialPortInfo> for PortDescriptor {
    fn from(info: SerialPortInfo) -> Self {
        let description = match info.port_type {
            SerialPortType::UsbPort(usb) => {
                let mut parts = vec![format!("USB {:04x}:{:04x}", usb.vid, usb.pid)];
                parts.extend(usb.manufacturer);
                parts.extend(usb.product);
                parts.join(" ")
            }
            SerialPortType::PciPort => "PCI".to_string(),
            SerialPortType::BluetoothPort => "Bluetooth".to_string(),
            SerialPortType::Unknown => String::new(),
        };
        PortDescriptor::new(info.port_name, description)
    }
}

/// An open port, closed when dropped.
pub type PortReader = Box<dyn Read>;

/// Access to the system's serial ports.
///
/// [`SystemSerial`] is the real thing; tests substitute a provider that
/// records every open and close.
pub trait SerialProvider {
    /// Ports currently visible, in the order the system reports them.
    fn available_ports(&self) -> Result<Vec<PortDescriptor>>;

    /// Open `path` at `baud_rate`. Single reads block for at most `timeout`.
    fn open(&mut self, path: &str, baud_rate: u32, timeout: Duration) -> Result<PortReader>;
}

/// [`SerialProvider`] backed by the `serialport` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemSerial;

impl SerialProvider for SystemSerial {
    fn available_ports(&self) -> Result<Vec<PortDescriptor>> {
        let ports = serialport::available_ports().map_err(Error::Enumerate)?;
        debug!("found {} serial port(s)", ports.len());
        Ok(ports.into_iter().map(PortDescriptor::from).collect())
    }

    fn open(&mut self, path: &str, baud_rate: u32, timeout: Duration) -> Result<PortReader> {
        let port = serialport::new(path, baud_rate)
            .timeout(timeout)
            .open()
            .map_err(|source| Error::PortOpen {
                port: path.to_string(),
                baud_rate,
                source,
            })?;
        trace!("opened {} at {} baud", path, baud_rate);
        Ok(Box::new(SystemPort {
            inner: port,
            path: path.to_string(),
        }))
    }
}

struct SystemPort {
    inner: Box<dyn SerialPort>,
    path: String,
}

impl Read for SystemPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Drop for SystemPort {
    fn drop(&mut self) {
        trace!("closing {}", self.path);
    }
}
