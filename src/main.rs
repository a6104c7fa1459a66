use std::io;
use std::process::ExitCode;
use std::time::Duration;

use baudprobe::{
    parse_timeout, CancelToken, Options, Outcome, Prompter, RateList, SerialProvider,
    SystemLauncher, SystemSerial, TerminalCommand, DEFAULT_TIMEOUT,
};
use clap::Parser;
use colored::Colorize;
use log::LevelFilter;

/// Find the baud rate of a serial device by cycling through standard rates.
///
/// Readable text shows up once the right rate is hit. Press Ctrl+C at that
/// point, enter the rate and a terminal is opened on the port.
#[derive(Debug, Parser)]
#[clap(name = "baudprobe", version)]
struct Args {
    /// Serial port to probe; a menu is shown when omitted
    #[clap(short, long)]
    port: Option<String>,

    /// Seconds to listen at each rate; asked for when omitted
    #[clap(short, long)]
    timeout: Option<String>,

    /// Comma separated candidate rates
    #[clap(short, long, default_value_t = RateList::standard())]
    rates: RateList,

    /// Terminal command, {port} and {baud} are filled in
    #[clap(long, default_value_t = TerminalCommand::platform_default())]
    terminal: TerminalCommand,

    /// Only report the chosen rate, do not start a terminal
    #[clap(long)]
    no_terminal: bool,

    /// List serial ports and exit
    #[clap(short, long)]
    list: bool,

    /// More log output, repeat for more
    #[clap(short, long, parse(from_occurrences))]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn list_ports() -> baudprobe::Result<()> {
    let ports = SystemSerial.available_ports()?;
    if ports.is_empty() {
        return Err(baudprobe::Error::NoPortsFound);
    }
    println!("{}", "Available serial ports:".green().bold());
    for port in ports {
        println!("  {}", port);
    }
    Ok(())
}

fn run(args: Args) -> baudprobe::Result<ExitCode> {
    if args.list {
        list_ports()?;
        return Ok(ExitCode::SUCCESS);
    }

    let timeout: Option<Duration> = args
        .timeout
        .as_deref()
        .map(|timeout| parse_timeout(timeout, DEFAULT_TIMEOUT))
        .transpose()?;
    let options = Options {
        port: args.port,
        timeout,
        rates: args.rates,
        terminal: (!args.no_terminal).then(|| args.terminal),
        catch_interrupts: true,
    };

    let stdin = io::stdin();
    let mut console = Prompter::new(stdin.lock(), io::stdout());
    let outcome = baudprobe::run(
        &options,
        &mut SystemSerial,
        &mut SystemLauncher,
        &mut console,
        &CancelToken::new(),
    )?;

    match &outcome {
        Outcome::NoPortSelected => println!("No port selected."),
        Outcome::Skipped { port } => println!("No rate chosen for {}.", port.path),
        Outcome::Reported { .. } | Outcome::Launched { .. } | Outcome::LaunchFailed { .. } => {}
    }

    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", "[ERROR]".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
