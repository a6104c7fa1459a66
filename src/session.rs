use std::io::{BufRead, Write};
use std::time::Duration;

use colored::Colorize;
use log::{debug, info};

use crate::cycle::{cycle_rates, CancelToken};
use crate::interrupt::catch_interrupts;
use crate::launcher::{ProcessLauncher, TerminalCommand};
use crate::ports::{PortDescriptor, SerialProvider};
use crate::prompt::Prompter;
use crate::rates::RateList;
use crate::{Error, Result};

/// Listening time per rate when the user just presses Enter.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// State carried from one stage to the next.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    /// The port being probed.
    pub port: PortDescriptor,
    /// How long to listen at each rate.
    pub timeout: Duration,
    /// Candidate rates, in probing order.
    pub rates: RateList,
    /// Every rate sampled so far, in order, repeats included.
    pub tried: Vec<u32>,
}

impl Session {
    /// A session that has not tried anything yet.
    pub fn new(port: PortDescriptor, timeout: Duration, rates: RateList) -> Self {
        Session {
            port,
            timeout,
            rates,
            tried: Vec::new(),
        }
    }

    /// Note that `baud_rate` was sampled. Rates outside the candidate list
    /// are ignored.
    pub fn record(&mut self, baud_rate: u32) {
        if self.rates.contains(baud_rate) {
            self.tried.push(baud_rate);
        }
    }

    /// Tried rates without repeats, in candidate order.
    pub fn tried_rates(&self) -> Vec<u32> {
        self.rates
            .as_slice()
            .iter()
            .copied()
            .filter(|rate| self.tried.contains(rate))
            .collect()
    }
}

/// How [`run`] should behave; the command line fills this in.
#[derive(Clone, Debug, Default)]
pub struct Options {
    /// Probe this port instead of asking.
    pub port: Option<String>,
    /// Use this window instead of asking.
    pub timeout: Option<Duration>,
    /// Candidate rates.
    pub rates: RateList,
    /// Terminal to start on the chosen rate; `None` only reports the rate.
    pub terminal: Option<TerminalCommand>,
    /// Turn Ctrl+C into a cancellation while cycling.
    pub catch_interrupts: bool,
}

/// How a session ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The user chose "None" in the port menu.
    NoPortSelected,
    /// Rates were cycled but none was chosen.
    Skipped {
        /// Port that was probed.
        port: PortDescriptor,
    },
    /// A rate was chosen and only reported.
    Reported {
        /// Port that was probed.
        port: PortDescriptor,
        /// Chosen rate.
        baud_rate: u32,
    },
    /// The terminal ran on the chosen rate.
    Launched {
        /// Port that was probed.
        port: PortDescriptor,
        /// Chosen rate.
        baud_rate: u32,
    },
    /// A rate was chosen but the terminal could not be started.
    LaunchFailed {
        /// Port that was probed.
        port: PortDescriptor,
        /// Chosen rate.
        baud_rate: u32,
    },
}

impl Outcome {
    /// Whether the process should report success.
    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::LaunchFailed { .. })
    }
}

/// Run the four stages once: pick a port, cycle rates until cancelled,
/// pick a rate, start the terminal.
pub fn run<P, L, R, W>(
    options: &Options,
    serial: &mut P,
    launcher: &mut L,
    console: &mut Prompter<R, W>,
    cancel: &CancelToken,
) -> Result<Outcome>
where
    P: SerialProvider + ?Sized,
    L: ProcessLauncher + ?Sized,
    R: BufRead,
    W: Write,
{
    let port = match &options.port {
        Some(path) => PortDescriptor::new(path.as_str(), ""),
        None => {
            let ports = serial.available_ports()?;
            match console.select_port(&ports)? {
                Some(port) => port.clone(),
                None => return Ok(Outcome::NoPortSelected),
            }
        }
    };
    info!("probing {}", port);

    let timeout = match options.timeout {
        Some(timeout) => timeout,
        None => console.ask_timeout(DEFAULT_TIMEOUT)?,
    };

    let mut session = Session::new(port, timeout, options.rates.clone());
    {
        let _interrupts = if options.catch_interrupts {
            Some(catch_interrupts(cancel)?)
        } else {
            None
        };
        cycle_rates(serial, &mut session, cancel, console.output())?;
    }
    debug!("tried {:?}", session.tried);

    let baud_rate = match console.select_rate(&session)? {
        Some(baud_rate) => baud_rate,
        None => return Ok(Outcome::Skipped { port: session.port }),
    };
    let port = session.port;
    let out = console.output();
    writeln!(
        out,
        "{} {} runs at {} baud",
        "[OK]".green().bold(),
        port.path,
        baud_rate
    )?;

    let terminal = match &options.terminal {
        Some(terminal) => terminal,
        None => return Ok(Outcome::Reported { port, baud_rate }),
    };
    writeln!(out, "{} Starting {}", "[*]".cyan().bold(), terminal.program())?;
    out.flush()?;

    match terminal.launch(launcher, &port.path, baud_rate) {
        Ok(()) => Ok(Outcome::Launched { port, baud_rate }),
        Err(e @ Error::LauncherNotFound { .. }) => {
            writeln!(out, "{} {}", "[ERROR]".red().bold(), e)?;
            writeln!(
                out,
                "Open {} at {} baud with a terminal of your choice.",
                port.path, baud_rate
            )?;
            Ok(Outcome::LaunchFailed { port, baud_rate })
        }
        Err(e) => Err(e),
    }
}
