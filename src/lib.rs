//! baudprobe finds the baud rate of a serial device nobody wrote down.
//!
//! The probe opens the chosen port at each candidate rate in turn, prints
//! whatever readable bytes arrive within a short window and moves on,
//! wrapping around until the user presses Ctrl+C. The user then names the
//! rate that produced sensible text and, optionally, a terminal program is
//! started on the port at that rate.
//!
//! The four stages are plain functions over a [`Session`]:
//!
//! 1. [`SerialProvider::available_ports`] and [`Prompter::select_port`]
//! 2. [`cycle_rates`], stopped through a [`CancelToken`]
//! 3. [`Prompter::select_rate`]
//! 4. [`TerminalCommand::launch`] through a [`ProcessLauncher`]
//!
//! [`run`] strings them together the way the `baudprobe` binary uses them.

#![deny(
    clippy::dbg_macro,
    missing_docs,
    missing_debug_implementations,
    missing_copy_implementations
)]

use std::io;

use thiserror::Error;

mod cycle;
mod interrupt;
mod launcher;
mod ports;
mod prompt;
mod rates;
mod session;

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod posix;
        use crate::posix as sys;
    } else if #[cfg(windows)] {
        mod windows;
        use crate::windows as sys;
    }
}

pub use crate::cycle::{cycle_rates, printable, probe_rate, CancelToken, Sample, POLL_INTERVAL};
pub use crate::interrupt::{catch_interrupts, InterruptGuard};
pub use crate::launcher::{ProcessLauncher, SystemLauncher, TerminalCommand};
pub use crate::ports::{PortDescriptor, PortReader, SerialProvider, SystemSerial};
pub use crate::prompt::{parse_rate, parse_selection, parse_timeout, Prompter};
pub use crate::rates::{RateList, STANDARD_BAUD_RATES};
pub use crate::session::{run, Options, Outcome, Session, DEFAULT_TIMEOUT};

/// Everything that can go wrong while probing.
///
/// Some variants only ever reach the user as a message followed by another
/// attempt: [`Error::InvalidSelection`], [`Error::InvalidTimeout`] and
/// [`Error::InvalidRate`] re-prompt, [`Error::PortOpen`] and
/// [`Error::PortRead`] cut a single rate short. [`Error::is_recoverable`] tells
/// them apart from the ones that end the session.
#[derive(Debug, Error)]
pub enum Error {
    /// The operating system reported no serial ports.
    #[error("no serial ports found")]
    NoPortsFound,

    /// Listing the serial ports failed.
    #[error("could not enumerate serial ports: {0}")]
    Enumerate(#[source] serialport::Error),

    /// A port menu answer that is not a listed entry.
    #[error("invalid selection {input:?}, enter a number between 1 and {max}")]
    InvalidSelection {
        /// What the user typed.
        input: String,
        /// Highest valid entry.
        max: usize,
    },

    /// A timeout answer that is not a positive number of seconds.
    #[error("invalid timeout {0:?}, enter a positive number of seconds")]
    InvalidTimeout(String),

    /// A rate answer that is not one of the tried rates.
    #[error("invalid baud rate {0:?}, enter one of the rates listed above")]
    InvalidRate(String),

    /// A candidate rate list that is empty or contains something other than
    /// positive integers.
    #[error("invalid rate list {0:?}, expected comma separated positive integers")]
    InvalidRateList(String),

    /// A terminal command template without a program.
    #[error("terminal command is empty")]
    EmptyTerminalCommand,

    /// The port could not be opened at one rate.
    #[error("could not open {port} at {baud_rate} baud: {source}")]
    PortOpen {
        /// Port path.
        port: String,
        /// Rate that was being tried.
        baud_rate: u32,
        /// Error reported by the serial driver.
        #[source]
        source: serialport::Error,
    },

    /// Reading from an open port failed.
    #[error("could not read {port} at {baud_rate} baud: {source}")]
    PortRead {
        /// Port path.
        port: String,
        /// Rate that was being tried.
        baud_rate: u32,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The terminal program could not be found or started.
    #[error("could not start terminal program {program:?}: {source}")]
    LauncherNotFound {
        /// Program that was looked up.
        program: String,
        /// Error from the process spawn.
        #[source]
        source: io::Error,
    },

    /// Ctrl+C is already wired to another token.
    #[error("interrupts are already being caught for another token")]
    InterruptsAlreadyCaught,

    /// Standard input ended while a question was still open.
    #[error("input closed before an answer was given")]
    InputClosed,

    /// Any other I/O failure, usually on the console.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Whether the session carries on after reporting this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::InvalidSelection { .. }
                | Error::InvalidTimeout(_)
                | Error::InvalidRate(_)
                | Error::PortOpen { .. }
                | Error::PortRead { .. }
                | Error::LauncherNotFound { .. }
        )
    }
}

/// A specialized `Result` type for probing operations.
pub type Result<T> = std::result::Result<T, Error>;
