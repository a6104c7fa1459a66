use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::Colorize;
use log::{debug, trace};

use crate::ports::SerialProvider;
use crate::session::Session;
use crate::{Error, Result};

/// Longest single blocking read. Cancellation is noticed within one slice.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

const SEPARATOR_WIDTH: usize = 66;

/// Cooperative stop flag for the rate cycle.
///
/// Clones share the flag, so one clone can be handed to the interrupt
/// handler (see [`catch_interrupts`](crate::catch_interrupts)) while the
/// cycle polls another.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// A token that is not cancelled yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the cycle to stop.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether [`CancelToken::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Sleep for `duration` or until cancelled, whichever is first.
    pub fn wait(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while !self.is_cancelled() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }

    pub(crate) fn shared_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

/// What one rate produced.
#[derive(Debug)]
pub struct Sample {
    /// The rate the port was opened at.
    pub baud_rate: u32,
    /// Raw bytes received during the window, up to a read failure if there
    /// was one.
    pub data: Vec<u8>,
    /// Whether the window was cut short by cancellation.
    pub interrupted: bool,
    /// The read failure that ended the window early.
    pub error: Option<Error>,
}

/// Keep printable ASCII, carriage returns and line feeds; drop the rest.
///
/// At a wrong rate most received bytes land outside that range, so the
/// filtered text stays short and the right rate stands out.
pub fn printable(data: &[u8]) -> String {
    data.iter()
        .copied()
        .filter(|&b| (0x20..=0x7e).contains(&b) || b == b'\n' || b == b'\r')
        .map(char::from)
        .collect()
}

/// Open `port` at `baud_rate` and collect bytes for `window`.
///
/// The port is closed again before this returns, whether the window ran
/// out, the token was cancelled or reading failed. A read failure ends the
/// window but keeps what arrived before it; see [`Sample::error`]. Only a
/// failed open is returned as `Err`.
pub fn probe_rate<P>(
    serial: &mut P,
    port: &str,
    baud_rate: u32,
    window: Duration,
    cancel: &CancelToken,
) -> Result<Sample>
where
    P: SerialProvider + ?Sized,
{
    let reader = serial.open(port, baud_rate, window.min(POLL_INTERVAL))?;
    let mut reader = scopeguard::guard(reader, |reader| {
        drop(reader);
        debug!("released {} after {} baud", port, baud_rate);
    });

    let deadline = Instant::now() + window;
    let mut data = Vec::new();
    let mut buf = [0u8; 1024];
    let mut interrupted = false;
    let mut error = None;

    loop {
        if cancel.is_cancelled() {
            interrupted = true;
            break;
        }
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        match reader.read(&mut buf) {
            // End of file, e.g. a hung up pseudo terminal: nothing more
            // arrives this slice.
            Ok(0) => cancel.wait(POLL_INTERVAL.min(deadline - now)),
            Ok(n) => data.extend_from_slice(&buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                trace!("read on {} interrupted", port);
            }
            Err(source) => {
                error = Some(Error::PortRead {
                    port: port.to_string(),
                    baud_rate,
                    source,
                });
                break;
            }
        }
    }

    Ok(Sample {
        baud_rate,
        data,
        interrupted,
        error,
    })
}

/// Cycle through the session's rates until `cancel` fires.
///
/// Every rate the port was opened at is appended to the session's history,
/// even when its window was cut short. Failures at a single rate are
/// reported on `out` after any text that did arrive, and the cycle moves on
/// after waiting out the window.
pub fn cycle_rates<P, W>(
    serial: &mut P,
    session: &mut Session,
    cancel: &CancelToken,
    out: &mut W,
) -> Result<()>
where
    P: SerialProvider + ?Sized,
    W: Write,
{
    writeln!(
        out,
        "{} Cycling {} on {} every {:.1}s. Press Ctrl+C once readable text appears.",
        "[*]".cyan().bold(),
        session.rates,
        session.port.path,
        session.timeout.as_secs_f64()
    )?;

    let rates = session.rates.clone();
    for baud_rate in rates.cycle() {
        if cancel.is_cancelled() {
            break;
        }
        writeln!(out, "Current baud rate: {}", baud_rate)?;
        out.flush()?;

        match probe_rate(serial, &session.port.path, baud_rate, session.timeout, cancel) {
            Ok(sample) => {
                if !sample.data.is_empty() {
                    writeln!(out, "{}", printable(&sample.data))?;
                }
                session.record(sample.baud_rate);
                if let Some(e) = sample.error {
                    writeln!(out, "{} {}", "[ERROR]".red().bold(), e)?;
                    debug!("read failed at {} baud: {:?}", baud_rate, e);
                    cancel.wait(session.timeout);
                }
            }
            Err(e) if e.is_recoverable() => {
                writeln!(out, "{} {}", "[ERROR]".red().bold(), e)?;
                debug!("skipping {} baud: {:?}", baud_rate, e);
                cancel.wait(session.timeout);
            }
            Err(e) => return Err(e),
        }

        writeln!(out, "\n{}\n", "#".repeat(SEPARATOR_WIDTH))?;
    }

    writeln!(out, "{}", "Stopped.".yellow())?;
    Ok(())
}
