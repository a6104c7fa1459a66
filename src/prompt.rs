use std::io::{BufRead, Write};
use std::time::Duration;

use colored::Colorize;

use crate::ports::PortDescriptor;
use crate::session::Session;
use crate::{Error, Result};

const SKIP_WORDS: &[&str] = &["none", "skip", "q", "quit"];

/// Parse an answer to the port menu.
///
/// Entries `1..=port_count` pick a port, `port_count + 1` is the trailing
/// "None" entry and yields `Ok(None)`.
pub fn parse_selection(input: &str, port_count: usize) -> Result<Option<usize>> {
    let invalid = || Error::InvalidSelection {
        input: input.to_string(),
        max: port_count + 1,
    };
    let entry: usize = input.trim().parse().map_err(|_| invalid())?;
    match entry {
        0 => Err(invalid()),
        n if n <= port_count => Ok(Some(n - 1)),
        n if n == port_count + 1 => Ok(None),
        _ => Err(invalid()),
    }
}

/// Parse a timeout in seconds. An empty answer means `default`.
pub fn parse_timeout(input: &str, default: Duration) -> Result<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(default);
    }
    let seconds: f64 = input
        .parse()
        .map_err(|_| Error::InvalidTimeout(input.to_string()))?;
    if seconds.is_nan() || seconds <= 0.0 {
        return Err(Error::InvalidTimeout(input.to_string()));
    }
    match Duration::try_from_secs_f64(seconds) {
        // Too small to survive rounding to whole nanoseconds.
        Ok(timeout) if !timeout.is_zero() => Ok(timeout),
        _ => Err(Error::InvalidTimeout(input.to_string())),
    }
}

/// Parse the final rate. Only rates in `tried` are accepted; an empty
/// answer or one of `none`, `skip`, `q`, `quit` yields `Ok(None)`.
pub fn parse_rate(input: &str, tried: &[u32]) -> Result<Option<u32>> {
    let input = input.trim();
    if input.is_empty() || SKIP_WORDS.contains(&input.to_ascii_lowercase().as_str()) {
        return Ok(None);
    }
    match input.parse::<u32>() {
        Ok(rate) if tried.contains(&rate) => Ok(Some(rate)),
        _ => Err(Error::InvalidRate(input.to_string())),
    }
}

/// Line based questions on a console.
///
/// The binary wraps stdin and stdout; tests use in-memory buffers.
#[derive(Debug)]
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    /// Ask on `output`, read answers from `input`.
    pub fn new(input: R, output: W) -> Self {
        Prompter { input, output }
    }

    /// Where questions and reports are written.
    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }

    /// Give back the output, e.g. to inspect what was written.
    pub fn into_output(self) -> W {
        self.output
    }

    /// Ask once and return the trimmed answer.
    pub fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Err(Error::InputClosed);
        }
        Ok(line.trim().to_string())
    }

    /// Ask until `parse` accepts the answer. Recoverable parse errors are
    /// shown and the question repeated.
    fn ask_until<T, F>(&mut self, question: &str, mut parse: F) -> Result<T>
    where
        F: FnMut(&str) -> Result<T>,
    {
        loop {
            let answer = self.ask(question)?;
            match parse(&answer) {
                Ok(value) => return Ok(value),
                Err(e) if e.is_recoverable() => {
                    writeln!(self.output, "{} {}", "[ERROR]".red().bold(), e)?
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Show the numbered port menu and wait for a valid entry.
    ///
    /// `Ok(None)` means the user picked "None".
    pub fn select_port<'p>(
        &mut self,
        ports: &'p [PortDescriptor],
    ) -> Result<Option<&'p PortDescriptor>> {
        if ports.is_empty() {
            return Err(Error::NoPortsFound);
        }

        writeln!(self.output, "{}", "Available serial ports:".green().bold())?;
        for (number, port) in ports.iter().enumerate() {
            writeln!(self.output, "{}: {}", number + 1, port)?;
        }
        writeln!(self.output, "{}: None", ports.len() + 1)?;

        let question = format!("Select a serial port (1-{}): ", ports.len() + 1);
        let index = self.ask_until(&question, |answer| parse_selection(answer, ports.len()))?;
        Ok(index.map(|index| &ports[index]))
    }

    /// Ask for the per-rate listening time.
    pub fn ask_timeout(&mut self, default: Duration) -> Result<Duration> {
        let question = format!(
            "Enter timeout in seconds (default {}s): ",
            default.as_secs_f64()
        );
        self.ask_until(&question, |answer| parse_timeout(answer, default))
    }

    /// Show the tried rates and ask which one produced readable text.
    ///
    /// `Ok(None)` means the user skipped, or nothing was tried.
    pub fn select_rate(&mut self, session: &Session) -> Result<Option<u32>> {
        let tried = session.tried_rates();
        if tried.is_empty() {
            writeln!(
                self.output,
                "{}",
                "No rate was sampled, nothing to choose from.".yellow()
            )?;
            return Ok(None);
        }

        writeln!(self.output, "{}", "Rates tried:".green().bold())?;
        for rate in &tried {
            writeln!(self.output, "  {}", rate)?;
        }
        self.ask_until(
            "Enter the baud rate that produced readable text (blank to skip): ",
            |answer| parse_rate(answer, &tried),
        )
    }
}
