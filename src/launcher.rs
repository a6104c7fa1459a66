use std::fmt;
use std::process::Command;
use std::str::FromStr;

use log::{debug, info, warn};

use crate::{Error, Result};

const PORT_PLACEHOLDER: &str = "{port}";
const BAUD_PLACEHOLDER: &str = "{baud}";

/// Something that can start a program and hand it the terminal.
pub trait ProcessLauncher {
    /// Start `program` with `args`. Fails with [`Error::LauncherNotFound`]
    /// when the program cannot be started at all.
    fn launch(&mut self, program: &str, args: &[String]) -> Result<()>;
}

/// Starts programs with [`std::process::Command`].
///
/// The child inherits stdin, stdout and stderr and runs in the foreground
/// until it exits. Its exit status is logged, nothing else is done with it.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn launch(&mut self, program: &str, args: &[String]) -> Result<()> {
        debug!("starting {} {:?}", program, args);
        let mut child = Command::new(program)
            .args(args)
            .spawn()
            .map_err(|source| Error::LauncherNotFound {
                program: program.to_string(),
                source,
            })?;

        match child.wait() {
            Ok(status) if status.success() => info!("{} exited", program),
            Ok(status) => warn!("{} exited with {}", program, status),
            Err(e) => warn!("could not wait for {}: {}", program, e),
        }
        Ok(())
    }
}

/// Command line of the terminal program, with `{port}` and `{baud}`
/// placeholders.
///
/// Templates are split on whitespace; there is no quoting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TerminalCommand {
    program: String,
    args: Vec<String>,
}

impl TerminalCommand {
    /// Parse a template such as `"picocom -b {baud} {port}"`.
    pub fn parse(template: &str) -> Result<Self> {
        let mut words = template.split_whitespace().map(str::to_string);
        let program = words.next().ok_or(Error::EmptyTerminalCommand)?;
        Ok(TerminalCommand {
            program,
            args: words.collect(),
        })
    }

    /// The terminal usually found on this platform.
    pub fn platform_default() -> Self {
        cfg_if::cfg_if! {
            if #[cfg(windows)] {
                let (program, args) = ("putty", ["-serial", "{port}", "-sercfg", "{baud},8,n,1,N"]);
            } else {
                let (program, args) = ("picocom", ["-b", "{baud}", "{port}"]);
            }
        }
        TerminalCommand {
            program: program.to_string(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
        }
    }

    /// Program name as given in the template.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments with the placeholders filled in.
    pub fn render(&self, port: &str, baud_rate: u32) -> Vec<String> {
        let baud_rate = baud_rate.to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace(PORT_PLACEHOLDER, port)
                    .replace(BAUD_PLACEHOLDER, &baud_rate)
            })
            .collect()
    }

    /// Start the terminal on `port` at `baud_rate`.
    pub fn launch<L>(&self, launcher: &mut L, port: &str, baud_rate: u32) -> Result<()>
    where
        L: ProcessLauncher + ?Sized,
    {
        launcher.launch(&self.program, &self.render(port, baud_rate))
    }
}

impl Default for TerminalCommand {
    fn default() -> Self {
        TerminalCommand::platform_default()
    }
}

impl FromStr for TerminalCommand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TerminalCommand::parse(s)
    }
}

impl fmt::Display for TerminalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
