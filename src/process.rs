//! External process boundary: the forwarding daemon and the process table
//!
//! Everything that spawns a program goes through [`ProcessLauncher`] so the
//! pipeline can be driven without starting privileged processes.

use crate::config::DaemonSettings;
use crate::report::{Event, Reporter};
use crate::{Error, Result};
use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

/// Program used to look for the daemon in the process table
const PGREP: &str = "pgrep";

/// What a finished process left behind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` if the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs a program to completion
pub trait ProcessLauncher {
    /// Run `program` with `args`, blocking until it exits
    fn launch(&self, program: &str, args: &[OsString]) -> Result<ProcessOutput>;
}

/// Launcher backed by [`std::process::Command`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn launch(&self, program: &str, args: &[OsString]) -> Result<ProcessOutput> {
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|source| Error::Launch {
                program: program.to_string(),
                source,
            })?;

        Ok(ProcessOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// The externally managed forwarding daemon
pub struct Daemon<'a> {
    settings: DaemonSettings,
    launcher: &'a dyn ProcessLauncher,
}

impl<'a> Daemon<'a> {
    pub fn new(settings: DaemonSettings, launcher: &'a dyn ProcessLauncher) -> Self {
        Self { settings, launcher }
    }

    /// Whether a process named exactly like the configured pattern exists.
    ///
    /// Only the process name is matched, so command lines that merely
    /// mention the daemon (this tool run with `--base-dir /etc/privoxy`,
    /// its `sudo` parent) do not count. A failure to run the check counts
    /// as "not running".
    pub fn is_running(&self, reporter: &dyn Reporter) -> bool {
        let args = [
            OsString::from("-x"),
            OsString::from(&self.settings.process_pattern),
        ];

        let running = match self.launcher.launch(PGREP, &args) {
            Ok(output) => !output.stdout.trim().is_empty(),
            Err(e) => {
                reporter.report(Event::DaemonCheckFailed {
                    error: e.to_string(),
                });
                false
            }
        };

        reporter.report(Event::DaemonStatus {
            pattern: self.settings.process_pattern.clone(),
            running,
        });
        running
    }

    /// Program and arguments that start one forwarder on `config`
    pub fn command_for(&self, config: &Path) -> (String, Vec<OsString>) {
        let mut args = Vec::new();
        match self.settings.elevation() {
            Some(elevate) => {
                args.push(OsString::from(&self.settings.program));
                args.push(config.as_os_str().to_owned());
                (elevate.to_string(), args)
            }
            None => {
                args.push(config.as_os_str().to_owned());
                (self.settings.program.clone(), args)
            }
        }
    }

    /// Start one forwarder with `config` as its only configuration.
    ///
    /// Returns `false` after reporting if it could not be spawned or exited
    /// non-zero.
    pub fn start(&self, config: &Path, reporter: &dyn Reporter) -> bool {
        let (program, args) = self.command_for(config);

        let error = match self.launcher.launch(&program, &args) {
            Ok(output) if output.success() => {
                reporter.report(Event::DaemonLaunched {
                    config: config.to_path_buf(),
                });
                return true;
            }
            Ok(output) => {
                let status = match output.code {
                    Some(code) => format!("exit status {}", code),
                    None => "terminated by signal".to_string(),
                };
                match output.stderr.trim() {
                    "" => status,
                    stderr => format!("{}: {}", status, stderr),
                }
            }
            Err(e) => e.to_string(),
        };

        reporter.report(Event::DaemonFailed {
            config: config.to_path_buf(),
            error,
        });
        false
    }
}
