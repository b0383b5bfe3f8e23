//! Reporting interface shared by the loader, generator and supervisor
//!
//! Components never log directly. They hand [`Event`]s to an injected
//! [`Reporter`]; the binary plugs in [`TracingReporter`], tests use
//! [`RecordingReporter`] to assert on what happened.

use std::cell::RefCell;
use std::path::PathBuf;
use tracing::{debug, error, info, warn, Level};

/// Something worth telling the operator about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    DirectoryReady {
        path: PathBuf,
    },
    DirectoryFailed {
        path: PathBuf,
        error: String,
    },
    MissingInputFile {
        path: PathBuf,
    },
    SourceUnreadable {
        path: PathBuf,
        error: String,
    },
    /// A non-blank line that did not split into exactly four fields
    MalformedLine {
        line_number: usize,
        fields: usize,
        line: String,
    },
    CredentialsLoaded {
        path: PathBuf,
        count: usize,
    },
    ConfigWritten {
        path: PathBuf,
        listen_port: u16,
    },
    ConfigFailed {
        path: PathBuf,
        error: String,
    },
    PortOverflow {
        start_port: u16,
        index: usize,
    },
    NoConfigFiles {
        dir: PathBuf,
    },
    DaemonLaunched {
        config: PathBuf,
    },
    DaemonFailed {
        config: PathBuf,
        error: String,
    },
    DaemonStatus {
        pattern: String,
        running: bool,
    },
    DaemonCheckFailed {
        error: String,
    },
}

impl Event {
    /// Severity the event is logged at
    pub fn level(&self) -> Level {
        match self {
            Event::DirectoryReady { .. } => Level::DEBUG,
            Event::CredentialsLoaded { .. }
            | Event::ConfigWritten { .. }
            | Event::DaemonLaunched { .. } => Level::INFO,
            Event::DaemonStatus { running: true, .. } => Level::DEBUG,
            Event::MalformedLine { .. } | Event::NoConfigFiles { .. } => Level::WARN,
            Event::DirectoryFailed { .. }
            | Event::MissingInputFile { .. }
            | Event::SourceUnreadable { .. }
            | Event::ConfigFailed { .. }
            | Event::PortOverflow { .. }
            | Event::DaemonFailed { .. }
            | Event::DaemonStatus { running: false, .. }
            | Event::DaemonCheckFailed { .. } => Level::ERROR,
        }
    }
}

/// Sink for [`Event`]s
pub trait Reporter {
    fn report(&self, event: Event);
}

/// Forwards events to the `tracing` subscriber installed by the binary
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: Event) {
        match event {
            Event::DirectoryReady { path } => {
                debug!(path = %path.display(), "directory ready")
            }
            Event::DirectoryFailed { path, error } => {
                error!(path = %path.display(), %error, "failed to create directory")
            }
            Event::MissingInputFile { path } => {
                error!(path = %path.display(), "proxy list does not exist")
            }
            Event::SourceUnreadable { path, error } => {
                error!(path = %path.display(), %error, "failed to read proxy list")
            }
            // The raw line may carry a password, so only its shape is logged.
            Event::MalformedLine {
                line_number,
                fields,
                ..
            } => {
                warn!(line_number, fields, "malformed proxy line, expected host:port:user:pass")
            }
            Event::CredentialsLoaded { path, count } => {
                info!(path = %path.display(), count, "loaded proxy credentials")
            }
            Event::ConfigWritten { path, listen_port } => {
                info!(path = %path.display(), listen_port, "config generated")
            }
            Event::ConfigFailed { path, error } => {
                error!(path = %path.display(), %error, "failed to write config")
            }
            Event::PortOverflow { start_port, index } => {
                error!(start_port, index, "listen port out of range, credential skipped")
            }
            Event::NoConfigFiles { dir } => {
                warn!(dir = %dir.display(), "no config files found")
            }
            Event::DaemonLaunched { config } => {
                info!(config = %config.display(), "forwarder started")
            }
            Event::DaemonFailed { config, error } => {
                error!(config = %config.display(), %error, "failed to start forwarder")
            }
            Event::DaemonStatus { pattern, running } => {
                if running {
                    debug!(%pattern, "forwarding daemon is running")
                } else {
                    error!(%pattern, "forwarding daemon is not running")
                }
            }
            Event::DaemonCheckFailed { error } => {
                error!(%error, "failed to check forwarding daemon")
            }
        }
    }
}

/// Keeps every event in memory, in arrival order
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: RefCell<Vec<Event>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far
    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }
}
