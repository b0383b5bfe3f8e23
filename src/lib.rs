//! Proxy Provision - SOCKS5 to HTTP forwarder provisioning
//!
//! Reads a list of upstream SOCKS5 credentials, writes one forwarding
//! config per proxy on a sequential local port, and starts the forwarding
//! daemon once per config.

pub mod config;
pub mod error;
pub mod process;
pub mod provision;
pub mod proxy;
pub mod report;

pub use config::{DaemonSettings, Settings};
pub use error::{Error, Result};
pub use process::{Daemon, ProcessLauncher, ProcessOutput, SystemLauncher};
pub use provision::{Provisioner, RunSummary};
pub use proxy::*;
pub use report::{Event, RecordingReporter, Reporter, TracingReporter};
