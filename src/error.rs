//! Error types

use std::path::PathBuf;

/// Errors that abort a provisioning run
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A base or output directory could not be created
    #[error("failed to create directory {}: {source}", .path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source file was missing, unreadable or held no valid lines
    #[error("no usable proxy credentials in {}", .path.display())]
    NoCredentials { path: PathBuf },

    /// The forwarding daemon was not running when the run started
    #[error("forwarding daemon matching '{pattern}' is not running")]
    DaemonNotRunning { pattern: String },

    /// A config file could not be written or made world-readable
    #[error("failed to write config {}: {source}", .path.display())]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The generated config directory could not be listed
    #[error("failed to list config directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A settings file could not be read
    #[error("failed to read settings {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A settings file was not valid TOML for [`crate::Settings`]
    #[error("failed to parse settings: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// An external program could not be spawned
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// start_port + index does not fit in a TCP port
    #[error("listen port for credential #{index} overflows (start port {start_port})")]
    PortOverflow { start_port: u16, index: usize },
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
