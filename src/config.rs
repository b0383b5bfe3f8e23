//! Provisioning settings
//!
//! Defaults reproduce the stock privoxy layout. A TOML file can override
//! any field; missing fields keep their default:
//!
//! ```toml
//! base_dir = "/etc/privoxy"
//! start_port = 10325
//!
//! [daemon]
//! program = "privoxy"
//! elevate_with = "sudo"
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default base directory holding the proxy list and generated configs
const DEFAULT_BASE_DIR: &str = "/etc/privoxy";

/// Default first local listen port
const DEFAULT_START_PORT: u16 = 10325;

const DEFAULT_SOURCE_FILE: &str = "socks-proxy.txt";
const DEFAULT_OUTPUT_DIR: &str = "generated-configs";
const DEFAULT_DAEMON: &str = "privoxy";
const DEFAULT_ELEVATE: &str = "sudo";

/// How the forwarding daemon is found and started
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSettings {
    /// Daemon executable, given one config path per invocation
    pub program: String,
    /// Process name `pgrep -x` looks for to prove the daemon is up
    pub process_pattern: String,
    /// Privilege wrapper prepended to each invocation
    pub elevate_with: Option<String>,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            program: DEFAULT_DAEMON.to_string(),
            process_pattern: DEFAULT_DAEMON.to_string(),
            elevate_with: Some(DEFAULT_ELEVATE.to_string()),
        }
    }
}

impl DaemonSettings {
    /// The privilege wrapper, if one is set and non-empty
    pub fn elevation(&self) -> Option<&str> {
        self.elevate_with
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Provisioning settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_dir: PathBuf,
    pub start_port: u16,
    /// Proxy list file name, relative to `base_dir`
    pub source_file_name: String,
    /// Generated config directory name, relative to `base_dir`
    pub output_dir_name: String,
    pub daemon: DaemonSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            start_port: DEFAULT_START_PORT,
            source_file_name: DEFAULT_SOURCE_FILE.to_string(),
            output_dir_name: DEFAULT_OUTPUT_DIR.to_string(),
            daemon: DaemonSettings::default(),
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse settings from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Read settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn with_base_dir<P: Into<PathBuf>>(mut self, base_dir: P) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn with_start_port(mut self, start_port: u16) -> Self {
        self.start_port = start_port;
        self
    }

    /// `<base_dir>/socks-proxy.txt` by default
    pub fn source_path(&self) -> PathBuf {
        self.base_dir.join(&self.source_file_name)
    }

    /// `<base_dir>/generated-configs` by default
    pub fn output_dir(&self) -> PathBuf {
        self.base_dir.join(&self.output_dir_name)
    }
}
