//! Proxy data models

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Prefix of every generated config file name
pub const CONFIG_FILE_PREFIX: &str = "Config";

/// Extension of every generated config file
pub const CONFIG_FILE_EXTENSION: &str = "conf";

/// Address the forwarder binds on every generated config
pub const LISTEN_HOST: &str = "0.0.0.0";

/// Matches the two directives written by [`GeneratedConfig::render`]
static RENDERED_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\Aforward-socks5t / ([^:\n]*):([^\n]*)@([^@:\n]*):([^\n]*?) \. \nlisten-address 0\.0\.0\.0:(\d+)\n?\z")
        .expect("Invalid rendered config regex")
});

/// One upstream SOCKS5 proxy entry, `host:port:username:password`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyCredential {
    pub host: String,
    /// Upstream port, kept verbatim from the source line
    pub port: String,
    pub username: String,
    pub password: String,
}

impl ProxyCredential {
    pub fn new(host: String, port: String, username: String, password: String) -> Self {
        Self {
            host,
            port,
            username,
            password,
        }
    }

    /// Get the credential back in its source-line format
    pub fn to_line(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.host, self.port, self.username, self.password
        )
    }

    /// Upstream destination in `user:pass@host:port` form
    pub fn upstream(&self) -> String {
        format!(
            "{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// Masks the password so credentials are safe to print and log
impl fmt::Display for ProxyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:***@{}:{}", self.username, self.host, self.port)
    }
}

/// A forwarding config for one credential on one local listen port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedConfig {
    pub listen_port: u16,
    pub credential: ProxyCredential,
    pub path: PathBuf,
}

impl GeneratedConfig {
    /// Bind `credential` to `listen_port` under `output_dir`
    pub fn new(credential: ProxyCredential, listen_port: u16, output_dir: &Path) -> Self {
        Self {
            path: Self::path_for(output_dir, listen_port),
            listen_port,
            credential,
        }
    }

    /// `<output_dir>/Config<port>.conf`
    pub fn path_for(output_dir: &Path, listen_port: u16) -> PathBuf {
        output_dir.join(format!(
            "{}{}.{}",
            CONFIG_FILE_PREFIX, listen_port, CONFIG_FILE_EXTENSION
        ))
    }

    /// Render the two forwarding directives.
    ///
    /// The space after the `.` destination marker is part of the format.
    pub fn render(&self) -> String {
        format!(
            "forward-socks5t / {} . \nlisten-address {}:{}\n",
            self.credential.upstream(),
            LISTEN_HOST,
            self.listen_port
        )
    }

    /// Recover the credential and listen port from rendered text.
    ///
    /// Returns `None` for anything [`render`](Self::render) could not have
    /// produced. A host containing `@` cannot be told apart from a password
    /// containing `@`; the last `@` is taken as the separator.
    pub fn parse(text: &str) -> Option<(ProxyCredential, u16)> {
        let caps = RENDERED_REGEX.captures(text)?;
        let listen_port: u16 = caps[5].parse().ok()?;

        Some((
            ProxyCredential::new(
                caps[3].to_string(),
                caps[4].to_string(),
                caps[1].to_string(),
                caps[2].to_string(),
            ),
            listen_port,
        ))
    }
}
