//! Config generator: one forwarding config per credential, one port each
//!
//! The i-th credential always gets `start_port + i`. The mapping is
//! positional, so reordering the proxy list moves hosts between ports.

use crate::process::Daemon;
use crate::proxy::models::{GeneratedConfig, ProxyCredential, CONFIG_FILE_EXTENSION};
use crate::report::{Event, Reporter};
use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Mode applied to every generated file regardless of umask
#[cfg(unix)]
const CONFIG_FILE_MODE: u32 = 0o644;

/// Listen port for the credential at `index`, if it fits in a `u16`
pub fn assign_port(start_port: u16, index: usize) -> Option<u16> {
    u16::try_from(index)
        .ok()
        .and_then(|offset| start_port.checked_add(offset))
}

/// Outcome of starting forwarders for every config in the output directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub started: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

impl ApplySummary {
    pub fn total(&self) -> usize {
        self.started.len() + self.failed.len()
    }
}

/// A `*.conf` file found in the output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedConfig {
    pub path: PathBuf,
    /// Credential and listen port, when the file is one we generated
    pub parsed: Option<(ProxyCredential, u16)>,
}

/// Writes and applies forwarding configs under one output directory
#[derive(Debug, Clone)]
pub struct ConfigGenerator {
    output_dir: PathBuf,
    start_port: u16,
}

impl ConfigGenerator {
    pub fn new<P: Into<PathBuf>>(output_dir: P, start_port: u16) -> Self {
        Self {
            output_dir: output_dir.into(),
            start_port,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Pair each credential with its listen port.
    ///
    /// Credentials past the last representable port are reported and
    /// dropped.
    pub fn plan(
        &self,
        credentials: &[ProxyCredential],
        reporter: &dyn Reporter,
    ) -> Vec<GeneratedConfig> {
        let mut planned = Vec::with_capacity(credentials.len());
        for (index, credential) in credentials.iter().enumerate() {
            match assign_port(self.start_port, index) {
                Some(listen_port) => planned.push(GeneratedConfig::new(
                    credential.clone(),
                    listen_port,
                    &self.output_dir,
                )),
                None => reporter.report(Event::PortOverflow {
                    start_port: self.start_port,
                    index,
                }),
            }
        }
        planned
    }

    /// Write one config file per credential and return the paths written.
    ///
    /// Existing files are overwritten. A file that cannot be written is
    /// reported and skipped; the rest are still attempted.
    pub fn generate(
        &self,
        credentials: &[ProxyCredential],
        reporter: &dyn Reporter,
    ) -> Vec<PathBuf> {
        let mut written = Vec::new();
        for config in self.plan(credentials, reporter) {
            match Self::write(&config) {
                Ok(()) => {
                    reporter.report(Event::ConfigWritten {
                        path: config.path.clone(),
                        listen_port: config.listen_port,
                    });
                    written.push(config.path);
                }
                Err(e) => reporter.report(Event::ConfigFailed {
                    path: config.path,
                    error: e.to_string(),
                }),
            }
        }
        written
    }

    /// Render `config` to disk and make it world-readable
    pub fn write(config: &GeneratedConfig) -> Result<()> {
        let to_error = |source| Error::ConfigWrite {
            path: config.path.clone(),
            source,
        };

        fs::write(&config.path, config.render()).map_err(to_error)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&config.path, fs::Permissions::from_mode(CONFIG_FILE_MODE))
                .map_err(to_error)?;
        }

        Ok(())
    }

    /// Every `*.conf` file in the output directory, sorted by path.
    ///
    /// This includes files left by earlier runs, not just the ones the
    /// last [`generate`](Self::generate) wrote.
    pub fn config_files(&self) -> Result<Vec<PathBuf>> {
        let to_error = |source| Error::OutputDir {
            path: self.output_dir.clone(),
            source,
        };

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.output_dir).map_err(to_error)? {
            let path = entry.map_err(to_error)?.path();
            let is_conf = path
                .extension()
                .is_some_and(|ext| ext == CONFIG_FILE_EXTENSION);
            if is_conf && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Start one forwarder per config file in the output directory.
    ///
    /// Each file is attempted independently; failures are reported and
    /// collected in the summary.
    pub fn apply(&self, daemon: &Daemon<'_>, reporter: &dyn Reporter) -> Result<ApplySummary> {
        let files = self.config_files()?;
        let mut summary = ApplySummary::default();

        if files.is_empty() {
            reporter.report(Event::NoConfigFiles {
                dir: self.output_dir.clone(),
            });
            return Ok(summary);
        }

        for file in files {
            if daemon.start(&file, reporter) {
                summary.started.push(file);
            } else {
                summary.failed.push(file);
            }
        }
        Ok(summary)
    }

    /// Describe every config file in the output directory
    pub fn list(&self) -> Result<Vec<ListedConfig>> {
        let mut listed = Vec::new();
        for path in self.config_files()? {
            // Unreadable files are listed as foreign rather than failing the listing.
            let parsed = fs::read_to_string(&path)
                .ok()
                .and_then(|text| GeneratedConfig::parse(&text));
            listed.push(ListedConfig { path, parsed });
        }
        Ok(listed)
    }
}
