//! Provisioning pipeline: check daemon, init directories, load, generate, apply

use crate::config::Settings;
use crate::process::{Daemon, ProcessLauncher};
use crate::proxy::{ApplySummary, ConfigGenerator, CredentialLoader, ProxyCredential};
use crate::report::{Event, Reporter};
use crate::{Error, Result};
use std::fs;
use std::path::PathBuf;

/// What a full run produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub credentials: usize,
    pub written: Vec<PathBuf>,
    pub applied: ApplySummary,
}

/// Drives the pipeline against one [`Settings`]
pub struct Provisioner<'a> {
    settings: Settings,
    reporter: &'a dyn Reporter,
    launcher: &'a dyn ProcessLauncher,
}

impl<'a> Provisioner<'a> {
    pub fn new(
        settings: Settings,
        reporter: &'a dyn Reporter,
        launcher: &'a dyn ProcessLauncher,
    ) -> Self {
        Self {
            settings,
            reporter,
            launcher,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn generator(&self) -> ConfigGenerator {
        ConfigGenerator::new(self.settings.output_dir(), self.settings.start_port)
    }

    pub fn daemon(&self) -> Daemon<'a> {
        Daemon::new(self.settings.daemon.clone(), self.launcher)
    }

    /// Create the base and output directories.
    ///
    /// Must succeed before anything is loaded or written.
    pub fn init(&self) -> Result<()> {
        for path in [self.settings.base_dir.clone(), self.settings.output_dir()] {
            if let Err(source) = fs::create_dir_all(&path) {
                self.reporter.report(Event::DirectoryFailed {
                    path: path.clone(),
                    error: source.to_string(),
                });
                return Err(Error::DirectoryCreation { path, source });
            }
            self.reporter.report(Event::DirectoryReady { path });
        }
        Ok(())
    }

    /// Fail unless the forwarding daemon is already running
    pub fn check_daemon(&self) -> Result<()> {
        if self.daemon().is_running(self.reporter) {
            Ok(())
        } else {
            Err(Error::DaemonNotRunning {
                pattern: self.settings.daemon.process_pattern.clone(),
            })
        }
    }

    /// Load the proxy list; an empty result is an error
    pub fn load(&self) -> Result<Vec<ProxyCredential>> {
        let path = self.settings.source_path();
        let credentials = CredentialLoader::load(&path, self.reporter);
        if credentials.is_empty() {
            return Err(Error::NoCredentials { path });
        }
        Ok(credentials)
    }

    /// Init, load and write configs without touching the daemon
    pub fn generate(&self) -> Result<Vec<PathBuf>> {
        self.init()?;
        let credentials = self.load()?;
        Ok(self.generator().generate(&credentials, self.reporter))
    }

    /// Start a forwarder for every config already in the output directory
    pub fn apply(&self) -> Result<ApplySummary> {
        self.check_daemon()?;
        self.init()?;
        self.generator().apply(&self.daemon(), self.reporter)
    }

    /// Full run: check, init, load, generate, apply
    pub fn run(&self) -> Result<RunSummary> {
        self.check_daemon()?;
        self.init()?;

        let credentials = self.load()?;
        let generator = self.generator();
        let written = generator.generate(&credentials, self.reporter);
        let applied = generator.apply(&self.daemon(), self.reporter)?;

        Ok(RunSummary {
            credentials: credentials.len(),
            written,
            applied,
        })
    }
}
