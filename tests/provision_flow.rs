//! End-to-end runs of the provisioning pipeline against a scratch directory.

use proxy_provision::{
    ConfigGenerator, CredentialLoader, Error, Event, GeneratedConfig, ProcessLauncher,
    ProcessOutput, Provisioner, RecordingReporter, Result, Settings,
};
use std::cell::RefCell;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Pretends the daemon is up and records every forwarder start.
///
/// Starts whose config path ends with one of `failing` exit non-zero;
/// those ending with one of `unspawnable` fail before a process exists.
#[derive(Default)]
struct FakeLauncher {
    daemon_up: bool,
    failing: Vec<String>,
    unspawnable: Vec<String>,
    started: RefCell<Vec<(String, Vec<OsString>)>>,
}

impl FakeLauncher {
    fn up() -> Self {
        Self {
            daemon_up: true,
            ..Default::default()
        }
    }

    fn started_configs(&self) -> Vec<PathBuf> {
        self.started
            .borrow()
            .iter()
            .map(|(_, args)| PathBuf::from(args.last().unwrap()))
            .collect()
    }
}

impl ProcessLauncher for FakeLauncher {
    fn launch(&self, program: &str, args: &[OsString]) -> Result<ProcessOutput> {
        if program == "pgrep" {
            let stdout = if self.daemon_up { "4242\n" } else { "" };
            return Ok(ProcessOutput {
                code: Some(if self.daemon_up { 0 } else { 1 }),
                stdout: stdout.to_string(),
                stderr: String::new(),
            });
        }

        self.started
            .borrow_mut()
            .push((program.to_string(), args.to_vec()));
        let config = args
            .last()
            .map(|a| a.to_string_lossy().into_owned())
            .unwrap_or_default();
        let matches = |names: &[String]| names.iter().any(|n| config.ends_with(n.as_str()));
        if matches(&self.unspawnable) {
            return Err(Error::Launch {
                program: program.to_string(),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            });
        }
        let fails = matches(&self.failing);
        Ok(ProcessOutput {
            code: Some(if fails { 1 } else { 0 }),
            ..Default::default()
        })
    }
}

fn scratch(proxy_list: Option<&str>) -> (TempDir, Settings) {
    let dir = TempDir::new().unwrap();
    let settings = Settings::new()
        .with_base_dir(dir.path().join("x"))
        .with_start_port(10325);
    if let Some(content) = proxy_list {
        fs::create_dir_all(&settings.base_dir).unwrap();
        fs::write(settings.source_path(), content).unwrap();
    }
    (dir, settings)
}

fn conf_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "conf"))
        .collect();
    files.sort();
    files
}

#[test]
fn test_single_proxy_end_to_end() {
    let (_dir, settings) = scratch(Some("10.0.0.1:1080:alice:secret\n"));
    let reporter = RecordingReporter::new();
    let launcher = FakeLauncher::up();
    let provisioner = Provisioner::new(settings.clone(), &reporter, &launcher);

    let summary = provisioner.run().unwrap();

    let expected = settings.base_dir.join("generated-configs/Config10325.conf");
    assert_eq!(summary.credentials, 1);
    assert_eq!(summary.written, vec![expected.clone()]);
    assert_eq!(summary.applied.started, vec![expected.clone()]);
    assert_eq!(
        fs::read_to_string(&expected).unwrap(),
        "forward-socks5t / alice:secret@10.0.0.1:1080 . \nlisten-address 0.0.0.0:10325\n"
    );

    let started = launcher.started.borrow();
    assert_eq!(started[0].0, "sudo");
    assert_eq!(
        started[0].1,
        vec![OsString::from("privoxy"), expected.into_os_string()]
    );
}

#[test]
fn test_malformed_line_is_skipped() {
    let (_dir, settings) = scratch(Some(
        "1.2.3.4:1080:user:pass\nBADLINE\n5.6.7.8:1080:u2:p2",
    ));
    let reporter = RecordingReporter::new();
    let launcher = FakeLauncher::up();
    let provisioner = Provisioner::new(settings.clone(), &reporter, &launcher);

    let summary = provisioner.run().unwrap();
    assert_eq!(summary.credentials, 2);

    let output = settings.output_dir();
    let (first, port) =
        GeneratedConfig::parse(&fs::read_to_string(output.join("Config10325.conf")).unwrap())
            .unwrap();
    assert_eq!((first.host.as_str(), port), ("1.2.3.4", 10325));
    let (second, port) =
        GeneratedConfig::parse(&fs::read_to_string(output.join("Config10326.conf")).unwrap())
            .unwrap();
    assert_eq!((second.host.as_str(), port), ("5.6.7.8", 10326));

    assert!(reporter
        .events()
        .iter()
        .any(|e| matches!(e, Event::MalformedLine { line_number: 2, .. })));
}

#[test]
fn test_generation_is_idempotent() {
    let list = "a.example:1080:u1:p1\nb.example:1081:u2:p2\nc.example:1082:u3:p3\n";
    let (_dir, settings) = scratch(Some(list));
    let reporter = RecordingReporter::new();
    let launcher = FakeLauncher::up();
    let provisioner = Provisioner::new(settings.clone(), &reporter, &launcher);

    let first = provisioner.generate().unwrap();
    let snapshot: Vec<Vec<u8>> = first.iter().map(|p| fs::read(p).unwrap()).collect();

    let second = provisioner.generate().unwrap();
    assert_eq!(first, second);
    let again: Vec<Vec<u8>> = second.iter().map(|p| fs::read(p).unwrap()).collect();
    assert_eq!(snapshot, again);
    assert!(launcher.started.borrow().is_empty());
}

#[test]
fn test_round_trip_through_files() {
    let list = "10.1.1.1:1080:alice:s3cr3t\nproxy.example.net:9050:bob:p@ss\n";
    let (_dir, settings) = scratch(Some(list));
    let reporter = RecordingReporter::new();

    let credentials = CredentialLoader::load(settings.source_path(), &reporter);
    fs::create_dir_all(settings.output_dir()).unwrap();
    let generator = ConfigGenerator::new(settings.output_dir(), 30000);
    let written = generator.generate(&credentials, &reporter);

    for (i, path) in written.iter().enumerate() {
        let (credential, port) = GeneratedConfig::parse(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(credential, credentials[i]);
        assert_eq!(port, 30000 + i as u16);
    }
}

#[test]
fn test_missing_list_generates_nothing() {
    let (_dir, settings) = scratch(None);
    let reporter = RecordingReporter::new();
    let launcher = FakeLauncher::up();
    let provisioner = Provisioner::new(settings.clone(), &reporter, &launcher);

    let err = provisioner.run().unwrap_err();
    assert!(matches!(err, Error::NoCredentials { .. }));
    assert!(conf_files(&settings.output_dir()).is_empty());
    assert!(launcher.started.borrow().is_empty());
    assert!(reporter
        .events()
        .contains(&Event::MissingInputFile {
            path: settings.source_path()
        }));
}

#[test]
fn test_empty_list_generates_nothing() {
    let (_dir, settings) = scratch(Some("\n   \n"));
    let reporter = RecordingReporter::new();
    let launcher = FakeLauncher::up();
    let provisioner = Provisioner::new(settings.clone(), &reporter, &launcher);

    assert!(matches!(
        provisioner.run(),
        Err(Error::NoCredentials { .. })
    ));
    assert!(conf_files(&settings.output_dir()).is_empty());
}

#[test]
fn test_daemon_not_running_aborts_before_work() {
    let (_dir, settings) = scratch(Some("10.0.0.1:1080:alice:secret\n"));
    let reporter = RecordingReporter::new();
    let launcher = FakeLauncher::default();
    let provisioner = Provisioner::new(settings.clone(), &reporter, &launcher);

    let err = provisioner.run().unwrap_err();
    assert!(matches!(err, Error::DaemonNotRunning { ref pattern } if pattern == "privoxy"));
    assert!(!settings.output_dir().exists());
    assert!(launcher.started.borrow().is_empty());
}

#[test]
fn test_apply_includes_stale_configs() {
    let (_dir, settings) = scratch(Some("10.0.0.1:1080:alice:secret\n"));
    fs::create_dir_all(settings.output_dir()).unwrap();
    let stale = settings.output_dir().join("Config10330.conf");
    fs::write(&stale, "forward-socks5t / old:pw@9.9.9.9:1080 . \nlisten-address 0.0.0.0:10330\n")
        .unwrap();

    let reporter = RecordingReporter::new();
    let launcher = FakeLauncher::up();
    let provisioner = Provisioner::new(settings.clone(), &reporter, &launcher);

    let summary = provisioner.run().unwrap();
    assert_eq!(summary.written.len(), 1);
    assert_eq!(summary.applied.total(), 2);
    assert_eq!(
        launcher.started_configs(),
        vec![settings.output_dir().join("Config10325.conf"), stale]
    );
}

#[test]
fn test_apply_continues_after_failure() {
    let list = "a:1:u:p\nb:2:u:p\nc:3:u:p\n";
    let (_dir, settings) = scratch(Some(list));
    let reporter = RecordingReporter::new();
    let launcher = FakeLauncher {
        daemon_up: true,
        failing: vec!["Config10326.conf".to_string()],
        ..Default::default()
    };
    let provisioner = Provisioner::new(settings.clone(), &reporter, &launcher);

    let summary = provisioner.run().unwrap();
    let output = settings.output_dir();
    assert_eq!(
        summary.applied.started,
        vec![output.join("Config10325.conf"), output.join("Config10327.conf")]
    );
    assert_eq!(summary.applied.failed, vec![output.join("Config10326.conf")]);
    assert_eq!(launcher.started.borrow().len(), 3);
}

#[test]
fn test_apply_with_no_configs_warns() {
    let (_dir, settings) = scratch(None);
    let reporter = RecordingReporter::new();
    let launcher = FakeLauncher::up();
    let provisioner = Provisioner::new(settings.clone(), &reporter, &launcher);

    let summary = provisioner.apply().unwrap();
    assert_eq!(summary.total(), 0);
    assert!(reporter.events().contains(&Event::NoConfigFiles {
        dir: settings.output_dir()
    }));
}

#[test]
fn test_apply_continues_after_spawn_failure() {
    let list = "a:1:u:p\nb:2:u:p\nc:3:u:p\n";
    let (_dir, settings) = scratch(Some(list));
    let reporter = RecordingReporter::new();
    let launcher = FakeLauncher {
        daemon_up: true,
        unspawnable: vec!["Config10325.conf".to_string()],
        ..Default::default()
    };
    let provisioner = Provisioner::new(settings.clone(), &reporter, &launcher);

    let summary = provisioner.run().unwrap();
    let output = settings.output_dir();
    assert_eq!(summary.applied.failed, vec![output.join("Config10325.conf")]);
    assert_eq!(
        summary.applied.started,
        vec![output.join("Config10326.conf"), output.join("Config10327.conf")]
    );
    assert_eq!(
        launcher.started_configs(),
        vec![
            output.join("Config10325.conf"),
            output.join("Config10326.conf"),
            output.join("Config10327.conf"),
        ]
    );
    assert!(reporter.events().iter().any(|e| matches!(
        e,
        Event::DaemonFailed { config, error }
            if *config == output.join("Config10325.conf") && error.contains("failed to launch sudo")
    )));
}
