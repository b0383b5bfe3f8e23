use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use proxy_provision::{
    CredentialLoader, Provisioner, Settings, SystemLauncher, TracingReporter,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Provision one HTTP forwarder per upstream SOCKS5 proxy
#[derive(Parser)]
#[command(name = "proxy-provision")]
#[command(about = "Provision one HTTP forwarder per upstream SOCKS5 proxy")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the proxy list and generated configs
    #[arg(short, long)]
    base_dir: Option<PathBuf>,

    /// First local listen port
    #[arg(short = 'p', long)]
    start_port: Option<u16>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the daemon, generate configs and start a forwarder per config
    Run,
    /// Write configs from the proxy list without starting anything
    Generate,
    /// Start a forwarder for every config already generated
    Apply,
    /// Print the parsed proxy list
    Parse,
    /// Show the configs present in the output directory
    List,
    /// Report whether the forwarding daemon is running
    Check,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let settings = load_settings(&cli)?;
    let reporter = TracingReporter;
    let launcher = SystemLauncher;
    let provisioner = Provisioner::new(settings, &reporter, &launcher);

    match cli.command {
        Some(Commands::Run) | None => {
            let summary = provisioner.run()?;
            info!(
                credentials = summary.credentials,
                written = summary.written.len(),
                started = summary.applied.started.len(),
                failed = summary.applied.failed.len(),
                "provisioning finished"
            );
        }
        Some(Commands::Generate) => {
            let written = provisioner.generate()?;
            println!("Generated {} configs", written.len());
            for path in &written {
                println!("{}", path.display());
            }
        }
        Some(Commands::Apply) => {
            let summary = provisioner.apply()?;
            println!(
                "Started {} of {} forwarders",
                summary.started.len(),
                summary.total()
            );
        }
        Some(Commands::Parse) => {
            let source = provisioner.settings().source_path();
            let credentials = CredentialLoader::load(&source, &reporter);
            println!("Parsed {} proxies from {:?}", credentials.len(), source);
            let generator = provisioner.generator();
            for config in generator.plan(&credentials, &reporter) {
                println!("{} -> {}", config.listen_port, config.credential);
            }
        }
        Some(Commands::List) => {
            let generator = provisioner.generator();
            let listed = generator
                .list()
                .with_context(|| format!("listing {:?}", generator.output_dir()))?;
            if listed.is_empty() {
                println!("No configs found.");
            }
            for entry in listed {
                match entry.parsed {
                    Some((credential, port)) => println!("{} -> {}", port, credential),
                    None => println!("?     {} (not a generated config)", entry.path.display()),
                }
            }
        }
        Some(Commands::Check) => {
            provisioner.check_daemon()?;
            println!("Forwarding daemon is running");
        }
    }

    Ok(())
}

/// Defaults, then the settings file, then command-line overrides
fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };
    if let Some(base_dir) = &cli.base_dir {
        settings = settings.with_base_dir(base_dir);
    }
    if let Some(start_port) = cli.start_port {
        settings = settings.with_start_port(start_port);
    }
    Ok(settings)
}
