//! pdi-setup - Main entry point

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use pdi_setup::catalog::DEFAULT_CATALOG;
use pdi_setup::cli::{Cli, Commands};
use pdi_setup::config_file::CliOverrides;
use pdi_setup::{
    InstanceClient, InstanceSnapshot, Provisioner, RunReport, SetupConfig, TracingNotifier,
};

/// Initialize the logger with appropriate settings
fn init_logger() {
    // RUST_LOG overrides the default level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Install command arguments that do not live in the configuration file
struct InstallArgs {
    config: Option<PathBuf>,
    snapshot: Option<PathBuf>,
    overrides: CliOverrides,
}

fn main() -> Result<()> {
    init_logger();

    let cli = Cli::parse_args();
    debug!("CLI arguments parsed");

    match cli.command {
        Commands::Validate { config } => {
            info!("Validating configuration file: {:?}", config);
            let config = SetupConfig::load_from_file(&config)?;
            config.validate()?;
            info!(
                "Configuration is valid: {} identifiers for {}",
                config.identifiers_or_default().len(),
                if config.instance_name.is_empty() {
                    "<unset instance>"
                } else {
                    config.instance_name.as_str()
                }
            );
        }
        Commands::Init { path, instance } => {
            if path.exists() {
                anyhow::bail!("Refusing to overwrite existing file {:?}", path);
            }
            SetupConfig::template(instance.as_deref()).save_to_file(&path)?;
            info!("Wrote starter configuration to {:?}", path);
        }
        Commands::Catalog => {
            for entry in DEFAULT_CATALOG {
                if entry.description.is_empty() {
                    println!("{:<34} {}", entry.id, entry.name);
                } else {
                    println!("{:<34} {} - {}", entry.id, entry.name, entry.description);
                }
            }
        }
        Commands::Install {
            config,
            snapshot,
            instance,
            user,
            password,
            demo_data,
            label,
            identifiers,
        } => {
            let args = InstallArgs {
                config,
                snapshot,
                overrides: CliOverrides {
                    instance,
                    user,
                    password,
                    label,
                    identifiers,
                    dry_run: cli.dry_run,
                    demo_data,
                },
            };
            let report = run_install(args)?;
            debug!(
                queued = report.queued(),
                submitted = report.was_submitted(),
                "run finished"
            );
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<SetupConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from: {:?}", path);
            SetupConfig::load_from_file(path)
        }
        None => Ok(SetupConfig::default()),
    }
}

fn run_install(args: InstallArgs) -> Result<RunReport> {
    let mut config = load_config(args.config.as_deref())?;

    config.apply_overrides(args.overrides);
    config.validate()?;

    let identifiers = config.identifiers_or_default();
    let options = config.run_options();
    let notifier = TracingNotifier;

    if options.dry_run {
        info!("Dry run: nothing will be submitted");
    }

    let report = match args.snapshot {
        Some(path) => {
            let snapshot = InstanceSnapshot::load_from_file(&path)?;
            info!("Answering lookups from snapshot {:?}", path);
            Provisioner::new(&snapshot, &snapshot, &snapshot, &notifier)
                .install_plugins_and_applications(identifiers.as_slice(), &options)
        }
        None => {
            let client = InstanceClient::new(config.connection_settings()?)
                .context("Failed to create instance client")?;
            info!("Using instance {}", client.base_url());
            Provisioner::new(&client, &client, &client, &notifier)
                .install_plugins_and_applications(identifiers.as_slice(), &options)
        }
    };

    report.inspect_err(|e| error!("Installation run aborted: {}", e)).map_err(Into::into)
}
