use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// pdi-setup - Bulk install plugins and store apps on a developer instance
#[derive(Parser)]
#[command(name = "pdi-setup")]
#[command(about = "Queue plugins and store applications for one batch installation")]
#[command(version)]
pub struct Cli {
    /// Dry-run mode: classify and log what would be installed, submit nothing.
    ///
    /// Lookups against the instance still run so the preview is realistic.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify identifiers and submit the batch install
    Install {
        /// Path to a JSON run configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Answer lookups from an offline snapshot instead of the instance
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Instance name (dev12345 for dev12345.service-now.com)
        #[arg(short, long)]
        instance: Option<String>,

        /// User to authenticate as
        #[arg(short, long)]
        user: Option<String>,

        /// Password of that user
        #[arg(long, env = "PDI_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Install bundled demo data
        #[arg(long)]
        demo_data: bool,

        /// Label of the batch install plan
        #[arg(long)]
        label: Option<String>,

        /// Plugin ids or application scopes (defaults to the built-in catalog)
        identifiers: Vec<String>,
    },
    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        config: PathBuf,
    },
    /// Write a starter configuration file listing the default catalog
    Init {
        /// Where to write the configuration
        path: PathBuf,

        /// Instance name to put in the file
        #[arg(short, long)]
        instance: Option<String>,
    },
    /// List the default catalog of identifiers
    Catalog,
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_requires_command() {
        assert!(Cli::try_parse_from(["pdi-setup"]).is_err());
    }

    #[test]
    fn test_cli_install_with_identifiers() {
        let result = Cli::try_parse_from([
            "pdi-setup",
            "--dry-run",
            "install",
            "--instance",
            "dev12345",
            "--demo-data",
            "sn_sgc_central",
            "com.snc.itom.discovery.license",
        ]);
        assert!(result.is_ok());
        let cli = result.unwrap();
        assert!(cli.dry_run);
        match cli.command {
            Commands::Install {
                instance,
                demo_data,
                identifiers,
                config,
                ..
            } => {
                assert_eq!(instance.as_deref(), Some("dev12345"));
                assert!(demo_data);
                assert!(config.is_none());
                assert_eq!(
                    identifiers,
                    vec!["sn_sgc_central", "com.snc.itom.discovery.license"]
                );
            }
            _ => panic!("Expected Install command"),
        }
    }

    #[test]
    fn test_cli_dry_run_after_subcommand() {
        let cli = Cli::try_parse_from(["pdi-setup", "install", "--dry-run"]).unwrap();
        assert!(cli.dry_run);
    }

    #[test]
    fn test_cli_install_with_config() {
        let cli = Cli::try_parse_from([
            "pdi-setup",
            "install",
            "--config",
            "/path/to/pdi.json",
        ])
        .unwrap();
        match cli.command {
            Commands::Install { config, .. } => {
                assert_eq!(config.unwrap().to_str().unwrap(), "/path/to/pdi.json");
            }
            _ => panic!("Expected Install command"),
        }
    }

    #[test]
    fn test_cli_validate_command() {
        let cli = Cli::try_parse_from(["pdi-setup", "validate", "/path/to/pdi.json"]).unwrap();
        match cli.command {
            Commands::Validate { config } => {
                assert_eq!(config.to_str().unwrap(), "/path/to/pdi.json");
            }
            _ => panic!("Expected Validate command"),
        }
    }

    #[test]
    fn test_cli_catalog_command() {
        let cli = Cli::try_parse_from(["pdi-setup", "catalog"]).unwrap();
        assert!(matches!(cli.command, Commands::Catalog));
    }
}
