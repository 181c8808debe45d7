//! Configuration file handling for saving and loading run configs.
//!
//! A run configuration names the instance, the credentials and the
//! identifiers to install. Command line flags override anything read
//! from the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::catalog::default_identifiers;
use crate::classifier::{RunOptions, DEFAULT_BATCH_LABEL};
use crate::instance::ConnectionSettings;

fn default_username() -> String {
    "admin".to_string()
}

fn default_batch_label() -> String {
    DEFAULT_BATCH_LABEL.to_string()
}

/// Values given on the command line, layered over a loaded configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub instance: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub label: Option<String>,
    /// Replaces the configured list when non-empty
    pub identifiers: Vec<String>,
    pub dry_run: bool,
    pub demo_data: bool,
}

/// Run configuration that can be saved/loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupConfig {
    /// Host prefix, `dev12345` for `dev12345.service-now.com`
    #[serde(default)]
    pub instance_name: String,
    /// Full URL, overrides the one derived from `instance_name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_username")]
    pub username: String,
    /// Prefer `PDI_PASSWORD` over storing it here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Plugin ids or app scopes; the default catalog when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifiers: Option<Vec<String>>,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub load_demo_data: bool,
    #[serde(default = "default_batch_label")]
    pub batch_label: String,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            instance_name: String::new(),
            base_url: None,
            username: default_username(),
            password: None,
            identifiers: None,
            dry_run: false,
            load_demo_data: false,
            batch_label: default_batch_label(),
        }
    }
}

impl SetupConfig {
    /// Starter configuration listing the default catalog
    pub fn template(instance_name: Option<&str>) -> Self {
        Self {
            instance_name: instance_name.unwrap_or("dev00000").to_string(),
            identifiers: Some(default_identifiers()),
            dry_run: true,
            ..Self::default()
        }
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Instance name is a DNS label: letters, digits, hyphens
        let instance = self.instance_name.trim();
        if !instance.is_empty() {
            if instance.len() > 63 {
                anyhow::bail!("Instance name must be at most 63 characters long");
            }
            if !instance
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
            {
                anyhow::bail!("Instance name can only contain letters, numbers, and hyphens");
            }
            if instance.starts_with('-') || instance.ends_with('-') {
                anyhow::bail!("Instance name cannot start or end with a hyphen");
            }
        }

        if let Some(url) = &self.base_url {
            let url = url.trim();
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("Base URL must start with http:// or https://");
            }
        }

        if self.username.trim().is_empty() {
            anyhow::bail!("Username must be specified");
        }

        if let Some(ids) = &self.identifiers {
            if ids.is_empty() {
                anyhow::bail!("Identifier list is empty; remove it to use the default catalog");
            }
            if let Some(pos) = ids.iter().position(|id| id.trim().is_empty()) {
                anyhow::bail!("Identifier at position {} is blank", pos);
            }
        }

        if self.batch_label.trim().is_empty() {
            anyhow::bail!("Batch label must not be blank");
        }

        Ok(())
    }

    /// Apply command line values; flags can switch dry run and demo data on, never off
    pub fn apply_overrides(&mut self, overrides: CliOverrides) {
        if let Some(instance) = overrides.instance {
            self.instance_name = instance;
        }
        if let Some(user) = overrides.user {
            self.username = user;
        }
        if overrides.password.is_some() {
            self.password = overrides.password;
        }
        if let Some(label) = overrides.label {
            self.batch_label = label;
        }
        if !overrides.identifiers.is_empty() {
            self.identifiers = Some(overrides.identifiers);
        }
        self.dry_run |= overrides.dry_run;
        self.load_demo_data |= overrides.demo_data;
    }

    /// Identifiers to run with, falling back to the default catalog
    pub fn identifiers_or_default(&self) -> Vec<String> {
        self.identifiers.clone().unwrap_or_else(default_identifiers)
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            dry_run: self.dry_run,
            load_demo_data: self.load_demo_data,
            batch_label: self.batch_label.clone(),
        }
    }

    /// Settings for a live connection; fails when the instance or password is unknown
    pub fn connection_settings(&self) -> Result<ConnectionSettings> {
        if self.instance_name.trim().is_empty() && self.base_url.is_none() {
            anyhow::bail!("Instance name must be specified (--instance or \"instance_name\")");
        }

        let password = self
            .password
            .clone()
            .filter(|p| !p.is_empty())
            .context("Password must be specified (PDI_PASSWORD or \"password\")")?;

        Ok(ConnectionSettings {
            instance_name: self.instance_name.trim().to_string(),
            base_url: self.base_url.as_ref().map(|u| u.trim().to_string()),
            username: self.username.trim().to_string(),
            password,
        })
    }
}
