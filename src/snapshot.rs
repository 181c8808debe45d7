//! Offline instance snapshot.
//!
//! A JSON export of the three record sources plus system properties.
//! `InstanceSnapshot` answers lookups from memory and records submissions
//! instead of sending them, so a plan can be previewed without network
//! access to the instance.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::batch::InstallationBatch;
use crate::error;
use crate::platform::{
    BatchInstaller, InstalledAppRecord, PluginRecord, PropertyStore, RecordSource,
    RemoteAppRecord,
};

/// One batch accepted by the snapshot installer
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSubmission {
    pub label: String,
    pub batch: InstallationBatch,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct InstanceSnapshot {
    #[serde(default)]
    pub plugins: Vec<PluginRecord>,
    #[serde(default)]
    pub installed_apps: Vec<InstalledAppRecord>,
    #[serde(default)]
    pub remote_apps: Vec<RemoteAppRecord>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(skip)]
    submissions: RefCell<Vec<RecordedSubmission>>,
}

impl InstanceSnapshot {
    /// Load a snapshot from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read snapshot from {:?}", path.as_ref()))?;

        let snapshot: Self =
            serde_json::from_str(&content).context("Failed to parse snapshot JSON")?;

        tracing::debug!(
            plugins = snapshot.plugins.len(),
            installed_apps = snapshot.installed_apps.len(),
            remote_apps = snapshot.remote_apps.len(),
            "snapshot loaded"
        );
        Ok(snapshot)
    }

    /// Batches submitted so far, oldest first
    pub fn submissions(&self) -> Vec<RecordedSubmission> {
        self.submissions.borrow().clone()
    }
}

impl RecordSource for InstanceSnapshot {
    fn find_plugin(&self, id: &str) -> error::Result<Option<PluginRecord>> {
        Ok(self.plugins.iter().find(|p| p.id == id).cloned())
    }

    fn find_installed_app(&self, scope: &str) -> error::Result<Option<InstalledAppRecord>> {
        Ok(self.installed_apps.iter().find(|a| a.scope == scope).cloned())
    }

    fn find_remote_app(&self, scope: &str) -> error::Result<Option<RemoteAppRecord>> {
        Ok(self.remote_apps.iter().find(|a| a.scope == scope).cloned())
    }
}

impl BatchInstaller for InstanceSnapshot {
    fn validate_and_batch_install(
        &self,
        label: &str,
        batch: &InstallationBatch,
    ) -> error::Result<serde_json::Value> {
        self.submissions.borrow_mut().push(RecordedSubmission {
            label: label.to_string(),
            batch: batch.clone(),
        });

        Ok(serde_json::json!({
            "result": {
                "status": "0",
                "status_label": "Pending",
                "status_message": format!("Recorded offline: {}", label),
                "packages": batch.len(),
            }
        }))
    }
}

impl PropertyStore for InstanceSnapshot {
    fn get_property(&self, key: &str) -> error::Result<Option<String>> {
        Ok(self.properties.get(key).cloned())
    }
}
