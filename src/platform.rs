//! Collaborator contracts for the instance being provisioned.
//!
//! The classifier never talks to the platform directly. It receives
//! implementations of these traits, which lets the same routine run
//! against the live REST APIs (`instance::InstanceClient`) or an offline
//! snapshot (`snapshot::InstanceSnapshot`).
//!
//! # Contract
//!
//! - Every lookup returns an owned, immutable record or `None`. There is
//!   no cursor state shared between calls.
//! - `Err` from a lookup means the question could not be answered
//!   (transport, auth, malformed response). "No such record" is `Ok(None)`.
//! - `BatchInstaller::validate_and_batch_install` is called at most once
//!   per run, with the complete batch.

use serde::{Deserialize, Serialize};

use crate::batch::InstallationBatch;
use crate::error::Result;

/// Value of the plugin `active` field for an installed plugin
pub const PLUGIN_ACTIVE: &str = "active";

/// Row of the plugin view (`v_plugin`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub scope: String,
    /// `"active"` once installed, `"inactive"` otherwise
    #[serde(default)]
    pub active: String,
}

impl PluginRecord {
    pub fn is_active(&self) -> bool {
        self.active == PLUGIN_ACTIVE
    }
}

/// Row of the installed store app table (`sys_store_app`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledAppRecord {
    pub scope: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// Row of the remote app definition table (`sys_remote_app`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAppRecord {
    pub sys_id: String,
    pub scope: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub latest_version: String,
}

/// Read access to the three record sources consulted per identifier.
pub trait RecordSource {
    /// Plugin whose `id` equals `id`
    fn find_plugin(&self, id: &str) -> Result<Option<PluginRecord>>;

    /// Installed application whose `scope` equals `scope`
    fn find_installed_app(&self, scope: &str) -> Result<Option<InstalledAppRecord>>;

    /// Remote application definition whose `scope` equals `scope`
    fn find_remote_app(&self, scope: &str) -> Result<Option<RemoteAppRecord>>;
}

/// The platform's batch installation service.
pub trait BatchInstaller {
    /// Submit the whole batch under a human readable label.
    ///
    /// Returns the raw response body. Its structure belongs to the
    /// platform and is only ever logged.
    fn validate_and_batch_install(
        &self,
        label: &str,
        batch: &InstallationBatch,
    ) -> Result<serde_json::Value>;
}

/// Runtime system properties of the instance.
pub trait PropertyStore {
    fn get_property(&self, key: &str) -> Result<Option<String>>;
}
