//! Installation candidates and the batch handed to the installer.
//!
//! Candidates serialise to the exact field layout the platform's batch
//! installer expects (`isPlugin`, `isStoreApp`, `versionObj`, ...), so a
//! batch can be logged or submitted without any further translation.

use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;
use strum::{Display, EnumString};

/// Which kind of unit a candidate installs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum CandidateKind {
    #[strum(serialize = "plugin")]
    Plugin,
    #[strum(serialize = "store-app")]
    StoreApp,
}

impl CandidateKind {
    /// Package type name used by the CI/CD batch install API
    pub fn api_type(&self) -> &'static str {
        match self {
            Self::Plugin => "plugin",
            Self::StoreApp => "application",
        }
    }
}

/// A plugin that exists on the instance but is not active yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginCandidate {
    pub plugin_id: String,
    pub scope: String,
    pub app_name: String,
    pub load_demo_data: bool,
}

/// A store application available for remote installation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreAppCandidate {
    /// Unique id of the remote app definition record
    pub sys_id: String,
    pub app_name: String,
    pub load_demo_data: bool,
    /// Scope exactly as requested by the caller
    pub app_scope: String,
    pub version: String,
}

/// One item queued for installation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallationCandidate {
    Plugin(PluginCandidate),
    StoreApp(StoreAppCandidate),
}

impl InstallationCandidate {
    /// Batch key: plugin id for plugins, record sys_id for store apps
    pub fn key(&self) -> &str {
        match self {
            Self::Plugin(p) => &p.plugin_id,
            Self::StoreApp(a) => &a.sys_id,
        }
    }

    pub fn kind(&self) -> CandidateKind {
        match self {
            Self::Plugin(_) => CandidateKind::Plugin,
            Self::StoreApp(_) => CandidateKind::StoreApp,
        }
    }

    pub fn app_name(&self) -> &str {
        match self {
            Self::Plugin(p) => &p.app_name,
            Self::StoreApp(a) => &a.app_name,
        }
    }

    pub fn load_demo_data(&self) -> bool {
        match self {
            Self::Plugin(p) => p.load_demo_data,
            Self::StoreApp(a) => a.load_demo_data,
        }
    }

    /// Identifier to hand to the installer: plugin id or remote sys_id
    pub fn package_id(&self) -> &str {
        self.key()
    }

    /// Version pinned for the install, plugins carry none
    pub fn requested_version(&self) -> Option<&str> {
        match self {
            Self::Plugin(_) => None,
            Self::StoreApp(a) => Some(&a.version),
        }
    }
}

#[derive(Serialize)]
struct VersionObj<'a> {
    version: &'a str,
}

impl Serialize for InstallationCandidate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Plugin(p) => {
                let mut s = serializer.serialize_struct("PluginCandidate", 5)?;
                s.serialize_field("plugin_id", &p.plugin_id)?;
                s.serialize_field("scope", &p.scope)?;
                s.serialize_field("app_name", &p.app_name)?;
                s.serialize_field("loadDemoData", &p.load_demo_data)?;
                s.serialize_field("isPlugin", &true)?;
                s.end()
            }
            Self::StoreApp(a) => {
                let mut s = serializer.serialize_struct("StoreAppCandidate", 6)?;
                s.serialize_field("sys_id", &a.sys_id)?;
                s.serialize_field("app_name", &a.app_name)?;
                s.serialize_field("loadDemoData", &a.load_demo_data)?;
                s.serialize_field("isStoreApp", &true)?;
                s.serialize_field("appScope", &a.app_scope)?;
                s.serialize_field("versionObj", &VersionObj { version: &a.version })?;
                s.end()
            }
        }
    }
}

/// Mapping of batch key to candidate, submitted as a whole.
///
/// Keys are unique; a second candidate with an existing key is refused
/// instead of overwriting the first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct InstallationBatch {
    entries: BTreeMap<String, InstallationCandidate>,
}

impl InstallationBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a candidate under its own key.
    ///
    /// Returns the candidate back when the key is already taken.
    pub fn insert(
        &mut self,
        candidate: InstallationCandidate,
    ) -> std::result::Result<(), InstallationCandidate> {
        if self.entries.contains_key(candidate.key()) {
            return Err(candidate);
        }
        self.entries.insert(candidate.key().to_string(), candidate);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&InstallationCandidate> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &InstallationCandidate)> {
        self.entries.iter()
    }

    pub fn candidates(&self) -> impl Iterator<Item = &InstallationCandidate> {
        self.entries.values()
    }
}
