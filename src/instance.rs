//! REST client for a live instance.
//!
//! Implements the collaborator traits on top of two platform APIs:
//!
//! - Table API (`/api/now/table/{table}`) for the record lookups and
//!   system properties
//! - CI/CD batch install API (`/api/sn_cicd/app/batch/install`) for the
//!   submission
//!
//! All calls are blocking and sequential. A non-success HTTP status is
//! turned into a `Lookup` or `Submission` error carrying the status and
//! the start of the response body.

use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::batch::InstallationBatch;
use crate::classifier::INSTANCE_NAME_PROPERTY;
use crate::error::{PdiSetupError, Result};
use crate::platform::{
    BatchInstaller, InstalledAppRecord, PluginRecord, PropertyStore, RecordSource,
    RemoteAppRecord,
};

const REQUEST_TIMEOUT_SECS: u64 = 30;
const ERROR_BODY_PREVIEW: usize = 200;

const PLUGIN_TABLE: &str = "v_plugin";
const INSTALLED_APP_TABLE: &str = "sys_store_app";
const REMOTE_APP_TABLE: &str = "sys_remote_app";
const PROPERTY_TABLE: &str = "sys_properties";
const BATCH_INSTALL_PATH: &str = "/api/sn_cicd/app/batch/install";

/// How to reach and authenticate against an instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Host prefix, `dev12345` for `dev12345.service-now.com`
    pub instance_name: String,
    /// Overrides the URL derived from `instance_name`
    pub base_url: Option<String>,
    pub username: String,
    pub password: String,
}

impl ConnectionSettings {
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}.service-now.com", self.instance_name),
        }
    }
}

#[derive(Deserialize)]
struct TableResponse<T> {
    result: Vec<T>,
}

#[derive(Deserialize)]
struct PropertyRow {
    #[serde(default)]
    value: String,
}

#[derive(Serialize)]
struct BatchInstallRequest<'a> {
    name: &'a str,
    packages: Vec<BatchPackage<'a>>,
}

#[derive(Serialize)]
struct BatchPackage<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    load_demo_data: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    requested_version: Option<&'a str>,
    notes: &'a str,
}

/// Request body for the batch install API
pub fn batch_install_request(label: &str, batch: &InstallationBatch) -> Result<serde_json::Value> {
    let packages = batch
        .candidates()
        .map(|c| BatchPackage {
            id: c.package_id(),
            kind: c.kind().api_type(),
            load_demo_data: c.load_demo_data(),
            requested_version: c.requested_version(),
            notes: c.app_name(),
        })
        .collect();

    let request = BatchInstallRequest {
        name: label,
        packages,
    };
    Ok(serde_json::to_value(&request)?)
}

fn preview(body: &str) -> String {
    body.chars().take(ERROR_BODY_PREVIEW).collect()
}

/// Blocking client for one instance
pub struct InstanceClient {
    http: Client,
    settings: ConnectionSettings,
    base_url: String,
}

impl InstanceClient {
    pub fn new(settings: ConnectionSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        let base_url = settings.base_url();

        tracing::debug!(base_url = %base_url, user = %settings.username, "instance client ready");
        Ok(Self {
            http,
            settings,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// First row of `table` where `field` equals `value`
    fn first_match<T: DeserializeOwned>(
        &self,
        table: &str,
        field: &str,
        value: &str,
        fields: &str,
    ) -> Result<Option<T>> {
        // '^' separates encoded query terms; such a value cannot name a record
        if value.contains('^') {
            tracing::debug!(table, value, "value not usable in encoded query");
            return Ok(None);
        }

        let url = format!("{}/api/now/table/{}", self.base_url, table);
        let query = format!("{}={}", field, value);

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.settings.username, Some(&self.settings.password))
            .header(ACCEPT, "application/json")
            .query(&[
                ("sysparm_query", query.as_str()),
                ("sysparm_fields", fields),
                ("sysparm_limit", "1"),
                ("sysparm_exclude_reference_link", "true"),
            ])
            .send()
            .map_err(|e| PdiSetupError::lookup(format!("{} query for {}: {}", table, value, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(PdiSetupError::lookup(format!(
                "{} returned {}: {}",
                table,
                status,
                preview(&body)
            )));
        }

        let rows: TableResponse<T> = response.json().map_err(|e| {
            PdiSetupError::lookup(format!("{} response could not be parsed: {}", table, e))
        })?;

        tracing::trace!(table, value, rows = rows.result.len(), "table query");
        Ok(rows.result.into_iter().next())
    }
}

impl RecordSource for InstanceClient {
    fn find_plugin(&self, id: &str) -> Result<Option<PluginRecord>> {
        self.first_match(PLUGIN_TABLE, "id", id, "id,name,scope,active")
    }

    fn find_installed_app(&self, scope: &str) -> Result<Option<InstalledAppRecord>> {
        self.first_match(INSTALLED_APP_TABLE, "scope", scope, "scope,name,version")
    }

    fn find_remote_app(&self, scope: &str) -> Result<Option<RemoteAppRecord>> {
        self.first_match(
            REMOTE_APP_TABLE,
            "scope",
            scope,
            "sys_id,scope,name,latest_version",
        )
    }
}

impl PropertyStore for InstanceClient {
    fn get_property(&self, key: &str) -> Result<Option<String>> {
        if key == INSTANCE_NAME_PROPERTY && !self.settings.instance_name.is_empty() {
            return Ok(Some(self.settings.instance_name.clone()));
        }

        let row: Option<PropertyRow> = self.first_match(PROPERTY_TABLE, "name", key, "value")?;
        Ok(row.map(|r| r.value).filter(|v| !v.is_empty()))
    }
}

impl BatchInstaller for InstanceClient {
    fn validate_and_batch_install(
        &self,
        label: &str,
        batch: &InstallationBatch,
    ) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, BATCH_INSTALL_PATH);
        let body = batch_install_request(label, batch)?;

        tracing::info!(url = %url, packages = batch.len(), "submitting batch install");

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.settings.username, Some(&self.settings.password))
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .map_err(|e| PdiSetupError::submission(e.to_string()))?;

        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            return Err(PdiSetupError::submission(format!(
                "{}: {}",
                status,
                preview(&text)
            )));
        }

        // Anything that is not JSON is still the installer's answer
        Ok(serde_json::from_str::<serde_json::Value>(&text)
            .unwrap_or_else(|_| serde_json::Value::String(text)))
    }
}
