//! Installation request classifier and dispatcher.
//!
//! Resolves each requested identifier against the instance's record
//! sources, assembles one `InstallationBatch` from the installable ones
//! and hands it to the batch installer (or only reports it in dry-run
//! mode).
//!
//! # Resolution Order
//!
//! | Step | Lookup                          | Found                        |
//! |------|---------------------------------|------------------------------|
//! | 1    | plugin by `id`                  | active: warn, else queue     |
//! | 2    | installed store app by `scope`  | warn, skip                   |
//! | 3    | remote app definition by `scope`| queue, keyed by `sys_id`     |
//! | 4    | -                               | error, skip                  |
//!
//! Exactly one notifier line is emitted per identifier. The batch only
//! ever contains queued outcomes.

use std::collections::HashSet;

use crate::batch::{InstallationBatch, InstallationCandidate, PluginCandidate, StoreAppCandidate};
use crate::error::{PdiSetupError, Result};
use crate::notify::Notifier;
use crate::platform::{BatchInstaller, PropertyStore, RecordSource};

/// Label the batch install plan is created under
pub const DEFAULT_BATCH_LABEL: &str = "PDI Installation";

/// Property holding the instance's host name prefix
pub const INSTANCE_NAME_PROPERTY: &str = "instance_name";

/// Where batch install plans can be watched
pub fn progress_url(instance_name: &str) -> String {
    format!(
        "https://{}.service-now.com/now/nav/ui/classic/params/target/sys_batch_install_plan_list.do",
        instance_name
    )
}

/// Per-run switches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Classify and log only, never submit
    pub dry_run: bool,
    /// Install bundled demo data with every candidate
    pub load_demo_data: bool,
    pub batch_label: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            load_demo_data: false,
            batch_label: DEFAULT_BATCH_LABEL.to_string(),
        }
    }
}

/// What happened to one identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    AlreadyActivePlugin,
    AlreadyInstalledApp,
    QueuedPlugin,
    /// Queued under the remote record's unique id
    QueuedStoreApp { sys_id: String },
    /// Seen earlier in the same run, or its batch key is already taken
    Duplicate,
    /// Matches none of the record sources
    Invalid,
}

impl Outcome {
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::QueuedPlugin | Self::QueuedStoreApp { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub identifier: String,
    pub outcome: Outcome,
}

/// Result of handing the batch to the installer
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionResult {
    /// Raw response of the installer
    Submitted(serde_json::Value),
    /// Stringified failure, already logged
    Failed(String),
}

/// Everything one run decided and did.
///
/// Informational: a failed submission is reported here and in the log,
/// never as an `Err`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub classifications: Vec<Classification>,
    pub batch: InstallationBatch,
    /// `None` for dry runs and empty batches
    pub submission: Option<SubmissionResult>,
}

impl RunReport {
    pub fn queued(&self) -> usize {
        self.classifications
            .iter()
            .filter(|c| c.outcome.is_queued())
            .count()
    }

    pub fn outcome_of(&self, identifier: &str) -> Option<&Outcome> {
        self.classifications
            .iter()
            .find(|c| c.identifier == identifier)
            .map(|c| &c.outcome)
    }

    pub fn was_submitted(&self) -> bool {
        self.submission.is_some()
    }
}

/// Classifier/dispatcher with its collaborators injected.
pub struct Provisioner<'a> {
    records: &'a dyn RecordSource,
    installer: &'a dyn BatchInstaller,
    properties: &'a dyn PropertyStore,
    notifier: &'a dyn Notifier,
}

impl<'a> Provisioner<'a> {
    pub fn new(
        records: &'a dyn RecordSource,
        installer: &'a dyn BatchInstaller,
        properties: &'a dyn PropertyStore,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            records,
            installer,
            properties,
            notifier,
        }
    }

    /// Classify `identifiers`, build the batch and dispatch it.
    ///
    /// # Failure Modes
    ///
    /// - Empty list or blank identifier: error line, `Err(Validation)`,
    ///   no lookup is made
    /// - Lookup transport failure: error line, the run stops before any
    ///   submission
    /// - Installer failure: error line, reported in `RunReport::submission`
    pub fn install_plugins_and_applications<S: AsRef<str>>(
        &self,
        identifiers: &[S],
        options: &RunOptions,
    ) -> Result<RunReport> {
        self.validate(identifiers)?;
        let (classifications, batch) = self.build_batch(identifiers, options.load_demo_data)?;
        let submission = self.dispatch(&batch, options);

        Ok(RunReport {
            classifications,
            batch,
            submission,
        })
    }

    fn validate<S: AsRef<str>>(&self, identifiers: &[S]) -> Result<()> {
        if identifiers.is_empty() {
            self.notifier
                .error("Parameter \"identifiers\" does not represent a valid list!", &[]);
            return Err(PdiSetupError::validation("no identifiers given"));
        }

        if let Some(pos) = identifiers.iter().position(|id| id.as_ref().trim().is_empty()) {
            self.notifier
                .error("Identifier at position {0} is blank!", &[&pos]);
            return Err(PdiSetupError::validation(format!(
                "identifier at position {} is blank",
                pos
            )));
        }

        Ok(())
    }

    /// Single pass over `identifiers`, in order.
    pub fn build_batch<S: AsRef<str>>(
        &self,
        identifiers: &[S],
        load_demo_data: bool,
    ) -> Result<(Vec<Classification>, InstallationBatch)> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut batch = InstallationBatch::new();
        let mut classifications = Vec::with_capacity(identifiers.len());

        for id in identifiers {
            let id = id.as_ref();

            let outcome = if !seen.insert(id) {
                self.notifier
                    .warn("\"{0}\" is listed more than once, ignoring repeat", &[&id]);
                Outcome::Duplicate
            } else {
                self.classify(id, load_demo_data, &mut batch)
                    .inspect_err(|e| {
                        self.notifier.error("Lookup of \"{0}\" failed: {1}", &[&id, e]);
                    })?
            };

            tracing::debug!(identifier = id, outcome = ?outcome, "classified");
            classifications.push(Classification {
                identifier: id.to_string(),
                outcome,
            });
        }

        Ok((classifications, batch))
    }

    fn classify(
        &self,
        id: &str,
        load_demo_data: bool,
        batch: &mut InstallationBatch,
    ) -> Result<Outcome> {
        if let Some(plugin) = self.records.find_plugin(id)? {
            if plugin.is_active() {
                self.notifier.warn(
                    "Plugin \"{0}\" (ID: {1}) is already installed!",
                    &[&plugin.name, &id],
                );
                return Ok(Outcome::AlreadyActivePlugin);
            }

            let candidate = InstallationCandidate::Plugin(PluginCandidate {
                plugin_id: id.to_string(),
                scope: plugin.scope,
                app_name: plugin.name,
                load_demo_data,
            });
            return Ok(self.enqueue(
                id,
                candidate,
                batch,
                Outcome::QueuedPlugin,
                "Queue Plugin \"{0}\" (ID: {1}) for installation",
            ));
        }

        if let Some(app) = self.records.find_installed_app(id)? {
            self.notifier.warn(
                "Application \"{0}\" (ID: {1}) is already installed!",
                &[&app.name, &id],
            );
            return Ok(Outcome::AlreadyInstalledApp);
        }

        if let Some(remote) = self.records.find_remote_app(id)? {
            let queued = Outcome::QueuedStoreApp {
                sys_id: remote.sys_id.clone(),
            };
            let candidate = InstallationCandidate::StoreApp(StoreAppCandidate {
                sys_id: remote.sys_id,
                app_name: remote.name,
                load_demo_data,
                app_scope: id.to_string(),
                version: remote.latest_version,
            });
            return Ok(self.enqueue(
                id,
                candidate,
                batch,
                queued,
                "Queue Application \"{0}\" (ID: {1}) for installation",
            ));
        }

        self.notifier
            .error("\"{0}\" is not a valid plugin or application ID!", &[&id]);
        Ok(Outcome::Invalid)
    }

    fn enqueue(
        &self,
        id: &str,
        candidate: InstallationCandidate,
        batch: &mut InstallationBatch,
        queued: Outcome,
        template: &str,
    ) -> Outcome {
        let name = candidate.app_name().to_string();
        match batch.insert(candidate) {
            Ok(()) => {
                self.notifier.info(template, &[&name, &id]);
                queued
            }
            Err(rejected) => {
                self.notifier.warn(
                    "\"{0}\" maps to batch entry \"{1}\" which is already queued, ignoring",
                    &[&id, &rejected.key()],
                );
                Outcome::Duplicate
            }
        }
    }

    /// Submit `batch` unless it is empty or this is a dry run.
    pub fn dispatch(
        &self,
        batch: &InstallationBatch,
        options: &RunOptions,
    ) -> Option<SubmissionResult> {
        if batch.is_empty() {
            self.notifier
                .info("No plugins or applications will be installed...", &[]);
            return None;
        }

        self.notifier.info(
            "Start installation of {0} plugins and applications... ",
            &[&batch.len()],
        );

        if options.dry_run {
            tracing::debug!(queued = batch.len(), "dry run, batch not submitted");
            return None;
        }

        let submission = match self
            .installer
            .validate_and_batch_install(&options.batch_label, batch)
        {
            Ok(response) => {
                self.notifier.info("{0}", &[&response]);
                SubmissionResult::Submitted(response)
            }
            Err(e) => {
                self.notifier.error("{0}", &[&e]);
                SubmissionResult::Failed(e.to_string())
            }
        };

        self.announce_progress_url();
        Some(submission)
    }

    fn announce_progress_url(&self) {
        match self.properties.get_property(INSTANCE_NAME_PROPERTY) {
            Ok(Some(name)) if !name.trim().is_empty() => self.notifier.info(
                "To follow the installation progress, go to sys_batch_install_plan: {0}",
                &[&progress_url(name.trim())],
            ),
            Ok(_) => self.notifier.warn(
                "Property \"{0}\" is not set, open sys_batch_install_plan on the instance to follow the installation progress",
                &[&INSTANCE_NAME_PROPERTY],
            ),
            Err(e) => self.notifier.warn(
                "Could not read property \"{0}\" ({1}), open sys_batch_install_plan on the instance to follow the installation progress",
                &[&INSTANCE_NAME_PROPERTY, &e],
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{RecordingNotifier, Severity};
    use crate::platform::{InstalledAppRecord, PluginRecord, RemoteAppRecord};
    use crate::snapshot::InstanceSnapshot;
    use std::cell::Cell;

    fn snapshot() -> InstanceSnapshot {
        let mut snap = InstanceSnapshot::default();
        snap.plugins.push(PluginRecord {
            id: "com.snc.inactive".to_string(),
            name: "Inactive Plugin".to_string(),
            scope: "global".to_string(),
            active: "inactive".to_string(),
        });
        snap.plugins.push(PluginRecord {
            id: "com.snc.active".to_string(),
            name: "Active Plugin".to_string(),
            scope: "global".to_string(),
            active: "active".to_string(),
        });
        snap.installed_apps.push(InstalledAppRecord {
            scope: "sn_installed".to_string(),
            name: "Installed App".to_string(),
            version: "1.0.0".to_string(),
        });
        snap.remote_apps.push(RemoteAppRecord {
            sys_id: "f00dcafe".to_string(),
            scope: "sn_remote".to_string(),
            name: "Remote App".to_string(),
            latest_version: "2.4.1".to_string(),
        });
        snap.properties
            .insert("instance_name".to_string(), "dev12345".to_string());
        snap
    }

    /// Counts lookups and fails the plugin source on demand
    struct FlakyRecords {
        calls: Cell<usize>,
    }

    impl RecordSource for FlakyRecords {
        fn find_plugin(&self, _id: &str) -> Result<Option<PluginRecord>> {
            self.calls.set(self.calls.get() + 1);
            Err(PdiSetupError::lookup("v_plugin returned 503"))
        }
        fn find_installed_app(&self, _scope: &str) -> Result<Option<InstalledAppRecord>> {
            Ok(None)
        }
        fn find_remote_app(&self, _scope: &str) -> Result<Option<RemoteAppRecord>> {
            Ok(None)
        }
    }

    struct RejectingInstaller;

    impl BatchInstaller for RejectingInstaller {
        fn validate_and_batch_install(
            &self,
            _label: &str,
            _batch: &InstallationBatch,
        ) -> Result<serde_json::Value> {
            Err(PdiSetupError::submission("401 Unauthorized"))
        }
    }

    #[test]
    fn test_inactive_plugin_is_queued() {
        let snap = snapshot();
        let notifier = RecordingNotifier::new();
        let prov = Provisioner::new(&snap, &snap, &snap, &notifier);

        let (classes, batch) = prov.build_batch(&["com.snc.inactive"], true).unwrap();

        assert_eq!(classes[0].outcome, Outcome::QueuedPlugin);
        match batch.get("com.snc.inactive") {
            Some(InstallationCandidate::Plugin(p)) => {
                assert_eq!(p.scope, "global");
                assert_eq!(p.app_name, "Inactive Plugin");
                assert!(p.load_demo_data);
            }
            other => panic!("unexpected entry: {:?}", other),
        }
        assert!(notifier.contains("Queue Plugin \"Inactive Plugin\" (ID: com.snc.inactive)"));
    }

    #[test]
    fn test_remote_app_keyed_by_sys_id() {
        let snap = snapshot();
        let notifier = RecordingNotifier::new();
        let prov = Provisioner::new(&snap, &snap, &snap, &notifier);

        let (classes, batch) = prov.build_batch(&["sn_remote"], false).unwrap();

        assert_eq!(
            classes[0].outcome,
            Outcome::QueuedStoreApp {
                sys_id: "f00dcafe".to_string()
            }
        );
        assert!(!batch.contains_key("sn_remote"));
        match batch.get("f00dcafe") {
            Some(InstallationCandidate::StoreApp(a)) => {
                assert_eq!(a.app_scope, "sn_remote");
                assert_eq!(a.version, "2.4.1");
                assert!(!a.load_demo_data);
            }
            other => panic!("unexpected entry: {:?}", other),
        }
    }

    #[test]
    fn test_already_satisfied_and_invalid_are_dropped() {
        let snap = snapshot();
        let notifier = RecordingNotifier::new();
        let prov = Provisioner::new(&snap, &snap, &snap, &notifier);

        let (classes, batch) = prov
            .build_batch(&["com.snc.active", "sn_installed", "bogus"], false)
            .unwrap();

        assert!(batch.is_empty());
        assert_eq!(classes[0].outcome, Outcome::AlreadyActivePlugin);
        assert_eq!(classes[1].outcome, Outcome::AlreadyInstalledApp);
        assert_eq!(classes[2].outcome, Outcome::Invalid);
        assert_eq!(
            notifier.severities(),
            vec![Severity::Warn, Severity::Warn, Severity::Error]
        );
    }

    #[test]
    fn test_duplicate_identifier_warns_once() {
        let snap = snapshot();
        let notifier = RecordingNotifier::new();
        let prov = Provisioner::new(&snap, &snap, &snap, &notifier);

        let (classes, batch) = prov
            .build_batch(&["com.snc.inactive", "com.snc.inactive"], false)
            .unwrap();

        assert_eq!(batch.len(), 1);
        assert_eq!(classes[1].outcome, Outcome::Duplicate);
        assert_eq!(notifier.severities(), vec![Severity::Info, Severity::Warn]);
        assert!(notifier.contains("listed more than once"));
    }

    #[test]
    fn test_batch_key_collision_is_duplicate() {
        let mut snap = InstanceSnapshot::default();
        snap.plugins.push(PluginRecord {
            id: "k1".to_string(),
            name: "Plugin K1".to_string(),
            scope: "global".to_string(),
            active: "inactive".to_string(),
        });
        snap.remote_apps.push(RemoteAppRecord {
            sys_id: "k1".to_string(),
            scope: "sn_k1".to_string(),
            name: "Remote K1".to_string(),
            latest_version: "1.0.0".to_string(),
        });
        let notifier = RecordingNotifier::new();
        let prov = Provisioner::new(&snap, &snap, &snap, &notifier);

        let (classes, batch) = prov.build_batch(&["k1", "sn_k1"], false).unwrap();

        assert_eq!(batch.len(), 1);
        assert!(matches!(batch.get("k1"), Some(InstallationCandidate::Plugin(_))));
        assert_eq!(classes[0].outcome, Outcome::QueuedPlugin);
        assert_eq!(classes[1].outcome, Outcome::Duplicate);
        assert_eq!(notifier.severities(), vec![Severity::Info, Severity::Warn]);
        assert!(notifier.contains("\"sn_k1\" maps to batch entry \"k1\""));
    }

    #[test]
    fn test_empty_input_fails_fast() {
        let records = FlakyRecords { calls: Cell::new(0) };
        let snap = snapshot();
        let notifier = RecordingNotifier::new();
        let prov = Provisioner::new(&records, &snap, &snap, &notifier);

        let empty: [&str; 0] = [];
        let err = prov
            .install_plugins_and_applications(&empty, &RunOptions::default())
            .unwrap_err();

        assert!(matches!(err, PdiSetupError::Validation(_)));
        assert_eq!(records.calls.get(), 0);
        assert_eq!(notifier.severities(), vec![Severity::Error]);
    }

    #[test]
    fn test_blank_identifier_fails_fast() {
        let snap = snapshot();
        let notifier = RecordingNotifier::new();
        let prov = Provisioner::new(&snap, &snap, &snap, &notifier);

        let err = prov
            .install_plugins_and_applications(&["sn_remote", "  "], &RunOptions::default())
            .unwrap_err();

        assert!(matches!(err, PdiSetupError::Validation(_)));
        assert!(snap.submissions().is_empty());
        assert!(notifier.contains("position 1"));
    }

    #[test]
    fn test_lookup_failure_stops_run() {
        let records = FlakyRecords { calls: Cell::new(0) };
        let snap = snapshot();
        let notifier = RecordingNotifier::new();
        let prov = Provisioner::new(&records, &snap, &snap, &notifier);

        let err = prov
            .install_plugins_and_applications(&["a", "b"], &RunOptions::default())
            .unwrap_err();

        assert!(matches!(err, PdiSetupError::Lookup(_)));
        assert_eq!(records.calls.get(), 1);
        assert!(snap.submissions().is_empty());
        assert!(notifier.contains("Lookup of \"a\" failed"));
    }

    #[test]
    fn test_submission_failure_is_logged_not_raised() {
        let snap = snapshot();
        let notifier = RecordingNotifier::new();
        let prov = Provisioner::new(&snap, &RejectingInstaller, &snap, &notifier);

        let report = prov
            .install_plugins_and_applications(&["sn_remote"], &RunOptions::default())
            .unwrap();

        assert_eq!(
            report.submission,
            Some(SubmissionResult::Failed(
                "Batch submission failed: 401 Unauthorized".to_string()
            ))
        );
        assert!(notifier.contains("401 Unauthorized"));
        // The progress link is still shown
        assert!(notifier.contains(&progress_url("dev12345")));
    }

    #[test]
    fn test_missing_instance_name_warns() {
        let mut snap = snapshot();
        snap.properties.clear();
        let notifier = RecordingNotifier::new();
        let prov = Provisioner::new(&snap, &snap, &snap, &notifier);

        prov.install_plugins_and_applications(&["sn_remote"], &RunOptions::default())
            .unwrap();

        assert!(!notifier.contains("service-now.com"));
        assert_eq!(notifier.lines().last().unwrap().0, Severity::Warn);
    }

    #[test]
    fn test_progress_url() {
        assert_eq!(
            progress_url("dev12345"),
            "https://dev12345.service-now.com/now/nav/ui/classic/params/target/sys_batch_install_plan_list.do"
        );
    }
}
