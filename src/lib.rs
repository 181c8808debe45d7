//! pdi-setup Library
//!
//! Classifies requested plugin ids and application scopes against a
//! developer instance and submits the installable ones as one batch.

pub mod batch;
pub mod catalog;
pub mod classifier;
pub mod cli;
pub mod config_file;
pub mod error;
pub mod instance;
pub mod notify;
pub mod platform;
pub mod snapshot;

// Re-export main types for convenience
pub use batch::{CandidateKind, InstallationBatch, InstallationCandidate};
pub use classifier::{
    Classification, Outcome, Provisioner, RunOptions, RunReport, SubmissionResult,
};
pub use config_file::SetupConfig;
pub use error::PdiSetupError;
pub use instance::{ConnectionSettings, InstanceClient};
pub use notify::{Notifier, RecordingNotifier, Severity, TracingNotifier};
pub use platform::{BatchInstaller, PropertyStore, RecordSource};
pub use snapshot::InstanceSnapshot;
