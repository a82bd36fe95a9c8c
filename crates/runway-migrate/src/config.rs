//! Run configuration
//!
//! Built once from command-line arguments and handed to the engine; nothing
//! in the engine reads process-wide state.

use std::path::PathBuf;

use runway_common::{Error, DEFAULT_TEMPLATE_NAMESPACE};

use crate::ledger::LedgerContents;

/// Default directory for backup ledgers
pub const DEFAULT_BACKUP_DIR: &str = "runway-backups";

/// Whether a run may mutate the cluster without asking
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunMode {
    /// Plan only; apply requires interactive confirmation
    #[default]
    DryRun,
    /// Apply without asking
    Apply,
}

/// Options for a migration run
#[derive(Clone, Debug, PartialEq)]
pub struct MigrationConfig {
    /// Namespace whose workloads are migrated
    pub namespace: String,
    /// Namespace holding runtime templates
    pub template_namespace: String,
    /// Dry run or apply
    pub mode: RunMode,
    /// Backup requested explicitly
    pub backup: bool,
    /// Sweep orphaned runtimes after a successful apply
    pub cleanup: bool,
    /// Verbose diagnostics (skips are reported)
    pub verbose: bool,
    /// Directory for backup ledgers
    pub backup_dir: PathBuf,
}

impl MigrationConfig {
    /// Configuration with defaults for everything but the namespace
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            template_namespace: DEFAULT_TEMPLATE_NAMESPACE.to_string(),
            mode: RunMode::DryRun,
            backup: false,
            cleanup: false,
            verbose: false,
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
        }
    }

    /// Applying always backs up; there is no way to turn that off
    pub fn backup_enabled(&self) -> bool {
        self.backup || self.mode == RunMode::Apply
    }

    /// True when apply needs no confirmation
    pub fn preauthorized(&self) -> bool {
        self.mode == RunMode::Apply
    }

    /// Reject configurations that cannot run
    pub fn validate(&self) -> Result<(), Error> {
        if self.namespace.trim().is_empty() {
            return Err(Error::validation("a target namespace is required"));
        }
        if self.template_namespace.trim().is_empty() {
            return Err(Error::validation("template namespace must not be empty"));
        }
        Ok(())
    }
}

/// Options for a rollback run
#[derive(Clone, Debug, PartialEq)]
pub struct RollbackConfig {
    /// Ledger file to replay
    pub ledger: PathBuf,
    /// Namespace override; defaults to the one in the ledger header
    pub namespace: Option<String>,
}

impl RollbackConfig {
    /// Namespace to restore into: explicit, else the ledger header's
    pub fn resolve_namespace(&self, contents: &LedgerContents) -> Result<String, Error> {
        self.namespace
            .clone()
            .filter(|ns| !ns.trim().is_empty())
            .or_else(|| contents.namespace.clone())
            .ok_or_else(|| {
                Error::validation(format!(
                    "ledger {} has no namespace header; pass --namespace",
                    self.ledger.display()
                ))
            })
    }
}
