//! Error types for runway
//!
//! Errors carry the object or namespace they concern so that per-entry
//! failures can be reported without extra bookkeeping at the call site.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for runway operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// A precondition for the run is not met (cluster access, namespaces)
    #[error("prerequisite failed: {message}")]
    Prerequisite {
        /// Description of what is missing
        message: String,
    },

    /// Template lookup or processing error
    #[error("template error [{template}]: {message}")]
    Template {
        /// Name of the template being processed
        template: String,
        /// Description of what failed
        message: String,
    },

    /// Backup ledger could not be created, written, or read
    #[error("backup ledger error [{}]: {message}", path.display())]
    Ledger {
        /// Ledger file or directory involved
        path: PathBuf,
        /// Description of what failed
        message: String,
    },

    /// A ledger record could not be parsed
    #[error("malformed ledger record at line {line}: {message}")]
    LedgerRecord {
        /// 1-based line number in the ledger file
        line: usize,
        /// Description of what is wrong with the record
        message: String,
    },

    /// Invalid input or configuration
    #[error("validation error: {message}")]
    Validation {
        /// Description of what's invalid
        message: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },
}

impl Error {
    /// Create a prerequisite error
    pub fn prerequisite(msg: impl Into<String>) -> Self {
        Self::Prerequisite {
            message: msg.into(),
        }
    }

    /// Create a template error
    pub fn template(template: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Template {
            template: template.into(),
            message: msg.into(),
        }
    }

    /// Create a ledger error for the given path
    pub fn ledger(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Ledger {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a serialization error without kind context
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a serialization error for a specific kind
    pub fn serialization_for(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// True for failures that abort a run before any mutation
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Prerequisite { .. } | Error::Ledger { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::serialization(e.to_string())
    }
}
