use std::path::PathBuf;

use awrc_client::ClientError;
use awrc_core::{ApiFailure, Ccid};
use thiserror::Error;

/// Precondition failures of the export wizard's step transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("select at least one account first")]
    NoAccountSelected,

    #[error("select a template first")]
    NoTemplateSelected,

    #[error("invalid date range: {reason}")]
    InvalidDateRange { reason: String },

    #[error("cannot {action} while {step}")]
    OutOfOrder {
        step: &'static str,
        action: &'static str,
    },

    #[error("no template with id {0}")]
    UnknownTemplate(i64),

    #[error("account {0} is not under this MCC")]
    UnknownAccount(Ccid),

    #[error("{remaining} background jobs are still running; wait for them to finish")]
    JobsPending { remaining: u32 },
}

/// Errors surfaced by screen operations.
#[derive(Debug, Error)]
pub enum ViewError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Wizard(#[from] WizardError),

    #[error("screen data has not been loaded")]
    NotLoaded,

    #[error("select an account first")]
    NoAccountSelected,

    #[error("account {0} is not under this MCC")]
    UnknownAccount(Ccid),

    #[error("invalid date range: {reason}")]
    InvalidDateRange { reason: String },

    #[error("page size {0} is not offered")]
    InvalidPageSize(usize),

    #[error("operation already in progress")]
    Busy,

    #[error("MCC {0} already has reports or queued jobs")]
    AlreadyOnboarded(Ccid),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ViewError {
    /// The backend failure behind this error, if it came from the backend.
    #[must_use]
    pub fn failure(&self) -> Option<ApiFailure> {
        match self {
            ViewError::Client(e) => Some(e.failure()),
            _ => None,
        }
    }
}

/// `"<stage> (<code>): <message>"`, the load-error banner text.
pub(crate) fn load_failure(stage: &str, err: &ClientError) -> String {
    let failure = err.failure();
    format!("{stage} ({}): {}", failure.code, failure.message)
}
