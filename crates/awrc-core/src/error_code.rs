//! Backend error codes and the user-facing text derived from them.
//!
//! Every failed gateway call carries an [`ApiFailure`]: a machine code the
//! screens branch on plus the server's human message. Codes the console does
//! not recognise survive as [`ErrorCode::Other`] and are rendered generically.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NoSuchMcc,
    DateStartBigger,
    NoFutureDates,
    MissingObject,
    MissingName,
    MissingDescription,
    MissingBody,
    NoSuchReport,
    ErrorLoadingReport,
    InvalidArguments,
    InvalidParams,
    InvalidTextParams,
    InternalError,
    MongoDbIsDown,
    Other(String),
}

impl ErrorCode {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::NoSuchMcc => "no_such_mcc",
            ErrorCode::DateStartBigger => "date_start_bigger",
            ErrorCode::NoFutureDates => "no_future_dates",
            ErrorCode::MissingObject => "missing_object",
            ErrorCode::MissingName => "missing_name",
            ErrorCode::MissingDescription => "missing_description",
            ErrorCode::MissingBody => "missing_body",
            ErrorCode::NoSuchReport => "no_such_report",
            ErrorCode::ErrorLoadingReport => "error_loading_report",
            ErrorCode::InvalidArguments => "invalid_arguments",
            ErrorCode::InvalidParams => "invalid_params",
            ErrorCode::InvalidTextParams => "invalid_text_params",
            ErrorCode::InternalError => "internal_error",
            ErrorCode::MongoDbIsDown => "mongo_db_is_down",
            ErrorCode::Other(code) => code,
        }
    }

    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "no_such_mcc" => ErrorCode::NoSuchMcc,
            "date_start_bigger" => ErrorCode::DateStartBigger,
            "no_future_dates" => ErrorCode::NoFutureDates,
            "missing_object" => ErrorCode::MissingObject,
            "missing_name" => ErrorCode::MissingName,
            "missing_description" => ErrorCode::MissingDescription,
            "missing_body" => ErrorCode::MissingBody,
            "no_such_report" => ErrorCode::NoSuchReport,
            "error_loading_report" => ErrorCode::ErrorLoadingReport,
            "invalid_arguments" => ErrorCode::InvalidArguments,
            "invalid_params" => ErrorCode::InvalidParams,
            "invalid_text_params" => ErrorCode::InvalidTextParams,
            "internal_error" => ErrorCode::InternalError,
            "mongo_db_is_down" => ErrorCode::MongoDbIsDown,
            other => ErrorCode::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ErrorCode::from_code(&raw))
    }
}

/// Structured failure returned by the backend or raised by client-side
/// validation before a request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("({code}): {message}")]
pub struct ApiFailure {
    #[serde(rename = "error")]
    pub code: ErrorCode,
    #[serde(default)]
    pub message: String,
}

impl ApiFailure {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn no_such_mcc() -> Self {
        Self::new(
            ErrorCode::NoSuchMcc,
            "You haven't added that MCC to your account list yet.",
        )
    }

    #[must_use]
    pub fn date_start_bigger() -> Self {
        Self::new(
            ErrorCode::DateStartBigger,
            "Start date can't be after end date.",
        )
    }

    #[must_use]
    pub fn no_future_dates() -> Self {
        Self::new(
            ErrorCode::NoFutureDates,
            "Can't pull reports for the future.",
        )
    }

    /// A missing template field; `what` is `name`, `description` or `body`.
    #[must_use]
    pub fn missing(what: &str) -> Self {
        let code = ErrorCode::from_code(&format!("missing_{what}"));
        Self::new(code, format!("You must provide a template {what}"))
    }

    /// `"<prefix> (<code>: <message>)"`, the generic rendering for load errors.
    #[must_use]
    pub fn describe(&self, prefix: &str) -> String {
        format!("{prefix} ({}: {})", self.code, self.message)
    }

    /// Text shown when saving a template fails.
    #[must_use]
    pub fn template_save_message(&self) -> String {
        match self.code {
            ErrorCode::MissingName => "You need to provide a name".to_string(),
            ErrorCode::MissingDescription => "You need to provide a description".to_string(),
            ErrorCode::MissingBody => "You need to provide some template HTML".to_string(),
            _ => self.describe("Unable to save template"),
        }
    }

    /// Text shown when starting a report download fails.
    #[must_use]
    pub fn report_pull_message(&self) -> String {
        match self.code {
            ErrorCode::DateStartBigger => "Start date must be less than end date".to_string(),
            ErrorCode::NoFutureDates => {
                "We don't know how to pull reports from the future (yet)".to_string()
            }
            _ => format!(
                "Unable to start report download ({}): {}",
                self.code, self.message
            ),
        }
    }
}
