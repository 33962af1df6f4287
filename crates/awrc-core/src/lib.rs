//! Shared domain types for the reporting console.
//!
//! Holds the validated account identifier, date-range handling, the backend
//! error-code vocabulary, and application configuration. Nothing here talks
//! to the network.

pub mod app_config;
pub mod ccid;
pub mod config;
pub mod dates;
pub mod error_code;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, ALLOWED_PAGE_SIZES};
pub use ccid::{Ccid, CcidError};
pub use config::{load_app_config, load_app_config_from_env};
pub use dates::{
    onboarding_default_range, parse_day, parse_month, parse_wire_date, DateRange,
    DateRangeError, Granularity,
};
pub use error_code::{ApiFailure, ErrorCode};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
