//! HTTP gateway for the reporting backend.
//!
//! [`ReportingClient`] maps each REST endpoint to a typed async method.
//! [`Session`] layers the small per-user caches on top (known MCCs, MCCs with
//! completed downloads, a key/value flag store) and the client-side
//! validation that runs before any request is sent.

pub mod client;
pub mod error;
pub mod reports;
pub mod session;
pub mod templates;
pub mod types;

pub use client::ReportingClient;
pub use error::ClientError;
pub use reports::PreviewFormat;
pub use session::{
    ExportFailure, ExportFailurePolicy, ExportOutcome, ExportSelection, Session,
};
pub use types::{
    Account, AccountReportRow, CampaignReportRow, DataAvailability, KratuAvailability, Mcc,
    ReportAvailability, ReportKind, ReportRows, Template, TemplateDraft,
};
