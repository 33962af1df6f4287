//! Screen state machines for the reporting console.
//!
//! Each screen owns an `Arc<Session>`, loads what it needs through it and
//! keeps the user-facing error text next to the typed error. Rendering is
//! left to the caller; the CLI prints plain tables.

pub mod account;
pub mod accounts_list;
mod busy;
pub mod error;
pub mod export_wizard;
pub mod health_check;
pub mod onboarding;
pub mod poller;
pub mod raw_data;
pub mod routes;
pub mod template_editor;
pub mod templates_list;

pub use account::{AccountScreen, AccountState, AccountSummary, Readiness};
pub use accounts_list::AccountsListScreen;
pub use error::{ViewError, WizardError};
pub use export_wizard::{AccountChoice, AccountPicker, ExportWizard, WizardData, WizardStep};
pub use health_check::{health_check, HealthStatus};
pub use onboarding::{OnboardingScreen, OnboardingStatus};
pub use poller::{poll_until, PollHandle, PollStep};
pub use raw_data::{ColumnVisibility, Paginator, RawDataInfo, RawDataScreen};
pub use routes::{guard_verified, Entry, Resolved, Route};
pub use template_editor::{read_template_file, EditorMode, TemplateEditor};
pub use templates_list::TemplatesListScreen;
