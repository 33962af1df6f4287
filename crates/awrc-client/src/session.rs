//! Per-user session state layered over [`ReportingClient`].
//!
//! A [`Session`] is built once after sign-in and handed to every screen. It
//! owns the only state that outlives a screen: the known-MCC cache, the set
//! of MCCs known to have downloaded reports, a small key/value flag store and
//! the privileged-role flag. Locks are never held across an `.await`.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use awrc_core::{ApiFailure, Ccid, DateRange, DateRangeError, ErrorCode, Granularity};
use chrono::NaiveDate;
use serde_json::Value;

use crate::client::ReportingClient;
use crate::error::ClientError;
use crate::types::{Account, DataAvailability, Mcc, ReportKind, ReportRows, Template, TemplateDraft};

const VERIFIED_PREFIX: &str = "verified_loaded_";

/// Which accounts a PDF export covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportSelection {
    /// One bulk request for every account of the MCC.
    All,
    /// One request per listed account.
    Accounts(Vec<Ccid>),
}

/// What to do when a per-account export request fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFailurePolicy {
    /// Log the failure and carry on with the remaining accounts.
    #[default]
    BestEffort,
    /// Abort at the first failure.
    StopOnFirstError,
}

/// A per-account export request that failed under
/// [`ExportFailurePolicy::BestEffort`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFailure {
    pub account: Ccid,
    pub failure: ApiFailure,
}

/// Result of [`Session::export_pdfs`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOutcome {
    pub selection: ExportSelection,
    pub failed: Vec<ExportFailure>,
}

impl ExportOutcome {
    /// Number of export requests issued.
    #[must_use]
    pub fn requested(&self) -> usize {
        match &self.selection {
            ExportSelection::All => 1,
            ExportSelection::Accounts(accounts) => accounts.len(),
        }
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.requested().saturating_sub(self.failed.len())
    }
}

pub struct Session {
    client: Arc<ReportingClient>,
    known_mccs: RwLock<Option<Vec<Mcc>>>,
    known_completed: Mutex<HashSet<Ccid>>,
    values: Mutex<HashMap<String, Value>>,
    public_templates: AtomicBool,
}

impl Session {
    #[must_use]
    pub fn new(client: Arc<ReportingClient>) -> Self {
        Self {
            client,
            known_mccs: RwLock::new(None),
            known_completed: Mutex::new(HashSet::new()),
            values: Mutex::new(HashMap::new()),
            public_templates: AtomicBool::new(false),
        }
    }

    /// The underlying HTTP client, for calls that need no session state.
    #[must_use]
    pub fn client(&self) -> &ReportingClient {
        &self.client
    }

    // -- MCCs --------------------------------------------------------------

    /// Fetches the MCC list and refreshes the cache.
    ///
    /// # Errors
    ///
    /// Propagates any [`ClientError`] from the request; the cache is left as
    /// it was.
    pub async fn list_mccs(&self) -> Result<Vec<Mcc>, ClientError> {
        let mccs = self.client.list_mccs().await?;
        *self
            .known_mccs
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(mccs.clone());
        Ok(mccs)
    }

    /// Resolves an MCC from the cache, fetching the list when the cache is
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns `no_such_mcc` when the user has not added the MCC, or any
    /// [`ClientError`] from the list fetch.
    pub async fn mcc_by_id(&self, id: Ccid) -> Result<Mcc, ClientError> {
        let cached = self
            .known_mccs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let mccs = match cached {
            Some(mccs) => mccs,
            None => self.list_mccs().await?,
        };
        mccs.into_iter()
            .find(|m| m.top_account_id == id)
            .ok_or_else(|| ClientError::Api(ApiFailure::no_such_mcc()))
    }

    /// Removes an MCC and clears the MCC cache.
    ///
    /// # Errors
    ///
    /// Propagates any [`ClientError`] from the request.
    pub async fn delete_mcc(&self, id: Ccid) -> Result<(), ClientError> {
        self.client.delete_mcc(id).await?;
        *self
            .known_mccs
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
        self.known_completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        tracing::info!(mcc = %id, "deleted MCC");
        Ok(())
    }

    /// # Errors
    ///
    /// Propagates any [`ClientError`] from the request.
    pub async fn list_accounts(&self, mcc: Ccid, live: bool) -> Result<Vec<Account>, ClientError> {
        self.client.list_accounts(mcc, live).await
    }

    /// # Errors
    ///
    /// Propagates any [`ClientError`] from the request.
    pub async fn data_available(
        &self,
        mcc: Ccid,
        granularity: Granularity,
    ) -> Result<DataAvailability, ClientError> {
        self.client.data_available(mcc, granularity).await
    }

    /// Whether any reports have been downloaded for the MCC.
    ///
    /// A positive answer is remembered; later calls skip the network.
    ///
    /// # Errors
    ///
    /// Propagates any [`ClientError`] from the availability request.
    pub async fn reports_downloaded(&self, mcc: Ccid) -> Result<bool, ClientError> {
        if self.completed(mcc) {
            return Ok(true);
        }
        let availability = self.client.data_available(mcc, Granularity::Month).await?;
        if availability.has_reports() {
            self.known_completed
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(mcc);
            return Ok(true);
        }
        Ok(false)
    }

    fn completed(&self, mcc: Ccid) -> bool {
        self.known_completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&mcc)
    }

    // -- key/value store ---------------------------------------------------

    /// Stores a flag for the lifetime of the session. Empty keys are ignored.
    pub fn store_value(&self, key: &str, value: impl Into<Value>) {
        if key.is_empty() {
            tracing::warn!("ignoring store_value with an empty key");
            return;
        }
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.into());
    }

    #[must_use]
    pub fn value_for_key(&self, key: &str) -> Option<Value> {
        if key.is_empty() {
            tracing::warn!("ignoring value_for_key with an empty key");
            return None;
        }
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Records that the MCC's data finished loading this session.
    pub fn mark_verified(&self, mcc: Ccid) {
        self.store_value(&verified_key(mcc), true);
    }

    #[must_use]
    pub fn is_verified(&self, mcc: Ccid) -> bool {
        matches!(
            self.value_for_key(&verified_key(mcc)),
            Some(Value::Bool(true))
        )
    }

    // -- templates ---------------------------------------------------------

    #[must_use]
    pub fn can_edit_public_templates(&self) -> bool {
        self.public_templates.load(Ordering::Relaxed)
    }

    /// Grants the privileged role for this session. Nothing checks who calls
    /// this; the backend does not enforce it either.
    pub fn enable_public_templates(&self) {
        self.public_templates.store(true, Ordering::Relaxed);
    }

    /// # Errors
    ///
    /// Propagates any [`ClientError`] from the request.
    pub async fn list_templates(&self, public_only: bool) -> Result<Vec<Template>, ClientError> {
        self.client.list_templates(public_only).await
    }

    /// # Errors
    ///
    /// Propagates any [`ClientError`] from the request.
    pub async fn get_template(&self, id: i64) -> Result<Template, ClientError> {
        self.client.get_template(id).await
    }

    /// Validates then saves a template.
    ///
    /// # Errors
    ///
    /// Returns `missing_name`, `missing_description` or `missing_body`
    /// without sending anything, or any [`ClientError`] from the request.
    pub async fn save_template(
        &self,
        id: Option<i64>,
        draft: &TemplateDraft,
    ) -> Result<Value, ClientError> {
        draft.validate()?;
        let saved = self
            .client
            .save_template(id, draft, self.can_edit_public_templates())
            .await?;
        tracing::info!(template_id = ?id, name = %draft.name, "saved template");
        Ok(saved)
    }

    // -- reports -----------------------------------------------------------

    /// Starts report downloads for the MCC after checking the range.
    ///
    /// # Errors
    ///
    /// Returns `date_start_bigger` or `no_future_dates` without any request
    /// when the range is invalid, or any [`ClientError`] from the request.
    pub async fn pull_reports(
        &self,
        mcc: Ccid,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> Result<DateRange, ClientError> {
        let range = DateRange::new(start, end).map_err(range_failure)?;
        range.ensure_not_future(today).map_err(range_failure)?;
        self.client.generate_reports(mcc, &range).await?;
        tracing::info!(mcc = %mcc, start = %start, end = %end, "requested report pull");
        Ok(range)
    }

    /// Requests PDF exports for the selection.
    ///
    /// # Errors
    ///
    /// With [`ExportSelection::All`], any failure of the bulk request. With a
    /// list, the first failure under [`ExportFailurePolicy::StopOnFirstError`];
    /// best-effort exports never fail.
    pub async fn export_pdfs(
        &self,
        mcc: Ccid,
        range: &DateRange,
        template_id: i64,
        selection: ExportSelection,
        policy: ExportFailurePolicy,
    ) -> Result<ExportOutcome, ClientError> {
        let mut failed = Vec::new();
        match &selection {
            ExportSelection::All => {
                self.client.export_reports(mcc, range, template_id).await?;
            }
            ExportSelection::Accounts(accounts) => {
                for &account in accounts {
                    let result = self
                        .client
                        .export_account_report(mcc, account, range, template_id)
                        .await;
                    if let Err(e) = result {
                        if policy == ExportFailurePolicy::StopOnFirstError {
                            return Err(e);
                        }
                        tracing::warn!(
                            mcc = %mcc,
                            account = %account,
                            error = %e,
                            "account export failed, continuing"
                        );
                        failed.push(ExportFailure {
                            account,
                            failure: e.failure(),
                        });
                    }
                }
            }
        }
        tracing::info!(mcc = %mcc, template_id, failed = failed.len(), "requested PDF export");
        Ok(ExportOutcome { selection, failed })
    }

    /// Raw rows for the MCC, or concatenated rows for each listed account.
    ///
    /// # Errors
    ///
    /// Without accounts, any [`ClientError`] from the request. With accounts,
    /// any failure becomes `error_loading_report`.
    pub async fn report_rows(
        &self,
        kind: ReportKind,
        mcc: Ccid,
        accounts: &[Ccid],
        range: &DateRange,
    ) -> Result<ReportRows, ClientError> {
        if accounts.is_empty() {
            return self.client.report_rows(kind, mcc, None, range).await;
        }

        let mut rows = ReportRows::empty(kind);
        for &account in accounts {
            let page = self
                .client
                .report_rows(kind, mcc, Some(account), range)
                .await
                .map_err(|e| {
                    tracing::warn!(mcc = %mcc, account = %account, error = %e, "report fetch failed");
                    ClientError::Api(ApiFailure::new(
                        ErrorCode::ErrorLoadingReport,
                        format!("Can't get {kind} report for {account}: {e}"),
                    ))
                })?;
            rows.append(page);
        }
        Ok(rows)
    }
}

fn verified_key(mcc: Ccid) -> String {
    format!("{VERIFIED_PREFIX}{}", mcc.normalized())
}

fn range_failure(err: DateRangeError) -> ClientError {
    let failure = match err {
        DateRangeError::StartAfterEnd { .. } => ApiFailure::date_start_bigger(),
        DateRangeError::InFuture { .. } => ApiFailure::no_future_dates(),
        DateRangeError::Unparseable(input) => ApiFailure::new(
            ErrorCode::InvalidParams,
            format!("Unparseable date \"{input}\""),
        ),
    };
    ClientError::Api(failure)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        let client = ReportingClient::with_base_url("http://127.0.0.1:9").unwrap();
        Session::new(Arc::new(client))
    }

    fn ccid(raw: &str) -> Ccid {
        Ccid::parse(raw).unwrap()
    }

    #[test]
    fn key_value_store_ignores_empty_keys() {
        let s = session();
        s.store_value("", true);
        assert!(s.value_for_key("").is_none());

        s.store_value("theme", "dark");
        assert_eq!(s.value_for_key("theme"), Some(Value::from("dark")));
    }

    #[test]
    fn verified_flag_is_per_mcc() {
        let s = session();
        let a = ccid("123-456-7890");
        let b = ccid("111-222-3333");
        s.mark_verified(a);
        assert!(s.is_verified(a));
        assert!(!s.is_verified(b));
        assert_eq!(
            s.value_for_key("verified_loaded_1234567890"),
            Some(Value::Bool(true))
        );
    }

    #[test]
    fn public_templates_flag_starts_off() {
        let s = session();
        assert!(!s.can_edit_public_templates());
        s.enable_public_templates();
        assert!(s.can_edit_public_templates());
    }

    #[test]
    fn export_outcome_counts() {
        let outcome = ExportOutcome {
            selection: ExportSelection::Accounts(vec![ccid("1234567890"), ccid("1112223333")]),
            failed: vec![ExportFailure {
                account: ccid("1112223333"),
                failure: ApiFailure::no_such_mcc(),
            }],
        };
        assert_eq!(outcome.requested(), 2);
        assert_eq!(outcome.succeeded(), 1);

        let bulk = ExportOutcome {
            selection: ExportSelection::All,
            failed: Vec::new(),
        };
        assert_eq!(bulk.requested(), 1);
    }
}
