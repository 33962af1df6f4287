//! Account screen: is this MCC's data ready to use?
//!
//! Loading resolves the MCC then asks the backend for monthly report
//! availability and daily scorecard availability at the same time. The MCC
//! is `Ready` once reports exist and no processing jobs remain; otherwise the
//! caller can poll until the backend's job counters drain.

use std::sync::Arc;
use std::time::Duration;

use awrc_client::{ClientError, DataAvailability, Mcc, ReportKind, Session};
use awrc_core::{ApiFailure, Ccid, Granularity};
use chrono::NaiveDate;

use crate::poller::{poll_until, PollHandle, PollStep};

/// Readiness verdict for one availability snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    NoData { tasks_remaining: u32 },
}

impl Readiness {
    #[must_use]
    pub fn assess(availability: &DataAvailability) -> Self {
        if availability.has_reports() && availability.pending_process_tasks == 0 {
            Readiness::Ready
        } else {
            Readiness::NoData {
                tasks_remaining: availability.pending_process_tasks,
            }
        }
    }
}

/// What the account screen shows once its data is in.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSummary {
    pub mcc: Mcc,
    /// Month bounds of the downloaded account report.
    pub report_months: (Option<NaiveDate>, Option<NaiveDate>),
    /// Day bounds of the scorecard feed.
    pub scorecard_days: (Option<NaiveDate>, Option<NaiveDate>),
    pub availability: DataAvailability,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AccountState {
    Loading,
    NoData { mcc: Mcc, tasks_remaining: u32 },
    Error(ApiFailure),
    Ready(Box<AccountSummary>),
}

pub struct AccountScreen {
    session: Arc<Session>,
    mcc: Ccid,
    state: AccountState,
}

impl AccountScreen {
    #[must_use]
    pub fn new(session: Arc<Session>, mcc: Ccid) -> Self {
        Self {
            session,
            mcc,
            state: AccountState::Loading,
        }
    }

    #[must_use]
    pub fn mcc(&self) -> Ccid {
        self.mcc
    }

    #[must_use]
    pub fn state(&self) -> &AccountState {
        &self.state
    }

    /// Loads (or reloads) the screen. Failures land in
    /// [`AccountState::Error`] rather than being returned.
    pub async fn load(&mut self) -> &AccountState {
        self.state = AccountState::Loading;
        self.state = match self.fetch().await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(mcc = %self.mcc, error = %e, "account screen failed to load");
                AccountState::Error(e.failure())
            }
        };
        &self.state
    }

    async fn fetch(&self) -> Result<AccountState, ClientError> {
        let mcc = self.session.mcc_by_id(self.mcc).await?;
        let (monthly, daily) = tokio::try_join!(
            self.session.data_available(self.mcc, Granularity::Month),
            self.session.data_available(self.mcc, Granularity::Day),
        )?;

        Ok(match Readiness::assess(&monthly) {
            Readiness::NoData { tasks_remaining } => AccountState::NoData {
                mcc,
                tasks_remaining,
            },
            Readiness::Ready => {
                self.session.mark_verified(self.mcc);
                let report_months = monthly
                    .report(ReportKind::Account.availability_type())
                    .map_or((None, None), |r| r.bounds(Granularity::Month));
                let scorecard_days = daily
                    .kratus_available
                    .as_ref()
                    .map_or((None, None), |k| (k.start_day, k.end_day));
                AccountState::Ready(Box::new(AccountSummary {
                    mcc,
                    report_months,
                    scorecard_days,
                    availability: monthly,
                }))
            }
        })
    }

    /// Polls availability until reports exist and every pending job counter
    /// is zero, then marks the MCC verified.
    ///
    /// A snapshot with idle counters but no reports keeps polling, since the
    /// pull may not have been queued yet. The handle resolves exactly once
    /// with the final snapshot; reload the screen afterwards. Dropping the
    /// handle stops polling.
    #[must_use]
    pub fn wait_until_ready(&self, interval: Duration) -> PollHandle<DataAvailability> {
        watch_jobs(Arc::clone(&self.session), self.mcc, interval)
    }

    /// Waits for the backend to finish, then reloads.
    pub async fn load_when_ready(&mut self, interval: Duration) -> &AccountState {
        if matches!(self.state, AccountState::NoData { .. }) {
            // Resolves to None only if cancelled, which cannot happen here.
            let _ = self.wait_until_ready(interval).await;
        }
        self.load().await
    }
}

fn watch_jobs(session: Arc<Session>, mcc: Ccid, interval: Duration) -> PollHandle<DataAvailability> {
    poll_until(interval, move || {
        let session = Arc::clone(&session);
        async move {
            let availability = session.data_available(mcc, Granularity::Month).await?;
            let remaining = availability.pending_jobs();
            if remaining > 0 || !availability.has_reports() {
                return Ok::<_, ClientError>(PollStep::Pending(remaining));
            }
            session.mark_verified(mcc);
            tracing::info!(mcc = %mcc, "background jobs finished");
            Ok(PollStep::Done(availability))
        }
    })
}
