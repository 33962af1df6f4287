//! First visit to a newly added MCC: offer to pull its history.

use std::sync::Arc;

use awrc_client::{DataAvailability, Session};
use awrc_core::{onboarding_default_range, Ccid, Granularity};
use chrono::NaiveDate;

use crate::busy::BusyFlag;
use crate::error::{load_failure, ViewError};
use crate::routes::Route;

/// Result of checking a freshly added MCC.
#[derive(Debug, Clone, PartialEq)]
pub enum OnboardingStatus {
    /// Nothing downloaded and nothing queued; offer report generation.
    BrandNew,
    /// Data exists or is on its way; go to the account screen.
    Redirect(Route),
}

pub struct OnboardingScreen {
    session: Arc<Session>,
    mcc: Ccid,
    start: NaiveDate,
    end: NaiveDate,
    status: Option<OnboardingStatus>,
    busy: bool,
    error_text: Option<String>,
}

impl OnboardingScreen {
    /// Dates default to the year up to the first of `today`'s month.
    #[must_use]
    pub fn new(session: Arc<Session>, mcc: Ccid, today: NaiveDate) -> Self {
        let defaults = onboarding_default_range(today);
        Self {
            session,
            mcc,
            start: defaults.start(),
            end: defaults.end(),
            status: None,
            busy: false,
            error_text: None,
        }
    }

    #[must_use]
    pub fn dates(&self) -> (NaiveDate, NaiveDate) {
        (self.start, self.end)
    }

    pub fn set_dates(&mut self, start: NaiveDate, end: NaiveDate) {
        self.start = start;
        self.end = end;
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Status from the last successful [`OnboardingScreen::load`].
    #[must_use]
    pub fn status(&self) -> Option<&OnboardingStatus> {
        self.status.as_ref()
    }

    #[must_use]
    pub fn error_text(&self) -> Option<&str> {
        self.error_text.as_deref()
    }

    /// # Errors
    ///
    /// Returns [`ViewError::Client`] if availability cannot be fetched; the
    /// banner text is also recorded in [`OnboardingScreen::error_text`].
    pub async fn load(&mut self) -> Result<OnboardingStatus, ViewError> {
        let availability: DataAvailability = self
            .session
            .data_available(self.mcc, Granularity::Month)
            .await
            .inspect_err(|e| {
                self.error_text = Some(load_failure("Unable to check MCC status", e));
            })?;

        let status = if availability.is_brand_new() {
            OnboardingStatus::BrandNew
        } else {
            OnboardingStatus::Redirect(Route::Account(self.mcc))
        };
        self.status = Some(status.clone());
        Ok(status)
    }

    /// Starts the report download, then hands off to the account screen.
    ///
    /// # Errors
    ///
    /// - [`ViewError::NotLoaded`] before [`OnboardingScreen::load`] has
    ///   succeeded.
    /// - [`ViewError::AlreadyOnboarded`] when the MCC already has reports or
    ///   queued jobs.
    /// - [`ViewError::Busy`] while a request is in flight.
    /// - [`ViewError::Client`] with the user-facing text in
    ///   [`OnboardingScreen::error_text`].
    pub async fn generate(&mut self, today: NaiveDate) -> Result<Route, ViewError> {
        match self.status {
            None => return Err(ViewError::NotLoaded),
            Some(OnboardingStatus::Redirect(_)) => {
                return Err(ViewError::AlreadyOnboarded(self.mcc));
            }
            Some(OnboardingStatus::BrandNew) => {}
        }
        let result = {
            let _busy = BusyFlag::acquire(&mut self.busy)?;
            self.error_text = None;
            self.session
                .pull_reports(self.mcc, self.start, self.end, today)
                .await
        };

        match result {
            Ok(_) => Ok(Route::Account(self.mcc)),
            Err(e) => {
                self.error_text = Some(e.failure().report_pull_message());
                Err(e.into())
            }
        }
    }
}
