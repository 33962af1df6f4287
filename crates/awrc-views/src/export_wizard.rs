//! PDF export wizard.
//!
//! The wizard walks through account choice, template choice and a month
//! range before submitting. Each step carries everything chosen so far, so a
//! step can only be reached with its prerequisites in hand.

use std::sync::Arc;
use std::time::Duration;

use awrc_client::{
    Account, ClientError, DataAvailability, ExportFailurePolicy, ExportOutcome, ExportSelection,
    Mcc, ReportKind, Session, Template,
};
use awrc_core::{Ccid, DateRange, Granularity};
use chrono::{Datelike, NaiveDate};

use crate::busy::BusyFlag;
use crate::error::{load_failure, ViewError, WizardError};
use crate::poller::{poll_until, PollHandle, PollStep};
use crate::routes::{Entry, Route};

/// Accounts an export covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountChoice {
    All,
    Selected(Vec<Ccid>),
}

impl AccountChoice {
    fn selection(&self) -> ExportSelection {
        match self {
            AccountChoice::All => ExportSelection::All,
            AccountChoice::Selected(ids) => ExportSelection::Accounts(ids.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WizardStep {
    ChooseAccount,
    ChooseTemplate {
        accounts: AccountChoice,
    },
    ChooseDateRange {
        accounts: AccountChoice,
        template: Template,
    },
    Confirm {
        accounts: AccountChoice,
        template: Template,
        range: DateRange,
    },
    Exporting {
        outcome: ExportOutcome,
    },
    Done {
        outcome: ExportOutcome,
    },
}

impl WizardStep {
    fn name(&self) -> &'static str {
        match self {
            WizardStep::ChooseAccount => "choosing accounts",
            WizardStep::ChooseTemplate { .. } => "choosing a template",
            WizardStep::ChooseDateRange { .. } => "choosing dates",
            WizardStep::Confirm { .. } => "confirming",
            WizardStep::Exporting { .. } => "exporting",
            WizardStep::Done { .. } => "done",
        }
    }
}

/// Two-list account picker: unselected accounts on one side, selected on
/// the other, with a text filter over the unselected side.
#[derive(Debug, Clone, Default)]
pub struct AccountPicker {
    all: Vec<Account>,
    source: Vec<Account>,
    selected: Vec<Account>,
    filter: String,
}

impl AccountPicker {
    #[must_use]
    pub fn new(accounts: Vec<Account>) -> Self {
        Self {
            source: accounts.clone(),
            all: accounts,
            selected: Vec::new(),
            filter: String::new(),
        }
    }

    pub fn set_filter(&mut self, text: &str) {
        self.filter = text.trim().to_lowercase();
    }

    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Unselected accounts matching the filter.
    #[must_use]
    pub fn matches(&self) -> Vec<&Account> {
        self.source
            .iter()
            .filter(|a| self.is_match(a))
            .collect()
    }

    #[must_use]
    pub fn selected(&self) -> &[Account] {
        &self.selected
    }

    /// Moves every current match to the selected list and clears the filter.
    /// Returns how many moved.
    pub fn shift_matches(&mut self) -> usize {
        let (moved, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.source)
            .into_iter()
            .partition(|a| self.is_match(a));
        self.source = kept;
        let count = moved.len();
        self.selected.extend(moved);
        self.filter.clear();
        count
    }

    /// Moves one account to the selected list.
    ///
    /// # Errors
    ///
    /// Returns [`WizardError::UnknownAccount`] if the id is not among the
    /// unselected accounts.
    pub fn select(&mut self, id: Ccid) -> Result<(), WizardError> {
        let index = self
            .source
            .iter()
            .position(|a| a.id == id)
            .ok_or(WizardError::UnknownAccount(id))?;
        let account = self.source.remove(index);
        self.selected.push(account);
        Ok(())
    }

    /// Moves one account back to the unselected list, in original order.
    ///
    /// # Errors
    ///
    /// Returns [`WizardError::UnknownAccount`] if the id is not selected.
    pub fn deselect(&mut self, id: Ccid) -> Result<(), WizardError> {
        let index = self
            .selected
            .iter()
            .position(|a| a.id == id)
            .ok_or(WizardError::UnknownAccount(id))?;
        self.selected.remove(index);
        let selected = &self.selected;
        self.source = self
            .all
            .iter()
            .filter(|a| !selected.iter().any(|s| s.id == a.id))
            .cloned()
            .collect();
        Ok(())
    }

    /// Puts every account back on the unselected side.
    pub fn reset_matches(&mut self) {
        self.source = self.all.clone();
        self.selected.clear();
        self.filter.clear();
    }

    /// The picked set; every account picked collapses to
    /// [`AccountChoice::All`].
    #[must_use]
    pub fn choice(&self) -> Option<AccountChoice> {
        if self.selected.is_empty() {
            None
        } else if self.selected.len() == self.all.len() {
            Some(AccountChoice::All)
        } else {
            Some(AccountChoice::Selected(
                self.selected.iter().map(|a| a.id).collect(),
            ))
        }
    }

    fn is_match(&self, account: &Account) -> bool {
        if self.filter.is_empty() {
            return true;
        }
        account
            .name
            .as_deref()
            .is_some_and(|n| n.to_lowercase().contains(&self.filter))
            || account.id.formatted().contains(&self.filter)
            || account.id.normalized().to_string().contains(&self.filter)
    }
}

/// Reference data the wizard works from.
#[derive(Debug, Clone)]
pub struct WizardData {
    pub mcc: Mcc,
    pub templates: Vec<Template>,
    pub accounts: Vec<Account>,
    /// Month bounds of the downloaded account report.
    pub month_bounds: (Option<NaiveDate>, Option<NaiveDate>),
    /// Latest monthly availability snapshot; its job counters gate submission.
    pub availability: DataAvailability,
}

impl WizardData {
    /// Processing and export jobs that must drain before an export is sent.
    #[must_use]
    pub fn blocking_jobs(&self) -> u32 {
        self.availability
            .pending_process_tasks
            .saturating_add(self.availability.pending_export_tasks)
    }
}

pub struct ExportWizard {
    session: Arc<Session>,
    mcc: Ccid,
    data: Option<WizardData>,
    load_error: Option<String>,
    picker: AccountPicker,
    step: WizardStep,
    busy: bool,
}

impl ExportWizard {
    /// Opens the wizard, or redirects to the account screen when the MCC's
    /// data has not been verified this session.
    #[must_use]
    pub fn open(session: Arc<Session>, mcc: Ccid) -> Entry<Self> {
        if !session.is_verified(mcc) {
            return Entry::Redirect(Route::Account(mcc));
        }
        Entry::Screen(Self {
            session,
            mcc,
            data: None,
            load_error: None,
            picker: AccountPicker::default(),
            step: WizardStep::ChooseAccount,
            busy: false,
        })
    }

    /// Loads MCC info, templates, live sub-accounts and monthly availability,
    /// in that order.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Client`] from the first failing stage; the
    /// banner is in [`ExportWizard::load_error`].
    pub async fn load(&mut self) -> Result<&WizardData, ViewError> {
        self.load_error = None;
        let mut stage = "Unable to load account info";
        let result = async {
            let mcc = self.session.mcc_by_id(self.mcc).await?;
            stage = "Unable to load templates";
            let templates = self.session.list_templates(true).await?;
            stage = "Unable to load accounts for this MCC";
            let accounts = self.session.list_accounts(self.mcc, true).await?;
            stage = "Unable to determine which account reports are available";
            let availability = self
                .session
                .data_available(self.mcc, Granularity::Month)
                .await?;
            let month_bounds = availability
                .report(ReportKind::Account.availability_type())
                .map_or((None, None), |r| r.bounds(Granularity::Month));
            Ok::<_, ClientError>(WizardData {
                mcc,
                templates,
                accounts,
                month_bounds,
                availability,
            })
        }
        .await;

        match result {
            Ok(data) => {
                self.picker = AccountPicker::new(data.accounts.clone());
                self.step = WizardStep::ChooseAccount;
                Ok(&*self.data.insert(data))
            }
            Err(e) => {
                self.load_error = Some(load_failure(stage, &e));
                Err(e.into())
            }
        }
    }

    #[must_use]
    pub fn data(&self) -> Option<&WizardData> {
        self.data.as_ref()
    }

    #[must_use]
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    #[must_use]
    pub fn step(&self) -> &WizardStep {
        &self.step
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    #[must_use]
    pub fn picker(&self) -> &AccountPicker {
        &self.picker
    }

    pub fn picker_mut(&mut self) -> &mut AccountPicker {
        &mut self.picker
    }

    /// Exports every account of the MCC.
    ///
    /// # Errors
    ///
    /// Returns [`WizardError::OutOfOrder`] outside the account step.
    pub fn choose_all_accounts(&mut self) -> Result<(), WizardError> {
        self.expect_step(
            |s| matches!(s, WizardStep::ChooseAccount),
            "choose accounts",
        )?;
        self.step = WizardStep::ChooseTemplate {
            accounts: AccountChoice::All,
        };
        Ok(())
    }

    /// Exports the accounts picked in the [`AccountPicker`].
    ///
    /// # Errors
    ///
    /// Returns [`WizardError::NoAccountSelected`] when nothing is picked, or
    /// [`WizardError::OutOfOrder`] outside the account step.
    pub fn choose_selected_accounts(&mut self) -> Result<(), WizardError> {
        self.expect_step(
            |s| matches!(s, WizardStep::ChooseAccount),
            "choose accounts",
        )?;
        let accounts = self.picker.choice().ok_or(WizardError::NoAccountSelected)?;
        self.step = WizardStep::ChooseTemplate { accounts };
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`WizardError::UnknownTemplate`] for an id not in the loaded
    /// list, or [`WizardError::OutOfOrder`] outside the template step.
    pub fn choose_template(&mut self, id: i64) -> Result<(), WizardError> {
        let WizardStep::ChooseTemplate { accounts } = &self.step else {
            return Err(self.out_of_order("choose a template"));
        };
        let template = self
            .data
            .as_ref()
            .and_then(|d| d.templates.iter().find(|t| t.id == Some(id)))
            .cloned()
            .ok_or(WizardError::UnknownTemplate(id))?;
        self.step = WizardStep::ChooseDateRange {
            accounts: accounts.clone(),
            template,
        };
        Ok(())
    }

    /// Sets the month range. Either date may be any day of its month.
    ///
    /// # Errors
    ///
    /// Returns [`WizardError::InvalidDateRange`] when `start > end` or the
    /// range leaves the downloaded months, or [`WizardError::OutOfOrder`]
    /// outside the date step.
    pub fn choose_dates(&mut self, start: NaiveDate, end: NaiveDate) -> Result<(), WizardError> {
        let WizardStep::ChooseDateRange { accounts, template } = &self.step else {
            return Err(self.out_of_order("choose dates"));
        };
        let range = DateRange::new(start, end).map_err(|e| WizardError::InvalidDateRange {
            reason: e.to_string(),
        })?;
        if let Some(data) = &self.data {
            let (min, max) = data.month_bounds;
            let months = DateRange::new(first_of_month(start), first_of_month(end))
                .map_err(|e| WizardError::InvalidDateRange {
                    reason: e.to_string(),
                })?;
            if !months.within(min.map(first_of_month), max.map(first_of_month)) {
                return Err(WizardError::InvalidDateRange {
                    reason: format!(
                        "reports are only available from {} to {}",
                        display_bound(min),
                        display_bound(max)
                    ),
                });
            }
        }
        self.step = WizardStep::Confirm {
            accounts: accounts.clone(),
            template: template.clone(),
            range,
        };
        Ok(())
    }

    /// Goes back from confirmation to date choice.
    ///
    /// # Errors
    ///
    /// Returns [`WizardError::OutOfOrder`] outside the confirm step.
    pub fn reset_dates(&mut self) -> Result<(), WizardError> {
        let WizardStep::Confirm {
            accounts, template, ..
        } = &self.step
        else {
            return Err(self.out_of_order("reset dates"));
        };
        self.step = WizardStep::ChooseDateRange {
            accounts: accounts.clone(),
            template: template.clone(),
        };
        Ok(())
    }

    /// Abandons the current choices and returns to the account step.
    pub fn restart(&mut self) {
        if !self.busy {
            self.picker.reset_matches();
            self.step = WizardStep::ChooseAccount;
        }
    }

    /// Submits the export. Only reachable from the confirm step, only once
    /// at a time, and only while no processing or export jobs are pending.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Wizard`] out of order or while jobs are pending,
    /// [`ViewError::Busy`] while a submission is running, or
    /// [`ViewError::Client`] when the request fails; the wizard then stays on
    /// the confirm step.
    pub async fn submit(
        &mut self,
        policy: ExportFailurePolicy,
    ) -> Result<ExportOutcome, ViewError> {
        let WizardStep::Confirm {
            accounts,
            template,
            range,
        } = &self.step
        else {
            return Err(self.out_of_order("submit").into());
        };
        let template_id = template.id.ok_or(WizardError::NoTemplateSelected)?;
        let selection = accounts.selection();
        let range = *range;
        let remaining = self.data.as_ref().ok_or(ViewError::NotLoaded)?.blocking_jobs();
        if remaining > 0 {
            return Err(WizardError::JobsPending { remaining }.into());
        }

        let result = {
            let _busy = BusyFlag::acquire(&mut self.busy)?;
            self.session
                .export_pdfs(self.mcc, &range, template_id, selection, policy)
                .await
        };

        let outcome = result?;
        if !outcome.failed.is_empty() {
            tracing::warn!(
                mcc = %self.mcc,
                failed = outcome.failed.len(),
                requested = outcome.requested(),
                "some exports were not queued"
            );
        }
        self.step = WizardStep::Exporting {
            outcome: outcome.clone(),
        };
        Ok(outcome)
    }

    /// Polls until the backend's export queue is empty; resolves with the
    /// final availability snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`WizardError::OutOfOrder`] unless exports were submitted.
    pub fn track_exports(
        &self,
        interval: Duration,
    ) -> Result<PollHandle<DataAvailability>, WizardError> {
        if !matches!(self.step, WizardStep::Exporting { .. }) {
            return Err(self.out_of_order("track exports"));
        }
        let session = Arc::clone(&self.session);
        let mcc = self.mcc;
        Ok(poll_until(interval, move || {
            let session = Arc::clone(&session);
            async move {
                session
                    .data_available(mcc, Granularity::Month)
                    .await
                    .map(|a| {
                        let pending = a.pending_export_tasks;
                        if pending == 0 {
                            PollStep::Done(a)
                        } else {
                            PollStep::Pending(pending)
                        }
                    })
            }
        }))
    }

    /// Waits for the export queue to drain and moves to [`WizardStep::Done`].
    /// The drained snapshot replaces the one taken at load.
    ///
    /// # Errors
    ///
    /// Returns [`WizardError::OutOfOrder`] unless exports were submitted.
    pub async fn wait_for_exports(&mut self, interval: Duration) -> Result<(), WizardError> {
        let drained = self.track_exports(interval)?.await;
        if let (Some(data), Some(availability)) = (self.data.as_mut(), drained) {
            data.availability = availability;
        }
        self.finish();
        tracing::info!(mcc = %self.mcc, "exports finished");
        Ok(())
    }

    fn finish(&mut self) {
        let step = std::mem::replace(&mut self.step, WizardStep::ChooseAccount);
        self.step = match step {
            WizardStep::Exporting { outcome } => WizardStep::Done { outcome },
            other => other,
        };
    }

    fn expect_step(
        &self,
        ok: impl Fn(&WizardStep) -> bool,
        action: &'static str,
    ) -> Result<(), WizardError> {
        if ok(&self.step) {
            Ok(())
        } else {
            Err(self.out_of_order(action))
        }
    }

    fn out_of_order(&self, action: &'static str) -> WizardError {
        WizardError::OutOfOrder {
            step: self.step.name(),
            action,
        }
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn display_bound(bound: Option<NaiveDate>) -> String {
    bound.map_or_else(|| "?".to_string(), |d| d.format("%m-%Y").to_string())
}

#[cfg(test)]
#[path = "export_wizard_test.rs"]
mod tests;
