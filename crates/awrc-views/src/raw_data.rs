//! Raw data browser: tabular report rows for one sub-account.
//!
//! Each report kind has its own column set with its own visibility toggles,
//! and rows are paged client-side.

use std::collections::HashMap;
use std::sync::Arc;

use awrc_client::{Account, DataAvailability, Mcc, ReportKind, ReportRows, Session};
use awrc_core::{Ccid, DateRange, Granularity, ALLOWED_PAGE_SIZES};
use chrono::NaiveDate;

use crate::busy::BusyFlag;
use crate::error::{load_failure, ViewError};
use crate::routes::{Entry, Route};

const ACCOUNT_COLUMNS: &[(&str, bool)] = &[
    ("day", true),
    ("cost", true),
    ("clicks", true),
    ("impressions", true),
    ("ctr", true),
    ("avgCpm", true),
    ("avgCpc", true),
    ("avgPosition", false),
    ("conversions", false),
    ("searchImpressionShare", false),
    ("searchLostISBudget", false),
    ("searchLostISRank", false),
    ("contentImpressionShare", false),
    ("contentLostISBudget", false),
    ("contentLostISRank", false),
    ("currencyCode", false),
    ("adNetwork", false),
    ("conversionsManyPerClick", false),
    ("viewThroughConversions", false),
    ("timestamp", false),
    ("dateStart", false),
    ("dateEnd", false),
];

const CAMPAIGN_COLUMNS: &[(&str, bool)] = &[
    ("campaignId", true),
    ("campaignName", true),
    ("status", false),
    ("budget", true),
    ("accountDescriptiveName", false),
    ("currencyCode", false),
    ("day", false),
    ("cost", true),
    ("clicks", true),
    ("impressions", true),
    ("ctr", false),
    ("avgCpm", false),
    ("avgCpc", false),
    ("avgPosition", false),
    ("conversionsManyPerClick", false),
    ("conversions", false),
    ("viewThroughConversions", false),
    ("dateStart", false),
    ("dateEnd", false),
];

/// Column toggles, tracked independently per report kind.
#[derive(Debug, Clone, Default)]
pub struct ColumnVisibility {
    overrides: HashMap<(ReportKind, String), bool>,
}

impl ColumnVisibility {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Known columns of `kind`, in display order.
    #[must_use]
    pub fn columns(kind: ReportKind) -> impl Iterator<Item = &'static str> {
        defaults(kind).iter().map(|(name, _)| *name)
    }

    /// Columns not in the known set are shown.
    #[must_use]
    pub fn is_visible(&self, kind: ReportKind, column: &str) -> bool {
        if let Some(&shown) = self.overrides.get(&(kind, column.to_string())) {
            return shown;
        }
        defaults(kind)
            .iter()
            .find(|(name, _)| *name == column)
            .is_none_or(|(_, shown)| *shown)
    }

    pub fn set(&mut self, kind: ReportKind, column: &str, visible: bool) {
        self.overrides.insert((kind, column.to_string()), visible);
    }

    /// Flips one column of one kind; returns the new visibility.
    pub fn toggle(&mut self, kind: ReportKind, column: &str) -> bool {
        let visible = !self.is_visible(kind, column);
        self.set(kind, column, visible);
        visible
    }

    #[must_use]
    pub fn visible_columns(&self, kind: ReportKind) -> Vec<&'static str> {
        Self::columns(kind)
            .filter(|c| self.is_visible(kind, c))
            .collect()
    }

    /// `(column, visible)` pairs in groups of `size`, for laying out the
    /// toggle checkboxes.
    #[must_use]
    pub fn partitioned(&self, kind: ReportKind, size: usize) -> Vec<Vec<(&'static str, bool)>> {
        let all: Vec<_> = Self::columns(kind)
            .map(|c| (c, self.is_visible(kind, c)))
            .collect();
        all.chunks(size.max(1)).map(<[_]>::to_vec).collect()
    }
}

fn defaults(kind: ReportKind) -> &'static [(&'static str, bool)] {
    match kind {
        ReportKind::Account => ACCOUNT_COLUMNS,
        ReportKind::Campaign => CAMPAIGN_COLUMNS,
    }
}

/// Client-side pagination with 1-based pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page_size: usize,
    page: usize,
    total: usize,
}

impl Default for Paginator {
    fn default() -> Self {
        Self {
            page_size: ALLOWED_PAGE_SIZES[0],
            page: 1,
            total: 0,
        }
    }
}

impl Paginator {
    /// # Errors
    ///
    /// Returns [`ViewError::InvalidPageSize`] unless `page_size` is one of
    /// [`ALLOWED_PAGE_SIZES`].
    pub fn new(page_size: usize) -> Result<Self, ViewError> {
        let mut paginator = Self::default();
        paginator.set_page_size(page_size)?;
        Ok(paginator)
    }

    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    #[must_use]
    pub fn current_page(&self) -> usize {
        self.page
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// At least one, so an empty table still shows "page 1 of 1".
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.total.div_ceil(self.page_size).max(1)
    }

    /// Changing size keeps the first visible row on screen.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::InvalidPageSize`] for a size not on offer.
    pub fn set_page_size(&mut self, page_size: usize) -> Result<(), ViewError> {
        if !ALLOWED_PAGE_SIZES.contains(&page_size) {
            return Err(ViewError::InvalidPageSize(page_size));
        }
        let first_row = (self.page - 1) * self.page_size;
        self.page_size = page_size;
        self.go_to(first_row / page_size + 1);
        Ok(())
    }

    /// Sets the row count and returns to page 1.
    pub fn reset(&mut self, total: usize) {
        self.total = total;
        self.page = 1;
    }

    /// Clamped to `1..=page_count`.
    pub fn go_to(&mut self, page: usize) -> usize {
        self.page = page.clamp(1, self.page_count());
        self.page
    }

    pub fn next(&mut self) -> usize {
        self.go_to(self.page + 1)
    }

    pub fn prev(&mut self) -> usize {
        self.go_to(self.page.saturating_sub(1))
    }

    /// Row index range of the current page.
    #[must_use]
    pub fn range(&self) -> std::ops::Range<usize> {
        let start = ((self.page - 1) * self.page_size).min(self.total);
        let end = (start + self.page_size).min(self.total);
        start..end
    }

    /// The current page's slice of `items`.
    #[must_use]
    pub fn page<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let range = self.range();
        let end = range.end.min(items.len());
        items.get(range.start.min(end)..end).unwrap_or_default()
    }
}

/// Loaded reference data for the browser.
#[derive(Debug, Clone)]
pub struct RawDataInfo {
    pub mcc: Mcc,
    pub accounts: Vec<Account>,
    pub availability: DataAvailability,
}

pub struct RawDataScreen {
    session: Arc<Session>,
    mcc: Ccid,
    info: Option<RawDataInfo>,
    load_error: Option<String>,
    fetch_error: Option<String>,
    kind: ReportKind,
    account: Option<Ccid>,
    account_filter: String,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    columns: ColumnVisibility,
    paginator: Paginator,
    rows: Option<ReportRows>,
    busy: bool,
}

impl RawDataScreen {
    /// Opens the browser, or redirects to the account screen when the MCC's
    /// data has not been verified this session.
    #[must_use]
    pub fn open(session: Arc<Session>, mcc: Ccid, page_size: usize) -> Entry<Self> {
        if !session.is_verified(mcc) {
            return Entry::Redirect(Route::Account(mcc));
        }
        let paginator = Paginator::new(page_size).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default page size");
            Paginator::default()
        });
        Entry::Screen(Self {
            session,
            mcc,
            info: None,
            load_error: None,
            fetch_error: None,
            kind: ReportKind::Account,
            account: None,
            account_filter: String::new(),
            start: None,
            end: None,
            columns: ColumnVisibility::new(),
            paginator,
            rows: None,
            busy: false,
        })
    }

    /// Loads MCC info, daily availability, then live sub-accounts.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Client`] from the first failing stage; the
    /// banner is in [`RawDataScreen::load_error`].
    pub async fn load(&mut self) -> Result<&RawDataInfo, ViewError> {
        self.load_error = None;
        let mut stage = "Unable to load account info";
        let result = async {
            let mcc = self.session.mcc_by_id(self.mcc).await?;
            stage = "Unable to load available report dates";
            let availability = self.session.data_available(self.mcc, Granularity::Day).await?;
            stage = "Unable to load accounts for this MCC";
            let accounts = self.session.list_accounts(self.mcc, true).await?;
            Ok::<_, awrc_client::ClientError>(RawDataInfo {
                mcc,
                accounts,
                availability,
            })
        }
        .await;

        match result {
            Ok(info) => Ok(&*self.info.insert(info)),
            Err(e) => {
                self.load_error = Some(load_failure(stage, &e));
                Err(e.into())
            }
        }
    }

    #[must_use]
    pub fn info(&self) -> Option<&RawDataInfo> {
        self.info.as_ref()
    }

    #[must_use]
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    #[must_use]
    pub fn fetch_error(&self) -> Option<&str> {
        self.fetch_error.as_deref()
    }

    #[must_use]
    pub fn report_kind(&self) -> ReportKind {
        self.kind
    }

    /// Day bounds of the selected report kind.
    #[must_use]
    pub fn bounds(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        self.info
            .as_ref()
            .and_then(|i| i.availability.report(self.kind.availability_type()))
            .map_or((None, None), |r| r.bounds(Granularity::Day))
    }

    /// Switches report kind. Chosen dates outside the new bounds are
    /// cleared.
    pub fn set_report_kind(&mut self, kind: ReportKind) {
        self.kind = kind;
        let (min, max) = self.bounds();
        let before_min = matches!((self.start, min), (Some(s), Some(m)) if s < m);
        let after_max = matches!((self.end, max), (Some(e), Some(m)) if e > m);
        if before_min || after_max {
            self.reset_dates();
        }
    }

    /// Sub-accounts whose name or id matches the filter text.
    #[must_use]
    pub fn filtered_accounts(&self) -> Vec<&Account> {
        let Some(info) = &self.info else {
            return Vec::new();
        };
        info.accounts
            .iter()
            .filter(|a| account_matches(a, &self.account_filter))
            .collect()
    }

    pub fn set_account_filter(&mut self, text: &str) {
        self.account_filter = text.trim().to_string();
    }

    /// # Errors
    ///
    /// Returns [`ViewError::NotLoaded`] before [`RawDataScreen::load`], or
    /// [`ViewError::UnknownAccount`] for an id not under this MCC.
    pub fn select_account(&mut self, id: Ccid) -> Result<&Account, ViewError> {
        let info = self.info.as_ref().ok_or(ViewError::NotLoaded)?;
        let account = info
            .accounts
            .iter()
            .find(|a| a.id == id)
            .ok_or(ViewError::UnknownAccount(id))?;
        self.account = Some(id);
        self.account_filter = account
            .name
            .clone()
            .unwrap_or_else(|| account.id.to_string());
        Ok(account)
    }

    #[must_use]
    pub fn selected_account(&self) -> Option<Ccid> {
        self.account
    }

    pub fn reset_account(&mut self) {
        self.account = None;
        self.account_filter.clear();
    }

    pub fn set_dates(&mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) {
        self.start = start;
        self.end = end;
    }

    pub fn reset_dates(&mut self) {
        self.start = None;
        self.end = None;
    }

    /// Both dates chosen and `start <= end`.
    #[must_use]
    pub fn valid_date_range(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if s <= e)
    }

    /// Clears account, dates and report kind.
    pub fn reset_settings(&mut self) {
        self.reset_account();
        self.reset_dates();
        self.kind = ReportKind::Account;
    }

    #[must_use]
    pub fn columns(&self) -> &ColumnVisibility {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut ColumnVisibility {
        &mut self.columns
    }

    #[must_use]
    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    pub fn paginator_mut(&mut self) -> &mut Paginator {
        &mut self.paginator
    }

    #[must_use]
    pub fn rows(&self) -> Option<&ReportRows> {
        self.rows.as_ref()
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Fetches rows for the selected account, kind and range, sorts them by
    /// the kind's default column and returns to page 1.
    ///
    /// # Errors
    ///
    /// - [`ViewError::NoAccountSelected`] or [`ViewError::InvalidDateRange`]
    ///   when the form is incomplete.
    /// - [`ViewError::Busy`] while a fetch is in flight.
    /// - [`ViewError::Client`] when the backend fails; the banner is in
    ///   [`RawDataScreen::fetch_error`].
    pub async fn fetch(&mut self) -> Result<&ReportRows, ViewError> {
        let account = self.account.ok_or(ViewError::NoAccountSelected)?;
        let range = match (self.start, self.end) {
            (Some(start), Some(end)) => {
                DateRange::new(start, end).map_err(|e| ViewError::InvalidDateRange {
                    reason: e.to_string(),
                })?
            }
            _ => {
                return Err(ViewError::InvalidDateRange {
                    reason: "choose both a start and an end date".to_string(),
                })
            }
        };
        let result = {
            let _busy = BusyFlag::acquire(&mut self.busy)?;
            self.fetch_error = None;
            self.session
                .report_rows(self.kind, self.mcc, &[account], &range)
                .await
        };

        match result {
            Ok(mut rows) => {
                rows.sort_default();
                self.paginator.reset(rows.len());
                tracing::debug!(mcc = %self.mcc, account = %account, rows = rows.len(), "fetched raw rows");
                Ok(&*self.rows.insert(rows))
            }
            Err(e) => {
                self.fetch_error = Some(e.failure().describe("Unable to load report data"));
                Err(e.into())
            }
        }
    }

    /// Visible cells of the current page, one `Vec` per row.
    #[must_use]
    pub fn page_cells(&self) -> Vec<Vec<String>> {
        let Some(rows) = &self.rows else {
            return Vec::new();
        };
        let columns = self.columns.visible_columns(rows.kind());
        self.paginator
            .range()
            .map(|i| {
                columns
                    .iter()
                    .map(|c| rows.cell(i, c).unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}

fn account_matches(account: &Account, filter: &str) -> bool {
    if filter.is_empty() {
        return true;
    }
    let needle = filter.to_lowercase();
    let digits: String = filter.chars().filter(char::is_ascii_digit).collect();
    account
        .name
        .as_deref()
        .is_some_and(|n| n.to_lowercase().contains(&needle))
        || account.id.formatted().contains(filter)
        || (!digits.is_empty() && account.id.normalized().to_string().contains(&digits))
}

#[cfg(test)]
#[path = "raw_data_test.rs"]
mod tests;
