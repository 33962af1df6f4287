//! Serde types for the reporting backend's JSON payloads.
//!
//! The backend is loose about numeric encodings (ids as numbers or strings,
//! percentages as `"12.5%"`, dates as strings or epoch millis), so the
//! deserializers here accept every shape it has been seen to emit and
//! degrade to `None` instead of failing a whole page of rows.

use std::collections::BTreeMap;
use std::str::FromStr;

use awrc_core::{parse_wire_date, ApiFailure, Ccid, ErrorCode, Granularity};
use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// A top-level MCC ("account group") the user has authorised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mcc {
    pub top_account_id: Ccid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub date_time_zone: Option<String>,
    #[serde(default)]
    pub can_manage_clients: Option<bool>,
}

impl Mcc {
    /// The MCC's name, or `"<formatted id> (Unknown Name)"` when the backend
    /// has none on record.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("{} (Unknown Name)", self.top_account_id),
        }
    }
}

/// A managed sub-account under an MCC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Ccid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub date_time_zone: Option<String>,
    #[serde(default)]
    pub can_manage_clients: Option<bool>,
}

impl Account {
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    /// `"<name> (<formatted id>)"`, the label used in account pickers.
    #[must_use]
    pub fn label(&self) -> String {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => format!("{name} ({})", self.id),
            _ => self.id.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// A stored HTML report template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub template_name: String,
    #[serde(default)]
    pub template_description: String,
    #[serde(default)]
    pub template_html: String,
    #[serde(default)]
    pub is_public: bool,
}

/// The editable part of a template, as submitted on save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateDraft {
    pub name: String,
    pub description: String,
    pub html: String,
    pub is_public: bool,
}

impl TemplateDraft {
    /// Client-side checks in the order the backend applies them.
    ///
    /// # Errors
    ///
    /// Returns `missing_name`, `missing_description` or `missing_body` for the
    /// first blank field.
    pub fn validate(&self) -> Result<(), ApiFailure> {
        if self.name.trim().is_empty() {
            return Err(ApiFailure::missing("name"));
        }
        if self.description.trim().is_empty() {
            return Err(ApiFailure::missing("description"));
        }
        if self.html.trim().is_empty() {
            return Err(ApiFailure::missing("body"));
        }
        Ok(())
    }
}

impl From<&Template> for TemplateDraft {
    fn from(t: &Template) -> Self {
        Self {
            name: t.template_name.clone(),
            description: t.template_description.clone(),
            html: t.template_html.clone(),
            is_public: t.is_public,
        }
    }
}

/// Wire body for `POST`/`PUT /template`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TemplatePayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub template_name: &'a str,
    pub template_description: &'a str,
    pub template_html: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

// ---------------------------------------------------------------------------
// Availability
// ---------------------------------------------------------------------------

/// Response of `GET /mcc/:id/dataavailable`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DataAvailability {
    #[serde(default)]
    pub reports_available: Vec<ReportAvailability>,
    #[serde(default)]
    pub pending_process_tasks: u32,
    #[serde(default)]
    pub pending_export_tasks: u32,
    #[serde(default)]
    pub pending_refresh_accounts_tasks: u32,
    #[serde(default)]
    pub kratus_available: Option<KratuAvailability>,
}

impl DataAvailability {
    #[must_use]
    pub fn has_reports(&self) -> bool {
        !self.reports_available.is_empty()
    }

    /// Sum of every pending background job counter.
    #[must_use]
    pub fn pending_jobs(&self) -> u32 {
        self.pending_process_tasks
            .saturating_add(self.pending_export_tasks)
            .saturating_add(self.pending_refresh_accounts_tasks)
    }

    /// No reports yet and nothing queued: the MCC was never pulled.
    #[must_use]
    pub fn is_brand_new(&self) -> bool {
        !self.has_reports() && self.pending_jobs() == 0
    }

    /// Availability entry for a report type such as `ReportAccount`.
    #[must_use]
    pub fn report(&self, report_type: &str) -> Option<&ReportAvailability> {
        self.reports_available
            .iter()
            .find(|r| r.report_type == report_type)
    }
}

/// Date bounds of one downloaded report type.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReportAvailability {
    #[serde(rename = "ReportType")]
    pub report_type: String,
    #[serde(rename = "startMonth", default, deserialize_with = "lenient_date")]
    pub start_month: Option<NaiveDate>,
    #[serde(rename = "endMonth", default, deserialize_with = "lenient_date")]
    pub end_month: Option<NaiveDate>,
    #[serde(rename = "startDay", default, deserialize_with = "lenient_date")]
    pub start_day: Option<NaiveDate>,
    #[serde(rename = "endDay", default, deserialize_with = "lenient_date")]
    pub end_day: Option<NaiveDate>,
}

impl ReportAvailability {
    /// `(min, max)` for the given granularity.
    ///
    /// Day-level queries sometimes come back with the bounds under the month
    /// keys, so those are used as a fallback.
    #[must_use]
    pub fn bounds(&self, granularity: Granularity) -> (Option<NaiveDate>, Option<NaiveDate>) {
        match granularity {
            Granularity::Month => (self.start_month, self.end_month),
            Granularity::Day => (
                self.start_day.or(self.start_month),
                self.end_day.or(self.end_month),
            ),
        }
    }
}

/// Day bounds of the scorecard data feed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct KratuAvailability {
    #[serde(rename = "startDay", default, deserialize_with = "lenient_date")]
    pub start_day: Option<NaiveDate>,
    #[serde(rename = "endDay", default, deserialize_with = "lenient_date")]
    pub end_day: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Report rows
// ---------------------------------------------------------------------------

/// Which report table to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReportKind {
    #[default]
    Account,
    Campaign,
}

impl ReportKind {
    pub const ALL: [ReportKind; 2] = [ReportKind::Account, ReportKind::Campaign];

    /// Path segment under `/mcc/:id/`.
    #[must_use]
    pub fn endpoint(self) -> &'static str {
        match self {
            ReportKind::Account => "reportaccount",
            ReportKind::Campaign => "reportcampaign",
        }
    }

    /// Name in the availability payload's `ReportType` field.
    #[must_use]
    pub fn availability_type(self) -> &'static str {
        match self {
            ReportKind::Account => "ReportAccount",
            ReportKind::Campaign => "ReportCampaign",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::Account => "account",
            ReportKind::Campaign => "campaign",
        }
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = ApiFailure;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "account" | "reportaccount" => Ok(ReportKind::Account),
            "campaign" | "reportcampaign" => Ok(ReportKind::Campaign),
            other => Err(ApiFailure::new(
                ErrorCode::NoSuchReport,
                format!("No report named \"{other}\""),
            )),
        }
    }
}

/// One row of the account-level performance report.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountReportRow {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub account_id: Option<u64>,
    #[serde(default)]
    pub account_descriptive_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub day: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub cost: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub clicks: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub impressions: Option<u64>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub ctr: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub avg_cpm: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub avg_cpc: Option<Decimal>,
    /// Every other column, kept verbatim for display.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One row of the campaign-level performance report.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignReportRow {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub account_id: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub campaign_id: Option<u64>,
    #[serde(default)]
    pub campaign_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub budget: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub cost: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub clicks: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub impressions: Option<u64>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub day: Option<NaiveDate>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl AccountReportRow {
    /// Display text for a column; unknown or absent columns render empty.
    #[must_use]
    pub fn cell(&self, column: &str) -> String {
        match column {
            "accountId" => opt(self.account_id),
            "accountDescriptiveName" => self.account_descriptive_name.clone().unwrap_or_default(),
            "day" => opt(self.day),
            "cost" => opt(self.cost),
            "clicks" => opt(self.clicks),
            "impressions" => opt(self.impressions),
            "ctr" => opt(self.ctr),
            "avgCpm" => opt(self.avg_cpm),
            "avgCpc" => opt(self.avg_cpc),
            other => render_value(self.extra.get(other)),
        }
    }
}

impl CampaignReportRow {
    #[must_use]
    pub fn cell(&self, column: &str) -> String {
        match column {
            "accountId" => opt(self.account_id),
            "campaignId" => opt(self.campaign_id),
            "campaignName" => self.campaign_name.clone().unwrap_or_default(),
            "budget" => opt(self.budget),
            "cost" => opt(self.cost),
            "clicks" => opt(self.clicks),
            "impressions" => opt(self.impressions),
            "day" => opt(self.day),
            other => render_value(self.extra.get(other)),
        }
    }
}

/// Rows of either report kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportRows {
    Account(Vec<AccountReportRow>),
    Campaign(Vec<CampaignReportRow>),
}

impl ReportRows {
    #[must_use]
    pub fn empty(kind: ReportKind) -> Self {
        match kind {
            ReportKind::Account => ReportRows::Account(Vec::new()),
            ReportKind::Campaign => ReportRows::Campaign(Vec::new()),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ReportKind {
        match self {
            ReportRows::Account(_) => ReportKind::Account,
            ReportRows::Campaign(_) => ReportKind::Campaign,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            ReportRows::Account(rows) => rows.len(),
            ReportRows::Campaign(rows) => rows.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Display text for `column` of the row at `index`.
    #[must_use]
    pub fn cell(&self, index: usize, column: &str) -> Option<String> {
        match self {
            ReportRows::Account(rows) => rows.get(index).map(|r| r.cell(column)),
            ReportRows::Campaign(rows) => rows.get(index).map(|r| r.cell(column)),
        }
    }

    /// Appends rows of the same kind; rows of another kind are ignored.
    pub fn append(&mut self, other: ReportRows) {
        match (self, other) {
            (ReportRows::Account(a), ReportRows::Account(b)) => a.extend(b),
            (ReportRows::Campaign(a), ReportRows::Campaign(b)) => a.extend(b),
            (this, other) => tracing::warn!(
                into = %this.kind(),
                from = %other.kind(),
                "dropping report rows of mismatched kind"
            ),
        }
    }

    /// Default ordering: account rows by day, campaign rows by campaign id,
    /// both ascending with missing values first.
    pub fn sort_default(&mut self) {
        match self {
            ReportRows::Account(rows) => rows.sort_by_key(|r| r.day),
            ReportRows::Campaign(rows) => rows.sort_by_key(|r| r.campaign_id),
        }
    }
}

fn opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn render_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Lenient deserializers
// ---------------------------------------------------------------------------

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => parse_wire_date(&s),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| dt.date_naive()),
        _ => None,
    })
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => {
            let digits: String = s.chars().filter(char::is_ascii_digit).collect();
            digits.parse().ok()
        }
        _ => None,
    })
}

fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        Some(Value::String(s)) => {
            let trimmed = s.trim().trim_end_matches('%').replace(',', "");
            Decimal::from_str(trimmed.trim()).ok()
        }
        _ => None,
    })
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
