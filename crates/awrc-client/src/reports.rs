//! Availability, report generation, PDF export and raw row endpoints.

use awrc_core::{Ccid, DateRange, Granularity};
use reqwest::{Method, Url};
use serde_json::Value;

use crate::client::ReportingClient;
use crate::error::ClientError;
use crate::types::{AccountReportRow, CampaignReportRow, DataAvailability, ReportKind, ReportRows};

/// Output format of a report preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviewFormat {
    #[default]
    Pdf,
    Html,
}

impl PreviewFormat {
    fn as_param(self) -> &'static str {
        match self {
            PreviewFormat::Pdf => "pdf",
            PreviewFormat::Html => "html",
        }
    }
}

impl ReportingClient {
    /// Data availability and pending job counters for an MCC.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Api`] if the backend reports a failure.
    /// - [`ClientError::Http`] on network failure.
    /// - [`ClientError::Deserialize`] if the body does not match.
    pub async fn data_available(
        &self,
        mcc: Ccid,
        granularity: Granularity,
    ) -> Result<DataAvailability, ClientError> {
        let url = self.build_url(
            &["mcc", &mcc.normalized().to_string(), "dataavailable"],
            &[("dateRangeType", granularity.as_param())],
        )?;
        self.get_json(url, "data availability").await
    }

    /// Queues report downloads for every account of the MCC over `range`.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Api`] if the backend rejects the range.
    /// - [`ClientError::Http`] on network failure.
    pub async fn generate_reports(&self, mcc: Ccid, range: &DateRange) -> Result<(), ClientError> {
        let (start, end) = range.day_params();
        let url = self.build_url(
            &["mcc", &mcc.normalized().to_string(), "generatereports"],
            &[("dateStart", &start), ("dateEnd", &end)],
        )?;
        self.send_value(Method::GET, url, None::<&()>, "generate reports")
            .await?;
        Ok(())
    }

    /// Queues PDF exports for every account of the MCC.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Api`] if the backend rejects the request.
    /// - [`ClientError::Http`] on network failure.
    pub async fn export_reports(
        &self,
        mcc: Ccid,
        range: &DateRange,
        template_id: i64,
    ) -> Result<(), ClientError> {
        let url = self.export_url(mcc, None, range, template_id)?;
        self.send_value(Method::GET, url, None::<&()>, "export reports")
            .await?;
        Ok(())
    }

    /// Queues a PDF export for a single sub-account.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Api`] if the backend rejects the request.
    /// - [`ClientError::Http`] on network failure.
    pub async fn export_account_report(
        &self,
        mcc: Ccid,
        account: Ccid,
        range: &DateRange,
        template_id: i64,
    ) -> Result<(), ClientError> {
        let url = self.export_url(mcc, Some(account), range, template_id)?;
        self.send_value(Method::GET, url, None::<&()>, "export account report")
            .await?;
        Ok(())
    }

    /// Raw report rows over a day range, MCC-wide or for one account.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Api`] if the backend reports a failure.
    /// - [`ClientError::Http`] on network failure.
    /// - [`ClientError::Deserialize`] if the body is not a row array.
    pub async fn report_rows(
        &self,
        kind: ReportKind,
        mcc: Ccid,
        account: Option<Ccid>,
        range: &DateRange,
    ) -> Result<ReportRows, ClientError> {
        let mcc_id = mcc.normalized().to_string();
        let account_id = account.map(|a| a.normalized().to_string());
        let mut segments = vec!["mcc", mcc_id.as_str(), kind.endpoint()];
        if let Some(account_id) = account_id.as_deref() {
            segments.push(account_id);
        }

        let (start, end) = range.day_params();
        let url = self.build_url(&segments, &[("dateStart", &start), ("dateEnd", &end)])?;
        let context = format!("{kind} report rows");

        let body: Value = self.get_json(url, &context).await?;
        let body = if body.is_null() { Value::Array(Vec::new()) } else { body };
        let rows = match kind {
            ReportKind::Account => serde_json::from_value::<Vec<AccountReportRow>>(body)
                .map(ReportRows::Account),
            ReportKind::Campaign => serde_json::from_value::<Vec<CampaignReportRow>>(body)
                .map(ReportRows::Campaign),
        };
        rows.map_err(|e| ClientError::Deserialize { context, source: e })
    }

    /// URL of a rendered single-account report, for opening in a browser.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidBaseUrl`] if the base URL cannot carry
    /// a path.
    pub fn preview_report_url(
        &self,
        mcc: Ccid,
        account: Ccid,
        template_id: i64,
        range: &DateRange,
        format: PreviewFormat,
    ) -> Result<Url, ClientError> {
        let (start, end) = range.month_params();
        self.build_url(
            &[
                "mcc",
                &mcc.normalized().to_string(),
                "previewreports",
                "account",
                &account.normalized().to_string(),
            ],
            &[
                ("templateId", &template_id.to_string()),
                ("monthStart", &start),
                ("monthEnd", &end),
                ("reportType", format.as_param()),
            ],
        )
    }

    fn export_url(
        &self,
        mcc: Ccid,
        account: Option<Ccid>,
        range: &DateRange,
        template_id: i64,
    ) -> Result<Url, ClientError> {
        let mcc_id = mcc.normalized().to_string();
        let account_id = account.map(|a| a.normalized().to_string());
        let mut segments = vec!["mcc", mcc_id.as_str(), "exportreports"];
        if let Some(account_id) = account_id.as_deref() {
            segments.extend(["account", account_id]);
        }

        let (start, end) = range.month_params();
        self.build_url(
            &segments,
            &[
                ("templateId", &template_id.to_string()),
                ("monthStart", &start),
                ("monthEnd", &end),
            ],
        )
    }
}
