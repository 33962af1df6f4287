//! PDF export command handler, driving the export wizard non-interactively.

use std::sync::Arc;
use std::time::Duration;

use awrc_client::{ExportFailurePolicy, ExportOutcome, ExportSelection, PreviewFormat, Session};
use awrc_core::{Ccid, DateRange};
use awrc_views::{Entry, ExportWizard};
use chrono::NaiveDate;

use crate::screen_error;
use crate::status::ensure_ready;

/// Options for one `export` run.
#[derive(Debug)]
pub(crate) struct ExportRequest {
    pub template: i64,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Empty means every account of the MCC.
    pub accounts: Vec<Ccid>,
    pub stop_on_error: bool,
}

impl ExportRequest {
    fn policy(&self) -> ExportFailurePolicy {
        if self.stop_on_error {
            ExportFailurePolicy::StopOnFirstError
        } else {
            ExportFailurePolicy::BestEffort
        }
    }
}

/// Queue PDF exports and optionally wait for the backend to render them.
///
/// # Errors
///
/// Returns an error if the MCC's reports are not ready, a wizard step
/// rejects the request, or the export request fails.
pub(crate) async fn run_export(
    session: &Arc<Session>,
    mcc: Ccid,
    request: ExportRequest,
    wait: Option<Duration>,
) -> anyhow::Result<()> {
    ensure_ready(session, mcc).await?;
    let mut wizard = match ExportWizard::open(Arc::clone(session), mcc) {
        Entry::Screen(wizard) => wizard,
        Entry::Redirect(route) => anyhow::bail!("reports for {mcc} are not ready; see {route}"),
    };
    if let Err(e) = wizard.load().await {
        return Err(screen_error(wizard.load_error(), e));
    }

    if request.accounts.is_empty() {
        wizard.choose_all_accounts()?;
    } else {
        for &account in &request.accounts {
            wizard.picker_mut().select(account)?;
        }
        wizard.choose_selected_accounts()?;
    }
    wizard.choose_template(request.template)?;
    wizard.choose_dates(request.start, request.end)?;

    let outcome = wizard.submit(request.policy()).await?;
    print_outcome(mcc, &outcome);

    if let Some(interval) = wait {
        println!("waiting for the backend to render...");
        wizard.wait_for_exports(interval).await?;
        println!("all exports rendered");
    }
    Ok(())
}

/// Options for one `preview` run.
#[derive(Debug)]
pub(crate) struct PreviewRequest {
    pub account: Ccid,
    pub template: i64,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub html: bool,
}

/// Print the browser link that renders one account's report with a template.
///
/// # Errors
///
/// Returns an error if the months are out of order or the link cannot be
/// built from the configured base URL.
pub(crate) fn run_preview(
    session: &Session,
    mcc: Ccid,
    request: &PreviewRequest,
) -> anyhow::Result<()> {
    println!("{}", preview_url(session, mcc, request)?);
    Ok(())
}

pub(crate) fn preview_url(
    session: &Session,
    mcc: Ccid,
    request: &PreviewRequest,
) -> anyhow::Result<String> {
    let range = DateRange::new(request.start, request.end)?;
    let format = if request.html {
        PreviewFormat::Html
    } else {
        PreviewFormat::Pdf
    };
    let url = session.client().preview_report_url(
        mcc,
        request.account,
        request.template,
        &range,
        format,
    )?;
    Ok(url.to_string())
}

fn print_outcome(mcc: Ccid, outcome: &ExportOutcome) {
    match &outcome.selection {
        ExportSelection::All => println!("queued export of every account under {mcc}"),
        ExportSelection::Accounts(_) => println!(
            "queued {} of {} account exports",
            outcome.succeeded(),
            outcome.requested()
        ),
    }
    for failure in &outcome.failed {
        println!(
            "  {}: {}",
            failure.account,
            failure.failure.describe("export failed")
        );
    }
}
