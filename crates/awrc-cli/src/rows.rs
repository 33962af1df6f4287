//! Raw report rows command handler.

use std::sync::Arc;

use awrc_client::{ReportKind, Session};
use awrc_core::Ccid;
use awrc_views::{Entry, RawDataScreen};
use chrono::NaiveDate;

use crate::screen_error;
use crate::status::ensure_ready;

#[derive(Debug)]
pub(crate) struct RowsRequest {
    pub account: Ccid,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub kind: ReportKind,
    pub page: usize,
    pub page_size: usize,
    pub show: Vec<String>,
    pub hide: Vec<String>,
}

/// Print one page of raw report rows as a tab-separated table.
///
/// # Errors
///
/// Returns an error if the MCC's reports are not ready, the account is not
/// under the MCC, or the rows cannot be fetched.
pub(crate) async fn run_rows(
    session: &Arc<Session>,
    mcc: Ccid,
    request: RowsRequest,
) -> anyhow::Result<()> {
    ensure_ready(session, mcc).await?;
    let mut screen = match RawDataScreen::open(Arc::clone(session), mcc, request.page_size) {
        Entry::Screen(screen) => screen,
        Entry::Redirect(route) => anyhow::bail!("reports for {mcc} are not ready; see {route}"),
    };
    if let Err(e) = screen.load().await {
        return Err(screen_error(screen.load_error(), e));
    }

    screen.set_report_kind(request.kind);
    screen.select_account(request.account)?;
    screen.set_dates(Some(request.start), Some(request.end));
    for column in &request.show {
        screen.columns_mut().set(request.kind, column, true);
    }
    for column in &request.hide {
        screen.columns_mut().set(request.kind, column, false);
    }

    let (min, max) = screen.bounds();
    if let Err(e) = screen.fetch().await {
        return Err(screen_error(screen.fetch_error(), e));
    }
    let page = screen.paginator_mut().go_to(request.page);

    let columns = screen.columns().visible_columns(request.kind);
    println!("{}", columns.join("\t"));
    for row in screen.page_cells() {
        println!("{}", row.join("\t"));
    }

    let paginator = screen.paginator();
    println!(
        "page {page} of {} ({} rows, {} available from {} to {})",
        paginator.page_count(),
        paginator.total(),
        request.kind,
        crate::fmt_date(min, "%Y-%m-%d"),
        crate::fmt_date(max, "%Y-%m-%d")
    );
    Ok(())
}
