//! Readiness, onboarding and route-resolution command handlers.

use std::sync::Arc;
use std::time::Duration;

use awrc_client::Session;
use awrc_core::Ccid;
use awrc_views::{
    guard_verified, health_check, AccountScreen, AccountState, AccountSummary, HealthStatus,
    OnboardingScreen, OnboardingStatus, Resolved, Route,
};
use chrono::{Local, NaiveDate};
use futures::stream::{self, StreamExt};

use crate::{fmt_date, screen_error};

const MAX_CONCURRENT_CHECKS: usize = 4;

/// Show the account screen for an MCC, optionally waiting for background
/// jobs to finish first.
///
/// # Errors
///
/// Returns an error if the MCC cannot be loaded or polling is cancelled.
pub(crate) async fn run_status(
    session: &Arc<Session>,
    mcc: Ccid,
    wait: Option<Duration>,
) -> anyhow::Result<()> {
    let mut screen = AccountScreen::new(Arc::clone(session), mcc);
    let state = screen.load().await.clone();

    if let (AccountState::NoData { .. }, Some(interval)) = (&state, wait) {
        print_state(&state)?;
        wait_for_jobs(&screen, interval).await?;
        print_state(screen.load().await)
    } else {
        print_state(&state)
    }
}

async fn wait_for_jobs(screen: &AccountScreen, interval: Duration) -> anyhow::Result<()> {
    let mut handle = screen.wait_until_ready(interval);
    let mut progress = handle.progress();
    let finished = loop {
        tokio::select! {
            finished = &mut handle => break finished,
            changed = progress.changed() => {
                if changed.is_err() {
                    break (&mut handle).await;
                }
                if let Some(remaining) = *progress.borrow_and_update() {
                    if remaining > 0 {
                        println!("waiting on {remaining} background jobs...");
                    }
                }
            }
        }
    };
    finished
        .map(|_| ())
        .ok_or_else(|| anyhow::anyhow!("stopped polling {} before jobs finished", screen.mcc()))
}

fn print_state(state: &AccountState) -> anyhow::Result<()> {
    match state {
        AccountState::Loading => println!("loading..."),
        AccountState::NoData {
            mcc,
            tasks_remaining,
        } => println!(
            "{} ({}): no data yet, {tasks_remaining} processing tasks remaining",
            mcc.display_name(),
            mcc.top_account_id
        ),
        AccountState::Error(failure) => {
            anyhow::bail!("{}", failure.describe("Unable to load account info"));
        }
        AccountState::Ready(summary) => print_summary(summary),
    }
    Ok(())
}

fn print_summary(summary: &AccountSummary) {
    let (first_month, last_month) = summary.report_months;
    let (first_day, last_day) = summary.scorecard_days;
    println!(
        "{} ({}): ready",
        summary.mcc.display_name(),
        summary.mcc.top_account_id
    );
    println!(
        "  reports:   {} to {}",
        fmt_date(first_month, "%m-%Y"),
        fmt_date(last_month, "%m-%Y")
    );
    println!(
        "  scorecard: {} to {}",
        fmt_date(first_day, "%Y-%m-%d"),
        fmt_date(last_day, "%Y-%m-%d")
    );
    let pending = summary.availability.pending_jobs();
    if pending > 0 {
        println!("  {pending} background jobs still queued");
    }
}

/// Health-check one MCC, or every MCC on the account list concurrently.
///
/// # Errors
///
/// Returns an error if the single MCC check fails or the MCC list cannot be
/// loaded. Per-MCC failures in the full sweep are printed, not propagated.
pub(crate) async fn run_health(session: &Session, mcc: Option<Ccid>) -> anyhow::Result<()> {
    if let Some(mcc) = mcc {
        let status = health_check(session, mcc).await?;
        println!("{mcc}: {}", health_label(status));
        return Ok(());
    }

    let mccs = session.list_mccs().await?;
    let mut results: Vec<_> = stream::iter(&mccs)
        .map(|m| async move { (m, health_check(session, m.top_account_id).await) })
        .buffer_unordered(MAX_CONCURRENT_CHECKS)
        .collect()
        .await;
    results.sort_by_key(|(m, _)| m.display_name());

    let mut failed = 0usize;
    for (mcc, result) in &results {
        match result {
            Ok(status) => println!(
                "{:<15}{:<9}{}",
                mcc.top_account_id.formatted(),
                health_label(*status),
                mcc.display_name()
            ),
            Err(e) => {
                failed += 1;
                tracing::warn!(mcc = %mcc.top_account_id, error = %e, "health check failed");
                println!(
                    "{:<15}{:<9}{}",
                    mcc.top_account_id.formatted(),
                    "error",
                    mcc.display_name()
                );
            }
        }
    }
    if failed > 0 {
        tracing::warn!(failed, total = results.len(), "some health checks failed");
    }
    Ok(())
}

fn health_label(status: HealthStatus) -> &'static str {
    match status {
        HealthStatus::Ready => "ready",
        HealthStatus::NoData => "no data",
    }
}

/// Start the first report download for a brand-new MCC.
///
/// # Errors
///
/// Returns the onboarding screen's banner when the status check or the
/// download request fails.
pub(crate) async fn run_onboard(
    session: &Arc<Session>,
    mcc: Ccid,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> anyhow::Result<()> {
    let today = Local::now().date_naive();
    let mut screen = OnboardingScreen::new(Arc::clone(session), mcc, today);

    match screen.load().await {
        Ok(OnboardingStatus::BrandNew) => {}
        Ok(OnboardingStatus::Redirect(route)) => {
            println!("{mcc} already has reports or queued jobs; see {route}");
            return Ok(());
        }
        Err(e) => return Err(screen_error(screen.error_text(), e)),
    }

    let (default_start, default_end) = screen.dates();
    screen.set_dates(start.unwrap_or(default_start), end.unwrap_or(default_end));
    let (start, end) = screen.dates();

    match screen.generate(today).await {
        Ok(route) => {
            println!(
                "report download started for {} to {}; follow it with `awrc status {mcc} --wait` ({route})",
                start.format("%m-%Y"),
                end.format("%m-%Y")
            );
            Ok(())
        }
        Err(e) => Err(screen_error(screen.error_text(), e)),
    }
}

/// Resolve a console path the way the router would, verifying the MCC
/// first for guarded screens.
///
/// # Errors
///
/// Returns an error only when the verification request itself fails.
pub(crate) async fn run_open(session: &Session, path: &str) -> anyhow::Result<()> {
    let route = match Route::parse(path) {
        Resolved::Page(route) => route,
        Resolved::Redirect(target) => {
            println!("{path} -> {target}");
            return Ok(());
        }
    };

    if let Route::Export(mcc) | Route::RawData(mcc) = route {
        health_check(session, mcc).await?;
    }
    match guard_verified(route, session) {
        Resolved::Page(route) => println!("{route}"),
        Resolved::Redirect(target) => println!("{path} -> {target} (reports not ready)"),
    }
    Ok(())
}

/// Loads the account screen and fails unless its reports are ready, which
/// also marks the MCC verified for the guarded screens.
pub(crate) async fn ensure_ready(session: &Arc<Session>, mcc: Ccid) -> anyhow::Result<()> {
    let mut screen = AccountScreen::new(Arc::clone(session), mcc);
    match screen.load().await {
        AccountState::Ready(_) => Ok(()),
        AccountState::Error(failure) => {
            anyhow::bail!("{}", failure.describe("Unable to load account info"))
        }
        _ => anyhow::bail!("reports for {mcc} are not ready yet; run `awrc status {mcc} --wait`"),
    }
}
