mod export;
mod mccs;
mod rows;
mod status;
mod templates;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use awrc_client::{ReportKind, ReportingClient, Session};
use awrc_core::{parse_day, parse_month, AppConfig, Ccid};
use awrc_views::ViewError;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::mccs::MccCommands;
use crate::templates::TemplateCommands;

#[derive(Debug, Parser)]
#[command(name = "awrc")]
#[command(about = "Reporting console for managed ad accounts")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Manage the MCCs on your account list
    Mccs {
        #[command(subcommand)]
        command: MccCommands,
    },
    /// List the sub-accounts of an MCC
    Accounts {
        /// MCC id, dashed or plain (e.g. 123-456-7890)
        mcc: Ccid,
        /// Refresh the list from the ads API instead of the stored copy
        #[arg(long)]
        live: bool,
    },
    /// Show whether an MCC's reports are downloaded and processed
    Status {
        mcc: Ccid,
        /// Keep polling until background jobs finish
        #[arg(long)]
        wait: bool,
    },
    /// Quick readiness check; covers every MCC when none is given
    Health { mcc: Option<Ccid> },
    /// Start the first report download for a newly added MCC
    Onboard {
        mcc: Ccid,
        /// First month to download (MM-YYYY); defaults to a year ago
        #[arg(long, value_parser = parse_month)]
        start: Option<NaiveDate>,
        /// Last month to download (MM-YYYY); defaults to this month
        #[arg(long, value_parser = parse_month)]
        end: Option<NaiveDate>,
    },
    /// Manage HTML report templates
    Templates {
        #[command(subcommand)]
        command: TemplateCommands,
    },
    /// Queue PDF exports for an MCC
    Export {
        mcc: Ccid,
        /// Template id to render with
        #[arg(long)]
        template: i64,
        /// First month (MM-YYYY)
        #[arg(long, value_parser = parse_month)]
        start: NaiveDate,
        /// Last month (MM-YYYY)
        #[arg(long, value_parser = parse_month)]
        end: NaiveDate,
        /// Restrict to these sub-accounts; repeatable. Defaults to all
        #[arg(long = "account")]
        accounts: Vec<Ccid>,
        /// Abort at the first failed account instead of carrying on
        #[arg(long)]
        stop_on_error: bool,
        /// Wait until the backend has finished rendering
        #[arg(long)]
        wait: bool,
    },
    /// Print the link that renders one sub-account's report with a template
    Preview {
        mcc: Ccid,
        #[arg(long)]
        account: Ccid,
        /// Template id to render with
        #[arg(long)]
        template: i64,
        /// First month (MM-YYYY)
        #[arg(long, value_parser = parse_month)]
        start: NaiveDate,
        /// Last month (MM-YYYY)
        #[arg(long, value_parser = parse_month)]
        end: NaiveDate,
        /// Link to the HTML rendering instead of the PDF
        #[arg(long)]
        html: bool,
    },
    /// Browse raw report rows for one sub-account
    Rows {
        mcc: Ccid,
        #[arg(long)]
        account: Ccid,
        /// First day (YYYY-MM-DD or YYYYMMDD)
        #[arg(long, value_parser = parse_day)]
        start: NaiveDate,
        /// Last day (YYYY-MM-DD or YYYYMMDD)
        #[arg(long, value_parser = parse_day)]
        end: NaiveDate,
        /// Report table: account or campaign
        #[arg(long = "type", default_value = "account")]
        kind: ReportKind,
        #[arg(long, default_value = "1")]
        page: usize,
        /// 10, 25 or 50; defaults to AWRC_PAGE_SIZE
        #[arg(long)]
        page_size: Option<usize>,
        /// Show an otherwise hidden column; repeatable
        #[arg(long)]
        show: Vec<String>,
        /// Hide a column; repeatable
        #[arg(long)]
        hide: Vec<String>,
    },
    /// Resolve a console path to the screen it would show
    Open { path: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("awrc ready; run `awrc --help` for commands");
        return Ok(());
    };

    let config = awrc_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!(env = %config.env, base_url = %config.base_url, "starting");

    let session = build_session(&config)?;
    let interval = Duration::from_millis(config.poll_interval_ms);

    match command {
        Commands::Mccs { command } => mccs::run_mccs(&session, command).await?,
        Commands::Accounts { mcc, live } => mccs::run_accounts(&session, mcc, live).await?,
        Commands::Status { mcc, wait } => {
            status::run_status(&session, mcc, wait.then_some(interval)).await?;
        }
        Commands::Health { mcc } => status::run_health(&session, mcc).await?,
        Commands::Onboard { mcc, start, end } => {
            status::run_onboard(&session, mcc, start, end).await?;
        }
        Commands::Templates { command } => templates::run_templates(&session, command).await?,
        Commands::Export {
            mcc,
            template,
            start,
            end,
            accounts,
            stop_on_error,
            wait,
        } => {
            let request = export::ExportRequest {
                template,
                start,
                end,
                accounts,
                stop_on_error,
            };
            export::run_export(&session, mcc, request, wait.then_some(interval)).await?;
        }
        Commands::Preview {
            mcc,
            account,
            template,
            start,
            end,
            html,
        } => {
            let request = export::PreviewRequest {
                account,
                template,
                start,
                end,
                html,
            };
            export::run_preview(&session, mcc, &request)?;
        }
        Commands::Rows {
            mcc,
            account,
            start,
            end,
            kind,
            page,
            page_size,
            show,
            hide,
        } => {
            let request = rows::RowsRequest {
                account,
                start,
                end,
                kind,
                page,
                page_size: page_size.unwrap_or(config.page_size),
                show,
                hide,
            };
            rows::run_rows(&session, mcc, request).await?;
        }
        Commands::Open { path } => status::run_open(&session, &path).await?,
    }

    Ok(())
}

fn build_session(config: &AppConfig) -> anyhow::Result<Arc<Session>> {
    let client = ReportingClient::from_config(config)
        .with_context(|| format!("failed to build client for {}", config.base_url))?;
    let session = Session::new(Arc::new(client));
    if config.public_templates {
        session.enable_public_templates();
    }
    Ok(Arc::new(session))
}

/// Prefers the screen's user-facing banner over the typed error.
pub(crate) fn screen_error(banner: Option<&str>, err: ViewError) -> anyhow::Error {
    match banner {
        Some(text) => anyhow::anyhow!("{text}"),
        None => err.into(),
    }
}

/// Format an optional date for display, returning `"-"` when `None`.
pub(crate) fn fmt_date(date: Option<NaiveDate>, format: &str) -> String {
    date.map_or_else(|| "-".to_string(), |d| d.format(format).to_string())
}
