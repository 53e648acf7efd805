use clap::{Parser, Subcommand};
use recodash_core::domain::params::{SortBy, SortDirection};
use recodash_core::domain::preferences::{HoldingPeriod, RiskLevel};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

mod commands;
mod render;

#[derive(Debug, Parser)]
#[command(name = "recodash", about = "Stock recommendation dashboard client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Exchange credentials for an access token.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account.
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
    },
    /// List recommendations. Unset filters fall back to saved preferences.
    Recommendations {
        #[arg(long)]
        holding_period: Option<HoldingPeriod>,
        #[arg(long)]
        risk_level: Option<RiskLevel>,
        #[arg(long)]
        confidence_min: Option<f64>,
        #[arg(long)]
        sort_by: Option<SortBy>,
        #[arg(long)]
        sort_direction: Option<SortDirection>,
        /// Keep running and re-render whenever the list changes.
        #[arg(long)]
        watch: bool,
    },
    /// Show one recommendation.
    Recommendation { id: Uuid },
    /// Search stocks by symbol or company name.
    Search { query: String },
    /// Show one stock.
    Stock { id: Uuid },
    /// Start tracking a stock.
    Track { id: Uuid },
    /// Stop tracking a stock.
    Untrack { id: Uuid },
    /// Show or update saved preferences.
    Preferences {
        #[command(subcommand)]
        action: PreferencesAction,
    },
    /// Show tier and tracking usage.
    Tier,
}

#[derive(Debug, Subcommand)]
enum PreferencesAction {
    Show,
    Set {
        #[arg(long)]
        holding_period: Option<HoldingPeriod>,
        #[arg(long)]
        risk_tolerance: Option<RiskLevel>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let settings = recodash_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let cli = Cli::parse();

    // No process::exit: the Sentry guard has to drop to flush queued events.
    let result = commands::run(cli.command, &settings).await;
    Ok(exit_code(result))
}

fn exit_code(result: anyhow::Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::debug!(error = ?err, "command failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_sentry(settings: &recodash_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
