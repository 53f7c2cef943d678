//! Patronage CLI
//!
//! Local entry point: bulk-load the supporter cache, check webhook
//! signatures and replay recorded webhook deliveries.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use clap::{Parser, Subcommand};
use patronage::{
    error::{AppError, Result},
    models::Config,
    pipeline::{LoadReport, SupporterService},
    services::WebhookVerifier,
    utils::log::{self as report, LogLevel},
};
use serde::Serialize;

/// Patronage - supporter cache for membership platforms
#[derive(Parser, Debug)]
#[command(
    name = "patronage",
    version,
    about = "Reconciles pledge and subscription listings into a supporter cache"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "patronage.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load every supporter and print the sorted snapshot
    Load {
        /// Sort order: "amount" or "created_at"
        #[arg(long)]
        sort: Option<String>,
    },

    /// Check a webhook signature against a recorded body
    Verify {
        /// File holding the raw request body
        #[arg(long)]
        body: PathBuf,

        /// Hex signature from the delivery headers
        #[arg(long)]
        signature: String,
    },

    /// Load, then apply a recorded webhook delivery
    Replay {
        /// File holding the raw request body
        #[arg(long)]
        body: PathBuf,

        /// Hex signature from the delivery headers
        #[arg(long)]
        signature: Option<String>,

        /// Event name, e.g. "pledges:create"
        #[arg(long)]
        event: String,
    },

    /// Validate configuration
    Validate,
}

/// Initialize logging from the configured level, raised by `--verbose`.
///
/// `RUST_LOG` still overrides both.
fn init_logging(config: &Config, verbose: bool) {
    let level = if verbose {
        LogLevel::Debug
    } else {
        LogLevel::parse(&config.logging.level)
    };
    env_logger::Builder::new()
        .filter_level(level.filter())
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();
}

fn load_config(path: &Path) -> Config {
    let mut config = Config::load_or_default(path);
    config.apply_env();
    config
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_load_report(report: &LoadReport) {
    report::summary(
        "Bulk load",
        &[
            ("Pages", report.pages.to_string()),
            ("Supporters", report.supporters.to_string()),
            ("Rewards", report.rewards.to_string()),
            ("Dropped", report.dropped.to_string()),
            ("Unmatched identities", report.unmatched.to_string()),
            ("Inferred rewards", report.inferred_rewards.to_string()),
            ("Elapsed", format!("{}ms", report.elapsed_ms)),
        ],
    );
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config);
    init_logging(&config, cli.verbose);

    report::header(&format!("patronage ({})", config.source.platform));

    match cli.command {
        Command::Load { sort } => {
            let service = SupporterService::new(config)?;
            let load_report = service.load().await?;
            print_load_report(&load_report);

            let snapshot = service.find(sort.as_deref()).await?;
            print_json(&snapshot)?;
        }

        Command::Verify { body, signature } => {
            let raw = tokio::fs::read(&body).await?;
            let verifier = WebhookVerifier::new(&config.source.webhook_secret, config.source.digest);

            if verifier.verify(&raw, &signature) {
                log::info!("Signature OK for {}", body.display());
            } else {
                log::error!("Signature mismatch for {}", body.display());
                return Err(AppError::Signature);
            }
        }

        Command::Replay {
            body,
            signature,
            event,
        } => {
            let raw = tokio::fs::read(&body).await?;
            let service = SupporterService::new(config)?;
            print_load_report(&service.load().await?);

            let outcome = service
                .apply_webhook(&raw, signature.as_deref(), &event)
                .await?;
            log::info!("Applied {} from {}", event, body.display());
            print_json(&outcome)?;
            print_json(&service.stats().await)?;
        }

        Command::Validate => {
            log::info!("Validating {}...", cli.config.display());

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            report::sub_item(&format!("platform: {}", config.source.platform));
            report::sub_item(&format!("api base: {}", config.source.api_base()));
            report::sub_item(&format!("tiers: {}", config.source.tiers.len()));
            log::info!("Config OK");
        }
    }

    Ok(())
}
