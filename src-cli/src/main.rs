//! quantview CLI - submit stock analyses and browse past results.

mod render;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use log::{debug, info};
use tokio::sync::broadcast::error::RecvError;

use quantview::{
    init_logging, load_or_default, AnalysisSummary, ClientConfig, FailureView, JobId, JobSession,
    JobStatus, JobViewState, LogFormat, QuantviewError,
};

const EXIT_FAILED: i32 = 1;
const EXIT_CANCELLED: i32 = 130;

#[derive(Parser)]
#[command(name = "quantview", version)]
#[command(about = "Run multi-agent stock analyses and browse past results", long_about = None)]
struct Cli {
    /// Config file (defaults to the per-user config when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Job service URL, overriding config and environment
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Print the final job view as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a ticker and follow the analysis until it finishes
    Analyze {
        /// Stock symbol, e.g. RELIANCE.NS
        ticker: String,
    },
    /// List finished analyses
    History {
        /// Show the finished job with this id
        #[arg(long)]
        select: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    if let Err(e) = init_logging(format) {
        eprintln!("Warning: {}", e);
    }

    match run(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(EXIT_FAILED);
        }
    }
}

async fn run(cli: Cli) -> Result<i32, QuantviewError> {
    let mut config = load_or_default(cli.config.as_deref())?;
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }
    debug!("Using job service at {}", config.api_url);

    match cli.command {
        Command::Analyze { ticker } => analyze(&config, &ticker, cli.json).await,
        Command::History { select } => history(&config, select, cli.json).await,
    }
}

async fn analyze(config: &ClientConfig, ticker: &str, json: bool) -> Result<i32, QuantviewError> {
    let session = JobSession::from_config(config)?;
    let mut changes = session.store().subscribe();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let outcome = tokio::select! {
        outcome = session.submit(ticker) => outcome?,
        _ = &mut ctrl_c => {
            eprintln!("Cancelled before the job was created.");
            return Ok(EXIT_CANCELLED);
        }
    };
    debug!("Submission outcome: {:?}", outcome);

    let mut last_status: Option<JobStatus> = None;
    let view = loop {
        tokio::select! {
            change = changes.recv() => match change {
                Ok(view) => {
                    if let Some(job) = &view.current_job {
                        if !json && last_status.as_ref() != Some(job.status()) {
                            println!("{}", render::status_line(job));
                            last_status = Some(job.status().clone());
                        }
                    }
                    if !view.is_busy() {
                        break view;
                    }
                }
                Err(RecvError::Lagged(skipped)) => debug!("Skipped {} view updates", skipped),
                Err(RecvError::Closed) => break session.store().snapshot(),
            },
            _ = &mut ctrl_c => {
                info!("Interrupted, stopping");
                session.shutdown();
                eprintln!("Cancelled.");
                return Ok(EXIT_CANCELLED);
            }
        }
    };

    Ok(show(&view, json))
}

async fn history(
    config: &ClientConfig,
    select: Option<String>,
    json: bool,
) -> Result<i32, QuantviewError> {
    let session = JobSession::from_config(config)?;
    let panel = session.history();
    panel.open().await;

    let Some(id) = select else {
        let entries = panel.entries();
        if json {
            println!("{}", to_json(&entries));
        } else if entries.is_empty() {
            println!("No past analyses found.");
        } else {
            for job in &entries {
                println!("{}", render::history_row(job));
            }
        }
        return Ok(0);
    };

    let Some(job) = panel.find(&JobId::from(id.as_str())) else {
        eprintln!("No finished analysis with id {}", id);
        return Ok(EXIT_FAILED);
    };
    session.select_historical(job)?;
    Ok(show(&session.store().snapshot(), json))
}

/// Prints the final view and returns the exit code it warrants.
fn show(view: &JobViewState, json: bool) -> i32 {
    let failed = view.last_error.is_some()
        || view
            .current_job
            .as_ref()
            .is_some_and(|job| job.status() == &JobStatus::Failed);

    if json {
        println!("{}", to_json(view));
    } else if let Some(err) = &view.last_error {
        eprintln!("{}", render::error(err));
    } else if let Some(job) = &view.current_job {
        if let Some(failure) = FailureView::for_job(job) {
            println!("{}", render::failure(&failure));
        } else if let Some(summary) = job.result().and_then(AnalysisSummary::from_result) {
            println!();
            println!("{}", render::summary(job, &summary));
        }
    }

    if failed {
        EXIT_FAILED
    } else {
        0
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
}
