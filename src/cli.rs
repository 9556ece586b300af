use annot_jobs::analysis::{AnalysisKind, Blast, PfamScan};
use annot_jobs::backend::HttpBackend;
use annot_jobs::identity::StaticIdentity;
use annot_jobs::model::{
    JobStatus, Notification, Severity, SubmitOutcome, TrackerConfig, DEFAULT_BASE_URL,
};
use annot_jobs::notify::{ChannelNotifier, Notifier, TracingNotifier};
use annot_jobs::storage::{self, StoredResult};
use annot_jobs::text_summary::{self, TextSummary};
use annot_jobs::tracker::JobTracker;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "annot-jobs",
    version,
    about = "Submit BLAST and Pfam scan jobs to the annotation backend and wait for the result"
)]
pub struct Cli {
    /// Base URL of the annotation backend
    #[arg(long, env = "ANNOT_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    pub base_url: String,

    /// Bearer token for the backend
    #[arg(long, env = "ANNOT_TOKEN", default_value = "", hide_env_values = true, global = true)]
    pub token: String,

    /// Username whose tasks are polled
    #[arg(long, env = "ANNOT_USER", default_value = "", global = true)]
    pub user: String,

    /// Delay between task-status checks
    #[arg(long, env = "ANNOT_POLL_INTERVAL", default_value = "2s", global = true)]
    pub poll_interval: humantime::Duration,

    /// Give up when the job has not finished after this long (default: wait indefinitely)
    #[arg(long, env = "ANNOT_MAX_POLL", global = true)]
    pub max_poll: Option<humantime::Duration>,

    /// Per-request HTTP timeout
    #[arg(long, default_value = "30s", global = true)]
    pub request_timeout: humantime::Duration,

    /// Print JSON instead of a text summary
    #[arg(long, global = true)]
    pub json: bool,

    /// Export the finished result as JSON
    #[arg(long, global = true)]
    pub export_json: Option<PathBuf>,

    /// Use --auto-save true or --auto-save false to override
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set, global = true)]
    pub auto_save: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run a BLAST search for a gene
    Blast { gene: String },
    /// Run a Pfam domain scan for a peptide
    Pfam { peptide: String },
    /// List recently saved results
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

/// Build a `TrackerConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> TrackerConfig {
    TrackerConfig {
        base_url: args.base_url.clone(),
        poll_interval: Duration::from(args.poll_interval),
        max_poll_duration: args.max_poll.map(Duration::from),
        request_timeout: Duration::from(args.request_timeout),
        ..TrackerConfig::default()
    }
}

pub async fn run(args: Cli) -> Result<ExitCode> {
    match args.command.clone() {
        Command::Blast { gene } => {
            run_job(&args, Blast, gene, |report| {
                text_summary::blast_summary(report, text_summary::DEFAULT_TOP_HITS)
            })
            .await
        }
        Command::Pfam { peptide } => {
            run_job(&args, PfamScan, peptide, |hits| text_summary::pfam_summary(hits)).await
        }
        Command::History { limit } => run_history(&args, limit).await,
    }
}

fn format_notification(n: &Notification) -> String {
    let label = match n.severity {
        Severity::Info => "info",
        Severity::Success => "ok",
        Severity::Warning => "warn",
        Severity::Error => "error",
    };
    format!("[{label}] {}", n.text)
}

async fn next_notification(
    notes: &mut Option<mpsc::UnboundedReceiver<Notification>>,
) -> Option<Notification> {
    match notes {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Submit one job, stream its notifications and print the result once it settles.
async fn run_job<K: AnalysisKind>(
    args: &Cli,
    kind: K,
    payload: String,
    render: impl Fn(&K::Output) -> TextSummary,
) -> Result<ExitCode> {
    let config = build_config(args);
    let backend = HttpBackend::new(&config).context("failed to build HTTP client")?;
    let identity = StaticIdentity::new(args.token.clone(), args.user.clone());
    // With --json, notifications become log lines so stderr stays machine-filterable.
    let (notifier, mut notes) = if args.json {
        let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
        (notifier, None)
    } else {
        let (channel, rx) = ChannelNotifier::new();
        let notifier: Arc<dyn Notifier> = Arc::new(channel);
        (notifier, Some(rx))
    };
    let tracker = JobTracker::new(kind, config, Arc::new(backend), Arc::new(identity), notifier);
    let (out_tx, out_handle) = spawn_output_writer();
    let mut view = tracker.mount();

    if view.submit(payload.clone()).await == SubmitOutcome::Rejected {
        anyhow::bail!("{} input must not be empty", tracker.kind().short_name());
    }

    let status = loop {
        tokio::select! {
            Some(n) = next_notification(&mut notes) => {
                let _ = out_tx.send(OutputLine::Stderr(format_notification(&n)));
            }
            status = view.settled() => break Some(status),
            _ = tokio::signal::ctrl_c() => {
                tracker.poller().stop();
                break None;
            }
        }
    };
    if let Some(rx) = notes.as_mut() {
        while let Ok(n) = rx.try_recv() {
            let _ = out_tx.send(OutputLine::Stderr(format_notification(&n)));
        }
    }

    let snap = view.snapshot();
    let code = match (status, snap.result) {
        (Some(JobStatus::Completed), Some(result)) => {
            let stored = StoredResult::new(tracker.kind(), &payload, &result)?;
            if let Some(p) = args.export_json.as_deref() {
                storage::export_json(p, &stored)?;
                let _ = out_tx.send(OutputLine::Stderr(format!("Exported JSON: {}", p.display())));
            }
            if args.json {
                let out = serde_json::to_string_pretty(&result)?;
                let _ = out_tx.send(OutputLine::Stdout(out));
            } else {
                for line in render(&result).lines {
                    let _ = out_tx.send(OutputLine::Stdout(line));
                }
            }
            if args.auto_save {
                match storage::save_result(&stored) {
                    Ok(p) => {
                        let _ = out_tx.send(OutputLine::Stderr(format!("Saved: {}", p.display())));
                    }
                    Err(e) => {
                        let _ = out_tx.send(OutputLine::Stderr(format!("Save failed: {e:#}")));
                    }
                }
            }
            ExitCode::SUCCESS
        }
        (None, _) => {
            let _ = out_tx.send(OutputLine::Stderr("Interrupted".to_string()));
            ExitCode::from(130)
        }
        _ => {
            let error = snap.error.unwrap_or_else(|| "job ended without a result".into());
            let _ = out_tx.send(OutputLine::Stderr(format!("Error: {error}")));
            ExitCode::FAILURE
        }
    };

    view.unmount();
    drop(out_tx);
    let _ = out_handle.await;
    Ok(code)
}

async fn run_history(args: &Cli, limit: usize) -> Result<ExitCode> {
    let results = storage::load_recent(limit).context("failed to load saved results")?;
    let (out_tx, out_handle) = spawn_output_writer();
    if args.json {
        let out = serde_json::to_string_pretty(&results)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else {
        for line in text_summary::history_summary(&results).lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }
    drop(out_tx);
    let _ = out_handle.await;
    Ok(ExitCode::SUCCESS)
}
