//! lofi-gen CLI - submit a job list to a generation provider and download the results.

use clap::{Parser, ValueEnum};
use lofi_gen::jobs::load_jobs;
use lofi_gen::{
    CollisionPolicy, Config, Event, IncompletePolicy, JobOutcome, Orchestrator, ProviderKind,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Generate music with a hosted provider and save the tracks locally
#[derive(Parser)]
#[command(name = "lofi-gen")]
#[command(about = "Submit music generation jobs, wait for them and download the audio", long_about = None)]
struct Cli {
    /// JSON configuration file (defaults apply to anything not set)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Provider to use
    #[arg(short, long, value_enum)]
    provider: Option<ProviderArg>,

    /// JSON file with the generation requests
    #[arg(short, long)]
    jobs: PathBuf,

    /// Directory downloaded tracks are written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Maximum seconds to wait for each job
    #[arg(long)]
    max_wait: Option<u64>,

    /// Seconds between status checks
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Seconds to wait before the first status check
    #[arg(long)]
    initial_delay: Option<u64>,

    /// Seconds to pause between jobs
    #[arg(long)]
    pause: Option<u64>,

    /// Only process the first N jobs
    #[arg(long)]
    limit: Option<usize>,

    /// Accept fewer artifacts than the provider minimum once a job is done
    #[arg(long)]
    accept_partial: bool,

    /// Save under "name (1).mp3" instead of failing when a file exists
    #[arg(long)]
    rename_existing: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProviderArg {
    Goapi,
    Udioapi,
}

impl From<ProviderArg> for ProviderKind {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Goapi => ProviderKind::GoApi,
            ProviderArg::Udioapi => ProviderKind::UdioApi,
        }
    }
}

fn build_config(cli: &Cli) -> lofi_gen::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if let Some(provider) = cli.provider {
        config.provider.switch_kind(ProviderKind::from(provider));
    }
    if let Some(dir) = &cli.output_dir {
        config.download.output_dir = dir.clone();
    }
    if let Some(secs) = cli.max_wait {
        config.poll.max_wait = Duration::from_secs(secs);
    }
    if let Some(secs) = cli.poll_interval {
        config.poll.interval = Duration::from_secs(secs);
    }
    if let Some(secs) = cli.initial_delay {
        config.poll.initial_delay = Duration::from_secs(secs);
    }
    if let Some(secs) = cli.pause {
        config.batch.inter_job_pause = Duration::from_secs(secs);
    }
    if cli.limit.is_some() {
        config.batch.limit = cli.limit;
    }
    if cli.accept_partial {
        config.provider.incomplete_policy = IncompletePolicy::AcceptPartial;
    }
    if cli.rename_existing {
        config.download.collision = CollisionPolicy::Rename;
    }

    config.validate()?;
    Ok(config)
}

fn print_event(event: &Event) {
    match event {
        Event::JobStarted {
            index,
            total,
            title,
        } => {
            println!("{}", "=".repeat(60));
            println!("Track {}/{}: {}", index + 1, total, title);
        }
        Event::Submitted { handle, .. } => println!("  submitted, job id {}", handle),
        Event::Polling { .. } => println!("  waiting for generation to complete..."),
        Event::ArtifactSaved { path, .. } => println!("  saved {}", path.display()),
        Event::ArtifactFailed { name, error, .. } => println!("  failed to save {}: {}", name, error),
        Event::JobFinished { title, outcome, .. } => match outcome {
            JobOutcome::Completed { paths, .. } => {
                println!("  {}: completed ({} files)", title, paths.len())
            }
            JobOutcome::Rejected { reason } => println!("  {}: rejected ({})", title, reason),
            JobOutcome::Failed { reason } => println!("  {}: failed ({})", title, reason),
            JobOutcome::TimedOut { reason: Some(reason) } => {
                println!("  {}: timed out ({})", title, reason)
            }
            JobOutcome::TimedOut { reason: None } => println!("  {}: timed out", title),
        },
        Event::BatchFinished { summary } => {
            println!("{}", "=".repeat(60));
            println!("Done: {}", summary);
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Credentials may live in a local .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lofi_gen=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::from(2);
        }
    };
    let credential = match config.provider.resolve_credential() {
        Ok(credential) => credential,
        Err(e) => {
            error!(error = %e, "missing credential");
            return ExitCode::from(2);
        }
    };
    let jobs = match load_jobs(&cli.jobs).await {
        Ok(jobs) => jobs,
        Err(e) => {
            error!(error = %e, "failed to load jobs");
            return ExitCode::from(2);
        }
    };

    let orchestrator = match Orchestrator::from_config(&config, credential) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            error!(error = %e, "failed to initialize");
            return ExitCode::from(2);
        }
    };

    let mut events = orchestrator.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    print_event(&event);
                    if matches!(event, Event::BatchFinished { .. }) {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let result = orchestrator.run_batch(&jobs).await;
    drop(orchestrator);
    printer.await.ok();

    match result {
        Ok(report) if report.summary.all_completed() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(e) => {
            error!(error = %e, "batch aborted");
            ExitCode::from(1)
        }
    }
}
