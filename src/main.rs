//! tlaunch - run shell commands through the launch tracker.
//!
//! Usage:
//!   tlaunch run [--config FILE] [--timeout SECS] [--json] COMMAND...
//!   tlaunch validate CONFIG

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tasklaunch::{
    CommandRunner, LaunchMode, LaunchRecord, LaunchRequest, LaunchState, LaunchStore,
    RunningLaunch, TrackerConfig, TrackerContext, YamlLoader,
};
use tracing::{error, info, warn};

/// tlaunch - launch shell commands and track their status
#[derive(Parser)]
#[command(name = "tlaunch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run shell commands and report their final launch status
    Run {
        /// Tracker configuration file (YAML)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Cancel commands that run longer than this many seconds
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Print final records as JSON lines
        #[arg(long)]
        json: bool,

        /// Shell commands to run, one launch each
        #[arg(value_name = "COMMAND", required = true)]
        commands: Vec<String>,
    },

    /// Validate a tracker configuration file
    Validate {
        /// Path to the configuration file
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            timeout,
            json,
            commands,
        } => {
            run_commands(config, timeout, json, commands).await?;
        }
        Commands::Validate { config } => {
            validate_config(config)?;
        }
    }

    Ok(())
}

/// Run each command as a deferred launch and wait for all of them.
async fn run_commands(
    config_path: Option<PathBuf>,
    timeout: Option<u64>,
    json: bool,
    commands: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            YamlLoader::load_tracker_config(path)?
        }
        None => TrackerConfig::default(),
    };
    if config.mode != LaunchMode::Deferred {
        warn!("Running commands needs deferred launches; overriding configured mode");
        config.mode = LaunchMode::Deferred;
    }

    let ctx = TrackerContext::init(config).await?;
    let Some(deferred) = ctx.deferred() else {
        return Err("tracker context has no deferred launcher".into());
    };

    let mut runner = CommandRunner::new(deferred);
    if let Some(secs) = timeout {
        runner = runner.with_timeout(Duration::from_secs(secs));
    }

    let mut running = Vec::with_capacity(commands.len());
    for command in commands {
        match runner.run(LaunchRequest::new(command.clone())).await {
            Ok(launch) => {
                info!("Launched '{}' as {}", command, launch.id());
                running.push(launch);
            }
            Err(e) => {
                error!("Failed to launch '{}': {}", command, e);
            }
        }
    }

    let ids: Vec<_> = running.iter().map(|r| r.id().clone()).collect();
    let interrupted = tokio::select! {
        _ = tokio::signal::ctrl_c() => true,
        _ = wait_all(&mut running) => false,
    };
    if interrupted {
        info!("Interrupted, cancelling {} outstanding launch(es)...", running.len());
        for launch in running {
            let record = launch.cancel().await;
            info!("Cancelled {} ({})", record.id, record.state);
        }
    }

    let launcher = ctx.launcher();
    let report = ctx.shutdown().await?;

    let mut unfinished = 0;
    for id in &ids {
        let record = launcher.status(id).await;
        if record.state != LaunchState::Complete {
            unfinished += 1;
        }
        print_record(&record, json)?;
    }

    info!(
        total = report.total,
        complete = report.complete,
        failed = report.failed,
        cancelled = report.cancelled,
        "Tracker shut down"
    );

    if unfinished > 0 {
        error!("{} launch(es) did not complete", unfinished);
        std::process::exit(1);
    }
    Ok(())
}

/// Wait for launches in order, dropping each one once it has finished.
///
/// Whatever is left in `running` when this future is dropped is still
/// outstanding.
async fn wait_all(running: &mut Vec<RunningLaunch<dyn LaunchStore>>) {
    while let Some(launch) = running.first_mut() {
        if let Err(e) = launch.join().await {
            error!("Lost track of {}: {}", launch.id(), e);
        }
        running.remove(0);
    }
}

fn print_record(record: &LaunchRecord, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(record)?);
        return Ok(());
    }
    match &record.error_detail {
        Some(detail) => println!("{:<12} {:<10} {}", record.id, record.state, detail),
        None => println!("{:<12} {}", record.id, record.state),
    }
    Ok(())
}

/// Validate a configuration file without running anything.
fn validate_config(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    info!("Validating configuration: {}", path.display());

    match YamlLoader::load_tracker_config(&path) {
        Ok(config) => {
            info!("Configuration is valid:");
            info!("  mode: {:?}", config.mode);
            info!("  ids: {:?}", config.ids);
            info!("  duplicate ids: {:?}", config.duplicate_ids);
            info!("  store: {:?}", config.store);
            Ok(())
        }
        Err(e) => {
            error!("Validation failed: {}", e);
            Err(e.into())
        }
    }
}
