//! Shelfmark — content-based PDF renamer.

use std::path::Path;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod args;
mod export;
mod interactive;
mod pipeline;
mod undo;
mod watch;

use args::{Cli, Command, RenameArgs, WatchArgs};
use pipeline::Pipeline;
use shelfmark_core::{Language, RenamerConfig};

fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RenamerConfig> {
    match path {
        Some(path) => Ok(RenamerConfig::load(path)?),
        None => Ok(RenamerConfig::default()),
    }
}

fn apply_rename_overrides(config: &mut RenamerConfig, args: &RenameArgs) -> anyhow::Result<()> {
    if args.dry_run {
        config.dry_run = true;
    }
    if args.recursive {
        config.recursive = true;
    }
    if args.no_llm {
        config.use_llm = false;
    }
    if args.interactive {
        config.interactive = true;
    }
    if let Some(workers) = args.workers {
        config.workers = workers.max(1);
    }
    if let Some(code) = &args.language {
        config.language = Language::parse(code)
            .ok_or_else(|| anyhow::anyhow!("unknown language {code:?} (expected de or en)"))?;
    }
    if let Some(export) = &args.export {
        config.export_metadata_path = Some(export.clone());
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Rename(args) => {
            apply_rename_overrides(&mut config, &args)?;
            let pipeline = Pipeline::new(config)?;
            let records = pipeline.run(&args.path).await?;
            let applied = records.iter().filter(|r| r.applied).count();
            info!(
                "Done: {} document(s), {} renamed{}",
                records.len(),
                applied,
                if pipeline.config().dry_run { " (dry run)" } else { "" }
            );
        }
        Command::Watch(args) => {
            if args.no_llm {
                config.use_llm = false;
            }
            let pipeline = Pipeline::new(config)?;
            watch::watch(&pipeline, &args.path, Duration::from_secs(args.interval_s.max(1)))
                .await?;
        }
        Command::Undo(args) => {
            let reversed = undo::undo(&args.log, args.dry_run)?;
            info!(
                "Reversed {} rename(s){}",
                reversed,
                if args.dry_run { " (dry run)" } else { "" }
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = init_tracing(cli.log_file.as_deref()) {
        eprintln!("Error: {e}");
        std::process::exit(2);
    }
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        let is_config = matches!(
            e.downcast_ref::<shelfmark_core::Error>(),
            Some(shelfmark_core::Error::Config(_))
        );
        std::process::exit(if is_config { 2 } else { 1 });
    }
}
