use anyhow::{bail, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use watermarker_core::{FileState, TaskKind, WatermarkPosition};
use watermarker_render::FfmpegEngine;
use watermarker_tasks::{HookDispatcher, TaskScheduler, WatermarkJob};

mod config;

#[derive(Parser)]
#[command(
    name = "watermarker",
    version,
    about = "Add a text watermark to image and video files using ffmpeg.",
    after_help = "Example: watermarker \"TEXT\" file1.jpg file2.mp4 --center",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    apply: Option<ApplyArgs>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve,
}

// clap's derive leaves the implicit ArgGroup for a struct empty when the
// struct contains a `flatten` member, which makes `Option<ApplyArgs>` always
// parse as `None`; list the members explicitly so presence detection works.
#[derive(Args)]
#[group(multiple = true, args = ["text", "files", "output_dir", "quality"])]
struct ApplyArgs {
    /// Watermark text to apply
    text: String,

    /// Files to watermark
    #[arg(required = true)]
    files: Vec<PathBuf>,

    #[command(flatten)]
    position: PositionFlags,

    /// Custom output directory
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Quality setting for output
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=100))]
    quality: Option<u32>,
}

#[derive(Args)]
#[group(multiple = false)]
struct PositionFlags {
    /// Place watermark in top-left corner
    #[arg(long)]
    top_left: bool,
    /// Place watermark in top-right corner
    #[arg(long)]
    top_right: bool,
    /// Place watermark in bottom-left corner
    #[arg(long)]
    bottom_left: bool,
    /// Place watermark in bottom-right corner (default)
    #[arg(long)]
    bottom_right: bool,
    /// Center the watermark
    #[arg(long)]
    center: bool,
}

impl PositionFlags {
    fn resolve(&self) -> WatermarkPosition {
        if self.top_left {
            WatermarkPosition::TopLeft
        } else if self.top_right {
            WatermarkPosition::TopRight
        } else if self.bottom_left {
            WatermarkPosition::BottomLeft
        } else if self.center {
            WatermarkPosition::Center
        } else {
            WatermarkPosition::BottomRight
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "watermarker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let settings = config::Settings::load()?;
    settings.render_config().validate()?;

    match (cli.command, cli.apply) {
        (Some(Command::Serve), _) => serve(settings).await,
        (None, Some(apply)) => run_apply(settings, apply).await,
        (None, None) => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}

async fn serve(settings: config::Settings) -> Result<()> {
    FfmpegEngine::verify().await?;
    tracing::info!(port = settings.port, "Starting Watermarker API server");

    let render = settings.render_config();
    let engine = FfmpegEngine::new();
    let engine = Arc::new(match render.timeout {
        Some(timeout) => engine.with_timeout(timeout),
        None => engine,
    });
    let scheduler = Arc::new(TaskScheduler::new(
        settings.scheduler_config(),
        Arc::clone(&engine) as Arc<dyn watermarker_render::RenderEngine>,
        HookDispatcher::new(settings.hook_config()),
    ));

    watermarker_api::run(settings.api_config(), scheduler, engine, render).await
}

async fn run_apply(settings: config::Settings, args: ApplyArgs) -> Result<()> {
    FfmpegEngine::verify().await?;

    let mut spec = settings
        .render_config()
        .spec(&args.text, args.position.resolve());
    if let Some(dir) = args.output_dir {
        spec = spec.with_output_dir(dir);
    }
    if let Some(quality) = args.quality {
        spec = spec.with_quality(quality);
    }

    let scheduler = TaskScheduler::new(
        settings.scheduler_config(),
        Arc::new(FfmpegEngine::new()),
        HookDispatcher::new(settings.hook_config()),
    );
    let task_id = scheduler.submit(WatermarkJob {
        kind: TaskKind::Batch,
        inputs: args.files,
        spec,
    })?;

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}% Watermarking")?
            .progress_chars("#>-"),
    );

    let task = loop {
        let task = scheduler.status(task_id)?;
        bar.set_position(task.progress as u64);
        if task.status.is_terminal() {
            break task;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    };
    bar.finish_and_clear();
    scheduler.shutdown().await;

    let mut succeeded = 0usize;
    for outcome in &task.files {
        match &outcome.state {
            FileState::Succeeded { output } => {
                succeeded += 1;
                println!("{} -> {}", outcome.input.display(), output.display());
            }
            FileState::Failed { reason } => {
                eprintln!(
                    "{} {}: {reason}",
                    "Skipped".yellow(),
                    outcome.input.display()
                );
            }
            FileState::Pending => {
                eprintln!(
                    "{} {}: not attempted",
                    "Skipped".yellow(),
                    outcome.input.display()
                );
            }
        }
    }

    if succeeded == 0 {
        bail!("no files were watermarked");
    }
    Ok(())
}
