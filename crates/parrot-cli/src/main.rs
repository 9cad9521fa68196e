//! parrot - record and replay input macros from the command line.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use parrot_core::prelude::*;
use parrot_core::script;
use std::io::{self, Write};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

#[derive(Parser)]
#[command(name = "parrot")]
#[command(about = "Record mouse/keyboard macros to editable text and replay them")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record input until Ctrl+C, then save the log as text
    Record {
        /// Output file (default: macro_<timestamp>.txt)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Don't record mouse events
        #[arg(long)]
        no_mouse: bool,

        /// Don't record keyboard events
        #[arg(long)]
        no_keyboard: bool,
    },

    /// Replay a saved macro
    Play {
        /// Macro file
        file: PathBuf,

        /// How many times to replay the whole log
        #[arg(short = 'n', long, default_value = "1")]
        count: NonZeroU32,

        /// Parse and pace the log without injecting anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Summarize a saved macro
    Show {
        /// Macro file
        file: PathBuf,

        /// Print the parsed actions as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    match cli.command {
        Commands::Record {
            output,
            no_mouse,
            no_keyboard,
        } => record(output, no_mouse, no_keyboard),
        Commands::Play {
            file,
            count,
            dry_run,
        } => play(&file, count, dry_run),
        Commands::Show { file, json } => show(&file, json),
    }
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parrot=info,parrot_core=info".into()),
        )
        .try_init();
}

fn record(output: Option<PathBuf>, no_mouse: bool, no_keyboard: bool) -> Result<()> {
    let engine = Arc::new(Engine::new());
    let sources = Sources {
        mouse: !no_mouse,
        keyboard: !no_keyboard,
    };

    engine.start_capture(sources)?;
    println!("Recording... press Ctrl+C to stop.");

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let mut shown = 0;
    while running.load(Ordering::SeqCst) {
        let len = engine.log_len();
        if len != shown {
            shown = len;
            print!("\r{shown} actions");
            io::stdout().flush()?;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    engine.stop_capture();

    let path = output.unwrap_or_else(default_output_path);
    std::fs::write(&path, engine.log_text())
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("\n{} actions saved to {}", engine.log_len(), path.display());

    Ok(())
}

fn default_output_path() -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    PathBuf::from(format!("macro_{stamp}.txt"))
}

fn play(file: &Path, count: NonZeroU32, dry_run: bool) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;

    let engine = if dry_run {
        Arc::new(Engine::with_injector(
            EngineConfig::default(),
            Box::new(NoopInjector),
        ))
    } else {
        Arc::new(Engine::new())
    };

    let skipped = engine.set_log_text(&text)?;
    if skipped > 0 {
        warn!("{skipped} unparseable line(s) skipped");
    }

    println!(
        "Replaying {} actions x{} (press Escape to cancel)...",
        engine.log_len(),
        count
    );

    engine.start_loop(count)?;

    let e = engine.clone();
    ctrlc::set_handler(move || {
        e.stop_loop();
    })?;

    loop {
        let state = engine.playback_state();
        if state.is_terminal() {
            println!();
            match state {
                PlaybackState::Completed => println!("Done."),
                PlaybackState::Cancelled => println!("Cancelled."),
                PlaybackState::Failed => {
                    let reason = engine
                        .last_failure()
                        .unwrap_or_else(|| "unknown injection failure".into());
                    bail!("replay aborted: {reason}");
                }
                PlaybackState::Idle | PlaybackState::Running => {}
            }
            return Ok(());
        }

        let progress = engine.progress();
        print!("\rloop {}/{}", progress.current_loop, count);
        io::stdout().flush()?;
        std::thread::sleep(Duration::from_millis(100));
    }
}

fn show(file: &Path, json: bool) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let (actions, skipped) = script::parse_log(&text);

    if json {
        println!("{}", serde_json::to_string_pretty(&actions)?);
        return Ok(());
    }

    let mut moves = 0;
    let mut clicks = 0;
    let mut releases = 0;
    let mut scrolls = 0;
    let mut keys = 0;

    for action in &actions {
        match action {
            Action::MouseMove { .. } => moves += 1,
            Action::MouseClick { .. } => clicks += 1,
            Action::MouseRelease { .. } => releases += 1,
            Action::ScrollUp { .. } | Action::ScrollDown { .. } => scrolls += 1,
            Action::KeyPress { .. } => keys += 1,
        }
    }

    println!("Actions: {}", actions.len());
    println!("  Moves: {moves}");
    println!("  Clicks: {clicks}");
    println!("  Releases: {releases}");
    println!("  Scrolls: {scrolls}");
    println!("  Key presses: {keys}");
    if skipped > 0 {
        println!("  Unparseable lines skipped: {skipped}");
    }

    Ok(())
}
