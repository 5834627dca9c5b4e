//! Scribe in a terminal.
//!
//! The prompt stands in for a text field in another application: each line
//! typed becomes the field's text and runs through the trigger pipeline, and
//! whatever the pipeline writes back is echoed. Lines starting with `:` drive
//! the overlay UI instead (see `:help`).
//!
//! ```text
//! stdin ─▶ TerminalSurface ─▶ Pipeline ─▶ HttpCompletionProvider
//!   │ ":"                        ▲
//!   └──────▶ PipelineHandle ─────┘
//! ```

mod commands;
mod terminal;

use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use scribe_config::{ConfigStore, FileStore, config_path};
use scribe_engine::Pipeline;
use scribe_providers::HttpCompletionProvider;

use commands::{Command, Input, help_text};
use terminal::{Console, SystemClipboard, TerminalSurface};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No log file: stay silent rather than mixing logs into the prompt.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> (Option<(PathBuf, File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!("Failed to create log dir {}: {e}", parent.display()));
            continue;
        }

        match OpenOptions::new().create(true).append(true).open(&candidate) {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!("Failed to open log file {}: {e}", candidate.display()));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // ~/.scribe/logs/scribe.log
    if let Some(config_path) = config_path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("scribe.log"));
    }

    candidates.push(PathBuf::from(".scribe").join("logs").join("scribe.log"));

    candidates
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let store = Arc::new(FileStore::open_default().context("failed to load configuration")?);
    let console = Console::stdout();
    let surface = Arc::new(TerminalSurface::new(console.clone()));
    let hosts = terminal::hosts(Arc::clone(&surface), &console, Arc::new(SystemClipboard));
    let pipeline = Pipeline::new(hosts, store.clone(), Arc::new(HttpCompletionProvider::new()));
    let handle = pipeline.handle();
    let pause = pipeline.pause_switch();
    let task = tokio::spawn(pipeline.run());

    console.line(format_args!("Config: {}", store.path().display()));
    console.line("Type text ending in a trigger such as @fixg. :help lists commands.");

    let mut lines = BufReader::new(io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let command = match Input::parse(&line) {
            Input::Text(text) => {
                surface.type_line(text);
                continue;
            }
            Input::Command(command) => command,
        };

        match command {
            Command::Pick(index) => handle.choose_suggestion(index),
            Command::Dismiss => {
                handle.dismiss_suggestions();
                handle.dismiss_undo();
            }
            Command::Undo => handle.undo(),
            Command::Redo => handle.redo(),
            Command::Move { x, y } => {
                handle.begin_undo_drag();
                handle.end_undo_drag(x, y);
            }
            Command::Select { start, end } => surface.select(start, end),
            Command::Apply(trigger) => handle.apply_selection_trigger(trigger),
            Command::Pause => {
                pause.set_paused(true);
                console.line("Paused. :resume to continue.");
            }
            Command::Resume => {
                pause.set_paused(false);
                console.line("Resumed.");
            }
            Command::Reload => match store.reload() {
                Ok(()) => console.line("Configuration reloaded."),
                Err(err) => console.line(format_args!("! {err}")),
            },
            Command::Help => console.line(help_text()),
            Command::Quit => {
                handle.shutdown();
                break;
            }
            Command::Usage(usage) => console.line(format_args!("usage: :{usage}")),
            Command::Unknown(cmd) => console.line(format_args!("Unknown command :{cmd}. Try :help.")),
            Command::Empty => {}
        }
    }

    // Input is over: let an in-flight completion land before exiting.
    surface.close();
    task.await.context("pipeline task failed")?;
    Ok(())
}
