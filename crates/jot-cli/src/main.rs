//! Jot - offline-first notes
//!
//! Notes are written to a local cache first and pushed to the configured
//! backend whenever it is reachable.
//!
//! ## Usage
//!
//! ```bash
//! jot add "Groceries" --desc "Milk, eggs"
//! jot list
//! jot show 1
//! jot edit groceries "Milk, eggs, bread"
//! jot rm 1
//! jot sync
//! jot status
//!
//! # Work without touching the network
//! jot --offline add "Ideas"
//! ```

mod app;
mod config;
mod display;

use std::io::{self, BufRead, IsTerminal};
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};

use app::{App, OpenOptions};
use config::CliConfig;
use display::*;
use jot_logging::{JotSubscriberBuilder, LogConfig};

/// Jot - offline-first notes
#[derive(Parser)]
#[command(name = "jot")]
#[command(about = "Offline-first notes that sync when you are online")]
#[command(version)]
struct Cli {
    /// Do not contact the backend; changes are queued
    #[arg(long, global = true)]
    offline: bool,

    /// User id to act as (overrides the config file)
    #[arg(long, global = true)]
    user: Option<String>,

    /// Path to a config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a note
    Add {
        title: String,
        /// Note body
        #[arg(short, long, default_value = "")]
        desc: String,
    },
    /// List all notes
    #[command(alias = "ls")]
    List,
    /// Show a note
    Show {
        /// Note id, id prefix, list number, or title
        note: String,
    },
    /// Replace a note's body (reads stdin when omitted)
    Edit {
        /// Note id, id prefix, list number, or title
        note: String,
        desc: Option<String>,
    },
    /// Delete a note
    #[command(alias = "delete")]
    Rm {
        /// Note id, id prefix, list number, or title
        note: String,
    },
    /// Push queued changes and fetch remote notes
    Sync,
    /// Show connection and queue state
    Status,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::load(cli.config.as_deref())?;

    let log_config = if cli.verbose {
        LogConfig::development()
    } else {
        config.log.clone().unwrap_or_else(LogConfig::quiet)
    };
    let _log_guard = JotSubscriberBuilder::new().with_config(log_config).init();

    let app = App::open(
        &config,
        OpenOptions {
            user: cli.user,
            offline: cli.offline,
        },
    )
    .await?;

    match cli.command {
        Commands::Add { title, desc } => cmd_add(&app, &title, &desc).await,
        Commands::List => cmd_list(&app).await,
        Commands::Show { note } => cmd_show(&app, &note).await,
        Commands::Edit { note, desc } => cmd_edit(&app, &note, desc).await,
        Commands::Rm { note } => cmd_rm(&app, &note).await,
        Commands::Sync => cmd_sync(&app).await,
        Commands::Status => cmd_status(&app).await,
    }
}

async fn cmd_add(app: &App, title: &str, desc: &str) -> anyhow::Result<()> {
    if title.trim().is_empty() {
        bail!("Title must not be empty");
    }

    let (note, drained) = app.add_note(title, desc).await?;
    print_success(&format!("Added '{}' ({})", note.title, note.id.short()));
    if let Some(report) = drained {
        print_drain_failures(&report);
    }
    Ok(())
}

async fn cmd_list(app: &App) -> anyhow::Result<()> {
    print_note_list(&app.notes().await);
    Ok(())
}

async fn cmd_show(app: &App, query: &str) -> anyhow::Result<()> {
    let note = app
        .find_note(query)
        .await
        .with_context(|| format!("Note not found: {}", query))?;
    print_note(&note);
    Ok(())
}

async fn cmd_edit(app: &App, query: &str, desc: Option<String>) -> anyhow::Result<()> {
    let note = app
        .find_note(query)
        .await
        .with_context(|| format!("Note not found: {}", query))?;

    let desc = match desc {
        Some(desc) => desc,
        None => {
            if io::stdin().is_terminal() {
                println!("Enter new content (empty line to finish):");
            }
            read_multiline()?
        }
    };

    let (updated, drained) = app.update_note(&note.id, &desc).await?;
    match updated {
        Some(note) => print_success(&format!("Updated '{}'", note.title)),
        None => print_warning("Note disappeared before it could be updated"),
    }
    if let Some(report) = drained {
        print_drain_failures(&report);
    }
    Ok(())
}

async fn cmd_rm(app: &App, query: &str) -> anyhow::Result<()> {
    let note = app
        .find_note(query)
        .await
        .with_context(|| format!("Note not found: {}", query))?;

    let (removed, drained) = app.delete_note(&note.id).await?;
    if let Some(note) = removed {
        print_success(&format!("Deleted '{}'", note.title));
    }
    if let Some(report) = drained {
        print_drain_failures(&report);
    }
    Ok(())
}

async fn cmd_sync(app: &App) -> anyhow::Result<()> {
    if !app.remote_configured() {
        print_info("No remote configured; notes are kept on this device.");
    }
    let report = app.sync().await?;
    print_sync_report(&report);
    Ok(())
}

async fn cmd_status(app: &App) -> anyhow::Result<()> {
    print_status(&app.status().await, app.remote_configured());
    Ok(())
}

/// Read multiline input until empty line or EOF
fn read_multiline() -> anyhow::Result<String> {
    let mut lines = Vec::new();
    for line in io::stdin().lock().lines() {
        let line = line.context("reading stdin")?;
        if line.is_empty() {
            break;
        }
        lines.push(line);
    }
    Ok(lines.join("\n"))
}
