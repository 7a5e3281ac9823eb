//! Display utilities for CLI output
//!
//! Provides colored, formatted output for notes and sync state.

use chrono::Local;
use colored::*;

use jot_core::Note;
use jot_sync::{DrainReport, SyncReport, SyncStatus};

/// Print success message
pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

/// Print error message
pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red().bold(), msg);
}

/// Print a non-blocking notice
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", "!".yellow().bold(), msg);
}

/// Print info message
pub fn print_info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a note in detail
pub fn print_note(note: &Note) {
    println!("{}", "─".repeat(50).dimmed());
    println!("{}: {}", "Title".bold(), note.title.yellow());
    println!("{}: {}", "ID".dimmed(), note.id);
    println!();
    if note.desc.is_empty() {
        println!("{}", "(empty)".dimmed().italic());
    } else {
        println!("{}", note.desc);
    }
    println!("{}", "─".repeat(50).dimmed());
}

/// Print a note in list format (compact)
pub fn print_note_list_item(note: &Note, index: usize) {
    let preview = note.preview(40);
    let preview_display = if preview.is_empty() {
        "(empty)".dimmed().italic().to_string()
    } else {
        preview.dimmed().to_string()
    };

    println!(
        "  {} {} {} - {}",
        format!("[{}]", index + 1).cyan(),
        note.title.yellow(),
        format!("({})", note.id.short()).dimmed(),
        preview_display
    );
}

/// Print a list of notes
pub fn print_note_list(notes: &[Note]) {
    if notes.is_empty() {
        println!("{}", "No notes yet. Create one with 'jot add <title>'".dimmed());
        return;
    }

    println!("{}", format!("Notes ({}):", notes.len()).bold());
    for (i, note) in notes.iter().enumerate() {
        print_note_list_item(note, i);
    }
}

pub fn print_status(status: &SyncStatus, remote_configured: bool) {
    let connection = match (remote_configured, status.online) {
        (false, _) => "local only".dimmed(),
        (true, true) => "online".green(),
        (true, false) => "offline".yellow(),
    };
    let user = status
        .user
        .as_ref()
        .map(|u| u.to_string())
        .unwrap_or_else(|| "(not signed in)".to_string());
    let last_sync = status
        .last_sync
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "never".to_string());

    println!("{}: {}", "User".bold(), user);
    println!("{}: {}", "Connection".bold(), connection);
    println!("{}: {}", "Notes".bold(), status.note_count);
    println!("{}: {}", "Pending".bold(), status.pending_ops);
    println!("{}: {}", "Last sync".bold(), last_sync);
}

/// Report drain failures as notices
pub fn print_drain_failures(report: &DrainReport) {
    for failed in &report.failed {
        print_warning(&format!(
            "Could not {} note {}: {} (will retry)",
            failed.op,
            failed.note_id.short(),
            failed.error
        ));
    }
}

pub fn print_sync_report(report: &SyncReport) {
    if !report.online {
        print_info("Offline; reloaded local notes. Changes stay queued.");
        return;
    }

    if let Some(drain) = &report.drain {
        if drain.applied > 0 {
            print_success(&format!("Pushed {} change(s)", drain.applied));
        }
        print_drain_failures(drain);
    }

    if let Some(error) = &report.fetch_error {
        print_warning(&format!("Could not fetch notes: {}", error));
    }

    if let Some(summary) = &report.fetched {
        print_success(&format!(
            "Synced {} note(s) ({} local only)",
            summary.total, summary.local_only
        ));
    }
}
