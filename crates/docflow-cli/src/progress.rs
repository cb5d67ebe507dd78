//! Progress bar utilities for CLI operations
//!
//! Provides one progress bar per record while a batch runs, and the summary
//! table printed once it is done.

use crate::record::{FileRecord, FileStatus, RecordId};
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::HashMap;

const RECORD_TEMPLATE: &str =
    "{prefix:<28!} [{wide_bar:.cyan/blue}] {pos:>3}% {msg}";

/// Create a spinner for indeterminate operations
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Create a simple progress bar with custom message
pub fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(RECORD_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb.set_prefix(message.to_string());
    pb
}

/// Format bytes into human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Short label for the stage a record is in
pub fn stage_label(record: &FileRecord) -> String {
    match record.status() {
        FileStatus::Processing => match record.phase() {
            Some(phase) => format!("processing ({phase})"),
            None => "processing".to_string(),
        },
        status => status.as_str().to_string(),
    }
}

/// Draws one bar per record from batch snapshots
pub struct BatchRenderer {
    multi: MultiProgress,
    bars: HashMap<RecordId, ProgressBar>,
}

impl BatchRenderer {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        Self {
            multi: MultiProgress::with_draw_target(target),
            bars: HashMap::new(),
        }
    }

    /// Bring every bar up to date with `records`
    pub fn render(&mut self, records: &[FileRecord]) {
        for record in records {
            let bar = self.bars.entry(record.id()).or_insert_with(|| {
                let bar = create_progress_bar(100, record.name());
                self.multi.add(bar)
            });

            if bar.is_finished() {
                continue;
            }

            bar.set_position(u64::from(record.progress()));
            match record.status() {
                FileStatus::Completed => {
                    bar.finish_with_message("done".green().to_string());
                },
                FileStatus::Error => {
                    let reason = record
                        .error()
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "failed".to_string());
                    bar.abandon_with_message(reason.red().to_string());
                },
                _ => bar.set_message(stage_label(record)),
            }
        }

        // Records removed from the batch drop their bars
        let live: Vec<RecordId> = records.iter().map(FileRecord::id).collect();
        self.bars.retain(|id, bar| {
            let keep = live.contains(id);
            if !keep {
                bar.finish_and_clear();
            }
            keep
        });
    }

    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }
}

impl Default for BatchRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Final per-record outcome table
pub fn summary_table(records: &[FileRecord]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["File", "Size", "Status", "Correlation ID", "Detail"]);

    for record in records {
        let status = match record.status() {
            FileStatus::Completed => Cell::new("completed").fg(Color::Green),
            FileStatus::Error => Cell::new("error").fg(Color::Red),
            other => Cell::new(other.as_str()).fg(Color::Yellow),
        };
        let detail = record
            .error()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            Cell::new(record.name()),
            Cell::new(format_bytes(record.source().size())),
            status,
            Cell::new(record.correlation_id().unwrap_or("-")),
            Cell::new(detail),
        ]);
    }

    table
}
