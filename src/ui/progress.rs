//! Terminal progress for the scan and apply phases

use crate::executor::ExecutionEvent;
use crate::types::ActionKind;
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use std::time::Duration;

const SCAN_TEMPLATE: &str = "{spinner} {msg}";
const APPLY_TEMPLATE: &str = "{bar:30.cyan/blue} {pos}/{len} {msg}";

/// Spinner while the source is scanned, then a bar over the actions that
/// change something
pub struct ProgressReporter {
    scan: ProgressBar,
    apply: ProgressBar,
    bytes_copied: u64,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let reporter = Self::with_bars(ProgressBar::new_spinner(), ProgressBar::new(0));
        reporter.scan.enable_steady_tick(Duration::from_millis(120));
        reporter
    }

    /// Reporter that tracks state without drawing
    pub fn hidden() -> Self {
        Self::with_bars(ProgressBar::hidden(), ProgressBar::hidden())
    }

    fn with_bars(scan: ProgressBar, apply: ProgressBar) -> Self {
        if let Ok(style) = ProgressStyle::with_template(SCAN_TEMPLATE) {
            scan.set_style(style);
        }
        if let Ok(style) = ProgressStyle::with_template(APPLY_TEMPLATE) {
            apply.set_style(style.progress_chars("=>-"));
        }

        Self {
            scan,
            apply,
            bytes_copied: 0,
        }
    }

    pub fn scanning(&self, entries: u64, bytes: u64) {
        self.scan.set_message(format!(
            "Scanning source: {} entries, {}",
            entries,
            HumanBytes(bytes)
        ));
    }

    pub fn scanned(&self, entries: usize, bytes: u64) {
        self.scan.finish_with_message(format!(
            "Scanned {} entries, {}",
            entries,
            HumanBytes(bytes)
        ));
    }

    /// Size the apply bar; skips never move it
    pub fn begin_apply(&mut self, changes: u64) {
        self.bytes_copied = 0;
        self.apply.set_length(changes);
        self.apply.set_position(0);
    }

    pub fn on_event(&mut self, event: &ExecutionEvent<'_>) {
        match event {
            ExecutionEvent::ActionStart { kind, path, .. } if *kind != ActionKind::Skip => {
                self.apply.set_message(format!("{} {}", kind, path));
            }
            ExecutionEvent::ActionSuccess {
                kind, bytes_copied, ..
            } if *kind != ActionKind::Skip => {
                self.bytes_copied += bytes_copied;
                self.apply.inc(1);
                self.apply
                    .set_message(format!("{} copied", HumanBytes(self.bytes_copied)));
            }
            ExecutionEvent::ActionError {
                kind, path, error, ..
            } => {
                self.apply
                    .println(format!("ERROR {} {}: {}", kind, path, error));
            }
            ExecutionEvent::Complete { stats } => {
                self.apply.finish_with_message(format!(
                    "{} actions done, {} failed, {} copied",
                    stats.completed_actions,
                    stats.failed_actions,
                    HumanBytes(stats.bytes_copied)
                ));
            }
            _ => {}
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}
