//! Terminal progress for a batch run.
//!
//! An `indicatif` bar over the selected index range, with `console`-styled
//! status lines: green for done, yellow for retries and skips, red for
//! failures.

use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::runner::RunSummary;
use crate::storage::WorkItem;

pub struct BatchProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
}

impl BatchProgress {
    pub fn new(total: usize) -> Self {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .expect("invalid template")
                .progress_chars("=> "),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        Self::with_bar(pb)
    }

    /// Draws nothing. Used by tests and non-interactive callers.
    pub fn hidden(total: usize) -> Self {
        let pb = ProgressBar::hidden();
        pb.set_length(total as u64);
        Self::with_bar(pb)
    }

    fn with_bar(pb: ProgressBar) -> Self {
        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    pub fn start(&self, item: &WorkItem) {
        self.pb.set_message(format!("#{} {}", item.index, item.name));
    }

    pub fn skipped(&self, item: &WorkItem) {
        self.pb.println(format!(
            "  {} #{} {} (already generated)",
            self.yellow.apply_to("↷"),
            item.index,
            item.name
        ));
        self.pb.inc(1);
    }

    pub fn succeeded(&self, item: &WorkItem) {
        self.pb.println(format!(
            "  {} #{} {}",
            self.green.apply_to("✓"),
            item.index,
            item.name
        ));
        self.pb.inc(1);
    }

    pub fn retry(&self, attempt: u32, max_retries: u32, reason: &str, wait_secs: f64) {
        self.pb.println(format!(
            "  {} Retry {attempt}/{max_retries}: {reason} (waiting {wait_secs:.1}s)",
            self.yellow.apply_to("↻")
        ));
    }

    pub fn failed(&self, item: &WorkItem, error: &str) {
        self.pb.println(format!(
            "  {} #{} {}: {error}",
            self.red.apply_to("✗"),
            item.index,
            item.name
        ));
        self.pb.inc(1);
    }

    pub fn cooldown(&self, wait: Duration) {
        self.pb
            .set_message(format!("cooling down {:.1}s", wait.as_secs_f64()));
    }

    pub fn finish(&self, summary: &RunSummary) {
        self.pb.finish_and_clear();
        let style = if summary.failed > 0 { &self.red } else { &self.green };
        let mut line = format!(
            "{} ok, {} failed, {} skipped",
            summary.succeeded, summary.failed, summary.skipped
        );
        if summary.interrupted {
            line.push_str(" (interrupted)");
        }
        println!("{}", style.apply_to(line));
    }
}
