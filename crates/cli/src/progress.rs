//! Terminal progress reporting.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use mp3cator_core::{BatchProgress, ConversionOutcome};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const TEMPLATE: &str = "Converting [{elapsed_precise}] [{bar:40}] {pos}/{len} files {msg}";

/// A progress bar that is cleaned up however the run ends.
///
/// Dropping the guard without calling [`ProgressGuard::finish`] abandons the
/// bar, leaving the terminal on a fresh line.
pub struct ProgressGuard {
    bar: ProgressBar,
    verbose: bool,
}

impl ProgressGuard {
    /// Creates a bar for `total` files. In verbose mode the bar is hidden and
    /// per-file failures are left to the log output.
    pub fn new(total: u64, verbose: bool) -> Self {
        let bar = if verbose {
            ProgressBar::hidden()
        } else {
            ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr())
        };
        let style = ProgressStyle::with_template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        Self { bar, verbose }
    }

    /// Drains batch events into the bar until the sender side is dropped.
    pub fn follow(&self, mut rx: mpsc::Receiver<BatchProgress>) -> JoinHandle<()> {
        let bar = self.bar.clone();
        let report_failures = !self.verbose;

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    BatchProgress::Started { source, .. } => {
                        if let Some(name) = source.file_name() {
                            bar.set_message(name.to_string_lossy().to_string());
                        }
                    }
                    BatchProgress::Finished { outcome, .. } => {
                        bar.inc(1);
                        if let ConversionOutcome::Failed(reason) = &outcome.outcome {
                            if report_failures {
                                print_above(
                                    &bar,
                                    format!(
                                        "Error converting {}: {}",
                                        outcome.candidate.display_name(),
                                        reason
                                    ),
                                );
                            }
                        }
                    }
                }
            }
        })
    }

    pub fn finish(self) {
        self.bar.finish_with_message("");
    }
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}

/// Prints a line above the bar, or straight to stderr when nothing is drawn.
fn print_above(bar: &ProgressBar, line: String) {
    if bar.is_hidden() {
        eprintln!("{}", line);
    } else {
        bar.println(line);
    }
}
