use crate::migrate::{MigrationEvent, RecordOutcome};
use crate::ui::theme::{is_quiet, theme};
use crate::ui::Icons;
use indicatif::ProgressBar;
use owo_colors::OwoColorize;
use std::thread;
use std::time::Duration;

/// Terminal progress for a migration run, fed through a channel
pub struct MigrationProgress {
    bar: ProgressBar,
    handle: thread::JoinHandle<()>,
}

impl MigrationProgress {
    pub fn new() -> (Self, crossbeam::channel::Sender<MigrationEvent>) {
        let (tx, rx) = crossbeam::channel::unbounded::<MigrationEvent>();

        let bar = if console::Term::stdout().is_term() && !is_quiet() {
            ProgressBar::new(0).with_message("Getting ready to transfer")
        } else {
            ProgressBar::hidden()
        };

        let bar_clone = bar.clone();
        let handle = thread::spawn(move || {
            for msg in rx {
                match msg {
                    MigrationEvent::Started { total } => {
                        bar_clone.set_length(total as u64);
                        bar_clone.enable_steady_tick(Duration::from_millis(100));
                    }
                    MigrationEvent::FileStarted { table, file } => {
                        bar_clone.set_message(format!(
                            "Transferring data from table {} ({})",
                            table.style(theme().key.clone()),
                            file
                        ));
                    }
                    MigrationEvent::Record {
                        index,
                        total,
                        key,
                        elapsed,
                        outcome,
                        acknowledged,
                    } => {
                        bar_clone.inc(1);
                        let ms = elapsed.as_secs_f64() * 1000.0;
                        match outcome {
                            RecordOutcome::Transferred => {
                                let ack = if acknowledged {
                                    " acknowledged write?: true"
                                } else {
                                    ""
                                };
                                bar_clone.set_message(format!(
                                    "[{}/{}] [{:.2}ms]: {}{}",
                                    index,
                                    total,
                                    ms,
                                    key.style(theme().key.clone()),
                                    ack
                                ));
                            }
                            RecordOutcome::Failed(error) => {
                                bar_clone.println(format!(
                                    "{} [{}/{}] [{:.2}ms]: {} {}",
                                    Icons::CROSS,
                                    index,
                                    total,
                                    ms,
                                    key.style(theme().key.clone()),
                                    error.style(theme().error.clone())
                                ));
                            }
                        }
                    }
                    MigrationEvent::Finished { .. } => {
                        let done = format!("{} Transfer completed!", Icons::TRUCK);
                        bar_clone.finish_with_message(done);
                    }
                }
            }
        });

        (Self { bar, handle }, tx)
    }

    /// Wait for the consumer to drain; call after dropping the sender
    pub fn join(self) {
        self.handle.join().ok();
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}
