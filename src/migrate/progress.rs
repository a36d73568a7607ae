use super::MigrationReport;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub enum RecordOutcome {
    Transferred,
    Failed(String),
}

#[derive(Clone, Debug)]
pub enum MigrationEvent {
    Started {
        total: usize,
    },
    FileStarted {
        table: String,
        file: String,
    },
    Record {
        index: usize,
        total: usize,
        key: String,
        elapsed: Duration,
        outcome: RecordOutcome,
        acknowledged: bool,
    },
    Finished {
        report: MigrationReport,
    },
}

/// Receives migration progress at each file and record
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: MigrationEvent);
}

/// Discards every event
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&self, _event: MigrationEvent) {}
}

impl ProgressSink for crossbeam::channel::Sender<MigrationEvent> {
    fn emit(&self, event: MigrationEvent) {
        // A dropped receiver only means nobody is watching.
        self.send(event).ok();
    }
}
