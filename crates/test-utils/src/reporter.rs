use std::sync::{Arc, Mutex};

use rono::report::{Report, Reporter};

/// Reporter that keeps every report for later inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    reports: Arc<Mutex<Vec<Report>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Report) -> bool) -> usize {
        self.reports.lock().unwrap().iter().filter(|r| pred(r)).count()
    }

    pub fn watching(&self) -> usize {
        self.count(|r| matches!(r, Report::Watching))
    }

    pub fn completed(&self) -> usize {
        self.count(|r| matches!(r, Report::RunCompleted { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|r| matches!(r, Report::RunFailed { .. }))
    }
}

impl Reporter for RecordingReporter {
    fn report(&mut self, report: &Report) {
        self.reports.lock().unwrap().push(report.clone());
    }
}
