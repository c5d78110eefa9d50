mod summary_report;

use parking_lot::Mutex;

use crate::OperationRecord;

pub use summary_report::SummaryReportCollector;

pub trait ReportCollector: Send {
    fn add_operation(&mut self, operation_record: &OperationRecord);

    /// Called at the end of each invocation. Collectors should emit what they have gathered and
    /// reset so the next scheduled invocation starts clean.
    fn finalize(&mut self);
}

/// Fans operation records out to the configured collectors.
///
/// Shared between concurrent requests in a batch, so every collector sits behind a lock.
#[derive(Default)]
pub struct Reporter {
    collectors: Vec<Mutex<Box<dyn ReportCollector>>>,
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("collectors", &self.collectors.len())
            .finish()
    }
}

impl Reporter {
    pub fn add_operation(&self, operation_record: &OperationRecord) {
        for collector in &self.collectors {
            collector.lock().add_operation(operation_record);
        }
    }

    pub fn finalize(&self) {
        for collector in &self.collectors {
            collector.lock().finalize();
        }
    }

    pub fn is_noop(&self) -> bool {
        self.collectors.is_empty()
    }
}

#[derive(Default)]
pub struct ReportConfig {
    collectors: Vec<Box<dyn ReportCollector>>,
}

impl ReportConfig {
    /// Print a table of step timings at the end of each invocation.
    pub fn enable_summary(mut self) -> Self {
        self.collectors
            .push(Box::new(SummaryReportCollector::default()));
        self
    }

    pub fn with_collector(mut self, collector: impl ReportCollector + 'static) -> Self {
        self.collectors.push(Box::new(collector));
        self
    }

    pub fn init(self) -> Reporter {
        Reporter {
            collectors: self.collectors.into_iter().map(Mutex::new).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingCollector {
        seen: Arc<Mutex<Vec<String>>>,
        finalized: Arc<Mutex<usize>>,
    }

    impl ReportCollector for CountingCollector {
        fn add_operation(&mut self, operation_record: &OperationRecord) {
            self.seen.lock().push(operation_record.operation_id.clone());
        }

        fn finalize(&mut self) {
            *self.finalized.lock() += 1;
        }
    }

    #[test]
    fn reporter_forwards_to_collectors() {
        let collector = CountingCollector::default();
        let seen = collector.seen.clone();
        let finalized = collector.finalized.clone();

        let reporter = ReportConfig::default().with_collector(collector).init();
        reporter.add_operation(&OperationRecord::new("housekeeping"));
        reporter.add_operation(&OperationRecord::new("petHistory"));
        reporter.finalize();

        assert_eq!(vec!["housekeeping", "petHistory"], *seen.lock());
        assert_eq!(1, *finalized.lock());
    }

    #[test]
    fn default_reporter_is_noop() {
        let reporter = ReportConfig::default().init();
        assert!(reporter.is_noop());
        reporter.add_operation(&OperationRecord::new("ignored"));
        reporter.finalize();
    }
}
