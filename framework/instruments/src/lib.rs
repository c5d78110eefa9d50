mod report;

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

pub use report::{ReportCollector, ReportConfig, Reporter, SummaryReportCollector};

/// Timing record for a single HTTP step.
///
/// Created when the request is about to be sent and finished once the response has been read or
/// the request failed. The elapsed time is always recorded, failures included.
#[derive(Debug, Clone)]
pub struct OperationRecord {
    pub operation_id: String,
    started: Instant,
    pub elapsed: Option<Duration>,
    pub is_error: bool,
    pub attr: BTreeMap<String, String>,
}

impl OperationRecord {
    pub fn new(operation_id: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            started: Instant::now(),
            elapsed: None,
            is_error: false,
            attr: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.attr.insert(key.into(), value.to_string());
        self
    }

    /// Stop the clock. Calling this more than once keeps the first measurement.
    pub fn finish(&mut self, is_error: bool) -> Duration {
        let elapsed = *self.elapsed.get_or_insert_with(|| self.started.elapsed());
        self.is_error = is_error;
        elapsed
    }

    /// The measured duration, or the time since the record was created if it is still running.
    pub fn duration(&self) -> Duration {
        self.elapsed.unwrap_or_else(|| self.started.elapsed())
    }

    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.duration().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Finish the record and hand it to the reporter.
pub fn report_operation(reporter: &Reporter, mut record: OperationRecord, is_error: bool) -> u64 {
    record.finish(is_error);
    let elapsed_ms = record.elapsed_ms();
    log::trace!(
        "Operation {} took {}ms, failed? {}",
        record.operation_id,
        elapsed_ms,
        is_error
    );
    reporter.add_operation(&record);
    elapsed_ms
}
