use futures::stream::{self, StreamExt};
use tokio::time::Instant;

use canary_summary_model::{BatchResult, StepResult};

use crate::http::{HttpRequest, HttpStepRunner};

/// Runs independent requests in parallel and waits for all of them to settle.
///
/// A failing request never cancels its siblings and results are returned in submission order.
#[derive(Debug, Clone)]
pub struct ConcurrentBatchRunner {
    runner: HttpStepRunner,
}

impl ConcurrentBatchRunner {
    pub fn new(runner: HttpStepRunner) -> Self {
        Self { runner }
    }

    /// Without a cap every request is in flight at once.
    pub async fn run_batch(
        &self,
        requests: Vec<(String, HttpRequest)>,
        concurrency_cap: Option<usize>,
    ) -> BatchResult {
        let started = Instant::now();
        let runner = &self.runner;
        let pending = requests.iter().map(|(name, request)| async move {
            runner.execute(name, request).await.result
        });

        let results: Vec<StepResult> = match concurrency_cap {
            Some(cap) => stream::iter(pending).buffered(cap.max(1)).collect().await,
            None => futures::future::join_all(pending).await,
        };

        let total_latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let batch = BatchResult::from_results(results, total_latency_ms);
        log::debug!(
            "Batch of {} settled in {total_latency_ms}ms with {} failures",
            batch.total_requests(),
            batch.failure_count
        );

        batch
    }
}
