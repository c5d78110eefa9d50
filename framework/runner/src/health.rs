use canary_summary_model::HealthCheckSet;

/// Share of endpoints that must be healthy for the API health scenario to pass.
pub const ENDPOINT_HEALTH_THRESHOLD: f64 = 80.0;

/// Share of load test requests that must succeed.
pub const LOAD_SUCCESS_THRESHOLD: f64 = 95.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthVerdict {
    pub healthy_count: usize,
    pub total_count: usize,
    pub percentage: f64,
    pub passed: bool,
}

impl HealthVerdict {
    /// The percentage as it is written to reports, with one decimal place.
    pub fn percentage_display(&self) -> String {
        format!("{:.1}", self.percentage)
    }
}

/// Turns a set of named checks into a percentage and a pass or fail against a threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthAggregator {
    threshold: f64,
}

impl HealthAggregator {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn aggregate(&self, checks: &HealthCheckSet) -> HealthVerdict {
        self.aggregate_counts(checks.healthy_count(), checks.total_count())
    }

    /// Nothing to count is 0% healthy, so an empty set fails any positive threshold.
    pub fn aggregate_counts(&self, healthy_count: usize, total_count: usize) -> HealthVerdict {
        let (percentage, passed) = if total_count == 0 {
            (0.0, 0.0 >= self.threshold)
        } else {
            // Compared without dividing so a count exactly on the threshold passes
            (
                healthy_count as f64 / total_count as f64 * 100.0,
                healthy_count as f64 * 100.0 >= self.threshold * total_count as f64,
            )
        };

        HealthVerdict {
            healthy_count,
            total_count,
            percentage,
            passed,
        }
    }
}
