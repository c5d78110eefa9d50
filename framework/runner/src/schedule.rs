use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("Unsupported schedule expression [{0}], expected rate(<value> <unit>)")]
    Unsupported(String),
    #[error("Invalid rate value [{0}]")]
    InvalidValue(String),
    #[error("Unknown rate unit [{0}], expected minute(s), hour(s) or day(s)")]
    UnknownUnit(String),
    #[error("Rate value must be greater than zero")]
    Zero,
}

/// A fixed rate re-invocation schedule, e.g. `rate(5 minutes)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    expression: String,
    interval: Duration,
}

impl Schedule {
    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl FromStr for Schedule {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let expression = s.trim();
        let inner = expression
            .strip_prefix("rate(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| ScheduleError::Unsupported(expression.to_string()))?;

        let mut parts = inner.split_whitespace();
        let (Some(value), Some(unit), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(ScheduleError::Unsupported(expression.to_string()));
        };

        let value = value
            .parse::<u64>()
            .map_err(|_| ScheduleError::InvalidValue(value.to_string()))?;
        if value == 0 {
            return Err(ScheduleError::Zero);
        }

        let unit_secs = match unit {
            "minute" | "minutes" => 60,
            "hour" | "hours" => 60 * 60,
            "day" | "days" => 24 * 60 * 60,
            _ => return Err(ScheduleError::UnknownUnit(unit.to_string())),
        };

        Ok(Self {
            expression: expression.to_string(),
            interval: Duration::from_secs(value * unit_secs),
        })
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}
