mod operations_table;

use std::collections::BTreeMap;

use tabled::settings::Style;
use tabled::Table;

use crate::report::summary_report::operations_table::OperationRow;
use crate::report::ReportCollector;
use crate::OperationRecord;

/// Keeps the operations of one invocation in memory and prints a table of step timings when the
/// invocation is finalized.
#[derive(Default)]
pub struct SummaryReportCollector {
    operation_records: Vec<OperationRecord>,
}

impl SummaryReportCollector {
    fn print_summary_of_operations(&self) {
        let rows = summarize_operations(&self.operation_records);
        if rows.is_empty() {
            return;
        }

        let mut table = Table::new(rows);
        table.with(Style::modern());

        println!("\nSummary of steps");
        println!("{}", table);
    }
}

impl ReportCollector for SummaryReportCollector {
    fn add_operation(&mut self, operation_record: &OperationRecord) {
        self.operation_records.push(operation_record.clone());
    }

    fn finalize(&mut self) {
        self.print_summary_of_operations();
        self.operation_records.clear();
    }
}

pub(crate) fn summarize_operations(records: &[OperationRecord]) -> Vec<OperationRow> {
    let grouped = records
        .iter()
        .fold(BTreeMap::<&str, Vec<&OperationRecord>>::new(), |mut acc, record| {
            acc.entry(record.operation_id.as_str()).or_default().push(record);
            acc
        });

    grouped
        .into_iter()
        .map(|(operation_id, operations)| {
            let total_operations = operations.len();
            let total_duration_micro = operations
                .iter()
                .map(|record| record.duration().as_micros())
                .sum::<u128>();
            let ok_durations = operations
                .iter()
                .filter(|op| !op.is_error)
                .map(|op| op.duration().as_micros() as f64 / 1000.0)
                .collect::<Vec<_>>();

            OperationRow {
                operation_id: operation_id.to_string(),
                total_operations,
                failed_operations: total_operations - ok_durations.len(),
                total_duration_ms: total_duration_micro as f64 / 1000.0,
                avg_time_ms: (total_duration_micro as f64 / total_operations as f64) / 1000.0,
                min_time_ms: ok_durations.iter().copied().reduce(f64::min),
                max_time_ms: ok_durations.iter().copied().reduce(f64::max),
            }
        })
        .collect()
}
