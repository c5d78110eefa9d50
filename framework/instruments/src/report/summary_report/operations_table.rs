use tabled::Tabled;

#[derive(Tabled, Debug)]
pub struct OperationRow {
    #[tabled(rename = "step")]
    pub operation_id: String,
    #[tabled(display = "float2")]
    pub avg_time_ms: f64,
    #[tabled(display = "float2_or_dash")]
    pub min_time_ms: Option<f64>,
    #[tabled(display = "float2_or_dash")]
    pub max_time_ms: Option<f64>,
    pub total_operations: usize,
    pub failed_operations: usize,
    #[tabled(display = "float2")]
    pub total_duration_ms: f64,
}

fn float2(n: &f64) -> String {
    format!("{:.2}", n)
}

fn float2_or_dash(n: &Option<f64>) -> String {
    n.map(|n| float2(&n)).unwrap_or_else(|| "-".to_string())
}
