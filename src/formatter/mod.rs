use crate::common::utils::seconds_to_datetime;
use crate::query::{EvalTime, QueryResult};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Human readable rendering of a decoded query result.
pub fn format_query_result(result: &QueryResult) -> String {
    let mut out = String::new();
    match result {
        QueryResult::Vector(samples) => {
            for sample in samples {
                out.push_str(&format!("Metric: {}\nValue: {}\n\n", sample.labels, sample.value));
            }
        }
        QueryResult::Matrix(series) => {
            for s in series {
                out.push_str(&format!("Metric: {}\nValues:\n", s.labels));
                for (t, v) in s.values.iter() {
                    out.push_str(&format!("  {}: {}\n", format_time(*t), v));
                }
                out.push('\n');
            }
        }
    }
    out
}

pub fn format_metric_names(names: &[String]) -> String {
    let mut out = String::from("\nAvailable Metrics:\n");
    for name in names {
        out.push_str(&format!("- {}\n", name));
    }
    out
}

fn format_time(t: EvalTime) -> String {
    match seconds_to_datetime(t) {
        Some(dt) => dt.format(TIME_FORMAT).to_string(),
        None => t.to_string(),
    }
}
