//! Plain-text rendering of power flow results for the command line.

use std::fmt;

use serde_json::Value;
use tabled::{builder::Builder, settings::Style};

use crate::service::{PowerFlowResult, TableData};

/// A float printed with a fixed number of decimals.
#[derive(Clone, Copy, PartialEq, PartialOrd)]
pub(crate) struct FloatWrapper {
    pub(crate) value: f64,
    pub(crate) precision: usize,
}

impl FloatWrapper {
    pub fn new(value: f64, precision: usize) -> Self {
        FloatWrapper { value, precision }
    }
}

impl fmt::Display for FloatWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1$}", self.value, self.precision)
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::Number(n) if n.is_i64() || n.is_u64() => n.to_string(),
        Value::Number(n) => n
            .as_f64()
            .map(|v| FloatWrapper::new(v, 4).to_string())
            .unwrap_or_default(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Renders one result table as markdown.
pub fn markdown_table(table: &TableData) -> String {
    let mut builder = Builder::default();
    builder.push_record(table.columns.iter().cloned());
    for row in &table.data {
        builder.push_record(
            table
                .columns
                .iter()
                .map(|c| row.get(c).map(cell).unwrap_or_default()),
        );
    }
    builder.build().with(Style::markdown()).to_string()
}

fn optional(value: Option<f64>, precision: usize) -> String {
    value.map_or("N/A".to_string(), |v| FloatWrapper::new(v, precision).to_string())
}

/// Summary block followed by the requested tables, skipping absent ones.
pub fn render(result: &PowerFlowResult, tables: &[&str]) -> String {
    let log = &result.calculation_log;
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", result.message));
    out.push_str(&format!(
        "algorithm: {}  init: {}  max_iteration: {}  iterations: {}\n",
        log.algorithm,
        log.init_method,
        log.max_iteration,
        log.iterations.map_or("-".to_string(), |n| n.to_string()),
    ));
    out.push_str(&format!(
        "min vm: {} pu  max vm: {} pu  max loading: {} %\n",
        optional(result.min_vm_pu, 4),
        optional(result.max_vm_pu, 4),
        optional(result.max_loading_percent, 2),
    ));
    if let (Some(p), Some(q)) = (log.slack_p_mw, log.slack_q_mvar) {
        out.push_str(&format!(
            "slack: {} MW  {} Mvar\n",
            FloatWrapper::new(p, 4),
            FloatWrapper::new(q, 4)
        ));
    }
    for w in &log.warnings {
        out.push_str(&format!("warning: {w}\n"));
    }
    for (name, table) in result.tables() {
        if tables.contains(&name) {
            out.push_str(&format!("\n{name}\n{}\n", markdown_table(table)));
        }
    }
    out
}
