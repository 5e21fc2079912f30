//! Request and response shapes exchanged with clients.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{Error, Result};
use super::format::FileFormat;
use crate::io::pandapower::NetworkSummary;

pub const MAX_ITERATION_LIMIT: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub session_id: String,
    pub filename: String,
    pub file_format: FileFormat,
    pub network_summary: NetworkSummary,
    pub message: String,
}

fn default_algorithm() -> String {
    "nr".into()
}

fn default_init() -> String {
    "auto".into()
}

fn default_tolerance() -> f64 {
    1e-8
}

fn yes() -> bool {
    true
}

/// Parameters of a power flow run. Every field is optional on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerFlowRequest {
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    /// `None` lets the algorithm's default apply.
    #[serde(default)]
    pub max_iteration: Option<usize>,
    #[serde(default)]
    pub enforce_q_lims: bool,
    #[serde(default = "yes")]
    pub calculate_voltage_angles: bool,
    #[serde(default = "default_init")]
    pub init: String,
    #[serde(default = "default_tolerance")]
    pub tolerance_mva: f64,
}

impl Default for PowerFlowRequest {
    fn default() -> Self {
        Self {
            algorithm: default_algorithm(),
            max_iteration: None,
            enforce_q_lims: false,
            calculate_voltage_angles: true,
            init: default_init(),
            tolerance_mva: default_tolerance(),
        }
    }
}

impl PowerFlowRequest {
    /// Range checks applied where requests enter the service.
    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self.max_iteration {
            if !(1..=MAX_ITERATION_LIMIT).contains(&n) {
                return Err(Error::InvalidRequest(format!(
                    "max_iteration must be between 1 and {MAX_ITERATION_LIMIT}, got {n}"
                )));
            }
        }
        if !(self.tolerance_mva > 0.0) {
            return Err(Error::InvalidRequest(format!(
                "tolerance_mva must be greater than 0, got {}",
                self.tolerance_mva
            )));
        }
        Ok(())
    }
}

/// One extracted result table. Rows are keyed by the names in `columns`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    pub columns: Vec<String>,
    pub data: Vec<Map<String, Value>>,
    pub row_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationLog {
    pub algorithm: String,
    pub init_method: String,
    pub tolerance_mva: f64,
    pub max_iteration: usize,
    pub calculation_time_ms: Option<f64>,
    pub iterations: Option<usize>,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub slack_p_mw: Option<f64>,
    pub slack_q_mvar: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerFlowResult {
    pub converged: bool,
    pub message: String,
    pub iterations: Option<usize>,
    pub calculation_log: CalculationLog,
    pub res_bus: Option<TableData>,
    pub res_line: Option<TableData>,
    pub res_trafo: Option<TableData>,
    pub res_trafo3w: Option<TableData>,
    pub res_load: Option<TableData>,
    pub res_gen: Option<TableData>,
    pub res_sgen: Option<TableData>,
    pub res_ext_grid: Option<TableData>,
    pub res_shunt: Option<TableData>,
    pub max_loading_percent: Option<f64>,
    pub min_vm_pu: Option<f64>,
    pub max_vm_pu: Option<f64>,
}

impl PowerFlowResult {
    /// Non-empty tables with their category names, in a fixed order.
    pub fn tables(&self) -> Vec<(&'static str, &TableData)> {
        [
            ("res_bus", &self.res_bus),
            ("res_line", &self.res_line),
            ("res_trafo", &self.res_trafo),
            ("res_trafo3w", &self.res_trafo3w),
            ("res_load", &self.res_load),
            ("res_gen", &self.res_gen),
            ("res_sgen", &self.res_sgen),
            ("res_ext_grid", &self.res_ext_grid),
            ("res_shunt", &self.res_shunt),
        ]
        .into_iter()
        .filter_map(|(name, t)| t.as_ref().filter(|t| t.row_count > 0).map(|t| (name, t)))
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatInfo {
    pub extensions: Vec<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatsResponse {
    pub formats: BTreeMap<FileFormat, FormatInfo>,
    pub all_extensions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleNetworkInfo {
    pub case_name: String,
    pub display_name: String,
    pub description_zh: String,
    pub description_en: String,
    pub bus_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleCategoryInfo {
    pub name_zh: String,
    pub name_en: String,
    pub networks: Vec<ExampleNetworkInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleListResponse {
    pub categories: BTreeMap<String, ExampleCategoryInfo>,
}
