use serde::{Deserialize, Serialize};
use std::option::Option;

use super::de::{from_flag, from_float, from_number, from_opt_float, from_str};
use super::results::ResultTable;

//This module describes pandapower network tables as typed rows.

fn yes() -> bool {
    true
}

fn one() -> f64 {
    1.0
}

fn one_i() -> i64 {
    1
}

fn nan() -> f64 {
    f64::NAN
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Bus {
    #[serde(deserialize_with = "from_number")]
    pub index: i64,
    #[serde(default, deserialize_with = "from_str")]
    pub name: Option<String>,
    #[serde(deserialize_with = "from_float")]
    pub vn_kv: f64,
    #[serde(rename = "type", default, deserialize_with = "from_str")]
    pub type_: Option<String>,
    #[serde(default, deserialize_with = "from_str")]
    pub zone: Option<String>,
    #[serde(default = "yes", deserialize_with = "from_flag")]
    pub in_service: bool,
    #[serde(default, deserialize_with = "from_opt_float")]
    pub max_vm_pu: Option<f64>,
    #[serde(default, deserialize_with = "from_opt_float")]
    pub min_vm_pu: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Gen {
    #[serde(deserialize_with = "from_number")]
    pub index: i64,
    #[serde(default, deserialize_with = "from_str")]
    pub name: Option<String>,
    #[serde(deserialize_with = "from_number")]
    pub bus: i64,
    #[serde(deserialize_with = "from_float")]
    pub p_mw: f64,
    #[serde(default = "one", deserialize_with = "from_float")]
    pub vm_pu: f64,
    #[serde(default, deserialize_with = "from_opt_float")]
    pub sn_mva: Option<f64>,
    #[serde(default, deserialize_with = "from_opt_float")]
    pub min_q_mvar: Option<f64>,
    #[serde(default, deserialize_with = "from_opt_float")]
    pub max_q_mvar: Option<f64>,
    #[serde(default, deserialize_with = "from_opt_float")]
    pub min_p_mw: Option<f64>,
    #[serde(default, deserialize_with = "from_opt_float")]
    pub max_p_mw: Option<f64>,
    #[serde(default = "one", deserialize_with = "from_float")]
    pub scaling: f64,
    #[serde(default, deserialize_with = "from_flag")]
    pub slack: bool,
    #[serde(default = "one", deserialize_with = "from_float")]
    pub slack_weight: f64,
    #[serde(default, deserialize_with = "from_flag")]
    pub controllable: bool,
    #[serde(default = "yes", deserialize_with = "from_flag")]
    pub in_service: bool,
    #[serde(rename = "type", default, deserialize_with = "from_str")]
    pub type_: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Load {
    #[serde(deserialize_with = "from_number")]
    pub index: i64,
    #[serde(default, deserialize_with = "from_str")]
    pub name: Option<String>,
    #[serde(deserialize_with = "from_number")]
    pub bus: i64,
    #[serde(deserialize_with = "from_float")]
    pub p_mw: f64,
    #[serde(default, deserialize_with = "from_float")]
    pub q_mvar: f64,
    #[serde(default, deserialize_with = "from_float")]
    pub const_z_percent: f64,
    #[serde(default, deserialize_with = "from_float")]
    pub const_i_percent: f64,
    #[serde(default, deserialize_with = "from_opt_float")]
    pub sn_mva: Option<f64>,
    #[serde(default = "one", deserialize_with = "from_float")]
    pub scaling: f64,
    #[serde(default = "yes", deserialize_with = "from_flag")]
    pub in_service: bool,
    #[serde(rename = "type", default, deserialize_with = "from_str")]
    pub type_: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Line {
    #[serde(deserialize_with = "from_number")]
    pub index: i64,
    #[serde(default, deserialize_with = "from_str")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "from_str")]
    pub std_type: Option<String>,
    #[serde(deserialize_with = "from_number")]
    pub from_bus: i64,
    #[serde(deserialize_with = "from_number")]
    pub to_bus: i64,
    #[serde(deserialize_with = "from_float")]
    pub length_km: f64,
    #[serde(deserialize_with = "from_float")]
    pub r_ohm_per_km: f64,
    #[serde(deserialize_with = "from_float")]
    pub x_ohm_per_km: f64,
    #[serde(default, deserialize_with = "from_float")]
    pub c_nf_per_km: f64,
    #[serde(default, deserialize_with = "from_float")]
    pub g_us_per_km: f64,
    #[serde(default = "nan", deserialize_with = "from_float")]
    pub max_i_ka: f64,
    #[serde(default = "one", deserialize_with = "from_float")]
    pub df: f64,
    #[serde(default = "one_i", deserialize_with = "from_number")]
    pub parallel: i64,
    #[serde(rename = "type", default, deserialize_with = "from_str")]
    pub type_: Option<String>,
    #[serde(default = "yes", deserialize_with = "from_flag")]
    pub in_service: bool,
    #[serde(default, deserialize_with = "from_opt_float")]
    pub max_loading_percent: Option<f64>,
}

/// Represents a two-winding transformer in the network.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Transformer {
    #[serde(deserialize_with = "from_number")]
    pub index: i64,
    #[serde(default, deserialize_with = "from_str")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "from_str")]
    pub std_type: Option<String>,
    #[serde(deserialize_with = "from_number")]
    pub hv_bus: i64,
    #[serde(deserialize_with = "from_number")]
    pub lv_bus: i64,
    #[serde(deserialize_with = "from_float")]
    pub sn_mva: f64,
    #[serde(deserialize_with = "from_float")]
    pub vn_hv_kv: f64,
    #[serde(deserialize_with = "from_float")]
    pub vn_lv_kv: f64,
    #[serde(deserialize_with = "from_float")]
    pub vk_percent: f64,
    #[serde(deserialize_with = "from_float")]
    pub vkr_percent: f64,
    #[serde(default, deserialize_with = "from_float")]
    pub pfe_kw: f64,
    #[serde(default, deserialize_with = "from_float")]
    pub i0_percent: f64,
    #[serde(default, deserialize_with = "from_float")]
    pub shift_degree: f64,
    #[serde(default, deserialize_with = "from_str")]
    pub tap_side: Option<String>,
    #[serde(default, deserialize_with = "from_opt_float")]
    pub tap_neutral: Option<f64>,
    #[serde(default, deserialize_with = "from_opt_float")]
    pub tap_min: Option<f64>,
    #[serde(default, deserialize_with = "from_opt_float")]
    pub tap_max: Option<f64>,
    #[serde(default, deserialize_with = "from_opt_float")]
    pub tap_step_percent: Option<f64>,
    #[serde(default, deserialize_with = "from_opt_float")]
    pub tap_step_degree: Option<f64>,
    #[serde(default, deserialize_with = "from_opt_float")]
    pub tap_pos: Option<f64>,
    #[serde(default, deserialize_with = "from_flag")]
    pub tap_phase_shifter: bool,
    #[serde(default = "one_i", deserialize_with = "from_number")]
    pub parallel: i64,
    #[serde(default = "one", deserialize_with = "from_float")]
    pub df: f64,
    #[serde(default = "yes", deserialize_with = "from_flag")]
    pub in_service: bool,
    #[serde(default, deserialize_with = "from_opt_float")]
    pub max_loading_percent: Option<f64>,
}

/// Represents a three-winding transformer in the network.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Transformer3W {
    #[serde(deserialize_with = "from_number")]
    pub index: i64,
    #[serde(default, deserialize_with = "from_str")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "from_str")]
    pub std_type: Option<String>,
    #[serde(deserialize_with = "from_number")]
    pub hv_bus: i64,
    #[serde(deserialize_with = "from_number")]
    pub mv_bus: i64,
    #[serde(deserialize_with = "from_number")]
    pub lv_bus: i64,
    #[serde(default = "nan", deserialize_with = "from_float")]
    pub sn_hv_mva: f64,
    #[serde(default = "nan", deserialize_with = "from_float")]
    pub sn_mv_mva: f64,
    #[serde(default = "nan", deserialize_with = "from_float")]
    pub sn_lv_mva: f64,
    #[serde(default = "nan", deserialize_with = "from_float")]
    pub vn_hv_kv: f64,
    #[serde(default = "nan", deserialize_with = "from_float")]
    pub vn_mv_kv: f64,
    #[serde(default = "nan", deserialize_with = "from_float")]
    pub vn_lv_kv: f64,
    #[serde(default = "nan", deserialize_with = "from_float")]
    pub vk_hv_percent: f64,
    #[serde(default = "nan", deserialize_with = "from_float")]
    pub vk_mv_percent: f64,
    #[serde(default = "nan", deserialize_with = "from_float")]
    pub vk_lv_percent: f64,
    #[serde(default = "nan", deserialize_with = "from_float")]
    pub vkr_hv_percent: f64,
    #[serde(default = "nan", deserialize_with = "from_float")]
    pub vkr_mv_percent: f64,
    #[serde(default = "nan", deserialize_with = "from_float")]
    pub vkr_lv_percent: f64,
    #[serde(default, deserialize_with = "from_float")]
    pub pfe_kw: f64,
    #[serde(default, deserialize_with = "from_float")]
    pub i0_percent: f64,
    #[serde(default, deserialize_with = "from_float")]
    pub shift_mv_degree: f64,
    #[serde(default, deserialize_with = "from_float")]
    pub shift_lv_degree: f64,
    #[serde(default = "yes", deserialize_with = "from_flag")]
    pub in_service: bool,
}

/// Represents an external grid in the network.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ExtGrid {
    #[serde(deserialize_with = "from_number")]
    pub index: i64,
    #[serde(default, deserialize_with = "from_str")]
    pub name: Option<String>,
    #[serde(deserialize_with = "from_number")]
    pub bus: i64,
    #[serde(default = "one", deserialize_with = "from_float")]
    pub vm_pu: f64,
    #[serde(default, deserialize_with = "from_float")]
    pub va_degree: f64,
    #[serde(default = "one", deserialize_with = "from_float")]
    pub slack_weight: f64,
    #[serde(default, deserialize_with = "from_opt_float")]
    pub max_p_mw: Option<f64>,
    #[serde(default, deserialize_with = "from_opt_float")]
    pub min_p_mw: Option<f64>,
    #[serde(default, deserialize_with = "from_opt_float")]
    pub max_q_mvar: Option<f64>,
    #[serde(default, deserialize_with = "from_opt_float")]
    pub min_q_mvar: Option<f64>,
    #[serde(default = "yes", deserialize_with = "from_flag")]
    pub in_service: bool,
}

/// Represents the data from the sgen.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SGen {
    #[serde(deserialize_with = "from_number")]
    pub index: i64,
    #[serde(default, deserialize_with = "from_str")]
    pub name: Option<String>,
    #[serde(deserialize_with = "from_number")]
    pub bus: i64,
    #[serde(deserialize_with = "from_float")]
    pub p_mw: f64,
    #[serde(default, deserialize_with = "from_float")]
    pub q_mvar: f64,
    #[serde(default, deserialize_with = "from_opt_float")]
    pub sn_mva: Option<f64>,
    #[serde(default = "one", deserialize_with = "from_float")]
    pub scaling: f64,
    #[serde(default = "yes", deserialize_with = "from_flag")]
    pub in_service: bool,
    #[serde(rename = "type", default, deserialize_with = "from_str")]
    pub type_: Option<String>,
    #[serde(default, deserialize_with = "from_flag")]
    pub current_source: bool,
}

/// Represents a shunt in the network.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Shunt {
    #[serde(deserialize_with = "from_number")]
    pub index: i64,
    #[serde(default, deserialize_with = "from_str")]
    pub name: Option<String>,
    #[serde(deserialize_with = "from_number")]
    pub bus: i64,
    #[serde(default, deserialize_with = "from_float")]
    pub p_mw: f64,
    #[serde(default, deserialize_with = "from_float")]
    pub q_mvar: f64,
    #[serde(default = "nan", deserialize_with = "from_float")]
    pub vn_kv: f64,
    #[serde(default = "one_i", deserialize_with = "from_number")]
    pub step: i64,
    #[serde(default = "one_i", deserialize_with = "from_number")]
    pub max_step: i64,
    #[serde(default = "yes", deserialize_with = "from_flag")]
    pub in_service: bool,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize, Clone, Copy)]
#[serde(from = "String", into = "String")]
pub enum SwitchType {
    SwitchBusLine,
    SwitchBusTransformer,
    SwitchBusTransformer3w,
    #[default]
    SwitchTwoBuses,
    Unknown,
}

impl From<&str> for SwitchType {
    fn from(s: &str) -> SwitchType {
        match s {
            "l" => SwitchType::SwitchBusLine,
            "t" => SwitchType::SwitchBusTransformer,
            "t3" => SwitchType::SwitchBusTransformer3w,
            "b" => SwitchType::SwitchTwoBuses,
            _ => SwitchType::Unknown,
        }
    }
}

impl From<String> for SwitchType {
    fn from(s: String) -> SwitchType {
        SwitchType::from(s.as_str())
    }
}

impl From<SwitchType> for String {
    fn from(t: SwitchType) -> String {
        match t {
            SwitchType::SwitchBusLine => "l",
            SwitchType::SwitchBusTransformer => "t",
            SwitchType::SwitchBusTransformer3w => "t3",
            SwitchType::SwitchTwoBuses => "b",
            SwitchType::Unknown => "",
        }
        .to_string()
    }
}

/// Represents a switch in the network.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Switch {
    #[serde(deserialize_with = "from_number")]
    pub index: i64,
    #[serde(default, deserialize_with = "from_str")]
    pub name: Option<String>,
    #[serde(deserialize_with = "from_number")]
    pub bus: i64,
    #[serde(deserialize_with = "from_number")]
    pub element: i64,
    pub et: SwitchType,
    #[serde(rename = "type", default, deserialize_with = "from_str")]
    pub type_: Option<String>,
    #[serde(default = "yes", deserialize_with = "from_flag")]
    pub closed: bool,
    #[serde(default, deserialize_with = "from_float")]
    pub z_ohm: f64,
}

/// Component counts of a network.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSummary {
    pub n_bus: usize,
    pub n_line: usize,
    pub n_trafo: usize,
    pub n_trafo3w: usize,
    pub n_load: usize,
    pub n_gen: usize,
    pub n_sgen: usize,
    pub n_ext_grid: usize,
    pub n_shunt: usize,
    pub n_switch: usize,
}

/// Represents a network.
///
/// Element tables other than `bus` are optional: `None` means the source file
/// did not carry the table at all. Result tables are written by a solver and
/// stay `None` until a calculation converged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    #[serde(default, deserialize_with = "from_str")]
    pub name: Option<String>,
    #[serde(default = "default_f_hz", deserialize_with = "from_float")]
    pub f_hz: f64,
    #[serde(default = "one", deserialize_with = "from_float")]
    pub sn_mva: f64,
    pub bus: Vec<Bus>,
    #[serde(default)]
    pub line: Option<Vec<Line>>,
    #[serde(default)]
    pub trafo: Option<Vec<Transformer>>,
    #[serde(default)]
    pub trafo3w: Option<Vec<Transformer3W>>,
    #[serde(default)]
    pub load: Option<Vec<Load>>,
    #[serde(rename = "gen", default)]
    pub generator: Option<Vec<Gen>>,
    #[serde(default)]
    pub sgen: Option<Vec<SGen>>,
    #[serde(default)]
    pub ext_grid: Option<Vec<ExtGrid>>,
    #[serde(default)]
    pub shunt: Option<Vec<Shunt>>,
    #[serde(default)]
    pub switch: Option<Vec<Switch>>,

    #[serde(default)]
    pub res_bus: Option<ResultTable>,
    #[serde(default)]
    pub res_line: Option<ResultTable>,
    #[serde(default)]
    pub res_trafo: Option<ResultTable>,
    #[serde(default)]
    pub res_trafo3w: Option<ResultTable>,
    #[serde(default)]
    pub res_load: Option<ResultTable>,
    #[serde(default)]
    pub res_gen: Option<ResultTable>,
    #[serde(default)]
    pub res_sgen: Option<ResultTable>,
    #[serde(default)]
    pub res_ext_grid: Option<ResultTable>,
    #[serde(default)]
    pub res_shunt: Option<ResultTable>,
    #[serde(default)]
    pub converged: bool,
}

fn default_f_hz() -> f64 {
    50.0
}

impl Default for Network {
    fn default() -> Self {
        Self {
            name: None,
            f_hz: default_f_hz(),
            sn_mva: 1.0,
            bus: Vec::new(),
            line: None,
            trafo: None,
            trafo3w: None,
            load: None,
            generator: None,
            sgen: None,
            ext_grid: None,
            shunt: None,
            switch: None,
            res_bus: None,
            res_line: None,
            res_trafo: None,
            res_trafo3w: None,
            res_load: None,
            res_gen: None,
            res_sgen: None,
            res_ext_grid: None,
            res_shunt: None,
            converged: false,
        }
    }
}

#[inline(always)]
fn rows<T>(table: &Option<Vec<T>>) -> &[T] {
    table.as_deref().unwrap_or_default()
}

impl Network {
    pub fn lines(&self) -> &[Line] {
        rows(&self.line)
    }
    pub fn trafos(&self) -> &[Transformer] {
        rows(&self.trafo)
    }
    pub fn trafos3w(&self) -> &[Transformer3W] {
        rows(&self.trafo3w)
    }
    pub fn loads(&self) -> &[Load] {
        rows(&self.load)
    }
    pub fn gens(&self) -> &[Gen] {
        rows(&self.generator)
    }
    pub fn sgens(&self) -> &[SGen] {
        rows(&self.sgen)
    }
    pub fn ext_grids(&self) -> &[ExtGrid] {
        rows(&self.ext_grid)
    }
    pub fn shunts(&self) -> &[Shunt] {
        rows(&self.shunt)
    }
    pub fn switches(&self) -> &[Switch] {
        rows(&self.switch)
    }

    pub fn summary(&self) -> NetworkSummary {
        NetworkSummary {
            n_bus: self.bus.len(),
            n_line: self.lines().len(),
            n_trafo: self.trafos().len(),
            n_trafo3w: self.trafos3w().len(),
            n_load: self.loads().len(),
            n_gen: self.gens().len(),
            n_sgen: self.sgens().len(),
            n_ext_grid: self.ext_grids().len(),
            n_shunt: self.shunts().len(),
            n_switch: self.switches().len(),
        }
    }

    /// Drops every result table and resets the convergence flag.
    pub fn clear_results(&mut self) {
        self.res_bus = None;
        self.res_line = None;
        self.res_trafo = None;
        self.res_trafo3w = None;
        self.res_load = None;
        self.res_gen = None;
        self.res_sgen = None;
        self.res_ext_grid = None;
        self.res_shunt = None;
        self.converged = false;
    }
}
