use std::collections::HashMap;

use serde_json::{Map, Number, Value};

use super::schema::{PowerFlowResult, TableData};
use crate::io::pandapower::{
    Bus, ExtGrid, Gen, Line, Load, Network, ResultTable, SGen, Shunt, Transformer, Transformer3W,
};

/// Placeholder shown for elements without a usable name.
pub const NO_NAME: &str = "-";

trait Named {
    fn index(&self) -> i64;
    fn name(&self) -> Option<&str>;
}

macro_rules! named {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Named for $ty {
                fn index(&self) -> i64 {
                    self.index
                }
                fn name(&self) -> Option<&str> {
                    self.name.as_deref()
                }
            }
        )*
    };
}

named!(Bus, Line, Transformer, Transformer3W, Load, Gen, SGen, ExtGrid, Shunt);

fn names_of<T: Named>(rows: &[T]) -> HashMap<i64, &str> {
    rows.iter()
        .map(|r| {
            let name = r.name().map(str::trim).filter(|n| !n.is_empty());
            (r.index(), name.unwrap_or(NO_NAME))
        })
        .collect()
}

pub fn round4(x: f64) -> f64 {
    (x * 1e4).round() / 1e4
}

fn cell(value: Option<f64>) -> Value {
    value
        .map(round4)
        .and_then(Number::from_f64)
        .map_or(Value::Null, Value::Number)
}

/// Converts one result table into its client form: `idx`, then `name`, then
/// the result columns rounded to 4 decimals. Empty or absent tables yield `None`.
pub fn table_data(table: Option<&ResultTable>, names: &HashMap<i64, &str>) -> Option<TableData> {
    let table = table.filter(|t| !t.is_empty())?;

    let mut columns = Vec::with_capacity(table.columns.len() + 2);
    columns.push("idx".to_string());
    columns.push("name".to_string());
    columns.extend(table.columns.iter().filter(|c| *c != "idx" && *c != "name").cloned());

    let data: Vec<Map<String, Value>> = table
        .index
        .iter()
        .zip(&table.data)
        .map(|(idx, row)| {
            let mut record = Map::new();
            record.insert("idx".into(), Value::from(*idx));
            let name = names.get(idx).copied().unwrap_or(NO_NAME);
            record.insert("name".into(), Value::from(name));
            for (column, value) in table.columns.iter().zip(row) {
                if column != "idx" && column != "name" {
                    record.insert(column.clone(), cell(*value));
                }
            }
            record
        })
        .collect();

    Some(TableData {
        row_count: data.len(),
        columns,
        data,
    })
}

fn fold_max(values: impl Iterator<Item = f64>) -> Option<f64> {
    values.fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.max(v))))
}

fn fold_min(values: impl Iterator<Item = f64>) -> Option<f64> {
    values.fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.min(v))))
}

fn column<'a>(table: &'a Option<ResultTable>, name: &'a str) -> impl Iterator<Item = f64> + 'a {
    table.iter().flat_map(move |t| t.values(name))
}

/// Copies the solved tables and summary figures of `net` into `result`.
pub fn populate(result: &mut PowerFlowResult, net: &Network) {
    result.res_bus = table_data(net.res_bus.as_ref(), &names_of(&net.bus));
    result.res_line = table_data(net.res_line.as_ref(), &names_of(net.lines()));
    result.res_trafo = table_data(net.res_trafo.as_ref(), &names_of(net.trafos()));
    result.res_trafo3w = table_data(net.res_trafo3w.as_ref(), &names_of(net.trafos3w()));
    result.res_load = table_data(net.res_load.as_ref(), &names_of(net.loads()));
    result.res_gen = table_data(net.res_gen.as_ref(), &names_of(net.gens()));
    result.res_sgen = table_data(net.res_sgen.as_ref(), &names_of(net.sgens()));
    result.res_ext_grid = table_data(net.res_ext_grid.as_ref(), &names_of(net.ext_grids()));
    result.res_shunt = table_data(net.res_shunt.as_ref(), &names_of(net.shunts()));

    result.max_loading_percent = fold_max(
        column(&net.res_line, "loading_percent").chain(column(&net.res_trafo, "loading_percent")),
    );
    result.min_vm_pu = fold_min(column(&net.res_bus, "vm_pu"));
    result.max_vm_pu = fold_max(column(&net.res_bus, "vm_pu"));
}

/// Total slack power `(p_mw, q_mvar)` over external grids and generators
/// flagged as slack, rounded to 4 decimals. `None` when neither has result rows.
pub fn slack_power(net: &Network) -> Option<(f64, f64)> {
    let mut rows = 0usize;
    let (mut p, mut q) = (0.0, 0.0);

    if let Some(t) = net.res_ext_grid.as_ref() {
        for idx in &t.index {
            rows += 1;
            p += t.get(*idx, "p_mw").unwrap_or(0.0);
            q += t.get(*idx, "q_mvar").unwrap_or(0.0);
        }
    }
    if let Some(t) = net.res_gen.as_ref() {
        for g in net.gens().iter().filter(|g| g.slack) {
            if t.index.contains(&g.index) {
                rows += 1;
                p += t.get(g.index, "p_mw").unwrap_or(0.0);
                q += t.get(g.index, "q_mvar").unwrap_or(0.0);
            }
        }
    }

    (rows > 0).then(|| (round4(p), round4(q)))
}
