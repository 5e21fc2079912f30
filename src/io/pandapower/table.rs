use std::collections::BTreeMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::CodecError;
use super::file_io::Network;

/// A DataFrame in pandas "split" orientation.
///
/// Every codec decodes its element tables into this shape first, so the
/// conversion into typed rows is shared between formats.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub index: Vec<Value>,
    pub data: Vec<Vec<Value>>,
}

/// Element tables that make up a network, in the order they are written out.
pub(crate) const ELEMENT_TABLES: [&str; 10] = [
    "bus", "line", "trafo", "trafo3w", "load", "gen", "sgen", "ext_grid", "shunt", "switch",
];

impl RawTable {
    /// Parses a `{"columns": [...], "index": [...], "data": [[...]]}` object.
    pub fn from_split(value: &Value) -> Result<Self, CodecError> {
        let obj = value
            .as_object()
            .ok_or_else(|| CodecError::Malformed("table is not an object".into()))?;
        let columns = obj
            .get("columns")
            .and_then(Value::as_array)
            .ok_or_else(|| CodecError::Malformed("table has no columns".into()))?
            .iter()
            .map(column_name)
            .collect::<Vec<_>>();
        let data = match obj.get("data") {
            Some(Value::Array(rows)) => rows
                .iter()
                .map(|r| {
                    r.as_array()
                        .cloned()
                        .ok_or_else(|| CodecError::Malformed("table row is not a list".into()))
                })
                .collect::<Result<Vec<_>, _>>()?,
            _ => Vec::new(),
        };
        let index = match obj.get("index") {
            Some(Value::Array(index)) => index.clone(),
            _ => (0..data.len()).map(Value::from).collect(),
        };
        let table = Self {
            columns,
            index,
            data,
        };
        table.check_shape()?;
        Ok(table)
    }

    pub(crate) fn check_shape(&self) -> Result<(), CodecError> {
        if self.index.len() != self.data.len() {
            return Err(CodecError::Malformed(format!(
                "table has {} index entries but {} rows",
                self.index.len(),
                self.data.len()
            )));
        }
        if let Some(row) = self.data.iter().find(|r| r.len() != self.columns.len()) {
            return Err(CodecError::Malformed(format!(
                "table row has {} values but {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Deserializes each row into `T`, with the row index under `"index"`.
    pub fn rows<T: DeserializeOwned>(&self, table: &str) -> Result<Vec<T>, CodecError> {
        self.data
            .iter()
            .zip(self.index.iter())
            .map(|(row, index)| {
                let mut obj: Map<String, Value> = self
                    .columns
                    .iter()
                    .zip(row.iter())
                    .filter(|(k, _)| k.as_str() != "index")
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                obj.insert("index".to_string(), index.clone());
                serde_json::from_value(Value::Object(obj)).map_err(|e| CodecError::Element {
                    table: table.to_string(),
                    index: index.to_string(),
                    message: e.to_string(),
                })
            })
            .collect()
    }

    /// Builds a split table from typed rows. The `index` field becomes the row index.
    pub fn from_rows<T: Serialize>(rows: &[T]) -> Result<Self, CodecError> {
        let mut table = RawTable::default();
        for row in rows {
            let Value::Object(mut obj) = serde_json::to_value(row)? else {
                return Err(CodecError::Malformed("element row is not a record".into()));
            };
            let index = obj.remove("index").unwrap_or(Value::Null);
            if table.columns.is_empty() {
                table.columns = obj.keys().cloned().collect();
            }
            table.index.push(index);
            table
                .data
                .push(table.columns.iter().map(|c| obj.remove(c).unwrap_or(Value::Null)).collect());
        }
        Ok(table)
    }
}

fn column_name(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Simple network attributes stored next to the element tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    pub name: Option<String>,
    pub f_hz: Option<f64>,
    pub sn_mva: Option<f64>,
}

impl Parameters {
    pub(crate) fn set(&mut self, key: &str, value: &Value) {
        let number = || match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        match key {
            "name" => {
                self.name = match value {
                    Value::String(s) if !s.is_empty() => Some(s.clone()),
                    _ => None,
                }
            }
            "f_hz" => self.f_hz = number().filter(|v| v.is_finite()),
            "sn_mva" => self.sn_mva = number().filter(|v| v.is_finite()),
            _ => {}
        }
    }

    /// Reads a `parameters` table, either one wide row or a `parameter` column.
    pub(crate) fn from_table(table: &RawTable) -> Self {
        let mut params = Parameters::default();
        if let Some(col) = table.columns.iter().position(|c| c == "parameter") {
            for (key, row) in table.index.iter().zip(&table.data) {
                params.set(&column_name(key), &row[col]);
            }
        } else if let Some(row) = table.data.first() {
            for (key, value) in table.columns.iter().zip(row) {
                params.set(key, value);
            }
        }
        params
    }

    pub(crate) fn to_table(net: &Network) -> RawTable {
        RawTable {
            columns: vec!["name".into(), "f_hz".into(), "sn_mva".into()],
            index: vec![Value::from(0)],
            data: vec![vec![
                net.name.clone().map(Value::from).unwrap_or(Value::Null),
                Value::from(net.f_hz),
                Value::from(net.sn_mva),
            ]],
        }
    }
}

macro_rules! read_tables {
    ($net:ident, $tables:ident, { $($field:ident: $key:expr),* $(,)? }) => {
        $(
            $net.$field = match $tables.get($key) {
                Some(t) => Some(t.rows($key)?),
                None => None,
            };
        )*
    };
}

macro_rules! write_tables {
    ($net:ident, $out:ident, { $($field:ident: $key:expr),* $(,)? }) => {
        $(
            if let Some(rows) = &$net.$field {
                $out.insert($key.to_string(), RawTable::from_rows(rows)?);
            }
        )*
    };
}

impl Network {
    /// Assembles a network from decoded element tables.
    pub fn from_tables(
        tables: &BTreeMap<String, RawTable>,
        params: Parameters,
    ) -> Result<Self, CodecError> {
        let mut net = Network::default();
        net.bus = match tables.get("bus") {
            Some(t) => t.rows("bus")?,
            None => Vec::new(),
        };
        read_tables!(net, tables, {
            line: "line",
            trafo: "trafo",
            trafo3w: "trafo3w",
            load: "load",
            generator: "gen",
            sgen: "sgen",
            ext_grid: "ext_grid",
            shunt: "shunt",
            switch: "switch",
        });
        net.name = params.name;
        if let Some(f) = params.f_hz {
            net.f_hz = f;
        }
        if let Some(s) = params.sn_mva {
            net.sn_mva = s;
        }
        Ok(net)
    }

    /// Element tables in split form, keyed by pandapower table name.
    pub fn to_tables(&self) -> Result<BTreeMap<String, RawTable>, CodecError> {
        let mut out = BTreeMap::new();
        out.insert("bus".to_string(), RawTable::from_rows(&self.bus)?);
        write_tables!(self, out, {
            line: "line",
            trafo: "trafo",
            trafo3w: "trafo3w",
            load: "load",
            generator: "gen",
            sgen: "sgen",
            ext_grid: "ext_grid",
            shunt: "shunt",
            switch: "switch",
        });
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::pandapower::Bus;
    use serde_json::json;

    #[test]
    fn split_rows_keep_their_index() {
        let t = RawTable::from_split(&json!({
            "columns": ["name", "vn_kv", "in_service"],
            "index": [10, 20],
            "data": [["a", 110.0, true], [null, 20.0, false]]
        }))
        .unwrap();
        let buses: Vec<Bus> = t.rows("bus").unwrap();
        assert_eq!(buses[0].index, 10);
        assert_eq!(buses[1].index, 20);
        assert_eq!(buses[1].name, None);
        assert!(!buses[1].in_service);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let res = RawTable::from_split(&json!({
            "columns": ["a", "b"], "index": [0], "data": [[1]]
        }));
        assert!(matches!(res, Err(CodecError::Malformed(_))));
    }

    #[test]
    fn bad_cell_names_table_and_row() {
        let t = RawTable::from_split(&json!({
            "columns": ["vn_kv"], "index": [5], "data": [["abc"]]
        }))
        .unwrap();
        let err = t.rows::<Bus>("bus").unwrap_err();
        assert!(err.to_string().contains("bus"));
        assert!(err.to_string().contains('5'));
    }

    #[test]
    fn parameters_accept_both_layouts() {
        let wide = RawTable {
            columns: vec!["f_hz".into(), "sn_mva".into()],
            index: vec![json!(0)],
            data: vec![vec![json!(60.0), json!(100)]],
        };
        let p = Parameters::from_table(&wide);
        assert_eq!(p.f_hz, Some(60.0));
        assert_eq!(p.sn_mva, Some(100.0));

        let tall = RawTable {
            columns: vec!["parameter".into()],
            index: vec![json!("name"), json!("f_hz")],
            data: vec![vec![json!("grid")], vec![json!("50")]],
        };
        let p = Parameters::from_table(&tall);
        assert_eq!(p.name.as_deref(), Some("grid"));
        assert_eq!(p.f_hz, Some(50.0));
    }

    #[test]
    fn rows_round_trip_through_split_form() {
        let t = RawTable::from_split(&json!({
            "columns": ["name", "vn_kv"], "index": [3], "data": [["x", 0.4]]
        }))
        .unwrap();
        let buses: Vec<Bus> = t.rows("bus").unwrap();
        let back = RawTable::from_rows(&buses).unwrap();
        assert_eq!(back.index, vec![json!(3)]);
        assert!(!back.columns.contains(&"index".to_string()));
        let again: Vec<Bus> = back.rows("bus").unwrap();
        assert_eq!(again, buses);
    }
}
