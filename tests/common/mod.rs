//! Encoders producing the files pandapower would write for a network, so
//! integration tests can upload every supported format.
#![allow(dead_code)]

use std::collections::BTreeMap;

use rusqlite::{Connection, types::Value as SqlValue};
use rustpower_web::io::pandapower::{Network, RawTable};
use serde_json::{Value, json};
use serde_pickle::{HashableValue, SerOptions, Value as PickleValue};
use tempfile::TempDir;

fn split(table: &RawTable) -> Value {
    json!({ "columns": table.columns, "index": table.index, "data": table.data })
}

pub fn to_pandapower_json(net: &Network) -> Vec<u8> {
    let mut object = serde_json::Map::new();
    for (name, table) in net.to_tables().unwrap() {
        object.insert(
            name,
            json!({
                "_module": "pandas.core.frame",
                "_class": "DataFrame",
                "_object": split(&table).to_string(),
                "orient": "split",
            }),
        );
    }
    object.insert("f_hz".into(), json!(net.f_hz));
    object.insert("sn_mva".into(), json!(net.sn_mva));
    object.insert("name".into(), json!(net.name));
    json!({
        "_module": "pandapower.auxiliary",
        "_class": "pandapowerNet",
        "_object": object,
    })
    .to_string()
    .into_bytes()
}

fn pickle_value(v: &Value) -> PickleValue {
    match v {
        Value::Null => PickleValue::None,
        Value::Bool(b) => PickleValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => PickleValue::I64(i),
            None => PickleValue::F64(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => PickleValue::String(s.clone()),
        Value::Array(items) => PickleValue::List(items.iter().map(pickle_value).collect()),
        Value::Object(map) => PickleValue::Dict(
            map.iter()
                .map(|(k, v)| (key(k), pickle_value(v)))
                .collect(),
        ),
    }
}

fn key(s: &str) -> HashableValue {
    HashableValue::String(s.to_string())
}

pub fn to_pandapower_pickle(net: &Network) -> Vec<u8> {
    let mut root = BTreeMap::new();
    for (name, table) in net.to_tables().unwrap() {
        let mut df = BTreeMap::new();
        df.insert(key("DF"), pickle_value(&split(&table)));
        df.insert(key("dtypes"), PickleValue::None);
        root.insert(key(&name), PickleValue::Dict(df));
    }
    root.insert(key("f_hz"), PickleValue::F64(net.f_hz));
    root.insert(key("sn_mva"), PickleValue::F64(net.sn_mva));
    serde_pickle::value_to_vec(&PickleValue::Dict(root), SerOptions::new()).unwrap()
}

fn sql_value(v: &Value) -> SqlValue {
    match v {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(*b as i64),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

pub fn to_pandapower_sqlite(net: &Network) -> Vec<u8> {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("net.db");
    let conn = Connection::open(&path).unwrap();
    for (name, table) in net.to_tables().unwrap() {
        let columns: Vec<String> = std::iter::once("index".to_string())
            .chain(table.columns.iter().cloned())
            .map(|c| format!("\"{c}\""))
            .collect();
        conn.execute(&format!("CREATE TABLE \"{name}\" ({})", columns.join(", ")), [])
            .unwrap();
        let marks = vec!["?"; columns.len()].join(", ");
        let sql = format!("INSERT INTO \"{name}\" VALUES ({marks})");
        for (index, row) in table.index.iter().zip(&table.data) {
            let values: Vec<SqlValue> =
                std::iter::once(index).chain(row.iter()).map(sql_value).collect();
            conn.execute(&sql, rusqlite::params_from_iter(values)).unwrap();
        }
    }
    conn.execute(
        "CREATE TABLE parameters (\"index\" INTEGER, name TEXT, f_hz REAL, sn_mva REAL)",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO parameters VALUES (0, ?1, ?2, ?3)",
        rusqlite::params![net.name, net.f_hz, net.sn_mva],
    )
    .unwrap();
    drop(conn);
    std::fs::read(&path).unwrap()
}
