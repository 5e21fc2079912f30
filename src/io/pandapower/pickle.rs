use std::collections::BTreeMap;

use serde_json::{Map, Value as Json};
use serde_pickle::{DeOptions, HashableValue, Value};

use super::CodecError;
use super::file_io::Network;
use super::table::{ELEMENT_TABLES, Parameters, RawTable};

fn key_to_string(key: &HashableValue) -> String {
    match key {
        HashableValue::String(s) => s.clone(),
        other => hashable_to_json(other).to_string(),
    }
}

fn hashable_to_json(v: &HashableValue) -> Json {
    match v {
        HashableValue::None => Json::Null,
        HashableValue::Bool(b) => Json::Bool(*b),
        HashableValue::I64(i) => Json::from(*i),
        HashableValue::Int(i) => big_to_json(&i.to_string()),
        HashableValue::F64(f) => Json::from(*f),
        HashableValue::Bytes(b) => Json::String(String::from_utf8_lossy(b).into_owned()),
        HashableValue::String(s) => Json::String(s.clone()),
        HashableValue::Tuple(items) => Json::Array(items.iter().map(hashable_to_json).collect()),
        HashableValue::FrozenSet(items) => {
            Json::Array(items.iter().map(hashable_to_json).collect())
        }
    }
}

fn big_to_json(digits: &str) -> Json {
    digits.parse::<f64>().map(Json::from).unwrap_or(Json::Null)
}

/// Converts a decoded pickle value into JSON so the shared table code can read it.
fn to_json(v: &Value) -> Json {
    match v {
        Value::None => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::I64(i) => Json::from(*i),
        Value::Int(i) => big_to_json(&i.to_string()),
        Value::F64(f) => Json::from(*f),
        Value::Bytes(b) => Json::String(String::from_utf8_lossy(b).into_owned()),
        Value::String(s) => Json::String(s.clone()),
        Value::List(items) | Value::Tuple(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Set(items) | Value::FrozenSet(items) => {
            Json::Array(items.iter().map(hashable_to_json).collect())
        }
        Value::Dict(map) => Json::Object(
            map.iter()
                .map(|(k, v)| (key_to_string(k), to_json(v)))
                .collect::<Map<_, _>>(),
        ),
    }
}

/// pandapower pickles each DataFrame as `{"DF": <split dict>, "dtypes": ...}`.
fn frame_to_table(item: &Value) -> Result<Option<RawTable>, CodecError> {
    let json = to_json(item);
    let split = match json.get("DF") {
        Some(df) => df,
        None if json.get("columns").is_some() => &json,
        None => return Ok(None),
    };
    RawTable::from_split(split).map(Some)
}

/// Decodes a network saved by pandapower's `to_pickle`.
pub fn load_pandapower_pickle(bytes: &[u8]) -> Result<Network, CodecError> {
    let value = serde_pickle::value_from_slice(bytes, DeOptions::new().replace_unresolved_globals())?;
    let Value::Dict(root) = value else {
        return Err(CodecError::Malformed(
            "pickle does not contain a network dictionary".into(),
        ));
    };

    let mut tables = BTreeMap::new();
    let mut params = Parameters::default();
    for (key, item) in &root {
        let key = key_to_string(key);
        if ELEMENT_TABLES.contains(&key.as_str()) {
            if let Some(table) = frame_to_table(item)? {
                tables.insert(key, table);
            }
        } else {
            params.set(&key, &to_json(item));
        }
    }
    if !tables.contains_key("bus") {
        return Err(CodecError::MissingTable("bus"));
    }
    Network::from_tables(&tables, params)
}
