use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::CodecError;
use super::file_io::Network;
use super::table::{ELEMENT_TABLES, Parameters, RawTable};

fn load_json_from_str(file_content: &str) -> Result<Map<String, Value>, CodecError> {
    match serde_json::from_str(file_content)? {
        Value::Object(obj) => Ok(obj),
        _ => Err(CodecError::Malformed("document is not a JSON object".into())),
    }
}

/// A pandapower DataFrame envelope stores its split table either as an
/// embedded JSON string or as an inline object.
fn load_pandapower_element_json(element: &Value) -> Result<Option<RawTable>, CodecError> {
    let inner = match element {
        Value::Object(obj) if obj.contains_key("_object") => &obj["_object"],
        Value::Object(obj) if obj.contains_key("columns") => element,
        _ => return Ok(None),
    };
    let table = match inner {
        Value::String(s) => RawTable::from_split(&Value::Object(load_json_from_str(s)?))?,
        Value::Object(_) => RawTable::from_split(inner)?,
        _ => return Err(CodecError::Malformed("DataFrame payload is not a table".into())),
    };
    Ok(Some(table))
}

/// Decodes a network saved by pandapower's `to_json`.
pub fn load_pandapower_json(bytes: &[u8]) -> Result<Network, CodecError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| CodecError::Malformed(format!("file is not UTF-8 text: {e}")))?;
    let mut map = load_json_from_str(text)?;
    let object = match map.remove("_object") {
        Some(Value::Object(obj)) => obj,
        Some(Value::String(s)) => load_json_from_str(&s)?,
        Some(_) => return Err(CodecError::Malformed("network payload is not an object".into())),
        None => map,
    };

    let mut tables = BTreeMap::new();
    for key in ELEMENT_TABLES {
        if let Some(table) = object.get(key) {
            if let Some(t) = load_pandapower_element_json(table)? {
                tables.insert(key.to_string(), t);
            }
        }
    }
    if !tables.contains_key("bus") {
        return Err(CodecError::MissingTable("bus"));
    }

    let mut params = Parameters::default();
    for key in ["name", "f_hz", "sn_mva"] {
        if let Some(v) = object.get(key) {
            params.set(key, v);
        }
    }
    Network::from_tables(&tables, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(table: Value) -> Value {
        json!({
            "_module": "pandas.core.frame",
            "_class": "DataFrame",
            "_object": table.to_string(),
            "orient": "split"
        })
    }

    #[test]
    fn test_load_json() {
        let doc = json!({
            "_module": "pandapower.auxiliary",
            "_class": "pandapowerNet",
            "_object": {
                "bus": envelope(json!({
                    "columns": ["name", "vn_kv", "type", "zone", "in_service"],
                    "index": [0, 1],
                    "data": [["HV", 110.0, "b", null, true], ["LV", 20.0, "b", null, true]]
                })),
                "line": envelope(json!({"columns": [], "index": [], "data": []})),
                "f_hz": 60.0,
                "sn_mva": 100,
                "name": "two bus"
            }
        });
        let net = load_pandapower_json(doc.to_string().as_bytes()).unwrap();
        assert_eq!(net.bus.len(), 2);
        assert_eq!(net.bus[1].name.as_deref(), Some("LV"));
        assert_eq!(net.lines().len(), 0);
        assert_eq!(net.f_hz, 60.0);
        assert_eq!(net.sn_mva, 100.0);
        assert_eq!(net.name.as_deref(), Some("two bus"));
    }

    #[test]
    fn inline_tables_are_accepted() {
        let doc = json!({
            "bus": {"columns": ["vn_kv"], "index": [0], "data": [[0.4]]}
        });
        let net = load_pandapower_json(doc.to_string().as_bytes()).unwrap();
        assert_eq!(net.bus[0].vn_kv, 0.4);
    }

    #[test]
    fn missing_bus_table_is_an_error() {
        let err = load_pandapower_json(br#"{"_object": {"f_hz": 50}}"#).unwrap_err();
        assert!(matches!(err, CodecError::MissingTable("bus")));
        assert!(load_pandapower_json(b"not json").is_err());
    }
}
