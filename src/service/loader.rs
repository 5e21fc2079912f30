use tracing::{error, info, warn};

use super::error::{Error, Result};
use super::format::{FileFormat, supported_extensions};
use crate::io::pandapower::{
    CodecError, Network, json::load_pandapower_json, excel::load_pandapower_excel,
    pickle::load_pandapower_pickle, sqlite::load_pandapower_sqlite,
};

fn decode(bytes: &[u8], format: FileFormat) -> Result<Network, CodecError> {
    match format {
        FileFormat::Json => load_pandapower_json(bytes),
        FileFormat::Excel => load_pandapower_excel(bytes),
        FileFormat::Pickle => load_pandapower_pickle(bytes),
        FileFormat::Sqlite => load_pandapower_sqlite(bytes),
    }
}

/// Materializes a network from uploaded bytes.
///
/// The format comes from the filename. Codec failures are reported as
/// [`Error::InvalidNetwork`] and a network without buses is rejected.
pub fn load_network(bytes: &[u8], filename: &str) -> Result<(Network, FileFormat)> {
    let Some(format) = FileFormat::detect(filename) else {
        let supported = supported_extensions().join(", ");
        warn!(filename, supported = %supported, "unsupported file format");
        return Err(Error::UnsupportedFormat { supported });
    };
    info!(filename, format = %format, "loading network file");

    let network = decode(bytes, format).map_err(|e| {
        error!(filename, error = %e, "failed to load network");
        Error::InvalidNetwork(format!("Failed to load network: {e}"))
    })?;

    if network.bus.is_empty() {
        warn!(filename, "network has no buses");
        return Err(Error::InvalidNetwork(
            "Network must contain at least one bus".into(),
        ));
    }

    info!(
        filename,
        format = %format,
        n_bus = network.bus.len(),
        n_line = network.lines().len(),
        "network loaded"
    );
    Ok((network, format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::pandapower::{NetworkBuilder, excel::to_excel};

    #[test]
    fn rejects_unknown_extension_with_supported_list() {
        match load_network(b"{}", "net.csv") {
            Err(Error::UnsupportedFormat { supported }) => {
                assert!(supported.contains(".json"));
                assert!(supported.contains(".sqlite"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn codec_errors_become_invalid_network() {
        for name in ["a.json", "a.xlsx", "a.p", "a.db"] {
            let err = load_network(b"definitely not a network", name).unwrap_err();
            match err {
                Error::InvalidNetwork(msg) => assert!(msg.starts_with("Failed to load network: ")),
                other => panic!("{name}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn zero_buses_is_invalid() {
        let json = r#"{"_module":"pandapower.auxiliary","_class":"pandapowerNet","_object":{
            "bus":{"_module":"pandas.core.frame","_class":"DataFrame",
                   "_object":"{\"columns\":[\"name\",\"vn_kv\"],\"index\":[],\"data\":[]}"}}}"#;
        assert_no_buses(load_network(json.as_bytes(), "empty.json"));

        let empty = NetworkBuilder::new(50.0, 1.0).build();
        let bytes = to_excel(&empty).unwrap();
        assert_no_buses(load_network(&bytes, "empty.xlsx"));
        assert_no_buses(load_network(&empty_bus_pickle(), "empty.p"));
        assert_no_buses(load_network(&empty_bus_sqlite(), "empty.sqlite"));
    }

    fn assert_no_buses(loaded: Result<(Network, FileFormat)>) {
        match loaded {
            Err(Error::InvalidNetwork(msg)) => assert_eq!(msg, "Network must contain at least one bus"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    fn empty_bus_pickle() -> Vec<u8> {
        use serde_pickle::{HashableValue, SerOptions, Value};
        use std::collections::BTreeMap;

        let key = |k: &str| HashableValue::String(k.to_string());
        let columns = ["name", "vn_kv"].map(|c| Value::String(c.to_string()));
        let df = BTreeMap::from([
            (key("columns"), Value::List(columns.to_vec())),
            (key("index"), Value::List(vec![])),
            (key("data"), Value::List(vec![])),
        ]);
        let bus = BTreeMap::from([(key("DF"), Value::Dict(df)), (key("dtypes"), Value::None)]);
        let root = BTreeMap::from([(key("bus"), Value::Dict(bus)), (key("f_hz"), Value::F64(50.0))]);
        serde_pickle::value_to_vec(&Value::Dict(root), SerOptions::new()).unwrap()
    }

    fn empty_bus_sqlite() -> Vec<u8> {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("net.db");
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE bus (\"index\" INTEGER, name TEXT, vn_kv REAL);")
            .unwrap();
        drop(conn);
        std::fs::read(&path).unwrap()
    }

    #[test]
    fn loads_excel_round_trip() {
        let mut b = NetworkBuilder::new(50.0, 1.0);
        let b0 = b.bus("a", 20.0);
        let b1 = b.bus("b", 20.0);
        b.ext_grid(b0, 1.0, 0.0);
        b.line(b0, b1, "l", 1.0, 0.1, 0.1, 0.0, 0.3);
        let bytes = to_excel(&b.build()).unwrap();
        let (net, format) = load_network(&bytes, "Grid.XLSX").unwrap();
        assert_eq!(format, FileFormat::Excel);
        assert_eq!(net.summary().n_bus, 2);
        assert_eq!(net.summary().n_line, 1);
    }
}
