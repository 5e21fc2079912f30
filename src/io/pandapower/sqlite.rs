use std::collections::BTreeMap;
use std::io::Write;

use rusqlite::{Connection, OpenFlags, types::ValueRef};
use serde_json::Value;
use tempfile::NamedTempFile;

use super::CodecError;
use super::file_io::Network;
use super::table::{ELEMENT_TABLES, Parameters, RawTable};

fn cell_value(v: ValueRef<'_>) -> Value {
    match v {
        ValueRef::Null | ValueRef::Blob(_) => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
    }
}

/// Reads one SQL table written by `DataFrame.to_sql`; the frame index lives in
/// a column named `index`.
fn read_table(conn: &Connection, name: &str) -> Result<RawTable, CodecError> {
    let mut stmt = conn.prepare(&format!("SELECT * FROM \"{name}\""))?;
    let names: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let index_col = names.iter().position(|c| c == "index");
    let mut table = RawTable {
        columns: names
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != index_col)
            .map(|(_, c)| c.clone())
            .collect(),
        ..Default::default()
    };
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(names.len());
        for i in 0..names.len() {
            values.push(cell_value(row.get_ref(i)?));
        }
        let index = match index_col {
            Some(i) => values.remove(i),
            None => Value::from(table.data.len()),
        };
        table.index.push(index);
        table.data.push(values);
    }
    Ok(table)
}

/// Decodes a database written by pandapower's `to_sqlite`.
///
/// SQLite only opens files, so the bytes go to a scratch file that is removed
/// when this function returns.
pub fn load_pandapower_sqlite(bytes: &[u8]) -> Result<Network, CodecError> {
    let mut scratch = NamedTempFile::new()?;
    scratch.write_all(bytes)?;
    scratch.flush()?;

    let conn = Connection::open_with_flags(scratch.path(), OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let present: Vec<String> = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?
        .query_map([], |row| row.get(0))?
        .collect::<Result<_, _>>()?;

    let mut tables = BTreeMap::new();
    for name in ELEMENT_TABLES {
        if present.iter().any(|p| p == name) {
            tables.insert(name.to_string(), read_table(&conn, name)?);
        }
    }
    let params = if present.iter().any(|p| p == "parameters") {
        Parameters::from_table(&read_table(&conn, "parameters")?)
    } else {
        Parameters::default()
    };
    drop(conn);

    if !tables.contains_key("bus") {
        return Err(CodecError::MissingTable("bus"));
    }
    Network::from_tables(&tables, params)
}
