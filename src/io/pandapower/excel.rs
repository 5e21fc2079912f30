use std::collections::BTreeMap;
use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use serde_json::Value;

use super::CodecError;
use super::file_io::Network;
use super::table::{ELEMENT_TABLES, Parameters, RawTable};

const PARAMETERS_SHEET: &str = "parameters";

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => Value::from(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::String(s) if s.is_empty() => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Empty | Data::Error(_) => Value::Null,
        other => Value::String(other.to_string()),
    }
}

/// Sheet layout written by pandas: header row, index in the first column.
fn sheet_to_table(range: &calamine::Range<Data>) -> RawTable {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return RawTable::default();
    };
    let columns = header
        .iter()
        .skip(1)
        .map(|c| match c {
            Data::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();
    let mut table = RawTable {
        columns,
        ..Default::default()
    };
    for row in rows {
        if row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        table.index.push(row.first().map(cell_value).unwrap_or(Value::Null));
        table.data.push(row.iter().skip(1).map(cell_value).collect());
    }
    table
}

/// Decodes a workbook written by pandapower's `to_excel`.
pub fn load_pandapower_excel(bytes: &[u8]) -> Result<Network, CodecError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let mut tables = BTreeMap::new();
    let mut params = Parameters::default();
    for name in workbook.sheet_names() {
        let is_element = ELEMENT_TABLES.contains(&name.as_str());
        if !is_element && name != PARAMETERS_SHEET {
            continue;
        }
        let range = workbook.worksheet_range(&name)?;
        let table = sheet_to_table(&range);
        if is_element {
            table.check_shape()?;
            tables.insert(name, table);
        } else {
            params = Parameters::from_table(&table);
        }
    }
    if !tables.contains_key("bus") {
        return Err(CodecError::MissingTable("bus"));
    }
    Network::from_tables(&tables, params)
}

pub(crate) fn write_cell(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &Value,
) -> Result<(), XlsxError> {
    match value {
        Value::Bool(b) => {
            sheet.write_boolean(row, col, *b)?;
        }
        Value::Number(n) => {
            if let Some(v) = n.as_f64().filter(|v| v.is_finite()) {
                sheet.write_number(row, col, v)?;
            }
        }
        Value::String(s) => {
            sheet.write_string(row, col, s)?;
        }
        Value::Null => {}
        other => {
            sheet.write_string(row, col, other.to_string())?;
        }
    }
    Ok(())
}

fn write_table(sheet: &mut Worksheet, table: &RawTable) -> Result<(), XlsxError> {
    for (c, name) in table.columns.iter().enumerate() {
        sheet.write_string(0, c as u16 + 1, name)?;
    }
    for (r, (index, row)) in table.index.iter().zip(&table.data).enumerate() {
        let r = r as u32 + 1;
        write_cell(sheet, r, 0, index)?;
        for (c, value) in row.iter().enumerate() {
            write_cell(sheet, r, c as u16 + 1, value)?;
        }
    }
    Ok(())
}

/// Writes the element tables of a network in the layout `load_pandapower_excel` reads.
pub fn to_excel(net: &Network) -> Result<Vec<u8>, CodecError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(PARAMETERS_SHEET)?;
    write_table(sheet, &Parameters::to_table(net))?;

    let tables = net.to_tables()?;
    for name in ELEMENT_TABLES {
        if let Some(table) = tables.get(name) {
            let sheet = workbook.add_worksheet();
            sheet.set_name(name)?;
            write_table(sheet, table)?;
        }
    }
    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::pandapower::NetworkBuilder;

    #[test]
    fn workbook_round_trip() {
        let mut b = NetworkBuilder::new(60.0, 100.0);
        let hv = b.bus("HV", 110.0);
        let lv = b.bus("", 20.0);
        b.ext_grid(hv, 1.02, 0.0);
        b.line(hv, lv, "L1", 10.0, 0.1, 0.4, 10.0, 0.5);
        b.load(lv, "", 5.0, 1.0);
        let net = b.build();

        let bytes = to_excel(&net).unwrap();
        let back = load_pandapower_excel(&bytes).unwrap();
        assert_eq!(back.bus, net.bus);
        assert_eq!(back.lines(), net.lines());
        assert_eq!(back.loads(), net.loads());
        assert_eq!(back.ext_grids(), net.ext_grids());
        assert_eq!(back.f_hz, 60.0);
        assert_eq!(back.sn_mva, 100.0);
        assert_eq!(back.generator, None);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(load_pandapower_excel(b"definitely not a workbook").is_err());
    }
}
