use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use serde_json::Value;

use super::error::{Error, Result};
use super::schema::{PowerFlowResult, TableData};
use crate::io::pandapower::excel::write_cell;

pub const SUMMARY_SHEET: &str = "Summary";
const NOT_AVAILABLE: &str = "N/A";

fn write_table(sheet: &mut Worksheet, table: &TableData, header: &Format) -> Result<(), XlsxError> {
    for (c, name) in table.columns.iter().enumerate() {
        sheet.write_string_with_format(0, c as u16, name, header)?;
    }
    for (r, row) in table.data.iter().enumerate() {
        for (c, name) in table.columns.iter().enumerate() {
            write_cell(sheet, r as u32 + 1, c as u16, row.get(name).unwrap_or(&Value::Null))?;
        }
    }
    Ok(())
}

fn write_metric(sheet: &mut Worksheet, row: u32, metric: &str, value: Option<f64>) -> Result<(), XlsxError> {
    sheet.write_string(row, 0, metric)?;
    match value {
        Some(v) => sheet.write_number(row, 1, v)?,
        None => sheet.write_string(row, 1, NOT_AVAILABLE)?,
    };
    Ok(())
}

/// Encodes a converged result as a workbook: one sheet per non-empty table
/// and a `Summary` sheet with the headline figures.
pub fn results_workbook(result: Option<&PowerFlowResult>) -> Result<Vec<u8>> {
    let result = result
        .filter(|r| r.converged)
        .ok_or_else(Error::nothing_to_export)?;

    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    for (name, table) in result.tables() {
        let sheet = workbook.add_worksheet();
        sheet.set_name(name)?;
        write_table(sheet, table, &header)?;
    }

    let sheet = workbook.add_worksheet();
    sheet.set_name(SUMMARY_SHEET)?;
    sheet.write_string_with_format(0, 0, "Metric", &header)?;
    sheet.write_string_with_format(0, 1, "Value", &header)?;
    sheet.write_string(1, 0, "Converged")?;
    sheet.write_string(1, 1, if result.converged { "Yes" } else { "No" })?;
    write_metric(sheet, 2, "Max Loading (%)", result.max_loading_percent)?;
    write_metric(sheet, 3, "Min Voltage (p.u.)", result.min_vm_pu)?;
    write_metric(sheet, 4, "Max Voltage (p.u.)", result.max_vm_pu)?;
    sheet.autofit();

    Ok(workbook.save_to_buffer()?)
}
