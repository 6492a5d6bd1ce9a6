use calamine::{open_workbook, Data, Reader, Xlsx};
use std::fmt::Display;
use std::io::{Read, Seek};
use std::path::Path;
use tracing::debug;

use crate::utils::error::ExtractError;

/// Parse XLSX using calamine: every sheet, tab between cells, newline between rows.
pub(crate) fn extract_xlsx(path: &Path) -> Result<String, ExtractError> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .map_err(|e| ExtractError::DecodeError(format!("Failed to open Excel file: {}", e)))?;
    workbook_text(&mut workbook)
}

#[cfg(feature = "legacy-spreadsheet")]
pub(crate) fn extract_xls(path: &Path) -> Result<String, ExtractError> {
    let mut workbook: calamine::Xls<_> = open_workbook(path)
        .map_err(|e| ExtractError::DecodeError(format!("Failed to open Excel file: {}", e)))?;
    workbook_text(&mut workbook)
}

#[cfg(not(feature = "legacy-spreadsheet"))]
pub(crate) fn extract_xls(_path: &Path) -> Result<String, ExtractError> {
    Err(ExtractError::DecoderUnavailable(
        "built without legacy-spreadsheet support".to_string(),
    ))
}

fn workbook_text<R, RS>(workbook: &mut R) -> Result<String, ExtractError>
where
    R: Reader<RS>,
    R::Error: Display,
    RS: Read + Seek,
{
    let mut rows = Vec::new();

    for sheet in workbook.sheet_names() {
        let range = workbook.worksheet_range(&sheet).map_err(|e| {
            ExtractError::DecodeError(format!("Failed to read worksheet {}: {}", sheet, e))
        })?;
        debug!("Sheet {}: {} rows", sheet, range.height());

        for row in range.rows() {
            let cells: Vec<String> = row.iter().map(cell_text).collect();
            rows.push(cells.join("\t"));
        }
    }

    Ok(rows.join("\n"))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(d) => d.to_string(),
        Data::DateTimeIso(d) => d.clone(),
        Data::DurationIso(d) => d.clone(),
        Data::Error(_) | Data::Empty => String::new(),
    }
}

/// Quote-aware CSV parse, re-emitted with tab between fields.
pub(crate) fn extract_csv(path: &Path) -> Result<String, ExtractError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| ExtractError::DecodeError(format!("Failed to open CSV file: {}", e)))?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| ExtractError::DecodeError(format!("Invalid CSV record: {}", e)))?;
        rows.push(record.iter().collect::<Vec<_>>().join("\t"));
    }

    Ok(rows.join("\n"))
}
