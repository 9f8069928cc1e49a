use crate::error::AppError;
use crate::table::{CellValue, Table};
use chrono::NaiveDateTime;
use rust_xlsxwriter::{Format, Workbook, Worksheet};

/// MIME type of the workbook served by the dashboard.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Convert a table to CSV format
///
/// The first line holds the column names. Values containing commas,
/// quotes or newlines are quoted, with embedded quotes doubled.
///
/// # Arguments
/// * `table` - Reference to the table to convert
///
/// # Returns
/// * `String` - CSV content
///
/// # Examples
/// ```
/// use survey::table::{CellValue, Table};
/// use survey::downloader::to_csv;
///
/// let table = Table {
///     title: "Saran Masukan".to_string(),
///     columns: vec!["id".to_string(), "saran".to_string()],
///     rows: vec![vec![CellValue::Integer(1), CellValue::Text("Ruang tunggu, AC".to_string())]],
/// };
/// assert_eq!(to_csv(&table), "id,saran\n1,\"Ruang tunggu, AC\"\n");
/// ```
pub fn to_csv(table: &Table) -> String {
    let mut csv_content = String::new();

    // Add header row with column names
    push_csv_line(&mut csv_content, table.columns.iter().map(String::as_str));

    // Add data rows
    for row in &table.rows {
        let values: Vec<String> = row.iter().map(csv_value).collect();
        push_csv_line(&mut csv_content, values.iter().map(String::as_str));
    }

    csv_content
}

fn csv_value(value: &CellValue) -> String {
    match value {
        // Full precision in exports; the two-decimal form is for display only
        CellValue::Number(v) => v.to_string(),
        other => other.to_string(),
    }
}

fn push_csv_line<'a>(out: &mut String, values: impl Iterator<Item = &'a str>) {
    for (i, value) in values.enumerate() {
        if i > 0 {
            out.push(',');
        }
        if value.contains(',') || value.contains('"') || value.contains('\n') {
            let escaped = value.replace('"', "\"\"");
            out.push_str(&format!("\"{}\"", escaped));
        } else {
            out.push_str(value);
        }
    }
    out.push('\n');
}

/// Convert tables to XLSX format
///
/// This function exports several tables into one workbook using the rust_xlsxwriter library.
/// Each non-empty table becomes a worksheet named after the table title, with a bold
/// header row and no index column. Empty tables are skipped.
///
/// # Arguments
/// * `tables` - Tables to write, in sheet order
///
/// # Returns
/// * `Result<Vec<u8>, AppError>` - XLSX file content as bytes or an error
///
/// # Examples
/// ```
/// use survey::table::{CellValue, Table};
/// use survey::downloader::to_xlsx;
///
/// let table = Table {
///     title: "Responden".to_string(),
///     columns: vec!["id".to_string()],
///     rows: vec![vec![CellValue::Integer(1)]],
/// };
/// let bytes = to_xlsx(&[table]).unwrap();
/// assert!(bytes.starts_with(b"PK"));
/// ```
pub fn to_xlsx(tables: &[Table]) -> Result<Vec<u8>, AppError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    for table in tables.iter().filter(|t| !t.is_empty()) {
        let mut worksheet = Worksheet::new();
        worksheet.set_name(&table.title)?;

        for (c, column) in table.columns.iter().enumerate() {
            worksheet.write_string_with_format(0, c as u16, column, &header)?;
        }

        // Write cell data below the header
        for (r, row) in table.rows.iter().enumerate() {
            let r = (r + 1) as u32;
            for (c, value) in row.iter().enumerate() {
                let c = c as u16;
                match value {
                    CellValue::Integer(v) => {
                        worksheet.write_number(r, c, *v as f64)?;
                    }
                    CellValue::Number(v) => {
                        worksheet.write_number(r, c, *v)?;
                    }
                    CellValue::Text(v) => {
                        worksheet.write_string(r, c, v)?;
                    }
                    CellValue::Empty => {}
                }
            }
        }

        worksheet.autofit();
        workbook.push_worksheet(worksheet);
    }

    let buffer = workbook.save_to_buffer()?;

    Ok(buffer)
}

/// Download file name for an export made at `now`
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use survey::downloader::export_filename;
///
/// let now = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap().and_hms_opt(8, 5, 9).unwrap();
/// assert_eq!(export_filename(now), "hasil_survei_klinik_2025-04-01_080509.xlsx");
/// ```
pub fn export_filename(now: NaiveDateTime) -> String {
    format!("hasil_survei_klinik_{}.xlsx", now.format("%Y-%m-%d_%H%M%S"))
}
