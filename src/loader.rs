use crate::error::{Error, Result};
use crate::record::{AssetRecord, Column};
use crate::table::AssetTable;
use calamine::{Data, DataType, Range, Reader, Xls, Xlsx, open_workbook_from_rs};
use chrono::{NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use log::{info, warn};
use regex::Regex;
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%d-%m-%Y", "%Y/%m/%d"];

/// Load an asset workbook from an uploaded buffer
///
/// The decoder is chosen from the extension of `file_name`: `xlsx` uses the
/// zipped-XML reader, `xls` the legacy binary reader. Anything else is rejected
/// before the bytes are looked at.
///
/// # Arguments
/// * `file_name` - Name the file was uploaded with
/// * `bytes` - Raw file content
///
/// # Returns
/// * `Result<AssetTable>` - The rows of the first worksheet or an error
///
/// # Examples
/// ```
/// use asset_dashboard::loader::load_bytes;
///
/// let err = load_bytes("assets.csv", Vec::new()).unwrap_err();
/// assert_eq!(err.to_string(), "Unsupported file type: csv");
/// ```
pub fn load_bytes(file_name: &str, bytes: Vec<u8>) -> Result<AssetTable> {
    let extension = file_extension(file_name)?;
    let cursor = Cursor::new(bytes);

    let range = match extension.as_str() {
        "xlsx" => {
            let workbook: Xlsx<_> =
                open_workbook_from_rs(cursor).map_err(calamine::Error::from)?;
            first_sheet(workbook)?
        }
        "xls" => {
            let workbook: Xls<_> = open_workbook_from_rs(cursor).map_err(calamine::Error::from)?;
            first_sheet(workbook)?
        }
        other => return Err(Error::UnsupportedFileType(other.to_string())),
    };

    let table = table_from_range(&range);
    info!(
        "Loaded {} asset rows from {} ({} columns missing)",
        table.len(),
        file_name,
        table.missing_columns.len()
    );
    Ok(table)
}

/// Load an asset workbook from disk
///
/// # Examples
/// ```no_run
/// use asset_dashboard::loader::load_path;
///
/// match load_path("aset.xlsx") {
///     Ok(table) => println!("Loaded {} rows", table.len()),
///     Err(e) => eprintln!("Error loading workbook: {}", e),
/// }
/// ```
pub fn load_path(path: impl AsRef<Path>) -> Result<AssetTable> {
    let path = path.as_ref();
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| Error::InvalidInput(format!("Invalid path: {}", path.display())))?;
    // Reject by extension before touching the file
    file_extension(file_name)?;
    let bytes = std::fs::read(path)?;
    load_bytes(file_name, bytes)
}

fn file_extension(file_name: &str) -> Result<String> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .ok_or(Error::MissingExtension)?;

    match extension.as_str() {
        "xlsx" | "xls" => Ok(extension),
        other => Err(Error::UnsupportedFileType(other.to_string())),
    }
}

fn first_sheet<RS, R>(mut workbook: R) -> Result<Range<Data>>
where
    RS: Read + Seek,
    R: Reader<RS>,
    calamine::Error: From<R::Error>,
{
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(Error::EmptyWorkbook)?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(calamine::Error::from)?;
    Ok(range)
}

/// Trims a header and collapses inner whitespace, so `"LTB "` reads as `"LTB"`
pub fn normalize_header(header: &str) -> String {
    WHITESPACE.replace_all(header.trim(), " ").into_owned()
}

/// Build the table from a worksheet whose first row holds the headers
pub fn table_from_range(range: &Range<Data>) -> AssetTable {
    let mut rows = range.rows();
    let mut index: HashMap<Column, usize> = HashMap::new();

    if let Some(header) = rows.next() {
        for (i, cell) in header.iter().enumerate() {
            let Some(text) = cell_text(cell) else {
                continue;
            };
            if let Some(column) = Column::from_header(&normalize_header(&text)) {
                index.entry(column).or_insert(i);
            }
        }
    }

    let missing_columns: Vec<Column> = Column::ALL
        .iter()
        .copied()
        .filter(|column| !index.contains_key(column))
        .collect();
    if !missing_columns.is_empty() {
        let names: Vec<&str> = missing_columns.iter().map(|c| c.header()).collect();
        warn!("Workbook is missing columns: {}", names.join(", "));
    }

    let records = rows
        .map(|row| read_record(row, &index))
        .filter(|record| !record.is_empty())
        .collect();

    AssetTable {
        records,
        missing_columns,
    }
}

fn read_record(row: &[Data], index: &HashMap<Column, usize>) -> AssetRecord {
    let cell = |column: Column| index.get(&column).and_then(|&i| row.get(i));
    let text = |column: Column| cell(column).and_then(cell_text);
    let number = |column: Column| cell(column).and_then(cell_number);

    let changed_date = cell(Column::ChangedDate).and_then(cell_date);
    let changed_month = changed_date.map(|date| date.format("%B").to_string());

    AssetRecord {
        aset: text(Column::Aset),
        bulan: text(Column::Bulan),
        persen: number(Column::Persen),
        sisa_persentase: number(Column::SisaPersentase),
        maximo: number(Column::Maximo),
        ltb: number(Column::Ltb),
        gap: number(Column::Gap),
        status: text(Column::Status),
        class_description: text(Column::ClassDescription),
        changed_date,
        changed_month,
    }
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(format_number(*f)),
        Data::Bool(b) => Some(b.to_string()),
        other => other
            .as_datetime()
            .map(|date| date.format("%Y-%m-%d").to_string()),
    }
}

fn cell_number(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn cell_date(cell: &Data) -> Option<NaiveDateTime> {
    let parsed = match cell {
        Data::Empty => return None,
        Data::String(s) if s.trim().is_empty() => return None,
        Data::String(s) => parse_date_text(s),
        other => other.as_datetime(),
    };
    if parsed.is_none() {
        warn!("Unreadable Changed Date value: {:?}", cell);
    }
    parsed
}

/// Parses the textual date layouts found in exported inventory sheets
///
/// Ambiguous slash dates are read month first.
pub fn parse_date_text(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
