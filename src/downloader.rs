#![cfg(feature = "web")]

use crate::error::Result;
use crate::record::{AssetRecord, Column};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Convert asset rows to CSV format
///
/// The header row uses the canonical column names, so `LTB` is written without
/// the stray trailing space some source sheets carry. Empty cells stay empty.
///
/// # Arguments
/// * `rows` - Rows to write, typically a filtered subset
///
/// # Returns
/// * `String` - CSV content
///
/// # Examples
/// ```
/// use asset_dashboard::downloader::to_csv;
/// use asset_dashboard::record::AssetRecord;
///
/// let row = AssetRecord { aset: Some("Trafo1".into()), ..Default::default() };
/// let csv = to_csv(&[&row]);
/// assert!(csv.starts_with("ASET,BULAN,"));
/// ```
pub fn to_csv(rows: &[&AssetRecord]) -> String {
    let mut csv_content = String::new();

    let headers: Vec<&str> = Column::ALL.iter().map(|c| c.header()).collect();
    csv_content.push_str(&headers.join(","));
    csv_content.push('\n');

    for row in rows {
        let fields: Vec<String> = Column::ALL
            .iter()
            .map(|column| escape_csv(&cell_value(row, *column)))
            .collect();
        csv_content.push_str(&fields.join(","));
        csv_content.push('\n');
    }

    csv_content
}

/// Convert asset rows to XLSX format
///
/// Numeric columns are written as numbers so the export can be uploaded again.
///
/// # Arguments
/// * `rows` - Rows to write, typically a filtered subset
///
/// # Returns
/// * `Result<Vec<u8>>` - XLSX file content as bytes or an error
pub fn to_xlsx(rows: &[&AssetRecord]) -> Result<Vec<u8>> {
    use rust_xlsxwriter::Workbook;

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (c, column) in Column::ALL.iter().enumerate() {
        worksheet.write_string(0, c as u16, column.header())?;
    }

    for (r, row) in rows.iter().enumerate() {
        let r = (r + 1) as u32;
        for (c, column) in Column::ALL.iter().enumerate() {
            let c = c as u16;
            match number_value(row, *column) {
                Some(number) => {
                    worksheet.write_number(r, c, number)?;
                }
                None => {
                    let text = cell_value(row, *column);
                    if !text.is_empty() {
                        worksheet.write_string(r, c, &text)?;
                    }
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn number_value(row: &AssetRecord, column: Column) -> Option<f64> {
    match column {
        Column::Persen => row.persen,
        Column::SisaPersentase => row.sisa_persentase,
        Column::Maximo => row.maximo,
        Column::Ltb => row.ltb,
        Column::Gap => row.gap,
        _ => None,
    }
}

fn cell_value(row: &AssetRecord, column: Column) -> String {
    if let Some(number) = number_value(row, column) {
        return number.to_string();
    }

    let text = match column {
        Column::Aset => row.aset.clone(),
        Column::Bulan => row.bulan.clone(),
        Column::Status => row.status.clone(),
        Column::ClassDescription => row.class_description.clone(),
        Column::ChangedDate => row
            .changed_date
            .map(|date| date.format(DATE_FORMAT).to_string()),
        _ => None,
    };
    text.unwrap_or_default()
}

fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_bytes;
    use chrono::NaiveDate;

    fn row() -> AssetRecord {
        AssetRecord {
            aset: Some("Trafo, Gardu \"A\"".into()),
            bulan: Some("January".into()),
            persen: Some(55.5),
            ltb: Some(5.0),
            status: Some("OPERATING".into()),
            changed_date: NaiveDate::from_ymd_opt(2024, 3, 15).and_then(|d| d.and_hms_opt(8, 0, 0)),
            ..Default::default()
        }
    }

    #[test]
    fn csv_escapes_and_leaves_blanks() {
        let record = row();
        let csv = to_csv(&[&record]);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "ASET,BULAN,PERSEN,SISA PERSENTASE,MAXIMO,LTB,GAP,Status,Class Description,Changed Date"
        );
        assert_eq!(
            lines[1],
            "\"Trafo, Gardu \"\"A\"\"\",January,55.5,,,5,,OPERATING,,2024-03-15 08:00:00"
        );
    }

    #[test]
    fn xlsx_export_loads_back() {
        let record = row();
        let bytes = to_xlsx(&[&record]).unwrap();

        let table = load_bytes("export.xlsx", bytes).unwrap();
        assert!(table.missing_columns.is_empty());
        assert_eq!(table.len(), 1);

        let loaded = &table.records[0];
        assert_eq!(loaded.aset, record.aset);
        assert_eq!(loaded.persen, Some(55.5));
        assert_eq!(loaded.maximo, None);
        assert_eq!(loaded.changed_month.as_deref(), Some("March"));
    }
}
