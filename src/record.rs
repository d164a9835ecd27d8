use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Label used for rows whose grouping field is empty
pub const BLANK_LABEL: &str = "(blank)";

/// One row of the uploaded inventory workbook.
///
/// Every field is optional because the workbook is not validated: an empty cell,
/// or a column that is absent altogether, loads as `None`.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct AssetRecord {
    pub aset: Option<String>,
    pub bulan: Option<String>,
    pub persen: Option<f64>,
    pub sisa_persentase: Option<f64>,
    pub maximo: Option<f64>,
    pub ltb: Option<f64>,
    pub gap: Option<f64>,
    pub status: Option<String>,
    pub class_description: Option<String>,
    pub changed_date: Option<NaiveDateTime>,
    /// English month name of `changed_date`, e.g. "March"
    pub changed_month: Option<String>,
}

/// Columns the loader recognizes, keyed by their normalized header text
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    Aset,
    Bulan,
    Persen,
    SisaPersentase,
    Maximo,
    Ltb,
    Gap,
    Status,
    ClassDescription,
    ChangedDate,
}

impl Column {
    pub const ALL: [Column; 10] = [
        Column::Aset,
        Column::Bulan,
        Column::Persen,
        Column::SisaPersentase,
        Column::Maximo,
        Column::Ltb,
        Column::Gap,
        Column::Status,
        Column::ClassDescription,
        Column::ChangedDate,
    ];

    /// Canonical header text, as written on export
    pub fn header(&self) -> &'static str {
        match self {
            Column::Aset => "ASET",
            Column::Bulan => "BULAN",
            Column::Persen => "PERSEN",
            Column::SisaPersentase => "SISA PERSENTASE",
            Column::Maximo => "MAXIMO",
            Column::Ltb => "LTB",
            Column::Gap => "GAP",
            Column::Status => "Status",
            Column::ClassDescription => "Class Description",
            Column::ChangedDate => "Changed Date",
        }
    }

    /// Looks a header up after it has been normalized (trimmed, single-spaced)
    pub fn from_header(normalized: &str) -> Option<Self> {
        Column::ALL
            .iter()
            .copied()
            .find(|column| column.header().eq_ignore_ascii_case(normalized))
    }
}

/// Fields rows can be grouped or filtered by
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupKey {
    Aset,
    Bulan,
    Status,
    ClassDescription,
    ChangedMonth,
}

impl AssetRecord {
    pub fn key(&self, key: GroupKey) -> Option<&str> {
        let value = match key {
            GroupKey::Aset => &self.aset,
            GroupKey::Bulan => &self.bulan,
            GroupKey::Status => &self.status,
            GroupKey::ClassDescription => &self.class_description,
            GroupKey::ChangedMonth => &self.changed_month,
        };
        value.as_deref()
    }

    pub fn is_asset(&self, asset: &str) -> bool {
        self.aset.as_deref() == Some(asset)
    }

    pub fn is_empty(&self) -> bool {
        *self == AssetRecord::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_match_case_insensitively() {
        assert_eq!(Column::from_header("status"), Some(Column::Status));
        assert_eq!(Column::from_header("LTB"), Some(Column::Ltb));
        assert_eq!(
            Column::from_header("class description"),
            Some(Column::ClassDescription)
        );
        assert_eq!(Column::from_header("REMARK"), None);
    }

    #[test]
    fn key_reads_the_requested_field() {
        let record = AssetRecord {
            aset: Some("Trafo1".into()),
            status: Some("OPERATING".into()),
            ..Default::default()
        };
        assert_eq!(record.key(GroupKey::Aset), Some("Trafo1"));
        assert_eq!(record.key(GroupKey::Status), Some("OPERATING"));
        assert_eq!(record.key(GroupKey::Bulan), None);
        assert!(record.is_asset("Trafo1"));
        assert!(!record.is_empty());
        assert!(AssetRecord::default().is_empty());
    }
}
