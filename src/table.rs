use crate::record::{AssetRecord, BLANK_LABEL, Column, GroupKey};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Which values of a field a filter lets through
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub enum Selection {
    /// Every row, including rows where the field is empty
    #[default]
    All,
    /// Every row where the field has a value
    NonEmpty,
    /// Only rows whose field equals one of these values; [`BLANK_LABEL`] stands
    /// for an empty field
    Only(Vec<String>),
}

impl Selection {
    pub fn matches(&self, value: Option<&str>) -> bool {
        match self {
            Selection::All => true,
            Selection::NonEmpty => value.is_some(),
            Selection::Only(values) => {
                let value = value.unwrap_or(BLANK_LABEL);
                values.iter().any(|s| s == value)
            }
        }
    }

    /// Resolves the selection against the available options, keeping the caller's order
    pub fn resolve(&self, options: &[String]) -> Vec<String> {
        match self {
            Selection::All | Selection::NonEmpty => options.to_vec(),
            Selection::Only(values) => values.clone(),
        }
    }
}

/// Row filter over the four selectable fields
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RowFilter {
    pub status: Selection,
    pub changed_month: Selection,
    pub bulan: Selection,
    pub asset: Option<String>,
}

impl RowFilter {
    pub fn matches(&self, record: &AssetRecord) -> bool {
        self.status.matches(record.status.as_deref())
            && self.changed_month.matches(record.changed_month.as_deref())
            && self.bulan.matches(record.bulan.as_deref())
            && self.asset.as_deref().is_none_or(|asset| record.is_asset(asset))
    }
}

/// The immutable table loaded from one upload
#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct AssetTable {
    pub records: Vec<AssetRecord>,
    /// Recognized columns that were absent from the header row
    pub missing_columns: Vec<Column>,
}

impl AssetTable {
    pub fn new(records: Vec<AssetRecord>) -> Self {
        AssetTable {
            records,
            missing_columns: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn rows(&self) -> Vec<&AssetRecord> {
        self.records.iter().collect()
    }

    pub fn filter(&self, filter: &RowFilter) -> Vec<&AssetRecord> {
        self.records.iter().filter(|r| filter.matches(r)).collect()
    }
}

/// Distinct non-empty values of a field in first-seen order
pub fn unique_values(rows: &[&AssetRecord], key: GroupKey) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut values = Vec::new();
    for row in rows {
        if let Some(value) = row.key(key) {
            if seen.insert(value) {
                values.push(value.to_string());
            }
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(aset: &str, status: Option<&str>, bulan: &str) -> AssetRecord {
        AssetRecord {
            aset: Some(aset.into()),
            status: status.map(str::to_string),
            bulan: Some(bulan.into()),
            ..Default::default()
        }
    }

    fn table() -> AssetTable {
        AssetTable::new(vec![
            record("Trafo1", Some("OPERATING"), "January"),
            record("Trafo2", Some("BROKEN"), "January"),
            record("Trafo1", None, "February"),
        ])
    }

    #[test]
    fn default_filter_keeps_every_row() {
        let table = table();
        assert_eq!(table.filter(&RowFilter::default()).len(), 3);
    }

    #[test]
    fn status_selection_drops_rows_without_status() {
        let table = table();
        let filter = RowFilter {
            status: Selection::Only(vec!["OPERATING".into(), "BROKEN".into()]),
            ..Default::default()
        };
        assert_eq!(table.filter(&filter).len(), 2);
    }

    #[test]
    fn blank_label_selects_rows_without_status() {
        let table = table();
        let filter = RowFilter {
            status: Selection::Only(vec![BLANK_LABEL.into()]),
            ..Default::default()
        };
        let rows = table.filter(&filter);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].bulan.as_deref(), Some("February"));
    }

    #[test]
    fn non_empty_selection_skips_missing_values() {
        let table = table();
        let filter = RowFilter {
            status: Selection::NonEmpty,
            ..Default::default()
        };
        assert_eq!(table.filter(&filter).len(), 2);
        assert!(Selection::NonEmpty.matches(Some("OPERATING")));
        assert!(!Selection::NonEmpty.matches(None));
    }

    #[test]
    fn empty_selection_matches_nothing() {
        let table = table();
        let filter = RowFilter {
            status: Selection::Only(vec![]),
            ..Default::default()
        };
        assert!(table.filter(&filter).is_empty());
    }

    #[test]
    fn asset_and_bulan_combine() {
        let table = table();
        let filter = RowFilter {
            bulan: Selection::Only(vec!["January".into()]),
            asset: Some("Trafo1".into()),
            ..Default::default()
        };
        let rows = table.filter(&filter);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status.as_deref(), Some("OPERATING"));
    }

    #[test]
    fn unique_values_keep_first_seen_order() {
        let table = table();
        let rows = table.rows();
        assert_eq!(unique_values(&rows, GroupKey::Aset), vec!["Trafo1", "Trafo2"]);
        assert_eq!(unique_values(&rows, GroupKey::Status), vec!["OPERATING", "BROKEN"]);
    }

    #[test]
    fn resolve_keeps_caller_order() {
        let options = vec!["January".to_string(), "February".to_string()];
        assert_eq!(Selection::All.resolve(&options), options);
        let only = Selection::Only(vec!["February".into(), "January".into()]);
        assert_eq!(only.resolve(&options), vec!["February", "January"]);
    }
}
