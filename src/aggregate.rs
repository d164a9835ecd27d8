//! Pure aggregations over a filtered row subset.
//!
//! Every function takes the rows it should look at and returns a small derived
//! table. None of them mutate the records; the percentage clamp in particular is a
//! display rule and is only ever applied to the returned pair.

use crate::record::{AssetRecord, BLANK_LABEL, GroupKey};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Year the BULAN labels are placed in when building the growth timeline
pub const DEFAULT_REPORT_YEAR: i32 = 2024;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupCount {
    pub category: String,
    pub count: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PercentagePair {
    pub persen: Option<f64>,
    pub sisa_persentase: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct KpiPair {
    pub maximo: Option<f64>,
    pub ltb: Option<f64>,
}

/// MAXIMO/LTB of one asset in one BULAN
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthlyKpi {
    pub bulan: String,
    pub kpi: KpiPair,
}

/// One point of the MAXIMO/LTB growth line
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GrowthPoint {
    pub date: NaiveDate,
    /// Axis label, e.g. "Jan 2024"
    pub label: String,
    pub kpi: KpiPair,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GapTotal {
    pub value: f64,
    pub formatted: String,
}

/// Counts rows per category, largest group first
///
/// Ties are ordered by category name. Rows with an empty key are counted under
/// [`BLANK_LABEL`], so the counts always add up to `rows.len()`.
///
/// # Examples
/// ```
/// use asset_dashboard::aggregate::group_counts;
/// use asset_dashboard::record::{AssetRecord, GroupKey};
///
/// let rows = vec![
///     AssetRecord { status: Some("OPERATING".into()), ..Default::default() },
///     AssetRecord { status: Some("BROKEN".into()), ..Default::default() },
///     AssetRecord { status: Some("OPERATING".into()), ..Default::default() },
/// ];
/// let refs: Vec<&AssetRecord> = rows.iter().collect();
/// let counts = group_counts(&refs, GroupKey::Status);
/// assert_eq!(counts[0].category, "OPERATING");
/// assert_eq!(counts[0].count, 2);
/// ```
pub fn group_counts(rows: &[&AssetRecord], key: GroupKey) -> Vec<GroupCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for row in rows {
        *counts.entry(row.key(key).unwrap_or(BLANK_LABEL)).or_insert(0) += 1;
    }

    let mut result: Vec<GroupCount> = counts
        .into_iter()
        .map(|(category, count)| GroupCount {
            category: category.to_string(),
            count,
        })
        .collect();
    result.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
    result
}

/// PERSEN and SISA PERSENTASE of the asset's first row, clamped for display
///
/// A PERSEN above 100 shows as (100, 0) and one below 0 as (0, 100); anything
/// else, including a missing PERSEN, is passed through unchanged.
pub fn percentage_pair(rows: &[&AssetRecord], asset: &str) -> Option<PercentagePair> {
    let row = rows.iter().find(|row| row.is_asset(asset))?;
    Some(clamp_percentage(row.persen, row.sisa_persentase))
}

pub fn clamp_percentage(persen: Option<f64>, sisa_persentase: Option<f64>) -> PercentagePair {
    match persen {
        Some(p) if p > 100.0 => PercentagePair {
            persen: Some(100.0),
            sisa_persentase: Some(0.0),
        },
        Some(p) if p < 0.0 => PercentagePair {
            persen: Some(0.0),
            sisa_persentase: Some(100.0),
        },
        _ => PercentagePair {
            persen,
            sisa_persentase,
        },
    }
}

/// MAXIMO and LTB of the asset's first row
pub fn kpi_pair(rows: &[&AssetRecord], asset: &str) -> Option<KpiPair> {
    rows.iter().find(|row| row.is_asset(asset)).map(|row| KpiPair {
        maximo: row.maximo,
        ltb: row.ltb,
    })
}

/// MAXIMO/LTB per BULAN, following the caller's month order
///
/// Months without a row for the asset are left out rather than zero-filled.
pub fn kpi_series(rows: &[&AssetRecord], asset: &str, months: &[String]) -> Vec<MonthlyKpi> {
    months
        .iter()
        .filter_map(|month| {
            rows.iter()
                .find(|row| row.is_asset(asset) && row.bulan.as_deref() == Some(month.as_str()))
                .map(|row| MonthlyKpi {
                    bulan: month.clone(),
                    kpi: KpiPair {
                        maximo: row.maximo,
                        ltb: row.ltb,
                    },
                })
        })
        .collect()
}

/// The asset's rows in calendar order of their BULAN
///
/// BULAN values that are not English month names are skipped. Rows sharing a
/// month keep their table order.
pub fn growth_series(rows: &[&AssetRecord], asset: &str, year: i32) -> Vec<GrowthPoint> {
    let mut points: Vec<GrowthPoint> = rows
        .iter()
        .filter(|row| row.is_asset(asset))
        .filter_map(|row| {
            let date = bulan_date(row.bulan.as_deref()?, year)?;
            Some(GrowthPoint {
                date,
                label: date.format("%b %Y").to_string(),
                kpi: KpiPair {
                    maximo: row.maximo,
                    ltb: row.ltb,
                },
            })
        })
        .collect();
    points.sort_by_key(|point| point.date);
    points
}

/// First day of the named month, e.g. ("march", 2024) -> 2024-03-01
pub fn bulan_date(bulan: &str, year: i32) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{} {} 1", bulan.trim(), year), "%B %Y %d").ok()
}

/// Sum of GAP over the rows, skipping empty cells
pub fn total_gap(rows: &[&AssetRecord]) -> GapTotal {
    let value: f64 = rows.iter().filter_map(|row| row.gap).sum();
    GapTotal {
        value,
        formatted: format_thousands(value),
    }
}

/// Rounds to a whole number and groups digits by thousands
///
/// # Examples
/// ```
/// use asset_dashboard::aggregate::format_thousands;
///
/// assert_eq!(format_thousands(1234567.4), "1,234,567");
/// assert_eq!(format_thousands(-9876.0), "-9,876");
/// assert_eq!(format_thousands(0.0), "0");
/// ```
pub fn format_thousands(value: f64) -> String {
    let rounded = format!("{:.0}", value);
    let (sign, digits) = match rounded.strip_prefix('-') {
        Some(digits) => ("-", digits),
        None => ("", rounded.as_str()),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if grouped.chars().all(|c| c == '0') {
        grouped
    } else {
        format!("{}{}", sign, grouped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(aset: &str, bulan: &str, maximo: f64, ltb: f64) -> AssetRecord {
        AssetRecord {
            aset: Some(aset.into()),
            bulan: Some(bulan.into()),
            maximo: Some(maximo),
            ltb: Some(ltb),
            ..Default::default()
        }
    }

    #[test]
    fn group_counts_sum_to_row_count() {
        let records = vec![
            AssetRecord {
                class_description: Some("TRANSFORMER".into()),
                ..Default::default()
            },
            AssetRecord {
                class_description: Some("CUBICLE".into()),
                ..Default::default()
            },
            AssetRecord {
                class_description: Some("TRANSFORMER".into()),
                ..Default::default()
            },
            AssetRecord::default(),
        ];
        let rows: Vec<&AssetRecord> = records.iter().collect();

        let counts = group_counts(&rows, GroupKey::ClassDescription);
        assert_eq!(counts.iter().map(|c| c.count).sum::<usize>(), rows.len());
        assert_eq!(counts[0].category, "TRANSFORMER");
        assert_eq!(counts[0].count, 2);
        // ties by name
        assert_eq!(counts[1].category, BLANK_LABEL);
        assert_eq!(counts[2].category, "CUBICLE");
    }

    #[test]
    fn group_counts_of_nothing() {
        assert!(group_counts(&[], GroupKey::Status).is_empty());
    }

    #[test]
    fn percentage_is_clamped_for_display() {
        assert_eq!(
            clamp_percentage(Some(150.0), Some(-50.0)),
            PercentagePair {
                persen: Some(100.0),
                sisa_persentase: Some(0.0)
            }
        );
        assert_eq!(
            clamp_percentage(Some(-10.0), Some(110.0)),
            PercentagePair {
                persen: Some(0.0),
                sisa_persentase: Some(100.0)
            }
        );
        assert_eq!(
            clamp_percentage(Some(55.0), Some(40.0)),
            PercentagePair {
                persen: Some(55.0),
                sisa_persentase: Some(40.0)
            }
        );
        assert_eq!(
            clamp_percentage(None, Some(40.0)),
            PercentagePair {
                persen: None,
                sisa_persentase: Some(40.0)
            }
        );
    }

    #[test]
    fn percentage_pair_uses_first_matching_row_and_leaves_record_alone() {
        let records = vec![
            AssetRecord {
                aset: Some("Trafo1".into()),
                persen: Some(150.0),
                sisa_persentase: Some(-50.0),
                ..Default::default()
            },
            AssetRecord {
                aset: Some("Trafo1".into()),
                persen: Some(20.0),
                ..Default::default()
            },
        ];
        let rows: Vec<&AssetRecord> = records.iter().collect();

        let pair = percentage_pair(&rows, "Trafo1").unwrap();
        assert_eq!(pair.persen, Some(100.0));
        assert_eq!(records[0].persen, Some(150.0));
        assert_eq!(percentage_pair(&rows, "Trafo9"), None);
    }

    #[test]
    fn kpi_pair_of_first_row() {
        let records = vec![row("Trafo1", "January", 10.0, 5.0), row("Trafo1", "February", 1.0, 2.0)];
        let rows: Vec<&AssetRecord> = records.iter().collect();
        assert_eq!(
            kpi_pair(&rows, "Trafo1"),
            Some(KpiPair {
                maximo: Some(10.0),
                ltb: Some(5.0)
            })
        );
        assert_eq!(kpi_pair(&rows, "Trafo2"), None);
    }

    #[test]
    fn kpi_series_omits_months_without_rows() {
        let records = vec![
            row("Trafo1", "March", 30.0, 3.0),
            row("Trafo1", "January", 10.0, 1.0),
            row("Trafo2", "February", 99.0, 9.0),
        ];
        let rows: Vec<&AssetRecord> = records.iter().collect();
        let months: Vec<String> = ["January", "February", "March"]
            .iter()
            .map(|m| m.to_string())
            .collect();

        let series = kpi_series(&rows, "Trafo1", &months);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].bulan, "January");
        assert_eq!(series[0].kpi.maximo, Some(10.0));
        assert_eq!(series[1].bulan, "March");
    }

    #[test]
    fn growth_series_is_in_calendar_order() {
        let records = vec![
            row("Trafo1", "March", 30.0, 3.0),
            row("Trafo1", "January", 10.0, 1.0),
            row("Trafo1", "Bulan Lalu", 0.0, 0.0),
            row("Trafo1", "february", 20.0, 2.0),
        ];
        let rows: Vec<&AssetRecord> = records.iter().collect();

        let series = growth_series(&rows, "Trafo1", DEFAULT_REPORT_YEAR);
        let labels: Vec<&str> = series.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["Jan 2024", "Feb 2024", "Mar 2024"]);
        assert_eq!(series[2].kpi.maximo, Some(30.0));
    }

    #[test]
    fn total_gap_of_empty_subset_is_zero() {
        let gap = total_gap(&[]);
        assert_eq!(gap.value, 0.0);
        assert_eq!(gap.formatted, "0");
    }

    #[test]
    fn total_gap_skips_empty_cells() {
        let records = vec![
            AssetRecord {
                gap: Some(1500.0),
                ..Default::default()
            },
            AssetRecord::default(),
            AssetRecord {
                gap: Some(2500.25),
                ..Default::default()
            },
        ];
        let rows: Vec<&AssetRecord> = records.iter().collect();
        let gap = total_gap(&rows);
        assert_eq!(gap.value, 4000.25);
        assert_eq!(gap.formatted, "4,000");
    }

    #[test]
    fn thousands_formatting() {
        assert_eq!(format_thousands(3.0), "3");
        assert_eq!(format_thousands(999.0), "999");
        assert_eq!(format_thousands(1000.0), "1,000");
        assert_eq!(format_thousands(123456.6), "123,457");
        assert_eq!(format_thousands(-0.2), "0");
        assert_eq!(format_thousands(-1234.0), "-1,234");
    }

    #[test]
    fn single_trafo_row_end_to_end() {
        let records = vec![AssetRecord {
            aset: Some("Trafo1".into()),
            bulan: Some("January".into()),
            persen: Some(120.0),
            maximo: Some(10.0),
            ltb: Some(5.0),
            gap: Some(3.0),
            ..Default::default()
        }];
        let rows: Vec<&AssetRecord> = records.iter().collect();

        let pair = percentage_pair(&rows, "Trafo1").unwrap();
        assert_eq!((pair.persen, pair.sisa_persentase), (Some(100.0), Some(0.0)));
        let kpi = kpi_pair(&rows, "Trafo1").unwrap();
        assert_eq!((kpi.maximo, kpi.ltb), (Some(10.0), Some(5.0)));
        assert_eq!(total_gap(&rows).formatted, "3");
    }
}
