//! View models for the two dashboard pages.
//!
//! A view is computed from scratch for every request out of an immutable
//! `(table, filter)` snapshot. Charts that have nothing to show are left as `None`
//! and, where the user asked for something specific, a warning says why.

use crate::aggregate::{
    GapTotal, GroupCount, GrowthPoint, KpiPair, MonthlyKpi, PercentagePair, group_counts,
    growth_series, kpi_pair, kpi_series, percentage_pair, total_gap,
};
use crate::record::{AssetRecord, BLANK_LABEL, GroupKey};
use crate::table::{AssetTable, RowFilter, Selection, unique_values};
use serde::{Deserialize, Serialize};

/// Which dashboard page is shown
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Page {
    #[default]
    Home,
    /// "Distribusi Aset", the per-asset breakdown
    News,
}

impl Page {
    /// Unknown page names fall back to Home
    pub fn from_query(page: Option<&str>) -> Self {
        match page {
            Some(p) if p.eq_ignore_ascii_case("news") => Page::News,
            _ => Page::Home,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Page::Home => "Home",
            Page::News => "Distribusi Aset",
        }
    }
}

/// Filter selections of the Home page
///
/// By default every option is selected. Rows without a status stay in (they are
/// offered as [`BLANK_LABEL`]); rows without a changed month or BULAN have no
/// option to select and are left out.
#[derive(Clone, Debug, PartialEq)]
pub struct HomeFilter {
    pub status: Selection,
    pub changed_month: Selection,
    pub bulan: Selection,
    pub asset: Option<String>,
}

impl Default for HomeFilter {
    fn default() -> Self {
        HomeFilter {
            status: Selection::All,
            changed_month: Selection::NonEmpty,
            bulan: Selection::NonEmpty,
            asset: None,
        }
    }
}

impl HomeFilter {
    /// Rows feeding the class-description chart and the status metrics
    pub fn summary_filter(&self) -> RowFilter {
        RowFilter {
            status: self.status.clone(),
            changed_month: self.changed_month.clone(),
            ..Default::default()
        }
    }

    /// Rows feeding the asset selector and the per-asset charts
    pub fn bulan_filter(&self) -> RowFilter {
        RowFilter {
            bulan: self.bulan.clone(),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterOption {
    pub value: String,
    pub selected: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HomeSummary {
    pub total_assets: usize,
    pub class_counts: Vec<GroupCount>,
    pub status_counts: Vec<GroupCount>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssetPanel {
    pub asset: String,
    /// Selected BULAN values in selection order; one panel each in the monthly chart
    pub months: Vec<String>,
    pub monthly: Vec<MonthlyKpi>,
    pub growth: Vec<GrowthPoint>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HomeView {
    pub status_options: Vec<FilterOption>,
    pub month_options: Vec<FilterOption>,
    pub bulan_options: Vec<FilterOption>,
    pub summary: Option<HomeSummary>,
    pub asset_options: Vec<String>,
    pub selected_asset: Option<String>,
    pub asset_panel: Option<AssetPanel>,
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssetBreakdown {
    pub asset: String,
    pub percentage: Option<PercentagePair>,
    pub kpi: Option<KpiPair>,
    pub total_gap: GapTotal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DistributionView {
    pub bulan_options: Vec<String>,
    pub selected_bulan: Option<String>,
    pub assets: Vec<AssetBreakdown>,
}

/// Status options, with [`BLANK_LABEL`] last when some row has no status
fn status_values(rows: &[&AssetRecord]) -> Vec<String> {
    let mut values = unique_values(rows, GroupKey::Status);
    if rows.iter().any(|row| row.status.is_none()) {
        values.push(BLANK_LABEL.to_string());
    }
    values
}

fn options(values: Vec<String>, selection: &Selection) -> Vec<FilterOption> {
    values
        .into_iter()
        .map(|value| FilterOption {
            selected: selection.matches(Some(&value)),
            value,
        })
        .collect()
}

/// Builds the Home page: summary metrics plus the selected asset's KPI charts
pub fn home_view(table: &AssetTable, filter: &HomeFilter, year: i32) -> HomeView {
    let all_rows = table.rows();
    let mut warnings = Vec::new();

    let filtered = table.filter(&filter.summary_filter());
    let summary = (!filtered.is_empty()).then(|| HomeSummary {
        total_assets: filtered.len(),
        class_counts: group_counts(&filtered, GroupKey::ClassDescription),
        status_counts: group_counts(&filtered, GroupKey::Status),
    });

    let bulan_values = unique_values(&all_rows, GroupKey::Bulan);
    let months = filter.bulan.resolve(&bulan_values);
    let filtered_bulan = table.filter(&filter.bulan_filter());
    let asset_options = unique_values(&filtered_bulan, GroupKey::Aset);

    let selected_asset = filter
        .asset
        .clone()
        .or_else(|| asset_options.first().cloned());

    let asset_panel = match &selected_asset {
        Some(asset) => {
            let panel = build_asset_panel(&filtered_bulan, asset, months, year);
            if panel.is_none() {
                warnings.push(format!("No data available for asset: {}", asset));
            }
            panel
        }
        None => {
            if !table.is_empty() {
                warnings.push("No data available for the selected months".to_string());
            }
            None
        }
    };

    HomeView {
        status_options: options(status_values(&all_rows), &filter.status),
        month_options: options(
            unique_values(&all_rows, GroupKey::ChangedMonth),
            &filter.changed_month,
        ),
        bulan_options: options(bulan_values, &filter.bulan),
        summary,
        asset_options,
        selected_asset,
        asset_panel,
        warnings,
    }
}

fn build_asset_panel(
    rows: &[&AssetRecord],
    asset: &str,
    months: Vec<String>,
    year: i32,
) -> Option<AssetPanel> {
    if !rows.iter().any(|row| row.is_asset(asset)) {
        return None;
    }

    Some(AssetPanel {
        asset: asset.to_string(),
        monthly: kpi_series(rows, asset, &months),
        growth: growth_series(rows, asset, year),
        months,
    })
}

/// Builds the "Distribusi Aset" page for one BULAN
///
/// Assets are listed in the order they first appear in the whole table; assets
/// without a row in the chosen BULAN are skipped.
pub fn distribution_view(table: &AssetTable, bulan: Option<&str>) -> DistributionView {
    let all_rows = table.rows();
    let bulan_options = unique_values(&all_rows, GroupKey::Bulan);
    let selected_bulan = bulan
        .map(str::to_string)
        .or_else(|| bulan_options.first().cloned());

    let assets = match &selected_bulan {
        Some(bulan) => {
            let rows = table.filter(&RowFilter {
                bulan: Selection::Only(vec![bulan.clone()]),
                ..Default::default()
            });
            unique_values(&all_rows, GroupKey::Aset)
                .into_iter()
                .filter_map(|asset| breakdown(&rows, asset))
                .collect()
        }
        None => Vec::new(),
    };

    DistributionView {
        bulan_options,
        selected_bulan,
        assets,
    }
}

fn breakdown(rows: &[&AssetRecord], asset: String) -> Option<AssetBreakdown> {
    let asset_rows: Vec<&AssetRecord> = rows
        .iter()
        .copied()
        .filter(|row| row.is_asset(&asset))
        .collect();
    if asset_rows.is_empty() {
        return None;
    }

    Some(AssetBreakdown {
        percentage: percentage_pair(&asset_rows, &asset),
        kpi: kpi_pair(&asset_rows, &asset),
        total_gap: total_gap(&asset_rows),
        asset,
    })
}
