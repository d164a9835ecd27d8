#![cfg(not(tarpaulin_include))]
#![cfg(feature = "web")]
use crate::aggregate::{GroupCount, GrowthPoint, KpiPair, MonthlyKpi, PercentagePair};
use crate::error::{Error, Result};
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};
use plotters::coord::Shift;
use plotters::coord::ranged1d::{IntoSegmentedCoord, SegmentValue};
use plotters::element::Pie;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::ops::Range;

/// Color of MAXIMO, PERSEN and single-series bars
pub const PRIMARY_COLOR: RGBColor = RGBColor(0x1f, 0x77, 0xb4);

/// Color of LTB and SISA PERSENTASE
pub const SECONDARY_COLOR: RGBColor = RGBColor(0x2c, 0xa0, 0x2c);

const KPI_LABELS: [&str; 2] = ["MAXIMO", "LTB"];

/// Configuration options for chart generation
#[derive(Clone, Debug)]
pub struct ChartOptions {
    /// Title displayed at the top of the chart
    pub title: String,

    /// Width of the chart in pixels
    pub width: u32,

    /// Height of the chart in pixels
    pub height: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            title: "Chart".to_string(),
            width: 800,
            height: 400,
        }
    }
}

impl ChartOptions {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Renders into an in-memory RGB buffer and encodes it as PNG
///
/// # Arguments
/// * `options` - Size of the image
/// * `draw` - Callback drawing onto the white-filled root area
///
/// # Returns
/// * A Result containing the PNG image data as bytes or an error
fn render_png<F>(options: &ChartOptions, draw: F) -> Result<Vec<u8>>
where
    F: FnOnce(&DrawingArea<BitMapBackend<'_>, Shift>) -> Result<()>,
{
    let (width, height) = (options.width, options.height);
    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE)?;
        draw(&root)?;
        root.present()?;
    }

    let mut png = Vec::new();
    PngEncoder::new(&mut png).write_image(&buffer, width, height, ColorType::Rgb8)?;
    Ok(png)
}

/// Creates the "Count of Assets by Class Description" bar chart
///
/// Bars keep the order of `counts` and carry their count on top.
///
/// # Arguments
/// * `counts` - Category counts, usually from `group_counts`
/// * `options` - Chart title and size
///
/// # Returns
/// * A Result containing the PNG image data, or `Error::NoData` for no categories
pub fn class_description_chart(counts: &[GroupCount], options: &ChartOptions) -> Result<Vec<u8>> {
    if counts.is_empty() {
        return Err(Error::NoData("No rows match the selected filters".into()));
    }

    let labels: Vec<&str> = counts.iter().map(|c| c.category.as_str()).collect();
    let y_range = value_range(counts.iter().map(|c| c.count as f64));
    let segments = counts.len() as u32;

    render_png(options, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption(&options.title, ("sans-serif", 24).into_font())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d((0u32..segments).into_segmented(), y_range)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(counts.len() + 1)
            .x_label_formatter(&|v: &SegmentValue<u32>| segment_label(v, &labels))
            .x_desc("Class Description")
            .y_desc("Count")
            .draw()?;

        chart.draw_series(
            counts
                .iter()
                .enumerate()
                .map(|(i, c)| vertical_bar(i as u32, c.count as f64, PRIMARY_COLOR)),
        )?;

        let label_style = TextStyle::from(("sans-serif", 14).into_font())
            .pos(Pos::new(HPos::Center, VPos::Bottom));
        chart.draw_series(counts.iter().enumerate().map(|(i, c)| {
            Text::new(
                c.count.to_string(),
                (SegmentValue::CenterOf(i as u32), c.count as f64),
                label_style.clone(),
            )
        }))?;

        Ok(())
    })
}

/// Creates the PERSEN / SISA PERSENTASE pie for one asset
///
/// The pair is expected to be clamped already. Missing or negative slices are
/// drawn as zero; a pie with nothing left to draw is `Error::NoData`.
pub fn percentage_chart(pair: &PercentagePair, options: &ChartOptions) -> Result<Vec<u8>> {
    let sizes = [
        pair.persen.unwrap_or(0.0).max(0.0),
        pair.sisa_persentase.unwrap_or(0.0).max(0.0),
    ];
    if sizes.iter().sum::<f64>() <= 0.0 {
        return Err(Error::NoData("Nothing to show for PERSEN".into()));
    }

    render_png(options, |root| {
        let area = root.titled(&options.title, ("sans-serif", 20).into_font())?;
        let (width, height) = area.dim_in_pixel();
        let center = (width as i32 / 2, height as i32 / 2);
        let radius = width.min(height) as f64 * 0.35;
        let colors = [PRIMARY_COLOR, SECONDARY_COLOR];
        let labels = ["PERSEN", "SISA PERSENTASE"];

        let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
        pie.label_style(("sans-serif", 14).into_font());
        pie.percentages(("sans-serif", 14).into_font().color(&WHITE));
        area.draw(&pie)?;

        Ok(())
    })
}

/// Creates the horizontal MAXIMO / LTB bar chart for one asset
pub fn kpi_chart(kpi: &KpiPair, options: &ChartOptions) -> Result<Vec<u8>> {
    let bars = kpi_values(kpi);
    if bars.is_empty() {
        return Err(Error::NoData("No MAXIMO or LTB value".into()));
    }

    let x_range = value_range(bars.iter().map(|&(_, v, _)| v));

    render_png(options, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption(&options.title, ("sans-serif", 24).into_font())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(80)
            .build_cartesian_2d(x_range, (0u32..2).into_segmented())?;

        chart
            .configure_mesh()
            .disable_y_mesh()
            .y_labels(3)
            .y_label_formatter(&|v: &SegmentValue<u32>| segment_label(v, &KPI_LABELS))
            .x_desc("Value")
            .y_desc("Asset")
            .draw()?;

        chart.draw_series(bars.iter().map(|&(i, value, color)| {
            let mut bar = Rectangle::new(
                [
                    (0.0, SegmentValue::Exact(i)),
                    (value, SegmentValue::Exact(i + 1)),
                ],
                color.filled(),
            );
            bar.set_margin(8, 8, 0, 0);
            bar
        }))?;

        Ok(())
    })
}

/// Creates one MAXIMO / LTB panel per selected BULAN, sharing the value axis
///
/// Panels follow `months`; a month missing from `series` is drawn as an empty
/// panel, matching the selection the user made.
pub fn monthly_kpi_chart(
    months: &[String],
    series: &[MonthlyKpi],
    options: &ChartOptions,
) -> Result<Vec<u8>> {
    if months.is_empty() || series.is_empty() {
        return Err(Error::NoData("No MAXIMO or LTB values for the selected months".into()));
    }

    let y_range = value_range(series.iter().flat_map(|m| kpi_values(&m.kpi)).map(|(_, v, _)| v));

    render_png(options, |root| {
        let area = root.titled(&options.title, ("sans-serif", 24).into_font())?;
        let panels = area.split_evenly((1, months.len()));

        for (panel, month) in panels.iter().zip(months) {
            let mut chart = ChartBuilder::on(panel)
                .caption(month, ("sans-serif", 16).into_font())
                .margin(8)
                .x_label_area_size(30)
                .y_label_area_size(45)
                .build_cartesian_2d((0u32..2).into_segmented(), y_range.clone())?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_labels(3)
                .x_label_formatter(&|v: &SegmentValue<u32>| segment_label(v, &KPI_LABELS))
                .draw()?;

            if let Some(monthly) = series.iter().find(|m| &m.bulan == month) {
                chart.draw_series(
                    kpi_values(&monthly.kpi)
                        .into_iter()
                        .map(|(i, value, color)| vertical_bar(i, value, color)),
                )?;
            }
        }

        Ok(())
    })
}

/// Creates the MAXIMO / LTB growth line over the calendar months
pub fn growth_chart(points: &[GrowthPoint], options: &ChartOptions) -> Result<Vec<u8>> {
    if points.is_empty() {
        return Err(Error::NoData("No month to plot".into()));
    }

    let labels: Vec<&str> = points.iter().map(|p| p.label.as_str()).collect();
    let y_range = value_range(points.iter().flat_map(|p| kpi_values(&p.kpi)).map(|(_, v, _)| v));
    let segments = points.len() as u32;
    let lines: [(&str, RGBColor, fn(&KpiPair) -> Option<f64>); 2] = [
        ("MAXIMO", PRIMARY_COLOR, |kpi| kpi.maximo),
        ("LTB", SECONDARY_COLOR, |kpi| kpi.ltb),
    ];

    render_png(options, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption(&options.title, ("sans-serif", 24).into_font())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d((0u32..segments).into_segmented(), y_range)?;

        chart
            .configure_mesh()
            .x_labels(points.len() + 1)
            .x_label_formatter(&|v: &SegmentValue<u32>| segment_label(v, &labels))
            .x_desc("Month")
            .y_desc("Value")
            .draw()?;

        for (name, color, pick) in lines {
            let coords: Vec<(SegmentValue<u32>, f64)> = points
                .iter()
                .enumerate()
                .filter_map(|(i, p)| pick(&p.kpi).map(|v| (SegmentValue::CenterOf(i as u32), v)))
                .collect();

            chart
                .draw_series(LineSeries::new(coords.clone(), color.stroke_width(2)))?
                .label(name)
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                });
            chart.draw_series(
                coords
                    .into_iter()
                    .map(|coord| Circle::new(coord, 4, color.filled())),
            )?;
        }

        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;

        Ok(())
    })
}

fn vertical_bar(i: u32, value: f64, color: RGBColor) -> Rectangle<(SegmentValue<u32>, f64)> {
    let mut bar = Rectangle::new(
        [
            (SegmentValue::Exact(i), 0.0),
            (SegmentValue::Exact(i + 1), value),
        ],
        color.filled(),
    );
    bar.set_margin(0, 0, 8, 8);
    bar
}

/// Present KPI values as (segment, value, color)
fn kpi_values(kpi: &KpiPair) -> Vec<(u32, f64, RGBColor)> {
    [(0, kpi.maximo, PRIMARY_COLOR), (1, kpi.ltb, SECONDARY_COLOR)]
        .into_iter()
        .filter_map(|(i, value, color)| value.map(|v| (i, v, color)))
        .collect()
}

fn segment_label(value: &SegmentValue<u32>, labels: &[&str]) -> String {
    match value {
        SegmentValue::CenterOf(i) => labels
            .get(*i as usize)
            .map(|label| label.to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// Axis range covering zero and every value, with some headroom
fn value_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (min, max) = values.fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if max - min <= f64::EPSILON {
        return 0.0..1.0;
    }
    (min * 1.1)..(max * 1.1)
}

/// Creates sample charts for demonstration purposes
///
/// Renders every chart kind from a small built-in dataset into `graph_output/`.
///
/// # Returns
/// * A vector of tuples containing chart name and file path
pub fn create_example_charts() -> Vec<(String, String)> {
    use crate::aggregate::{clamp_percentage, growth_series, kpi_series};
    use crate::record::AssetRecord;

    let mut result = Vec::new();

    let output_dir = "graph_output";
    if let Err(e) = std::fs::create_dir_all(output_dir) {
        log::warn!("Couldn't create {}: {}", output_dir, e);
        return result;
    }

    let months: Vec<String> = ["January", "February", "March"]
        .iter()
        .map(|m| m.to_string())
        .collect();
    let records: Vec<AssetRecord> = months
        .iter()
        .enumerate()
        .map(|(i, month)| AssetRecord {
            aset: Some("Trafo1".into()),
            bulan: Some(month.clone()),
            maximo: Some(10.0 + i as f64 * 4.0),
            ltb: Some(6.0 + i as f64 * 3.0),
            ..Default::default()
        })
        .collect();
    let rows: Vec<&AssetRecord> = records.iter().collect();

    let counts = vec![
        GroupCount {
            category: "TRANSFORMER".into(),
            count: 12,
        },
        GroupCount {
            category: "CUBICLE".into(),
            count: 7,
        },
    ];
    let pair = clamp_percentage(Some(120.0), Some(-20.0));
    let kpi = KpiPair {
        maximo: Some(10.0),
        ltb: Some(5.0),
    };
    let series = kpi_series(&rows, "Trafo1", &months);
    let growth = growth_series(&rows, "Trafo1", crate::aggregate::DEFAULT_REPORT_YEAR);

    let charts = [
        (
            "Class Description",
            class_description_chart(&counts, &ChartOptions::titled("Count of Assets by Class Description")),
        ),
        (
            "Percentage",
            percentage_chart(&pair, &ChartOptions::titled("PERSEN and SISA PERSENTASE")),
        ),
        ("KPI", kpi_chart(&kpi, &ChartOptions::titled("MAXIMO and LTB"))),
        (
            "Monthly KPI",
            monthly_kpi_chart(&months, &series, &ChartOptions::titled("MAXIMO and LTB per month")),
        ),
        (
            "Growth",
            growth_chart(&growth, &ChartOptions::titled("Growth of MAXIMO and LTB")),
        ),
    ];

    for (name, png) in charts {
        let path = format!(
            "{}/{}.png",
            output_dir,
            name.to_lowercase().replace(' ', "_")
        );
        match png.and_then(|bytes| std::fs::write(&path, bytes).map_err(Error::from)) {
            Ok(()) => result.push((name.to_string(), path)),
            Err(e) => log::warn!("Failed to create {} chart: {}", name, e),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    fn assert_png(result: Result<Vec<u8>>) {
        let bytes = result.unwrap();
        assert!(bytes.starts_with(&PNG_SIGNATURE));
    }

    fn kpi(maximo: f64, ltb: f64) -> KpiPair {
        KpiPair {
            maximo: Some(maximo),
            ltb: Some(ltb),
        }
    }

    #[test]
    fn class_description_chart_renders_png() {
        let counts = vec![
            GroupCount {
                category: "TRANSFORMER".into(),
                count: 3,
            },
            GroupCount {
                category: "CUBICLE".into(),
                count: 1,
            },
        ];
        assert_png(class_description_chart(&counts, &ChartOptions::default()));
    }

    #[test]
    fn percentage_chart_renders_png() {
        let pair = PercentagePair {
            persen: Some(40.0),
            sisa_persentase: Some(60.0),
        };
        assert_png(percentage_chart(&pair, &ChartOptions::default()));
    }

    #[test]
    fn kpi_chart_renders_negative_values() {
        assert_png(kpi_chart(&kpi(-4.0, 5.0), &ChartOptions::default()));
    }

    #[test]
    fn monthly_kpi_chart_renders_empty_panels() {
        let months = vec!["January".to_string(), "February".to_string()];
        let series = vec![MonthlyKpi {
            bulan: "January".into(),
            kpi: kpi(10.0, 5.0),
        }];
        assert_png(monthly_kpi_chart(&months, &series, &ChartOptions::default()));
    }

    #[test]
    fn growth_chart_renders_png() {
        let points: Vec<GrowthPoint> = [(1, 10.0, 5.0), (2, 12.0, 6.0)]
            .into_iter()
            .filter_map(|(month, maximo, ltb)| {
                let date = NaiveDate::from_ymd_opt(2024, month, 1)?;
                Some(GrowthPoint {
                    date,
                    label: date.format("%b %Y").to_string(),
                    kpi: kpi(maximo, ltb),
                })
            })
            .collect();
        assert_eq!(points.len(), 2);
        assert_png(growth_chart(&points, &ChartOptions::default()));
    }

    #[test]
    fn empty_inputs_have_nothing_to_draw() {
        let options = ChartOptions::default();
        let empty_kpi = KpiPair {
            maximo: None,
            ltb: None,
        };
        let empty_pair = PercentagePair {
            persen: None,
            sisa_persentase: Some(0.0),
        };

        assert!(matches!(class_description_chart(&[], &options), Err(Error::NoData(_))));
        assert!(matches!(percentage_chart(&empty_pair, &options), Err(Error::NoData(_))));
        assert!(matches!(kpi_chart(&empty_kpi, &options), Err(Error::NoData(_))));
        assert!(matches!(
            monthly_kpi_chart(&["January".to_string()], &[], &options),
            Err(Error::NoData(_))
        ));
        assert!(matches!(growth_chart(&[], &options), Err(Error::NoData(_))));
    }

    #[test]
    fn value_range_covers_zero_and_values() {
        assert_eq!(value_range([0.0].into_iter()), 0.0..1.0);
        let range = value_range([-2.0, 10.0].into_iter());
        assert!(range.start < -2.0 && range.end > 10.0);
    }
}
