#![cfg(not(tarpaulin_include))]

use asset_dashboard::aggregate::{DEFAULT_REPORT_YEAR, format_thousands};
use asset_dashboard::loader;
use asset_dashboard::table::{AssetTable, Selection};
use asset_dashboard::view::{HomeFilter, Page, distribution_view, home_view};
use std::env;
use std::time::Instant;

fn print_usage(program: &str) {
    eprintln!(
        "Usage: {} <file.xlsx|file.xls> [--page home|news] [--bulan BULAN] [--year YEAR]",
        program
    );
}

fn value(number: Option<f64>) -> String {
    number.map(format_thousands).unwrap_or_else(|| "-".to_string())
}

fn print_home(table: &AssetTable, bulan: Option<String>, year: i32) {
    let filter = HomeFilter {
        bulan: bulan.map_or(Selection::NonEmpty, |b| Selection::Only(vec![b])),
        ..Default::default()
    };
    let view = home_view(table, &filter, year);

    match &view.summary {
        Some(summary) => {
            println!("Total Assets: {}", summary.total_assets);
            println!();
            println!("Count of Assets by Class Description");
            for count in &summary.class_counts {
                println!("  {:<30} {:>6}", count.category, count.count);
            }
            println!();
            println!("Assets by Status");
            for count in &summary.status_counts {
                println!("  {:<30} {:>6}", count.category, count.count);
            }
        }
        None => println!("No rows match the selected filters"),
    }

    if let Some(panel) = &view.asset_panel {
        println!();
        println!("MAXIMO and LTB for Asset: {}", panel.asset);
        for point in &panel.monthly {
            println!(
                "  {:<12} MAXIMO {:>10}  LTB {:>10}",
                point.bulan,
                value(point.kpi.maximo),
                value(point.kpi.ltb)
            );
        }
        println!();
        println!("Growth of MAXIMO and LTB for Asset: {}", panel.asset);
        for point in &panel.growth {
            println!(
                "  {:<12} MAXIMO {:>10}  LTB {:>10}",
                point.label,
                value(point.kpi.maximo),
                value(point.kpi.ltb)
            );
        }
    }

    for warning in &view.warnings {
        eprintln!("warning: {}", warning);
    }
}

fn print_distribution(table: &AssetTable, bulan: Option<&str>) {
    let view = distribution_view(table, bulan);
    let Some(selected) = &view.selected_bulan else {
        println!("No BULAN values in this file");
        return;
    };

    println!("Distribusi Aset PT.PLN UP3 Surabaya Barat ({})", selected);
    for breakdown in &view.assets {
        println!();
        println!("Asset: {}", breakdown.asset);
        if let Some(pair) = &breakdown.percentage {
            println!(
                "  PERSEN {:>10}  SISA PERSENTASE {:>10}",
                value(pair.persen),
                value(pair.sisa_persentase)
            );
        }
        if let Some(kpi) = &breakdown.kpi {
            println!(
                "  MAXIMO {:>10}  LTB {:>10}",
                value(kpi.maximo),
                value(kpi.ltb)
            );
        }
        println!("  Total GAP: {}", breakdown.total_gap.formatted);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage(&args[0]);
        return Ok(());
    }

    let mut page = Page::Home;
    let mut bulan = None;
    let mut year = DEFAULT_REPORT_YEAR;

    let mut options = args[2..].iter();
    while let Some(flag) = options.next() {
        let Some(value) = options.next() else {
            print_usage(&args[0]);
            return Ok(());
        };
        match flag.as_str() {
            "--page" => page = Page::from_query(Some(value.as_str())),
            "--bulan" => bulan = Some(value.clone()),
            "--year" => year = value.parse()?,
            _ => {
                print_usage(&args[0]);
                return Ok(());
            }
        }
    }

    let start = Instant::now();
    let table = loader::load_path(&args[1])?;
    println!(
        "Loaded {} rows from {} in {:.1}s",
        table.len(),
        args[1],
        start.elapsed().as_secs_f64()
    );
    for column in &table.missing_columns {
        eprintln!("warning: column not found: {}", column.header());
    }
    println!();

    match page {
        Page::Home => print_home(&table, bulan, year),
        Page::News => print_distribution(&table, bulan.as_deref()),
    }

    Ok(())
}
