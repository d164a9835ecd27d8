#![cfg(not(tarpaulin_include))]
#[cfg(feature = "web")]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Render every chart kind from a small sample table
    let charts = asset_dashboard::graph::create_example_charts();

    for (name, file_path) in charts {
        println!("Created {} chart at {}", name, file_path);
    }

    Ok(())
}
