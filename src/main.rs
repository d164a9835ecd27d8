use asset_dashboard::app;
use asset_dashboard::config::Config;
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_args(env::args())?;

    println!(
        "Starting asset dashboard on http://{} (report year {})",
        config.bind_address(),
        config.report_year
    );
    app::run(config).await
}
