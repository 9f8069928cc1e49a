#![cfg(not(tarpaulin_include))]

use survey::{app, config::Config};

/// Main entry point for the web application
///
/// Initializes logging from `RUST_LOG` (defaulting to `info`), reads the
/// `SURVEY_*` environment configuration and serves the survey until Ctrl+C.
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load()?;
    app::run(config).await
}
