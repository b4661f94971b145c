use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tabular_export::config::Config;
use tabular_export::models::TemplateRegistry;
use tabular_export::services::{ExportPipeline, ExportRegistry};
use tabular_export::web::WebServer;
use tabular_export::writers::WriterSet;

#[derive(Parser)]
#[command(name = "tabular-export")]
#[command(version)]
#[command(about = "Chunked spreadsheet export service for event data")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("tabular_export={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting tabular-export service v{}",
        env!("CARGO_PKG_VERSION")
    );

    let mut config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }

    let templates = TemplateRegistry::builtin()?;
    let registry = Arc::new(ExportRegistry::new(config.retention.clone()));
    // Baseline pass so the interval gate starts from process start.
    registry.run_cleanup().await;

    let pipeline = Arc::new(ExportPipeline::new(
        templates,
        registry,
        WriterSet::new(),
        None,
        &config.export,
    ));

    let server = WebServer::new(&config, pipeline)?;
    info!(
        "Export API available at {}/api/v1, docs at {}/api/openapi.json",
        config.web.base_url, config.web.base_url
    );
    server.serve().await
}
