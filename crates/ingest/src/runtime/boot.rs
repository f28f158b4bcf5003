//! Boot — logging init and config load.

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::conf::IngestConfig;

/// Initialise the tracing / logging subsystem.
///
/// Logs go to stderr so stdout stays clean for entry output.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ingest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load and validate configuration (file or env).
pub fn boot() -> Result<IngestConfig, Box<dyn std::error::Error>> {
    info!("Starting log ingest v{}", env!("CARGO_PKG_VERSION"));

    let config = IngestConfig::load()?;
    config.validate()?;
    info!(
        "Chunking: size={}B threshold={}B yield_every={} windows / {} lines",
        config.chunk_size_bytes, config.chunk_threshold_bytes, config.yield_every_chunks, config.yield_every_lines
    );
    if let Some(cap) = config.max_payload_bytes {
        info!("Payload cap enabled: {}B", cap);
    }

    Ok(config)
}
