use std::sync::Arc;

use anyhow::Context;
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use idsync::cli::publish_lines;
use idsync::pipeline::TracingSink;
use idsync::{IdentityFeed, MemorySessionStore, Orchestrator, SessionStore, SyncConfig};

/// Reads sign-in state changes from stdin, one JSON value per line (see `idsync::cli`).
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("invalid log filter")?;
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let config = SyncConfig::from_env()?;
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "idsync",
        "idsync starting: RUST_LOG='{}', backend='{}', provider={}, stage_timeout_ms={}",
        rust_log,
        config.backend_url,
        config.provider,
        config.stage_timeout.as_millis()
    );

    let store = Arc::new(MemorySessionStore::new());
    let orchestrator = Arc::new(Orchestrator::from_config(&config, store.clone(), Arc::new(TracingSink))?);
    let (feed, events) = IdentityFeed::channel();
    let driver = tokio::spawn(Arc::clone(&orchestrator).run(events));

    let reader = async {
        let stats = publish_lines(BufReader::new(tokio::io::stdin()), &feed).await?;
        info!(published = stats.published, skipped = stats.skipped, "identity input closed");
        anyhow::Ok(())
    };

    tokio::select! {
        res = reader => res?,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted; discarding in-flight runs");
            orchestrator.shutdown();
        }
    }

    drop(feed);
    driver.await.context("orchestrator task failed")?;
    info!(sessions = store.len(), "idsync finished");
    Ok(())
}
