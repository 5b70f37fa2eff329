//! TreeScope: disk usage scanner with a persistent scan history.
//!
//! Thin headless host. It starts a scan, forwards every core event to
//! stdout as one JSON line, and finishes with the treemap layout of the
//! scanned root. Without an argument it reports the last stored session.
//! Logs go to stderr.

use anyhow::Context;
use std::path::PathBuf;
use treescope_core::config::{ScanConfig, StoreConfig};
use treescope_core::dataset::ScanDataset;
use treescope_core::model::{format_count, format_size};
use treescope_core::scanner::ScanController;
use treescope_core::store::Store;
use treescope_core::treemap::Rect;

/// Viewport used for the final layout line.
const VIEWPORT: Rect = Rect {
    x: 0.0,
    y: 0.0,
    width: 1280.0,
    height: 800.0,
};

fn main() -> anyhow::Result<()> {
    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("TreeScope starting");

    let store_config = StoreConfig::default_location();
    tracing::info!("Using database {}", store_config.path.display());

    let Some(root) = std::env::args_os().nth(1).map(PathBuf::from) else {
        return report_last_session(&store_config);
    };

    let controller = ScanController::new(store_config, ScanConfig::default());
    let handle = controller
        .start_scan(root.clone())
        .with_context(|| format!("cannot start scan of {}", root.display()))?;

    let mut dataset = ScanDataset::new();
    for event in handle.events.iter() {
        match event.to_json() {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!("Dropped {} event: {e}", event.name()),
        }
        dataset.apply_event(&event);
    }

    if let Some(summary) = handle.join() {
        tracing::info!(
            "Session {} finished as {}",
            summary.session_id,
            summary.status
        );
    }

    let rects = controller.layout(&dataset.layout_items(&root), VIEWPORT);
    let line = serde_json::json!({ "event": "layout", "data": rects });
    println!("{line}");

    Ok(())
}

fn report_last_session(config: &StoreConfig) -> anyhow::Result<()> {
    let store = Store::open(config).context("cannot open the scan database")?;
    match store.last_session()? {
        Some(session) => {
            tracing::info!(
                "Last session {}: {} ({}), {} items, {}, {} errors",
                session.id,
                session.root_path.display(),
                session.status,
                format_count(session.total_items),
                format_size(session.total_size),
                session.error_count
            );
            println!("{}", serde_json::to_string(&session)?);
        }
        None => tracing::info!("No previous scan. Usage: treescope <PATH>"),
    }
    Ok(())
}
