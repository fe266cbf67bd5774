//! Binary entry point: resolve configuration, start logging, open the store,
//! and drive the Ratatui event loop until the user exits.
use anyhow::Context;
use book_tracker::config::Config;
use book_tracker::{logging, run_app, App, BookStore};
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;
    logging::init(&config)?;
    info!(
        db = %config.db_path.display(),
        bucket = config.bucket_rule.as_str(),
        "starting book tracker"
    );

    let store = BookStore::open(&config.db_path)
        .with_context(|| format!("failed to open {}", config.db_path.display()))?;
    let mut app = App::new(store, config.bucket_rule, config.export_dir.clone())?;

    let result = run_app(&mut app);
    if let Err(err) = &result {
        error!("event loop failed: {err:#}");
    }

    // Flush the store even when the loop failed so committed edits hit disk.
    app.close()?;
    info!("shut down cleanly");
    result
}
