//! Wharf API server over an in-memory engine.
//!
//! ```text
//! wharf-server [CONFIG.toml]
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use wharf_api::{ApiConfig, AppState, Engine, router};
use wharf_log::{LOG_ENV, info, warn};
use wharf_source_memory::{Fixture, MemoryEngine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = ApiConfig::load(config_path.as_deref()).context("loading configuration")?;

    let log = if std::env::var_os(LOG_ENV).is_some() || std::env::var_os("RUST_LOG").is_some() {
        wharf_log::Config::from_env()
    } else {
        config.log.clone()
    };
    let _guard = wharf_log::init_with(log.with_service("wharf-server"))
        .context("initializing logging")?;

    let engine = match &config.fixture {
        Some(path) => {
            let fixture = Fixture::from_path(path)
                .with_context(|| format!("loading fixture {}", path.display()))?;
            info!(
                path = %path.display(),
                images = fixture.images.len(),
                networks = fixture.networks.len(),
                "engine seeded from fixture"
            );
            MemoryEngine::from_fixture(fixture)
        }
        None => MemoryEngine::new(),
    };
    let engine: Arc<dyn Engine> = Arc::new(engine);

    let mut app = router::app(AppState::from_config(engine, &config));
    match config.principal.clone() {
        Some(principal) => {
            info!(principal = %principal.name, permission = %principal.permission, "stamping requests");
            app = app.layer(axum::Extension(principal));
        }
        None => warn!("no principal configured; every request will be rejected as unauthenticated"),
    }

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    info!(
        addr = %config.bind,
        enumeration_timeout = ?config.enumeration_timeout,
        mutation_timeout = ?config.mutation_timeout,
        "wharf-server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving")?;

    info!("wharf-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c; shutting down");
        return;
    }
    info!("shutdown requested");
}
