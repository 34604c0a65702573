//! Music Shop storefront - public web shop.
//!
//! Serves the catalog, cart, checkout, and account pages on port 3000.
//!
//! # Architecture
//!
//! - Axum web framework, Askama templates for server-side rendering
//! - `PostgreSQL` for catalog, accounts, carts, orders, and sessions
//! - Sentry for error tracking when `SENTRY_DSN` is set
//!
//! Migrations are not run on startup; use `musicshop-cli migrate`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::Path;

use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use musicshop_storefront::config::StorefrontConfig;
use musicshop_storefront::state::AppState;
use musicshop_storefront::{app, db};

/// Start Sentry when a DSN is configured. The guard flushes events on drop.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let sentry_config = &config.sentry;
    let dsn = sentry_config.dsn.as_deref()?;

    let options = sentry::ClientOptions {
        release: sentry::release_name!(),
        environment: sentry_config.environment.clone().map(Into::into),
        sample_rate: sentry_config.sample_rate,
        traces_sample_rate: sentry_config.traces_sample_rate,
        attach_stacktrace: true,
        ..Default::default()
    };
    Some(sentry::init((dsn, options)))
}

/// Warnings and errors become Sentry events, info and debug breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    use sentry_tracing::EventFilter;
    use tracing::Level;

    match *metadata.level() {
        Level::ERROR | Level::WARN => EventFilter::Event,
        Level::INFO | Level::DEBUG => EventFilter::Breadcrumb,
        Level::TRACE => EventFilter::Ignore,
    }
}

/// `RUST_LOG` wins over the built-in default filter.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

const DEFAULT_LOG_FILTER: &str = "musicshop_storefront=info,tower_http=debug";
const STATIC_DIR: &str = "crates/storefront/static";

#[tokio::main]
async fn main() {
    let config = StorefrontConfig::from_env().expect("invalid storefront configuration");

    // The Sentry client has to exist before its tracing layer is installed.
    let _sentry = init_sentry(&config);
    init_tracing();
    tracing::info!(?config, "Starting storefront");

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("cannot connect to the database");

    let addr = config.socket_addr();
    let router = app(AppState::new(config, pool), Path::new(STATIC_DIR));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("cannot bind listen address");
    tracing::info!(%addr, "Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {},
        () = terminate => {},
    }
    tracing::info!("Shutting down");
}
