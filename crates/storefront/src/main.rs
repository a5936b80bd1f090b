//! Larek Storefront - terminal host.
//!
//! Loads the catalog from the commerce API and drives the storefront from
//! commands on stdin, printing rendered HTML on stdout. Logs go to stderr.
//!
//! # Architecture
//!
//! - Single-threaded: a current-thread tokio runtime running a `LocalSet`
//! - Askama templates rendered against the host page's template ids
//! - Commerce API over reqwest

#![cfg_attr(not(test), forbid(unsafe_code))]

use larek_storefront::Storefront;
use larek_storefront::api::CommerceClient;
use larek_storefront::config::{LogFormat, StorefrontConfig};
use larek_storefront::error::AppError;
use larek_storefront::events::EventBus;
use larek_storefront::host::Host;
use larek_storefront::models::ImageResolver;
use larek_storefront::views::Shell;
use sentry::integrations::tracing as sentry_tracing;
use tokio::io::BufReader;
use tokio::task::LocalSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some(std::borrow::Cow::Owned(config.sentry_environment.clone())),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Install the tracing subscriber. Logs go to stderr; stdout carries HTML.
fn init_tracing(format: LogFormat) {
    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "larek_storefront=info".into());

    let (json, text) = match format {
        LogFormat::Json => (
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            ),
            None,
        ),
        LogFormat::Text => (
            None,
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        ),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json)
        .with(text)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), AppError> {
    // Load configuration from environment (needed for Sentry init)
    let config = StorefrontConfig::from_env()?;

    // Initialize Sentry (must be done before tracing subscriber)
    let sentry_guard = init_sentry(&config);
    init_tracing(config.log_format);
    if sentry_guard.is_some() {
        tracing::info!(environment = %config.sentry_environment, "Sentry initialized");
    }

    LocalSet::new().run_until(run(config)).await
}

async fn run(config: StorefrontConfig) -> Result<(), AppError> {
    let shell = match &config.shell_path {
        Some(path) => Shell::from_file(path)?,
        None => Shell::default(),
    };

    let app = Storefront::new(
        EventBus::new(),
        CommerceClient::new(&config.api_url),
        ImageResolver::new(config.cdn_url.as_deref()),
        &shell,
    )
    .inspect_err(|e| tracing::error!(error = %e, "cannot build storefront views"))?;
    app.bind();

    tracing::info!(api = %config.api_url, "loading catalog");
    app.load_catalog().await;

    let host = Host::new(app);
    let input = BufReader::new(tokio::io::stdin());
    let mut output = std::io::stdout();

    tokio::select! {
        result = host.run(input, &mut output) => result?,
        () = shutdown_signal() => {}
    }

    tracing::info!("storefront stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
