mod cache;
mod config;
mod error;
mod forecast;
mod middleware;
mod notifications;
mod render;
mod report;
mod routes;
mod scheduler;

use anyhow::Context;
use axum::{error_handling::HandleErrorLayer, http::StatusCode, BoxError};
use reqwest::Client;
use std::{sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cache::{create_icon_cache, start_cache_cleanup_task};
use crate::config::AppConfig;
use crate::forecast::ForecastService;
use crate::notifications::TelegramClient;
use crate::render::{
    load_typeface, AssetService, ComposerOptions, Gallery, IconSource, ImageComposer,
    RandomSelector,
};
use crate::report::{ReportService, ReportSettings};
use crate::scheduler::{DailyDispatcher, DailyGate, SchedulerService};

/// Shared HTTP client configuration
const HTTP_TIMEOUT_SECS: u64 = 30;
const HTTP_CONNECT_TIMEOUT_SECS: u64 = 5;
const HTTP_POOL_IDLE_TIMEOUT_SECS: u64 = 90;

#[derive(Clone)]
pub struct AppState {
    pub report_service: Arc<ReportService>,
    pub scheduler_service: Arc<SchedulerService>,
    pub config: Arc<AppConfig>,
}

/// Create shared HTTP client with connection pooling
fn create_http_client() -> reqwest::Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
        .pool_idle_timeout(Duration::from_secs(HTTP_POOL_IDLE_TIMEOUT_SECS))
        .pool_max_idle_per_host(10)
        .build()
}

/// Handle request timeout errors
async fn handle_timeout_error(err: BoxError) -> (StatusCode, String) {
    if err.is::<tower::timeout::error::Elapsed>() {
        (StatusCode::REQUEST_TIMEOUT, "Request timed out".to_string())
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Internal error: {}", err),
        )
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for ctrl+c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to listen for SIGTERM")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

fn build_composer(config: &AppConfig) -> anyhow::Result<ImageComposer> {
    let render = &config.render;

    let gallery = Gallery::scan(&render.characters_dir)?;
    if gallery.is_empty() {
        anyhow::bail!(
            "No character images found in {}",
            render.characters_dir.display()
        );
    }
    tracing::info!(
        dir = %render.characters_dir.display(),
        count = gallery.len(),
        "Character gallery loaded"
    );

    let options = ComposerOptions {
        regular: load_typeface(&render.font_regular)?,
        bold: load_typeface(&render.font_bold)?,
        gallery,
        phrases: render.phrases.clone(),
        title_template: render.title_template.clone(),
        output_dir: render.output_dir.clone(),
    };

    Ok(ImageComposer::new(options, Arc::new(RandomSelector)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weather_card=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;
    let timezone = config.timezone()?;
    let send_at = config.send_at()?;
    tracing::info!(city = %config.city, timezone = %timezone, "Configuration loaded successfully");
    tracing::debug!(periods = ?config.periods, "Forecast periods configured");

    // Create shared HTTP client with connection pooling
    let http_client = create_http_client().context("Failed to create HTTP client")?;
    tracing::debug!("Shared HTTP client created");

    let forecast_service = Arc::new(ForecastService::new(
        http_client.clone(),
        &config.openweathermap_api_key,
        &config.units,
        &config.lang,
    ));

    // Icons are cached across reports
    let icon_cache = create_icon_cache();
    start_cache_cleanup_task(icon_cache.clone());

    let icon_source = match &config.render.icon_dir {
        Some(dir) => IconSource::Directory(dir.clone()),
        None => IconSource::remote(&config.render.icon_base_url),
    };
    tracing::info!(source = ?icon_source, "Weather icon source configured");

    let asset_service = Arc::new(AssetService::new(
        http_client.clone(),
        icon_source,
        icon_cache,
    ));

    let composer = Arc::new(build_composer(&config)?);

    let telegram = Arc::new(TelegramClient::new(
        http_client,
        &config.telegram.api_url,
        &config.telegram.bot_token,
        &config.telegram.chat_id,
    ));

    let report_service = Arc::new(ReportService::new(
        forecast_service,
        asset_service,
        composer,
        telegram,
        ReportSettings {
            city: config.city.clone(),
            location_name: config.location_name.clone(),
            timezone,
            periods: config.periods,
            footer: config.caption.footer.clone(),
        },
    ));

    // Initialize scheduler
    let dispatcher = Arc::new(DailyDispatcher::new(
        report_service.clone(),
        DailyGate::new(send_at, timezone, config.schedule.max_attempts),
    ));
    let scheduler_service = Arc::new(
        SchedulerService::new(
            dispatcher,
            config.schedule.enabled,
            &config.schedule.tick_cron,
        )
        .await?,
    );
    scheduler_service.start().await?;

    // Create shared application state
    let state = AppState {
        report_service,
        scheduler_service,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = routes::build_router(&state)
        .layer(
            ServiceBuilder::new()
                // Handle timeout errors
                .layer(HandleErrorLayer::new(handle_timeout_error))
                // Rendering plus delivery can take a while on a slow uplink
                .timeout(Duration::from_secs(120)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server with graceful shutdown
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
