use axum::http::StatusCode;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use super::caption::{build_caption, date_label, target_date};
use crate::error::HttpError;
use crate::forecast::{reduce, ForecastError, ForecastResult, ForecastSource, Periods};
use crate::impl_into_response;
use crate::notifications::{NotificationError, PhotoMessage, PhotoSender};
use crate::render::{AssetLoadError, AssetLoader, ImageComposer, RenderError};

#[derive(Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Forecast(#[from] ForecastError),

    #[error("Render failed: {0}")]
    Render(#[from] RenderError),

    #[error("Delivery failed: {0}")]
    Delivery(#[from] NotificationError),
}

impl HttpError for ReportError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Forecast(e) => e.status_code(),
            Self::Render(RenderError::Asset(AssetLoadError::Fetch { .. }))
            | Self::Render(RenderError::Asset(AssetLoadError::Status { .. })) => {
                StatusCode::BAD_GATEWAY
            }
            Self::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Delivery(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Forecast(e) => e.error_code(),
            Self::Render(RenderError::Asset(_)) => Some("ASSET_LOAD_ERROR"),
            Self::Render(_) => Some("RENDER_ERROR"),
            Self::Delivery(_) => Some("DELIVERY_ERROR"),
        }
    }
}

impl_into_response!(ReportError);

/// What the report is about and how it is labelled
#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub city: String,
    /// Display name in the locative case, e.g. "Білій Церкві"
    pub location_name: String,
    pub timezone: Tz,
    pub periods: Periods,
    pub footer: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportOutcome {
    pub target_date: NaiveDate,
    pub forecast: ForecastResult,
}

/// Fetch → reduce → render → caption → deliver, one attempt per call
pub struct ReportService {
    source: Arc<dyn ForecastSource>,
    loader: Arc<dyn AssetLoader>,
    composer: Arc<ImageComposer>,
    sender: Arc<dyn PhotoSender>,
    settings: ReportSettings,
}

impl ReportService {
    pub fn new(
        source: Arc<dyn ForecastSource>,
        loader: Arc<dyn AssetLoader>,
        composer: Arc<ImageComposer>,
        sender: Arc<dyn PhotoSender>,
        settings: ReportSettings,
    ) -> Self {
        Self {
            source,
            loader,
            composer,
            sender,
            settings,
        }
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    pub async fn run(&self) -> Result<ReportOutcome, ReportError> {
        self.run_at(Utc::now()).await
    }

    /// Produce and deliver the report for the day after `now`.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<ReportOutcome, ReportError> {
        let city = &self.settings.city;
        let timezone = self.settings.timezone;

        let samples = self.source.fetch_samples(city).await?;
        tracing::info!(city = %city, samples = samples.len(), "Fetched forecast samples");

        let forecast = reduce(&samples, now, timezone, &self.settings.periods);
        let date = target_date(now, timezone);
        let label = date_label(date);

        tracing::info!(
            city = %city,
            date = %label,
            night_temp = forecast.night.temperature,
            day_temp = forecast.day.temperature,
            "Forecast reduced"
        );

        let rendered = self
            .composer
            .render(&forecast, self.loader.as_ref(), &label)
            .await?;

        let message = PhotoMessage {
            photo: rendered.path().to_path_buf(),
            caption: build_caption(
                &self.settings.location_name,
                &label,
                &forecast.day,
                self.settings.footer.as_deref(),
            ),
        };

        // Dropping this future mid-send still deletes the card via `RenderedImage`
        let delivery = self.sender.send_photo(&message).await;

        // The card is transient whether or not delivery worked
        let path = rendered.path().display().to_string();
        if let Err(e) = rendered.remove().await {
            tracing::warn!(path = %path, error = %e, "Failed to remove rendered card");
        }

        delivery?;
        tracing::info!(city = %city, date = %label, "Forecast report delivered");

        Ok(ReportOutcome {
            target_date: date,
            forecast,
        })
    }
}
