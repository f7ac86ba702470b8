use async_trait::async_trait;
use axum::http::StatusCode;
use reqwest::Client;
use thiserror::Error;

use super::models::*;
use crate::error::HttpError;
use crate::impl_into_response;

const FORECAST_API_URL: &str = "https://api.openweathermap.org/data/2.5/forecast";

#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Failed to fetch data: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("City not found: {0}")]
    CityNotFound(String),

    #[error("Invalid OpenWeatherMap API key")]
    Unauthorized,

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Forecast response contains no data points")]
    NoForecastData,
}

impl HttpError for ForecastError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::CityNotFound(_) => StatusCode::NOT_FOUND,
            Self::RequestError(_) => StatusCode::BAD_GATEWAY,
            Self::Unauthorized => StatusCode::BAD_GATEWAY,
            Self::ApiError(_) => StatusCode::BAD_GATEWAY,
            Self::NoForecastData => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::CityNotFound(_) => Some("CITY_NOT_FOUND"),
            Self::RequestError(_) => Some("REQUEST_ERROR"),
            Self::Unauthorized => Some("UPSTREAM_UNAUTHORIZED"),
            Self::ApiError(_) => Some("API_ERROR"),
            Self::NoForecastData => Some("NO_FORECAST_DATA"),
        }
    }
}

impl_into_response!(ForecastError);

/// Anything that can produce ordered forecast samples for a location
#[async_trait]
pub trait ForecastSource: Send + Sync {
    async fn fetch_samples(&self, city: &str) -> Result<Vec<ForecastSample>, ForecastError>;
}

impl ForecastApiResponse {
    /// Flatten the response into samples, keeping API order
    pub fn into_samples(self) -> Result<Vec<ForecastSample>, ForecastError> {
        let list = self.list.ok_or(ForecastError::NoForecastData)?;
        Ok(list.into_iter().map(ForecastSample::from).collect())
    }
}

/// Client for the OpenWeatherMap 5 day / 3 hour forecast
pub struct ForecastService {
    client: Client,
    api_key: String,
    units: String,
    lang: String,
}

impl ForecastService {
    pub fn new(client: Client, api_key: &str, units: &str, lang: &str) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            units: units.to_string(),
            lang: lang.to_string(),
        }
    }

    /// Get the multi-point forecast for a city ("Bila Tserkva,UA")
    pub async fn get_forecast(&self, city: &str) -> Result<Vec<ForecastSample>, ForecastError> {
        tracing::debug!(city = %city, units = %self.units, "Fetching forecast");

        let response = self
            .client
            .get(FORECAST_API_URL)
            .query(&[
                ("q", city),
                ("units", self.units.as_str()),
                ("lang", self.lang.as_str()),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        tracing::debug!(status = %status, "Received forecast API response");

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ForecastError::CityNotFound(city.to_string()));
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ForecastError::Unauthorized);
        }

        if !status.is_success() {
            let body: ApiErrorBody = response
                .json()
                .await
                .unwrap_or(ApiErrorBody { message: None });
            return Err(ForecastError::ApiError(
                body.message.unwrap_or_else(|| format!("HTTP {}", status)),
            ));
        }

        let data: ForecastApiResponse = response.json().await?;
        let samples = data.into_samples()?;

        tracing::info!(city = %city, samples = samples.len(), "Forecast fetched successfully");

        Ok(samples)
    }
}

#[async_trait]
impl ForecastSource for ForecastService {
    async fn fetch_samples(&self, city: &str) -> Result<Vec<ForecastSample>, ForecastError> {
        self.get_forecast(city).await
    }
}
