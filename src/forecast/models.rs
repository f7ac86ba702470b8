use serde::{Deserialize, Serialize};

/// Description shown when a window had no samples at all.
pub const UNKNOWN_DESCRIPTION: &str = "невідомо";

/// Clear-sky icon used when a window had no samples at all.
pub const DEFAULT_ICON_CODE: &str = "01d";

// ============================================================================
// 5 day / 3 hour Forecast API Response (Internal)
// These structs deserialize the raw API response; not all fields are used
// ============================================================================

#[allow(dead_code)]
#[derive(Debug, Deserialize)]
pub struct ForecastApiResponse {
    /// Missing when OpenWeatherMap answers with an error document
    pub list: Option<Vec<ForecastEntry>>,
    pub city: Option<ForecastCity>,
}

#[allow(dead_code)]
#[derive(Debug, Deserialize)]
pub struct ForecastCity {
    pub name: String,
    pub country: Option<String>,
    pub timezone: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ForecastEntry {
    pub dt: i64,
    pub main: MainReadings,
    #[serde(default)]
    pub weather: Vec<WeatherCondition>,
    pub wind: Option<WindReadings>,
}

#[allow(dead_code)]
#[derive(Debug, Deserialize)]
pub struct MainReadings {
    pub temp: f64,
    pub feels_like: Option<f64>,
    pub humidity: u32,
    pub pressure: Option<u32>,
}

#[allow(dead_code)]
#[derive(Debug, Deserialize, Clone)]
pub struct WeatherCondition {
    pub id: Option<u32>,
    pub main: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Deserialize)]
pub struct WindReadings {
    pub speed: f64,
}

/// Error document returned with non-2xx statuses
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub message: Option<String>,
}

// ============================================================================
// Domain Models
// ============================================================================

/// One forecast data point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastSample {
    /// Unix timestamp (seconds)
    pub timestamp: i64,
    pub temperature: f64,
    /// Weather category, e.g. "Rain" or "Snow"
    pub weather_main: String,
    pub weather_description: String,
    pub icon_code: String,
    pub humidity: u32,
    pub wind_speed: f64,
}

impl ForecastSample {
    /// Rain or snow, matched exactly against the category
    pub fn is_precipitation(&self) -> bool {
        matches!(self.weather_main.as_str(), "Rain" | "Snow")
    }
}

impl From<ForecastEntry> for ForecastSample {
    fn from(entry: ForecastEntry) -> Self {
        let weather = entry.weather.into_iter().next();
        let (weather_main, weather_description, icon_code) = match weather {
            Some(w) => (w.main, w.description, w.icon),
            None => (
                String::new(),
                UNKNOWN_DESCRIPTION.to_string(),
                DEFAULT_ICON_CODE.to_string(),
            ),
        };

        Self {
            timestamp: entry.dt,
            temperature: entry.main.temp,
            weather_main,
            weather_description,
            icon_code,
            humidity: entry.main.humidity,
            wind_speed: entry.wind.map(|w| w.speed).unwrap_or_default(),
        }
    }
}

/// Representative values for one period (night or day)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub temperature: i32,
    pub description: String,
    pub icon_code: String,
    pub humidity: u32,
    pub wind_speed: f64,
}

impl PeriodSummary {
    /// Summary for a window that received no samples
    pub fn fallback() -> Self {
        Self {
            temperature: 0,
            description: UNKNOWN_DESCRIPTION.to_string(),
            icon_code: DEFAULT_ICON_CODE.to_string(),
            humidity: 0,
            wind_speed: 0.0,
        }
    }
}

impl Default for PeriodSummary {
    fn default() -> Self {
        Self::fallback()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    pub night: PeriodSummary,
    pub day: PeriodSummary,
}
