use chrono::NaiveTime;
use chrono_tz::Tz;
use config::{Case, Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

use crate::forecast::Periods;
use crate::notifications::DEFAULT_TELEGRAM_API_URL;
use crate::render::{assets::DEFAULT_ICON_BASE_URL, DEFAULT_PHRASES, DEFAULT_TITLE_TEMPLATE};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// OpenWeatherMap API key
    pub openweathermap_api_key: String,

    /// City query passed to OpenWeatherMap, e.g. "Bila Tserkva,UA"
    #[serde(default = "default_city")]
    pub city: String,

    /// Temperature units: metric, imperial, or standard
    #[serde(default = "default_units")]
    pub units: String,

    /// Language of weather descriptions
    #[serde(default = "default_lang")]
    pub lang: String,

    /// IANA zone for window boundaries, dates and the send time
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// City name as it reads after "у" in the caption
    #[serde(default = "default_location_name")]
    pub location_name: String,

    /// API key for the manual trigger (optional - if not set, no auth required)
    #[serde(default)]
    pub admin_api_key: Option<String>,

    pub telegram: TelegramConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub caption: CaptionConfig,

    /// Night and day windows with their selection rule
    #[serde(default)]
    pub periods: Periods,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,

    /// Numeric id or @channel username
    pub chat_id: String,

    #[serde(default = "default_telegram_api_url")]
    pub api_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Local time of day ("HH:MM") from which the report may go out
    #[serde(default = "default_send_at")]
    pub send_at: String,

    /// How often the gate is checked (6-field cron, seconds first)
    #[serde(default = "default_tick_cron")]
    pub tick_cron: String,

    /// Attempts per day before giving up until tomorrow
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            send_at: default_send_at(),
            tick_cron: default_tick_cron(),
            max_attempts: default_max_attempts(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RenderConfig {
    #[serde(default = "default_font_regular")]
    pub font_regular: PathBuf,

    #[serde(default = "default_font_bold")]
    pub font_bold: PathBuf,

    #[serde(default = "default_characters_dir")]
    pub characters_dir: PathBuf,

    /// Where cards are written before delivery
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_icon_base_url")]
    pub icon_base_url: String,

    /// Local icon set (`{code}.png`); takes precedence over `icon_base_url`
    #[serde(default)]
    pub icon_dir: Option<PathBuf>,

    /// Title text, `{date}` is replaced with the target date
    #[serde(default = "default_title_template")]
    pub title_template: String,

    /// Overlay phrases, one is picked per card
    #[serde(default = "default_phrases")]
    pub phrases: Vec<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font_regular: default_font_regular(),
            font_bold: default_font_bold(),
            characters_dir: default_characters_dir(),
            output_dir: default_output_dir(),
            icon_base_url: default_icon_base_url(),
            icon_dir: None,
            title_template: default_title_template(),
            phrases: default_phrases(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CaptionConfig {
    /// HTML appended to every caption, e.g. a channel link
    #[serde(default)]
    pub footer: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_city() -> String {
    "Bila Tserkva,UA".to_string()
}

fn default_units() -> String {
    "metric".to_string()
}

fn default_lang() -> String {
    "uk".to_string()
}

fn default_timezone() -> String {
    "Europe/Kyiv".to_string()
}

fn default_location_name() -> String {
    "Білій Церкві".to_string()
}

fn default_telegram_api_url() -> String {
    DEFAULT_TELEGRAM_API_URL.to_string()
}

fn default_true() -> bool {
    true
}

fn default_send_at() -> String {
    "08:00".to_string()
}

fn default_tick_cron() -> String {
    "0 * * * * *".to_string()
}

fn default_max_attempts() -> u32 {
    5
}

fn default_font_regular() -> PathBuf {
    PathBuf::from("assets/fonts/DejaVuSans.ttf")
}

fn default_font_bold() -> PathBuf {
    PathBuf::from("assets/fonts/DejaVuSans-Bold.ttf")
}

fn default_characters_dir() -> PathBuf {
    PathBuf::from("assets/characters")
}

fn default_output_dir() -> PathBuf {
    std::env::temp_dir().join("weather-card")
}

fn default_icon_base_url() -> String {
    DEFAULT_ICON_BASE_URL.to_string()
}

fn default_title_template() -> String {
    DEFAULT_TITLE_TEMPLATE.to_string()
}

fn default_phrases() -> Vec<String> {
    DEFAULT_PHRASES.iter().map(|p| p.to_string()).collect()
}

/// Parse "HH:MM" (or "HH:MM:SS")
pub fn parse_send_at(value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| {
            ConfigError::Message(format!(
                "schedule.send_at must be HH:MM, got {:?}",
                value
            ))
        })
}

pub fn parse_timezone(value: &str) -> Result<Tz, ConfigError> {
    value
        .parse::<Tz>()
        .map_err(|_| ConfigError::Message(format!("Unknown timezone: {:?}", value)))
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            // Start with default values
            .set_default("host", default_host())?
            .set_default("port", default_port())?
            .set_default("city", default_city())?
            .set_default("units", default_units())?
            // Load from config file if present
            .add_source(File::with_name("config").required(false))
            .add_source(File::with_name("config.local").required(false))
            // Override with environment variables (prefixed with WEATHER_CARD_)
            // Convert SCREAMING_SNAKE_CASE env vars to snake_case config keys
            .add_source(
                Environment::with_prefix("WEATHER_CARD")
                    .prefix_separator("_")
                    .separator("__")
                    .convert_case(Case::Snake)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("render.phrases"),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would only fail later, at the first tick
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timezone()?;
        self.send_at()?;
        if self.openweathermap_api_key.trim().is_empty() {
            return Err(ConfigError::Message(
                "openweathermap_api_key must not be empty".to_string(),
            ));
        }
        if self.telegram.bot_token.trim().is_empty() || self.telegram.chat_id.trim().is_empty() {
            return Err(ConfigError::Message(
                "telegram.bot_token and telegram.chat_id are required".to_string(),
            ));
        }
        for (name, rule) in [("night", &self.periods.night), ("day", &self.periods.day)] {
            if !rule.is_valid() {
                return Err(ConfigError::Message(format!(
                    "periods.{} must end after it starts, with hours in 0..=24",
                    name
                )));
            }
        }
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        parse_timezone(&self.timezone)
    }

    pub fn send_at(&self) -> Result<NaiveTime, ConfigError> {
        parse_send_at(&self.schedule.send_at)
    }
}
