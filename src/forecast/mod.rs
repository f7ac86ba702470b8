pub mod models;
pub mod reducer;
mod service;

pub use models::{ForecastResult, PeriodSummary};
pub use reducer::{reduce, Periods};
pub use service::{ForecastError, ForecastService, ForecastSource};
