pub mod caption;
pub mod handlers;
mod service;

pub use service::{ReportError, ReportOutcome, ReportService, ReportSettings};
