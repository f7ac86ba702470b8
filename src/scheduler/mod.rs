pub mod handlers;
mod service;
mod state;

pub use service::{DailyDispatcher, SchedulerService};
pub use state::DailyGate;
