use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{JobBuilder, JobScheduler};

use super::state::{DailyGate, DispatchState, TickDecision};
use crate::report::{ReportError, ReportOutcome, ReportService};

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Invalid cron expression: {0}")]
    InvalidCron(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),
}

/// The work a dispatch performs
#[async_trait]
pub trait ReportJob: Send + Sync {
    async fn run_report(&self, now: DateTime<Utc>) -> Result<ReportOutcome, ReportError>;
}

#[async_trait]
impl ReportJob for ReportService {
    async fn run_report(&self, now: DateTime<Utc>) -> Result<ReportOutcome, ReportError> {
        self.run_at(now).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// A previous tick is still running its report
    Skipped,
    Idle(TickDecision),
    Sent(NaiveDate),
    Failed { date: NaiveDate, attempt: u32 },
}

#[derive(Debug, Serialize)]
pub struct SchedulerStatus {
    pub enabled: bool,
    pub send_at: String,
    pub timezone: String,
    pub last_sent: Option<NaiveDate>,
    pub attempts_today: u32,
}

/// Owns the dispatch state and applies the gate on every tick
pub struct DailyDispatcher {
    job: Arc<dyn ReportJob>,
    gate: DailyGate,
    state: Mutex<DispatchState>,
    in_flight: Mutex<()>,
}

impl DailyDispatcher {
    pub fn new(job: Arc<dyn ReportJob>, gate: DailyGate) -> Self {
        Self {
            job,
            gate,
            state: Mutex::new(DispatchState::default()),
            in_flight: Mutex::new(()),
        }
    }

    pub fn gate(&self) -> &DailyGate {
        &self.gate
    }

    pub async fn state(&self) -> DispatchState {
        *self.state.lock().await
    }

    pub async fn tick(&self, now: DateTime<Utc>) -> TickOutcome {
        let Ok(_running) = self.in_flight.try_lock() else {
            tracing::debug!("Report still in flight, skipping tick");
            return TickOutcome::Skipped;
        };

        let decision = {
            let mut state = self.state.lock().await;
            let (decision, next) = self.gate.evaluate(*state, now);
            *state = next;
            decision
        };

        let TickDecision::Dispatch { date, attempt } = decision else {
            tracing::trace!(decision = ?decision, "No dispatch this tick");
            return TickOutcome::Idle(decision);
        };

        tracing::info!(date = %date, attempt = attempt, "Dispatching daily forecast report");

        match self.job.run_report(now).await {
            Ok(outcome) => {
                let mut state = self.state.lock().await;
                *state = self.gate.record_sent(*state, date);
                tracing::info!(
                    date = %date,
                    target_date = %outcome.target_date,
                    "Daily forecast report sent"
                );
                TickOutcome::Sent(date)
            }
            Err(e) => {
                tracing::error!(
                    date = %date,
                    attempt = attempt,
                    error = %e,
                    "Daily forecast report failed, will retry on a later tick"
                );
                TickOutcome::Failed { date, attempt }
            }
        }
    }
}

/// Cron-driven wrapper around the dispatcher
pub struct SchedulerService {
    scheduler: JobScheduler,
    dispatcher: Arc<DailyDispatcher>,
    enabled: bool,
    tick_cron: String,
}

impl SchedulerService {
    pub async fn new(
        dispatcher: Arc<DailyDispatcher>,
        enabled: bool,
        tick_cron: &str,
    ) -> Result<Self, SchedulerError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| SchedulerError::Scheduler(e.to_string()))?;

        Ok(Self {
            scheduler,
            dispatcher,
            enabled,
            tick_cron: tick_cron.to_string(),
        })
    }

    /// Register the tick job (when enabled) and start the scheduler
    pub async fn start(&self) -> Result<(), SchedulerError> {
        if !self.enabled {
            tracing::info!("Daily report schedule disabled");
            return Ok(());
        }

        let gate = self.dispatcher.gate();
        tracing::info!(
            cron = %self.tick_cron,
            send_at = %gate.send_at().format("%H:%M"),
            timezone = %gate.timezone(),
            "Scheduling daily forecast report"
        );

        let dispatcher = Arc::clone(&self.dispatcher);
        let tick_job = JobBuilder::new()
            .with_timezone(gate.timezone())
            .with_cron_job_type()
            .with_schedule(self.tick_cron.as_str())
            .map_err(|e| SchedulerError::InvalidCron(e.to_string()))?
            .with_run_async(Box::new(move |_uuid, _lock| {
                let dispatcher = Arc::clone(&dispatcher);
                Box::pin(async move {
                    dispatcher.tick(Utc::now()).await;
                })
            }))
            .build()
            .map_err(|e| SchedulerError::Scheduler(e.to_string()))?;

        self.scheduler
            .add(tick_job)
            .await
            .map_err(|e| SchedulerError::Scheduler(e.to_string()))?;

        self.scheduler
            .start()
            .await
            .map_err(|e| SchedulerError::Scheduler(e.to_string()))?;

        tracing::info!("Scheduler started");
        Ok(())
    }

    pub async fn status(&self) -> SchedulerStatus {
        let gate = self.dispatcher.gate();
        let state = self.dispatcher.state().await;
        let today = gate.local_date(Utc::now());

        SchedulerStatus {
            enabled: self.enabled,
            send_at: gate.send_at().format("%H:%M").to_string(),
            timezone: gate.timezone().to_string(),
            last_sent: state.last_sent,
            attempts_today: state.attempts_on(today),
        }
    }
}
