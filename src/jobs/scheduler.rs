//! Time-based triggers for recurring jobs

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use serde_json::Value;
use tokio::task::JoinHandle;

use super::JobQueue;
use crate::error::{AppError, AppResult};

/// When a recurring job fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Once a day at a fixed UTC time
    Daily { at: NaiveTime },
}

impl Schedule {
    pub fn daily(hour: u32, minute: u32) -> AppResult<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(|at| Schedule::Daily { at })
            .ok_or_else(|| {
                AppError::Validation(format!("Invalid daily time {:02}:{:02}", hour, minute))
            })
    }

    /// First fire time strictly after `now`
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Schedule::Daily { at } => {
                let today_at = Utc.from_utc_datetime(&now.date_naive().and_time(*at));
                if today_at > now {
                    today_at
                } else {
                    today_at + Duration::days(1)
                }
            }
        }
    }
}

impl std::fmt::Display for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Schedule::Daily { at } => write!(f, "daily at {} UTC", at.format("%H:%M")),
        }
    }
}

/// A job enqueued on a schedule
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledJob {
    pub name: &'static str,
    pub schedule: Schedule,
    pub payload: Value,
}

/// Enqueues scheduled jobs when they come due
pub struct Scheduler {
    queue: JobQueue,
    entries: Vec<ScheduledJob>,
}

impl Scheduler {
    pub fn new(queue: JobQueue) -> Self {
        Self {
            queue,
            entries: Vec::new(),
        }
    }

    pub fn add(mut self, name: &'static str, schedule: Schedule, payload: Value) -> Self {
        self.entries.push(ScheduledJob {
            name,
            schedule,
            payload,
        });
        self
    }

    /// Earliest fire time after `now` and the entries due at that instant
    pub fn next_due(&self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, Vec<&ScheduledJob>)> {
        let next = self
            .entries
            .iter()
            .map(|entry| entry.schedule.next_after(now))
            .min()?;

        let due = self
            .entries
            .iter()
            .filter(|entry| entry.schedule.next_after(now) == next)
            .collect();
        Some((next, due))
    }

    /// Start the scheduler loop
    pub fn run(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            for entry in &self.entries {
                tracing::info!(job = entry.name, schedule = %entry.schedule, "Job scheduled");
            }

            let mut after = Utc::now();
            loop {
                let Some((fire_at, due)) = self.next_due(after) else {
                    tracing::info!("No scheduled jobs, scheduler stopping");
                    return;
                };

                let wait = (fire_at - Utc::now()).to_std().unwrap_or_default();
                tracing::debug!(next = %fire_at, "Scheduler sleeping");
                tokio::time::sleep(wait).await;

                for entry in due {
                    if let Err(e) = self.queue.enqueue(entry.name, entry.payload.clone()) {
                        tracing::error!(job = entry.name, error = %e, "Failed to enqueue scheduled job");
                    }
                }

                // Never fire the same slot twice, even if the timer woke early
                after = fire_at.max(Utc::now());
            }
        })
    }
}
