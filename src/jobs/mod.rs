//! Background job runtime.
//!
//! Jobs are explicit [`Job`] implementations registered by name in a
//! [`JobRegistry`]. Requests go through a bounded [`queue::JobQueue`] and are
//! executed by a [`queue::WorkerPool`]; the [`scheduler::Scheduler`] enqueues
//! recurring jobs at fixed times of day.

pub mod notifications;
pub mod queue;
pub mod scheduler;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};

use crate::{error::AppResult, services::notifications::NotificationService};

pub use queue::{JobQueue, JobRequest, RetryPolicy, WorkerPool};
pub use scheduler::{Schedule, ScheduledJob, Scheduler};

/// Confirmation email for a freshly created loan. Payload: `{"loan_id": i32}`
pub const SEND_LOAN_NOTIFICATION: &str = "send_loan_notification";

/// Daily overdue reminders. Payload: optional `{"today": "YYYY-MM-DD"}`
pub const CHECK_OVERDUE_LOANS: &str = "check_overdue_loans";

/// Everything a job run may use
#[derive(Clone)]
pub struct JobContext {
    pub payload: Value,
    /// 1 for the first run, incremented on each retry
    pub attempt: u32,
    pub today: NaiveDate,
    pub notifications: NotificationService,
}

#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &'static str;

    /// Run once. The returned string summarises the run for the logs.
    async fn run(&self, ctx: &JobContext) -> AppResult<String>;

    /// Whether the worker cancels a run that outlives the policy timeout.
    /// Jobs that bound each of their own steps return `false`.
    fn worker_timeout(&self) -> bool {
        true
    }
}

/// Explicit table of runnable jobs, keyed by name
#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: HashMap<&'static str, Arc<dyn Job>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the loan notification jobs
    pub fn with_library_jobs() -> Self {
        let mut registry = Self::new();
        registry.register(notifications::SendLoanNotification);
        registry.register(notifications::CheckOverdueLoans);
        registry
    }

    /// Add a job, replacing any job already registered under the same name
    pub fn register<J: Job + 'static>(&mut self, job: J) {
        self.jobs.insert(job.name(), Arc::new(job));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Job>> {
        self.jobs.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.jobs.contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.jobs.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
