//! Manual job triggering

use serde_json::Value;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    jobs::{JobQueue, JobRegistry},
};

#[derive(Clone)]
pub struct JobsService {
    registry: Arc<JobRegistry>,
    queue: JobQueue,
}

impl JobsService {
    pub fn new(registry: Arc<JobRegistry>, queue: JobQueue) -> Self {
        Self { registry, queue }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.registry.names()
    }

    /// Queue a registered job for immediate execution
    pub fn trigger(&self, name: &str, payload: Value) -> AppResult<()> {
        if !self.registry.contains(name) {
            return Err(AppError::NotFound(format!("No job named {}", name)));
        }
        self.queue.enqueue(name, payload)?;
        tracing::info!(job = name, "Job triggered manually");
        Ok(())
    }
}
