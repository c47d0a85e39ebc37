//! Job queue and worker pool

use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{
        mpsc::{self, error::TrySendError},
        Mutex,
    },
    task::JoinHandle,
};

use super::{JobContext, JobRegistry};
use crate::{
    config::JobsConfig,
    error::{AppError, AppResult},
    models::loan::today,
    services::notifications::NotificationService,
};

/// A request to run a registered job once
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    pub name: String,
    pub payload: Value,
}

/// Sending half of the job queue. Cheap to clone; enqueueing never waits.
#[derive(Clone)]
pub struct JobQueue {
    sender: mpsc::Sender<JobRequest>,
}

impl JobQueue {
    /// Create a queue holding at most `capacity` pending requests
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<JobRequest>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    pub fn enqueue(&self, name: &str, payload: Value) -> AppResult<()> {
        let request = JobRequest {
            name: name.to_string(),
            payload,
        };

        match self.sender.try_send(request) {
            Ok(()) => {
                tracing::debug!(job = name, "Job enqueued");
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                Err(AppError::Internal(format!("Job queue is full, dropping {}", name)))
            }
            Err(TrySendError::Closed(_)) => {
                Err(AppError::Internal(format!("Job queue is closed, dropping {}", name)))
            }
        }
    }
}

/// How often and how long a job may run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first run included
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub timeout: Duration,
}

impl From<&JobsConfig> for RetryPolicy {
    fn from(config: &JobsConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            retry_delay: Duration::from_secs(config.retry_delay_secs),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

/// Final state of a job request after all attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed { attempts: u32, summary: String },
    Failed { attempts: u32, error: String },
    UnknownJob,
}

/// Errors worth another attempt. Bad payloads and missing records will
/// fail the same way every time.
fn is_transient(error: &AppError) -> bool {
    matches!(
        error,
        AppError::Delivery(_) | AppError::Database(_) | AppError::Internal(_)
    )
}

/// Fixed set of workers draining the job queue
pub struct WorkerPool {
    registry: Arc<JobRegistry>,
    notifications: NotificationService,
    policy: RetryPolicy,
}

impl WorkerPool {
    pub fn new(
        registry: Arc<JobRegistry>,
        notifications: NotificationService,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            registry,
            notifications,
            policy,
        }
    }

    /// Spawn `workers` tasks sharing the receiver. They stop once every
    /// `JobQueue` handle has been dropped and the queue is drained.
    pub fn start(self, receiver: mpsc::Receiver<JobRequest>, workers: usize) -> Vec<JoinHandle<()>> {
        let receiver = Arc::new(Mutex::new(receiver));
        let pool = Arc::new(self);

        (0..workers.max(1))
            .map(|worker| {
                let receiver = receiver.clone();
                let pool = pool.clone();
                tokio::spawn(async move {
                    tracing::debug!(worker, "Job worker started");
                    loop {
                        let next = receiver.lock().await.recv().await;
                        match next {
                            Some(request) => {
                                pool.process(request).await;
                            }
                            None => break,
                        }
                    }
                    tracing::debug!(worker, "Job worker stopped");
                })
            })
            .collect()
    }

    /// Run one request to completion, retrying transient failures and
    /// timeouts up to the policy's attempt limit.
    pub async fn process(&self, request: JobRequest) -> JobOutcome {
        let Some(job) = self.registry.get(&request.name) else {
            tracing::error!(job = %request.name, "Unknown job, dropping request");
            return JobOutcome::UnknownJob;
        };

        let mut attempt = 1;
        loop {
            let ctx = JobContext {
                payload: request.payload.clone(),
                attempt,
                today: today(),
                notifications: self.notifications.clone(),
            };

            let run = if job.worker_timeout() {
                tokio::time::timeout(self.policy.timeout, job.run(&ctx)).await
            } else {
                Ok(job.run(&ctx).await)
            };

            let error = match run {
                Ok(Ok(summary)) => {
                    tracing::info!(job = job.name(), attempt, %summary, "Job completed");
                    return JobOutcome::Completed {
                        attempts: attempt,
                        summary,
                    };
                }
                Ok(Err(e)) if !is_transient(&e) => {
                    tracing::error!(job = job.name(), attempt, error = %e, "Job failed permanently");
                    return JobOutcome::Failed {
                        attempts: attempt,
                        error: e.to_string(),
                    };
                }
                Ok(Err(e)) => e.to_string(),
                Err(_) => format!("timed out after {:?}", self.policy.timeout),
            };

            if attempt >= self.policy.max_attempts {
                tracing::error!(job = job.name(), attempt, %error, "Job failed, giving up");
                return JobOutcome::Failed {
                    attempts: attempt,
                    error,
                };
            }

            tracing::warn!(job = job.name(), attempt, %error, "Job failed, retrying");
            tokio::time::sleep(self.policy.retry_delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        jobs::{Job, CHECK_OVERDUE_LOANS, SEND_LOAN_NOTIFICATION},
        test_utils::{date, InMemoryLoanStore, RecordingMailer},
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with `error` for the first `failures` runs
    struct Flaky {
        failures: u32,
        runs: Arc<AtomicU32>,
        error: fn() -> AppError,
    }

    #[async_trait]
    impl Job for Flaky {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn run(&self, ctx: &JobContext) -> AppResult<String> {
            let run = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
            assert_eq!(run, ctx.attempt);
            if run <= self.failures {
                return Err((self.error)());
            }
            Ok(format!("ok after {}", run))
        }
    }

    struct Sleepy;

    #[async_trait]
    impl Job for Sleepy {
        fn name(&self) -> &'static str {
            "sleepy"
        }

        async fn run(&self, _ctx: &JobContext) -> AppResult<String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("woke up".to_string())
        }
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            retry_delay: Duration::ZERO,
            timeout: Duration::from_secs(5),
        }
    }

    fn notifications(store: Arc<InMemoryLoanStore>, mailer: Arc<RecordingMailer>) -> NotificationService {
        NotificationService::new(store, mailer)
    }

    fn flaky_pool(failures: u32, max_attempts: u32, error: fn() -> AppError) -> (WorkerPool, Arc<AtomicU32>) {
        let runs = Arc::new(AtomicU32::new(0));
        let mut registry = JobRegistry::new();
        registry.register(Flaky {
            failures,
            runs: runs.clone(),
            error,
        });
        let pool = WorkerPool::new(
            Arc::new(registry),
            notifications(
                Arc::new(InMemoryLoanStore::new()),
                Arc::new(RecordingMailer::new()),
            ),
            policy(max_attempts),
        );
        (pool, runs)
    }

    fn flaky_request() -> JobRequest {
        JobRequest {
            name: "flaky".to_string(),
            payload: Value::Null,
        }
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let (pool, runs) = flaky_pool(2, 3, || AppError::Delivery("smtp down".to_string()));

        let outcome = pool.process(flaky_request()).await;

        assert_eq!(
            outcome,
            JobOutcome::Completed {
                attempts: 3,
                summary: "ok after 3".to_string()
            }
        );
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let (pool, runs) = flaky_pool(10, 3, || AppError::Delivery("smtp down".to_string()));

        let outcome = pool.process(flaky_request()).await;

        assert!(matches!(outcome, JobOutcome::Failed { attempts: 3, .. }));
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let (pool, runs) = flaky_pool(10, 3, || AppError::BadRequest("bad payload".to_string()));

        let outcome = pool.process(flaky_request()).await;

        assert!(matches!(outcome, JobOutcome::Failed { attempts: 1, .. }));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failure() {
        let mut registry = JobRegistry::new();
        registry.register(Sleepy);
        let pool = WorkerPool::new(
            Arc::new(registry),
            notifications(
                Arc::new(InMemoryLoanStore::new()),
                Arc::new(RecordingMailer::new()),
            ),
            policy(2),
        );

        let outcome = pool
            .process(JobRequest {
                name: "sleepy".to_string(),
                payload: Value::Null,
            })
            .await;

        match outcome {
            JobOutcome::Failed { attempts, error } => {
                assert_eq!(attempts, 2);
                assert!(error.contains("timed out"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_overdue_batch_runs_once_to_completion() {
        let store = Arc::new(InMemoryLoanStore::new());
        let book = store.add_book("Dune", 5);
        let recipients: Vec<String> = (0..5).map(|i| format!("m{}@example.org", i)).collect();
        for (i, email) in recipients.iter().enumerate() {
            let member = store.add_member(&format!("m{}", i), email);
            store.add_loan(book, member, date(2024, 1, 1));
        }
        let slow: Vec<&str> = recipients.iter().map(String::as_str).collect();
        let mailer = Arc::new(RecordingMailer::new().slow_for(&slow, Duration::from_secs(1)));

        // The whole batch takes longer than the worker timeout
        let pool = WorkerPool::new(
            Arc::new(JobRegistry::with_library_jobs()),
            notifications(store, mailer.clone()),
            RetryPolicy {
                max_attempts: 3,
                retry_delay: Duration::ZERO,
                timeout: Duration::from_millis(3500),
            },
        );

        let outcome = pool
            .process(JobRequest {
                name: CHECK_OVERDUE_LOANS.to_string(),
                payload: json!({ "today": "2024-06-01" }),
            })
            .await;

        assert!(matches!(outcome, JobOutcome::Completed { attempts: 1, .. }));
        let mut sent: Vec<String> = mailer.sent().into_iter().map(|m| m.to).collect();
        sent.sort();
        assert_eq!(sent, recipients);
    }

    #[tokio::test]
    async fn test_unknown_job_is_dropped() {
        let (pool, runs) = flaky_pool(0, 3, || AppError::Internal("unused".to_string()));

        let outcome = pool
            .process(JobRequest {
                name: "missing".to_string(),
                payload: Value::Null,
            })
            .await;

        assert_eq!(outcome, JobOutcome::UnknownJob);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_enqueue_reports_full_queue() {
        let (queue, mut receiver) = JobQueue::new(1);
        tokio_test::assert_ok!(queue.enqueue("a", Value::Null));
        assert!(matches!(
            queue.enqueue("b", Value::Null),
            Err(AppError::Internal(_))
        ));

        let request = receiver.recv().await.unwrap();
        assert_eq!(request.name, "a");
    }

    #[tokio::test]
    async fn test_enqueue_on_closed_queue() {
        let (queue, receiver) = JobQueue::new(4);
        drop(receiver);
        tokio_test::assert_err!(queue.enqueue("a", Value::Null));
    }

    #[tokio::test]
    async fn test_workers_drain_queue() {
        let store = Arc::new(InMemoryLoanStore::new());
        let book = store.add_book("Dune", 1);
        let member = store.add_member("jdoe", "jane@example.org");
        let first = store.add_loan(book, member, date(2024, 1, 1));
        let second = store.add_loan(book, member, date(2024, 1, 2));
        let mailer = Arc::new(RecordingMailer::new());

        let pool = WorkerPool::new(
            Arc::new(JobRegistry::with_library_jobs()),
            notifications(store, mailer.clone()),
            policy(1),
        );
        let (queue, receiver) = JobQueue::new(8);
        let handles = pool.start(receiver, 2);

        queue
            .enqueue(SEND_LOAN_NOTIFICATION, json!({ "loan_id": first.id }))
            .unwrap();
        queue
            .enqueue(SEND_LOAN_NOTIFICATION, json!({ "loan_id": second.id }))
            .unwrap();
        drop(queue);

        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(mailer.sent().len(), 2);
    }
}
