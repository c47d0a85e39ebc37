//! Jobs wrapping the notification dispatcher

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use super::{Job, JobContext, CHECK_OVERDUE_LOANS, SEND_LOAN_NOTIFICATION};
use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
struct LoanNotificationPayload {
    loan_id: i32,
}

#[derive(Debug, Default, Deserialize)]
struct OverduePayload {
    today: Option<NaiveDate>,
}

pub struct SendLoanNotification;

#[async_trait]
impl Job for SendLoanNotification {
    fn name(&self) -> &'static str {
        SEND_LOAN_NOTIFICATION
    }

    async fn run(&self, ctx: &JobContext) -> AppResult<String> {
        let payload: LoanNotificationPayload = serde_json::from_value(ctx.payload.clone())
            .map_err(|e| AppError::BadRequest(format!("Invalid {} payload: {}", self.name(), e)))?;

        if ctx.attempt > 1 {
            tracing::info!(loan_id = payload.loan_id, attempt = ctx.attempt, "Retrying loan notification");
        }
        ctx.notifications.notify_loan_created(payload.loan_id).await?;
        Ok(format!("loan {} notification handled", payload.loan_id))
    }
}

/// Overdue sweep. Per-loan delivery failures are reported in the summary and
/// do not fail the job, so a retry never re-sends the reminders that went out.
pub struct CheckOverdueLoans;

#[async_trait]
impl Job for CheckOverdueLoans {
    fn name(&self) -> &'static str {
        CHECK_OVERDUE_LOANS
    }

    // Each reminder has its own send timeout
    fn worker_timeout(&self) -> bool {
        false
    }

    async fn run(&self, ctx: &JobContext) -> AppResult<String> {
        let payload = if ctx.payload.is_null() {
            OverduePayload::default()
        } else {
            serde_json::from_value::<OverduePayload>(ctx.payload.clone()).map_err(|e| {
                AppError::BadRequest(format!("Invalid {} payload: {}", self.name(), e))
            })?
        };
        let today = payload.today.unwrap_or(ctx.today);

        tracing::debug!(%today, attempt = ctx.attempt, "Running overdue check");
        let report = ctx.notifications.check_overdue_loans(today).await?;
        let mut summary = format!("overdue reminders for {}: {}", today, report);
        if !report.failed_loan_ids.is_empty() {
            summary.push_str(&format!(" (failed loans: {:?})", report.failed_loan_ids));
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        services::notifications::NotificationService,
        test_utils::{date, InMemoryLoanStore, RecordingMailer},
    };
    use serde_json::json;
    use std::sync::Arc;

    fn context(
        store: &Arc<InMemoryLoanStore>,
        mailer: &Arc<RecordingMailer>,
        payload: serde_json::Value,
        today: NaiveDate,
    ) -> JobContext {
        JobContext {
            payload,
            attempt: 1,
            today,
            notifications: NotificationService::new(store.clone(), mailer.clone()),
        }
    }

    #[tokio::test]
    async fn test_retried_loan_notification_sends_once() {
        let store = Arc::new(InMemoryLoanStore::new());
        let book = store.add_book("Dune", 1);
        let member = store.add_member("jdoe", "jane@example.org");
        let loan = store.add_loan(book, member, date(2024, 1, 1));
        let mailer = Arc::new(RecordingMailer::new());

        let mut ctx = context(&store, &mailer, json!({ "loan_id": loan.id }), date(2024, 1, 1));
        ctx.attempt = 2;
        SendLoanNotification.run(&ctx).await.unwrap();

        assert_eq!(mailer.sent().len(), 1);
        assert!(SendLoanNotification.worker_timeout());
        assert!(!CheckOverdueLoans.worker_timeout());
    }

    #[tokio::test]
    async fn test_send_loan_notification_job() {
        let store = Arc::new(InMemoryLoanStore::new());
        let book = store.add_book("Dune", 1);
        let member = store.add_member("jdoe", "jane@example.org");
        let loan = store.add_loan(book, member, date(2024, 1, 1));
        let mailer = Arc::new(RecordingMailer::new());

        let ctx = context(&store, &mailer, json!({ "loan_id": loan.id }), date(2024, 1, 1));
        let summary = SendLoanNotification.run(&ctx).await.unwrap();

        assert!(summary.contains(&loan.id.to_string()));
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_send_loan_notification_rejects_bad_payload() {
        let store = Arc::new(InMemoryLoanStore::new());
        let mailer = Arc::new(RecordingMailer::new());

        let ctx = context(&store, &mailer, json!({ "loan": "x" }), date(2024, 1, 1));
        let result = SendLoanNotification.run(&ctx).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_check_overdue_uses_context_day_by_default() {
        let store = Arc::new(InMemoryLoanStore::new());
        let book = store.add_book("Dune", 1);
        let member = store.add_member("jdoe", "jane@example.org");
        store.add_loan(book, member, date(2024, 1, 1));
        let mailer = Arc::new(RecordingMailer::new());

        let ctx = context(&store, &mailer, serde_json::Value::Null, date(2024, 1, 10));
        CheckOverdueLoans.run(&ctx).await.unwrap();
        assert!(mailer.sent().is_empty());

        let ctx = context(&store, &mailer, serde_json::Value::Null, date(2024, 1, 16));
        let summary = CheckOverdueLoans.run(&ctx).await.unwrap();
        assert_eq!(mailer.sent().len(), 1);
        assert!(summary.contains("1 sent, 0 failed"));
    }

    #[tokio::test]
    async fn test_check_overdue_payload_overrides_day() {
        let store = Arc::new(InMemoryLoanStore::new());
        let book = store.add_book("Dune", 1);
        let member = store.add_member("jdoe", "jane@example.org");
        store.add_loan(book, member, date(2024, 1, 1));
        let mailer = Arc::new(RecordingMailer::new());

        let ctx = context(&store, &mailer, json!({ "today": "2024-02-01" }), date(2024, 1, 2));
        let summary = CheckOverdueLoans.run(&ctx).await.unwrap();
        assert!(summary.contains("2024-02-01"));
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_check_overdue_reports_failed_loans() {
        let store = Arc::new(InMemoryLoanStore::new());
        let book = store.add_book("Dune", 1);
        let member = store.add_member("jdoe", "jane@example.org");
        let loan = store.add_loan(book, member, date(2024, 1, 1));
        let mailer = Arc::new(RecordingMailer::failing_for(&["jane@example.org"]));

        let ctx = context(&store, &mailer, serde_json::Value::Null, date(2024, 3, 1));
        let summary = CheckOverdueLoans.run(&ctx).await.unwrap();
        assert!(summary.contains("0 sent, 1 failed"));
        assert!(summary.contains(&format!("[{}]", loan.id)));
    }
}
