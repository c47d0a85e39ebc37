//! Notification dispatcher: loan confirmations and overdue reminders

use chrono::NaiveDate;
use std::{sync::Arc, time::Duration};

use super::email::{Mailer, OutgoingEmail};
use crate::{
    error::{AppError, AppResult},
    models::{loan::LoanNotice, notification::OverdueReport},
    repository::LoanStore,
};

pub const LOAN_CREATED_SUBJECT: &str = "Book Loaned Successfully";
pub const LOAN_OVERDUE_SUBJECT: &str = "Your Loan Is Overdue";

/// Upper bound for delivering one message unless configured otherwise
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

pub fn loan_created_email(notice: &LoanNotice) -> OutgoingEmail {
    OutgoingEmail {
        to: notice.email.clone(),
        subject: LOAN_CREATED_SUBJECT.to_string(),
        body: format!(
            "Hello {name},\n\nYou have successfully loaned \"{title}\".\nPlease return it by {due}.\n",
            name = notice.member_name(),
            title = notice.book_title,
            due = notice.due_date,
        ),
    }
}

pub fn overdue_email(notice: &LoanNotice) -> OutgoingEmail {
    OutgoingEmail {
        to: notice.email.clone(),
        subject: LOAN_OVERDUE_SUBJECT.to_string(),
        body: format!(
            "Hello {name},\n\nYour loan of \"{title}\" was due on {due} and is now overdue.\nPlease return it as soon as possible.\n",
            name = notice.member_name(),
            title = notice.book_title,
            due = notice.due_date,
        ),
    }
}

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn LoanStore>,
    mailer: Arc<dyn Mailer>,
    send_timeout: Duration,
}

impl NotificationService {
    pub fn new(store: Arc<dyn LoanStore>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            store,
            mailer,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    /// Deliver one message, turning a send that outlives `send_timeout`
    /// into a delivery failure
    async fn deliver(&self, email: &OutgoingEmail) -> AppResult<()> {
        tokio::time::timeout(self.send_timeout, self.mailer.send(email))
            .await
            .map_err(|_| {
                AppError::Delivery(format!(
                    "Sending to {} timed out after {:?}",
                    email.to, self.send_timeout
                ))
            })?
    }

    /// Confirm a new loan to its member.
    ///
    /// A loan that no longer exists is skipped without error. Delivery
    /// failures are returned so the job runner can retry them.
    pub async fn notify_loan_created(&self, loan_id: i32) -> AppResult<()> {
        let Some(notice) = self.store.notice(loan_id).await? else {
            tracing::debug!(loan_id, "Loan not found, skipping loan notification");
            return Ok(());
        };

        self.deliver(&loan_created_email(&notice)).await?;
        tracing::info!(loan_id, to = %notice.email, "Loan notification sent");
        Ok(())
    }

    /// Send one reminder per overdue loan. Every loan is attempted; failures
    /// are collected in the report rather than stopping the batch.
    pub async fn check_overdue_loans(&self, today: NaiveDate) -> AppResult<OverdueReport> {
        let notices = self.store.overdue_notices(today).await?;
        let mut report = OverdueReport::default();

        for notice in &notices {
            match self.deliver(&overdue_email(notice)).await {
                Ok(()) => report.record_sent(),
                Err(e) => {
                    tracing::warn!(loan_id = notice.loan_id, error = %e, "Overdue reminder failed");
                    report.record_failure(notice.loan_id);
                }
            }
        }

        if report.is_clean() {
            tracing::info!(%today, sent = report.sent, "Overdue check finished");
        } else {
            tracing::warn!(
                %today,
                sent = report.sent,
                failed = report.failed,
                failed_loan_ids = ?report.failed_loan_ids,
                "Overdue check finished with failures"
            );
        }
        Ok(report)
    }
}
