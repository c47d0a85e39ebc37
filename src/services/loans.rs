//! Loan lifecycle service

use chrono::NaiveDate;
use serde_json::json;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    jobs::{JobQueue, SEND_LOAN_NOTIFICATION},
    models::loan::{CreateLoan, Loan, LoanQuery, NewLoan},
    repository::LoanStore,
};

#[derive(Clone)]
pub struct LoansService {
    store: Arc<dyn LoanStore>,
    jobs: JobQueue,
}

impl LoansService {
    pub fn new(store: Arc<dyn LoanStore>, jobs: JobQueue) -> Self {
        Self { store, jobs }
    }

    /// Lend a book to a member.
    ///
    /// The loan is stored with its due date already set, then a confirmation
    /// email is queued. Failing to queue the email does not undo the loan.
    pub async fn create_loan(&self, data: &CreateLoan, today: NaiveDate) -> AppResult<Loan> {
        let book = self.store.find_book(data.book_id).await?;

        if !self.store.member_exists(data.member_id).await? {
            return Err(AppError::NotFound(format!(
                "Member with id {} not found",
                data.member_id
            )));
        }

        if !book.has_available_copies() {
            return Err(AppError::Validation(format!(
                "Book \"{}\" has no available copies",
                book.title
            )));
        }

        let loan = self
            .store
            .insert(&NewLoan::issue(book.id, data.member_id, today)?)
            .await?;

        tracing::info!(
            loan_id = loan.id,
            book_id = loan.book_id,
            member_id = loan.member_id,
            due_date = %loan.due_date,
            "Loan created"
        );

        if let Err(e) = self
            .jobs
            .enqueue(SEND_LOAN_NOTIFICATION, json!({ "loan_id": loan.id }))
        {
            tracing::warn!(loan_id = loan.id, error = %e, "Could not queue loan notification");
        }

        Ok(loan)
    }

    pub async fn get_loan(&self, id: i32) -> AppResult<Loan> {
        self.store.get(id).await
    }

    pub async fn list_loans(&self, query: &LoanQuery, today: NaiveDate) -> AppResult<Vec<Loan>> {
        self.store.list(query, today).await
    }

    /// Push a loan's due date back by `additional_days` (zero allowed)
    pub async fn extend_due_date(&self, id: i32, additional_days: i64) -> AppResult<Loan> {
        if additional_days < 0 {
            return Err(AppError::Validation(format!(
                "Extension must not be negative (got {} days)",
                additional_days
            )));
        }

        let loan = self.store.extend(id, additional_days).await?;
        tracing::info!(loan_id = id, additional_days, due_date = %loan.due_date, "Loan extended");
        Ok(loan)
    }

    pub async fn return_loan(&self, id: i32, today: NaiveDate) -> AppResult<Loan> {
        let loan = self.store.mark_returned(id, today).await?;
        tracing::info!(loan_id = id, "Loan returned");
        Ok(loan)
    }

    /// Loans not returned and due strictly before `today`
    pub async fn get_overdue_loans(&self, today: NaiveDate) -> AppResult<Vec<Loan>> {
        self.store.overdue(today).await
    }
}
