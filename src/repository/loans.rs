//! Loans repository for database operations

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::Book,
        loan::{Loan, LoanNotice, LoanQuery, NewLoan},
    },
};

const NOTICE_SELECT: &str = r#"
    SELECT l.id AS loan_id, u.username, u.first_name, u.last_name, u.email,
           b.title AS book_title, l.due_date
    FROM loans l
    JOIN books b ON b.id = l.book_id
    JOIN members m ON m.id = l.member_id
    JOIN users u ON u.id = m.user_id
"#;

/// Storage operations the loan lifecycle and the notification dispatcher
/// depend on.
///
/// Mutations of an existing loan go through [`Loan::extend_due_date`] and
/// [`Loan::mark_returned`] so every implementation applies the same rules.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoanStore: Send + Sync {
    async fn find_book(&self, book_id: i32) -> AppResult<Book>;

    async fn member_exists(&self, member_id: i32) -> AppResult<bool>;

    async fn insert(&self, loan: &NewLoan) -> AppResult<Loan>;

    async fn get(&self, id: i32) -> AppResult<Loan>;

    /// `today` decides the active/overdue split when filtering by status
    async fn list(&self, query: &LoanQuery, today: NaiveDate) -> AppResult<Vec<Loan>>;

    async fn extend(&self, id: i32, additional_days: i64) -> AppResult<Loan>;

    async fn mark_returned(&self, id: i32, on: NaiveDate) -> AppResult<Loan>;

    /// Loans not returned whose due date is strictly before `today`
    async fn overdue(&self, today: NaiveDate) -> AppResult<Vec<Loan>>;

    /// `None` when the loan does not exist
    async fn notice(&self, id: i32) -> AppResult<Option<LoanNotice>>;

    async fn overdue_notices(&self, today: NaiveDate) -> AppResult<Vec<LoanNotice>>;
}

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Load a loan and hold its row lock until the transaction ends
    async fn lock(tx: &mut Transaction<'_, Postgres>, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }
}

#[async_trait]
impl LoanStore for LoansRepository {
    async fn find_book(&self, book_id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(book_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))
    }

    async fn member_exists(&self, member_id: i32) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM members WHERE id = $1)")
                .bind(member_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn insert(&self, loan: &NewLoan) -> AppResult<Loan> {
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (book_id, member_id, loan_date, due_date, is_returned)
            VALUES ($1, $2, $3, $4, FALSE)
            RETURNING *
            "#,
        )
        .bind(loan.book_id)
        .bind(loan.member_id)
        .bind(loan.loan_date)
        .bind(loan.due_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(loan)
    }

    async fn get(&self, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    async fn list(&self, query: &LoanQuery, today: NaiveDate) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            r#"
            SELECT * FROM loans
            WHERE ($1::int IS NULL OR member_id = $1)
              AND ($2::int IS NULL OR book_id = $2)
              AND (
                  $3::text IS NULL
                  OR ($3 = 'returned' AND is_returned)
                  OR ($3 = 'overdue' AND NOT is_returned AND due_date < $4)
                  OR ($3 = 'active' AND NOT is_returned AND due_date >= $4)
              )
            ORDER BY loan_date DESC, id DESC
            "#,
        )
        .bind(query.member_id)
        .bind(query.book_id)
        .bind(query.status.map(|s| s.to_string()))
        .bind(today)
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    async fn extend(&self, id: i32, additional_days: i64) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;
        let mut loan = Self::lock(&mut tx, id).await?;

        loan.extend_due_date(additional_days)?;

        sqlx::query("UPDATE loans SET due_date = $1 WHERE id = $2")
            .bind(loan.due_date)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(loan)
    }

    async fn mark_returned(&self, id: i32, on: NaiveDate) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;
        let mut loan = Self::lock(&mut tx, id).await?;

        loan.mark_returned(on)?;

        sqlx::query("UPDATE loans SET is_returned = TRUE, return_date = $1 WHERE id = $2")
            .bind(loan.return_date)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(loan)
    }

    async fn overdue(&self, today: NaiveDate) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE is_returned = FALSE AND due_date < $1 ORDER BY due_date, id",
        )
        .bind(today)
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    async fn notice(&self, id: i32) -> AppResult<Option<LoanNotice>> {
        let notice = sqlx::query_as::<_, LoanNotice>(&format!("{} WHERE l.id = $1", NOTICE_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(notice)
    }

    async fn overdue_notices(&self, today: NaiveDate) -> AppResult<Vec<LoanNotice>> {
        let notices = sqlx::query_as::<_, LoanNotice>(&format!(
            "{} WHERE l.is_returned = FALSE AND l.due_date < $1 ORDER BY l.due_date, l.id",
            NOTICE_SELECT
        ))
        .bind(today)
        .fetch_all(&self.pool)
        .await?;
        Ok(notices)
    }
}
