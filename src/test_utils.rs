//! Shared test doubles: an in-memory loan store and a recording mailer.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::{collections::HashSet, sync::Mutex, time::Duration};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::Book,
        enums::{Genre, LoanStatus},
        loan::{Loan, LoanNotice, LoanQuery, NewLoan},
        member::Member,
    },
    repository::LoanStore,
    services::email::{Mailer, OutgoingEmail},
};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
}

#[derive(Default)]
struct Tables {
    books: Vec<Book>,
    members: Vec<Member>,
    loans: Vec<Loan>,
    next_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn loan_mut(&mut self, id: i32) -> AppResult<&mut Loan> {
        self.loans
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    fn notice(&self, loan: &Loan) -> Option<LoanNotice> {
        let book = self.books.iter().find(|b| b.id == loan.book_id)?;
        let member = self.members.iter().find(|m| m.id == loan.member_id)?;
        Some(LoanNotice {
            loan_id: loan.id,
            username: member.username.clone(),
            first_name: member.first_name.clone(),
            last_name: member.last_name.clone(),
            email: member.email.clone(),
            book_title: book.title.clone(),
            due_date: loan.due_date,
        })
    }
}

/// `LoanStore` over plain vectors, applying the same model rules as the
/// Postgres repository.
#[derive(Default)]
pub struct InMemoryLoanStore {
    tables: Mutex<Tables>,
}

impl InMemoryLoanStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_book(&self, title: &str, available_copies: i32) -> i32 {
        let mut tables = self.tables.lock().unwrap();
        let id = tables.next_id();
        tables.books.push(Book {
            id,
            title: title.to_string(),
            author_id: 1,
            isbn: format!("{:013}", id),
            genre: Genre::Fiction,
            available_copies,
        });
        id
    }

    pub fn add_member(&self, username: &str, email: &str) -> i32 {
        let mut tables = self.tables.lock().unwrap();
        let id = tables.next_id();
        tables.members.push(Member {
            id,
            user_id: id,
            username: username.to_string(),
            email: email.to_string(),
            first_name: None,
            last_name: None,
            membership_date: date(2023, 1, 1),
        });
        id
    }

    /// Insert a loan issued on `loan_date` with the default due date
    pub fn add_loan(&self, book_id: i32, member_id: i32, loan_date: NaiveDate) -> Loan {
        let new = NewLoan::issue(book_id, member_id, loan_date).expect("loan date in range");
        self.insert_new(&new)
    }

    pub fn return_loan(&self, id: i32, on: NaiveDate) {
        let mut tables = self.tables.lock().unwrap();
        tables
            .loan_mut(id)
            .and_then(|loan| loan.mark_returned(on))
            .expect("loan can be returned");
    }

    pub fn loans(&self) -> Vec<Loan> {
        self.tables.lock().unwrap().loans.clone()
    }

    fn insert_new(&self, new: &NewLoan) -> Loan {
        let mut tables = self.tables.lock().unwrap();
        let loan = Loan {
            id: tables.next_id(),
            book_id: new.book_id,
            member_id: new.member_id,
            loan_date: new.loan_date,
            due_date: new.due_date,
            return_date: None,
            is_returned: false,
        };
        tables.loans.push(loan.clone());
        loan
    }
}

#[async_trait]
impl LoanStore for InMemoryLoanStore {
    async fn find_book(&self, book_id: i32) -> AppResult<Book> {
        self.tables
            .lock()
            .unwrap()
            .books
            .iter()
            .find(|b| b.id == book_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))
    }

    async fn member_exists(&self, member_id: i32) -> AppResult<bool> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .members
            .iter()
            .any(|m| m.id == member_id))
    }

    async fn insert(&self, loan: &NewLoan) -> AppResult<Loan> {
        Ok(self.insert_new(loan))
    }

    async fn get(&self, id: i32) -> AppResult<Loan> {
        let mut tables = self.tables.lock().unwrap();
        tables.loan_mut(id).map(|loan| loan.clone())
    }

    async fn list(&self, query: &LoanQuery, today: NaiveDate) -> AppResult<Vec<Loan>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .loans
            .iter()
            .filter(|l| query.member_id.map_or(true, |id| l.member_id == id))
            .filter(|l| query.book_id.map_or(true, |id| l.book_id == id))
            .filter(|l| query.status.map_or(true, |s| l.status(today) == s))
            .cloned()
            .collect())
    }

    async fn extend(&self, id: i32, additional_days: i64) -> AppResult<Loan> {
        let mut tables = self.tables.lock().unwrap();
        let loan = tables.loan_mut(id)?;
        loan.extend_due_date(additional_days)?;
        Ok(loan.clone())
    }

    async fn mark_returned(&self, id: i32, on: NaiveDate) -> AppResult<Loan> {
        let mut tables = self.tables.lock().unwrap();
        let loan = tables.loan_mut(id)?;
        loan.mark_returned(on)?;
        Ok(loan.clone())
    }

    async fn overdue(&self, today: NaiveDate) -> AppResult<Vec<Loan>> {
        let query = LoanQuery {
            status: Some(LoanStatus::Overdue),
            ..LoanQuery::default()
        };
        self.list(&query, today).await
    }

    async fn notice(&self, id: i32) -> AppResult<Option<LoanNotice>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .loans
            .iter()
            .find(|l| l.id == id)
            .and_then(|loan| tables.notice(loan)))
    }

    async fn overdue_notices(&self, today: NaiveDate) -> AppResult<Vec<LoanNotice>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .loans
            .iter()
            .filter(|l| l.is_overdue(today))
            .filter_map(|loan| tables.notice(loan))
            .collect())
    }
}

/// Mailer that records every delivered message, fails for chosen recipients
/// and takes `delay` to deliver to slow ones
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    failing: HashSet<String>,
    slow: HashSet<String>,
    delay: Duration,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(recipients: &[&str]) -> Self {
        Self {
            failing: recipients.iter().map(|r| r.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn slow_for(mut self, recipients: &[&str], delay: Duration) -> Self {
        self.slow = recipients.iter().map(|r| r.to_string()).collect();
        self.delay = delay;
        self
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> AppResult<()> {
        if self.failing.contains(&email.to) {
            return Err(AppError::Delivery(format!("Mailbox {} unavailable", email.to)));
        }
        if self.slow.contains(&email.to) {
            tokio::time::sleep(self.delay).await;
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}
