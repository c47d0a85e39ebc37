//! Loan model and the lifecycle rules that apply to it

use chrono::{Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::enums::LoanStatus;
use crate::error::{AppError, AppResult};

/// Days between the loan date and the default due date
pub const LOAN_PERIOD_DAYS: u64 = 14;

/// Current calendar day (UTC), used for loan dates and overdue checks
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Default due date for a loan issued on `loan_date`
pub fn due_date_for(loan_date: NaiveDate) -> AppResult<NaiveDate> {
    loan_date
        .checked_add_days(Days::new(LOAN_PERIOD_DAYS))
        .ok_or_else(|| AppError::Validation(format!("Loan date {} is out of range", loan_date)))
}

/// Loan record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub book_id: i32,
    pub member_id: i32,
    pub loan_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub is_returned: bool,
}

impl Loan {
    /// Strictly after the due date and not returned. A loan due today is not overdue.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.is_returned && self.due_date < today
    }

    pub fn status(&self, today: NaiveDate) -> LoanStatus {
        if self.is_returned {
            LoanStatus::Returned
        } else if self.is_overdue(today) {
            LoanStatus::Overdue
        } else {
            LoanStatus::Active
        }
    }

    /// Push the due date back by `additional_days`. Zero is accepted and leaves
    /// the loan unchanged.
    pub fn extend_due_date(&mut self, additional_days: i64) -> AppResult<()> {
        if additional_days < 0 {
            return Err(AppError::Validation(format!(
                "Extension must not be negative (got {} days)",
                additional_days
            )));
        }
        if self.is_returned {
            return Err(AppError::BusinessRule(
                "Cannot extend a returned loan".to_string(),
            ));
        }

        self.due_date = self
            .due_date
            .checked_add_days(Days::new(additional_days as u64))
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "Extending by {} days is out of range",
                    additional_days
                ))
            })?;
        Ok(())
    }

    pub fn mark_returned(&mut self, on: NaiveDate) -> AppResult<()> {
        if self.is_returned {
            return Err(AppError::BusinessRule("Loan already returned".to_string()));
        }
        self.is_returned = true;
        self.return_date = Some(on);
        Ok(())
    }
}

/// A loan ready to be written: the due date is fixed before the row exists,
/// so a stored loan never lacks one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLoan {
    pub book_id: i32,
    pub member_id: i32,
    pub loan_date: NaiveDate,
    pub due_date: NaiveDate,
}

impl NewLoan {
    pub fn issue(book_id: i32, member_id: i32, loan_date: NaiveDate) -> AppResult<Self> {
        Ok(Self {
            book_id,
            member_id,
            loan_date,
            due_date: due_date_for(loan_date)?,
        })
    }
}

/// Loan with its status computed for a given day
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub book_id: i32,
    pub member_id: i32,
    pub loan_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub is_returned: bool,
    pub status: LoanStatus,
    pub is_overdue: bool,
}

impl LoanDetails {
    pub fn new(loan: Loan, today: NaiveDate) -> Self {
        Self {
            status: loan.status(today),
            is_overdue: loan.is_overdue(today),
            id: loan.id,
            book_id: loan.book_id,
            member_id: loan.member_id,
            loan_date: loan.loan_date,
            due_date: loan.due_date,
            return_date: loan.return_date,
            is_returned: loan.is_returned,
        }
    }
}

/// Everything needed to write a notification about one loan
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct LoanNotice {
    pub loan_id: i32,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub book_title: String,
    pub due_date: NaiveDate,
}

impl LoanNotice {
    pub fn member_name(&self) -> String {
        super::member::display_name(
            &self.username,
            self.first_name.as_deref(),
            self.last_name.as_deref(),
        )
    }
}

/// Loan list filters
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
pub struct LoanQuery {
    pub member_id: Option<i32>,
    pub book_id: Option<i32>,
    pub status: Option<LoanStatus>,
}

/// Create loan request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLoan {
    pub book_id: i32,
    pub member_id: i32,
}

/// Extend loan request
#[derive(Debug, Deserialize, ToSchema)]
pub struct ExtendLoan {
    /// Days added to the current due date, must not be negative
    pub days: i64,
}

/// Overdue listing parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct OverdueQuery {
    /// Reference day (YYYY-MM-DD), defaults to today
    pub today: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn loan_issued(on: NaiveDate) -> Loan {
        let new = NewLoan::issue(1, 1, on).unwrap();
        Loan {
            id: 1,
            book_id: new.book_id,
            member_id: new.member_id,
            loan_date: new.loan_date,
            due_date: new.due_date,
            return_date: None,
            is_returned: false,
        }
    }

    #[test]
    fn test_due_date_is_fourteen_days_after_loan_date() {
        for start in [date(2024, 1, 1), date(2024, 2, 20), date(2023, 12, 25)] {
            let new = NewLoan::issue(3, 4, start).unwrap();
            assert_eq!(new.loan_date, start);
            assert_eq!((new.due_date - start).num_days(), 14);
        }
        assert_eq!(due_date_for(date(2024, 2, 20)).unwrap(), date(2024, 3, 5));
    }

    #[test]
    fn test_due_date_out_of_range() {
        assert!(matches!(
            due_date_for(NaiveDate::MAX),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_lifecycle_scenario() {
        let mut loan = loan_issued(date(2024, 1, 1));
        assert_eq!(loan.due_date, date(2024, 1, 15));

        assert!(!loan.is_overdue(date(2024, 1, 10)));
        assert!(loan.is_overdue(date(2024, 1, 20)));

        loan.extend_due_date(5).unwrap();
        assert_eq!(loan.due_date, date(2024, 1, 20));
        assert!(!loan.is_overdue(date(2024, 1, 20)));
        assert!(loan.is_overdue(date(2024, 1, 21)));
    }

    #[test]
    fn test_due_day_itself_is_not_overdue() {
        let loan = loan_issued(date(2024, 1, 1));
        assert!(!loan.is_overdue(loan.due_date));
        assert!(loan.is_overdue(loan.due_date.succ_opt().unwrap()));
    }

    #[test]
    fn test_returned_loan_never_overdue() {
        let mut loan = loan_issued(date(2020, 1, 1));
        loan.mark_returned(date(2020, 3, 1)).unwrap();
        for today in [date(2019, 1, 1), date(2020, 1, 16), date(2030, 1, 1)] {
            assert!(!loan.is_overdue(today));
            assert_eq!(loan.status(today), LoanStatus::Returned);
        }
        assert_eq!(loan.return_date, Some(date(2020, 3, 1)));
    }

    #[test]
    fn test_status_transitions() {
        let mut loan = loan_issued(date(2024, 1, 1));
        assert_eq!(loan.status(date(2024, 1, 15)), LoanStatus::Active);
        assert_eq!(loan.status(date(2024, 1, 16)), LoanStatus::Overdue);

        loan.extend_due_date(7).unwrap();
        assert_eq!(loan.status(date(2024, 1, 16)), LoanStatus::Active);
    }

    #[test]
    fn test_extensions_compose() {
        let pairs = [(0, 0), (1, 2), (5, 9), (30, 0), (0, 365)];
        for (n1, n2) in pairs {
            let mut twice = loan_issued(date(2024, 1, 1));
            twice.extend_due_date(n1).unwrap();
            twice.extend_due_date(n2).unwrap();

            let mut once = loan_issued(date(2024, 1, 1));
            once.extend_due_date(n1 + n2).unwrap();

            assert_eq!(twice.due_date, once.due_date);
        }
    }

    #[test]
    fn test_extend_rejects_negative_days() {
        let mut loan = loan_issued(date(2024, 1, 1));
        let err = loan.extend_due_date(-1).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(loan.due_date, date(2024, 1, 15));
    }

    #[test]
    fn test_extend_returned_loan_is_rejected() {
        let mut loan = loan_issued(date(2024, 1, 1));
        loan.mark_returned(date(2024, 1, 5)).unwrap();
        assert!(matches!(
            loan.extend_due_date(3),
            Err(AppError::BusinessRule(_))
        ));
    }

    #[test]
    fn test_return_twice_is_rejected() {
        let mut loan = loan_issued(date(2024, 1, 1));
        loan.mark_returned(date(2024, 1, 5)).unwrap();
        assert!(matches!(
            loan.mark_returned(date(2024, 1, 6)),
            Err(AppError::BusinessRule(_))
        ));
        assert_eq!(loan.return_date, Some(date(2024, 1, 5)));
    }

    #[test]
    fn test_details_carry_status() {
        let loan = loan_issued(date(2024, 1, 1));
        let details = LoanDetails::new(loan, date(2024, 2, 1));
        assert_eq!(details.status, LoanStatus::Overdue);
        assert!(details.is_overdue);
    }

    #[test]
    fn test_notice_member_name() {
        let notice = LoanNotice {
            loan_id: 1,
            username: "jdoe".to_string(),
            first_name: Some("Jane".to_string()),
            last_name: None,
            email: "jane@example.org".to_string(),
            book_title: "Dune".to_string(),
            due_date: date(2024, 1, 15),
        };
        assert_eq!(notice.member_name(), "Jane");
    }
}
