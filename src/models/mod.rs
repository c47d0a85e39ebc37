//! Data models for the library server

pub mod author;
pub mod book;
pub mod enums;
pub mod loan;
pub mod member;
pub mod notification;

// Re-export commonly used types
pub use author::Author;
pub use book::Book;
pub use enums::{Genre, LoanStatus};
pub use loan::{Loan, LoanDetails, LoanNotice, NewLoan};
pub use member::Member;
pub use notification::OverdueReport;
