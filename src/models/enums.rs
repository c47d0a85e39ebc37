//! Shared domain enums

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// Genre
// ---------------------------------------------------------------------------

/// Book genre, stored as the Postgres `genre` enum type
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "genre", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Genre {
    Fiction,
    Nonfiction,
    #[sqlx(rename = "sci-fi")]
    #[serde(rename = "sci-fi")]
    SciFi,
    Biography,
    Mystery,
    Fantasy,
    History,
    Poetry,
    Children,
}

impl std::fmt::Display for Genre {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Genre::Fiction => "Fiction",
            Genre::Nonfiction => "Non-Fiction",
            Genre::SciFi => "Sci-Fi",
            Genre::Biography => "Biography",
            Genre::Mystery => "Mystery",
            Genre::Fantasy => "Fantasy",
            Genre::History => "History",
            Genre::Poetry => "Poetry",
            Genre::Children => "Children",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// LoanStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a loan relative to a given day.
///
/// `Active` and `Overdue` both mean the book is still out; an extension can
/// move a loan from `Overdue` back to `Active`. `Returned` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Active,
    Overdue,
    Returned,
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LoanStatus::Active => "active",
            LoanStatus::Overdue => "overdue",
            LoanStatus::Returned => "returned",
        };
        write!(f, "{}", label)
    }
}
