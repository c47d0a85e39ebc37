//! Book model and related types

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::borrow::Cow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use super::enums::Genre;

/// ISBN-10 (last character may be `X`) or ISBN-13, no separators
static ISBN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{9}[\dX]|\d{13})$").expect("invalid ISBN pattern"));

/// Book record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author_id: i32,
    /// Unique ISBN-10 or ISBN-13
    pub isbn: String,
    pub genre: Genre,
    /// Copies on the shelf, never negative
    pub available_copies: i32,
}

impl Book {
    pub fn has_available_copies(&self) -> bool {
        self.available_copies > 0
    }
}

/// Book list filters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    pub author_id: Option<i32>,
    pub genre: Option<Genre>,
    /// Case-insensitive substring match on the title
    pub title: Option<String>,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    pub author_id: i32,
    #[validate(custom(function = "validate_isbn"))]
    pub isbn: String,
    pub genre: Genre,
    /// Defaults to 1
    #[validate(range(min = 0, message = "Available copies cannot be negative"))]
    pub available_copies: Option<i32>,
}

/// Update book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,
    pub author_id: Option<i32>,
    #[validate(custom(function = "validate_isbn"))]
    pub isbn: Option<String>,
    pub genre: Option<Genre>,
    #[validate(range(min = 0, message = "Available copies cannot be negative"))]
    pub available_copies: Option<i32>,
}

pub fn validate_isbn(isbn: &str) -> Result<(), ValidationError> {
    if ISBN_RE.is_match(isbn) {
        return Ok(());
    }
    let mut error = ValidationError::new("isbn");
    error.message = Some(Cow::from(
        "ISBN must be 10 or 13 digits without separators (ISBN-10 may end with X)",
    ));
    Err(error)
}
