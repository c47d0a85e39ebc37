//! Library management server
//!
//! REST JSON API over a catalog of authors and books, library members and
//! their loans, with background jobs for loan notifications and overdue
//! reminders.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod jobs;
pub mod models;
pub mod repository;
pub mod services;

#[cfg(test)]
mod test_utils;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
