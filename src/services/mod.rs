//! Business logic services

pub mod authors;
pub mod books;
pub mod email;
pub mod jobs;
pub mod loans;
pub mod members;
pub mod notifications;

use std::sync::Arc;

use crate::{
    error::AppResult,
    jobs::{JobQueue, JobRegistry},
    repository::{LoanStore, Repository},
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub authors: authors::AuthorsService,
    pub books: books::BooksService,
    pub members: members::MembersService,
    pub loans: loans::LoansService,
    pub jobs: jobs::JobsService,
    repository: Repository,
}

impl Services {
    /// Create all services. Loans go through `loan_store`, which is the
    /// repository's loans table in production.
    pub fn new(
        repository: Repository,
        loan_store: Arc<dyn LoanStore>,
        registry: Arc<JobRegistry>,
        queue: JobQueue,
    ) -> Self {
        Self {
            authors: authors::AuthorsService::new(repository.clone()),
            books: books::BooksService::new(repository.clone()),
            members: members::MembersService::new(repository.clone()),
            loans: loans::LoansService::new(loan_store, queue.clone()),
            jobs: jobs::JobsService::new(registry, queue),
            repository,
        }
    }

    /// Check that the database answers
    pub async fn ready(&self) -> AppResult<()> {
        self.repository.ping().await
    }
}
