//! Book catalog service

use validator::Validate;

use crate::{
    error::AppResult,
    models::book::{Book, BookQuery, CreateBook, UpdateBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
}

impl BooksService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        self.repository.books.list(query).await
    }

    /// Books written by an author
    pub async fn list_by_author(&self, author_id: i32) -> AppResult<Vec<Book>> {
        self.repository.authors.get_by_id(author_id).await?;
        let query = BookQuery {
            author_id: Some(author_id),
            ..BookQuery::default()
        };
        self.repository.books.list(&query).await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    pub async fn create(&self, data: &CreateBook) -> AppResult<Book> {
        data.validate()?;
        // Verify author exists
        self.repository.authors.get_by_id(data.author_id).await?;
        self.repository.books.create(data).await
    }

    pub async fn update(&self, id: i32, data: &UpdateBook) -> AppResult<Book> {
        data.validate()?;
        if let Some(author_id) = data.author_id {
            self.repository.authors.get_by_id(author_id).await?;
        }
        self.repository.books.update(id, data).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await
    }
}
