//! Books repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, CreateBook, UpdateBook},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List books matching the optional filters
    pub async fn list(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let title_pattern = query
            .title
            .as_deref()
            .map(|t| format!("%{}%", t.trim()));

        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT * FROM books
            WHERE ($1::int IS NULL OR author_id = $1)
              AND ($2::genre IS NULL OR genre = $2)
              AND ($3::text IS NULL OR title ILIKE $3)
            ORDER BY title
            "#,
        )
        .bind(query.author_id)
        .bind(query.genre)
        .bind(title_pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Create a new book
    pub async fn create(&self, data: &CreateBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author_id, isbn, genre, available_copies)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&data.title)
        .bind(data.author_id)
        .bind(&data.isbn)
        .bind(data.genre)
        .bind(data.available_copies.unwrap_or(1))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::from(e)
                .on_unique_violation(format!("A book with ISBN {} already exists", data.isbn))
        })
    }

    /// Update a book, keeping fields that are not provided
    pub async fn update(&self, id: i32, data: &UpdateBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                title = COALESCE($2, title),
                author_id = COALESCE($3, author_id),
                isbn = COALESCE($4, isbn),
                genre = COALESCE($5, genre),
                available_copies = COALESCE($6, available_copies)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&data.title)
        .bind(data.author_id)
        .bind(&data.isbn)
        .bind(data.genre)
        .bind(data.available_copies)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::from(e).on_unique_violation("A book with this ISBN already exists"))?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Delete a book (cascades to its loans)
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }
}
