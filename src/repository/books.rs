//! Inventory store: book records and their available copies

use async_trait::async_trait;

use super::postgres::PgTx;
use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookChanges, NewBook},
};

pub(crate) fn book_not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Book with id {} not found", id))
}

#[async_trait]
pub trait InventoryStore: Send {
    /// List all books ordered by id
    async fn list_books(&mut self) -> AppResult<Vec<Book>>;

    /// Get book by ID
    async fn get_book(&mut self, id: i32) -> AppResult<Book>;

    /// Get book by ID and hold a row lock on it until the transaction ends
    async fn lock_book(&mut self, id: i32) -> AppResult<Book>;

    async fn create_book(&mut self, book: &NewBook) -> AppResult<Book>;

    async fn update_book(&mut self, id: i32, changes: &BookChanges) -> AppResult<Book>;

    async fn delete_book(&mut self, id: i32) -> AppResult<()>;

    /// Add `delta` to the available copies. Non-negativity is the caller's job.
    async fn adjust_copies(&mut self, id: i32, delta: i32) -> AppResult<Book>;
}

#[async_trait]
impl InventoryStore for PgTx {
    async fn list_books(&mut self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>("SELECT * FROM books ORDER BY id")
            .fetch_all(self.conn()?)
            .await?;
        Ok(books)
    }

    async fn get_book(&mut self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(self.conn()?)
            .await?
            .ok_or_else(|| book_not_found(id))
    }

    async fn lock_book(&mut self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(self.conn()?)
            .await?
            .ok_or_else(|| book_not_found(id))
    }

    async fn create_book(&mut self, book: &NewBook) -> AppResult<Book> {
        let row = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, isbn, copies)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(book.copies)
        .fetch_one(self.conn()?)
        .await?;
        Ok(row)
    }

    async fn update_book(&mut self, id: i32, changes: &BookChanges) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                title = COALESCE($2, title),
                author = COALESCE($3, author),
                isbn = CASE WHEN $4 THEN $5 ELSE isbn END,
                copies = COALESCE($6, copies)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.author)
        .bind(changes.isbn.is_some())
        .bind(changes.isbn.clone().flatten())
        .bind(changes.copies)
        .fetch_optional(self.conn()?)
        .await?
        .ok_or_else(|| book_not_found(id))
    }

    async fn delete_book(&mut self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(self.conn()?)
            .await?;
        if result.rows_affected() == 0 {
            return Err(book_not_found(id));
        }
        Ok(())
    }

    async fn adjust_copies(&mut self, id: i32, delta: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            "UPDATE books SET copies = copies + $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(self.conn()?)
        .await?
        .ok_or_else(|| book_not_found(id))
    }
}
