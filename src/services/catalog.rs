//! Book catalog service

use validator::Validate;

use super::{optional_text, required_text};
use crate::{
    error::AppResult,
    models::book::{Book, BookChanges, CreateBook, NewBook, UpdateBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list_books(&self) -> AppResult<Vec<Book>> {
        let mut tx = self.repository.begin().await?;
        let books = tx.list_books().await?;
        tx.commit().await?;
        Ok(books)
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        let mut tx = self.repository.begin().await?;
        let book = tx.get_book(id).await?;
        tx.commit().await?;
        Ok(book)
    }

    /// Add a book to the inventory
    pub async fn create_book(&self, data: CreateBook) -> AppResult<Book> {
        data.validate()?;
        let book = NewBook {
            title: required_text(data.title, "title")?,
            author: required_text(data.author, "author")?,
            isbn: optional_text(data.isbn),
            copies: data.copies.unwrap_or(1),
        };

        let mut tx = self.repository.begin().await?;
        let created = tx.create_book(&book).await?;
        tx.commit().await?;

        tracing::info!(book_id = created.id, copies = created.copies, "Book created");
        Ok(created)
    }

    /// Edit a book. Setting `copies` is an administrative override and is not
    /// checked against the loans currently open on the book.
    pub async fn update_book(&self, id: i32, data: UpdateBook) -> AppResult<Book> {
        data.validate()?;
        let changes = BookChanges {
            title: data.title.map(|t| required_text(Some(t), "title")).transpose()?,
            author: data.author.map(|a| required_text(Some(a), "author")).transpose()?,
            isbn: data.isbn.map(optional_text),
            copies: data.copies,
        };

        let mut tx = self.repository.begin().await?;
        let book = tx.update_book(id, &changes).await?;
        tx.commit().await?;

        tracing::info!(book_id = id, "Book updated");
        Ok(book)
    }

    /// Remove a book. Loans referencing it are kept.
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        let mut tx = self.repository.begin().await?;
        tx.delete_book(id).await?;
        tx.commit().await?;

        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::AppError, repository::memory::MemoryStore};

    fn service() -> CatalogService {
        CatalogService::new(Repository::new(MemoryStore::new()))
    }

    fn request(title: &str, author: &str) -> CreateBook {
        CreateBook {
            title: Some(title.to_string()),
            author: Some(author.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_defaults_to_one_copy() {
        let catalog = service();
        let book = catalog.create_book(request(" Dune ", "Frank Herbert")).await.unwrap();
        assert_eq!(book.title, "Dune");
        assert_eq!(book.copies, 1);
        assert_eq!(book.isbn, None);
    }

    #[tokio::test]
    async fn test_create_requires_title_and_author() {
        let catalog = service();
        let err = catalog.create_book(request("Dune", "  ")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = catalog.create_book(CreateBook::default()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(catalog.list_books().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_is_partial() {
        let catalog = service();
        let mut req = request("Dune", "Frank Herbert");
        req.isbn = Some("9780441013593".into());
        req.copies = Some(4);
        let book = catalog.create_book(req).await.unwrap();

        let updated = catalog
            .update_book(
                book.id,
                UpdateBook {
                    title: Some("Dune Messiah".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Dune Messiah");
        assert_eq!(updated.author, "Frank Herbert");
        assert_eq!(updated.isbn.as_deref(), Some("9780441013593"));
        assert_eq!(updated.copies, 4);

        let cleared = catalog
            .update_book(
                book.id,
                UpdateBook {
                    isbn: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.isbn, None);
    }

    #[tokio::test]
    async fn test_update_rejects_negative_copies() {
        let catalog = service();
        let book = catalog.create_book(request("Dune", "Frank Herbert")).await.unwrap();
        let err = catalog
            .update_book(
                book.id,
                UpdateBook {
                    copies: Some(-3),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(catalog.get_book(book.id).await.unwrap().copies, 1);
    }

    #[tokio::test]
    async fn test_update_rejects_copies_above_limit() {
        let catalog = service();
        let book = catalog.create_book(request("Dune", "Frank Herbert")).await.unwrap();
        let err = catalog
            .update_book(
                book.id,
                UpdateBook {
                    copies: Some(i32::MAX),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(catalog.get_book(book.id).await.unwrap().copies, 1);
    }

    #[tokio::test]
    async fn test_create_rejects_title_longer_than_column() {
        let catalog = service();
        let err = catalog
            .create_book(request(&"t".repeat(300), "Frank Herbert"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(catalog.list_books().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_book() {
        let catalog = service();
        assert!(matches!(catalog.get_book(42).await, Err(AppError::NotFound(_))));
        assert!(matches!(catalog.delete_book(42).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            catalog.update_book(42, UpdateBook::default()).await,
            Err(AppError::NotFound(_))
        ));
    }
}
