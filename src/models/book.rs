//! Book (inventory) model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Book record from the inventory store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    /// Copies currently on the shelf (not lent out)
    pub copies: i32,
}

/// Upper bound on the copies of one title
pub const MAX_COPIES: i32 = 100_000;

/// Create book request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(max = 255, message = "title must be at most 255 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 255, message = "author must be at most 255 characters"))]
    pub author: Option<String>,
    #[validate(length(max = 32, message = "isbn must be at most 32 characters"))]
    pub isbn: Option<String>,
    /// Defaults to 1
    #[validate(range(min = 0, max = 100_000, message = "copies must be between 0 and 100000"))]
    pub copies: Option<i32>,
}

/// Update book request; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(max = 255, message = "title must be at most 255 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 255, message = "author must be at most 255 characters"))]
    pub author: Option<String>,
    /// `null` clears the ISBN
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    #[validate(length(max = 32, message = "isbn must be at most 32 characters"))]
    pub isbn: Option<Option<String>>,
    /// Administrative override, not checked against outstanding loans
    #[validate(range(min = 0, max = 100_000, message = "copies must be between 0 and 100000"))]
    pub copies: Option<i32>,
}

/// Validated book ready for insertion
#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub copies: i32,
}

/// Validated set of book changes
#[derive(Debug, Clone, Default)]
pub struct BookChanges {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<Option<String>>,
    pub copies: Option<i32>,
}

impl BookChanges {
    /// Apply the changes to an in-memory copy of the record
    pub fn apply(&self, book: &mut Book) {
        if let Some(ref title) = self.title {
            book.title = title.clone();
        }
        if let Some(ref author) = self.author {
            book.author = author.clone();
        }
        if let Some(ref isbn) = self.isbn {
            book.isbn = isbn.clone();
        }
        if let Some(copies) = self.copies {
            book.copies = copies;
        }
    }
}
