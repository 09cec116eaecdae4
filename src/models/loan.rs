//! Loan model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Loan record from the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub book_id: i32,
    pub member_id: i32,
    pub loan_date: NaiveDate,
    /// `None` while the loan is active
    pub return_date: Option<NaiveDate>,
}

/// Committed loan states. A loan moves from `Active` to `Returned` once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Active,
    Returned,
}

impl Loan {
    pub fn status(&self) -> LoanStatus {
        match self.return_date {
            None => LoanStatus::Active,
            Some(_) => LoanStatus::Returned,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status() == LoanStatus::Active
    }
}

/// Loan joined with the current book title and member name.
///
/// The title and name are read at query time, so edits made after the loan
/// was created show up here. Either side is `None` if the row was deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub book_id: i32,
    pub book_title: Option<String>,
    pub member_id: i32,
    pub member_name: Option<String>,
    pub loan_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
}

/// Create loan request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateLoan {
    pub book_id: Option<i32>,
    pub member_id: Option<i32>,
}
