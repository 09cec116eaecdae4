//! Loan ledger

use async_trait::async_trait;
use chrono::NaiveDate;

use super::postgres::PgTx;
use crate::{
    error::{AppError, AppResult},
    models::loan::{Loan, LoanDetails},
};

pub(crate) fn active_loan_not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Active loan with id {} not found", id))
}

#[async_trait]
pub trait LoanLedger: Send {
    /// All loans in insertion order, joined with the current book title and member name
    async fn list_loans(&mut self) -> AppResult<Vec<LoanDetails>>;

    /// Record a new active loan
    async fn create_loan(&mut self, book_id: i32, member_id: i32, loan_date: NaiveDate) -> AppResult<Loan>;

    /// Get an active loan and hold a row lock on it until the transaction ends.
    /// Returned and unknown loans are both reported as not found.
    async fn find_active_loan(&mut self, id: i32) -> AppResult<Loan>;

    /// Close an active loan
    async fn mark_returned(&mut self, id: i32, return_date: NaiveDate) -> AppResult<Loan>;
}

#[async_trait]
impl LoanLedger for PgTx {
    async fn list_loans(&mut self) -> AppResult<Vec<LoanDetails>> {
        let loans = sqlx::query_as::<_, LoanDetails>(
            r#"
            SELECT l.id, l.book_id, b.title AS book_title,
                   l.member_id, m.name AS member_name,
                   l.loan_date, l.return_date
            FROM loans l
            LEFT JOIN books b ON l.book_id = b.id
            LEFT JOIN members m ON l.member_id = m.id
            ORDER BY l.id
            "#,
        )
        .fetch_all(self.conn()?)
        .await?;
        Ok(loans)
    }

    async fn create_loan(&mut self, book_id: i32, member_id: i32, loan_date: NaiveDate) -> AppResult<Loan> {
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (book_id, member_id, loan_date)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(book_id)
        .bind(member_id)
        .bind(loan_date)
        .fetch_one(self.conn()?)
        .await?;
        Ok(loan)
    }

    async fn find_active_loan(&mut self, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE id = $1 AND return_date IS NULL FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(self.conn()?)
        .await?
        .ok_or_else(|| active_loan_not_found(id))
    }

    async fn mark_returned(&mut self, id: i32, return_date: NaiveDate) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans SET return_date = $2
            WHERE id = $1 AND return_date IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(return_date)
        .fetch_optional(self.conn()?)
        .await?
        .ok_or_else(|| active_loan_not_found(id))
    }
}
