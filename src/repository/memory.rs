//! In-memory backend
//!
//! A transaction takes the store-wide lock for its whole lifetime and works on
//! a private copy of the data; commit swaps the copy in. This gives
//! serializable isolation, which also covers the row locks the PostgreSQL
//! backend takes with `FOR UPDATE`.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{
    books::{book_not_found, InventoryStore},
    loans::{active_loan_not_found, LoanLedger},
    members::{member_not_found, MemberStore},
    Store, StoreTx,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookChanges, NewBook},
        loan::{Loan, LoanDetails},
        member::{Member, MemberChanges, NewMember},
    },
};

#[derive(Debug, Clone, Default)]
struct Tables {
    books: BTreeMap<i32, Book>,
    members: BTreeMap<i32, Member>,
    loans: BTreeMap<i32, Loan>,
    // Sequences never hand out an id twice, even after deletes
    book_seq: i32,
    member_seq: i32,
    loan_seq: i32,
}

#[derive(Debug, Default)]
struct State {
    tables: Tables,
    closed: bool,
}

/// Process-local store
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        if guard.closed {
            return Err(AppError::Internal("Store is closed".to_string()));
        }
        let working = guard.tables.clone();
        Ok(Box::new(MemoryTx {
            guard: Some(guard),
            working,
        }))
    }

    async fn ping(&self) -> AppResult<()> {
        if self.state.lock().await.closed {
            return Err(AppError::Internal("Store is closed".to_string()));
        }
        Ok(())
    }

    async fn close(&self) {
        self.state.lock().await.closed = true;
    }
}

/// Open in-memory transaction
pub struct MemoryTx {
    guard: Option<OwnedMutexGuard<State>>,
    working: Tables,
}

impl MemoryTx {
    fn tables(&mut self) -> AppResult<&mut Tables> {
        if self.guard.is_none() {
            return Err(AppError::Internal("Transaction already finished".to_string()));
        }
        Ok(&mut self.working)
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn commit(&mut self) -> AppResult<()> {
        let mut guard = self
            .guard
            .take()
            .ok_or_else(|| AppError::Internal("Transaction already finished".to_string()))?;
        guard.tables = std::mem::take(&mut self.working);
        Ok(())
    }

    async fn rollback(&mut self) -> AppResult<()> {
        self.guard
            .take()
            .ok_or_else(|| AppError::Internal("Transaction already finished".to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl InventoryStore for MemoryTx {
    async fn list_books(&mut self) -> AppResult<Vec<Book>> {
        Ok(self.tables()?.books.values().cloned().collect())
    }

    async fn get_book(&mut self, id: i32) -> AppResult<Book> {
        self.tables()?
            .books
            .get(&id)
            .cloned()
            .ok_or_else(|| book_not_found(id))
    }

    async fn lock_book(&mut self, id: i32) -> AppResult<Book> {
        self.get_book(id).await
    }

    async fn create_book(&mut self, book: &NewBook) -> AppResult<Book> {
        let tables = self.tables()?;
        tables.book_seq += 1;
        let row = Book {
            id: tables.book_seq,
            title: book.title.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone(),
            copies: book.copies,
        };
        tables.books.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_book(&mut self, id: i32, changes: &BookChanges) -> AppResult<Book> {
        let book = self
            .tables()?
            .books
            .get_mut(&id)
            .ok_or_else(|| book_not_found(id))?;
        changes.apply(book);
        Ok(book.clone())
    }

    async fn delete_book(&mut self, id: i32) -> AppResult<()> {
        self.tables()?
            .books
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| book_not_found(id))
    }

    async fn adjust_copies(&mut self, id: i32, delta: i32) -> AppResult<Book> {
        let book = self
            .tables()?
            .books
            .get_mut(&id)
            .ok_or_else(|| book_not_found(id))?;
        book.copies = book
            .copies
            .checked_add(delta)
            .ok_or_else(|| AppError::Internal(format!("Copies of book {} out of range", id)))?;
        Ok(book.clone())
    }
}

#[async_trait]
impl MemberStore for MemoryTx {
    async fn list_members(&mut self) -> AppResult<Vec<Member>> {
        Ok(self.tables()?.members.values().cloned().collect())
    }

    async fn get_member(&mut self, id: i32) -> AppResult<Member> {
        self.tables()?
            .members
            .get(&id)
            .cloned()
            .ok_or_else(|| member_not_found(id))
    }

    async fn create_member(&mut self, member: &NewMember) -> AppResult<Member> {
        let tables = self.tables()?;
        tables.member_seq += 1;
        let row = Member {
            id: tables.member_seq,
            name: member.name.clone(),
            email: member.email.clone(),
            phone: member.phone.clone(),
        };
        tables.members.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_member(&mut self, id: i32, changes: &MemberChanges) -> AppResult<Member> {
        let member = self
            .tables()?
            .members
            .get_mut(&id)
            .ok_or_else(|| member_not_found(id))?;
        changes.apply(member);
        Ok(member.clone())
    }

    async fn delete_member(&mut self, id: i32) -> AppResult<()> {
        self.tables()?
            .members
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| member_not_found(id))
    }
}

#[async_trait]
impl LoanLedger for MemoryTx {
    async fn list_loans(&mut self) -> AppResult<Vec<LoanDetails>> {
        let tables = self.tables()?;
        let loans = tables
            .loans
            .values()
            .map(|loan| LoanDetails {
                id: loan.id,
                book_id: loan.book_id,
                book_title: tables.books.get(&loan.book_id).map(|b| b.title.clone()),
                member_id: loan.member_id,
                member_name: tables.members.get(&loan.member_id).map(|m| m.name.clone()),
                loan_date: loan.loan_date,
                return_date: loan.return_date,
            })
            .collect();
        Ok(loans)
    }

    async fn create_loan(&mut self, book_id: i32, member_id: i32, loan_date: NaiveDate) -> AppResult<Loan> {
        let tables = self.tables()?;
        tables.loan_seq += 1;
        let loan = Loan {
            id: tables.loan_seq,
            book_id,
            member_id,
            loan_date,
            return_date: None,
        };
        tables.loans.insert(loan.id, loan.clone());
        Ok(loan)
    }

    async fn find_active_loan(&mut self, id: i32) -> AppResult<Loan> {
        self.tables()?
            .loans
            .get(&id)
            .filter(|loan| loan.is_active())
            .cloned()
            .ok_or_else(|| active_loan_not_found(id))
    }

    async fn mark_returned(&mut self, id: i32, return_date: NaiveDate) -> AppResult<Loan> {
        let loan = self
            .tables()?
            .loans
            .get_mut(&id)
            .filter(|loan| loan.is_active())
            .ok_or_else(|| active_loan_not_found(id))?;
        loan.return_date = Some(return_date);
        Ok(loan.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dune() -> NewBook {
        NewBook {
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            isbn: None,
            copies: 2,
        }
    }

    #[tokio::test]
    async fn test_commit_makes_changes_visible() {
        let store = MemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        let book = tx.create_book(&dune()).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.get_book(book.id).await.unwrap().title, "Dune");
    }

    #[tokio::test]
    async fn test_drop_without_commit_rolls_back() {
        let store = MemoryStore::new();

        {
            let mut tx = store.begin().await.unwrap();
            tx.create_book(&dune()).await.unwrap();
        }

        let mut tx = store.begin().await.unwrap();
        assert!(tx.list_books().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_delete() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let first = tx.create_book(&dune()).await.unwrap();
        tx.delete_book(first.id).await.unwrap();
        let second = tx.create_book(&dune()).await.unwrap();
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn test_mark_returned_only_once() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let loan = tx.create_loan(1, 1, date).await.unwrap();

        assert_eq!(tx.mark_returned(loan.id, date).await.unwrap().return_date, Some(date));
        assert!(matches!(
            tx.mark_returned(loan.id, date).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            tx.find_active_loan(loan.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_adjust_copies_overflow_is_an_error() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let book = tx.create_book(&dune()).await.unwrap();
        tx.update_book(
            book.id,
            &BookChanges {
                copies: Some(i32::MAX),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(matches!(
            tx.adjust_copies(book.id, 1).await,
            Err(AppError::Internal(_))
        ));
        assert_eq!(tx.get_book(book.id).await.unwrap().copies, i32::MAX);
    }

    #[tokio::test]
    async fn test_finished_transaction_rejects_use() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.rollback().await.unwrap();
        assert!(matches!(tx.list_books().await, Err(AppError::Internal(_))));
    }

    #[tokio::test]
    async fn test_closed_store_refuses_transactions() {
        let store = MemoryStore::new();
        store.close().await;
        assert!(store.begin().await.is_err());
        assert!(store.ping().await.is_err());
    }
}
