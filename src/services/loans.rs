//! Loan service: lending and returning books
//!
//! Each operation runs in one transaction over the inventory store and the
//! loan ledger. `lend` locks the book row before reading its copies, so two
//! lenders racing for the last copy are serialized and only one of them wins.
//! Any error returned before `commit` drops the transaction, which rolls back
//! everything it did.

use chrono::{NaiveDate, Utc};

use crate::{
    error::{AppError, AppResult},
    models::loan::{Loan, LoanDetails},
    repository::Repository,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
}

impl LoansService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    /// All loans, with the current book title and member name
    pub async fn list_loans(&self) -> AppResult<Vec<LoanDetails>> {
        let mut tx = self.repository.begin().await?;
        let loans = tx.list_loans().await?;
        tx.commit().await?;
        Ok(loans)
    }

    /// Lend a book to a member
    pub async fn lend(&self, book_id: i32, member_id: i32) -> AppResult<Loan> {
        let mut tx = self.repository.begin().await?;

        let book = tx.lock_book(book_id).await?;
        if book.copies <= 0 {
            tracing::debug!(book_id, "Lend refused, no copies left");
            return Err(AppError::NoCopiesAvailable(book_id));
        }
        tx.get_member(member_id).await?;

        let loan = tx.create_loan(book_id, member_id, Self::today()).await?;
        let book = tx.adjust_copies(book_id, -1).await?;
        tx.commit().await?;

        tracing::info!(
            loan_id = loan.id,
            book_id,
            member_id,
            copies_left = book.copies,
            "Book lent"
        );
        Ok(loan)
    }

    /// Return a lent book. Fails with `NotFound` for unknown and already
    /// returned loans alike.
    pub async fn return_loan(&self, loan_id: i32) -> AppResult<Loan> {
        let mut tx = self.repository.begin().await?;

        let loan = tx.find_active_loan(loan_id).await?;
        let returned = tx.mark_returned(loan.id, Self::today()).await?;
        match tx.adjust_copies(loan.book_id, 1).await {
            Ok(book) => {
                tracing::info!(loan_id, book_id = book.id, copies_left = book.copies, "Book returned");
            }
            // The book was deleted while lent out; the loan is still closed
            Err(AppError::NotFound(_)) => {
                tracing::warn!(loan_id, book_id = loan.book_id, "Returned loan references a deleted book");
            }
            Err(e) => return Err(e),
        }
        tx.commit().await?;

        Ok(returned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{
            book::{Book, NewBook},
            member::{Member, NewMember},
            BookChanges,
        },
        repository::memory::MemoryStore,
    };
    use tokio_test::{assert_err, assert_ok};

    struct Fixture {
        repository: Repository,
        loans: LoansService,
    }

    impl Fixture {
        fn new() -> Self {
            let repository = Repository::new(MemoryStore::new());
            Self {
                loans: LoansService::new(repository.clone()),
                repository,
            }
        }

        async fn book(&self, copies: i32) -> Book {
            let mut tx = self.repository.begin().await.unwrap();
            let book = tx
                .create_book(&NewBook {
                    title: "The Left Hand of Darkness".to_string(),
                    author: "Ursula K. Le Guin".to_string(),
                    isbn: None,
                    copies,
                })
                .await
                .unwrap();
            tx.commit().await.unwrap();
            book
        }

        async fn member(&self) -> Member {
            let mut tx = self.repository.begin().await.unwrap();
            let member = tx
                .create_member(&NewMember {
                    name: "Genly Ai".to_string(),
                    email: None,
                    phone: None,
                })
                .await
                .unwrap();
            tx.commit().await.unwrap();
            member
        }

        async fn copies(&self, book_id: i32) -> i32 {
            let mut tx = self.repository.begin().await.unwrap();
            tx.get_book(book_id).await.unwrap().copies
        }
    }

    #[tokio::test]
    async fn test_lend_and_return_scenario() {
        let f = Fixture::new();
        let book = f.book(2).await;
        let member = f.member().await;

        let loan = assert_ok!(f.loans.lend(book.id, member.id).await);
        assert_eq!(loan.book_id, book.id);
        assert_eq!(loan.member_id, member.id);
        assert_eq!(loan.return_date, None);
        assert_eq!(loan.loan_date, LoansService::today());
        assert_eq!(f.copies(book.id).await, 1);

        let returned = assert_ok!(f.loans.return_loan(loan.id).await);
        assert_eq!(returned.id, loan.id);
        assert_eq!(returned.return_date, Some(LoansService::today()));
        assert!(!returned.is_active());
        assert_eq!(f.copies(book.id).await, 2);
    }

    #[tokio::test]
    async fn test_second_return_fails() {
        let f = Fixture::new();
        let book = f.book(1).await;
        let member = f.member().await;

        let loan = f.loans.lend(book.id, member.id).await.unwrap();
        assert_ok!(f.loans.return_loan(loan.id).await);

        let err = assert_err!(f.loans.return_loan(loan.id).await);
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(f.copies(book.id).await, 1);
    }

    #[tokio::test]
    async fn test_return_unknown_loan() {
        let f = Fixture::new();
        let err = assert_err!(f.loans.return_loan(12).await);
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_lend_unknown_book_changes_nothing() {
        let f = Fixture::new();
        let book = f.book(1).await;
        let member = f.member().await;

        let err = assert_err!(f.loans.lend(999_999, member.id).await);
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(f.loans.list_loans().await.unwrap().is_empty());
        assert_eq!(f.copies(book.id).await, 1);
    }

    #[tokio::test]
    async fn test_lend_unknown_member_changes_nothing() {
        let f = Fixture::new();
        let book = f.book(1).await;

        let err = assert_err!(f.loans.lend(book.id, 404).await);
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(f.loans.list_loans().await.unwrap().is_empty());
        assert_eq!(f.copies(book.id).await, 1);
    }

    #[tokio::test]
    async fn test_no_copies_checked_before_member() {
        let f = Fixture::new();
        let book = f.book(0).await;

        let err = assert_err!(f.loans.lend(book.id, 404).await);
        assert!(matches!(err, AppError::NoCopiesAvailable(id) if id == book.id));
    }

    #[tokio::test]
    async fn test_lend_until_shelf_is_empty() {
        let f = Fixture::new();
        let book = f.book(2).await;
        let member = f.member().await;

        assert_ok!(f.loans.lend(book.id, member.id).await);
        assert_ok!(f.loans.lend(book.id, member.id).await);
        let err = assert_err!(f.loans.lend(book.id, member.id).await);
        assert!(matches!(err, AppError::NoCopiesAvailable(_)));
        assert_eq!(f.copies(book.id).await, 0);
        assert_eq!(f.loans.list_loans().await.unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_lend_of_last_copy() {
        let f = Fixture::new();
        let book = f.book(1).await;
        let member = f.member().await;
        let (book_id, member_id) = (book.id, member.id);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let loans = f.loans.clone();
                tokio::spawn(async move { loans.lend(book_id, member_id).await })
            })
            .collect();

        let mut lent = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => lent += 1,
                Err(AppError::NoCopiesAvailable(_)) => {}
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(lent, 1);
        assert_eq!(f.copies(book.id).await, 0);
        assert_eq!(f.loans.list_loans().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_copies_never_negative() {
        let f = Fixture::new();
        let book = f.book(3).await;
        let member = f.member().await;
        let mut open = Vec::new();

        // Lend greedily, return every third step
        for step in 0..30 {
            if step % 3 == 2 {
                if let Some(id) = open.pop() {
                    f.loans.return_loan(id).await.unwrap();
                }
            } else if let Ok(loan) = f.loans.lend(book.id, member.id).await {
                open.push(loan.id);
            }
            let copies = f.copies(book.id).await;
            assert!(copies >= 0);
            assert_eq!(copies as usize + open.len(), 3);
        }
    }

    #[tokio::test]
    async fn test_list_shows_current_title() {
        let f = Fixture::new();
        let book = f.book(1).await;
        let member = f.member().await;
        let loan = f.loans.lend(book.id, member.id).await.unwrap();

        let mut tx = f.repository.begin().await.unwrap();
        tx.update_book(
            book.id,
            &BookChanges {
                title: Some("The Dispossessed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let loans = f.loans.list_loans().await.unwrap();
        assert_eq!(loans.len(), 1);
        assert_eq!(loans[0].id, loan.id);
        assert_eq!(loans[0].book_title.as_deref(), Some("The Dispossessed"));
        assert_eq!(loans[0].member_name.as_deref(), Some("Genly Ai"));
    }

    #[tokio::test]
    async fn test_return_with_overflowing_copies_rolls_back() {
        let f = Fixture::new();
        let book = f.book(1).await;
        let member = f.member().await;
        let loan = f.loans.lend(book.id, member.id).await.unwrap();

        let mut tx = f.repository.begin().await.unwrap();
        tx.update_book(
            book.id,
            &BookChanges {
                copies: Some(i32::MAX),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert_err!(f.loans.return_loan(loan.id).await);
        assert_eq!(f.copies(book.id).await, i32::MAX);
        let loans = f.loans.list_loans().await.unwrap();
        assert_eq!(loans[0].return_date, None);
    }

    #[tokio::test]
    async fn test_return_after_book_deleted() {
        let f = Fixture::new();
        let book = f.book(1).await;
        let member = f.member().await;
        let loan = f.loans.lend(book.id, member.id).await.unwrap();

        let mut tx = f.repository.begin().await.unwrap();
        tx.delete_book(book.id).await.unwrap();
        tx.commit().await.unwrap();

        let returned = assert_ok!(f.loans.return_loan(loan.id).await);
        assert!(returned.return_date.is_some());

        let loans = f.loans.list_loans().await.unwrap();
        assert_eq!(loans[0].book_title, None);
    }
}
