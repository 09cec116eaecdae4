//! Data models for Libris

pub mod book;
pub mod loan;
pub mod member;

// Re-export commonly used types
pub use book::{Book, BookChanges, CreateBook, NewBook, UpdateBook};
pub use loan::{CreateLoan, Loan, LoanDetails, LoanStatus};
pub use member::{CreateMember, Member, MemberChanges, NewMember, UpdateMember};
