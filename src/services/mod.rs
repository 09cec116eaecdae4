//! Business logic services

pub mod catalog;
pub mod loans;
pub mod members;

use crate::{
    error::{AppError, AppResult},
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub members: members::MembersService,
    pub loans: loans::LoansService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            members: members::MembersService::new(repository.clone()),
            loans: loans::LoansService::new(repository),
        }
    }
}

/// Trimmed value of a mandatory text field
pub(crate) fn required_text(value: Option<String>, field: &str) -> AppResult<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::Validation(format!("{} is required", field)))
}

/// Trimmed value of an optional text field; blank becomes `None`
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
