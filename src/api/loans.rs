//! Loan management endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use super::{JsonBody, PathParam};
use crate::{
    error::{AppError, AppResult},
    models::loan::{CreateLoan, Loan, LoanDetails},
    AppState,
};

/// List all loans with current book titles and member names
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    responses(
        (status = 200, description = "All loans in creation order", body = Vec<LoanDetails>)
    )
)]
pub async fn list_loans(State(state): State<AppState>) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.loans.list_loans().await?;
    Ok(Json(loans))
}

/// Lend a book to a member
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Loan created", body = Loan),
        (status = 400, description = "Missing ids or no copies available", body = crate::error::ErrorResponse),
        (status = 404, description = "Book or member not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_loan(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateLoan>,
) -> AppResult<(StatusCode, Json<Loan>)> {
    let (Some(book_id), Some(member_id)) = (request.book_id, request.member_id) else {
        return Err(AppError::Validation("Missing book_id or member_id".to_string()));
    };

    let loan = state.services.loans.lend(book_id, member_id).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Return a lent book
#[utoipa::path(
    put,
    path = "/loans/{id}/return",
    tag = "loans",
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Book returned", body = Loan),
        (status = 404, description = "Active loan not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_loan(
    State(state): State<AppState>,
    PathParam(loan_id): PathParam<i32>,
) -> AppResult<Json<Loan>> {
    let loan = state.services.loans.return_loan(loan_id).await?;
    Ok(Json(loan))
}
