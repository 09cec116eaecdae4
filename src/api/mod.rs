//! API handlers for Libris REST endpoints

pub mod books;
pub mod health;
pub mod loans;
pub mod members;
pub mod openapi;

use std::time::Duration;

use axum::{
    extract::{FromRequest, FromRequestParts},
    routing::{get, put},
    Router,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::ToSchema;

use crate::{error::AppError, AppState};

/// JSON body extractor whose rejections answer `400 {"error": ...}`
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// Path parameter extractor; unparsable ids answer `400 {"error": ...}`
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct PathParam<T>(pub T);

/// Body returned by delete endpoints
#[derive(Serialize, ToSchema)]
pub struct DeleteResponse {
    pub success: bool,
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    // The browser UI may be served from another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Books
        .route("/books", get(books::list_books).post(books::create_book))
        .route(
            "/books/:id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        // Members
        .route("/members", get(members::list_members).post(members::create_member))
        .route(
            "/members/:id",
            get(members::get_member)
                .put(members::update_member)
                .delete(members::delete_member),
        )
        // Loans
        .route("/loans", get(loans::list_loans).post(loans::create_loan))
        .route("/loans/:id/return", put(loans::return_loan))
        .with_state(state.clone());

    let mut app = Router::new()
        .nest("/api", api)
        .merge(openapi::create_openapi_router());

    if let Some(ref dir) = state.config.server.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(TimeoutLayer::new(Duration::from_secs(
        state.config.server.request_timeout_secs,
    )))
    .layer(CompressionLayer::new())
    .layer(TraceLayer::new_for_http())
    .layer(cors)
}
