// src/error.rs

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::shared::shared_structs::GenericResponse;

/// Errors raised by the store layer (Postgres or in-memory).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Point lookup, update or delete hit no row.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i32 },

    /// A checkout line references a product that does not exist.
    #[error("product id {0} not found")]
    ProductNotFound(i32),

    /// A checkout line would drive the product stock below zero.
    #[error("insufficient stock for product {name} (id {product_id}): available {available}, requested {requested}")]
    InsufficientStock {
        product_id: i32,
        name: String,
        available: i32,
        requested: i32,
    },

    /// A line subtotal or the sale total does not fit in an `i64`.
    #[error("amount overflow while pricing product id {product_id}")]
    AmountOverflow { product_id: i32 },

    /// Foreign key violation: missing category reference, or a row that is still referenced.
    #[error("{0}")]
    Constraint(String),

    /// The caller's read deadline elapsed before the store answered.
    #[error("store operation timed out")]
    Timeout,

    #[error("in-memory store lock poisoned")]
    Poisoned,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: i32) -> Self {
        StoreError::NotFound { entity, id }
    }
}

/// Errors surfaced by the HTTP layer.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or invalid request body / path.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Any failure of the checkout unit of work. Always reported as 500.
    #[error("checkout failed: {0}")]
    Checkout(StoreError),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(format!("invalid request: {errors}"))
    }
}

impl AppError {
    /// Message sent to the client. Database errors are logged, not echoed.
    fn public_message(&self) -> String {
        match self {
            AppError::Store(StoreError::Database(_)) | AppError::Store(StoreError::Poisoned) => {
                "internal store error".to_string()
            }
            AppError::Checkout(StoreError::Database(_))
            | AppError::Checkout(StoreError::Poisoned) => {
                "checkout failed: internal store error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Store(StoreError::NotFound { .. })
            | AppError::Store(StoreError::ProductNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::Constraint(_)) => StatusCode::CONFLICT,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Checkout(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }

        HttpResponse::build(status).json(GenericResponse::<()>::error(self.public_message()))
    }
}
