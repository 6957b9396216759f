// src/shared/health_router.rs

use actix_web::{get, HttpResponse};

use super::shared_structs::GenericResponse;

/// Liveness probe. Does not touch the store.
#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(GenericResponse::<()> {
        status: "OK".to_string(),
        message: "API Running".to_string(),
        body: None,
    })
}
