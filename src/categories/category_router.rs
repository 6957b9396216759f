// src/categories/category_router.rs

use actix_web::{delete, get, post, put, web, HttpResponse};
use validator::Validate;

use super::category_structs::NewCategory;
use crate::error::AppError;
use crate::shared::shared_structs::GenericResponse;
use crate::store::with_deadline;
use crate::AppState;

/// Creates a category and echoes it back with its new id.
#[post("/categories")]
pub async fn create_category(
    data: web::Data<AppState>,
    item: web::Json<NewCategory>,
) -> Result<HttpResponse, AppError> {
    let item = item.into_inner();
    item.validate()?;

    let category = data.stores.categories.create(item).await?;
    tracing::info!(category_id = category.id, "category created");

    Ok(HttpResponse::Created().json(category))
}

#[get("/categories")]
pub async fn list_categories(data: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let categories = with_deadline(data.read_timeout, data.stores.categories.get_all()).await?;
    Ok(HttpResponse::Ok().json(categories))
}

#[get("/categories/{id}")]
pub async fn get_category(
    data: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let category = with_deadline(data.read_timeout, data.stores.categories.get_by_id(id)).await?;
    Ok(HttpResponse::Ok().json(category))
}

#[put("/categories/{id}")]
pub async fn update_category(
    data: web::Data<AppState>,
    path: web::Path<i32>,
    item: web::Json<NewCategory>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let item = item.into_inner();
    item.validate()?;

    let category = data.stores.categories.update(id, item).await?;
    Ok(HttpResponse::Ok().json(category))
}

/// Deletes a category. Refused with 409 while products still point at it.
#[delete("/categories/{id}")]
pub async fn delete_category(
    data: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    data.stores.categories.delete(id).await?;
    tracing::info!(category_id = id, "category deleted");

    Ok(HttpResponse::Ok().json(GenericResponse::<()>::success(format!(
        "category with id {id} deleted"
    ))))
}
