// src/products/product_router.rs

use actix_web::{delete, get, post, put, web, HttpResponse};
use validator::Validate;

use super::product_structs::NewProduct;
use crate::error::AppError;
use crate::shared::shared_structs::GenericResponse;
use crate::store::with_deadline;
use crate::AppState;

/// Lists every product ordered by id, with its category object when it has one.
#[get("/products")]
pub async fn list_products(data: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let products = with_deadline(
        data.read_timeout,
        data.stores.products.get_all_with_category(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(products))
}

#[get("/products/{id}")]
pub async fn get_product(
    data: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let product = with_deadline(
        data.read_timeout,
        data.stores.products.get_by_id_with_category(id),
    )
    .await?;

    Ok(HttpResponse::Ok().json(product))
}

/// Creates a product. The store assigns the id.
#[post("/products")]
pub async fn create_product(
    data: web::Data<AppState>,
    item: web::Json<NewProduct>,
) -> Result<HttpResponse, AppError> {
    let item = item.into_inner();
    item.validate()?;

    let product = data.stores.products.create(item).await?;
    tracing::info!(product_id = product.id, "product created");

    Ok(HttpResponse::Created().json(product))
}

/// Replaces every field of an existing product. 404 when the id does not exist.
#[put("/products/{id}")]
pub async fn update_product(
    data: web::Data<AppState>,
    path: web::Path<i32>,
    item: web::Json<NewProduct>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let item = item.into_inner();
    item.validate()?;

    let product = data.stores.products.update(id, item).await?;
    Ok(HttpResponse::Ok().json(product))
}

#[delete("/products/{id}")]
pub async fn delete_product(
    data: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    data.stores.products.delete(id).await?;
    tracing::info!(product_id = id, "product deleted");

    Ok(HttpResponse::Ok().json(GenericResponse::<()>::success(format!(
        "product with id {id} deleted"
    ))))
}
