// src/transactions/transaction_router.rs

use actix_web::{get, post, web, HttpResponse};

use super::transaction_structs::CheckoutRequest;
use crate::error::AppError;
use crate::AppState;

/// Records a sale.
///
/// The body is `{ "items": [{ "product_id": .., "quantity": .. }] }`. Prices and
/// stock are read inside the same database transaction that decrements stock and
/// inserts the header and its lines, so either the whole sale is stored or none of it.
#[post("/checkout")]
pub async fn checkout(
    data: web::Data<AppState>,
    body: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, AppError> {
    let transaction = data.transactions.checkout(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(transaction))
}

#[get("/transactions/{id}")]
pub async fn get_transaction(
    data: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let transaction = data
        .transactions
        .find(path.into_inner(), data.read_timeout)
        .await?;
    Ok(HttpResponse::Ok().json(transaction))
}

/// Revenue, number of transactions and best seller for the current day.
#[get("/summary/today")]
pub async fn summary_today(data: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let summary = data.transactions.summary_today(data.read_timeout).await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};

    use crate::store::memory::MemoryStore;
    use crate::{configure_app, AppState};

    #[actix_web::test]
    async fn checkout_scenario_and_follow_up_reads() {
        let state = AppState::for_backend(MemoryStore::with_demo_data());
        let app = test::init_service(App::new().configure(configure_app(state))).await;

        let req = test::TestRequest::post()
            .uri("/checkout")
            .set_json(json!({ "items": [{ "product_id": 1, "quantity": 2 }] }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let tx: Value = test::read_body_json(resp).await;
        assert_eq!(tx["total_amount"], 44000);
        assert_eq!(tx["details"].as_array().unwrap().len(), 1);
        assert_eq!(tx["details"][0]["subtotal"], 44000);
        assert_eq!(tx["details"][0]["product_name"], "Mie Goreng Super");

        let req = test::TestRequest::get().uri("/products/1").to_request();
        let product: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(product["stock"], 48);

        let uri = format!("/transactions/{}", tx["id"]);
        let req = test::TestRequest::get().uri(&uri).to_request();
        let stored: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(stored, tx);

        let req = test::TestRequest::get().uri("/summary/today").to_request();
        let summary: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(
            summary,
            json!({
                "total_revenue": 44000,
                "total_transaksi": 1,
                "produk_terlaris": { "nama": "Mie Goreng Super", "qty_terjual": 2 }
            })
        );
    }

    #[actix_web::test]
    async fn empty_day_summary() {
        let state = AppState::for_backend(MemoryStore::with_demo_data());
        let app = test::init_service(App::new().configure(configure_app(state))).await;

        let req = test::TestRequest::get().uri("/summary/today").to_request();
        let summary: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(
            summary,
            json!({
                "total_revenue": 0,
                "total_transaksi": 0,
                "produk_terlaris": { "nama": "", "qty_terjual": 0 }
            })
        );
    }

    #[actix_web::test]
    async fn failed_checkout_is_500_and_changes_nothing() {
        let state = AppState::for_backend(MemoryStore::with_demo_data());
        let app = test::init_service(App::new().configure(configure_app(state))).await;

        let req = test::TestRequest::post()
            .uri("/checkout")
            .set_json(json!({ "items": [
                { "product_id": 1, "quantity": 2 },
                { "product_id": 999, "quantity": 1 }
            ] }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["message"].as_str().unwrap().contains("999"));

        let req = test::TestRequest::post()
            .uri("/checkout")
            .set_json(json!({ "items": [{ "product_id": 3, "quantity": 81 }] }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let req = test::TestRequest::get().uri("/products").to_request();
        let products: Value = test::call_and_read_body_json(&app, req).await;
        let stocks: Vec<i64> = products
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["stock"].as_i64().unwrap())
            .collect();
        assert_eq!(stocks, vec![50, 100, 80]);

        let req = test::TestRequest::get().uri("/summary/today").to_request();
        let summary: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(summary["total_transaksi"], 0);
    }

    #[actix_web::test]
    async fn malformed_checkout_bodies_are_400() {
        let state = AppState::for_backend(MemoryStore::with_demo_data());
        let app = test::init_service(App::new().configure(configure_app(state))).await;

        for body in [
            json!({ "items": [] }),
            json!({ "items": [{ "product_id": 1, "quantity": 0 }] }),
            json!({ "items": [{ "product_id": "one", "quantity": 1 }] }),
            json!({ "products": [] }),
        ] {
            let req = test::TestRequest::post()
                .uri("/checkout")
                .set_json(body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[actix_web::test]
    async fn unknown_transaction_is_404() {
        let state = AppState::for_backend(MemoryStore::new());
        let app = test::init_service(App::new().configure(configure_app(state))).await;

        let req = test::TestRequest::get().uri("/transactions/7").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
