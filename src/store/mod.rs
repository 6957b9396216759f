// src/store/mod.rs

//! Storage seam of the service.
//!
//! Handlers and the transaction service only see these traits. Two backends
//! implement all of them: [`postgres::PgStore`] and [`memory::MemoryStore`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::categories::category_structs::{Category, NewCategory};
use crate::error::StoreError;
use crate::products::product_structs::{NewProduct, Product};
use crate::transactions::transaction_structs::{BestSeller, CheckoutItem, DailyTotals, Transaction};

pub mod memory;
pub mod postgres;

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// All products ordered by id, without the category object.
    async fn get_all(&self) -> StoreResult<Vec<Product>>;
    /// All products ordered by id, with the category left-joined.
    async fn get_all_with_category(&self) -> StoreResult<Vec<Product>>;
    async fn get_by_id(&self, id: i32) -> StoreResult<Product>;
    async fn get_by_id_with_category(&self, id: i32) -> StoreResult<Product>;
    async fn create(&self, product: NewProduct) -> StoreResult<Product>;
    async fn update(&self, id: i32, product: NewProduct) -> StoreResult<Product>;
    async fn delete(&self, id: i32) -> StoreResult<()>;
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn get_all(&self) -> StoreResult<Vec<Category>>;
    async fn get_by_id(&self, id: i32) -> StoreResult<Category>;
    async fn create(&self, category: NewCategory) -> StoreResult<Category>;
    async fn update(&self, id: i32, category: NewCategory) -> StoreResult<Category>;
    async fn delete(&self, id: i32) -> StoreResult<()>;
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Runs the whole checkout as one unit of work: price lookup, stock
    /// decrement, header insert and detail insert. Nothing persists on error.
    async fn create_transaction(&self, items: &[CheckoutItem]) -> StoreResult<Transaction>;
    async fn get_by_id(&self, id: i32) -> StoreResult<Transaction>;
    /// Revenue and count for `[start_of_today, start_of_tomorrow)`. Zeros when empty.
    async fn get_summary_today(&self) -> StoreResult<DailyTotals>;
    /// Top product of today by quantity, ties broken by name ascending.
    async fn get_best_seller_today(&self) -> StoreResult<BestSeller>;
}

/// The three store handles shared through `AppState`.
#[derive(Clone)]
pub struct Stores {
    pub products: Arc<dyn ProductStore>,
    pub categories: Arc<dyn CategoryStore>,
    pub transactions: Arc<dyn TransactionStore>,
}

impl Stores {
    /// Wires every trait to the same backend instance.
    pub fn from_backend<S>(backend: S) -> Self
    where
        S: ProductStore + CategoryStore + TransactionStore + 'static,
    {
        let backend = Arc::new(backend);
        Stores {
            products: backend.clone(),
            categories: backend.clone(),
            transactions: backend,
        }
    }
}

/// Runs a store read under a deadline. The query future is dropped (and so
/// aborted) when the deadline elapses.
pub async fn with_deadline<T, F>(deadline: Duration, fut: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match actix_web::rt::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(deadline_ms = deadline.as_millis() as u64, "store read timed out");
            Err(StoreError::Timeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn deadline_turns_slow_reads_into_timeouts() {
        let slow = async {
            actix_web::rt::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, StoreError>(1)
        };
        let result = with_deadline(Duration::from_millis(10), slow).await;
        assert!(matches!(result, Err(StoreError::Timeout)));

        let fast = async { Ok::<_, StoreError>(7) };
        assert_eq!(with_deadline(Duration::from_secs(1), fast).await.unwrap(), 7);
    }
}
