// src/transactions/transaction_service.rs

use std::sync::Arc;
use std::time::Duration;

use validator::Validate;

use super::transaction_structs::{BestSeller, CheckoutRequest, SummaryToday, Transaction};
use crate::error::{AppError, StoreError};
use crate::store::{with_deadline, TransactionStore};

/// Checkout orchestration and the daily summary, on top of a [`TransactionStore`].
#[derive(Clone)]
pub struct TransactionService {
    store: Arc<dyn TransactionStore>,
}

impl TransactionService {
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        TransactionService { store }
    }

    /// Validates the request and hands the lines to the store's unit of work.
    pub async fn checkout(&self, request: CheckoutRequest) -> Result<Transaction, AppError> {
        request.validate()?;

        let transaction = self
            .store
            .create_transaction(&request.items)
            .await
            .map_err(AppError::Checkout)?;

        tracing::info!(
            transaction_id = transaction.id,
            total_amount = transaction.total_amount,
            lines = transaction.details.len(),
            "checkout completed"
        );
        Ok(transaction)
    }

    pub async fn find(&self, id: i32, deadline: Duration) -> Result<Transaction, StoreError> {
        with_deadline(deadline, self.store.get_by_id(id)).await
    }

    /// Today's revenue, transaction count and best seller.
    ///
    /// Both reads run concurrently under the same deadline. Only the totals are
    /// mandatory: a failing best-seller read degrades to an empty best seller.
    pub async fn summary_today(&self, deadline: Duration) -> Result<SummaryToday, StoreError> {
        let (totals, best_seller) = futures::future::join(
            with_deadline(deadline, self.store.get_summary_today()),
            with_deadline(deadline, self.store.get_best_seller_today()),
        )
        .await;

        let totals = totals?;
        let best_seller = best_seller.unwrap_or_else(|err| {
            tracing::warn!(error = %err, "best seller lookup failed, reporting none");
            BestSeller::default()
        });

        Ok(SummaryToday {
            total_revenue: totals.total_revenue,
            total_transaction_count: totals.total_transaction_count,
            best_seller,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::StoreResult;
    use crate::transactions::transaction_structs::{CheckoutItem, DailyTotals};
    use async_trait::async_trait;

    /// Store whose best-seller read always fails.
    struct FlakyBestSeller;

    #[async_trait]
    impl TransactionStore for FlakyBestSeller {
        async fn create_transaction(&self, _items: &[CheckoutItem]) -> StoreResult<Transaction> {
            Err(StoreError::Poisoned)
        }

        async fn get_by_id(&self, id: i32) -> StoreResult<Transaction> {
            Err(StoreError::not_found("transaction", id))
        }

        async fn get_summary_today(&self) -> StoreResult<DailyTotals> {
            Ok(DailyTotals {
                total_revenue: 44000,
                total_transaction_count: 1,
            })
        }

        async fn get_best_seller_today(&self) -> StoreResult<BestSeller> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }
    }

    /// Store whose totals read never answers in time.
    struct SlowTotals;

    #[async_trait]
    impl TransactionStore for SlowTotals {
        async fn create_transaction(&self, _items: &[CheckoutItem]) -> StoreResult<Transaction> {
            Err(StoreError::Poisoned)
        }

        async fn get_by_id(&self, id: i32) -> StoreResult<Transaction> {
            Err(StoreError::not_found("transaction", id))
        }

        async fn get_summary_today(&self) -> StoreResult<DailyTotals> {
            actix_web::rt::time::sleep(Duration::from_secs(5)).await;
            Ok(DailyTotals::default())
        }

        async fn get_best_seller_today(&self) -> StoreResult<BestSeller> {
            Ok(BestSeller::default())
        }
    }

    fn request(items: &[(i32, i32)]) -> CheckoutRequest {
        CheckoutRequest {
            items: items
                .iter()
                .map(|&(product_id, quantity)| CheckoutItem {
                    product_id,
                    quantity,
                })
                .collect(),
        }
    }

    #[actix_web::test]
    async fn checkout_returns_the_persisted_transaction() {
        let service = TransactionService::new(Arc::new(MemoryStore::with_demo_data()));

        let tx = service.checkout(request(&[(1, 2)])).await.unwrap();
        assert_eq!(tx.total_amount, 44000);
        assert_eq!(tx.details.len(), 1);
        assert_eq!(tx.details[0].subtotal, 44000);

        let found = service.find(tx.id, Duration::from_secs(1)).await.unwrap();
        assert_eq!(found, tx);
    }

    #[actix_web::test]
    async fn invalid_requests_never_reach_the_store() {
        let service = TransactionService::new(Arc::new(FlakyBestSeller));

        let err = service.checkout(request(&[])).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = service.checkout(request(&[(1, -1)])).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[actix_web::test]
    async fn store_failures_surface_as_checkout_errors() {
        let service = TransactionService::new(Arc::new(MemoryStore::with_demo_data()));

        let err = service.checkout(request(&[(999, 1)])).await.unwrap_err();
        assert!(matches!(err, AppError::Checkout(StoreError::ProductNotFound(999))));
    }

    #[actix_web::test]
    async fn best_seller_failure_does_not_fail_the_summary() {
        let service = TransactionService::new(Arc::new(FlakyBestSeller));

        let summary = service.summary_today(Duration::from_secs(1)).await.unwrap();
        assert_eq!(summary.total_revenue, 44000);
        assert_eq!(summary.total_transaction_count, 1);
        assert_eq!(summary.best_seller, BestSeller::default());
    }

    #[actix_web::test]
    async fn totals_deadline_fails_the_summary() {
        let service = TransactionService::new(Arc::new(SlowTotals));

        let err = service
            .summary_today(Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Timeout));
    }
}
