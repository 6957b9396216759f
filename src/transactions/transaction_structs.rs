// src/transactions/transaction_structs.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// One line of a checkout request. Never persisted as-is.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CheckoutItem {
    #[validate(range(min = 1, message = "product_id must be positive"))]
    pub product_id: i32,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: i32,
}

/// Body of POST /checkout
#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, message = "items must not be empty"), nested)]
    pub items: Vec<CheckoutItem>,
}

/// A sold line. Name and subtotal are captured at sale time.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct TransactionDetail {
    pub id: i32,
    pub transaction_id: i32,
    pub product_id: i32,
    pub product_name: String,
    pub quantity: i32,
    pub subtotal: i64,
}

/// A persisted sale. `total_amount` always equals the sum of the detail subtotals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: i32,
    pub total_amount: i64,
    pub created_at: DateTime<Utc>,
    pub details: Vec<TransactionDetail>,
}

/// Revenue and number of transactions for the current day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DailyTotals {
    pub total_revenue: i64,
    pub total_transaction_count: i64,
}

/// Best selling product of the day. Empty name and zero quantity when nothing sold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BestSeller {
    #[serde(rename = "nama")]
    pub name: String,
    #[serde(rename = "qty_terjual")]
    pub quantity: i64,
}

/// Body of GET /summary/today
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryToday {
    pub total_revenue: i64,
    #[serde(rename = "total_transaksi")]
    pub total_transaction_count: i64,
    #[serde(rename = "produk_terlaris")]
    pub best_seller: BestSeller,
}

/// Line computed inside the checkout unit of work, before the detail rows get ids.
#[derive(Debug, Clone)]
pub(crate) struct PendingDetail {
    pub product_id: i32,
    pub product_name: String,
    pub quantity: i32,
    pub subtotal: i64,
}

/// Price/stock snapshot of a product as seen by the checkout unit of work.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct ProductSnapshot {
    pub id: i32,
    pub name: String,
    pub price: i64,
    pub stock: i32,
}

impl PendingDetail {
    /// Prices one checkout line against the product snapshot.
    /// `already_reserved` is the quantity taken by earlier lines for the same product.
    pub fn price_line(
        product: &ProductSnapshot,
        quantity: i32,
        already_reserved: i32,
    ) -> Result<Self, crate::error::StoreError> {
        let available = product.stock - already_reserved;
        if quantity > available {
            return Err(crate::error::StoreError::InsufficientStock {
                product_id: product.id,
                name: product.name.clone(),
                available,
                requested: quantity,
            });
        }

        let subtotal = i64::from(quantity).checked_mul(product.price).ok_or(
            crate::error::StoreError::AmountOverflow {
                product_id: product.id,
            },
        )?;

        Ok(PendingDetail {
            product_id: product.id,
            product_name: product.name.clone(),
            quantity,
            subtotal,
        })
    }

    /// Adds this line's subtotal to a running sale total.
    pub fn add_to(&self, total: i64) -> Result<i64, crate::error::StoreError> {
        total
            .checked_add(self.subtotal)
            .ok_or(crate::error::StoreError::AmountOverflow {
                product_id: self.product_id,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    fn mie_goreng() -> ProductSnapshot {
        ProductSnapshot {
            id: 1,
            name: "Mie Goreng Super".into(),
            price: 22000,
            stock: 50,
        }
    }

    #[test]
    fn line_subtotal_is_quantity_times_price() {
        let line = PendingDetail::price_line(&mie_goreng(), 2, 0).unwrap();
        assert_eq!(line.subtotal, 44000);
        assert_eq!(line.product_name, "Mie Goreng Super");
    }

    #[test]
    fn oversized_amounts_are_rejected() {
        let pricey = ProductSnapshot {
            id: 7,
            name: "Emas Batangan".into(),
            price: (1_i64 << 62) + 1,
            stock: 10,
        };
        let err = PendingDetail::price_line(&pricey, 4, 0).unwrap_err();
        assert!(matches!(err, StoreError::AmountOverflow { product_id: 7 }));

        let line = PendingDetail::price_line(&pricey, 1, 0).unwrap();
        assert_eq!(line.add_to(0).unwrap(), (1_i64 << 62) + 1);
        assert!(matches!(
            line.add_to(i64::MAX - 1),
            Err(StoreError::AmountOverflow { product_id: 7 })
        ));
    }

    #[test]
    fn earlier_lines_count_against_stock() {
        let err = PendingDetail::price_line(&mie_goreng(), 11, 40).unwrap_err();
        match err {
            StoreError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 10);
                assert_eq!(requested, 11);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_checkout_is_invalid() {
        let req: CheckoutRequest = serde_json::from_str(r#"{"items": []}"#).unwrap();
        assert!(req.validate().is_err());

        let req: CheckoutRequest =
            serde_json::from_str(r#"{"items": [{"product_id": 1, "quantity": 0}]}"#).unwrap();
        assert!(req.validate().is_err());

        let req: CheckoutRequest =
            serde_json::from_str(r#"{"items": [{"product_id": 1, "quantity": 2}]}"#).unwrap();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn summary_uses_reporting_field_names() {
        let summary = SummaryToday {
            total_revenue: 44000,
            total_transaction_count: 1,
            best_seller: BestSeller {
                name: "Mie Goreng Super".into(),
                quantity: 2,
            },
        };

        assert_eq!(
            serde_json::to_value(&summary).unwrap(),
            serde_json::json!({
                "total_revenue": 44000,
                "total_transaksi": 1,
                "produk_terlaris": { "nama": "Mie Goreng Super", "qty_terjual": 2 }
            })
        );
    }
}
