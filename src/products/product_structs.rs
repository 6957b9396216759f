// src/products/product_structs.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::categories::category_structs::Category;

/// Request body for POST/PUT /products.
/// `price` is in the smallest currency unit.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[validate(range(min = 0, message = "price must not be negative"))]
    pub price: i64,
    #[validate(range(min = 0, message = "stock must not be negative"))]
    pub stock: i32,
    #[serde(default)]
    pub category_id: Option<i32>,
}

/// A product as exposed by the API.
///
/// `category` is only filled by the `*_with_category` reads, and stays `None`
/// when the product has no category or the reference did not join.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub price: i64,
    pub stock: i32,
    pub category_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

impl Product {
    pub fn from_new(id: i32, new: NewProduct) -> Self {
        Product {
            id,
            name: new.name,
            price: new.price,
            stock: new.stock,
            category_id: new.category_id,
            category: None,
        }
    }
}
