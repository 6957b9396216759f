// src/categories/category_structs.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Request body for POST/PUT /categories
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewCategory {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// A category row
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub description: String,
}

impl Category {
    pub fn from_new(id: i32, new: NewCategory) -> Self {
        Category {
            id,
            name: new.name,
            description: new.description,
        }
    }
}
