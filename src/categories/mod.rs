// src/categories/mod.rs

pub mod category_router;
pub mod category_structs;
