// src/products/mod.rs

pub mod product_router;
pub mod product_structs;
