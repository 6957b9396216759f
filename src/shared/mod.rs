// src/shared/mod.rs

pub mod health_router;
pub mod shared_structs;
