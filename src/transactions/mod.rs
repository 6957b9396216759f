// src/transactions/mod.rs

pub mod transaction_router;
pub mod transaction_service;
pub mod transaction_structs;
