// src/infrastructure/repositories/mod.rs
pub mod memory;
pub mod sqlite;
