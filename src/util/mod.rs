// src/util/mod.rs
pub mod hash;
pub mod password;
pub mod rand;
pub mod testing;
