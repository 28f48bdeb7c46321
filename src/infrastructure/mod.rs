// src/infrastructure/mod.rs
pub mod atom;
pub mod di;
pub mod json;
pub mod netscape;
pub mod opml;
pub mod repositories;
pub mod web;
