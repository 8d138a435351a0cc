//! Shared types and models for the Warehouse Revision Management Platform
//!
//! This crate contains types shared across the backend: domain enums and
//! models, common request/response types, validation rules, and the
//! Latin-to-Cyrillic transliteration used for product search.

pub mod models;
pub mod translit;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
