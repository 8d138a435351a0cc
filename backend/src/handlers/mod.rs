//! HTTP handlers for the Warehouse Revision Management Platform

pub mod auth;
pub mod count;
pub mod health;
pub mod ledger;
pub mod product;
pub mod result;
pub mod revision;
pub mod warehouse;

pub use auth::*;
pub use count::*;
pub use health::*;
pub use ledger::*;
pub use product::*;
pub use result::*;
pub use revision::*;
pub use warehouse::*;
