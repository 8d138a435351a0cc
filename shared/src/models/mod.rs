//! Domain models for the Warehouse Revision Management Platform

pub mod ledger;
pub mod product;
pub mod result;
pub mod revision;
pub mod user;
pub mod warehouse;

pub use ledger::*;
pub use product::*;
pub use result::*;
pub use revision::*;
pub use user::*;
pub use warehouse::*;
