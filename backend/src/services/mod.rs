//! Business logic services for the Warehouse Revision Management Platform

pub mod auth;
pub mod count;
pub mod ledger;
pub mod product;
pub mod reconciliation;
pub mod result;
pub mod revision;
pub mod warehouse;

pub use auth::AuthService;
pub use count::CountService;
pub use ledger::LedgerService;
pub use product::ProductService;
pub use result::ResultService;
pub use revision::RevisionService;
pub use warehouse::WarehouseService;
