//! HTTP middleware for the Warehouse Revision Management Platform

mod auth;

pub use auth::{auth_middleware, AuthUser, CurrentUser};
