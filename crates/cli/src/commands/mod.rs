//! CLI command implementations.

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod content;
pub mod products;
