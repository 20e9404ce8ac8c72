//! Zafaran Client - Storefront client library.
//!
//! This crate is the client side of the Zafaran saffron storefront: a typed
//! wrapper over the REST backend plus the state stores a frontend needs:
//!
//! - [`api`] - HTTP client wrapper and response envelopes
//! - [`session`] - Auth session store with durable persistence
//! - [`cart`] - Cart state manager with optimistic updates and rollback
//! - [`catalog`] - Product catalog with client-side filtering and paging
//! - [`content`] - Home, inspiration, and careers content
//! - [`orders`] - Checkout and order confirmation
//!
//! # Architecture
//!
//! Stores ([`session::SessionStore`], [`cart::CartStore`]) are cheaply
//! cloneable handles over shared state. State mutation happens synchronously
//! under internal locks that are never held across await points; consumers
//! observe snapshots through `tokio::sync::watch` channels instead of
//! mutating state directly.
//!
//! # Usage
//!
//! ```no_run
//! use zafaran_client::{ClientConfig, api::ApiClient};
//! use zafaran_client::session::SessionStore;
//! use zafaran_client::cart::CartStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env()?;
//! let api = ApiClient::new(&config);
//! let session = SessionStore::with_data_dir(api.clone(), &config.data_dir);
//! let cart = CartStore::new(api);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod content;
pub mod orders;
pub mod session;

pub use config::{ClientConfig, ConfigError};
