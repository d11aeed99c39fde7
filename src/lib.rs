//! ProdRec library crate
//!
//! Similar-product recommendations over a precomputed similarity matrix,
//! with purchase history, rating aggregates and a mock login flow.

pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod recommendation;
pub mod session;

// Re-export commonly used types
pub use auth::{Authenticator, StaticCredentials};
pub use catalog::{Catalog, Customer, Product, Review, SimilarityMatrix};
pub use config::Config;
pub use error::{Error, Result};
pub use recommendation::*;
pub use session::{Session, SessionStore};
