//! Recommendation Module
//!
//! Similar-product recommendations over a precomputed similarity matrix.
//!
//! ## Architecture
//!
//! 1. **Engine** - top-N nearest neighbours of a product, and merged
//!    suggestions for a customer's purchase history
//! 2. **History** - purchases per customer, reviews per product
//! 3. **Ratings** - purchase counts and star distributions per product
//!
//! ## Ranking
//!
//! A product's matrix row is sorted by score, highest first. Equal scores
//! rank the product with the lower table index first. The query product is
//! never part of its own results.

pub mod engine;
pub mod history;
pub mod metrics;
pub mod ratings;

pub use engine::{Recommender, ScoredProduct};
pub use history::{product_reviews, purchased_products, ReviewView};
pub use ratings::{purchase_count, rating_distribution, ProductSummary};
