//! Purchase counts and star-rating distributions per product
//!
//! Pure group-and-count over the review table. A product with no reviews
//! aggregates to zeros.

use crate::catalog::{Catalog, Product, Review};
use crate::error::Result;
use serde::Serialize;
use std::collections::BTreeMap;

pub fn purchase_count(catalog: &Catalog, product_id: &str) -> usize {
    catalog.reviews_for_product(product_id).count()
}

/// Review count per star value. Every key in 1..=5 is present.
pub fn rating_distribution(catalog: &Catalog, product_id: &str) -> BTreeMap<u8, usize> {
    let mut distribution: BTreeMap<u8, usize> =
        (Review::MIN_STARS..=Review::MAX_STARS).map(|s| (s, 0)).collect();
    for review in catalog.reviews_for_product(product_id) {
        *distribution.entry(review.stars).or_insert(0) += 1;
    }
    distribution
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductSummary {
    pub product: Product,
    pub purchase_count: usize,
    pub rating_distribution: BTreeMap<u8, usize>,
}

/// Product plus its aggregates; fails only if the product is unknown.
pub fn summarize(catalog: &Catalog, product_id: &str) -> Result<ProductSummary> {
    let product = catalog.product(product_id)?.clone();
    Ok(ProductSummary {
        purchase_count: purchase_count(catalog, product_id),
        rating_distribution: rating_distribution(catalog, product_id),
        product,
    })
}
