//! Similarity Recommender
//!
//! Top-N retrieval over the precomputed similarity matrix: resolve the
//! product's row, rank every other product by score, keep the best N.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::history::purchase_sequence;
use super::metrics::PerformanceTimer;
use crate::catalog::{Catalog, Product};
use crate::error::{Error, Result};

/// A recommended product with its similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredProduct {
    pub product: Product,
    pub score: f32,
    /// 1-based position in the result list
    pub rank: usize,
}

/// Descending score, then ascending table index.
fn by_score_then_index(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

/// Rank a matrix row, excluding `query`, and keep the `top_n` best
/// `(index, score)` pairs.
pub fn rank_row(row: &[f32], query: usize, top_n: usize) -> Vec<(usize, f32)> {
    rank_row_excluding(row, top_n, |j| j == query)
}

/// Like [`rank_row`], skipping every column for which `excluded` holds.
pub fn rank_row_excluding(
    row: &[f32],
    top_n: usize,
    excluded: impl Fn(usize) -> bool,
) -> Vec<(usize, f32)> {
    let mut pairs: Vec<(usize, f32)> = row
        .iter()
        .copied()
        .enumerate()
        .filter(|&(j, _)| !excluded(j))
        .collect();

    if top_n < pairs.len() {
        pairs.select_nth_unstable_by(top_n, by_score_then_index);
        pairs.truncate(top_n);
    }
    pairs.sort_unstable_by(by_score_then_index);
    pairs
}

/// Main recommendation engine
#[derive(Clone)]
pub struct Recommender {
    catalog: Arc<Catalog>,
    slow_query_threshold: Duration,
}

impl Recommender {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            slow_query_threshold: Duration::from_millis(50),
        }
    }

    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = threshold;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Products most similar to `product_id`, best first.
    ///
    /// Returns at most `top_n` items and never the query product itself.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if no product has this id
    /// - [`Error::IndexOutOfRange`] if the product table and the matrix are
    ///   out of sync for this product
    pub fn recommend(&self, product_id: &str, top_n: usize) -> Result<Vec<ScoredProduct>> {
        let _timer = PerformanceTimer::with_threshold("recommend", self.slow_query_threshold);

        let catalog = &self.catalog;
        let position = catalog
            .product_position(product_id)
            .ok_or_else(|| Error::not_found("product", product_id))?;

        let matrix = catalog.matrix();
        let row = matrix.row(position).ok_or(Error::IndexOutOfRange {
            index: position,
            bound: matrix.dim(),
        })?;

        // Rows sharing the query's id are the same product.
        let ranked = rank_row_excluding(row, top_n, |j| {
            j == position || catalog.product_at(j).is_some_and(|p| p.id == product_id)
        });
        let mut results = Vec::with_capacity(ranked.len());
        for (rank, (index, score)) in ranked.into_iter().enumerate() {
            let product = catalog.product_at(index).ok_or(Error::IndexOutOfRange {
                index,
                bound: catalog.products().len(),
            })?;
            results.push(ScoredProduct {
                product: product.clone(),
                score,
                rank: rank + 1,
            });
        }

        debug!(
            "Recommended {} products for {} (requested {})",
            results.len(),
            product_id,
            top_n
        );
        Ok(results)
    }

    /// Suggestions for a customer built from their purchase history.
    ///
    /// Each purchased product contributes up to `per_product` similar
    /// products whose average rating is at least `min_rating`; unrated
    /// products are skipped. The merged list keeps the first occurrence of
    /// each product, follows purchase order, and never contains anything the
    /// customer already bought. Customers without purchases get an empty list.
    pub fn recommend_for_customer(
        &self,
        customer_id: &str,
        per_product: usize,
        min_rating: f32,
    ) -> Vec<ScoredProduct> {
        let _timer =
            PerformanceTimer::with_threshold("recommend_for_customer", self.slow_query_threshold);

        let purchased = purchase_sequence(&self.catalog, customer_id);
        if purchased.is_empty() {
            debug!("Customer {} has no purchases", customer_id);
            return Vec::new();
        }

        // Ordered collect keeps the merge deterministic.
        let per_purchase: Vec<Vec<ScoredProduct>> = purchased
            .par_iter()
            .map(|product_id| match self.recommend(product_id, per_product) {
                Ok(items) => items,
                Err(e) => {
                    warn!(
                        "Skipping purchased product {} for customer {}: {}",
                        product_id, customer_id, e
                    );
                    Vec::new()
                }
            })
            .collect();

        let owned: HashSet<&str> = purchased.iter().map(String::as_str).collect();
        let mut seen: HashSet<String> = HashSet::new();
        let mut merged = Vec::new();

        for item in per_purchase.into_iter().flatten() {
            // Unrated products never pass, whatever the threshold.
            if !item.product.avg_rating.is_some_and(|r| r >= min_rating) {
                continue;
            }
            if owned.contains(item.product.id.as_str()) {
                continue;
            }
            if !seen.insert(item.product.id.clone()) {
                continue;
            }
            merged.push(ScoredProduct {
                rank: merged.len() + 1,
                ..item
            });
        }

        debug!(
            "Merged {} suggestions for customer {} from {} purchases",
            merged.len(),
            customer_id,
            purchased.len()
        );
        merged
    }
}
