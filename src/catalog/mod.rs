//! In-memory product catalog
//!
//! Holds the product, customer and review tables together with the
//! similarity matrix. Everything is loaded once at startup and never mutated,
//! so a `Catalog` is shared between requests behind an `Arc` without locking.
//!
//! ## Ordering invariant
//!
//! Product row *i* is row/column *i* of the similarity matrix. The loader
//! keeps the product table in file order; nothing here may sort or filter it.

pub mod loader;
pub mod matrix;
pub mod models;

pub use matrix::SimilarityMatrix;
pub use models::{Customer, Product, Review};

use crate::config::DataConfig;
use crate::error::{Error, Result};
use loader::{read_table, RowPolicy};
use std::collections::HashMap;
use tracing::{info, instrument, warn};

pub struct Catalog {
    products: Vec<Product>,
    customers: Vec<Customer>,
    reviews: Vec<Review>,
    matrix: SimilarityMatrix,
    product_index: HashMap<String, usize>,
    customer_index: HashMap<String, usize>,
    reviews_by_product: HashMap<String, Vec<usize>>,
    reviews_by_customer: HashMap<String, Vec<usize>>,
}

impl Catalog {
    /// Assemble a catalog from already-loaded parts and build lookup indices.
    ///
    /// Reviews with a star rating outside 1..=5 are dropped. Duplicate product
    /// or customer ids resolve to their first row.
    pub fn new(
        products: Vec<Product>,
        customers: Vec<Customer>,
        reviews: Vec<Review>,
        matrix: SimilarityMatrix,
    ) -> Self {
        let mut product_index = HashMap::with_capacity(products.len());
        for (i, product) in products.iter().enumerate() {
            if product_index.contains_key(&product.id) {
                warn!("Duplicate product id {} at row {}; first row wins", product.id, i);
                continue;
            }
            product_index.insert(product.id.clone(), i);
        }

        let mut customer_index = HashMap::with_capacity(customers.len());
        for (i, customer) in customers.iter().enumerate() {
            customer_index.entry(customer.id.clone()).or_insert(i);
        }

        let total_reviews = reviews.len();
        let reviews: Vec<Review> = reviews.into_iter().filter(Review::has_valid_stars).collect();
        if reviews.len() < total_reviews {
            warn!(
                "Dropped {} reviews with star ratings outside {}..={}",
                total_reviews - reviews.len(),
                Review::MIN_STARS,
                Review::MAX_STARS
            );
        }

        let mut reviews_by_product: HashMap<String, Vec<usize>> = HashMap::new();
        let mut reviews_by_customer: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, review) in reviews.iter().enumerate() {
            reviews_by_product
                .entry(review.product_id.clone())
                .or_default()
                .push(i);
            reviews_by_customer
                .entry(review.customer_id.clone())
                .or_default()
                .push(i);
        }

        if matrix.dim() != products.len() {
            warn!(
                "Similarity matrix is {}x{} but the product table has {} rows; \
                 recommendations for unmatched rows will fail",
                matrix.dim(),
                matrix.dim(),
                products.len()
            );
        }

        Self {
            products,
            customers,
            reviews,
            matrix,
            product_index,
            customer_index,
            reviews_by_product,
            reviews_by_customer,
        }
    }

    /// Load all artifacts named by `config`.
    #[instrument(skip(config))]
    pub fn load(config: &DataConfig) -> Result<Self> {
        let products: Vec<Product> = read_table(&config.products_csv, RowPolicy::Strict)?;
        let customers: Vec<Customer> = read_table(&config.customers_csv, RowPolicy::SkipInvalid)?;
        let reviews: Vec<Review> = read_table(&config.reviews_csv, RowPolicy::SkipInvalid)?;
        let matrix = SimilarityMatrix::load(&config.similarity_matrix)?;

        let catalog = Self::new(products, customers, reviews, matrix);
        info!(
            "Catalog loaded: {} products, {} customers, {} reviews",
            catalog.products.len(),
            catalog.customers.len(),
            catalog.reviews.len()
        );
        Ok(catalog)
    }

    // ========================================================================
    // Products
    // ========================================================================

    /// Products in table (= matrix) order
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Matrix row of the product with this id
    pub fn product_position(&self, product_id: &str) -> Option<usize> {
        self.product_index.get(product_id).copied()
    }

    pub fn product_at(&self, position: usize) -> Option<&Product> {
        self.products.get(position)
    }

    pub fn product(&self, product_id: &str) -> Result<&Product> {
        self.product_position(product_id)
            .and_then(|i| self.products.get(i))
            .ok_or_else(|| Error::not_found("product", product_id))
    }

    pub fn matrix(&self) -> &SimilarityMatrix {
        &self.matrix
    }

    // ========================================================================
    // Customers
    // ========================================================================

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    pub fn customer(&self, customer_id: &str) -> Option<&Customer> {
        self.customer_index
            .get(customer_id)
            .and_then(|&i| self.customers.get(i))
    }

    /// First customer whose display name matches exactly
    pub fn customer_by_name(&self, name: &str) -> Option<&Customer> {
        self.customers.iter().find(|c| c.name == name)
    }

    // ========================================================================
    // Reviews
    // ========================================================================

    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    /// Reviews of one product, in table order
    pub fn reviews_for_product<'a>(
        &'a self,
        product_id: &str,
    ) -> impl Iterator<Item = &'a Review> + 'a {
        self.indexed_reviews(self.reviews_by_product.get(product_id))
    }

    /// Reviews written by one customer, in table order
    pub fn reviews_for_customer<'a>(
        &'a self,
        customer_id: &str,
    ) -> impl Iterator<Item = &'a Review> + 'a {
        self.indexed_reviews(self.reviews_by_customer.get(customer_id))
    }

    fn indexed_reviews<'a>(
        &'a self,
        positions: Option<&'a Vec<usize>>,
    ) -> impl Iterator<Item = &'a Review> + 'a {
        positions
            .into_iter()
            .flatten()
            .filter_map(move |&i| self.reviews.get(i))
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_positions_follow_table_order() {
        let catalog = abc_catalog();
        assert_eq!(catalog.product_position("A"), Some(0));
        assert_eq!(catalog.product_position("C"), Some(2));
        assert_eq!(catalog.product_position("Z"), None);
        assert_eq!(catalog.product_at(1).map(|p| p.id.as_str()), Some("B"));
    }

    #[test]
    fn test_unknown_product_is_not_found() {
        let catalog = abc_catalog();
        assert!(matches!(catalog.product("Z"), Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_duplicate_product_first_row_wins() {
        let matrix = SimilarityMatrix::from_rows(vec![vec![1.0, 0.1], vec![0.1, 1.0]], None).unwrap();
        let mut dup = product("A", None);
        dup.name = "Second A".to_string();
        let catalog = Catalog::new(vec![product("A", None), dup], vec![], vec![], matrix);
        assert_eq!(catalog.product_position("A"), Some(0));
        assert_eq!(catalog.product("A").unwrap().name, "Product A");
    }

    #[test]
    fn test_invalid_stars_dropped() {
        let matrix = SimilarityMatrix::from_rows(vec![vec![1.0]], None).unwrap();
        let catalog = Catalog::new(
            vec![product("A", None)],
            vec![],
            vec![review("X", "A", 5), review("X", "A", 0), review("Y", "A", 9)],
            matrix,
        );
        assert_eq!(catalog.reviews().len(), 1);
        assert_eq!(catalog.reviews_for_product("A").count(), 1);
    }

    #[test]
    fn test_review_indices() {
        let catalog = abc_catalog();
        let by_x: Vec<&str> = catalog
            .reviews_for_customer("X")
            .map(|r| r.product_id.as_str())
            .collect();
        assert_eq!(by_x, vec!["A", "B"]);
        assert_eq!(catalog.reviews_for_product("A").count(), 2);
        assert_eq!(catalog.reviews_for_product("C").count(), 0);
        assert_eq!(catalog.reviews_for_customer("nobody").count(), 0);
    }

    #[test]
    fn test_customer_lookup() {
        let catalog = abc_catalog();
        assert_eq!(catalog.customer("Y").map(|c| c.name.as_str()), Some("Yen"));
        assert_eq!(catalog.customer_by_name("Xuan").map(|c| c.id.as_str()), Some("X"));
        assert!(catalog.customer_by_name("Nobody").is_none());
    }
}
