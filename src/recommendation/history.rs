//! Purchase history and review listings
//!
//! Every review row doubles as a purchase record, so a customer's purchases
//! are the products they reviewed.

use crate::catalog::Catalog;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

/// Set of product ids a customer purchased. Unknown customers and customers
/// without reviews yield an empty set.
pub fn purchased_products(catalog: &Catalog, customer_id: &str) -> BTreeSet<String> {
    catalog
        .reviews_for_customer(customer_id)
        .map(|r| r.product_id.clone())
        .collect()
}

/// Purchased product ids in review-table order, first occurrence only.
pub fn purchase_sequence(catalog: &Catalog, customer_id: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut sequence = Vec::new();
    for review in catalog.reviews_for_customer(customer_id) {
        if seen.insert(review.product_id.as_str()) {
            sequence.push(review.product_id.clone());
        }
    }
    sequence
}

/// A review joined with its author's display name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewView {
    pub customer_id: String,
    pub customer_name: Option<String>,
    pub stars: u8,
    pub comment: String,
    pub comment_date: String,
}

/// First `limit` reviews of a product, in table order.
pub fn product_reviews(catalog: &Catalog, product_id: &str, limit: usize) -> Vec<ReviewView> {
    catalog
        .reviews_for_product(product_id)
        .take(limit)
        .map(|r| ReviewView {
            customer_id: r.customer_id.clone(),
            customer_name: catalog.customer(&r.customer_id).map(|c| c.name.clone()),
            stars: r.stars,
            comment: r.comment.clone(),
            comment_date: r.comment_date.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support::*;
    use crate::catalog::SimilarityMatrix;

    #[test]
    fn test_purchased_products() {
        let catalog = abc_catalog();
        let bought = purchased_products(&catalog, "X");
        assert_eq!(
            bought.into_iter().collect::<Vec<_>>(),
            vec!["A".to_string(), "B".to_string()]
        );
    }

    #[test]
    fn test_no_purchases_is_empty_set() {
        let catalog = abc_catalog();
        assert!(purchased_products(&catalog, "nobody").is_empty());
        assert!(purchase_sequence(&catalog, "nobody").is_empty());
    }

    #[test]
    fn test_purchase_sequence_keeps_first_occurrence() {
        let matrix = SimilarityMatrix::from_rows(vec![vec![1.0, 0.1], vec![0.1, 1.0]], None).unwrap();
        let catalog = Catalog::new(
            vec![product("A", None), product("B", None)],
            vec![customer("X", "Xuan")],
            vec![review("X", "B", 4), review("X", "A", 5), review("X", "B", 2)],
            matrix,
        );
        assert_eq!(purchase_sequence(&catalog, "X"), vec!["B", "A"]);
    }

    #[test]
    fn test_product_reviews_join_names() {
        let catalog = abc_catalog();
        let reviews = product_reviews(&catalog, "A", 3);
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].customer_name.as_deref(), Some("Xuan"));
        assert_eq!(reviews[1].customer_name.as_deref(), Some("Yen"));
        assert_eq!(product_reviews(&catalog, "A", 1).len(), 1);
        assert!(product_reviews(&catalog, "C", 3).is_empty());
    }
}
