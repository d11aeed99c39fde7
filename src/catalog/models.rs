//! Row types for the three flat tables.
//!
//! Field aliases accept the column headers of the legacy export
//! (`ma_san_pham`, `ten_san_pham`, ...) alongside the English ones.

use serde::{Deserialize, Serialize};

/// A catalog product. Its position in the product table is its row and
/// column in the similarity matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(alias = "ma_san_pham", alias = "product_id")]
    pub id: String,
    #[serde(alias = "ten_san_pham")]
    pub name: String,
    #[serde(default, alias = "mo_ta")]
    pub description: String,
    #[serde(default, alias = "hinh_anh", alias = "image")]
    pub image_ref: String,
    #[serde(alias = "gia_ban")]
    pub price: f64,
    #[serde(default, alias = "diem_trung_binh")]
    pub avg_rating: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(alias = "ma_khach_hang", alias = "customer_id")]
    pub id: String,
    #[serde(alias = "ho_ten")]
    pub name: String,
}

/// A single customer/product interaction. Every review is also a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    #[serde(alias = "ma_khach_hang")]
    pub customer_id: String,
    #[serde(alias = "ma_san_pham")]
    pub product_id: String,
    #[serde(alias = "so_sao")]
    pub stars: u8,
    #[serde(default, alias = "noi_dung_binh_luan")]
    pub comment: String,
    #[serde(default, alias = "ngay_binh_luan")]
    pub comment_date: String,
}

impl Review {
    pub const MIN_STARS: u8 = 1;
    pub const MAX_STARS: u8 = 5;

    pub fn has_valid_stars(&self) -> bool {
        (Self::MIN_STARS..=Self::MAX_STARS).contains(&self.stars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_bounds() {
        let mut review = Review {
            customer_id: "c1".to_string(),
            product_id: "p1".to_string(),
            stars: 5,
            comment: String::new(),
            comment_date: String::new(),
        };
        assert!(review.has_valid_stars());
        review.stars = 0;
        assert!(!review.has_valid_stars());
        review.stars = 6;
        assert!(!review.has_valid_stars());
    }
}
