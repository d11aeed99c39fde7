use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use prodrec::config::DataConfig;
use prodrec::{
    purchased_products, Catalog, Customer, Error, Product, Recommender, Review, SimilarityMatrix,
};

fn product(id: &str, avg_rating: Option<f32>) -> Product {
    Product {
        id: id.to_string(),
        name: format!("Product {}", id),
        description: String::new(),
        image_ref: String::new(),
        price: 250_000.0,
        avg_rating,
    }
}

fn review(customer_id: &str, product_id: &str, stars: u8) -> Review {
    Review {
        customer_id: customer_id.to_string(),
        product_id: product_id.to_string(),
        stars,
        comment: String::new(),
        comment_date: "01/12/2024".to_string(),
    }
}

/// Six products with a symmetric matrix that has a few ties.
fn six_product_recommender() -> Recommender {
    let rows = vec![
        vec![1.0, 0.8, 0.8, 0.1, 0.5, 0.3],
        vec![0.8, 1.0, 0.2, 0.7, 0.7, 0.1],
        vec![0.8, 0.2, 1.0, 0.6, 0.4, 0.9],
        vec![0.1, 0.7, 0.6, 1.0, 0.2, 0.2],
        vec![0.5, 0.7, 0.4, 0.2, 1.0, 0.6],
        vec![0.3, 0.1, 0.9, 0.2, 0.6, 1.0],
    ];
    let ids = ["P0", "P1", "P2", "P3", "P4", "P5"];
    let catalog = Catalog::new(
        ids.iter().map(|id| product(id, Some(4.5))).collect(),
        vec![Customer {
            id: "X".to_string(),
            name: "Xuan".to_string(),
        }],
        vec![review("X", "P0", 5), review("X", "P1", 4), review("X", "P0", 3)],
        SimilarityMatrix::from_rows(rows, Some("test".to_string())).unwrap(),
    );
    Recommender::new(Arc::new(catalog))
}

#[test]
fn three_product_round_trip() {
    let catalog = Catalog::new(
        vec![product("A", None), product("B", None), product("C", None)],
        vec![],
        vec![],
        SimilarityMatrix::from_rows(
            vec![
                vec![1.0, 0.9, 0.2],
                vec![0.9, 1.0, 0.3],
                vec![0.2, 0.3, 1.0],
            ],
            None,
        )
        .unwrap(),
    );
    let rec = Recommender::new(Arc::new(catalog));

    let one: Vec<String> = rec
        .recommend("A", 1)
        .unwrap()
        .into_iter()
        .map(|s| s.product.id)
        .collect();
    assert_eq!(one, vec!["B"]);

    let two: Vec<String> = rec
        .recommend("A", 2)
        .unwrap()
        .into_iter()
        .map(|s| s.product.id)
        .collect();
    assert_eq!(two, vec!["B", "C"]);
}

#[test]
fn recommendations_hold_ordering_properties_for_every_product() {
    let rec = six_product_recommender();
    let total = rec.catalog().products().len();

    for query in rec.catalog().products() {
        for n in 0..=total + 1 {
            let items = rec.recommend(&query.id, n).unwrap();

            assert!(items.len() <= n);
            if total > n {
                assert_eq!(items.len(), n, "query {} n {}", query.id, n);
            } else {
                assert_eq!(items.len(), total - 1);
            }
            assert!(items.iter().all(|s| s.product.id != query.id));

            for pair in items.windows(2) {
                assert!(pair[0].score >= pair[1].score);
                if pair[0].score == pair[1].score {
                    let a = rec.catalog().product_position(&pair[0].product.id).unwrap();
                    let b = rec.catalog().product_position(&pair[1].product.id).unwrap();
                    assert!(a < b, "tie must rank lower index first");
                }
            }
        }
    }
}

#[test]
fn ties_rank_lower_index_first() {
    let rec = six_product_recommender();
    // P0 row: P1 and P2 both score 0.8.
    let ids: Vec<String> = rec
        .recommend("P0", 2)
        .unwrap()
        .into_iter()
        .map(|s| s.product.id)
        .collect();
    assert_eq!(ids, vec!["P1", "P2"]);
}

#[test]
fn unknown_product_is_recoverable() {
    let rec = six_product_recommender();
    let err = rec.recommend("missing", 3).unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
    assert!(err.is_empty_result());
}

#[test]
fn customer_without_reviews_has_no_purchases() {
    let rec = six_product_recommender();
    assert!(purchased_products(rec.catalog(), "nobody").is_empty());
}

#[test]
fn merged_customer_suggestions_never_include_purchases() {
    let rec = six_product_recommender();
    let bought = purchased_products(rec.catalog(), "X");
    assert_eq!(bought.len(), 2);

    for per_product in 1..=5 {
        let items = rec.recommend_for_customer("X", per_product, 0.0);
        let ids: Vec<&str> = items.iter().map(|s| s.product.id.as_str()).collect();

        assert!(ids.iter().all(|id| !bought.contains(*id)));
        let unique: HashSet<&str> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len(), "duplicates in {:?}", ids);
        assert_eq!(
            items.iter().map(|s| s.rank).collect::<Vec<_>>(),
            (1..=items.len()).collect::<Vec<_>>()
        );
    }

    // P0 -> P2 (0.8), P4 (0.5); P1 -> P3 (0.7), P4 (0.7)
    let ids: Vec<String> = rec
        .recommend_for_customer("X", 3, 0.0)
        .into_iter()
        .map(|s| s.product.id)
        .collect();
    assert_eq!(ids, vec!["P2", "P4", "P3"]);
}

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn loads_artifacts_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let config = DataConfig {
        products_csv: write(
            dir.path(),
            "Product.csv",
            "ma_san_pham,ten_san_pham,gia_ban,mo_ta,hinh_anh,diem_trung_binh\n\
             100,Serum,350000,Hydrating serum,https://img/100.jpg,4.6\n\
             200,Toner,150000,Gentle toner,https://img/200.jpg,\n\
             300,Sunscreen,420000,SPF 50,https://img/300.jpg,4.9\n",
        ),
        customers_csv: write(
            dir.path(),
            "Customer.csv",
            "ma_khach_hang,ho_ten\n1,Hoàng Anh\n2,Nhi Phương\n",
        ),
        reviews_csv: write(
            dir.path(),
            "Danh_gia.csv",
            "ma_khach_hang,ma_san_pham,so_sao,noi_dung_binh_luan,ngay_binh_luan\n\
             1,100,5,Rất tốt,01/11/2024\n\
             1,300,4,Ổn,03/11/2024\n\
             2,100,7,out of range,04/11/2024\n",
        ),
        similarity_matrix: write(
            dir.path(),
            "similarity.csv",
            "1.0,0.2,0.7\n0.2,1.0,0.5\n0.7,0.5,1.0\n",
        ),
    };

    let catalog = Catalog::load(&config).unwrap();
    assert_eq!(catalog.products().len(), 3);
    assert_eq!(catalog.products()[1].avg_rating, None);
    assert_eq!(catalog.reviews().len(), 2);

    let rec = Recommender::new(Arc::new(catalog));
    let ids: Vec<String> = rec
        .recommend("100", 2)
        .unwrap()
        .into_iter()
        .map(|s| s.product.id)
        .collect();
    assert_eq!(ids, vec!["300", "200"]);

    let bought = purchased_products(rec.catalog(), "1");
    assert!(bought.contains("100") && bought.contains("300"));
}

#[test]
fn missing_product_table_fails_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let config = DataConfig {
        products_csv: dir.path().join("absent.csv"),
        customers_csv: dir.path().join("absent.csv"),
        reviews_csv: dir.path().join("absent.csv"),
        similarity_matrix: dir.path().join("absent.json"),
    };
    assert!(matches!(Catalog::load(&config), Err(Error::Io { .. })));
}
