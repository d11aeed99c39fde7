//! Configuration management for the ProdRec engine
//!
//! Strongly-typed configuration parsed from environment variables, with
//! defaults suitable for running against the bundled `data/` directory.
//!
//! # Example
//! ```no_run
//! use prodrec::Config;
//! let config = Config::from_env().expect("failed to load config");
//! println!("Products: {}", config.data.products_csv.display());
//! ```

use crate::error::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Longest login session accepted from configuration (one year)
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Locations of the flat-file artifacts
    pub data: DataConfig,
    /// API server configuration
    pub api: ApiConfig,
    /// Recommendation tuning
    pub recommendation: RecommendationConfig,
    /// Mock authentication and sessions
    pub auth: AuthConfig,
}

/// Artifact locations
#[derive(Debug, Clone)]
pub struct DataConfig {
    /// Product table (row order must match the similarity matrix)
    pub products_csv: PathBuf,
    /// Customer table
    pub customers_csv: PathBuf,
    /// Review/purchase records
    pub reviews_csv: PathBuf,
    /// Precomputed similarity matrix (`.json` or `.csv`)
    pub similarity_matrix: PathBuf,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Port to listen on
    pub port: u16,
    /// Host to bind to
    pub host: String,
    /// Request timeout
    pub request_timeout: Duration,
    /// In-flight request cap
    pub max_concurrent_requests: usize,
    /// Enable CORS
    pub cors_enabled: bool,
    /// Allowed origins for CORS
    pub cors_origins: Vec<String>,
}

/// Recommendation engine configuration
#[derive(Debug, Clone)]
pub struct RecommendationConfig {
    /// Results returned when a request does not name a limit
    pub default_top_n: usize,
    /// Upper bound accepted from callers
    pub max_top_n: usize,
    /// Similar products fetched per purchased product for customer suggestions
    pub customer_per_product: usize,
    /// Minimum average rating a customer suggestion must have
    pub customer_min_rating: f32,
    /// Reviews listed on a product detail response
    pub reviews_per_product: usize,
    /// Queries slower than this are logged at warn level
    pub slow_query_threshold: Duration,
}

/// Mock authentication configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// JSON file mapping usernames to passwords
    pub credentials_file: PathBuf,
    /// Lifetime of a login session
    pub session_ttl: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Platforms that mount secrets as files: each file name is the env var
        // name and its contents the value.
        if let Ok(folder) = std::env::var("FFOLDER") {
            load_env_folder(&folder);
        } else {
            // Try to load .env file (ignore if not found)
            dotenvy::dotenv().ok();
        }

        let config = Self {
            data: DataConfig::from_env(),
            api: ApiConfig::from_env()?,
            recommendation: RecommendationConfig::from_env()?,
            auth: AuthConfig::from_env()?,
        };

        config.validate()?;
        config.log_summary();

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let rec = &self.recommendation;
        if rec.max_top_n == 0 {
            return Err(Error::InvalidConfig {
                key: "REC_MAX_TOP_N",
                message: "must be at least 1".into(),
            });
        }
        if rec.default_top_n > rec.max_top_n {
            return Err(Error::InvalidConfig {
                key: "REC_DEFAULT_TOP_N",
                message: format!("must be <= REC_MAX_TOP_N ({})", rec.max_top_n).into(),
            });
        }
        if !(0.0..=5.0).contains(&rec.customer_min_rating) {
            return Err(Error::InvalidConfig {
                key: "REC_CUSTOMER_MIN_RATING",
                message: "must be within 0.0..=5.0".into(),
            });
        }
        if self.api.max_concurrent_requests == 0 {
            return Err(Error::InvalidConfig {
                key: "API_MAX_CONCURRENCY",
                message: "must be at least 1".into(),
            });
        }
        if self.auth.session_ttl.is_zero() {
            return Err(Error::InvalidConfig {
                key: "SESSION_TTL_SECS",
                message: "must be positive".into(),
            });
        }
        if self.auth.session_ttl > MAX_SESSION_TTL {
            return Err(Error::InvalidConfig {
                key: "SESSION_TTL_SECS",
                message: format!("must be at most {}", MAX_SESSION_TTL.as_secs()).into(),
            });
        }
        Ok(())
    }

    /// Log configuration summary (without sensitive data)
    fn log_summary(&self) {
        info!("Configuration loaded:");
        info!("  Data:");
        info!("    Products: {}", self.data.products_csv.display());
        info!("    Customers: {}", self.data.customers_csv.display());
        info!("    Reviews: {}", self.data.reviews_csv.display());
        info!("    Similarity matrix: {}", self.data.similarity_matrix.display());
        info!("  API:");
        info!("    Listening on: {}:{}", self.api.host, self.api.port);
        info!("  Recommendation:");
        info!(
            "    Top-N: default {} / max {}",
            self.recommendation.default_top_n, self.recommendation.max_top_n
        );
        info!(
            "    Customer suggestions: {} per purchase, min rating {}",
            self.recommendation.customer_per_product, self.recommendation.customer_min_rating
        );
        info!("  Auth:");
        info!("    Session TTL: {:?}", self.auth.session_ttl);
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            api: ApiConfig {
                port: 8080,
                host: "0.0.0.0".to_string(),
                request_timeout: Duration::from_secs(30),
                max_concurrent_requests: 256,
                cors_enabled: true,
                cors_origins: vec!["*".to_string()],
            },
            recommendation: RecommendationConfig::default(),
            auth: AuthConfig {
                credentials_file: PathBuf::from("data/credentials.json"),
                session_ttl: Duration::from_secs(3600),
            },
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            products_csv: PathBuf::from("data/products.csv"),
            customers_csv: PathBuf::from("data/customers.csv"),
            reviews_csv: PathBuf::from("data/reviews.csv"),
            similarity_matrix: PathBuf::from("data/similarity.json"),
        }
    }
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            default_top_n: 3,
            max_top_n: 50,
            customer_per_product: 3,
            customer_min_rating: 4.0,
            reviews_per_product: 3,
            slow_query_threshold: Duration::from_millis(50),
        }
    }
}

impl DataConfig {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            products_csv: get_path_or("PRODUCTS_CSV", defaults.products_csv),
            customers_csv: get_path_or("CUSTOMERS_CSV", defaults.customers_csv),
            reviews_csv: get_path_or("REVIEWS_CSV", defaults.reviews_csv),
            similarity_matrix: get_path_or("SIMILARITY_MATRIX", defaults.similarity_matrix),
        }
    }
}

impl ApiConfig {
    fn from_env() -> Result<Self> {
        Ok(Self {
            port: get_env_parsed_or("API_PORT", 8080)?,
            host: get_env_or("API_HOST", "0.0.0.0"),
            request_timeout: Duration::from_secs(get_env_parsed_or(
                "API_REQUEST_TIMEOUT_SECS",
                30,
            )?),
            max_concurrent_requests: get_env_parsed_or("API_MAX_CONCURRENCY", 256)?,
            cors_enabled: get_env_parsed_or("API_CORS_ENABLED", true)?,
            cors_origins: get_env_or("API_CORS_ORIGINS", "*")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        })
    }
}

impl RecommendationConfig {
    fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            default_top_n: get_env_parsed_or("REC_DEFAULT_TOP_N", defaults.default_top_n)?,
            max_top_n: get_env_parsed_or("REC_MAX_TOP_N", defaults.max_top_n)?,
            customer_per_product: get_env_parsed_or(
                "REC_CUSTOMER_PER_PRODUCT",
                defaults.customer_per_product,
            )?,
            customer_min_rating: get_env_parsed_or(
                "REC_CUSTOMER_MIN_RATING",
                defaults.customer_min_rating,
            )?,
            reviews_per_product: get_env_parsed_or(
                "REC_REVIEWS_PER_PRODUCT",
                defaults.reviews_per_product,
            )?,
            slow_query_threshold: Duration::from_millis(get_env_parsed_or(
                "REC_SLOW_QUERY_MS",
                50,
            )?),
        })
    }
}

impl AuthConfig {
    fn from_env() -> Result<Self> {
        Ok(Self {
            credentials_file: get_path_or(
                "AUTH_CREDENTIALS_FILE",
                PathBuf::from("data/credentials.json"),
            ),
            session_ttl: Duration::from_secs(get_env_parsed_or("SESSION_TTL_SECS", 3600)?),
        })
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Export every regular file in `folder` as an env var named after the file,
/// without overriding variables that are already set.
fn load_env_folder(folder: &str) {
    let path = std::path::Path::new(folder);
    if !path.is_dir() {
        return;
    }
    let entries = match std::fs::read_dir(path) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("Failed to read FFOLDER {}: {}", folder, err);
            return;
        }
    };
    for entry in entries.flatten() {
        let fpath = entry.path();
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if !fpath.is_file() || std::env::var(&name).is_ok() {
            continue;
        }
        if let Ok(contents) = std::fs::read_to_string(&fpath) {
            std::env::set_var(&name, contents.trim());
        }
    }
    info!("Loaded configuration from FFOLDER={}", folder);
}

/// Get environment variable with default
fn get_env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_path_or(key: &str, default: PathBuf) -> PathBuf {
    std::env::var_os(key).map(PathBuf::from).unwrap_or(default)
}

/// Parse an optional environment variable, rejecting malformed values
/// instead of silently falling back.
fn get_env_parsed_or<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value.trim().parse().map_err(|e: T::Err| Error::InvalidConfig {
            key,
            message: format!("Invalid value '{}': {}", value, e).into(),
        }),
        Err(_) => Ok(default),
    }
}
