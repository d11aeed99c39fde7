//! HTTP API Server
//!
//! JSON endpoints over the catalog, the recommender and the mock login flow.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::future::Future;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::auth::Authenticator;
use crate::catalog::{Customer, Product};
use crate::config::{ApiConfig, RecommendationConfig};
use crate::error::{Error, Result};
use crate::recommendation::{
    history, ratings, ProductSummary, Recommender, ReviewView, ScoredProduct,
};
use crate::session::{Session, SessionStore};

const DEFAULT_PAGE_SIZE: usize = 10;
const MAX_PAGE_SIZE: usize = 100;

/// Shared application state
pub struct AppState {
    pub recommender: Recommender,
    pub sessions: SessionStore,
    pub authenticator: Arc<dyn Authenticator>,
    pub settings: RecommendationConfig,
}

/// Query params for paged listings
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub offset: usize,
    pub limit: Option<usize>,
}

/// Query params for recommendation endpoints
#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub products: usize,
    pub customers: usize,
    pub reviews: usize,
    pub matrix_dim: usize,
    pub matrix_version: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub total: usize,
    pub has_more: bool,
}

#[derive(Debug, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub summary: ProductSummary,
    pub reviews: Vec<ReviewView>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub product_id: String,
    pub items: Vec<ScoredProduct>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct PurchasesResponse {
    pub customer_id: String,
    pub product_ids: BTreeSet<String>,
}

#[derive(Debug, Serialize)]
pub struct AccountsResponse {
    pub usernames: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub session: Session,
    pub customer: Customer,
    pub purchased: Vec<Product>,
    pub suggestions: Vec<ScoredProduct>,
}

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub customer_id: String,
    pub items: Vec<ScoredProduct>,
    pub total: usize,
}

/// Build the router without transport-level layers
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Catalog
        .route("/api/v1/products", get(list_products))
        .route("/api/v1/products/:product_id", get(get_product))
        .route("/api/v1/products/:product_id/similar", get(similar_products))
        .route(
            "/api/v1/customers/:customer_id/purchases",
            get(customer_purchases),
        )
        // Mock login
        .route("/api/v1/accounts", get(list_accounts))
        .route("/api/v1/login", post(login))
        .route("/api/v1/logout", post(logout))
        .route("/api/v1/me/recommendations", get(my_recommendations))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the API server and run until `shutdown` resolves
pub async fn start_server(
    state: Arc<AppState>,
    config: &ApiConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let mut app = router(state)
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(ConcurrencyLimitLayer::new(config.max_concurrent_requests));
    if config.cors_enabled {
        app = app.layer(cors_layer(&config.cors_origins));
    }

    let addr = format!("{}:{}", config.host, config.port);
    info!("🚀 Starting recommendation API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::io(addr.clone(), e))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::io(addr, e))?;

    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

fn resolve_limit(requested: Option<usize>, default: usize, max: usize) -> Result<usize> {
    match requested {
        None => Ok(default),
        Some(limit) if limit > max => Err(Error::bad_request(format!(
            "limit must be at most {}",
            max
        ))),
        Some(limit) => Ok(limit),
    }
}

/// Resolve the bearer token in `Authorization` to a live session
async fn current_session(state: &AppState, headers: &HeaderMap) -> Result<Session> {
    let raw = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| Error::unauthorized("missing bearer token"))?;
    let token =
        Uuid::parse_str(raw.trim()).map_err(|_| Error::unauthorized("malformed session token"))?;
    state
        .sessions
        .get(&token)
        .await
        .ok_or_else(|| Error::unauthorized("session expired or unknown"))
}

/// Merged suggestions for a customer, scored on the blocking pool so the
/// rayon fan-out stays off the async workers
async fn customer_suggestions(state: &AppState, customer_id: String) -> Result<Vec<ScoredProduct>> {
    let recommender = state.recommender.clone();
    let per_product = state.settings.customer_per_product;
    let min_rating = state.settings.customer_min_rating;

    tokio::task::spawn_blocking(move || {
        recommender.recommend_for_customer(&customer_id, per_product, min_rating)
    })
    .await
    .map_err(Error::internal)
}

/// Health check endpoint
async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let catalog = state.recommender.catalog();
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        products: catalog.products().len(),
        customers: catalog.customers().len(),
        reviews: catalog.reviews().len(),
        matrix_dim: catalog.matrix().dim(),
        matrix_version: catalog.matrix().version().map(str::to_string),
    })
}

/// Products in table order
async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ProductPage>> {
    let limit = resolve_limit(query.limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)?;
    let products = state.recommender.catalog().products();
    let items: Vec<Product> = products
        .iter()
        .skip(query.offset)
        .take(limit)
        .cloned()
        .collect();

    Ok(Json(ProductPage {
        has_more: query.offset.saturating_add(items.len()) < products.len(),
        total: products.len(),
        items,
    }))
}

/// Product with purchase count, rating distribution and its first reviews
async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<String>,
) -> Result<Json<ProductDetail>> {
    let catalog = state.recommender.catalog();
    let summary = ratings::summarize(catalog, &product_id)?;
    let reviews =
        history::product_reviews(catalog, &product_id, state.settings.reviews_per_product);
    Ok(Json(ProductDetail { summary, reviews }))
}

/// Products most similar to the given one
async fn similar_products(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<RecommendationResponse>> {
    let limit = resolve_limit(
        query.limit,
        state.settings.default_top_n,
        state.settings.max_top_n,
    )?;
    let items = state.recommender.recommend(&product_id, limit)?;
    Ok(Json(RecommendationResponse {
        product_id,
        total: items.len(),
        items,
    }))
}

/// Product ids a customer has purchased (empty for unknown customers)
async fn customer_purchases(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<String>,
) -> Json<PurchasesResponse> {
    let product_ids = history::purchased_products(state.recommender.catalog(), &customer_id);
    Json(PurchasesResponse {
        customer_id,
        product_ids,
    })
}

/// Accounts offered by the authenticator
async fn list_accounts(State(state): State<Arc<AppState>>) -> Json<AccountsResponse> {
    Json(AccountsResponse {
        usernames: state.authenticator.usernames(),
    })
}

/// Authenticate, open a session and return purchase history with suggestions
async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    state
        .authenticator
        .authenticate(&req.username, &req.password)?;

    let catalog = state.recommender.catalog();
    let customer = catalog
        .customer_by_name(&req.username)
        .cloned()
        .ok_or_else(|| Error::not_found("customer", req.username.clone()))?;

    let bought: HashSet<String> = history::purchased_products(catalog, &customer.id)
        .into_iter()
        .collect();
    let purchased: Vec<Product> = catalog
        .products()
        .iter()
        .filter(|p| bought.contains(&p.id))
        .cloned()
        .collect();
    let suggestions = customer_suggestions(&state, customer.id.clone()).await?;

    let session = state.sessions.create(&customer.id, &req.username).await?;
    info!(
        "Customer {} logged in: {} purchases, {} suggestions",
        customer.id,
        purchased.len(),
        suggestions.len()
    );

    Ok(Json(LoginResponse {
        session,
        customer,
        purchased,
        suggestions,
    }))
}

/// End the caller's session
async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<StatusCode> {
    let session = current_session(&state, &headers).await?;
    state.sessions.revoke(&session.token).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Suggestions for the customer behind the caller's session
async fn my_recommendations(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SuggestionsResponse>> {
    let session = current_session(&state, &headers).await?;
    let items = customer_suggestions(&state, session.customer_id.clone()).await?;
    Ok(Json(SuggestionsResponse {
        customer_id: session.customer_id,
        total: items.len(),
        items,
    }))
}
