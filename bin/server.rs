// Produktmatch - Web Server
// REST API over a loaded dataset with Axum

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use clap::Parser;
use produktmatch::logging::{init_logging, LogConfig};
use produktmatch::{
    open_dataset, CapabilityId, CapabilityIndex, CompanyProfile, Dataset, Product, ProductId,
    ReportView, RequirementChoice, Selection,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "produktmatch-server", version, about = "Produktmatch REST API")]
struct Args {
    /// SQLite dataset with the five product/company relations
    #[arg(long, env = "PRODUKTMATCH_DB", default_value = "produktmatch.sqlite")]
    db: PathBuf,

    /// Listen address
    #[arg(long, env = "PRODUKTMATCH_ADDR", default_value = "0.0.0.0:3000")]
    addr: String,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Shared application state; the dataset never changes after load
#[derive(Clone)]
struct AppState {
    dataset: Arc<Dataset>,
    index: Arc<CapabilityIndex>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

fn not_found(what: String) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::err(what)),
    )
        .into_response()
}

/// Product with requirement count (for listing)
#[derive(Serialize)]
struct ProductResponse {
    id: ProductId,
    name: String,
    requirement_count: usize,
}

/// `?exclude=1,2,3`
#[derive(Deserialize, Default)]
struct MatchQuery {
    exclude: Option<String>,
}

impl MatchQuery {
    fn excluded(&self) -> Result<Vec<CapabilityId>, String> {
        let Some(raw) = self.exclude.as_deref() else {
            return Ok(Vec::new());
        };

        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<i64>()
                    .map(CapabilityId)
                    .map_err(|_| format!("invalid capability id in exclude: {:?}", s))
            })
            .collect()
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/products - All products
async fn get_products(State(state): State<AppState>) -> impl IntoResponse {
    let response: Vec<ProductResponse> = state
        .dataset
        .products()
        .iter()
        .map(|p: &Product| ProductResponse {
            id: p.id,
            name: p.name.clone(),
            requirement_count: state.dataset.requirements_of(p.id).len(),
        })
        .collect();

    Json(ApiResponse::ok(response))
}

/// GET /api/products/:id/requirements - Requirement checkboxes, all selected
async fn get_requirements(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> axum::response::Response {
    let product_id = ProductId(id);
    if state.dataset.product(product_id).is_none() {
        return not_found(format!("product {} not found", id));
    }

    let choices: Vec<RequirementChoice> =
        Selection::for_product(&state.dataset, product_id).choices();

    (StatusCode::OK, Json(ApiResponse::ok(choices))).into_response()
}

/// GET /api/products/:id/matches?exclude=1,2 - Run the matcher
async fn get_matches(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<MatchQuery>,
) -> axum::response::Response {
    let Some(product) = state.dataset.product(ProductId(id)) else {
        return not_found(format!("product {} not found", id));
    };

    let excluded = match query.excluded() {
        Ok(ids) => ids,
        Err(e) => {
            warn!("rejected match query: {}", e);
            return (StatusCode::BAD_REQUEST, Json(ApiResponse::<()>::err(e))).into_response();
        }
    };

    let mut selection = Selection::for_product(&state.dataset, product.id);
    for cap in excluded {
        selection.deselect(cap);
    }

    let outcome = selection.evaluate(&state.index);
    let view = ReportView::build(product, &selection, &outcome, &state.index);

    (StatusCode::OK, Json(ApiResponse::ok(view))).into_response()
}

/// GET /api/companies/:name - Company profile by name
async fn get_company(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> axum::response::Response {
    // Decode URL-encoded name
    let decoded = urlencoding::decode(&name)
        .map(|s| s.into_owned())
        .unwrap_or(name);

    match state.dataset.company_profile_by_name(&decoded) {
        Some(profile) => {
            (StatusCode::OK, Json(ApiResponse::<CompanyProfile>::ok(profile))).into_response()
        }
        None => not_found(format!("company {:?} not found", decoded)),
    }
}

fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/products", get(get_products))
        .route("/products/:id/requirements", get(get_requirements))
        .route("/products/:id/matches", get(get_matches))
        .route("/companies/:name", get(get_company))
        .with_state(state);

    Router::new().nest("/api", api_routes).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    )
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&LogConfig::from_verbosity(args.verbose.max(1)))?;

    println!("🌐 Produktmatch - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    if !args.db.exists() {
        eprintln!("❌ Dataset not found at {:?}", args.db);
        eprintln!("   Run: produktmatch import <csv-dir>");
        std::process::exit(1);
    }

    let dataset = open_dataset(&args.db)
        .with_context(|| format!("Failed to load dataset {:?}", args.db))?;
    println!("✓ Dataset loaded: {:?}", args.db);

    let state = AppState {
        index: Arc::new(dataset.capability_index()),
        dataset: Arc::new(dataset),
    };

    let listener = tokio::net::TcpListener::bind(&args.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", args.addr))?;

    info!(addr = %args.addr, "listening");
    println!("\n🚀 Server running on http://{}", args.addr);
    println!("   API: http://{}/api/products", args.addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, router(state))
        .await
        .context("Server error")?;

    Ok(())
}
