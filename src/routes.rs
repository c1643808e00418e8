use axum::{
    http::{HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    extract::State,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::SecurityConfig;
use crate::error::ApiError;
use crate::handlers::{auth, bootcamps, users};
use crate::middleware::{admin_only, protect, ApiResponse};
use crate::state::AppState;

/// Full application router with shared state and global layers applied
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security);

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_routes(state.clone()))
        .merge(user_routes(state.clone()))
        .merge(bootcamp_routes(state.clone()))
        // Global middleware
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state)
}

fn auth_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/forgotpassword", post(auth::forgot_password))
        .route("/api/v1/auth/resetpassword/:resettoken", put(auth::reset_password));

    let protected = Router::new()
        .route("/api/v1/auth/me", get(auth::me))
        .route_layer(from_fn_with_state(state, protect));

    public.merge(protected)
}

fn user_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/auth/users", get(users::list).post(users::create))
        .route(
            "/api/v1/auth/users/:id",
            get(users::get).put(users::update).delete(users::delete),
        )
        // Layers run outermost-last: protect, then the admin check
        .route_layer(from_fn(admin_only))
        .route_layer(from_fn_with_state(state, protect))
}

fn bootcamp_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/api/v1/bootcamps", get(bootcamps::list))
        .route("/api/v1/bootcamps/:id", get(bootcamps::get));

    let protected = Router::new()
        .route("/api/v1/bootcamps", post(bootcamps::create))
        .route("/api/v1/bootcamps/:id", put(bootcamps::update).delete(bootcamps::delete))
        .route("/api/v1/bootcamps/radius/:zipcode/:distance", get(bootcamps::in_radius))
        .route_layer(from_fn_with_state(state, protect));

    public.merge(protected)
}

/// Configured origins, or any origin when none are configured
fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    if security.cors_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

async fn root() -> ApiResponse<Value> {
    ApiResponse::success(json!({
        "name": "DevCamper API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "endpoints": {
            "auth": "/api/v1/auth (register, login, me, forgotpassword, resetpassword/:resettoken)",
            "users": "/api/v1/auth/users[/:id] (admin)",
            "bootcamps": "/api/v1/bootcamps[/:id], /api/v1/bootcamps/radius/:zipcode/:distance",
            "health": "/health"
        }
    }))
}

async fn health(State(state): State<AppState>) -> Result<ApiResponse<Value>, ApiError> {
    state.db.health_check().await.map_err(|e| {
        tracing::warn!("Health check failed: {}", e);
        ApiError::service_unavailable("Database unavailable")
    })?;

    Ok(ApiResponse::success(json!({
        "status": "ok",
        "database": "ok",
        "timestamp": chrono::Utc::now(),
    })))
}
