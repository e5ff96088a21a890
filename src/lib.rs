use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod identity;
pub mod ids;
pub mod memory;
pub mod models;
pub mod repository;
pub mod seed;

// Routing, grouped by access level.
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use auth::TokenIssuer;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use identity::{CredentialState, IdentityOptions, IdentityStore};
pub use ids::{IdGeneratorState, RandomIdGenerator, SequentialIdGenerator};
pub use memory::MemoryRepository;
pub use repository::{PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and schema into the OpenAPI document served at
/// `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login,
        handlers::list_users, handlers::get_user, handlers::create_user,
        handlers::update_user, handlers::delete_user,
        handlers::list_bookmarks, handlers::create_bookmark, handlers::delete_bookmark,
        handlers::list_offerings
    ),
    components(
        schemas(
            models::LoginRequest, models::CreateUserRequest, models::UpdateUserRequest,
            models::UserView, models::BookmarkView, models::ProcedureOfferingView,
            models::ProcedureView, models::EstablishmentView, models::ProfessionalView,
            models::SpecialtySimpleView, models::ProcedureType, models::EstablishmentType,
            models::ProfessionalType, identity::IdentityError,
        )
    ),
    tags(
        (name = "puchealth", description = "PUC Health marketplace API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single container of shared services, cloned into every request.
#[derive(Clone)]
pub struct AppState {
    /// Persistence: Postgres or the in-process store.
    pub repo: RepositoryState,
    /// Credential service: lookup, password checks, validated account writes.
    pub credentials: CredentialState,
    /// Bearer token minting and validation.
    pub tokens: TokenIssuer,
    /// Source of new entity ids.
    pub ids: IdGeneratorState,
    pub config: AppConfig,
}

impl AppState {
    /// Builds the state around `repo`, with an `IdentityStore` using the configured bcrypt cost
    /// and a token issuer keyed by the configured signing key.
    pub fn new(repo: RepositoryState, ids: IdGeneratorState, config: AppConfig) -> Self {
        let options = IdentityOptions::default().with_hash_cost(config.bcrypt_cost);
        let credentials: CredentialState =
            std::sync::Arc::new(IdentityStore::new(repo.clone(), options));
        Self {
            repo,
            credentials,
            tokens: TokenIssuer::new(&config.jwt_key),
            ids,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for CredentialState {
    fn from_ref(app_state: &AppState) -> CredentialState {
        app_state.credentials.clone()
    }
}

impl FromRef<AppState> for TokenIssuer {
    fn from_ref(app_state: &AppState) -> TokenIssuer {
        app_state.tokens.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles every route module, wraps them in the authorization gate and the observability
/// layers, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes())
        .merge(admin::admin_routes())
        // The gate wraps every route (and the 404 fallback), checking the static route table
        // before any handler runs.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            gate::authorization_gate,
        ))
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing, correlated by the generated request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span with method, uri and the `x-request-id` header so every log
/// line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
