use crate::{
    api::{models::*, openapi::ApiDoc},
    auth::jwt::{Claims, JwtService},
    config::Config,
    constants::constants::{DEFAULT_ACTIVITY_LIMIT, SESSION_COOKIE, SESSION_TTL_SECS},
    core::{
        errors::SettleError,
        models::{
            ActivityEntry, BalanceSnapshot, BalanceSummary, CancelUpiRequest, ConfirmUpiRequest, SettlementEnvelope,
            SettlementPage, SettlementQuery, SettlementRequest, UpiSettlementIntent, UpiSettlementRequest,
        },
    },
    infrastructure::ledger::in_memory::InMemoryLedger,
};
use axum::{
    Extension, Json, Router,
    extract::{Query, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::IntoResponse,
    routing::{get, post, put},
};
use http::{Method, header};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Shared state of the development ledger server.
pub struct LedgerState {
    pub ledger: InMemoryLedger,
    pub jwt: JwtService,
    pub request_timeout: Duration,
}

impl LedgerState {
    pub fn new(ledger: InMemoryLedger, jwt: JwtService) -> Self {
        LedgerState {
            ledger,
            jwt,
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn from_config(ledger: InMemoryLedger, config: &Config) -> Self {
        LedgerState {
            ledger,
            jwt: JwtService::new(config.jwt_secret.clone()),
            request_timeout: config.request_timeout,
        }
    }
}

fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token)
}

// Middleware to validate the session cookie
async fn auth_middleware(
    State(state): State<Arc<LedgerState>>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let token = session_token(req.headers()).ok_or_else(|| SettleError::Auth("Missing session".to_string()))?;
    let claims = state.jwt.validate_token(token)?;
    if !state.ledger.has_user(&claims.sub).await {
        return Err(SettleError::Auth("Unknown user".to_string()).into());
    }
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

// Define API routes
pub fn api_routes(state: Arc<LedgerState>) -> Router {
    let protected_routes = Router::new()
        .route("/balances", get(get_balances))
        .route("/settlements/summary", get(get_balance_summary))
        .route("/settlements", get(list_settlements).post(create_settlement))
        .route("/upi-settlements", post(create_upi_settlement))
        .route("/upi-settlements/confirm", put(confirm_upi_settlement))
        .route("/upi-settlements/cancel", put(cancel_upi_settlement))
        .route("/activity", get(get_recent_activity))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/login", post(login)) // Unprotected
        .merge(protected_routes)
        .with_state(state)
}

/// Full development server: `/api` routes, Swagger UI and the HTTP layers.
pub fn app(state: Arc<LedgerState>) -> Router {
    let timeout = state.request_timeout;
    Router::new()
        .route("/", get(|| async { "OK" }))
        .nest("/api", api_routes(state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CompressionLayer::new()) // Gzip compression
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT])
                .allow_headers([header::CONTENT_TYPE, header::COOKIE]),
        )
        .layer(TraceLayer::new_for_http()) // Request tracing
}

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session opened; token also set as the `session` cookie", body = LoginResponse),
        (status = 401, description = "Unknown user", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<Arc<LedgerState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.ledger.has_user(&req.user_id).await {
        return Err(SettleError::Auth(format!("Unknown user {}", req.user_id)).into());
    }
    let token = state.jwt.generate_token(&req.user_id)?;
    let cookie = HeaderValue::from_str(&format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, SESSION_TTL_SECS
    ))
    .map_err(|e| SettleError::Internal(format!("Invalid cookie: {}", e)))?;
    info!(user_id = %req.user_id, "session opened");
    Ok(([(header::SET_COOKIE, cookie)], Json(LoginResponse { token })))
}

#[utoipa::path(
    get,
    path = "/api/balances",
    params(ScopeQuery),
    responses(
        (status = 200, description = "Balances of the session user", body = BalanceSnapshot),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse)
    ),
    security(("session" = []))
)]
pub async fn get_balances(
    State(state): State<Arc<LedgerState>>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<BalanceSnapshot>, ApiError> {
    let balances = state.ledger.balances_for(&claims.sub, query.scope.as_deref()).await?;
    Ok(Json(balances))
}

#[utoipa::path(
    get,
    path = "/api/settlements/summary",
    params(ScopeQuery),
    responses(
        (status = 200, description = "Totals for the dashboard", body = BalanceSummary),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse)
    ),
    security(("session" = []))
)]
pub async fn get_balance_summary(
    State(state): State<Arc<LedgerState>>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<BalanceSummary>, ApiError> {
    let summary = state.ledger.summary_for(&claims.sub, query.scope.as_deref()).await?;
    Ok(Json(summary))
}

#[utoipa::path(
    get,
    path = "/api/settlements",
    params(SettlementQuery),
    responses(
        (status = 200, description = "Settlement history, newest first", body = SettlementPage),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse)
    ),
    security(("session" = []))
)]
pub async fn list_settlements(
    State(state): State<Arc<LedgerState>>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<SettlementQuery>,
) -> Result<Json<SettlementPage>, ApiError> {
    let page = state.ledger.settlements_for(&claims.sub, query).await?;
    Ok(Json(page))
}

#[utoipa::path(
    post,
    path = "/api/settlements",
    request_body = SettlementRequest,
    responses(
        (status = 201, description = "Cash settlement recorded", body = SettlementEnvelope),
        (status = 400, description = "Invalid amount or note", body = ErrorResponse),
        (status = 404, description = "Payee not found", body = ErrorResponse),
        (status = 409, description = "Balance already settled", body = ErrorResponse)
    ),
    security(("session" = []))
)]
pub async fn create_settlement(
    State(state): State<Arc<LedgerState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SettlementRequest>,
) -> Result<(StatusCode, Json<SettlementEnvelope>), ApiError> {
    let settlement = state.ledger.create_settlement(&claims.sub, req).await?;
    Ok((StatusCode::CREATED, Json(SettlementEnvelope { settlement })))
}

#[utoipa::path(
    post,
    path = "/api/upi-settlements",
    request_body = UpiSettlementRequest,
    responses(
        (status = 201, description = "Pending UPI settlement created", body = UpiSettlementIntent),
        (status = 400, description = "Invalid amount or recipient has no UPI ID", body = ErrorResponse),
        (status = 404, description = "Payee not found", body = ErrorResponse),
        (status = 409, description = "Balance already settled", body = ErrorResponse)
    ),
    security(("session" = []))
)]
pub async fn create_upi_settlement(
    State(state): State<Arc<LedgerState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpiSettlementRequest>,
) -> Result<(StatusCode, Json<UpiSettlementIntent>), ApiError> {
    let intent = state.ledger.create_upi_settlement(&claims.sub, req).await?;
    Ok((StatusCode::CREATED, Json(intent)))
}

#[utoipa::path(
    put,
    path = "/api/upi-settlements/confirm",
    request_body = ConfirmUpiRequest,
    responses(
        (status = 200, description = "Settlement completed", body = SettlementEnvelope),
        (status = 404, description = "Settlement not found", body = ErrorResponse),
        (status = 409, description = "Settlement no longer pending", body = ErrorResponse)
    ),
    security(("session" = []))
)]
pub async fn confirm_upi_settlement(
    State(state): State<Arc<LedgerState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ConfirmUpiRequest>,
) -> Result<Json<SettlementEnvelope>, ApiError> {
    let settlement = state
        .ledger
        .confirm_upi_payment(&claims.sub, &req.settlement_id, req.transaction_ref.as_deref())
        .await?;
    Ok(Json(SettlementEnvelope { settlement }))
}

#[utoipa::path(
    put,
    path = "/api/upi-settlements/cancel",
    request_body = CancelUpiRequest,
    responses(
        (status = 200, description = "Settlement marked failed", body = SettlementEnvelope),
        (status = 404, description = "Settlement not found", body = ErrorResponse),
        (status = 409, description = "Settlement no longer pending", body = ErrorResponse)
    ),
    security(("session" = []))
)]
pub async fn cancel_upi_settlement(
    State(state): State<Arc<LedgerState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CancelUpiRequest>,
) -> Result<Json<SettlementEnvelope>, ApiError> {
    let settlement = state.ledger.cancel_upi_payment(&claims.sub, &req.settlement_id).await?;
    Ok(Json(SettlementEnvelope { settlement }))
}

#[utoipa::path(
    get,
    path = "/api/activity",
    params(ActivityQuery),
    responses(
        (status = 200, description = "Recent settlement activity, newest first", body = Vec<ActivityEntry>),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse)
    ),
    security(("session" = []))
)]
pub async fn get_recent_activity(
    State(state): State<Arc<LedgerState>>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<ActivityEntry>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT);
    let activity = state.ledger.activity_for(&claims.sub, limit).await?;
    Ok(Json(activity))
}
