use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use gate_core::{
    endpoints, GateConfig, GateError, PolicyId, PolicySpec, PolicyVersion, ReasonCode, SessionId,
    BUILD_INFO,
};
use policy_registry::{parse_version, validate_policy_name};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use store::{PgAuditStore, PgPolicyStore, PgSessionStore, PolicyStore};
use tokio::net::TcpListener;
use tracing::{info, instrument};

struct AppState {
    policy_store: PgPolicyStore,
    session_store: PgSessionStore,
    audit_store: PgAuditStore,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    info!("starting policy-registry {}", BUILD_INFO);

    let config = GateConfig::from_env();
    let pool = store::connect(&config.database_url, 5).await?;

    let state = Arc::new(AppState {
        policy_store: PgPolicyStore::new(pool.clone()),
        session_store: PgSessionStore::new(pool.clone()),
        audit_store: PgAuditStore::new(pool),
    });

    let app = Router::new()
        .route(endpoints::HEALTH, get(health_check))
        .route(endpoints::POLICIES, post(create_policy))
        .route("/policies/:id", put(save_draft))
        .route("/policies/:id/publish", post(publish_policy))
        .route("/policies/published", get(get_published))
        .route("/policies/:id/versions/:version", get(get_version))
        .route("/sessions/:id", get(get_session))
        .route(endpoints::AUDIT, get(list_audit))
        .with_state(state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("policy-registry listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

#[instrument]
async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "policy-registry",
        "version": gate_core::VERSION,
    }))
}

fn error_response(code: ReasonCode, message: impl Into<String>) -> Response {
    let status = StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({ "errorCode": code, "message": message.into() }))).into_response()
}

fn gate_error_response(err: GateError) -> Response {
    let code = err.reason_code();
    error_response(code, err.to_string())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePolicyRequest {
    env_id: String,
    name: String,
    spec: PolicySpec,
}

#[instrument(skip(state, request))]
async fn create_policy(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreatePolicyRequest>,
) -> Response {
    if let Err(reason) = validate_policy_name(&request.name) {
        return error_response(ReasonCode::InvalidInput, reason);
    }
    match state
        .policy_store
        .create_draft(&request.env_id, &request.name, request.spec)
        .await
    {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(err) => gate_error_response(err),
    }
}

#[derive(Debug, Deserialize)]
struct SaveDraftRequest {
    spec: PolicySpec,
}

#[instrument(skip(state, request))]
async fn save_draft(
    State(state): State<Arc<AppState>>,
    Path(id): Path<PolicyId>,
    Json(request): Json<SaveDraftRequest>,
) -> Response {
    match state.policy_store.save_draft(id, request.spec).await {
        Ok(record) => Json(record).into_response(),
        Err(err) => gate_error_response(err),
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PublishRequest {
    #[serde(default)]
    published_by: Option<String>,
}

#[instrument(skip(state, body))]
async fn publish_policy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<PolicyId>,
    body: Option<Json<PublishRequest>>,
) -> Response {
    let published_by = body.map(|Json(r)| r.published_by).unwrap_or(None);
    match state
        .policy_store
        .publish(id, published_by, chrono::Utc::now())
        .await
    {
        Ok(record) => Json(record).into_response(),
        Err(err) => gate_error_response(err),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvQuery {
    env_id: String,
}

#[instrument(skip(state))]
async fn get_published(State(state): State<Arc<AppState>>, Query(q): Query<EnvQuery>) -> Response {
    match state.policy_store.get_published(&q.env_id).await {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => error_response(ReasonCode::PolicyNotFound, "no published policy for environment"),
        Err(err) => gate_error_response(err),
    }
}

#[instrument(skip(state))]
async fn get_version(
    State(state): State<Arc<AppState>>,
    Path((id, version)): Path<(PolicyId, String)>,
) -> Response {
    let version: PolicyVersion = match parse_version(&version) {
        Ok(v) => v,
        Err(reason) => return error_response(ReasonCode::InvalidInput, reason),
    };
    match state.policy_store.get_by_id_and_version(id, version).await {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => error_response(ReasonCode::PolicyNotFound, "no such policy version"),
        Err(err) => gate_error_response(err),
    }
}

#[instrument(skip(state))]
async fn get_session(State(state): State<Arc<AppState>>, Path(id): Path<SessionId>) -> Response {
    match state.session_store.get_by_id(id).await {
        Ok(Some(session)) => Json(session).into_response(),
        Ok(None) => error_response(ReasonCode::PolicyNotFound, "no such session"),
        Err(err) => gate_error_response(err),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuditQuery {
    session_id: SessionId,
}

#[instrument(skip(state))]
async fn list_audit(State(state): State<Arc<AppState>>, Query(q): Query<AuditQuery>) -> Response {
    match state.audit_store.list_for_session(q.session_id).await {
        Ok(entries) => Json(entries).into_response(),
        Err(err) => gate_error_response(err),
    }
}
