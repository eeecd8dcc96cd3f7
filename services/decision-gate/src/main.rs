//! # Decision Gate
//!
//! The runtime policy decision endpoint (C7): authenticates, fetches the
//! published policy, locks or creates the session, evaluates, redacts,
//! audits, and writes back mutated session state — all inside one
//! per-session critical section (spec §4.7, §5).

use audit_log::{redact, AuditRecorder};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use credential_gate::{ApiKeyGate, PresentedKey, RateLimiter};
use decision_gate::validate_request;
use gate_core::{
    endpoints, AuditEntry, CallRequest, DecisionOutcome, DecisionReason, DecisionResponse,
    GateConfig, ReasonCode, BUILD_INFO,
};
use policy_engine::Evaluator;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use store::{PgApiKeyStore, PgAuditStore, PgPolicyStore, PgRateLimitStore, PgSessionStore};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{error, info, instrument, warn};

struct AppState {
    config: GateConfig,
    policy_store: PgPolicyStore,
    session_store: PgSessionStore,
    api_key_store: PgApiKeyStore,
    rate_limit_store: PgRateLimitStore,
    audit_store: PgAuditStore,
    evaluator: Evaluator,
    api_key_gate: ApiKeyGate,
    rate_limiter: RateLimiter,
    audit_recorder: AuditRecorder,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = GateConfig::from_env();
    info!("starting decision-gate {}", BUILD_INFO);

    let pool = store::connect(&config.database_url, 10).await?;
    let state = Arc::new(AppState {
        rate_limiter: RateLimiter::new(config.rate_limit_requests_per_minute),
        policy_store: PgPolicyStore::new(pool.clone()),
        session_store: PgSessionStore::new(pool.clone()),
        api_key_store: PgApiKeyStore::new(pool.clone()),
        rate_limit_store: PgRateLimitStore::new(pool.clone()),
        audit_store: PgAuditStore::new(pool),
        evaluator: Evaluator::new(),
        api_key_gate: ApiKeyGate::new(),
        audit_recorder: AuditRecorder::new(),
        config,
    });

    let app = Router::new()
        .route(endpoints::HEALTH, get(health_check))
        .route(endpoints::RUNTIME_CHECK, post(runtime_check))
        .layer(CorsLayer::permissive())
        .with_state(state.clone());

    let listener = TcpListener::bind(&state.config.bind_addr).await?;
    info!("decision-gate listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

#[instrument]
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "decision-gate", "version": gate_core::VERSION }))
}

fn error_response(code: ReasonCode, message: impl Into<String>, duration_ms: i64) -> Response {
    let body = DecisionResponse {
        allowed: false,
        error_code: Some(code),
        decision_reasons: vec![DecisionReason::new(code, message)],
        policy_version_used: None,
        policy_hash: None,
        state_before: None,
        state_after: None,
        counters: None,
        execution_duration_ms: duration_ms,
    };
    let status = StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if code == ReasonCode::RateLimited {
        (status, [("Retry-After", "60")], Json(body)).into_response()
    } else {
        (status, Json(body)).into_response()
    }
}

fn elapsed_ms(t0: Instant) -> i64 {
    t0.elapsed().as_millis() as i64
}

#[instrument(skip(state, headers, body))]
async fn runtime_check(State(state): State<Arc<AppState>>, headers: HeaderMap, body: axum::body::Bytes) -> Response {
    let t0 = Instant::now();
    let deadline = Duration::from_millis(state.config.request_deadline_ms);
    match tokio::time::timeout(deadline, process(state, headers, body, t0)).await {
        Ok(response) => response,
        Err(_) => error_response(ReasonCode::InternalError, "request exceeded its deadline", elapsed_ms(t0)),
    }
}

/// The orchestration pipeline (§4.7), wrapped by [`runtime_check`] in a
/// per-request deadline so a stalled downstream call cannot hold a session
/// lock indefinitely (§5 cancellation).
async fn process(state: Arc<AppState>, headers: HeaderMap, body: axum::body::Bytes, t0: Instant) -> Response {
    let now_ms = Utc::now().timestamp_millis();

    if body.len() > state.config.max_payload_bytes {
        return error_response(
            ReasonCode::PayloadTooLarge,
            format!("payload exceeds {} bytes", state.config.max_payload_bytes),
            elapsed_ms(t0),
        );
    }

    let presented = match headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        Some(v) => v,
        None => return error_response(ReasonCode::InvalidApiKey, "missing x-api-key header", elapsed_ms(t0)),
    };

    let parsed_key = match PresentedKey::parse(
        presented,
        state.config.api_key_prefix_length,
        state.config.api_key_min_length,
    ) {
        Some(k) => k,
        None => return error_response(ReasonCode::InvalidApiKey, "malformed api key", elapsed_ms(t0)),
    };

    let candidates = match state.api_key_store.candidates_for_prefix(parsed_key.prefix).await {
        Ok(c) => c,
        Err(err) => return error_response(err.reason_code(), err.to_string(), elapsed_ms(t0)),
    };

    let api_key = match state.api_key_gate.authenticate(parsed_key.full, &candidates) {
        Ok(key) => key,
        Err(err) => return error_response(err.reason_code(), err.to_string(), elapsed_ms(t0)),
    };

    if let Err(err) = state.rate_limiter.check(&state.rate_limit_store, api_key.id, now_ms).await {
        return error_response(err.reason_code(), err.to_string(), elapsed_ms(t0));
    }

    let request: CallRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => return error_response(ReasonCode::InvalidInput, e.to_string(), elapsed_ms(t0)),
    };
    if let Err(message) = validate_request(&request) {
        return error_response(ReasonCode::InvalidInput, message, elapsed_ms(t0));
    }

    let env_id = &api_key.env_id;

    let policy = match state.policy_store.get_published(env_id).await {
        Ok(Some(p)) => p,
        Ok(None) => {
            return error_response(ReasonCode::PolicyNotFound, format!("no published policy for {env_id}"), elapsed_ms(t0))
        }
        Err(err) => return error_response(err.reason_code(), err.to_string(), elapsed_ms(t0)),
    };

    let session = match state
        .session_store
        .get_or_create(
            env_id,
            &request.session_id,
            &request.agent_id,
            policy.id,
            policy.version,
            policy.spec.initial_state(),
            initial_counters(&policy.spec),
            request.metadata.clone().unwrap_or_else(|| json!({})),
            Utc::now(),
        )
        .await
    {
        Ok(s) => s,
        Err(err) => return error_response(err.reason_code(), err.to_string(), elapsed_ms(t0)),
    };

    let locked = match state.session_store.lock(session.id).await {
        Ok(l) => l,
        Err(err) => return error_response(err.reason_code(), err.to_string(), elapsed_ms(t0)),
    };

    let locked_version = match state
        .policy_store
        .get_by_id_and_version(session.policy_id, session.policy_version_locked)
        .await
    {
        Ok(Some(v)) => v,
        Ok(None) => {
            let _ = locked.release().await;
            return error_response(ReasonCode::PolicyNotFound, "locked policy version unavailable", elapsed_ms(t0));
        }
        Err(err) => {
            let _ = locked.release().await;
            return error_response(err.reason_code(), err.to_string(), elapsed_ms(t0));
        }
    };

    let snapshot = locked.session.snapshot();
    let outcome = state.evaluator.evaluate(&locked_version.spec, &snapshot, &request, now_ms);

    let redacted_payload = redact(&request.payload);
    let audit_entry = AuditEntry {
        id: uuid::Uuid::new_v4(),
        execution_session_id: locked.session.id,
        timestamp: Utc::now(),
        tool_name: request.tool_name.clone(),
        action_type: request.action_type.or_else(|| policy.spec.rule_for(&request.tool_name).and_then(|r| r.action_type)),
        redacted_payload,
        decision: DecisionOutcome::from(outcome.allowed),
        reasons: outcome.reasons.clone(),
        error_code: outcome.error_code,
        policy_id: session.policy_id,
        policy_version_used: session.policy_version_locked,
        policy_hash: locked_version.hash.clone(),
        state_before: snapshot.current_state.clone(),
        state_after: outcome.new_state.clone(),
        counters_before: snapshot.counters.clone(),
        counters_after: outcome.new_counters.clone(),
        execution_duration_ms: elapsed_ms(t0),
    };
    state.audit_recorder.record(&state.audit_store, audit_entry).await;

    if outcome.allowed {
        let mut new_history = locked.session.tool_calls_history.clone();
        new_history.push(request.tool_name.clone());
        if new_history.len() > state.config.max_history_length {
            let overflow = new_history.len() - state.config.max_history_length;
            new_history.drain(0..overflow);
        }
        let mut last_times = locked.session.last_tool_call_times.clone();
        last_times.insert(request.tool_name.clone(), now_ms);

        let mutation = gate_core::SessionMutation {
            new_state: outcome.new_state.clone(),
            new_counters: outcome.new_counters.clone(),
            new_history,
            new_tool_call_counts: outcome.new_tool_call_counts.clone(),
            new_last_tool_call_times: last_times,
        };
        if let Err(err) = locked.update_state(mutation, Utc::now()).await {
            warn!(error = %err, "session state write failed after an allowed decision; decision already returned");
        }
    } else if let Err(err) = locked.release().await {
        error!(error = %err, "failed to release session lock");
    }

    let response = DecisionResponse {
        allowed: outcome.allowed,
        error_code: outcome.error_code,
        decision_reasons: outcome.reasons,
        policy_version_used: Some(session.policy_version_locked),
        policy_hash: Some(locked_version.hash),
        state_before: Some(snapshot.current_state),
        state_after: Some(outcome.new_state),
        counters: Some(outcome.new_counters),
        execution_duration_ms: elapsed_ms(t0),
    };
    (StatusCode::OK, Json(response)).into_response()
}

fn initial_counters(spec: &gate_core::PolicySpec) -> std::collections::HashMap<String, i64> {
    spec.counters
        .iter()
        .flatten()
        .map(|c| (c.name.clone(), c.initial_value))
        .collect()
}

