//! HTTP handlers for the `/chat` and `/internal/*` surface (§6.1, §4.7).
//!
//! Identity is supplied by an upstream, out-of-scope auth provider as two
//! verified request headers: `x-user-id` (opaque, provider-issued) and an
//! optional `x-user-role` claim. This module never reads a role from the
//! JSON body — I8 holds by construction, since `ChatRequest` has no role
//! field to read.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::AppState;
use crate::command::ScheduledCommand;
use crate::parser::{self, Action, CommandKind};
use crate::policy::{ResolvedIdentity, Role};
use crate::types::{CommandId, Error, ExecutionId, Result, UserId};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    message: Option<Value>,
}

/// Resolves the verified caller from request headers (§4.7 step 1).
async fn resolve_identity(state: &AppState, headers: &HeaderMap) -> Result<ResolvedIdentity> {
    let user_id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::unauthorized("missing or empty x-user-id header"))?;
    let role_claim = headers.get("x-user-role").and_then(|v| v.to_str().ok());

    let user_id = UserId::from_string(user_id.to_string())
        .map_err(|e| Error::unauthorized(format!("invalid user id: {e}")))?;
    Ok(state.identity.resolve(user_id, role_claim).await)
}

/// `POST /chat` (§4.7, §6.1).
pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ChatRequest>,
) -> Result<Json<Value>> {
    let identity = resolve_identity(&state, &headers).await?;

    // Parse step 2: `message` must be present and a string (validation error
    // otherwise, not a panic).
    let message = req
        .message
        .as_ref()
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::validation("`message` must be a non-empty string"))?;
    crate::validation::validate_non_empty(message, "message")?;

    let parsed = parser::parse(message);

    let body = match parsed.kind {
        CommandKind::Help => handle_help(&identity),
        CommandKind::Read => handle_read(&state).await,
        CommandKind::DryRun => handle_dry_run(&state, &parsed).await,
        CommandKind::Execute => handle_execute(&state, &identity, parsed).await?,
    };

    Ok(Json(body))
}

/// §4.7 step 4 — role-tailored help document, answered synchronously.
fn handle_help(identity: &ResolvedIdentity) -> Value {
    let commands = match identity.role {
        Role::Admin => json!([
            "scale <deployment> to <N>",
            "restart",
            "dry run scale <deployment> to <N>",
            "status"
        ]),
        _ => json!(["scale <deployment> to <N>", "restart", "status"]),
    };
    json!({
        "type": "HELP",
        "help": {
            "role": identity.role,
            "commands": commands,
        }
    })
}

/// §4.7 step 5 — read-only, never enqueues.
async fn handle_read(state: &AppState) -> Value {
    let execution_id = ExecutionId::new();
    let k8s_status = state.adapter.status(&execution_id).await;
    let snapshot = state.execution_state.snapshot().await;

    match k8s_status {
        Ok(status) => json!({
            "type": "READ",
            "subtype": "status",
            "k8s": status,
            "system": snapshot,
        }),
        Err(err) => json!({
            "type": "READ",
            "subtype": "status",
            "k8sError": err.public_message(),
            "system": snapshot,
        }),
    }
}

/// §4.7 step 6 — preview only, never enqueues. Fetching current status is
/// best-effort; its failure is not fatal to the preview.
async fn handle_dry_run(state: &AppState, parsed: &parser::ParsedCommand) -> Value {
    let execution_id = ExecutionId::new();
    let current = state.adapter.status(&execution_id).await.ok();

    let mut warnings = Vec::new();
    let mut would_execute = true;
    let mut direction = "no-change";

    match parsed.action {
        Some(Action::Scale) => {
            let requested = parsed.target_replicas.unwrap_or(0);
            let floor = state.config.kubernetes.replica_floor as i64;
            let ceiling = state.config.kubernetes.replica_ceiling as i64;
            if requested < floor || requested > ceiling {
                would_execute = false;
                warnings.push(format!(
                    "targetReplicas {requested} is outside the allowed bound [{floor}, {ceiling}]"
                ));
            }
            if let Some(ref status) = current {
                direction = if requested as i32 > status.replicas {
                    "scale-up"
                } else if requested as i32 < status.replicas {
                    "scale-down"
                } else {
                    "no-change"
                };
            }
        }
        Some(Action::Restart) => {
            direction = "restart";
        }
        None => {
            would_execute = false;
            warnings.push("no recognized action in the dry-run request".to_string());
        }
    }

    json!({
        "type": "DRY_RUN",
        "preview": {
            "action": parsed.action,
            "targetReplicas": parsed.target_replicas,
            "current": current,
        },
        "simulation": {
            "wouldExecute": would_execute,
            "direction": direction,
            "warnings": warnings,
        }
    })
}

/// §4.7 step 7 — validate, quota-gate, snapshot `before`, enqueue, and
/// return the acceptance payload. Returns *before* the worker executes.
async fn handle_execute(
    state: &AppState,
    identity: &ResolvedIdentity,
    parsed: parser::ParsedCommand,
) -> Result<Value> {
    if parsed.action == Some(Action::Scale) {
        let requested = parsed.target_replicas.unwrap_or(0);
        crate::validation::validate_replica_bounds(requested, &state.config.kubernetes)?;
    }

    if !identity.execute_allowed {
        return Err(Error::quota_exceeded(format!(
            "user {} has exhausted the FREE-tier quota",
            identity.user_id
        )));
    }

    let command_id = CommandId::new();
    let execution_id = ExecutionId::new();
    let before = state.adapter.status(&execution_id).await.ok();

    let scheduled = ScheduledCommand {
        id: command_id.clone(),
        execution_id: execution_id.clone(),
        user_id: identity.user_id.clone(),
        priority: identity.priority,
        timestamp_ms: Utc::now().timestamp_millis(),
        parsed,
    };

    if identity.role == Role::Free {
        state.identity.increment_quota(&identity.user_id).await;
    }

    let queue_position = state.queue.enqueue(scheduled).await;

    tracing::info!(
        execution_id = %execution_id,
        command_id = %command_id,
        user_id = %identity.user_id,
        phase = "queued",
        "EXECUTE command enqueued"
    );

    let quota_remaining_after = if identity.role == Role::Free {
        Some(state.identity.quota_remaining(&identity.user_id).await)
    } else {
        None
    };

    Ok(json!({
        "status": "accepted",
        "commandId": command_id,
        "executionId": execution_id,
        "before": before,
        "execution": {
            "priority": identity.priority,
            "priorityLabel": identity.role,
            "queuePosition": queue_position,
        },
        "user": {
            "role": identity.role,
            "quotaRemaining": quota_remaining_after,
        }
    }))
}

/// `GET /internal/status` (§6.1) — requires only authentication.
pub async fn status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    resolve_identity(&state, &headers).await?;
    let snapshot = state.execution_state.snapshot().await;
    Ok(Json(json!({
        "timestamp": Utc::now(),
        "system": {
            "workerStatus": snapshot.worker_status,
            "queueLength": snapshot.queue_length,
            "currentCommand": snapshot.current_command,
            "lastResult": snapshot.last_result,
        }
    })))
}

/// `GET /internal/health` (§6.1) — requires an ADMIN-role claim (403
/// otherwise); adds `mutex`, `uptimeMs`, `lastError` to the status payload.
pub async fn health(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let identity = resolve_identity(&state, &headers).await?;
    if identity.role != Role::Admin {
        return Err(Error::forbidden("GET /internal/health requires the ADMIN role"));
    }

    let snapshot = state.execution_state.snapshot().await;
    Ok(Json(json!({
        "timestamp": Utc::now(),
        "system": {
            "workerStatus": snapshot.worker_status,
            "queueLength": snapshot.queue_length,
            "currentCommand": snapshot.current_command,
            "lastResult": snapshot.last_result,
        },
        "mutex": snapshot.mutex_status,
        "uptimeMs": snapshot.uptime_ms,
        "lastError": snapshot.last_error,
    })))
}
