//!
//! biogate HTTP server
//! --------------------
//! Axum-based HTTP API in front of the biometric bridge.
//!
//! Responsibilities:
//! - Authentication and enrollment endpoints delegating to `BiometricBridge`.
//! - Read-only listing of enrolled subjects from the external program's store.
//! - Mapping every outcome to a JSON body; non-2xx only when no process ran.
//! - Startup logs describing the bridge directory and program availability.

use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::FutureExt; // for catch_unwind on async blocks
use tracing::{error, info, warn, Instrument};

use crate::bridge::{AuthRequest, AuthResult, BiometricBridge, Termination};
use crate::config::BridgeConfig;
use crate::error::{AppError, AppResult};
use crate::store;

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub bridge: BiometricBridge,
}

impl AppState {
    pub fn new(config: BridgeConfig) -> Self {
        Self { bridge: BiometricBridge::new(config) }
    }
}

fn log_startup_folders(cfg: &BridgeConfig) {
    let cwd = std::env::current_dir().ok();
    let exe = std::env::current_exe().ok();
    info!(
        target: "startup",
        "biogate starting. cwd={:?}, exe={:?}, bridge_dir={:?}, interpreters={:?}, timeout_secs={}",
        cwd, exe, cfg.bridge_dir, cfg.interpreters, cfg.timeout.as_secs_f64()
    );

    let auth = cfg.auth_program_path();
    let enroll = cfg.enroll_program_path();
    let store_path = cfg.store_path();
    info!(
        target: "startup",
        "Path existence: bridge_dir_exists={}, auth_program_exists={}, enroll_program_exists={}, store_exists={}",
        cfg.bridge_dir.exists(), auth.exists(), enroll.exists(), store_path.exists()
    );
    if !auth.exists() || !enroll.exists() {
        warn!(
            target: "startup",
            auth_program = %auth.display(),
            enroll_program = %enroll.display(),
            "biometric programs missing; requests will report the program's own failure"
        );
    }
}

/// Build the router. Split from [`run_with_config`] so tests can drive it directly.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "biogate ok" }))
        .route("/api/python/authenticate", post(authenticate_handler))
        .route("/api/python/execute", post(execute_handler))
        .route("/api/users", get(users_handler))
        .with_state(state)
}

/// Start the HTTP server bound to `config.http_port`.
pub async fn run_with_config(config: BridgeConfig) -> anyhow::Result<()> {
    log_startup_folders(&config);
    let port = config.http_port;
    let app = router(AppState::new(config));

    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Convenience entry point configured purely from the environment.
pub async fn run() -> anyhow::Result<()> {
    run_with_config(BridgeConfig::from_env()).await
}

fn status_for(result: &AuthResult) -> StatusCode {
    match result.termination {
        Termination::LaunchFailed => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::OK,
    }
}

fn respond(outcome: AppResult<AuthResult>) -> Response {
    match outcome {
        Ok(result) => (status_for(&result), Json(result)).into_response(),
        Err(e) => {
            warn!(code = e.code_str(), "request refused: {}", e.message());
            e.into_response()
        }
    }
}

async fn guarded(bridge: BiometricBridge, request: AppResult<AuthRequest>, route: &'static str) -> Response {
    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("request", %request_id, route);
    let fut = async move {
        let request = match request {
            Ok(r) => r,
            Err(e) => return respond(Err(e)),
        };
        info!(action = %request.action, "biometric request received");
        respond(bridge.authenticate_or_enroll(request).await)
    };
    match AssertUnwindSafe(fut).catch_unwind().instrument(span).await {
        Ok(resp) => resp,
        Err(panic) => {
            let msg = if let Some(s) = panic.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic".to_string()
            };
            error!(request_id = %request_id, "handler panicked: {}", msg);
            AppError::internal("internal_error".to_string(), format!("Authentication service error: {msg}")).into_response()
        }
    }
}

async fn authenticate_handler(State(state): State<AppState>) -> Response {
    guarded(state.bridge, Ok(AuthRequest::authenticate()), "authenticate").await
}

async fn execute_handler(State(state): State<AppState>, body: Bytes) -> Response {
    guarded(state.bridge, AuthRequest::from_json(&body), "execute").await
}

async fn users_handler(State(state): State<AppState>) -> Response {
    let path = state.bridge.config().store_path();
    let listed = tokio::task::spawn_blocking(move || store::list_enrolled(&path)).await;
    match listed {
        Ok(Ok(listing)) => (StatusCode::OK, Json(listing)).into_response(),
        Ok(Err(e)) => {
            error!("Error reading enrollment file: {}", e);
            AppError::from(e).into_response()
        }
        Err(join_err) => {
            error!("enrollment listing task failed: {}", join_err);
            AppError::internal("internal_error".to_string(), join_err.to_string()).into_response()
        }
    }
}
