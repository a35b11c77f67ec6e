use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use cadence_core::{AutomationId, ScheduledEmailId};
use cadence_email::{EmailProvider, EmailProviderConfig};
use cadence_reactor::{Reactor, ReactorConfig, RunSummary};
use cadence_rules::{GeocodeCache, GeocoderClient};
use cadence_store::MemoryScheduledEmailStore;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::memory_datasource::MemoryDataSource;

/// Shared application state passed to every handler (§6 "POST /v1/run").
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MemoryScheduledEmailStore>,
    pub datasource: Arc<MemoryDataSource>,
    pub email_provider: Arc<EmailProvider>,
    pub email_config: Arc<EmailProviderConfig>,
    pub geocodes: Arc<GeocodeCache>,
    pub geocoder: Arc<GeocoderClient>,
    pub reactor_config: Arc<ReactorConfig>,
}

impl AppState {
    fn reactor(&self) -> Reactor<'_> {
        Reactor {
            store: self.store.as_ref(),
            data: self.datasource.as_ref(),
            verifier_data: self.datasource.as_ref(),
            sender_data: self.datasource.as_ref(),
            email_provider: self.email_provider.as_ref(),
            email_config: self.email_config.as_ref(),
            geocodes: self.geocodes.as_ref(),
            geocoder: self.geocoder.as_ref(),
            config: self.reactor_config.as_ref(),
        }
    }
}

/// Build the Axum router with the scheduler RPC and liveness routes (§6).
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/run", post(run))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// `GET /healthz` -- liveness probe.
async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// Body of `POST /v1/run` (§6 "Scheduler trigger surface"). An absent or
/// empty body is valid and defaults `action` to `"daily"`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RunRequest {
    action: Option<String>,
    automation_id: Option<AutomationId>,
    scheduled_email_id: Option<ScheduledEmailId>,
    account_offset: Option<usize>,
}

/// `POST /v1/run` -- a single RPC surface dispatching to the reactor
/// (§4.6, §6). Missing or unparsable bodies fall back to `{action: daily}`.
async fn run(State(state): State<AppState>, body: axum::body::Bytes) -> impl IntoResponse {
    let req: RunRequest = if body.is_empty() {
        RunRequest::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(req) => req,
            Err(e) => {
                let mut summary = RunSummary::for_action("daily");
                summary.errors.push(format!("invalid request body: {e}"));
                return (StatusCode::BAD_REQUEST, Json(summary));
            }
        }
    };

    let reactor = state.reactor();
    let action = req.action.as_deref().unwrap_or("daily");

    let summary = match action {
        "daily" => reactor.daily().await,
        "refresh" => match req.automation_id {
            Some(id) => reactor.refresh(id, req.account_offset.unwrap_or(0)).await,
            None => missing_field_summary("refresh", "automationId"),
        },
        "verify" => reactor.verify().await,
        "send" => match req.scheduled_email_id {
            Some(id) => reactor.send_specific(id).await,
            None => reactor.send().await,
        },
        "process" => reactor.process().await,
        "activate" => match req.automation_id {
            Some(id) => reactor_result_summary(reactor.activate(id).await),
            None => missing_field_summary("activate", "automationId"),
        },
        "deactivate" => match req.automation_id {
            Some(id) => reactor_result_summary(reactor.deactivate(id).await),
            None => missing_field_summary("deactivate", "automationId"),
        },
        other => {
            let mut summary = RunSummary::for_action(other);
            summary.errors.push(format!("unknown action {other:?}"));
            summary
        }
    };

    (StatusCode::OK, Json(summary))
}

fn missing_field_summary(action: &str, field: &str) -> RunSummary {
    let mut summary = RunSummary::for_action(action);
    summary.errors.push(format!("{field} is required for action {action:?}"));
    summary
}

fn reactor_result_summary(result: Result<RunSummary, cadence_reactor::ReactorError>) -> RunSummary {
    match result {
        Ok(summary) => summary,
        Err(e) => {
            let mut summary = RunSummary::for_action("error");
            summary.errors.push(e.to_string());
            summary
        }
    }
}
