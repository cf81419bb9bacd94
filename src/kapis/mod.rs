//! # kapis Web Service
//!
//! `devops.kubesphere.io/v1alpha3` HTTP endpoints served next to the probes.
//!
//! `POST /kapis/devops.kubesphere.io/v1alpha3/jenkinsEvent/{eventType}` takes a
//! Jenkins event document and publishes it on the [`EventNotifier`]. The path
//! parameter is informational; the event type is read from the body.

use crate::constants::KAPIS_PREFIX;
use crate::events::{EventError, EventNotifier, JenkinsEvent};
use crate::observability::metrics;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors returned to the webhook caller
#[derive(Debug, Error)]
pub enum KapiError {
    #[error(transparent)]
    BadRequest(#[from] EventError),
}

impl IntoResponse for KapiError {
    fn into_response(self) -> Response {
        match &self {
            KapiError::BadRequest(_) => {
                metrics::increment_webhook_requests("bad_request");
                warn!(error = %self, "rejected Jenkins event");
                let body = json!({
                    "code": StatusCode::BAD_REQUEST.as_u16(),
                    "reason": "BadRequest",
                    "message": self.to_string(),
                });
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
        }
    }
}

#[derive(Debug, Clone)]
struct KapiState {
    notifier: Arc<EventNotifier>,
}

/// Router for the kapis endpoints, ready to merge into the main server
pub fn router(notifier: Arc<EventNotifier>, body_limit: usize) -> Router {
    Router::new()
        .route(
            &format!("{KAPIS_PREFIX}/jenkinsEvent/{{eventType}}"),
            post(jenkins_event_handler),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(KapiState { notifier })
}

async fn jenkins_event_handler(
    State(state): State<KapiState>,
    Path(path_type): Path<String>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, KapiError> {
    let event = JenkinsEvent::from_slice(&body)?.to_event()?;
    debug!(
        path_type = %path_type,
        event_type = %event.event_type,
        project = %event.args.pipeline_state.project_id,
        pipeline = %event.args.pipeline_state.pipeline,
        "received Jenkins event"
    );

    state.notifier.notify(&event);
    metrics::increment_webhook_requests("ok");

    Ok(Json(json!({ "ok": true })))
}
