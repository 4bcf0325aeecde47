use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use tracing::{debug, info, warn};

use crate::dispatcher::TurnDispatcher;
use crate::events::{EventPayload, SlackEnvelope};

pub const HEALTH_PATH: &str = "/health";

/// Set by Slack on redelivery of an event it considers unacknowledged.
const RETRY_NUM_HEADER: &str = "x-slack-retry-num";
const RETRY_REASON_HEADER: &str = "x-slack-retry-reason";

/// Only a timed-out delivery was received by us. Other retry reasons mean
/// the first attempt never reached the handler.
const RETRY_REASON_TIMEOUT: &str = "http_timeout";

/// Webhook routes: `POST events_path` for the Events API and `GET /health`.
pub fn events_router(dispatcher: TurnDispatcher, events_path: &str) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(health))
        .route(events_path, post(handle_events))
        .with_state(dispatcher)
}

async fn health() -> impl IntoResponse {
    StatusCode::OK
}

async fn handle_events(
    State(dispatcher): State<TurnDispatcher>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let envelope: SlackEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("Rejecting malformed event payload: {e}");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    match envelope {
        SlackEnvelope::UrlVerification { challenge } => {
            info!("Answering URL verification challenge");
            ([(header::CONTENT_TYPE, "text/plain")], challenge).into_response()
        }
        SlackEnvelope::EventCallback { event, event_id } => {
            if is_duplicate_delivery(&headers) {
                debug!("Ignoring timed-out redelivery of event {event_id:?}");
                return StatusCode::OK.into_response();
            }
            if let EventPayload::Message(message) = event {
                dispatcher.dispatch(message.into_incoming());
            }
            StatusCode::OK.into_response()
        }
        SlackEnvelope::Unsupported => StatusCode::OK.into_response(),
    }
}

fn is_duplicate_delivery(headers: &HeaderMap) -> bool {
    if !headers.contains_key(RETRY_NUM_HEADER) {
        return false;
    }
    headers
        .get(RETRY_REASON_HEADER)
        .and_then(|reason| reason.to_str().ok())
        .is_some_and(|reason| reason.eq_ignore_ascii_case(RETRY_REASON_TIMEOUT))
}
