use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::models::{EventOutcome, InboundEvent};
use crate::services::summary::messages;
use crate::state::AppState;
use crate::utils::error::ApiError;

/// Hand one chat event to the summarization flow. The outcome tells the host
/// whether to reply and whether other plugins still get to see the event.
pub async fn event_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<InboundEvent>, JsonRejection>,
) -> Result<Json<EventOutcome>, ApiError> {
    let Json(event) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if event.session_id.trim().is_empty() || event.user_id.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "session_id and user_id are required".to_string(),
        ));
    }

    info!(
        "Event {:?} from {} (group: {})",
        event.kind,
        event.key(),
        event.is_group
    );

    let outcome = state.controller.handle(&event).await;
    Ok(Json(outcome))
}

#[derive(Serialize)]
pub struct HelpResponse {
    help: String,
}

pub async fn help_handler(State(state): State<Arc<AppState>>) -> Json<HelpResponse> {
    Json(HelpResponse {
        help: messages::help_text(&state.settings),
    })
}
