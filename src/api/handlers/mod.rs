use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use super::AppState;
use crate::composer::{ComposeError, SessionComposer, StartSessionInput};
use crate::models::*;

type ApiError = (StatusCode, String);

// ============================================================
// Error Handling
// ============================================================

/// Log an internal error and return a sanitized response to the client.
///
/// Validation errors are safe to expose and come back as BAD_REQUEST with
/// their message. Anything else is logged and hidden behind a generic 500.
fn internal_error(e: anyhow::Error) -> ApiError {
    if let Some(validation) = e.downcast_ref::<ValidationError>() {
        tracing::warn!("Validation error: {:#}", e);
        return (StatusCode::BAD_REQUEST, validation.to_string());
    }

    tracing::error!("Internal error: {:#}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

/// Map engine errors to their HTTP status.
fn compose_error(e: ComposeError) -> ApiError {
    let status = match &e {
        ComposeError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ComposeError::UnknownComponent(_) | ComposeError::NotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        ComposeError::CatalogUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    tracing::warn!("Compose error: {}", e);
    (status, e.to_string())
}

fn draft_not_found() -> ApiError {
    (StatusCode::NOT_FOUND, "Draft not found".to_string())
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Drill catalog
// ============================================================

pub async fn list_drills(
    State(state): State<AppState>,
    Query(query): Query<DrillQuery>,
) -> Result<Json<Vec<Drill>>, ApiError> {
    state.db.query_drills(&query).map(Json).map_err(internal_error)
}

pub async fn create_drill(
    State(state): State<AppState>,
    Json(input): Json<CreateDrillInput>,
) -> Result<(StatusCode, Json<Drill>), ApiError> {
    state
        .db
        .create_drill(input)
        .map(|d| (StatusCode::CREATED, Json(d)))
        .map_err(internal_error)
}

pub async fn get_drill(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Drill>, ApiError> {
    state
        .db
        .get_drill(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Drill not found".to_string()))
}

pub async fn delete_drill(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.db.delete_drill(id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Drill not found".to_string()))
    }
}

// ============================================================
// Drafts
// ============================================================

pub async fn create_draft(
    State(state): State<AppState>,
    Json(input): Json<StartSessionInput>,
) -> Result<(StatusCode, Json<DraftResponse>), ApiError> {
    let composer = SessionComposer::start(input, state.catalog.clone()).map_err(compose_error)?;
    let view = composer.snapshot();
    let id = state.drafts.lock().await.insert(composer);

    Ok((StatusCode::CREATED, Json(DraftResponse { id, view })))
}

pub async fn get_draft(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DraftResponse>, ApiError> {
    let mut drafts = state.drafts.lock().await;
    let composer = drafts.get_mut(&id).ok_or_else(draft_not_found)?;
    Ok(Json(DraftResponse {
        id,
        view: composer.snapshot(),
    }))
}

pub async fn discard_draft(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    match state.drafts.lock().await.remove(&id) {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err(draft_not_found()),
    }
}

pub async fn retime_component(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<RetimeInput>,
) -> Result<Json<RetimeResponse>, ApiError> {
    let mut drafts = state.drafts.lock().await;
    let composer = drafts.get_mut(&id).ok_or_else(draft_not_found)?;
    let outcome = composer
        .retime(&input.component, input.delta)
        .map_err(compose_error)?;
    Ok(Json(RetimeResponse {
        outcome,
        view: composer.snapshot(),
    }))
}

pub async fn open_catalog(
    State(state): State<AppState>,
    Path((id, component)): Path<(Uuid, String)>,
    Query(filter): Query<CatalogFilter>,
) -> Result<Json<Vec<Drill>>, ApiError> {
    let catalog = {
        let mut drafts = state.drafts.lock().await;
        let composer = drafts.get_mut(&id).ok_or_else(draft_not_found)?;
        composer.catalog_for(&component).map_err(compose_error)?
    };

    // Other drafts stay usable while this fetch is in flight
    let matches = catalog
        .fetch_filtered(&component, filter.difficulty)
        .await
        .map_err(compose_error)?;
    Ok(Json(matches.collect()))
}

pub async fn add_drill(
    State(state): State<AppState>,
    Path((id, component)): Path<(Uuid, String)>,
    Json(input): Json<AddDrillInput>,
) -> Result<(StatusCode, Json<AssignmentResponse>), ApiError> {
    let mut drafts = state.drafts.lock().await;
    let composer = drafts.get_mut(&id).ok_or_else(draft_not_found)?;
    let assignment_id = composer
        .add_drill(&component, input.drill)
        .map_err(compose_error)?;
    Ok((
        StatusCode::CREATED,
        Json(AssignmentResponse {
            assignment_id,
            view: composer.snapshot(),
        }),
    ))
}

pub async fn remove_drill(
    State(state): State<AppState>,
    Path((id, component, assignment_id)): Path<(Uuid, String, Uuid)>,
) -> Result<Json<DraftResponse>, ApiError> {
    let mut drafts = state.drafts.lock().await;
    let composer = drafts.get_mut(&id).ok_or_else(draft_not_found)?;
    composer
        .remove_drill(&component, assignment_id.into())
        .map_err(compose_error)?;
    Ok(Json(DraftResponse {
        id,
        view: composer.snapshot(),
    }))
}

/// Persist a draft. The draft is only discarded once the save succeeds, so
/// a failed save can be corrected and retried.
pub async fn save_draft(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<SaveDraftInput>,
) -> Result<(StatusCode, Json<SavedSession>), ApiError> {
    let mut drafts = state.drafts.lock().await;
    let view = drafts
        .get_mut(&id)
        .ok_or_else(draft_not_found)?
        .snapshot();

    let saved = state
        .db
        .save_session(SaveSessionInput {
            name: input.name,
            view,
        })
        .map_err(internal_error)?;

    drafts.remove(&id);
    tracing::info!(draft_id = %id, session_id = %saved.id, "Saved draft");

    Ok((StatusCode::CREATED, Json(saved)))
}

// ============================================================
// Saved sessions
// ============================================================

pub async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<Vec<SessionSummary>>, ApiError> {
    state.db.list_sessions().map(Json).map_err(internal_error)
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SavedSession>, ApiError> {
    state
        .db
        .get_session(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Session not found".to_string()))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.db.delete_session(id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Session not found".to_string()))
    }
}
