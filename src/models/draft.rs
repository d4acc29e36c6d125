use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::drill::{deserialize_difficulty_filter, Difficulty, Drill};
use crate::composer::{AdjustOutcome, AssignmentId, SessionView};

/// A draft is an in-progress session build held by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftResponse {
    pub id: Uuid,
    pub view: SessionView,
}

/// Body of `POST /drafts/{id}/retime`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetimeInput {
    pub component: String,
    /// Minutes to add (negative to remove). Normally a multiple of 5.
    pub delta: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetimeResponse {
    pub outcome: AdjustOutcome,
    pub view: SessionView,
}

/// Body of `POST /drafts/{id}/components/{component}/assignments`.
///
/// Carries the full drill as returned by the catalog, so the draft needs no
/// second catalog round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddDrillInput {
    pub drill: Drill,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentResponse {
    pub assignment_id: AssignmentId,
    pub view: SessionView,
}

/// Query string for opening a draft component's catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFilter {
    #[serde(default, deserialize_with = "deserialize_difficulty_filter")]
    pub difficulty: Option<Difficulty>,
}

/// Body of `POST /drafts/{id}/save`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveDraftInput {
    pub name: String,
}
