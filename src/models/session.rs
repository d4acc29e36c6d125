use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::drill::Drill;
use super::ValidationError;
use crate::composer::{SessionView, ALLOCATION_FLOOR};

/// A finished session plan, persisted from a composer snapshot.
///
/// Saved sessions are **permanent**. Each drill is stored as it looked at
/// save time, so editing or deleting a catalog drill later does not rewrite
/// an existing plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SavedSession {
    pub id: Uuid,
    pub name: String,
    pub total_duration: u32,
    pub player_count: u32,
    /// Sum of component allocations at save time.
    pub planned_total: u32,
    /// Components in the order they were chosen.
    pub components: Vec<SavedComponent>,
    pub created_at: DateTime<Utc>,
}

/// One component of a saved session with its drills in assignment order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SavedComponent {
    pub component: String,
    pub allocated_minutes: u32,
    pub time_used: u32,
    pub drills: Vec<Drill>,
}

/// Row shape for listing saved sessions without their drills.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub name: String,
    pub total_duration: u32,
    pub player_count: u32,
    pub planned_total: u32,
    pub component_count: u32,
    pub created_at: DateTime<Utc>,
}

/// Input for the save operation: a name plus the composed view to persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveSessionInput {
    pub name: String,
    pub view: SessionView,
}

impl SaveSessionInput {
    /// Checks the input before anything is written.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("Session name is required"));
        }
        if self.view.components.is_empty() {
            return Err(ValidationError::new(
                "Session must have at least one component",
            ));
        }
        if let Some(short) = self
            .view
            .components
            .iter()
            .find(|c| c.allocated_minutes < ALLOCATION_FLOOR)
        {
            return Err(ValidationError::new(format!(
                "Component {} has {} minutes, below the {} minute floor",
                short.component, short.allocated_minutes, ALLOCATION_FLOOR
            )));
        }
        for component in &self.view.components {
            for assignment in &component.assignments {
                assignment.drill.validate()?;
            }
        }
        let allocated: u32 = self
            .view
            .components
            .iter()
            .fold(0u32, |acc, c| acc.saturating_add(c.allocated_minutes));
        if allocated != self.view.planned_total {
            return Err(ValidationError::new(format!(
                "Planned total {} does not match allocations {}",
                self.view.planned_total, allocated
            )));
        }
        Ok(())
    }
}
