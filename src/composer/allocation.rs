use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::error::{ComposeError, Result};

/// No component may ever hold fewer minutes than this.
pub const ALLOCATION_FLOOR: u32 = 5;

/// Size of one retime step in minutes.
pub const ALLOCATION_STEP: i32 = 5;

/// Result of a retime request.
///
/// `Rejected` is a normal outcome, not an error: the request would have
/// broken the floor, so the allocation was left as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AdjustOutcome {
    Applied { minutes: u32 },
    Rejected { minutes: u32 },
}

impl AdjustOutcome {
    /// The allocation after the request, whether or not it was applied.
    pub fn minutes(&self) -> u32 {
        match self {
            Self::Applied { minutes } | Self::Rejected { minutes } => *minutes,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Minutes budget per component, in the order components were chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationTable {
    entries: Vec<(String, u32)>,
}

impl AllocationTable {
    /// Split `total_duration` evenly across `components`.
    ///
    /// Shares use floor division and the remainder is dropped, so the
    /// planned total can fall short of `total_duration` by up to
    /// `components.len() - 1` minutes.
    pub fn initialize(total_duration: u32, components: &[String]) -> Result<Self> {
        if total_duration == 0 {
            return Err(ComposeError::InvalidInput(
                "total duration must be a positive number of minutes".to_string(),
            ));
        }
        validate_components(components)?;

        let count = u32::try_from(components.len())
            .map_err(|_| ComposeError::InvalidInput("too many components".to_string()))?;
        let share = total_duration / count;
        if share < ALLOCATION_FLOOR {
            return Err(ComposeError::InvalidInput(format!(
                "{} minutes across {} components leaves {} each, below the {} minute floor",
                total_duration, count, share, ALLOCATION_FLOOR
            )));
        }

        Ok(Self {
            entries: components.iter().map(|c| (c.clone(), share)).collect(),
        })
    }

    /// Move a component's allocation by `delta` minutes.
    ///
    /// Rejected without any change if the result would drop below
    /// [`ALLOCATION_FLOOR`] or overflow.
    pub fn adjust(&mut self, component: &str, delta: i32) -> Result<AdjustOutcome> {
        let minutes = self.slot_mut(component)?;
        let target = i64::from(*minutes) + i64::from(delta);

        match u32::try_from(target) {
            Ok(next) if next >= ALLOCATION_FLOOR => {
                *minutes = next;
                Ok(AdjustOutcome::Applied { minutes: next })
            }
            _ => Ok(AdjustOutcome::Rejected { minutes: *minutes }),
        }
    }

    pub fn get(&self, component: &str) -> Result<u32> {
        self.entries
            .iter()
            .find(|(name, _)| name == component)
            .map(|(_, minutes)| *minutes)
            .ok_or_else(|| ComposeError::UnknownComponent(component.to_string()))
    }

    pub fn contains(&self, component: &str) -> bool {
        self.entries.iter().any(|(name, _)| name == component)
    }

    pub fn total_planned(&self) -> u32 {
        self.entries
            .iter()
            .fold(0u32, |acc, (_, minutes)| acc.saturating_add(*minutes))
    }

    /// Components and their allocations in original order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.entries.iter().map(|(name, minutes)| (name.as_str(), *minutes))
    }

    fn slot_mut(&mut self, component: &str) -> Result<&mut u32> {
        self.entries
            .iter_mut()
            .find(|(name, _)| name == component)
            .map(|(_, minutes)| minutes)
            .ok_or_else(|| ComposeError::UnknownComponent(component.to_string()))
    }
}

/// Component lists must be non-empty, with no blank or repeated names.
///
/// Names are case-sensitive, so "Passing" and "passing" are distinct.
fn validate_components(components: &[String]) -> Result<()> {
    if components.is_empty() {
        return Err(ComposeError::InvalidInput(
            "at least one component is required".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(components.len());
    for name in components {
        if name.trim().is_empty() {
            return Err(ComposeError::InvalidInput(
                "component names must not be blank".to_string(),
            ));
        }
        if !seen.insert(name.as_str()) {
            return Err(ComposeError::InvalidInput(format!(
                "component listed twice: {}",
                name
            )));
        }
    }
    Ok(())
}
