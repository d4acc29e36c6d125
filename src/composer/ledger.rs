use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{ComposeError, Result};
use crate::models::Drill;

/// Stable handle for one placement of a drill in a component.
///
/// The same drill can be placed twice, so removal goes through this handle
/// rather than the drill id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssignmentId(Uuid);

impl AssignmentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AssignmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for AssignmentId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AssignmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A drill placed in a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub drill: Drill,
}

/// Ordered drill placements per component.
///
/// Components are fixed at construction. Lists keep insertion order and
/// allow duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentLedger {
    lists: Vec<(String, Vec<Assignment>)>,
}

impl AssignmentLedger {
    pub fn initialize(components: &[String]) -> Self {
        Self {
            lists: components.iter().map(|c| (c.clone(), Vec::new())).collect(),
        }
    }

    /// Append `drill` to `component`. No de-duplication is done.
    pub fn assign(&mut self, component: &str, drill: Drill) -> Result<AssignmentId> {
        let list = self.list_mut(component)?;
        let id = AssignmentId::new();
        list.push(Assignment { id, drill });
        Ok(id)
    }

    /// Remove one placement and return its drill. The remaining
    /// placements keep their relative order.
    pub fn unassign(&mut self, component: &str, assignment: AssignmentId) -> Result<Drill> {
        let list = self.list_mut(component)?;
        let position = list
            .iter()
            .position(|a| a.id == assignment)
            .ok_or_else(|| ComposeError::NotFound {
                component: component.to_string(),
                assignment,
            })?;
        Ok(list.remove(position).drill)
    }

    pub fn drills_for(&self, component: &str) -> Result<&[Assignment]> {
        self.lists
            .iter()
            .find(|(name, _)| name == component)
            .map(|(_, list)| list.as_slice())
            .ok_or_else(|| ComposeError::UnknownComponent(component.to_string()))
    }

    /// Total minutes of the drills currently placed in `component`.
    pub fn time_used(&self, component: &str) -> Result<u32> {
        Ok(sum_durations(self.drills_for(component)?))
    }

    pub fn assignment_count(&self) -> usize {
        self.lists.iter().map(|(_, list)| list.len()).sum()
    }

    fn list_mut(&mut self, component: &str) -> Result<&mut Vec<Assignment>> {
        self.lists
            .iter_mut()
            .find(|(name, _)| name == component)
            .map(|(_, list)| list)
            .ok_or_else(|| ComposeError::UnknownComponent(component.to_string()))
    }
}

pub(crate) fn sum_durations(assignments: &[Assignment]) -> u32 {
    assignments
        .iter()
        .fold(0u32, |acc, a| acc.saturating_add(a.drill.duration_minutes))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::models::Difficulty;
    use proptest::prelude::*;

    fn drill(name: &str, minutes: u32) -> Drill {
        Drill {
            id: Uuid::new_v4(),
            name: name.to_string(),
            component: "Passing".to_string(),
            duration_minutes: minutes,
            difficulty: Difficulty::Intermediate,
            skill_focus: BTreeSet::new(),
            equipment: BTreeSet::new(),
        }
    }

    fn ledger() -> AssignmentLedger {
        AssignmentLedger::initialize(&["Passing".to_string(), "Shooting".to_string()])
    }

    #[test]
    fn starts_empty() {
        let ledger = ledger();
        assert!(ledger.drills_for("Passing").unwrap().is_empty());
        assert_eq!(ledger.time_used("Shooting").unwrap(), 0);
    }

    #[test]
    fn same_drill_twice_counts_twice() {
        let mut ledger = ledger();
        let d = drill("Triangle passing", 15);
        let first = ledger.assign("Passing", d.clone()).unwrap();
        let second = ledger.assign("Passing", d).unwrap();

        assert_ne!(first, second);
        assert_eq!(ledger.drills_for("Passing").unwrap().len(), 2);
        assert_eq!(ledger.time_used("Passing").unwrap(), 30);
    }

    #[test]
    fn unassign_removes_only_that_instance_and_keeps_order() {
        let mut ledger = ledger();
        let a = drill("A", 5);
        let b = drill("B", 10);
        ledger.assign("Passing", a.clone()).unwrap();
        let middle = ledger.assign("Passing", b).unwrap();
        let last = ledger.assign("Passing", a).unwrap();

        let removed = ledger.unassign("Passing", middle).unwrap();
        assert_eq!(removed.name, "B");

        let remaining = ledger.drills_for("Passing").unwrap();
        assert_eq!(remaining.len(), 2);
        assert_eq!(remaining[0].drill.name, "A");
        assert_eq!(remaining[1].id, last);
        assert_eq!(ledger.time_used("Passing").unwrap(), 10);
    }

    #[test]
    fn unassign_twice_is_not_found() {
        let mut ledger = ledger();
        let id = ledger.assign("Passing", drill("A", 5)).unwrap();
        ledger.unassign("Passing", id).unwrap();

        assert_eq!(
            ledger.unassign("Passing", id),
            Err(ComposeError::NotFound {
                component: "Passing".to_string(),
                assignment: id,
            })
        );
    }

    #[test]
    fn assignment_is_scoped_to_its_component() {
        let mut ledger = ledger();
        let id = ledger.assign("Passing", drill("A", 5)).unwrap();
        assert!(matches!(
            ledger.unassign("Shooting", id),
            Err(ComposeError::NotFound { .. })
        ));
        assert_eq!(ledger.assignment_count(), 1);
    }

    #[test]
    fn unknown_component_is_rejected() {
        let mut ledger = ledger();
        assert_eq!(
            ledger.assign("Fitness", drill("A", 5)),
            Err(ComposeError::UnknownComponent("Fitness".to_string()))
        );
        assert!(ledger.time_used("passing").is_err());
    }

    proptest! {
        #[test]
        fn time_used_tracks_every_step(ops in prop::collection::vec((any::<bool>(), 1u32..90, any::<prop::sample::Index>()), 1..40)) {
            let mut ledger = ledger();
            for (add, minutes, pick) in ops {
                if add {
                    ledger.assign("Passing", drill("D", minutes)).unwrap();
                } else {
                    let current = ledger.drills_for("Passing").unwrap();
                    if !current.is_empty() {
                        let id = current[pick.index(current.len())].id;
                        ledger.unassign("Passing", id).unwrap();
                    }
                }
                let expected: u32 = ledger
                    .drills_for("Passing")
                    .unwrap()
                    .iter()
                    .map(|a| a.drill.duration_minutes)
                    .sum();
                prop_assert_eq!(ledger.time_used("Passing").unwrap(), expected);
            }
        }
    }
}
