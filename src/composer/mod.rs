//! Session composition engine.
//!
//! A [`SessionComposer`] is created when a coach starts building a session
//! and lives until the caller discards it, usually right after a successful
//! save. It coordinates three parts:
//!
//! - [`AllocationTable`]: minutes per component, never below [`ALLOCATION_FLOOR`].
//! - [`AssignmentLedger`]: drills placed in each component, in insertion order.
//! - [`DrillCatalogAdapter`]: exact-match catalog lookup by component name.
//!
//! Both tables are built from the same component list and are only changed
//! through the composer, so every ledger key is also an allocation key.
//! [`SessionComposer::snapshot`] is recomputed on every call.

mod allocation;
mod catalog;
mod error;
mod ledger;

pub use allocation::{AdjustOutcome, AllocationTable, ALLOCATION_FLOOR, ALLOCATION_STEP};
pub use catalog::{CatalogSource, DrillCatalogAdapter, DrillMatches};
pub use error::{ComposeError, Result};
pub use ledger::{Assignment, AssignmentId, AssignmentLedger};

use serde::{Deserialize, Serialize};

use crate::models::{Difficulty, Drill};

/// Arguments for starting a session build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionInput {
    /// Total session length in minutes.
    pub total_duration: u32,
    pub player_count: u32,
    /// Components in display order. Names are case-sensitive.
    pub components: Vec<String>,
}

/// Read-only snapshot of a session build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    pub total_duration: u32,
    pub player_count: u32,
    pub components: Vec<ComponentView>,
    /// Sum of all allocations. May differ from `total_duration` after
    /// rounding or retiming.
    pub planned_total: u32,
}

/// One component's slice of a [`SessionView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentView {
    pub component: String,
    pub allocated_minutes: u32,
    pub assignments: Vec<Assignment>,
    pub time_used: u32,
    /// Allocation minus time used. Negative when the component is over budget.
    pub remaining_minutes: i64,
}

impl SessionView {
    pub fn component(&self, name: &str) -> Option<&ComponentView> {
        self.components.iter().find(|c| c.component == name)
    }

    pub fn time_used(&self) -> u32 {
        self.components
            .iter()
            .fold(0u32, |acc, c| acc.saturating_add(c.time_used))
    }
}

/// Orchestrates one session build.
#[derive(Debug, Clone)]
pub struct SessionComposer<S> {
    total_duration: u32,
    player_count: u32,
    allocations: AllocationTable,
    ledger: AssignmentLedger,
    catalog: DrillCatalogAdapter<S>,
}

impl<S: CatalogSource> SessionComposer<S> {
    /// Start a build. Fails with [`ComposeError::InvalidInput`] for a zero
    /// duration or player count, or an empty, blank or repeated component list.
    pub fn start(input: StartSessionInput, catalog: S) -> Result<Self> {
        if input.player_count == 0 {
            return Err(ComposeError::InvalidInput(
                "player count must be a positive number".to_string(),
            ));
        }

        let allocations = AllocationTable::initialize(input.total_duration, &input.components)?;
        let ledger = AssignmentLedger::initialize(&input.components);

        tracing::info!(
            total_duration = input.total_duration,
            player_count = input.player_count,
            components = input.components.len(),
            "Started session build"
        );

        Ok(Self {
            total_duration: input.total_duration,
            player_count: input.player_count,
            allocations,
            ledger,
            catalog: DrillCatalogAdapter::new(catalog),
        })
    }

    pub fn total_duration(&self) -> u32 {
        self.total_duration
    }

    pub fn player_count(&self) -> u32 {
        self.player_count
    }

    /// Component names in original order.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.allocations.iter().map(|(name, _)| name)
    }

    /// Change a component's allocation by `delta` minutes.
    pub fn retime(&mut self, component: &str, delta: i32) -> Result<AdjustOutcome> {
        let outcome = self.allocations.adjust(component, delta)?;
        tracing::debug!(component, delta, ?outcome, "Retimed component");
        Ok(outcome)
    }

    /// One step up.
    pub fn increase(&mut self, component: &str) -> Result<AdjustOutcome> {
        self.retime(component, ALLOCATION_STEP)
    }

    /// One step down. Rejected at the floor.
    pub fn decrease(&mut self, component: &str) -> Result<AdjustOutcome> {
        self.retime(component, -ALLOCATION_STEP)
    }

    /// Candidate drills for `component`.
    ///
    /// The component is checked locally before the catalog is contacted. The
    /// fetch does not touch session state; pass a chosen drill to
    /// [`add_drill`](Self::add_drill) to place it.
    pub async fn open_catalog(&self, component: &str) -> Result<DrillMatches> {
        self.open_catalog_filtered(component, None).await
    }

    pub async fn open_catalog_filtered(
        &self,
        component: &str,
        difficulty: Option<Difficulty>,
    ) -> Result<DrillMatches> {
        self.ensure_component(component)?;
        self.catalog.fetch_filtered(component, difficulty).await
    }

    /// Place `drill` in `component`. Drills without a positive duration are
    /// refused with [`ComposeError::InvalidInput`].
    pub fn add_drill(&mut self, component: &str, drill: Drill) -> Result<AssignmentId> {
        self.ensure_component(component)?;
        drill
            .validate()
            .map_err(|e| ComposeError::InvalidInput(e.to_string()))?;
        let drill_id = drill.id;
        let assignment = self.ledger.assign(component, drill)?;
        tracing::debug!(component, %drill_id, %assignment, "Assigned drill");
        Ok(assignment)
    }

    pub fn remove_drill(&mut self, component: &str, assignment: AssignmentId) -> Result<Drill> {
        self.ensure_component(component)?;
        let drill = self.ledger.unassign(component, assignment)?;
        tracing::debug!(component, %assignment, "Unassigned drill");
        Ok(drill)
    }

    /// Current allocations, assignments and totals, in component order.
    pub fn snapshot(&self) -> SessionView {
        let components = self
            .allocations
            .iter()
            .map(|(name, allocated_minutes)| {
                let assignments = self
                    .ledger
                    .drills_for(name)
                    .map(<[Assignment]>::to_vec)
                    .unwrap_or_default();
                let time_used = ledger::sum_durations(&assignments);
                ComponentView {
                    component: name.to_string(),
                    allocated_minutes,
                    assignments,
                    time_used,
                    remaining_minutes: i64::from(allocated_minutes) - i64::from(time_used),
                }
            })
            .collect();

        SessionView {
            total_duration: self.total_duration,
            player_count: self.player_count,
            components,
            planned_total: self.allocations.total_planned(),
        }
    }

    /// The catalog adapter for `component`, detached from the composer.
    ///
    /// Lets a caller that shares the composer behind a lock check the
    /// component, release the lock, and only then wait on the catalog.
    pub fn catalog_for(&self, component: &str) -> Result<DrillCatalogAdapter<S>>
    where
        S: Clone,
    {
        self.ensure_component(component)?;
        Ok(self.catalog.clone())
    }

    fn ensure_component(&self, component: &str) -> Result<()> {
        if self.allocations.contains(component) {
            Ok(())
        } else {
            Err(ComposeError::UnknownComponent(component.to_string()))
        }
    }
}
