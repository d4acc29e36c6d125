//! Domain models for drillbook.
//!
//! # Core Concepts
//!
//! ## Catalog Entities
//!
//! - [`Drill`]: An immutable training activity tagged with the component it trains.
//! - [`Difficulty`]: Closed, ordered difficulty scale with `Beginner` as fallback.
//! - [`DrillQuery`]: Component/difficulty filter shared by every catalog layer.
//!
//! ## Saved Entities
//!
//! - [`SavedSession`]: A finished plan persisted from a composer snapshot.
//! - [`SavedComponent`]: A component's allocation and its drills inside a saved plan.
//!
//! ## Draft API Shapes
//!
//! - [`DraftResponse`], [`RetimeInput`], [`AddDrillInput`] and friends: request and
//!   response bodies for building a session over HTTP.
//!
//! In-progress plans are not models. They live in a
//! [`SessionComposer`](crate::composer::SessionComposer) until saved.

mod draft;
mod drill;
mod session;

pub use draft::*;
pub use drill::*;
pub use session::*;

/// Input rejected before reaching the store. Surfaced to API clients as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}
