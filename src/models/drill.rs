use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::ValidationError;

/// A single training activity from the drill catalog.
///
/// Drills are **immutable** once fetched. A session build only ever references
/// them: the same drill may be assigned to several components, or to one
/// component several times, and each placement is tracked separately by the
/// assignment ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drill {
    pub id: Uuid,
    pub name: String,
    /// The component this drill trains, e.g. "Passing".
    pub component: String,
    /// Length of the drill in whole minutes. Always positive.
    pub duration_minutes: u32,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub skill_focus: BTreeSet<String>,
    #[serde(default)]
    pub equipment: BTreeSet<String>,
}

impl Drill {
    /// Drills arriving from outside the catalog store (API bodies, remote
    /// catalogs) go through this before they are placed in a session.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.duration_minutes == 0 {
            return Err(ValidationError::new(format!(
                "Drill {} must last a positive number of minutes",
                self.name
            )));
        }
        Ok(())
    }

    /// Case-insensitive exact match of this drill's component tag.
    ///
    /// "Passing" matches a request for "passing", but "Passing Warmup" does
    /// not match "Passing".
    pub fn matches_component(&self, requested: &str) -> bool {
        component_key(&self.component) == component_key(requested)
    }
}

/// Normalized lookup key for a component tag.
///
/// Both the catalog store and the catalog adapter compare tags through this
/// key, so local and remote filtering agree.
pub fn component_key(name: &str) -> String {
    name.to_lowercase()
}

/// How demanding a drill is, in ascending order.
///
/// Parsing from catalog data is lenient: input is case-folded, and missing or
/// unrecognized values fall back to `Beginner`. Query filters are parsed
/// strictly instead, see [`Difficulty::parse_filter`].
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
    Elite,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Self::Beginner,
        Self::Intermediate,
        Self::Advanced,
        Self::Elite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
            Self::Elite => "elite",
        }
    }

    /// Strict parse, case-insensitive. Returns `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Some(Self::Beginner),
            "intermediate" => Some(Self::Intermediate),
            "advanced" => Some(Self::Advanced),
            "elite" => Some(Self::Elite),
            _ => None,
        }
    }

    /// Lenient parse used for catalog input.
    pub fn normalize(s: &str) -> Self {
        Self::from_str(s).unwrap_or_default()
    }

    /// Strict parse for a user-supplied filter value.
    pub fn parse_filter(s: &str) -> Result<Self, String> {
        Self::from_str(s).ok_or_else(|| {
            let names: Vec<_> = Self::ALL.iter().map(|d| d.as_str()).collect();
            format!("unknown difficulty '{}', expected one of: {}", s.trim(), names.join(", "))
        })
    }
}

/// Deserializes an optional difficulty filter. An empty value means no
/// filter, and an unrecognized one is an error.
pub fn deserialize_difficulty_filter<'de, D>(
    deserializer: D,
) -> Result<Option<Difficulty>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => Difficulty::parse_filter(&raw)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Difficulty::normalize).unwrap_or_default())
    }
}

/// Input for adding a drill to the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDrillInput {
    pub name: String,
    pub component: String,
    pub duration_minutes: u32,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub skill_focus: BTreeSet<String>,
    #[serde(default)]
    pub equipment: BTreeSet<String>,
}

impl CreateDrillInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("Drill name is required"));
        }
        if self.component.trim().is_empty() {
            return Err(ValidationError::new("Drill component is required"));
        }
        if self.duration_minutes == 0 {
            return Err(ValidationError::new(
                "Drill duration must be a positive number of minutes",
            ));
        }
        Ok(())
    }
}

/// Filter for catalog queries.
///
/// Shared by the catalog store, the HTTP catalog endpoint and the remote
/// catalog client. A `component` filter is a case-insensitive exact match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrillQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_difficulty_filter",
        skip_serializing_if = "Option::is_none"
    )]
    pub difficulty: Option<Difficulty>,
}

impl DrillQuery {
    pub fn for_component(component: impl Into<String>) -> Self {
        Self {
            component: Some(component.into()),
            difficulty: None,
        }
    }

    pub fn with_difficulty(mut self, difficulty: Option<Difficulty>) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Whether a drill satisfies every filter in this query.
    pub fn accepts(&self, drill: &Drill) -> bool {
        let component_ok = self
            .component
            .as_deref()
            .is_none_or(|c| drill.matches_component(c));
        let difficulty_ok = self.difficulty.is_none_or(|d| drill.difficulty == d);
        component_ok && difficulty_ok
    }
}
