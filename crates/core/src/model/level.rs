use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{LevelId, SublevelId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LevelError {
    #[error("level name cannot be empty")]
    EmptyName,

    #[error("level {0} has no sublevels")]
    NoSublevels(LevelId),

    #[error("passing percentage must be in 0..=100, got {0}")]
    InvalidPassingPercentage(u8),

    #[error("duplicate level id {0} in curriculum")]
    DuplicateLevel(LevelId),
}

//
// ─── SUBLEVEL ──────────────────────────────────────────────────────────────────
//

/// A bounded practice step within a level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sublevel {
    pub id: SublevelId,
    /// 1-based position within the owning level.
    pub position: u32,
    #[serde(default)]
    pub description: String,
}

//
// ─── LEVEL ─────────────────────────────────────────────────────────────────────
//

/// Wire shape of a level as returned by the content backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelRecord {
    pub id: LevelId,
    pub name: String,
    #[serde(default)]
    pub sublevels: Vec<SublevelRecord>,
    #[serde(default)]
    pub min_passing_percentage: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SublevelRecord {
    pub id: SublevelId,
    #[serde(default)]
    pub description: String,
}

/// A level of the curriculum: ordered sublevels and a graduation quiz threshold.
///
/// Read-only reference data for the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LevelRecord", into = "LevelRecord")]
pub struct Level {
    id: LevelId,
    name: String,
    sublevels: Vec<Sublevel>,
    min_passing_percentage: Option<u8>,
}

impl Level {
    /// Creates a level from its ordered sublevels, assigning positions `1..=n`.
    ///
    /// # Errors
    ///
    /// Returns `LevelError` for a blank name, no sublevels, or a threshold over 100.
    pub fn new(
        id: LevelId,
        name: impl Into<String>,
        sublevels: Vec<(SublevelId, String)>,
        min_passing_percentage: Option<u8>,
    ) -> Result<Self, LevelError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(LevelError::EmptyName);
        }
        if sublevels.is_empty() {
            return Err(LevelError::NoSublevels(id));
        }
        if let Some(pct) = min_passing_percentage.filter(|pct| *pct > 100) {
            return Err(LevelError::InvalidPassingPercentage(pct));
        }

        let sublevels = sublevels
            .into_iter()
            .zip(1_u32..)
            .map(|((id, description), position)| Sublevel {
                id,
                position,
                description,
            })
            .collect();

        Ok(Self {
            id,
            name,
            sublevels,
            min_passing_percentage,
        })
    }

    #[must_use]
    pub fn id(&self) -> LevelId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn sublevels(&self) -> &[Sublevel] {
        &self.sublevels
    }

    /// Sublevel at a 0-based index.
    #[must_use]
    pub fn sublevel(&self, index: usize) -> Option<&Sublevel> {
        self.sublevels.get(index)
    }

    #[must_use]
    pub fn sublevel_count(&self) -> usize {
        self.sublevels.len()
    }

    /// 0-based index of the sublevel that unlocks the quiz.
    #[must_use]
    pub fn last_sublevel_index(&self) -> usize {
        self.sublevels.len().saturating_sub(1)
    }

    #[must_use]
    pub fn min_passing_percentage(&self) -> Option<u8> {
        self.min_passing_percentage
    }
}

impl TryFrom<LevelRecord> for Level {
    type Error = LevelError;

    fn try_from(record: LevelRecord) -> Result<Self, Self::Error> {
        Self::new(
            record.id,
            record.name,
            record
                .sublevels
                .into_iter()
                .map(|s| (s.id, s.description))
                .collect(),
            record.min_passing_percentage,
        )
    }
}

impl From<Level> for LevelRecord {
    fn from(level: Level) -> Self {
        Self {
            id: level.id,
            name: level.name,
            sublevels: level
                .sublevels
                .into_iter()
                .map(|s| SublevelRecord {
                    id: s.id,
                    description: s.description,
                })
                .collect(),
            min_passing_percentage: level.min_passing_percentage,
        }
    }
}

//
// ─── CURRICULUM ────────────────────────────────────────────────────────────────
//

/// Ordered levels. Learner level `n` maps to the n-th entry (1-based).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Curriculum {
    levels: Vec<Level>,
}

impl Curriculum {
    /// # Errors
    ///
    /// Returns `LevelError::DuplicateLevel` if two levels share an id.
    pub fn new(levels: Vec<Level>) -> Result<Self, LevelError> {
        for (i, level) in levels.iter().enumerate() {
            if levels[..i].iter().any(|l| l.id() == level.id()) {
                return Err(LevelError::DuplicateLevel(level.id()));
            }
        }
        Ok(Self { levels })
    }

    #[must_use]
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Level for a 1-based learner level number. `None` once content runs out.
    #[must_use]
    pub fn level_number(&self, number: u32) -> Option<&Level> {
        let index = usize::try_from(number).ok()?.checked_sub(1)?;
        self.levels.get(index)
    }

    #[must_use]
    pub fn by_id(&self, id: LevelId) -> Option<&Level> {
        self.levels.iter().find(|l| l.id() == id)
    }

    /// 1-based number of the level with this id.
    #[must_use]
    pub fn number_of(&self, id: LevelId) -> Option<u32> {
        self.levels
            .iter()
            .position(|l| l.id() == id)
            .and_then(|i| u32::try_from(i + 1).ok())
    }
}
