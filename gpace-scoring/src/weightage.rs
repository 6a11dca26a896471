//! Task weightage resolution.
//!
//! Maps a task's section label to an importance percentage using three
//! tiers, in order:
//!
//! 1. the subject-level table, keyed by canonical [`Category`]
//! 2. the legacy project-level table, keyed by raw section name
//!    (case-insensitive)
//! 3. a fixed default per category (0 for unrecognised categories)
//!
//! Resolution never fails. Missing or malformed tables fall through to the
//! next tier, so every section resolves to some non-negative number.

use std::fmt;

use crate::types::WeightageTables;

/// Canonical task categories. Unrecognised sections keep their own name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    Assignment,
    Quiz,
    Midterm,
    Final,
    Revision,
    Other(String),
}

impl Category {
    /// Normalise a section label and map it through the synonym table.
    pub fn from_section(section: &str) -> Self {
        let normalized = normalize_section(section);
        match normalized.as_str() {
            "assignment" | "assignments" => Self::Assignment,
            "quiz" | "quizzes" => Self::Quiz,
            "midterm" | "mid term / oht" => Self::Midterm,
            "final" | "finals" => Self::Final,
            "revision" => Self::Revision,
            _ => Self::Other(normalized),
        }
    }

    /// Key used in subject-level weightage tables.
    pub fn key(&self) -> &str {
        match self {
            Self::Assignment => "assignment",
            Self::Quiz => "quiz",
            Self::Midterm => "midterm",
            Self::Final => "final",
            Self::Revision => "revision",
            Self::Other(name) => name,
        }
    }

    /// Last-resort weight when neither table has an entry.
    pub fn default_weight(&self) -> f64 {
        match self {
            Self::Assignment => 15.0,
            Self::Quiz => 10.0,
            Self::Midterm => 30.0,
            Self::Final => 40.0,
            Self::Revision => 5.0,
            Self::Other(_) => 0.0,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Which table a found weight came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightageTier {
    Subject,
    Project,
}

/// Outcome of a weightage lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Weightage {
    /// A table held a usable entry.
    Found { value: f64, tier: WeightageTier },
    /// No table entry; the category default was used.
    Default(f64),
}

impl Weightage {
    /// The resolved weight regardless of where it came from.
    pub fn value(&self) -> f64 {
        match self {
            Self::Found { value, .. } => *value,
            Self::Default(value) => *value,
        }
    }

    /// `true` when the weight came from one of the tables.
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

/// Resolve the weight of `section` for the subject `project_id`.
pub fn resolve(tables: &WeightageTables, project_id: &str, section: &str) -> Weightage {
    let normalized = normalize_section(section);
    let category = Category::from_section(&normalized);

    let subject_hit = tables
        .subject_weightages
        .get(project_id)
        .and_then(|weights| weights.get(category.key()))
        .and_then(|cell| cell.value());
    if let Some(value) = subject_hit {
        return Weightage::Found {
            value,
            tier: WeightageTier::Subject,
        };
    }

    let project_hit = tables.project_weightages.get(project_id).and_then(|weights| {
        weights
            .iter()
            .find(|(name, _)| normalize_section(name) == normalized)
            .and_then(|(_, cell)| cell.value())
    });
    if let Some(value) = project_hit {
        return Weightage::Found {
            value,
            tier: WeightageTier::Project,
        };
    }

    Weightage::Default(category.default_weight())
}

fn normalize_section(section: &str) -> String {
    section.trim().to_lowercase()
}
