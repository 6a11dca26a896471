//! Core types for subjects, tasks, weightage tables, and scored output.
//!
//! Field names serialise in camelCase so the same documents the study app
//! stores (`academicSubjects`, `tasks-<tag>`, `calculatedPriorityTasks`)
//! round-trip through these types unchanged.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// Unique subject identifier. Tasks reference it as their `projectId`.
pub type SubjectTag = String;

/// An academic subject. Read-only to the scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    /// Unique subject tag.
    pub tag: SubjectTag,
    /// Display name copied onto every scored task of this subject.
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    /// Credit hours (informational; the scorer uses `relative_score`).
    #[serde(default, deserialize_with = "lenient_number")]
    pub credit_hours: f64,
    /// Importance relative to the other subjects, 0-100.
    #[serde(default, deserialize_with = "lenient_number")]
    pub relative_score: f64,
    /// Cognitive difficulty, 0-100.
    #[serde(default, deserialize_with = "lenient_number")]
    pub cognitive_difficulty: f64,
}

impl Subject {
    /// Build a subject with the two scoring inputs set and no credit hours.
    pub fn new(
        tag: impl Into<String>,
        name: impl Into<String>,
        relative_score: f64,
        cognitive_difficulty: f64,
    ) -> Self {
        Self {
            tag: tag.into(),
            name: name.into(),
            credit_hours: 0.0,
            relative_score,
            cognitive_difficulty,
        }
    }
}

/// An academic task owned by one subject's task list.
///
/// Fields the scorer does not know about are kept in `extra` and written
/// back verbatim, so a scored task carries everything its source did.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: String,
    /// Category label such as "Assignment" or "Quizzes".
    #[serde(default, deserialize_with = "lenient_text")]
    pub section: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub project_id: SubjectTag,
    #[serde(default, deserialize_with = "lenient_text")]
    pub project_name: String,
    /// When the task was last surfaced for interleaved review. Display only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_interleaved: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Task {
    /// Build a pending task with the fields the scorer reads.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        section: impl Into<String>,
        due_date: Option<&str>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            section: section.into(),
            due_date: due_date.map(str::to_owned),
            ..Default::default()
        }
    }
}

/// A task with its computed priority. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredTask {
    #[serde(flatten)]
    pub task: Task,
    pub priority_score: f64,
}

/// One cell of a weightage table.
///
/// Subject-level tables store bare percentages; the legacy project-level
/// table stores `{ "avg": <percentage> }`. Anything else is kept so the
/// document round-trips, but never resolves to a weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WeightValue {
    Number(f64),
    Average { avg: f64 },
    Malformed(serde_json::Value),
}

impl WeightValue {
    /// The usable weight, or `None` for malformed, negative, or non-finite cells.
    pub fn value(&self) -> Option<f64> {
        let raw = match self {
            Self::Number(v) => *v,
            Self::Average { avg } => *avg,
            Self::Malformed(_) => return None,
        };
        (raw.is_finite() && raw >= 0.0).then_some(raw)
    }
}

impl From<f64> for WeightValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// Category (or section) name to weight, for one subject.
pub type CategoryWeights = BTreeMap<String, WeightValue>;

/// Subject tag to that subject's category weights.
pub type WeightageTable = BTreeMap<SubjectTag, CategoryWeights>;

/// Both weightage tables consulted by the resolver.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightageTables {
    /// Subject-level table keyed by canonical category.
    #[serde(default, deserialize_with = "lenient_table")]
    pub subject_weightages: WeightageTable,
    /// Legacy project-level table keyed by raw section name.
    #[serde(default, deserialize_with = "lenient_table")]
    pub project_weightages: WeightageTable,
}

/// Everything one scoring pass needs, snapshotted by the caller.
///
/// Built fresh for every recomputation. `as_of` pins the reference instant
/// so every execution path scores the same request identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationRequest {
    #[serde(default)]
    pub subjects: Vec<Subject>,
    /// Per-subject task lists keyed by subject tag.
    #[serde(default)]
    pub tasks: BTreeMap<SubjectTag, Vec<Task>>,
    /// Per-subject performance, 0-100.
    #[serde(default)]
    pub academic_performance: BTreeMap<SubjectTag, f64>,
    #[serde(default)]
    pub task_weightages: WeightageTables,
    #[serde(default = "local_now")]
    pub as_of: NaiveDateTime,
}

impl CalculationRequest {
    /// An empty request pinned to `as_of`.
    pub fn new(as_of: NaiveDateTime) -> Self {
        Self {
            subjects: Vec::new(),
            tasks: BTreeMap::new(),
            academic_performance: BTreeMap::new(),
            task_weightages: WeightageTables::default(),
            as_of,
        }
    }

    /// Total number of tasks across all subject lists.
    pub fn task_count(&self) -> usize {
        self.tasks.values().map(Vec::len).sum()
    }
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Numbers the app writes from form input. A blank field is stored as
/// `null`; that and any other non-number read as 0.
fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(value.filter(|v| v.is_finite()).unwrap_or(0.0))
}

/// Text fields and ids: `null` reads as empty, numbers keep their digits
/// (ids are often stored as numeric timestamps).
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(matches!(
        serde_json::Value::deserialize(deserializer)?,
        serde_json::Value::Bool(true)
    ))
}

/// Accept any JSON object, dropping subjects whose entry is not an object.
fn lenient_table<'de, D>(deserializer: D) -> Result<WeightageTable, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, serde_json::Value>>::deserialize(deserializer)?;
    let mut table = WeightageTable::new();
    for (tag, entry) in raw.unwrap_or_default() {
        match serde_json::from_value::<CategoryWeights>(entry) {
            Ok(weights) => {
                table.insert(tag, weights);
            }
            Err(e) => {
                tracing::debug!(subject = %tag, error = %e, "ignoring malformed weightage entry");
            }
        }
    }
    Ok(table)
}
