//! Read-only views over a published ranking.
//!
//! Both views copy or borrow the ranked list; neither touches the stored
//! record. Grouping never reorders tasks inside a bucket, so each bucket
//! is the ranked order restricted to its members.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use gpace_scoring::{ScoredTask, parse_due_date};
use serde::{Deserialize, Serialize};

/// Bucket a task falls into when grouped by its last interleave.
///
/// Orders "not interleaved" first, then dates ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InterleaveKey {
    NotInterleaved,
    Date(NaiveDate),
}

impl fmt::Display for InterleaveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInterleaved => f.write_str("not-interleaved"),
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

/// One bucket of [`group_by_interleave`].
#[derive(Debug, Clone, PartialEq)]
pub struct InterleaveGroup<'a> {
    pub key: InterleaveKey,
    pub tasks: Vec<&'a ScoredTask>,
}

/// Bucket `ranked` by the UTC calendar date of `lastInterleaved`.
///
/// Missing or unparseable timestamps land in
/// [`InterleaveKey::NotInterleaved`].
pub fn group_by_interleave(ranked: &[ScoredTask]) -> Vec<InterleaveGroup<'_>> {
    let mut buckets: BTreeMap<InterleaveKey, Vec<&ScoredTask>> = BTreeMap::new();
    for task in ranked {
        buckets.entry(interleave_key(task)).or_default().push(task);
    }
    buckets
        .into_iter()
        .map(|(key, tasks)| InterleaveGroup { key, tasks })
        .collect()
}

fn interleave_key(task: &ScoredTask) -> InterleaveKey {
    task.task
        .last_interleaved
        .as_deref()
        .and_then(utc_date)
        .map_or(InterleaveKey::NotInterleaved, InterleaveKey::Date)
}

/// Calendar date of a stored timestamp, in UTC.
///
/// Offset timestamps convert directly, naive timestamps are read as local
/// time, and bare dates are taken as-is.
fn utc_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    let naive = parse_due_date(raw)?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
}

/// Field a [`sorted_view`] orders by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    /// Always highest first, whatever the direction.
    #[default]
    PriorityScore,
    Title,
    Section,
    ProjectName,
    /// Undated tasks last.
    DueDate,
    /// Tasks without a creation time last.
    CreatedAt,
    /// Never-interleaved tasks first.
    LastInterleaved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[serde(alias = "asc")]
    Ascending,
    #[default]
    #[serde(alias = "desc")]
    Descending,
}

/// A copy of `ranked` reordered by `field`.
///
/// The sort is stable, so equal keys keep their ranked order. Where missing
/// values go is fixed per field and does not flip with `direction`.
pub fn sorted_view(
    ranked: &[ScoredTask],
    field: SortField,
    direction: SortDirection,
) -> Vec<ScoredTask> {
    let mut view = ranked.to_vec();
    view.sort_by(|a, b| compare(a, b, field, direction));
    view
}

fn compare(a: &ScoredTask, b: &ScoredTask, field: SortField, direction: SortDirection) -> Ordering {
    let directed = |ordering: Ordering| match direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    };

    match field {
        SortField::PriorityScore => b.priority_score.total_cmp(&a.priority_score),
        SortField::Title => directed(text_cmp(&a.task.title, &b.task.title)),
        SortField::Section => directed(text_cmp(&a.task.section, &b.task.section)),
        SortField::ProjectName => directed(text_cmp(&a.task.project_name, &b.task.project_name)),
        SortField::DueDate => {
            optional_cmp(instant(&a.task.due_date), instant(&b.task.due_date), true, directed)
        }
        SortField::CreatedAt => optional_cmp(
            instant(&a.task.created_at),
            instant(&b.task.created_at),
            true,
            directed,
        ),
        SortField::LastInterleaved => optional_cmp(
            instant(&a.task.last_interleaved),
            instant(&b.task.last_interleaved),
            false,
            directed,
        ),
    }
}

fn text_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

fn instant(raw: &Option<String>) -> Option<NaiveDateTime> {
    raw.as_deref().and_then(parse_due_date)
}

/// Compare optional values; `missing_last` decides where `None` goes.
fn optional_cmp<T: Ord>(
    a: Option<T>,
    b: Option<T>,
    missing_last: bool,
    directed: impl Fn(Ordering) -> Ordering,
) -> Ordering {
    let missing = if missing_last {
        Ordering::Greater
    } else {
        Ordering::Less
    };
    match (a, b) {
        (Some(a), Some(b)) => directed(a.cmp(&b)),
        (None, Some(_)) => missing,
        (Some(_), None) => missing.reverse(),
        (None, None) => Ordering::Equal,
    }
}
