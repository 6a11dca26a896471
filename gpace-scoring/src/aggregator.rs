//! Score aggregation and ranking.
//!
//! # Scoring Formula
//!
//! ```text
//! base  = relative_score + cognitive_difficulty + weightage + urgency
//! final = base * (1 - performance / 100)
//! ```
//!
//! Performance acts as a discount: strong recent results in a subject push
//! its tasks down the list. All tasks of all subjects are pooled and sorted
//! by final score, highest first.
//!
//! # Ordering
//!
//! Ties on score are broken by earlier due date (undated last), then subject
//! tag, then task id. The sort is stable, so anything still equal keeps its
//! pooled position (subject order, then list order). Identical requests
//! always produce identical output.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::NaiveDateTime;

use crate::types::{CalculationRequest, ScoredTask, Subject, Task, WeightageTables};
use crate::urgency::{parse_due_date, urgency};
use crate::weightage::{self, Weightage};

/// Every term that went into one task's score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    /// The subject's relative score.
    pub subject_points: f64,
    /// The subject's cognitive difficulty.
    pub difficulty_points: f64,
    /// Resolved section weightage and where it came from.
    pub weightage: Weightage,
    /// Due-date urgency.
    pub urgency: f64,
    /// Performance discount actually applied, clamped to 0-100.
    pub performance: f64,
    /// Sum of the four additive terms.
    pub base: f64,
    /// `base` after the performance discount.
    pub final_score: f64,
}

/// Compute the full breakdown for one task of `subject`.
pub fn breakdown(
    task: &Task,
    subject: &Subject,
    tables: &WeightageTables,
    performance: f64,
    as_of: NaiveDateTime,
) -> ScoreBreakdown {
    let subject_points = finite_or_zero(subject.relative_score);
    let difficulty_points = finite_or_zero(subject.cognitive_difficulty);
    let weightage = weightage::resolve(tables, &subject.tag, &task.section);
    let urgency = urgency(task.due_date.as_deref(), as_of);
    let performance = finite_or_zero(performance).clamp(0.0, 100.0);

    let base = subject_points + difficulty_points + weightage.value() + urgency;
    let final_score = base * (1.0 - performance / 100.0);

    ScoreBreakdown {
        subject_points,
        difficulty_points,
        weightage,
        urgency,
        performance,
        base,
        final_score,
    }
}

/// Final priority score of one task of `subject`.
pub fn score_task(
    task: &Task,
    subject: &Subject,
    tables: &WeightageTables,
    performance: f64,
    as_of: NaiveDateTime,
) -> f64 {
    breakdown(task, subject, tables, performance, as_of).final_score
}

/// Score every open task in `request` and return them highest first.
pub fn rank(request: &CalculationRequest) -> Vec<ScoredTask> {
    let mut pooled: Vec<Ranked> = Vec::with_capacity(request.task_count());
    let mut seen: HashSet<&str> = HashSet::new();

    for subject in &request.subjects {
        if !seen.insert(subject.tag.as_str()) {
            tracing::debug!(subject = %subject.tag, "skipping duplicate subject tag");
            continue;
        }
        let Some(tasks) = request.tasks.get(&subject.tag) else {
            continue;
        };
        let performance = request
            .academic_performance
            .get(&subject.tag)
            .copied()
            .unwrap_or(0.0);

        for task in tasks.iter().filter(|task| !task.completed) {
            let priority_score = score_task(
                task,
                subject,
                &request.task_weightages,
                performance,
                request.as_of,
            );

            let mut task = task.clone();
            task.project_id = subject.tag.clone();
            task.project_name = subject.name.clone();
            task.extra.remove("priorityScore");

            let due = task.due_date.as_deref().and_then(parse_due_date);
            pooled.push(Ranked {
                scored: ScoredTask {
                    task,
                    priority_score,
                },
                due,
            });
        }
    }

    pooled.sort_by(ranking_order);
    tracing::debug!(tasks = pooled.len(), "ranked tasks");
    pooled.into_iter().map(|ranked| ranked.scored).collect()
}

struct Ranked {
    scored: ScoredTask,
    due: Option<NaiveDateTime>,
}

fn ranking_order(a: &Ranked, b: &Ranked) -> Ordering {
    b.scored
        .priority_score
        .total_cmp(&a.scored.priority_score)
        .then_with(|| match (a.due, b.due) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.scored.task.project_id.cmp(&b.scored.task.project_id))
        .then_with(|| a.scored.task.id.cmp(&b.scored.task.id))
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
