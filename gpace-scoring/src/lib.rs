//! # gpace-scoring
//!
//! Deterministic priority scoring for GPAce study tasks.
//!
//! Every open task is scored from four additive terms and one discount:
//!
//! - the subject's relative score and cognitive difficulty
//! - the weightage of the task's section (assignment, quiz, midterm, ...)
//! - urgency derived from the due date
//! - a discount from the subject's recent academic performance
//!
//! ## Design
//!
//! - Pure functions only: no I/O, no clocks. The reference instant travels
//!   inside [`CalculationRequest::as_of`]
//! - Scoring never fails. Missing tables, malformed weights and bad dates
//!   all degrade to a defined fallback value
//! - Output order is total and reproducible, so any execution context
//!   produces bit-identical rankings for the same request

pub mod aggregator;
pub mod types;
pub mod urgency;
pub mod weightage;

pub use aggregator::{ScoreBreakdown, breakdown, score_task};
pub use types::{
    CalculationRequest, CategoryWeights, ScoredTask, Subject, SubjectTag, Task, WeightValue,
    WeightageTable, WeightageTables,
};
pub use urgency::{parse_due_date, urgency, urgency_between};
pub use weightage::{Category, Weightage, WeightageTier};

/// Score and rank every open task in `request`, highest priority first.
///
/// Completed tasks are left out. Each returned task carries its subject's
/// tag and name as `project_id` and `project_name`.
///
/// # Examples
///
/// ```
/// use gpace_scoring::{CalculationRequest, Subject, Task, parse_due_date};
///
/// let as_of = parse_due_date("2025-01-10T09:00:00").unwrap();
/// let mut request = CalculationRequest::new(as_of);
/// request.subjects.push(Subject::new("math", "Mathematics", 50.0, 70.0));
/// request.tasks.insert(
///     "math".into(),
///     vec![Task::new("t1", "Problem set", "Assignment", Some("2025-01-15"))],
/// );
///
/// let ranked = gpace_scoring::rank(&request);
/// assert_eq!(ranked[0].priority_score, 137.0);
/// ```
pub fn rank(request: &CalculationRequest) -> Vec<ScoredTask> {
    aggregator::rank(request)
}
