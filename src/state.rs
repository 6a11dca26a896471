//! Local state snapshot.
//!
//! The study app keeps its durable state as one JSON document per key in a
//! single directory:
//!
//! | file | content |
//! |------|---------|
//! | `academicSubjects.json` | subjects |
//! | `tasks-<tag>.json` | one subject's task list |
//! | `subjectMarks.json` | per-subject marks, including `_performance` |
//! | `subjectWeightages.json` | subject-level weightage table |
//! | `projectWeightages.json` | legacy project-level weightage table |
//!
//! Missing files read as empty. Subjects and task lists are required to
//! parse; marks and weightages degrade to empty with a warning.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use gpace_scoring::{
    CalculationRequest, Subject, SubjectTag, Task, WeightageTable, WeightageTables,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{PriorityError, Result};

pub const SUBJECTS_FILE: &str = "academicSubjects.json";
pub const MARKS_FILE: &str = "subjectMarks.json";
pub const SUBJECT_WEIGHTAGES_FILE: &str = "subjectWeightages.json";
pub const PROJECT_WEIGHTAGES_FILE: &str = "projectWeightages.json";

/// Key inside a subject's marks entry holding its 0-100 performance.
const PERFORMANCE_KEY: &str = "_performance";

/// Read/write access to a local state directory.
#[derive(Debug, Clone)]
pub struct LocalState {
    dir: PathBuf,
}

impl LocalState {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Snapshot everything a scoring pass needs, pinned to `as_of`.
    ///
    /// # Errors
    ///
    /// Returns [`PriorityError::State`] if the subjects document or any
    /// subject's task list exists but cannot be read or parsed.
    pub fn snapshot(&self, as_of: NaiveDateTime) -> Result<CalculationRequest> {
        let mut request = CalculationRequest::new(as_of);
        request.subjects = self.subjects()?;
        for subject in &request.subjects {
            if request.tasks.contains_key(&subject.tag) {
                continue;
            }
            let tasks = self.tasks_for(&subject.tag)?;
            request.tasks.insert(subject.tag.clone(), tasks);
        }
        request.academic_performance = self.performance();
        request.task_weightages = self.weightages();

        tracing::debug!(
            subjects = request.subjects.len(),
            tasks = request.task_count(),
            "state snapshot taken"
        );
        Ok(request)
    }

    /// All subjects, or an empty list if none are stored.
    pub fn subjects(&self) -> Result<Vec<Subject>> {
        Ok(read_json(&self.dir.join(SUBJECTS_FILE))?.unwrap_or_default())
    }

    /// The task list of one subject, or an empty list if none is stored.
    pub fn tasks_for(&self, tag: &str) -> Result<Vec<Task>> {
        Ok(read_json(&self.tasks_path(tag)?)?.unwrap_or_default())
    }

    /// Per-subject performance taken from the marks document.
    ///
    /// Subjects without a numeric `_performance` are left out.
    pub fn performance(&self) -> BTreeMap<SubjectTag, f64> {
        let path = self.dir.join(MARKS_FILE);
        let marks: BTreeMap<SubjectTag, serde_json::Value> = match read_json(&path) {
            Ok(marks) => marks.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable marks");
                return BTreeMap::new();
            }
        };

        marks
            .into_iter()
            .filter_map(|(tag, entry)| {
                let performance = entry.get(PERFORMANCE_KEY)?.as_f64()?;
                Some((tag, performance))
            })
            .collect()
    }

    /// Both weightage tables. Unreadable documents are treated as empty.
    pub fn weightages(&self) -> WeightageTables {
        WeightageTables {
            subject_weightages: self.lenient_table(
                SUBJECT_WEIGHTAGES_FILE,
                "subjectWeightages",
                |t| t.subject_weightages,
            ),
            project_weightages: self.lenient_table(
                PROJECT_WEIGHTAGES_FILE,
                "projectWeightages",
                |t| t.project_weightages,
            ),
        }
    }

    /// Replace the stored subjects.
    pub fn write_subjects(&self, subjects: &[Subject]) -> Result<()> {
        self.write_document(SUBJECTS_FILE, subjects)
    }

    /// Replace the stored task list of one subject.
    pub fn write_tasks(&self, tag: &str, tasks: &[Task]) -> Result<()> {
        let path = self.tasks_path(tag)?;
        write_json_atomic(&path, tasks)
            .map_err(|e| PriorityError::State(format!("cannot write {}: {e}", path.display())))
    }

    /// Replace one named document in the state directory.
    pub fn write_document<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        write_json_atomic(&path, value)
            .map_err(|e| PriorityError::State(format!("cannot write {}: {e}", path.display())))
    }

    fn tasks_path(&self, tag: &str) -> Result<PathBuf> {
        if tag.is_empty() || tag.contains(['/', '\\']) || tag == ".." {
            return Err(PriorityError::State(format!(
                "subject tag '{tag}' cannot be used as a file name"
            )));
        }
        Ok(self.dir.join(format!("tasks-{tag}.json")))
    }

    fn lenient_table(
        &self,
        name: &str,
        field: &str,
        pick: fn(WeightageTables) -> WeightageTable,
    ) -> WeightageTable {
        let path = self.dir.join(name);
        let document = match read_json::<serde_json::Value>(&path) {
            Ok(document) => document.unwrap_or(serde_json::Value::Null),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable weightages");
                return WeightageTable::new();
            }
        };

        let mut wrapped = serde_json::Map::new();
        wrapped.insert(field.to_owned(), document);
        match serde_json::from_value::<WeightageTables>(serde_json::Value::Object(wrapped)) {
            Ok(tables) => pick(tables),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed weightages");
                WeightageTable::new()
            }
        }
    }
}

/// Read and parse a JSON document. A missing file is `Ok(None)`.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(PriorityError::State(format!(
                "cannot read {}: {e}",
                path.display()
            )));
        }
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| PriorityError::State(format!("cannot parse {}: {e}", path.display())))
}

/// Write `value` as pretty JSON via a temp file and rename, so readers
/// never observe a partially written document.
pub(crate) fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_vec_pretty(value).map_err(std::io::Error::other)?;
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, path)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use gpace_scoring::parse_due_date;

    fn as_of() -> NaiveDateTime {
        parse_due_date("2025-01-10T09:00:00").unwrap()
    }

    fn write_raw(state: &LocalState, name: &str, body: &str) {
        std::fs::write(state.dir().join(name), body).unwrap();
    }

    #[test]
    fn empty_directory_gives_empty_request() {
        let dir = tempfile::tempdir().unwrap();
        let request = LocalState::new(dir.path()).snapshot(as_of()).unwrap();
        assert!(request.subjects.is_empty());
        assert_eq!(request.task_count(), 0);
        assert_eq!(request.as_of, as_of());
    }

    #[test]
    fn snapshot_reads_every_document() {
        let dir = tempfile::tempdir().unwrap();
        let state = LocalState::new(dir.path());
        state
            .write_subjects(&[Subject::new("math", "Mathematics", 50.0, 70.0)])
            .unwrap();
        state
            .write_tasks(
                "math",
                &[Task::new("t1", "Problem set", "Assignment", Some("2025-01-15"))],
            )
            .unwrap();
        write_raw(
            &state,
            MARKS_FILE,
            r#"{"math": {"_performance": 20, "quiz1": 18}, "phys": {"quiz1": 9}}"#,
        );
        write_raw(&state, SUBJECT_WEIGHTAGES_FILE, r#"{"math": {"assignment": 25}}"#);
        write_raw(&state, PROJECT_WEIGHTAGES_FILE, r#"{"math": {"Quizzes": {"avg": 8}}}"#);

        let request = state.snapshot(as_of()).unwrap();
        assert_eq!(request.subjects.len(), 1);
        assert_eq!(request.tasks["math"].len(), 1);
        assert_eq!(request.academic_performance.get("math"), Some(&20.0));
        assert!(!request.academic_performance.contains_key("phys"));
        assert_eq!(
            request.task_weightages.subject_weightages["math"]["assignment"].value(),
            Some(25.0)
        );
        assert_eq!(
            request.task_weightages.project_weightages["math"]["Quizzes"].value(),
            Some(8.0)
        );
    }

    #[test]
    fn corrupt_subjects_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let state = LocalState::new(dir.path());
        write_raw(&state, SUBJECTS_FILE, "[{not json");
        let err = state.snapshot(as_of()).unwrap_err();
        assert!(matches!(err, PriorityError::State(_)));
    }

    #[test]
    fn corrupt_task_list_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let state = LocalState::new(dir.path());
        state
            .write_subjects(&[Subject::new("math", "Mathematics", 50.0, 70.0)])
            .unwrap();
        write_raw(&state, "tasks-math.json", r#"{"not": "a list"}"#);
        assert!(state.snapshot(as_of()).is_err());
    }

    #[test]
    fn blank_form_fields_still_rank() {
        let dir = tempfile::tempdir().unwrap();
        let state = LocalState::new(dir.path());
        write_raw(
            &state,
            SUBJECTS_FILE,
            r#"[{"tag": "MATH42", "name": "Calculus", "creditHours": null,
                "relativeScore": 50, "cognitiveDifficulty": null}]"#,
        );
        write_raw(
            &state,
            "tasks-MATH42.json",
            r#"[{"id": 1712345678901, "title": null, "section": "Assignment",
                "dueDate": "2025-01-15", "completed": null}]"#,
        );

        let request = state.snapshot(as_of()).unwrap();
        assert_eq!(request.subjects[0].cognitive_difficulty, 0.0);

        let ranked = gpace_scoring::rank(&request);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].task.project_id, "MATH42");
        assert!(ranked[0].priority_score.is_finite());
        assert!(ranked[0].priority_score > 0.0);
    }

    #[test]
    fn corrupt_marks_and_weightages_degrade_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state = LocalState::new(dir.path());
        write_raw(&state, MARKS_FILE, "garbage");
        write_raw(&state, SUBJECT_WEIGHTAGES_FILE, "[1, 2, 3]");
        write_raw(&state, PROJECT_WEIGHTAGES_FILE, "{oops");

        let request = state.snapshot(as_of()).unwrap();
        assert!(request.academic_performance.is_empty());
        assert_eq!(request.task_weightages, WeightageTables::default());
    }

    #[test]
    fn one_bad_weightage_table_keeps_the_other() {
        let dir = tempfile::tempdir().unwrap();
        let state = LocalState::new(dir.path());
        write_raw(&state, SUBJECT_WEIGHTAGES_FILE, "\"nope\"");
        write_raw(&state, PROJECT_WEIGHTAGES_FILE, r#"{"math": {"Final": {"avg": 45}}}"#);

        let tables = state.weightages();
        assert!(tables.subject_weightages.is_empty());
        assert_eq!(tables.project_weightages["math"]["Final"].value(), Some(45.0));
    }

    #[test]
    fn subject_without_task_file_has_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let state = LocalState::new(dir.path());
        state
            .write_subjects(&[Subject::new("bio", "Biology", 40.0, 40.0)])
            .unwrap();
        let request = state.snapshot(as_of()).unwrap();
        assert!(request.tasks["bio"].is_empty());
    }

    #[test]
    fn tags_with_path_separators_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = LocalState::new(dir.path());
        assert!(state.tasks_for("../etc").is_err());
        assert!(state.write_tasks("a/b", &[]).is_err());
    }

    #[test]
    fn atomic_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        write_json_atomic(&path, &serde_json::json!({"a": 1})).unwrap();
        assert!(path.exists());
        assert!(!dir.path().join("doc.json.tmp").exists());
    }
}
