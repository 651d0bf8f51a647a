use std::collections::{BTreeSet, HashMap};

use crate::api::model::{Quest, QuestKind};
use crate::store::json_store::{JsonStore, StoreError};

/// Percent of the time goal reached, rounded and capped at 100. Quests
/// without a time goal read as 0.
pub fn display_percent(quest: &Quest) -> u8 {
    if quest.goal_value == 0 {
        return 0;
    }
    let goal_seconds = f64::from(quest.goal_value) * 60.0;
    let ratio = quest.effective_seconds() as f64 / goal_seconds;
    (ratio * 100.0).round().clamp(0.0, 100.0) as u8
}

/// The snapshot that stands for a subject: its study-tagged time quest, or
/// failing that its first time quest with a goal.
pub fn subject_snapshot<'a>(quests: &'a [Quest], subject: &str) -> Option<&'a Quest> {
    let mut candidates = quests
        .iter()
        .filter(|q| q.subject == subject && q.kind == QuestKind::Time && q.goal_value > 0);
    let first = candidates.clone().next();
    candidates.find(|q| q.is_study()).or(first)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubjectProgress {
    pub subject: String,
    pub percent: u8,
    pub goal_minutes: Option<u32>,
    pub complete: bool,
}

/// Which subjects are done for the active day. Once a subject reaches 100
/// it stays there until the day rolls over, whatever later snapshots say.
pub struct CompletionTracker {
    day: String,
    completed: BTreeSet<String>,
    goal_minutes: HashMap<String, u32>,
}

impl CompletionTracker {
    pub fn new(day: &str) -> Self {
        Self {
            day: day.to_string(),
            completed: BTreeSet::new(),
            goal_minutes: HashMap::new(),
        }
    }

    pub fn hydrate(day: &str, store: Option<&JsonStore>) -> Self {
        let mut tracker = Self::new(day);
        if let Some(store) = store {
            tracker.completed = store.load_completed(day);
        }
        tracker
    }

    pub fn day(&self) -> &str {
        &self.day
    }

    pub fn completed(&self) -> &BTreeSet<String> {
        &self.completed
    }

    pub fn is_complete(&self, subject: &str) -> bool {
        self.completed.contains(subject)
    }

    pub fn goal_minutes(&self, subject: &str) -> Option<u32> {
        self.goal_minutes.get(subject).copied()
    }

    /// Recompute per-subject progress from a fresh snapshot and persist the
    /// completed set if it grew.
    pub fn reconcile(
        &mut self,
        quests: &[Quest],
        subjects: &[String],
        store: Option<&JsonStore>,
    ) -> Vec<SubjectProgress> {
        let mut changed = false;
        let rows = subjects
            .iter()
            .map(|subject| {
                let snapshot = subject_snapshot(quests, subject);
                let goal_minutes = snapshot
                    .map(|q| q.goal_value)
                    .or_else(|| self.goal_minutes(subject));
                let percent = if self.completed.contains(subject) {
                    100
                } else {
                    snapshot.map_or(0, display_percent)
                };
                if percent >= 100 && self.completed.insert(subject.clone()) {
                    changed = true;
                }
                SubjectProgress {
                    subject: subject.clone(),
                    percent,
                    goal_minutes,
                    complete: percent >= 100,
                }
            })
            .collect();

        if changed {
            self.persist(store);
        }
        rows
    }

    pub fn mark_complete(&mut self, subject: &str, goal_minutes: u32, store: Option<&JsonStore>) {
        self.goal_minutes.insert(subject.to_string(), goal_minutes);
        if self.completed.insert(subject.to_string()) {
            self.persist(store);
        }
    }

    /// Start `new_day` with nothing complete. The new (empty) entry is
    /// written before the previous day's entry is deleted.
    pub fn roll_over(&mut self, new_day: &str, store: Option<&JsonStore>) {
        let previous = std::mem::replace(&mut self.day, new_day.to_string());
        self.completed.clear();
        self.goal_minutes.clear();
        self.persist(store);
        if previous != self.day {
            if let Some(store) = store {
                if let Err(err) = store.remove_completed(&previous) {
                    tracing::warn!(%err, day = %previous, "could not evict old completed cache");
                }
            }
        }
        tracing::info!(from = %previous, to = %self.day, "completion cache rolled over");
    }

    fn persist(&self, store: Option<&JsonStore>) {
        let Some(store) = store else {
            return;
        };
        if let Err(err) = self.try_persist(store) {
            tracing::warn!(%err, "could not persist completed subjects");
        }
    }

    fn try_persist(&self, store: &JsonStore) -> Result<(), StoreError> {
        store.save_completed(&self.day, &self.completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::model::{QuestStatus, STUDY_TAG};
    use tempfile::TempDir;

    fn time_quest(id: &str, subject: &str, goal: u32, seconds: Option<u64>, minutes: u32) -> Quest {
        Quest {
            id: id.to_string(),
            title: id.to_string(),
            subject: subject.to_string(),
            kind: QuestKind::Time,
            goal_value: goal,
            progress_value: minutes,
            progress_seconds: seconds,
            ..Default::default()
        }
    }

    fn subjects() -> Vec<String> {
        vec!["국어".to_string(), "수학".to_string()]
    }

    #[test]
    fn test_percent_formula() {
        assert_eq!(display_percent(&time_quest("q1", "수학", 25, Some(750), 0)), 50);
        assert_eq!(display_percent(&time_quest("q1", "수학", 25, Some(1500), 0)), 100);
        assert_eq!(display_percent(&time_quest("q1", "수학", 25, Some(9999), 0)), 100);
        assert_eq!(display_percent(&time_quest("q1", "수학", 30, Some(0), 0)), 0);
        // 1/3 of a minute goal rounds to 33.
        assert_eq!(display_percent(&time_quest("q1", "수학", 1, Some(20), 0)), 33);
        // Half rounds up.
        assert_eq!(display_percent(&time_quest("q1", "수학", 2, Some(3), 0)), 3);
    }

    #[test]
    fn test_percent_falls_back_to_minutes() {
        assert_eq!(display_percent(&time_quest("q1", "수학", 20, None, 5)), 25);
    }

    #[test]
    fn test_problem_quest_reads_zero() {
        let q = Quest {
            kind: QuestKind::Problem,
            goal_value: 0,
            ..Default::default()
        };
        assert_eq!(display_percent(&q), 0);
    }

    #[test]
    fn test_snapshot_prefers_study_tag() {
        let plain = time_quest("plain", "수학", 30, Some(0), 0);
        let mut study = time_quest("study", "수학", 25, Some(0), 0);
        study.tags = Some(vec![STUDY_TAG.to_string()]);
        let quests = vec![plain, study];
        assert_eq!(subject_snapshot(&quests, "수학").map(|q| q.id.as_str()), Some("study"));

        let quests = vec![time_quest("plain", "수학", 30, Some(0), 0)];
        assert_eq!(subject_snapshot(&quests, "수학").map(|q| q.id.as_str()), Some("plain"));
        assert!(subject_snapshot(&quests, "국어").is_none());
    }

    #[test]
    fn test_completed_subject_sticks_at_100() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
        let mut tracker = CompletionTracker::new("2024-01-01");

        let done = vec![time_quest("q1", "수학", 25, Some(1500), 0)];
        let rows = tracker.reconcile(&done, &subjects(), Some(&store));
        assert_eq!(rows[1].percent, 100);
        assert!(store.load_completed("2024-01-01").contains("수학"));

        // Backend regresses (e.g. a fresh quest got created); display holds.
        let regressed = vec![time_quest("q2", "수학", 25, Some(60), 0)];
        let rows = tracker.reconcile(&regressed, &subjects(), Some(&store));
        assert_eq!(rows[1].percent, 100);
        assert!(rows[1].complete);
        assert_eq!(rows[0].percent, 0);
    }

    #[test]
    fn test_hydrate_restores_today() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
        let mut set = BTreeSet::new();
        set.insert("국어".to_string());
        store.save_completed("2024-01-01", &set).unwrap();

        let mut tracker = CompletionTracker::hydrate("2024-01-01", Some(&store));
        assert!(tracker.is_complete("국어"));
        let rows = tracker.reconcile(&[], &subjects(), Some(&store));
        assert_eq!(rows[0].percent, 100);
    }

    #[test]
    fn test_goal_complete_records_minutes() {
        let mut tracker = CompletionTracker::new("2024-01-01");
        tracker.mark_complete("수학", 25, None);
        assert!(tracker.is_complete("수학"));
        assert_eq!(tracker.goal_minutes("수학"), Some(25));
        let rows = tracker.reconcile(&[], &subjects(), None);
        assert_eq!(rows[1].goal_minutes, Some(25));
        assert_eq!(rows[1].percent, 100);
    }

    #[test]
    fn test_roll_over_clears_and_evicts_previous_day() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
        let mut tracker = CompletionTracker::new("2024-01-01");
        tracker.mark_complete("수학", 25, Some(&store));
        assert!(store.has_completed("2024-01-01"));

        tracker.roll_over("2024-01-02", Some(&store));
        assert_eq!(tracker.day(), "2024-01-02");
        assert!(tracker.completed().is_empty());
        assert!(tracker.goal_minutes("수학").is_none());
        assert!(store.has_completed("2024-01-02"));
        assert!(store.load_completed("2024-01-02").is_empty());
        assert!(!store.has_completed("2024-01-01"));
    }

    #[test]
    fn test_unknown_status_does_not_matter_for_percent() {
        let mut q = time_quest("q1", "수학", 10, Some(300), 0);
        q.status = QuestStatus::Other("archived".to_string());
        assert_eq!(display_percent(&q), 50);
    }
}
