use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use crate::api::model::Quest;
use crate::engine::progress::display_percent;
use crate::session::{DEFAULT_FLUSH_INTERVAL, FlushTarget, TimerCommand};

/// The one subject clock. Exists from the first subject selection until
/// stop/reset.
#[derive(Clone, Debug)]
pub struct StopwatchSession {
    pub subject: String,
    pub running: bool,
    /// Seconds ticked but not yet sent.
    pending: u64,
    /// Seconds shown on screen since the session started.
    pub elapsed: u64,
    last_flush: Instant,
}

impl StopwatchSession {
    fn new(subject: &str, now: Instant) -> Self {
        Self {
            subject: subject.to_string(),
            running: true,
            pending: 0,
            elapsed: 0,
            last_flush: now,
        }
    }

    /// Zero the pending delta and hand it out as a flush. The counter is
    /// reset whether or not the request later succeeds.
    fn take_pending(&mut self, now: Instant) -> Option<TimerCommand> {
        let delta = std::mem::take(&mut self.pending);
        self.last_flush = now;
        (delta > 0).then(|| TimerCommand::flush(FlushTarget::Subject(self.subject.clone()), delta))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressLine {
    pub title: String,
    pub percent: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GoalReached {
    pub subject: String,
    pub goal_minutes: u32,
}

pub struct Stopwatch {
    session: Option<StopwatchSession>,
    /// Subjects whose goal completed since the last day reset.
    blocked: HashSet<String>,
    /// Quest the backend resolved for each subject on its last flush.
    quest_ids: HashMap<String, String>,
    progress: Option<ProgressLine>,
    flush_interval: Duration,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new(DEFAULT_FLUSH_INTERVAL)
    }
}

impl Stopwatch {
    pub fn new(flush_interval: Duration) -> Self {
        Self {
            session: None,
            blocked: HashSet::new(),
            quest_ids: HashMap::new(),
            progress: None,
            flush_interval,
        }
    }

    pub fn session(&self) -> Option<&StopwatchSession> {
        self.session.as_ref()
    }

    pub fn current_subject(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.subject.as_str())
    }

    pub fn is_running(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.running)
    }

    pub fn elapsed(&self) -> u64 {
        self.session.as_ref().map_or(0, |s| s.elapsed)
    }

    pub fn pending(&self) -> u64 {
        self.session.as_ref().map_or(0, |s| s.pending)
    }

    pub fn is_blocked(&self, subject: &str) -> bool {
        self.blocked.contains(subject)
    }

    pub fn progress(&self) -> Option<&ProgressLine> {
        self.progress.as_ref()
    }

    pub fn quest_for(&self, subject: &str) -> Option<&str> {
        self.quest_ids.get(subject).map(String::as_str)
    }

    fn mark_paused(&self, subject: &str) -> Option<TimerCommand> {
        self.quest_ids.get(subject).map(|id| TimerCommand::MarkPaused {
            quest_id: id.clone(),
        })
    }

    /// Select `subject`, starting the clock if needed. Switching away from a
    /// running subject flushes everything it accrued first.
    pub fn select(&mut self, subject: &str, now: Instant) -> Vec<TimerCommand> {
        let mut commands = Vec::new();

        let outgoing = match self.session.as_mut() {
            Some(s) if s.subject == subject => {
                if !s.running {
                    s.running = true;
                    s.last_flush = now;
                }
                return commands;
            }
            Some(s) => {
                let was_running = s.running;
                let flushed = if was_running { s.take_pending(now) } else { None };
                let old = std::mem::replace(&mut s.subject, subject.to_string());
                s.running = true;
                s.last_flush = now;
                commands.extend(flushed);
                was_running.then_some(old)
            }
            None => {
                self.session = Some(StopwatchSession::new(subject, now));
                None
            }
        };

        if let Some(old) = outgoing {
            tracing::info!(from = %old, to = %subject, "switching subject");
            commands.extend(self.mark_paused(&old));
        }
        self.progress = None;

        // Zero-delta flush so the backend resolves the subject's quest now.
        if !self.is_blocked(subject) {
            commands.push(TimerCommand::flush(
                FlushTarget::Subject(subject.to_string()),
                0,
            ));
        }
        commands
    }

    pub fn pause(&mut self, now: Instant) -> Vec<TimerCommand> {
        let Some(s) = self.session.as_mut() else {
            return Vec::new();
        };
        if !s.running {
            return Vec::new();
        }
        s.running = false;
        let subject = s.subject.clone();
        let mut commands: Vec<TimerCommand> = s.take_pending(now).into_iter().collect();
        commands.extend(self.mark_paused(&subject));
        commands
    }

    /// Pause if running, then forget the session entirely.
    pub fn stop(&mut self, now: Instant) -> Vec<TimerCommand> {
        let commands = self.pause(now);
        self.session = None;
        self.progress = None;
        commands
    }

    /// One second of wall time.
    pub fn tick(&mut self, now: Instant) -> Vec<TimerCommand> {
        self.advance(now, true)
    }

    /// One second of wall time while a quest timer is already crediting this
    /// subject: the display moves but nothing accrues.
    pub fn tick_shadowed(&mut self, now: Instant) -> Vec<TimerCommand> {
        self.advance(now, false)
    }

    fn advance(&mut self, now: Instant, accrue: bool) -> Vec<TimerCommand> {
        let Some(s) = self.session.as_mut() else {
            return Vec::new();
        };
        if !s.running {
            return Vec::new();
        }
        s.elapsed += 1;
        if !accrue {
            // Restart the flush interval once accrual resumes.
            s.last_flush = now;
            return Vec::new();
        }
        if self.blocked.contains(&s.subject) {
            return Vec::new();
        }
        s.pending += 1;
        if now.saturating_duration_since(s.last_flush) >= self.flush_interval {
            return s.take_pending(now).into_iter().collect();
        }
        Vec::new()
    }

    /// Flush what is pending, zero every counter and lift all blocks. The
    /// clock keeps running.
    pub fn day_reset(&mut self, now: Instant) -> Vec<TimerCommand> {
        self.blocked.clear();
        let Some(s) = self.session.as_mut() else {
            return Vec::new();
        };
        let flushed = s.take_pending(now);
        s.elapsed = 0;
        flushed.into_iter().collect()
    }

    /// Credit simulated seconds to the running session.
    pub fn add_simulated(&mut self, seconds: u64) -> bool {
        let Some(s) = self.session.as_mut() else {
            return false;
        };
        if !s.running {
            return false;
        }
        s.elapsed += seconds;
        if !self.blocked.contains(&s.subject) {
            s.pending += seconds;
        }
        true
    }

    /// Apply the quest snapshot returned for a subject flush. Returns the
    /// reached goal when the snapshot is completed.
    pub fn on_flush_response(&mut self, subject: &str, quest: &Quest) -> Option<GoalReached> {
        let active = self.current_subject() == Some(subject);
        if active {
            self.progress = Some(ProgressLine {
                title: quest.title.clone(),
                percent: display_percent(quest),
            });
        }

        if !quest.status.is_completed() {
            self.quest_ids
                .insert(subject.to_string(), quest.id.clone());
            return None;
        }

        tracing::info!(subject, quest = %quest.id, "subject goal complete");
        self.blocked.insert(subject.to_string());
        self.quest_ids.remove(subject);
        if active {
            self.session = None;
        }
        Some(GoalReached {
            subject: subject.to_string(),
            goal_minutes: quest.goal_value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::model::QuestStatus;

    const MATH: &str = "수학";
    const ENGLISH: &str = "영어";

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn quest(id: &str, status: QuestStatus, goal: u32, seconds: u64) -> Quest {
        Quest {
            id: id.to_string(),
            title: format!("{id} title"),
            subject: MATH.to_string(),
            status,
            goal_value: goal,
            progress_seconds: Some(seconds),
            ..Default::default()
        }
    }

    fn flushed(commands: &[TimerCommand]) -> Vec<(FlushTarget, u64)> {
        commands
            .iter()
            .filter_map(|c| match c {
                TimerCommand::Flush {
                    target,
                    delta_seconds,
                } => Some((target.clone(), *delta_seconds)),
                _ => None,
            })
            .collect()
    }

    fn subject(s: &str) -> FlushTarget {
        FlushTarget::Subject(s.to_string())
    }

    #[test]
    fn test_select_starts_and_ensures_quest() {
        let t0 = Instant::now();
        let mut sw = Stopwatch::default();
        let cmds = sw.select(MATH, t0);
        assert!(sw.is_running());
        assert_eq!(sw.current_subject(), Some(MATH));
        assert_eq!(flushed(&cmds), vec![(subject(MATH), 0)]);
    }

    #[test]
    fn test_shadowed_tick_counts_without_accruing() {
        let t0 = Instant::now();
        let mut sw = Stopwatch::default();
        sw.select(MATH, t0);
        for i in 1..=6 {
            assert!(sw.tick_shadowed(t0 + secs(i)).is_empty());
        }
        assert_eq!(sw.elapsed(), 6);
        assert_eq!(sw.pending(), 0);
    }

    #[test]
    fn test_reselect_same_subject_is_noop() {
        let t0 = Instant::now();
        let mut sw = Stopwatch::default();
        sw.select(MATH, t0);
        sw.tick(t0 + secs(1));
        let cmds = sw.select(MATH, t0 + secs(2));
        assert!(cmds.is_empty());
        assert_eq!(sw.pending(), 1);
    }

    #[test]
    fn test_tick_flushes_every_five_seconds() {
        let t0 = Instant::now();
        let mut sw = Stopwatch::default();
        sw.select(MATH, t0);
        for i in 1..=4 {
            assert!(sw.tick(t0 + secs(i)).is_empty());
        }
        let cmds = sw.tick(t0 + secs(5));
        assert_eq!(flushed(&cmds), vec![(subject(MATH), 5)]);
        assert_eq!(sw.pending(), 0);
        assert_eq!(sw.elapsed(), 5);
    }

    #[test]
    fn test_switch_flushes_outgoing_exactly_once() {
        let t0 = Instant::now();
        let mut sw = Stopwatch::default();
        sw.select(MATH, t0);
        sw.on_flush_response(MATH, &quest("q-math", QuestStatus::InProgress, 25, 0));
        for i in 1..=3 {
            sw.tick(t0 + secs(i));
        }

        let cmds = sw.select(ENGLISH, t0 + secs(3));
        assert_eq!(
            flushed(&cmds),
            vec![(subject(MATH), 3), (subject(ENGLISH), 0)]
        );
        assert!(cmds.contains(&TimerCommand::MarkPaused {
            quest_id: "q-math".to_string()
        }));
        // Nothing carried over to the new subject.
        assert_eq!(sw.pending(), 0);

        sw.tick(t0 + secs(4));
        assert_eq!(sw.pending(), 1);
        assert_eq!(sw.current_subject(), Some(ENGLISH));
    }

    #[test]
    fn test_pause_flushes_and_marks_paused() {
        let t0 = Instant::now();
        let mut sw = Stopwatch::default();
        sw.select(MATH, t0);
        sw.on_flush_response(MATH, &quest("q-math", QuestStatus::InProgress, 25, 0));
        sw.tick(t0 + secs(1));
        sw.tick(t0 + secs(2));

        let cmds = sw.pause(t0 + secs(2));
        assert_eq!(flushed(&cmds), vec![(subject(MATH), 2)]);
        assert!(matches!(cmds.last(), Some(TimerCommand::MarkPaused { .. })));
        assert!(!sw.is_running());
        // Paused sessions do not tick.
        assert!(sw.tick(t0 + secs(10)).is_empty());
        assert_eq!(sw.elapsed(), 2);
        assert!(sw.pause(t0 + secs(11)).is_empty());
    }

    #[test]
    fn test_stop_clears_session() {
        let t0 = Instant::now();
        let mut sw = Stopwatch::default();
        sw.select(MATH, t0);
        sw.tick(t0 + secs(1));
        let cmds = sw.stop(t0 + secs(1));
        assert_eq!(flushed(&cmds), vec![(subject(MATH), 1)]);
        assert!(sw.session().is_none());
        assert_eq!(sw.elapsed(), 0);
        assert!(sw.progress().is_none());
    }

    #[test]
    fn test_completed_response_blocks_subject() {
        let t0 = Instant::now();
        let mut sw = Stopwatch::default();
        sw.select(MATH, t0);

        let reached = sw.on_flush_response(MATH, &quest("q1", QuestStatus::Completed, 25, 1500));
        assert_eq!(
            reached,
            Some(GoalReached {
                subject: MATH.to_string(),
                goal_minutes: 25
            })
        );
        assert!(sw.is_blocked(MATH));
        assert!(sw.session().is_none());
        assert!(sw.quest_for(MATH).is_none());
        assert_eq!(sw.progress().map(|p| p.percent), Some(100));

        // A blocked subject ticks elapsed time but never accrues.
        sw.select(MATH, t0 + secs(1));
        for i in 2..=8 {
            assert!(sw.tick(t0 + secs(i)).is_empty());
        }
        assert_eq!(sw.pending(), 0);
        assert_eq!(sw.elapsed(), 7);
    }

    #[test]
    fn test_outgoing_response_does_not_touch_progress_line() {
        let t0 = Instant::now();
        let mut sw = Stopwatch::default();
        sw.select(ENGLISH, t0);
        sw.on_flush_response(MATH, &quest("q-math", QuestStatus::InProgress, 25, 750));
        assert!(sw.progress().is_none());
        assert_eq!(sw.quest_for(MATH), Some("q-math"));
    }

    #[test]
    fn test_day_reset_flushes_and_unblocks() {
        let t0 = Instant::now();
        let mut sw = Stopwatch::default();
        sw.select(ENGLISH, t0);
        sw.on_flush_response(MATH, &quest("q-math", QuestStatus::Completed, 25, 1500));
        sw.tick(t0 + secs(1));
        sw.tick(t0 + secs(2));

        let cmds = sw.day_reset(t0 + secs(2));
        assert_eq!(flushed(&cmds), vec![(subject(ENGLISH), 2)]);
        assert_eq!(sw.elapsed(), 0);
        assert_eq!(sw.pending(), 0);
        assert!(!sw.is_blocked(MATH));
        assert!(sw.is_running());
    }

    #[test]
    fn test_add_simulated_time() {
        let t0 = Instant::now();
        let mut sw = Stopwatch::default();
        assert!(!sw.add_simulated(60));
        sw.select(MATH, t0);
        assert!(sw.add_simulated(60));
        assert_eq!(sw.pending(), 60);
        assert_eq!(sw.elapsed(), 60);
    }
}
