use std::time::{Duration, Instant};

use crate::api::model::Quest;
use crate::session::{DEFAULT_FLUSH_INTERVAL, FlushTarget, TimerCommand};

#[derive(Clone, Debug)]
pub struct ActiveQuestTimer {
    pub quest_id: String,
    pub subject: String,
    pub elapsed: u64,
    pending: u64,
    last_flush: Instant,
}

impl ActiveQuestTimer {
    fn take_pending(&mut self, now: Instant) -> Option<TimerCommand> {
        let delta = std::mem::take(&mut self.pending);
        self.last_flush = now;
        (delta > 0).then(|| TimerCommand::flush(FlushTarget::Quest(self.quest_id.clone()), delta))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Toggle {
    Started,
    Stopped,
}

/// Clock scoped to a single quest card. Only one runs at a time.
pub struct QuestTimer {
    active: Option<ActiveQuestTimer>,
    flush_interval: Duration,
}

impl Default for QuestTimer {
    fn default() -> Self {
        Self::new(DEFAULT_FLUSH_INTERVAL)
    }
}

impl QuestTimer {
    pub fn new(flush_interval: Duration) -> Self {
        Self {
            active: None,
            flush_interval,
        }
    }

    pub fn active(&self) -> Option<&ActiveQuestTimer> {
        self.active.as_ref()
    }

    pub fn is_running_for(&self, quest_id: &str) -> bool {
        self.active.as_ref().is_some_and(|a| a.quest_id == quest_id)
    }

    pub fn pending(&self) -> u64 {
        self.active.as_ref().map_or(0, |a| a.pending)
    }

    /// Click on a card: stops the timer if it is this quest's, otherwise
    /// stops whichever quest was running and starts this one.
    pub fn toggle(
        &mut self,
        quest_id: &str,
        subject: &str,
        now: Instant,
    ) -> (Toggle, Vec<TimerCommand>) {
        if self.is_running_for(quest_id) {
            return (Toggle::Stopped, self.stop(now));
        }
        let commands = self.stop(now);
        tracing::info!(quest = quest_id, "quest timer started");
        self.active = Some(ActiveQuestTimer {
            quest_id: quest_id.to_string(),
            subject: subject.to_string(),
            elapsed: 0,
            pending: 0,
            last_flush: now,
        });
        (Toggle::Started, commands)
    }

    pub fn stop(&mut self, now: Instant) -> Vec<TimerCommand> {
        let Some(mut active) = self.active.take() else {
            return Vec::new();
        };
        let mut commands: Vec<TimerCommand> = active.take_pending(now).into_iter().collect();
        commands.push(TimerCommand::MarkPaused {
            quest_id: active.quest_id,
        });
        commands
    }

    pub fn tick(&mut self, now: Instant) -> Vec<TimerCommand> {
        let Some(active) = self.active.as_mut() else {
            return Vec::new();
        };
        active.elapsed += 1;
        active.pending += 1;
        if now.saturating_duration_since(active.last_flush) >= self.flush_interval {
            return active.take_pending(now).into_iter().collect();
        }
        Vec::new()
    }

    pub fn day_reset(&mut self, now: Instant) -> Vec<TimerCommand> {
        let Some(active) = self.active.as_mut() else {
            return Vec::new();
        };
        let flushed = active.take_pending(now);
        active.elapsed = 0;
        flushed.into_iter().collect()
    }

    pub fn add_simulated(&mut self, seconds: u64) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        active.elapsed += seconds;
        active.pending += seconds;
        true
    }

    /// A completed snapshot for the running quest ends the timer for good.
    /// Returns true when that happened.
    pub fn on_flush_response(&mut self, quest: &Quest) -> bool {
        if !quest.status.is_completed() || !self.is_running_for(&quest.id) {
            return false;
        }
        tracing::info!(quest = %quest.id, "quest goal complete");
        self.active = None;
        true
    }

    /// The global stopwatch moved to `subject`. Only one clock may run, so a
    /// quest timer on another subject stops.
    pub fn on_subject_changed(&mut self, subject: &str, now: Instant) -> Vec<TimerCommand> {
        match self.active.as_ref() {
            Some(active) if active.subject != subject => self.stop(now),
            _ => Vec::new(),
        }
    }
}
