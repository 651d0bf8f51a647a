pub mod identity;
pub mod quest_timer;
pub mod stopwatch;

use std::time::Duration;

pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// What a flush reports time against: the backend resolves a subject to its
/// active time quest, or takes an explicit quest id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlushTarget {
    Subject(String),
    Quest(String),
}

/// Side effects a timer asks the controller to perform against the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimerCommand {
    Flush {
        target: FlushTarget,
        delta_seconds: u64,
    },
    MarkPaused {
        quest_id: String,
    },
}

impl TimerCommand {
    pub fn flush(target: FlushTarget, delta_seconds: u64) -> Self {
        TimerCommand::Flush {
            target,
            delta_seconds,
        }
    }
}
