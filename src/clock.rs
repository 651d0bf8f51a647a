use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Offset, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Calendar day keys evaluated at a fixed UTC offset, so the day boundary
/// does not move with the host's time zone.
#[derive(Clone)]
pub struct DayClock {
    offset: FixedOffset,
    clock: Arc<dyn Clock>,
}

impl DayClock {
    pub fn new(offset_minutes: i32, clock: Arc<dyn Clock>) -> Self {
        let offset = FixedOffset::east_opt(offset_minutes * 60).unwrap_or_else(|| Utc.fix());
        Self { offset, clock }
    }

    pub fn system(offset_minutes: i32) -> Self {
        Self::new(offset_minutes, Arc::new(SystemClock))
    }

    pub fn current_day_key(&self) -> String {
        self.day_key_at(self.clock.now())
    }

    pub fn day_key_at(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset).format("%Y-%m-%d").to_string()
    }

    /// Wall-clock time for the header display.
    pub fn local_time(&self) -> String {
        self.clock
            .now()
            .with_timezone(&self.offset)
            .format("%H:%M:%S")
            .to_string()
    }
}

/// Format a second count as `HH:MM:SS`. Hours keep counting past 24.
pub fn format_hms(total: u64) -> String {
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

pub mod manual {
    use std::sync::Mutex;

    use chrono::{DateTime, Duration, Utc};

    use super::Clock;

    /// Clock that only moves when told to.
    pub struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        pub fn new(start: DateTime<Utc>) -> Self {
            Self {
                now: Mutex::new(start),
            }
        }

        pub fn set(&self, at: DateTime<Utc>) {
            *self.now.lock().unwrap_or_else(|e| e.into_inner()) = at;
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap_or_else(|e| e.into_inner())
        }
    }
}
