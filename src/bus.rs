use std::collections::VecDeque;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DevAction {
    RefreshQuests,
    AddSimulatedTime,
    ForceDayRollover,
    FullReset,
}

impl DevAction {
    pub const ALL: [DevAction; 4] = [
        DevAction::RefreshQuests,
        DevAction::AddSimulatedTime,
        DevAction::ForceDayRollover,
        DevAction::FullReset,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DevAction::RefreshQuests => "Refresh quests",
            DevAction::AddSimulatedTime => "Add simulated time",
            DevAction::ForceDayRollover => "Force day rollover",
            DevAction::FullReset => "Full reset",
        }
    }
}

/// Notifications passed between the controller's components. Published
/// while handling one input and drained right after it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    QuestSync,
    SubjectChanged { subject: String },
    DayReset { day: String },
    GoalComplete { subject: String, goal_minutes: u32 },
    Dev(DevAction),
}

#[derive(Default)]
pub struct EventBus {
    queue: VecDeque<Notification>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&mut self, notification: Notification) {
        tracing::trace!(?notification, "publish");
        self.queue.push_back(notification);
    }

    pub fn next(&mut self) -> Option<Notification> {
        self.queue.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut bus = EventBus::new();
        bus.publish(Notification::QuestSync);
        bus.publish(Notification::DayReset {
            day: "2024-01-02".to_string(),
        });
        assert_eq!(bus.next(), Some(Notification::QuestSync));
        assert!(matches!(bus.next(), Some(Notification::DayReset { .. })));
        assert!(bus.is_empty());
        assert_eq!(bus.next(), None);
    }
}
