use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::api::client::RequestError;
use crate::api::model::{
    AnswerRequest, AnswerResponse, ChatRequest, Quest, QuestOutcome, ResultRequest, StatsSummary,
    TimerUpdate,
};
use crate::bus::{DevAction, EventBus, Notification};
use crate::clock::DayClock;
use crate::config::Config;
use crate::engine::board::{CardDetail, CardSection, QuestCard, build_board};
use crate::engine::progress::{CompletionTracker, SubjectProgress};
use crate::session::identity::SessionIdentity;
use crate::session::quest_timer::{QuestTimer, Toggle};
use crate::session::stopwatch::Stopwatch;
use crate::session::{FlushTarget, TimerCommand};
use crate::store::json_store::JsonStore;
use crate::ui::line_input::LineInput;
use crate::ui::theme::Theme;
use crate::worker::{ApiEvent, ApiRequest, Dispatch};

const ONE_SECOND: Duration = Duration::from_secs(1);
/// Seconds replayed after the loop stalls; beyond this the clock just resyncs.
const MAX_CATCH_UP: u32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub kind: StatusKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnswerFeedback {
    Empty,
    Wrong {
        expected: Option<String>,
        explanation: Option<String>,
    },
    Failed(String),
}

pub struct AnswerPrompt {
    pub quest_id: String,
    pub title: String,
    pub prompt: Option<String>,
    pub input: LineInput,
    pub feedback: Option<AnswerFeedback>,
    pub waiting: bool,
}

pub struct AiPrompt {
    pub input: LineInput,
    /// Index into the configured subjects; `None` asks without a subject.
    pub subject: Option<usize>,
    pub answer: Option<Result<String, String>>,
    pub waiting: bool,
}

pub enum Modal {
    ConfirmReset,
    Message {
        title: String,
        body: String,
        is_error: bool,
    },
    Answer(AnswerPrompt),
    AskAi(AiPrompt),
    Stats(Option<StatsSummary>),
    Debug {
        selected: usize,
    },
}

pub struct App {
    pub config: Config,
    pub theme: &'static Theme,
    pub identity: SessionIdentity,
    pub day_clock: DayClock,
    pub active_day: String,
    pub stopwatch: Stopwatch,
    pub quest_timer: QuestTimer,
    pub tracker: CompletionTracker,
    pub store: Option<JsonStore>,
    pub quests: Vec<Quest>,
    pub board: Vec<QuestCard>,
    pub subject_progress: Vec<SubjectProgress>,
    pub selected: usize,
    pub modal: Option<Modal>,
    pub status: Option<StatusMessage>,
    pub loading: bool,
    pub should_quit: bool,
    bus: EventBus,
    dispatcher: Box<dyn Dispatch>,
    next_second: Instant,
    recorded_results: HashSet<String>,
    reset_in_flight: bool,
}

impl App {
    pub fn new(
        config: Config,
        dispatcher: Box<dyn Dispatch>,
        day_clock: DayClock,
        store: Option<JsonStore>,
    ) -> Self {
        let loaded_theme = Theme::load(&config.theme).unwrap_or_default();
        let theme: &'static Theme = Box::leak(Box::new(loaded_theme));

        let flush_interval = Duration::from_secs(config.flush_interval_secs);
        let active_day = day_clock.current_day_key();
        let tracker = CompletionTracker::hydrate(&active_day, store.as_ref());
        tracing::info!(day = %active_day, completed = tracker.completed().len(), "hydrated completion cache");

        let mut app = Self {
            identity: SessionIdentity::new(&config.user_id),
            theme,
            day_clock,
            active_day,
            stopwatch: Stopwatch::new(flush_interval),
            quest_timer: QuestTimer::new(flush_interval),
            tracker,
            store,
            quests: Vec::new(),
            board: Vec::new(),
            subject_progress: Vec::new(),
            selected: 0,
            modal: None,
            status: None,
            loading: false,
            should_quit: false,
            bus: EventBus::new(),
            dispatcher,
            next_second: Instant::now() + ONE_SECOND,
            recorded_results: HashSet::new(),
            reset_in_flight: false,
            config,
        };
        app.refresh_progress();
        app
    }

    /// Initial quest load.
    pub fn start(&mut self) {
        self.load_quests();
    }

    fn dispatch(&self, request: ApiRequest) {
        tracing::debug!(?request, "dispatch");
        self.dispatcher.dispatch(request);
    }

    fn load_quests(&mut self) {
        self.loading = true;
        self.dispatch(ApiRequest::LoadQuests {
            user_id: self.identity.get().to_string(),
        });
    }

    fn set_status(&mut self, kind: StatusKind, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn run_commands(&mut self, commands: Vec<TimerCommand>) {
        for command in commands {
            let request = match command {
                TimerCommand::Flush {
                    target,
                    delta_seconds,
                } => {
                    let (subject, quest_id) = match &target {
                        FlushTarget::Subject(s) => (Some(s.clone()), None),
                        FlushTarget::Quest(q) => (None, Some(q.clone())),
                    };
                    ApiRequest::Flush {
                        target,
                        update: TimerUpdate {
                            user_id: self.identity.get().to_string(),
                            subject,
                            quest_id,
                            delta_seconds,
                        },
                    }
                }
                TimerCommand::MarkPaused { quest_id } => ApiRequest::MarkPaused { quest_id },
            };
            self.dispatch(request);
        }
    }

    /// Deliver queued notifications until the bus is empty.
    fn pump(&mut self, now: Instant) {
        while let Some(notification) = self.bus.next() {
            match notification {
                Notification::QuestSync => self.load_quests(),
                Notification::SubjectChanged { subject } => {
                    let commands = self.quest_timer.on_subject_changed(&subject, now);
                    if !commands.is_empty() {
                        tracing::info!(%subject, "quest timer stopped by subject change");
                    }
                    self.run_commands(commands);
                }
                Notification::DayReset { day } => {
                    self.tracker.roll_over(&day, self.store.as_ref());
                    self.refresh_progress();
                }
                Notification::GoalComplete {
                    subject,
                    goal_minutes,
                } => {
                    self.tracker
                        .mark_complete(&subject, goal_minutes, self.store.as_ref());
                    self.refresh_progress();
                    self.set_status(
                        StatusKind::Success,
                        format!("Quest complete! {subject} {goal_minutes} min"),
                    );
                }
                Notification::Dev(action) => self.apply_dev_action(action, now),
            }
        }
    }

    fn refresh_progress(&mut self) {
        self.subject_progress =
            self.tracker
                .reconcile(&self.quests, &self.config.subjects, self.store.as_ref());
    }

    // --- Clock ---

    /// Event-loop tick. Runs one `second_tick` per whole second that has
    /// passed since the last one.
    pub fn on_tick(&mut self, now: Instant) {
        let mut steps = 0;
        while now >= self.next_second && steps < MAX_CATCH_UP {
            let at = self.next_second;
            self.next_second += ONE_SECOND;
            self.second_tick(at);
            steps += 1;
        }
        if now >= self.next_second {
            self.next_second = now + ONE_SECOND;
        }
    }

    pub fn second_tick(&mut self, now: Instant) {
        let today = self.day_clock.current_day_key();
        if today != self.active_day {
            tracing::info!(from = %self.active_day, to = %today, "day rollover");
            self.day_reset(today, now);
        }

        // Subject flushes land on the subject's active quest, which may be
        // the one the quest timer is already crediting.
        let shadowed = self
            .quest_timer
            .active()
            .is_some_and(|a| self.stopwatch.current_subject() == Some(a.subject.as_str()));
        let mut commands = if shadowed {
            self.stopwatch.tick_shadowed(now)
        } else {
            self.stopwatch.tick(now)
        };
        commands.extend(self.quest_timer.tick(now));
        self.run_commands(commands);
        self.pump(now);
    }

    fn day_reset(&mut self, day: String, now: Instant) {
        let mut commands = self.stopwatch.day_reset(now);
        commands.extend(self.quest_timer.day_reset(now));
        self.run_commands(commands);
        self.active_day = day.clone();
        self.recorded_results.clear();
        self.bus.publish(Notification::DayReset { day });
    }

    /// Run the rollover sequence now, against today's key.
    fn force_day_reset(&mut self, now: Instant) {
        let today = self.day_clock.current_day_key();
        self.day_reset(today, now);
    }

    // --- Subject stopwatch ---

    pub fn select_subject(&mut self, subject: &str, now: Instant) {
        let changed = self.stopwatch.current_subject() != Some(subject);
        let commands = self.stopwatch.select(subject, now);
        self.run_commands(commands);
        if self.stopwatch.is_blocked(subject) {
            self.set_status(
                StatusKind::Info,
                format!("{subject} goal already complete today"),
            );
        }
        if changed {
            self.bus.publish(Notification::SubjectChanged {
                subject: subject.to_string(),
            });
        }
        self.pump(now);
    }

    pub fn select_subject_index(&mut self, index: usize, now: Instant) {
        if let Some(subject) = self.config.subjects.get(index).cloned() {
            self.select_subject(&subject, now);
        }
    }

    pub fn pause(&mut self, now: Instant) {
        let commands = self.stopwatch.pause(now);
        self.run_commands(commands);
    }

    pub fn stop(&mut self, now: Instant) {
        let commands = self.stopwatch.stop(now);
        self.run_commands(commands);
    }

    // --- Quest board ---

    pub fn selected_card(&self) -> Option<&QuestCard> {
        self.board.get(self.selected)
    }

    pub fn move_selection(&mut self, delta: isize) {
        if self.board.is_empty() {
            self.selected = 0;
            return;
        }
        let last = self.board.len() as isize - 1;
        self.selected = (self.selected as isize + delta).clamp(0, last) as usize;
    }

    pub fn activate_selected(&mut self, now: Instant) {
        let Some(card) = self.selected_card().cloned() else {
            return;
        };
        match card.section {
            CardSection::Problem => self.open_answer(&card),
            CardSection::Study => self.select_subject(&card.subject, now),
            CardSection::Time => {
                let (toggle, commands) = self.quest_timer.toggle(&card.id, &card.subject, now);
                self.run_commands(commands);
                if toggle == Toggle::Started && !self.stopwatch.is_running() {
                    self.select_subject(&card.subject, now);
                }
            }
        }
    }

    fn apply_quests(&mut self, quests: Vec<Quest>) {
        let selected_id = self.selected_card().map(|c| c.id.clone());
        self.quests = quests;
        self.board = build_board(&self.quests);
        self.selected = selected_id
            .and_then(|id| self.board.iter().position(|c| c.id == id))
            .unwrap_or(0);
        self.refresh_progress();
    }

    // --- Problem answers ---

    fn open_answer(&mut self, card: &QuestCard) {
        let prompt = match &card.detail {
            CardDetail::Prompt(p) => p.clone(),
            CardDetail::Goal { .. } => None,
        };
        self.modal = Some(Modal::Answer(AnswerPrompt {
            quest_id: card.id.clone(),
            title: card.title.clone(),
            prompt,
            input: LineInput::default(),
            feedback: None,
            waiting: false,
        }));
    }

    pub fn submit_answer(&mut self) {
        let user_id = self.identity.get().to_string();
        let Some(Modal::Answer(prompt)) = self.modal.as_mut() else {
            return;
        };
        if prompt.waiting {
            return;
        }
        let answer = prompt.input.value().trim().to_string();
        if answer.is_empty() {
            prompt.feedback = Some(AnswerFeedback::Empty);
            return;
        }
        prompt.waiting = true;
        prompt.feedback = None;
        let request = ApiRequest::SubmitAnswer {
            quest_id: prompt.quest_id.clone(),
            request: AnswerRequest { user_id, answer },
        };
        self.dispatch(request);
    }

    // --- AI helpers ---

    pub fn open_ask_ai(&mut self) {
        let subject = self
            .stopwatch
            .current_subject()
            .and_then(|s| self.config.subjects.iter().position(|x| x == s));
        self.modal = Some(Modal::AskAi(AiPrompt {
            input: LineInput::default(),
            subject,
            answer: None,
            waiting: false,
        }));
    }

    /// Cycle the AI subject through the configured list and "none".
    pub fn cycle_ai_subject(&mut self) {
        let count = self.config.subjects.len();
        if let Some(Modal::AskAi(prompt)) = self.modal.as_mut() {
            prompt.subject = match prompt.subject {
                None if count > 0 => Some(0),
                Some(i) if i + 1 < count => Some(i + 1),
                _ => None,
            };
        }
    }

    pub fn submit_ai(&mut self) {
        let user_id = self.identity.get().to_string();
        let subjects = self.config.subjects.clone();
        let Some(Modal::AskAi(prompt)) = self.modal.as_mut() else {
            return;
        };
        let text = prompt.input.value().trim().to_string();
        if text.is_empty() || prompt.waiting {
            return;
        }
        prompt.waiting = true;
        prompt.answer = None;
        let subject = prompt.subject.and_then(|i| subjects.get(i).cloned());
        self.dispatch(ApiRequest::AskAi(ChatRequest {
            user_id,
            subject,
            text,
        }));
    }

    /// Ask the backend for a new problem quest in the active subject (or the
    /// selected card's subject when the stopwatch is idle).
    pub fn generate_problem(&mut self) {
        let subject = self
            .stopwatch
            .current_subject()
            .map(str::to_string)
            .or_else(|| self.selected_card().map(|c| c.subject.clone()))
            .filter(|s| !s.is_empty());
        let Some(subject) = subject else {
            self.set_status(StatusKind::Error, "Select a subject first");
            return;
        };
        self.set_status(StatusKind::Info, format!("Generating a {subject} problem..."));
        self.dispatch(ApiRequest::GenerateProblem {
            user_id: self.identity.get().to_string(),
            subject,
        });
    }

    pub fn open_stats(&mut self) {
        self.modal = Some(Modal::Stats(None));
        self.dispatch(ApiRequest::Stats {
            user_id: self.identity.get().to_string(),
            days: self.config.stats_days,
        });
    }

    // --- Reset & debug ---

    pub fn request_full_reset(&mut self) {
        self.modal = Some(Modal::ConfirmReset);
    }

    pub fn confirm_full_reset(&mut self, now: Instant) {
        self.modal = None;
        if self.reset_in_flight {
            return;
        }
        // The backend is about to be wiped; unsent seconds are dropped rather
        // than flushed onto the reseeded quests.
        let dropped = self.stopwatch.pending() + self.quest_timer.pending();
        let _discarded = (self.stopwatch.stop(now), self.quest_timer.stop(now));
        tracing::debug!(dropped_seconds = dropped, "timers stopped for full reset");
        self.reset_in_flight = true;
        self.set_status(StatusKind::Info, "Resetting...");
        self.dispatch(ApiRequest::ResetAll);
    }

    pub fn toggle_debug(&mut self) {
        self.modal = match self.modal {
            Some(Modal::Debug { .. }) => None,
            _ => Some(Modal::Debug { selected: 0 }),
        };
    }

    pub fn move_debug_selection(&mut self, delta: isize) {
        if let Some(Modal::Debug { selected }) = self.modal.as_mut() {
            let last = DevAction::ALL.len() as isize - 1;
            *selected = (*selected as isize + delta).clamp(0, last) as usize;
        }
    }

    pub fn trigger_dev_action(&mut self, action: DevAction, now: Instant) {
        self.bus.publish(Notification::Dev(action));
        self.pump(now);
    }

    fn apply_dev_action(&mut self, action: DevAction, now: Instant) {
        tracing::info!(action = action.label(), "dev action");
        match action {
            DevAction::RefreshQuests => self.bus.publish(Notification::QuestSync),
            DevAction::AddSimulatedTime => {
                let seconds = self.config.simulated_seconds;
                let applied = if self.quest_timer.active().is_some() {
                    self.quest_timer.add_simulated(seconds)
                } else {
                    self.stopwatch.add_simulated(seconds)
                };
                if applied {
                    self.set_status(StatusKind::Info, format!("Added {seconds}s"));
                } else {
                    self.set_status(StatusKind::Error, "No active timer");
                }
            }
            DevAction::ForceDayRollover => self.force_day_reset(now),
            DevAction::FullReset => self.request_full_reset(),
        }
    }

    pub fn dismiss_modal(&mut self) {
        self.modal = None;
    }

    // --- Backend results ---

    pub fn on_api_event(&mut self, event: ApiEvent, now: Instant) {
        match event {
            ApiEvent::QuestsLoaded(result) => {
                self.loading = false;
                match result {
                    Ok(quests) => self.apply_quests(quests),
                    Err(err) => {
                        tracing::warn!(%err, "quest load failed");
                        self.set_status(StatusKind::Error, format!("Could not load quests: {err}"));
                    }
                }
            }
            ApiEvent::Flushed { target, result } => match result {
                Ok(quest) => self.on_flushed(target, quest),
                Err(err) => tracing::warn!(?target, %err, "flush failed, seconds dropped"),
            },
            ApiEvent::Paused { quest_id, result } => {
                if let Err(err) = result {
                    tracing::warn!(%quest_id, %err, "could not mark quest paused");
                }
            }
            ApiEvent::ResultRecorded { quest_id, result } => match result {
                Ok(_) => tracing::info!(%quest_id, "quest result recorded"),
                Err(err) => tracing::warn!(%quest_id, %err, "could not record quest result"),
            },
            ApiEvent::Answered { quest_id, result } => self.on_answered(&quest_id, result),
            ApiEvent::ResetDone(result) => {
                self.reset_in_flight = false;
                match result {
                    Ok(summary) => {
                        self.force_day_reset(now);
                        self.bus.publish(Notification::QuestSync);
                        self.set_status(
                            StatusKind::Success,
                            format!("Reset complete, {} quests seeded", summary.seeded_quests),
                        );
                    }
                    Err(err) => {
                        tracing::warn!(%err, "full reset failed");
                        self.status = None;
                        self.modal = Some(Modal::Message {
                            title: "Reset failed".to_string(),
                            body: err.to_string(),
                            is_error: true,
                        });
                    }
                }
            }
            ApiEvent::AiAnswered(result) => {
                if let Some(Modal::AskAi(prompt)) = self.modal.as_mut() {
                    prompt.waiting = false;
                    prompt.answer = Some(match result {
                        Ok(resp) if resp.answer.trim().is_empty() => Ok("(no answer)".to_string()),
                        Ok(resp) => Ok(resp.answer),
                        Err(err) => {
                            tracing::warn!(%err, "AI chat failed");
                            Err("Could not get an answer".to_string())
                        }
                    });
                }
            }
            ApiEvent::ProblemGenerated(result) => match result {
                Ok(quest) => {
                    self.set_status(StatusKind::Success, format!("New problem: {}", quest.title));
                    self.bus.publish(Notification::QuestSync);
                }
                Err(err) => {
                    tracing::warn!(%err, "problem generation failed");
                    self.set_status(StatusKind::Error, format!("Could not generate a problem: {err}"));
                }
            },
            ApiEvent::Stats(result) => match result {
                Ok(summary) => {
                    if let Some(Modal::Stats(slot)) = self.modal.as_mut() {
                        *slot = Some(summary);
                    }
                }
                Err(err) => {
                    tracing::warn!(%err, "stats request failed");
                    if matches!(self.modal, Some(Modal::Stats(_))) {
                        self.modal = Some(Modal::Message {
                            title: "Stats unavailable".to_string(),
                            body: err.to_string(),
                            is_error: true,
                        });
                    }
                }
            },
        }
        self.pump(now);
    }

    fn on_flushed(&mut self, target: FlushTarget, quest: Quest) {
        match &target {
            FlushTarget::Subject(subject) => {
                if let Some(reached) = self.stopwatch.on_flush_response(subject, &quest) {
                    self.bus.publish(Notification::GoalComplete {
                        subject: reached.subject,
                        goal_minutes: reached.goal_minutes,
                    });
                }
            }
            FlushTarget::Quest(_) => {
                if self.quest_timer.on_flush_response(&quest) {
                    self.set_status(StatusKind::Success, format!("Quest complete! {}", quest.title));
                }
                if quest.status.is_completed() && self.recorded_results.insert(quest.id.clone()) {
                    self.dispatch(ApiRequest::RecordResult {
                        quest_id: quest.id.clone(),
                        request: ResultRequest {
                            user_id: self.identity.get().to_string(),
                            result: QuestOutcome::Success,
                        },
                    });
                }
            }
        }
        self.bus.publish(Notification::QuestSync);
    }

    fn on_answered(
        &mut self,
        quest_id: &str,
        result: Result<AnswerResponse, RequestError>,
    ) {
        let Some(Modal::Answer(prompt)) = self.modal.as_mut() else {
            return;
        };
        if prompt.quest_id != quest_id {
            return;
        }
        prompt.waiting = false;
        match result {
            Ok(resp) if resp.correct => {
                prompt.input.clear();
                self.modal = None;
                self.set_status(StatusKind::Success, "Correct!");
                self.bus.publish(Notification::QuestSync);
            }
            Ok(resp) => {
                prompt.feedback = Some(AnswerFeedback::Wrong {
                    expected: resp.expected_answer,
                    explanation: resp.explanation,
                });
                prompt.input.select_all();
            }
            Err(err) => {
                tracing::warn!(%quest_id, %err, "answer submission failed");
                prompt.feedback = Some(AnswerFeedback::Failed(err.to_string()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};

    use crate::api::model::{ProblemMeta, QuestKind, QuestStatus, ResetSummary};
    use crate::clock::manual::ManualClock;

    #[derive(Clone, Default)]
    struct Recorder(Rc<RefCell<Vec<ApiRequest>>>);

    impl Dispatch for Recorder {
        fn dispatch(&self, request: ApiRequest) {
            self.0.borrow_mut().push(request);
        }
    }

    impl Recorder {
        fn take(&self) -> Vec<ApiRequest> {
            std::mem::take(&mut self.0.borrow_mut())
        }
    }

    fn make_app() -> (App, Recorder) {
        let recorder = Recorder::default();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 3, 0, 0).unwrap(),
        ));
        let app = App::new(
            Config::default(),
            Box::new(recorder.clone()),
            DayClock::new(540, clock),
            None,
        );
        (app, recorder)
    }

    fn time_quest(id: &str, subject: &str) -> Quest {
        Quest {
            id: id.to_string(),
            title: id.to_string(),
            subject: subject.to_string(),
            kind: QuestKind::Time,
            goal_value: 30,
            progress_seconds: Some(0),
            ..Default::default()
        }
    }

    fn problem_quest(id: &str) -> Quest {
        Quest {
            id: id.to_string(),
            title: id.to_string(),
            subject: "수학".to_string(),
            kind: QuestKind::Problem,
            meta: Some(ProblemMeta {
                problem: Some("2+2?".to_string()),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_start_loads_quests() {
        let (mut app, rec) = make_app();
        app.start();
        assert_eq!(
            rec.take(),
            vec![ApiRequest::LoadQuests {
                user_id: "u1".to_string()
            }]
        );
        assert!(app.loading);
    }

    #[test]
    fn test_quest_timer_start_selects_idle_stopwatch() {
        let (mut app, rec) = make_app();
        let t0 = Instant::now();
        app.on_api_event(ApiEvent::QuestsLoaded(Ok(vec![time_quest("q1", "영어")])), t0);
        rec.take();

        app.activate_selected(t0);
        assert!(app.quest_timer.is_running_for("q1"));
        assert_eq!(app.stopwatch.current_subject(), Some("영어"));
        // Same subject: the quest timer survives the SubjectChanged.
        assert!(app.quest_timer.is_running_for("q1"));
    }

    #[test]
    fn test_subject_change_stops_quest_timer() {
        let (mut app, rec) = make_app();
        let t0 = Instant::now();
        app.on_api_event(ApiEvent::QuestsLoaded(Ok(vec![time_quest("q1", "영어")])), t0);
        app.activate_selected(t0);
        app.second_tick(t0 + ONE_SECOND);
        rec.take();

        app.select_subject("수학", t0 + ONE_SECOND);
        assert!(app.quest_timer.active().is_none());
        let requests = rec.take();
        assert!(requests.contains(&ApiRequest::MarkPaused {
            quest_id: "q1".to_string()
        }));
    }

    #[test]
    fn test_empty_answer_is_not_sent() {
        let (mut app, rec) = make_app();
        let t0 = Instant::now();
        app.on_api_event(ApiEvent::QuestsLoaded(Ok(vec![problem_quest("p1")])), t0);
        rec.take();
        app.activate_selected(t0);
        app.submit_answer();
        assert!(rec.take().is_empty());
        match &app.modal {
            Some(Modal::Answer(p)) => assert_eq!(p.feedback, Some(AnswerFeedback::Empty)),
            _ => panic!("answer modal expected"),
        }
    }

    #[test]
    fn test_wrong_answer_keeps_text_selected() {
        let (mut app, rec) = make_app();
        let t0 = Instant::now();
        app.on_api_event(ApiEvent::QuestsLoaded(Ok(vec![problem_quest("p1")])), t0);
        app.activate_selected(t0);
        if let Some(Modal::Answer(p)) = app.modal.as_mut() {
            p.input = LineInput::new("5");
        }
        app.submit_answer();
        assert!(rec.take().iter().any(|r| matches!(r, ApiRequest::SubmitAnswer { .. })));

        let wrong = AnswerResponse {
            correct: false,
            expected_answer: Some("4".to_string()),
            explanation: None,
        };
        app.on_api_event(
            ApiEvent::Answered {
                quest_id: "p1".to_string(),
                result: Ok(wrong),
            },
            t0,
        );
        match &app.modal {
            Some(Modal::Answer(p)) => {
                assert!(p.input.is_selected());
                assert_eq!(p.input.value(), "5");
                assert!(matches!(&p.feedback, Some(AnswerFeedback::Wrong { expected: Some(e), .. }) if e == "4"));
            }
            _ => panic!("answer modal expected"),
        }
    }

    #[test]
    fn test_correct_answer_closes_and_syncs() {
        let (mut app, rec) = make_app();
        let t0 = Instant::now();
        app.on_api_event(ApiEvent::QuestsLoaded(Ok(vec![problem_quest("p1")])), t0);
        app.activate_selected(t0);
        rec.take();
        app.on_api_event(
            ApiEvent::Answered {
                quest_id: "p1".to_string(),
                result: Ok(AnswerResponse {
                    correct: true,
                    ..Default::default()
                }),
            },
            t0,
        );
        assert!(app.modal.is_none());
        assert!(rec.take().iter().any(|r| matches!(r, ApiRequest::LoadQuests { .. })));
    }

    #[test]
    fn test_completed_quest_flush_records_result_once() {
        let (mut app, rec) = make_app();
        let t0 = Instant::now();
        let mut done = time_quest("q1", "영어");
        done.status = QuestStatus::Completed;
        for _ in 0..2 {
            app.on_api_event(
                ApiEvent::Flushed {
                    target: FlushTarget::Quest("q1".to_string()),
                    result: Ok(done.clone()),
                },
                t0,
            );
        }
        let results = rec
            .take()
            .into_iter()
            .filter(|r| matches!(r, ApiRequest::RecordResult { .. }))
            .count();
        assert_eq!(results, 1);
    }

    #[test]
    fn test_full_reset_sequence() {
        let (mut app, rec) = make_app();
        let t0 = Instant::now();
        app.select_subject("수학", t0);
        app.second_tick(t0 + ONE_SECOND);
        rec.take();

        assert_eq!(app.stopwatch.pending(), 1);

        app.request_full_reset();
        assert!(matches!(app.modal, Some(Modal::ConfirmReset)));
        app.confirm_full_reset(t0 + ONE_SECOND);
        assert!(app.stopwatch.session().is_none());
        assert_eq!(rec.take(), vec![ApiRequest::ResetAll]);

        app.on_api_event(
            ApiEvent::ResetDone(Ok(ResetSummary {
                ok: true,
                seeded_quests: 3,
                user: Some("u1".to_string()),
            })),
            t0 + ONE_SECOND,
        );
        assert!(rec.take().iter().any(|r| matches!(r, ApiRequest::LoadQuests { .. })));
        assert_eq!(app.status.as_ref().map(|s| s.kind), Some(StatusKind::Success));
    }

    #[test]
    fn test_simulated_time_without_timer_reports_error() {
        let (mut app, _rec) = make_app();
        app.trigger_dev_action(DevAction::AddSimulatedTime, Instant::now());
        assert_eq!(app.status.as_ref().map(|s| s.kind), Some(StatusKind::Error));
    }

    #[test]
    fn test_ai_subject_cycles_through_none() {
        let (mut app, _rec) = make_app();
        app.open_ask_ai();
        let subject = |app: &App| match &app.modal {
            Some(Modal::AskAi(p)) => p.subject,
            _ => panic!("ai modal expected"),
        };
        assert_eq!(subject(&app), None);
        app.cycle_ai_subject();
        assert_eq!(subject(&app), Some(0));
        app.cycle_ai_subject();
        app.cycle_ai_subject();
        assert_eq!(subject(&app), Some(2));
        app.cycle_ai_subject();
        assert_eq!(subject(&app), None);
    }
}
