use std::sync::Arc;
use std::sync::mpsc;
use std::thread;

use crate::api::Backend;
use crate::api::client::RequestError;
use crate::api::model::{
    AnswerRequest, AnswerResponse, ChatRequest, ChatResponse, Quest, QuestPatch, ResetSummary,
    ResultRequest, ResultResponse, StatsSummary, TimerUpdate,
};
use crate::event::AppEvent;
use crate::session::FlushTarget;

/// A backend call the controller wants made. Requests never block the UI
/// thread; their outcome comes back as an [`ApiEvent`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiRequest {
    LoadQuests {
        user_id: String,
    },
    Flush {
        target: FlushTarget,
        update: TimerUpdate,
    },
    MarkPaused {
        quest_id: String,
    },
    RecordResult {
        quest_id: String,
        request: ResultRequest,
    },
    SubmitAnswer {
        quest_id: String,
        request: AnswerRequest,
    },
    ResetAll,
    AskAi(ChatRequest),
    GenerateProblem {
        user_id: String,
        subject: String,
    },
    Stats {
        user_id: String,
        days: u32,
    },
}

#[derive(Debug)]
pub enum ApiEvent {
    QuestsLoaded(Result<Vec<Quest>, RequestError>),
    Flushed {
        target: FlushTarget,
        result: Result<Quest, RequestError>,
    },
    Paused {
        quest_id: String,
        result: Result<Quest, RequestError>,
    },
    ResultRecorded {
        quest_id: String,
        result: Result<ResultResponse, RequestError>,
    },
    Answered {
        quest_id: String,
        result: Result<AnswerResponse, RequestError>,
    },
    ResetDone(Result<ResetSummary, RequestError>),
    AiAnswered(Result<ChatResponse, RequestError>),
    ProblemGenerated(Result<Quest, RequestError>),
    Stats(Result<StatsSummary, RequestError>),
}

impl ApiRequest {
    fn name(&self) -> &'static str {
        match self {
            ApiRequest::LoadQuests { .. } => "load_quests",
            ApiRequest::Flush { .. } => "flush",
            ApiRequest::MarkPaused { .. } => "mark_paused",
            ApiRequest::RecordResult { .. } => "record_result",
            ApiRequest::SubmitAnswer { .. } => "submit_answer",
            ApiRequest::ResetAll => "reset_all",
            ApiRequest::AskAi(_) => "ask_ai",
            ApiRequest::GenerateProblem { .. } => "generate_problem",
            ApiRequest::Stats { .. } => "stats",
        }
    }

    /// Run the request to completion on the calling thread.
    pub fn execute(self, backend: &dyn Backend) -> ApiEvent {
        match self {
            ApiRequest::LoadQuests { user_id } => ApiEvent::QuestsLoaded(backend.list_quests(&user_id)),
            ApiRequest::Flush { target, update } => ApiEvent::Flushed {
                target,
                result: backend.timer_update(&update),
            },
            ApiRequest::MarkPaused { quest_id } => {
                let result = backend.patch_quest(&quest_id, &QuestPatch::paused());
                ApiEvent::Paused { quest_id, result }
            }
            ApiRequest::RecordResult { quest_id, request } => {
                let result = backend.post_result(&quest_id, &request);
                ApiEvent::ResultRecorded { quest_id, result }
            }
            ApiRequest::SubmitAnswer { quest_id, request } => {
                let result = backend.submit_answer(&quest_id, &request);
                ApiEvent::Answered { quest_id, result }
            }
            ApiRequest::ResetAll => ApiEvent::ResetDone(backend.reset_all(true)),
            ApiRequest::AskAi(request) => ApiEvent::AiAnswered(backend.ask_ai(&request)),
            ApiRequest::GenerateProblem { user_id, subject } => {
                ApiEvent::ProblemGenerated(backend.generate_problem(&user_id, &subject))
            }
            ApiRequest::Stats { user_id, days } => {
                ApiEvent::Stats(backend.stats_summary(&user_id, days))
            }
        }
    }
}

/// Where the controller sends backend work.
pub trait Dispatch {
    fn dispatch(&self, request: ApiRequest);
}

/// Runs each request on its own short-lived thread and posts the outcome
/// back into the event loop. A hung request only holds its own thread.
pub struct ThreadDispatcher {
    backend: Arc<dyn Backend>,
    tx: mpsc::Sender<AppEvent>,
}

impl ThreadDispatcher {
    pub fn new(backend: Arc<dyn Backend>, tx: mpsc::Sender<AppEvent>) -> Self {
        Self { backend, tx }
    }
}

impl Dispatch for ThreadDispatcher {
    fn dispatch(&self, request: ApiRequest) {
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        let name = request.name();
        let spawned = thread::Builder::new()
            .name(format!("api-{name}"))
            .spawn(move || {
                let event = request.execute(backend.as_ref());
                // The loop is gone when the app is shutting down.
                let _ = tx.send(AppEvent::Api(event));
            });
        if let Err(err) = spawned {
            tracing::error!(%err, request = name, "could not spawn request thread");
        }
    }
}
