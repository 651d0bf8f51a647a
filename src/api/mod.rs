pub mod client;
pub mod model;

use url::form_urlencoded;

use client::{HttpClient, RequestError};
use model::{
    AnswerRequest, AnswerResponse, ChatRequest, ChatResponse, Quest, QuestPatch, ResetSummary,
    ResultRequest, ResultResponse, StatsSummary, TimerUpdate,
};

/// Typed view of the quest backend. Implemented over HTTP for the real
/// client; tests substitute their own.
pub trait Backend: Send + Sync {
    fn list_quests(&self, user_id: &str) -> Result<Vec<Quest>, RequestError>;
    fn timer_update(&self, update: &TimerUpdate) -> Result<Quest, RequestError>;
    fn submit_answer(&self, quest_id: &str, req: &AnswerRequest)
    -> Result<AnswerResponse, RequestError>;
    fn patch_quest(&self, quest_id: &str, patch: &QuestPatch) -> Result<Quest, RequestError>;
    fn post_result(&self, quest_id: &str, req: &ResultRequest)
    -> Result<ResultResponse, RequestError>;
    fn reset_all(&self, seed: bool) -> Result<ResetSummary, RequestError>;
    fn ask_ai(&self, req: &ChatRequest) -> Result<ChatResponse, RequestError>;
    fn generate_problem(&self, user_id: &str, subject: &str) -> Result<Quest, RequestError>;
    fn stats_summary(&self, user_id: &str, days: u32) -> Result<StatsSummary, RequestError>;
}

fn with_query(path: &str, params: &[(&str, &str)]) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    format!("{path}?{query}")
}

/// `/quests/<id><suffix>` with the id escaped as a single path segment.
fn quest_path(quest_id: &str, suffix: &str) -> String {
    format!("/quests/{}{suffix}", urlencoding::encode(quest_id))
}

impl Backend for HttpClient {
    fn list_quests(&self, user_id: &str) -> Result<Vec<Quest>, RequestError> {
        self.get(&with_query("/quests", &[("user_id", user_id)]))
    }

    fn timer_update(&self, update: &TimerUpdate) -> Result<Quest, RequestError> {
        self.post("/timer/update", Some(update))
    }

    fn submit_answer(
        &self,
        quest_id: &str,
        req: &AnswerRequest,
    ) -> Result<AnswerResponse, RequestError> {
        self.post(&quest_path(quest_id, "/answer"), Some(req))
    }

    fn patch_quest(&self, quest_id: &str, patch: &QuestPatch) -> Result<Quest, RequestError> {
        // The backend reads these from the query string, not the body.
        let progress = patch.progress_value.map(|v| v.to_string());
        let mut params = Vec::new();
        if let Some(status) = &patch.status {
            params.push(("status", status.as_str()));
        }
        if let Some(progress) = &progress {
            params.push(("progress_value", progress.as_str()));
        }
        let path = quest_path(quest_id, "");
        let path = if params.is_empty() {
            path
        } else {
            with_query(&path, &params)
        };
        self.patch(&path, patch)
    }

    fn post_result(
        &self,
        quest_id: &str,
        req: &ResultRequest,
    ) -> Result<ResultResponse, RequestError> {
        self.post(&quest_path(quest_id, "/result"), Some(req))
    }

    fn reset_all(&self, seed: bool) -> Result<ResetSummary, RequestError> {
        let seed = if seed { "true" } else { "false" };
        self.post::<_, ()>(&with_query("/admin/reset_all", &[("seed", seed)]), None)
    }

    fn ask_ai(&self, req: &ChatRequest) -> Result<ChatResponse, RequestError> {
        self.post("/ai/chat", Some(req))
    }

    fn generate_problem(&self, user_id: &str, subject: &str) -> Result<Quest, RequestError> {
        let path = with_query(
            "/ai/quests/ai_problem",
            &[("user_id", user_id), ("subject", subject)],
        );
        self.post::<_, ()>(&path, None)
    }

    fn stats_summary(&self, user_id: &str, days: u32) -> Result<StatsSummary, RequestError> {
        let days = days.to_string();
        self.get(&with_query(
            "/stats/summary",
            &[("user_id", user_id), ("days", days.as_str())],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_is_percent_encoded() {
        let path = with_query("/ai/quests/ai_problem", &[("user_id", "u1"), ("subject", "수학")]);
        assert_eq!(
            path,
            "/ai/quests/ai_problem?user_id=u1&subject=%EC%88%98%ED%95%99"
        );
    }

    #[test]
    fn test_reset_path_carries_seed_flag() {
        assert_eq!(
            with_query("/admin/reset_all", &[("seed", "true")]),
            "/admin/reset_all?seed=true"
        );
    }

    #[test]
    fn test_quest_path_escapes_id() {
        assert_eq!(quest_path("auto_수학_1", "/answer"), "/quests/auto_%EC%88%98%ED%95%99_1/answer");
        assert_eq!(quest_path("q1", ""), "/quests/q1");
    }

    #[test]
    fn test_quest_path_space_and_plus_stay_distinct() {
        assert_eq!(quest_path("a b", ""), "/quests/a%20b");
        assert_eq!(quest_path("a+b", ""), "/quests/a%2Bb");
    }
}
