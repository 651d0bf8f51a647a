use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const STUDY_TAG: &str = "study";
pub const STUDY_TAG_KO: &str = "\u{d559}\u{c2b5}";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestKind {
    #[default]
    Time,
    Problem,
}

/// Quest lifecycle as reported by the backend. Statuses this client does not
/// know about are kept verbatim so they still render.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum QuestStatus {
    #[default]
    Pending,
    InProgress,
    Paused,
    Completed,
    Other(String),
}

impl QuestStatus {
    pub fn as_str(&self) -> &str {
        match self {
            QuestStatus::Pending => "pending",
            QuestStatus::InProgress => "in_progress",
            QuestStatus::Paused => "paused",
            QuestStatus::Completed => "completed",
            QuestStatus::Other(s) => s,
        }
    }

    pub fn is_completed(&self) -> bool {
        *self == QuestStatus::Completed
    }
}

impl From<&str> for QuestStatus {
    fn from(s: &str) -> Self {
        match s {
            "pending" => QuestStatus::Pending,
            "in_progress" => QuestStatus::InProgress,
            "paused" => QuestStatus::Paused,
            "completed" => QuestStatus::Completed,
            other => QuestStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for QuestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for QuestStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for QuestStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(QuestStatus::from(s.as_str()))
    }
}

/// Problem payload attached to answer-type quests. Only the prompt is read
/// here; answers are checked server-side, so the rest of the generated
/// payload is ignored whatever its JSON type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProblemMeta {
    #[serde(default, deserialize_with = "lenient_text")]
    pub problem: Option<String>,
}

/// Generated fields may arrive as numbers; keep them as their JSON text.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub subject: String,
    #[serde(rename = "type", default)]
    pub kind: QuestKind,
    #[serde(default)]
    pub status: QuestStatus,
    #[serde(default)]
    pub goal_value: u32,
    #[serde(default)]
    pub progress_value: u32,
    #[serde(default)]
    pub progress_seconds: Option<u64>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub tags_ko: Option<Vec<String>>,
    #[serde(default)]
    pub meta: Option<ProblemMeta>,
}

impl Quest {
    /// Seconds of progress, preferring the exact counter when the backend sends it.
    pub fn effective_seconds(&self) -> u64 {
        self.progress_seconds
            .unwrap_or(u64::from(self.progress_value) * 60)
    }

    pub fn is_study(&self) -> bool {
        let has = |tags: &Option<Vec<String>>, tag: &str| {
            tags.as_ref().is_some_and(|t| t.iter().any(|x| x == tag))
        };
        has(&self.tags, STUDY_TAG) || has(&self.tags_ko, STUDY_TAG_KO)
    }

    pub fn is_problem(&self) -> bool {
        self.kind == QuestKind::Problem || self.goal_value == 0
    }

    pub fn prompt(&self) -> Option<&str> {
        self.meta.as_ref().and_then(|m| m.problem.as_deref())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TimerUpdate {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quest_id: Option<String>,
    pub delta_seconds: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AnswerRequest {
    pub user_id: String,
    pub answer: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct AnswerResponse {
    pub correct: bool,
    #[serde(default)]
    pub expected_answer: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct QuestPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<QuestStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_value: Option<u32>,
}

impl QuestPatch {
    pub fn paused() -> Self {
        Self {
            status: Some(QuestStatus::Paused),
            progress_value: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestOutcome {
    Success,
    Failure,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResultRequest {
    pub user_id: String,
    pub result: QuestOutcome,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ResultResponse {
    #[serde(default)]
    pub ok: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ResetSummary {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub seeded_quests: u32,
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub subject: Option<String>,
    pub text: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub answer: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct DailyMinutes {
    pub date: String,
    #[serde(default)]
    pub minutes_by_subject: BTreeMap<String, u64>,
    #[serde(default)]
    pub total_minutes: u64,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct StatsSummary {
    #[serde(default)]
    pub range_days: u32,
    #[serde(default)]
    pub totals_by_subject: BTreeMap<String, u64>,
    #[serde(default)]
    pub total_minutes: u64,
    #[serde(default)]
    pub daily: Vec<DailyMinutes>,
    #[serde(default)]
    pub streak_days: u32,
}
