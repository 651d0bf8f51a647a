use crate::api::model::{Quest, QuestStatus};
use crate::engine::progress::display_percent;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardSection {
    Study,
    Time,
    Problem,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CardDetail {
    Goal { minutes: u32, percent: u8 },
    Prompt(Option<String>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuestCard {
    pub id: String,
    pub title: String,
    pub subject: String,
    pub section: CardSection,
    pub status: QuestStatus,
    pub detail: CardDetail,
}

impl QuestCard {
    fn from_quest(quest: &Quest, section: CardSection) -> Self {
        let detail = match section {
            CardSection::Problem => CardDetail::Prompt(quest.prompt().map(str::to_string)),
            CardSection::Study | CardSection::Time => CardDetail::Goal {
                minutes: quest.goal_value,
                percent: display_percent(quest),
            },
        };
        Self {
            id: quest.id.clone(),
            title: quest.title.clone(),
            subject: quest.subject.clone(),
            section,
            status: quest.status.clone(),
            detail,
        }
    }

    /// Plain time quests run on their own timer; study quests are driven by
    /// the subject stopwatch instead.
    pub fn has_timer(&self) -> bool {
        self.section == CardSection::Time
    }

    pub fn is_problem(&self) -> bool {
        self.section == CardSection::Problem
    }
}

fn section_of(quest: &Quest) -> CardSection {
    if quest.is_problem() {
        CardSection::Problem
    } else if quest.is_study() {
        CardSection::Study
    } else {
        CardSection::Time
    }
}

/// Lay out a quest snapshot: study quests, then other time quests by most
/// progress, then problems. Ties keep snapshot order.
pub fn build_board(quests: &[Quest]) -> Vec<QuestCard> {
    let mut study = Vec::new();
    let mut time: Vec<&Quest> = Vec::new();
    let mut problems = Vec::new();
    for quest in quests {
        match section_of(quest) {
            CardSection::Study => study.push(quest),
            CardSection::Time => time.push(quest),
            CardSection::Problem => problems.push(quest),
        }
    }
    time.sort_by(|a, b| b.effective_seconds().cmp(&a.effective_seconds()));

    let cards = |list: Vec<&Quest>, section| {
        list.into_iter()
            .map(move |q| QuestCard::from_quest(q, section))
            .collect::<Vec<_>>()
    };
    let mut board = cards(study, CardSection::Study);
    board.extend(cards(time, CardSection::Time));
    board.extend(cards(problems, CardSection::Problem));
    board
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::model::{ProblemMeta, QuestKind, STUDY_TAG_KO};

    fn time(id: &str, goal: u32, seconds: u64) -> Quest {
        Quest {
            id: id.to_string(),
            title: id.to_string(),
            subject: "수학".to_string(),
            kind: QuestKind::Time,
            goal_value: goal,
            progress_seconds: Some(seconds),
            ..Default::default()
        }
    }

    fn problem(id: &str, prompt: Option<&str>) -> Quest {
        Quest {
            id: id.to_string(),
            title: id.to_string(),
            kind: QuestKind::Problem,
            meta: Some(ProblemMeta {
                problem: prompt.map(str::to_string),
            }),
            ..Default::default()
        }
    }

    fn ids(board: &[QuestCard]) -> Vec<&str> {
        board.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_sections_and_order() {
        let mut study = time("study", 25, 10);
        study.tags_ko = Some(vec![STUDY_TAG_KO.to_string()]);
        let quests = vec![
            problem("p1", Some("2+2?")),
            time("slow", 30, 60),
            study,
            time("fast", 30, 900),
            time("tied", 30, 60),
        ];

        let board = build_board(&quests);
        assert_eq!(ids(&board), vec!["study", "fast", "slow", "tied", "p1"]);
        assert_eq!(board[0].section, CardSection::Study);
        assert!(!board[0].has_timer());
        assert!(board[1].has_timer());
        assert!(board[4].is_problem());
    }

    #[test]
    fn test_zero_goal_time_quest_is_problem() {
        let board = build_board(&[time("odd", 0, 0)]);
        assert_eq!(board[0].section, CardSection::Problem);
        assert_eq!(board[0].detail, CardDetail::Prompt(None));
    }

    #[test]
    fn test_card_details() {
        let board = build_board(&[time("q1", 25, 750), problem("p1", Some("3x=9"))]);
        assert_eq!(
            board[0].detail,
            CardDetail::Goal {
                minutes: 25,
                percent: 50
            }
        );
        assert_eq!(board[1].detail, CardDetail::Prompt(Some("3x=9".to_string())));
    }

    #[test]
    fn test_empty_snapshot() {
        assert!(build_board(&[]).is_empty());
    }
}
