use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};

use crate::api::model::QuestStatus;
use crate::engine::board::{CardDetail, CardSection, QuestCard};
use crate::ui::components::progress_bar::ProgressBar;
use crate::ui::theme::Theme;

const ROW_HEIGHT: u16 = 2;

pub struct QuestList<'a> {
    pub cards: &'a [QuestCard],
    pub selected: usize,
    /// Quest whose own timer is running, if any.
    pub running: Option<&'a str>,
    pub loading: bool,
    pub theme: &'a Theme,
}

impl<'a> QuestList<'a> {
    pub fn new(cards: &'a [QuestCard], selected: usize, theme: &'a Theme) -> Self {
        Self {
            cards,
            selected,
            running: None,
            loading: false,
            theme,
        }
    }

    pub fn running(mut self, quest_id: Option<&'a str>) -> Self {
        self.running = quest_id;
        self
    }

    pub fn loading(mut self, loading: bool) -> Self {
        self.loading = loading;
        self
    }
}

/// First card index to draw so the selection stays on screen.
pub fn scroll_offset(selected: usize, visible_rows: usize) -> usize {
    if visible_rows == 0 {
        return 0;
    }
    selected.saturating_sub(visible_rows - 1)
}

fn section_tag(section: CardSection) -> &'static str {
    match section {
        CardSection::Study => "STUDY",
        CardSection::Time => "TIME",
        CardSection::Problem => "PROBLEM",
    }
}

impl Widget for QuestList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let title = if self.loading { " Quests (syncing) " } else { " Quests " };
        let block = Block::bordered()
            .title(title)
            .border_style(Style::default().fg(colors.border()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        if self.cards.is_empty() {
            Paragraph::new(Line::from(Span::styled(
                "  No quests yet. Pick a subject to start one.",
                Style::default().fg(colors.muted()),
            )))
            .render(inner, buf);
            return;
        }

        let visible = (inner.height / ROW_HEIGHT) as usize;
        let offset = scroll_offset(self.selected, visible);

        for (row, (i, card)) in self
            .cards
            .iter()
            .enumerate()
            .skip(offset)
            .take(visible)
            .enumerate()
        {
            let y = inner.y + row as u16 * ROW_HEIGHT;
            let is_selected = i == self.selected;
            let is_running = self.running == Some(card.id.as_str());
            let row_style = if is_selected {
                Style::default().bg(colors.selected_bg())
            } else {
                Style::default()
            };

            let indicator = if is_selected { ">" } else { " " };
            let title_style = Style::default()
                .fg(if is_running { colors.running() } else { colors.fg() })
                .add_modifier(if is_selected {
                    Modifier::BOLD
                } else {
                    Modifier::empty()
                });
            let status_style = Style::default().fg(match card.status {
                QuestStatus::Completed => colors.success(),
                QuestStatus::InProgress => colors.running(),
                _ => colors.muted(),
            });
            let mut spans = vec![
                Span::styled(format!(" {indicator} "), Style::default().fg(colors.accent())),
                Span::styled(
                    format!("[{}] ", section_tag(card.section)),
                    Style::default().fg(colors.accent_dim()),
                ),
                Span::styled(card.title.as_str(), title_style),
                Span::styled(format!("  {}", card.subject), Style::default().fg(colors.muted())),
                Span::styled(format!("  {}", card.status), status_style),
            ];
            if is_running {
                spans.push(Span::styled("  \u{25b6}", Style::default().fg(colors.running())));
            }
            let title_row = Rect::new(inner.x, y, inner.width, 1);
            Paragraph::new(Line::from(spans))
                .style(row_style)
                .render(title_row, buf);

            if y + 1 >= inner.y + inner.height {
                continue;
            }
            let detail_row = Rect::new(inner.x, y + 1, inner.width, 1);
            match &card.detail {
                CardDetail::Goal { minutes, percent } => {
                    let label = format!("     goal {minutes} min ");
                    let label_w = (label.chars().count() as u16).min(detail_row.width);
                    Paragraph::new(Span::styled(label, Style::default().fg(colors.muted())))
                        .style(row_style)
                        .render(Rect::new(detail_row.x, detail_row.y, label_w, 1), buf);
                    let bar_w = detail_row.width.saturating_sub(label_w + 2).min(30);
                    ProgressBar::new(*percent, self.theme).render(
                        Rect::new(detail_row.x + label_w, detail_row.y, bar_w, 1),
                        buf,
                    );
                }
                CardDetail::Prompt(prompt) => {
                    let text = prompt.as_deref().unwrap_or("(no problem text)");
                    Paragraph::new(Span::styled(
                        format!("     Q. {text}"),
                        Style::default().fg(colors.muted()),
                    ))
                    .style(row_style)
                    .render(detail_row, buf);
                }
            }
        }
    }
}
