use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};

use crate::engine::progress::SubjectProgress;
use crate::ui::components::progress_bar::ProgressBar;
use crate::ui::theme::Theme;

pub struct SubjectSidebar<'a> {
    pub rows: &'a [SubjectProgress],
    pub day: &'a str,
    pub theme: &'a Theme,
}

impl Widget for SubjectSidebar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let block = Block::bordered()
            .title(format!(" Today {} ", self.day))
            .border_style(Style::default().fg(colors.border()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        for (i, row) in self.rows.iter().enumerate() {
            let y = inner.y + i as u16 * 3;
            if y + 1 >= inner.y + inner.height {
                break;
            }
            let goal = row
                .goal_minutes
                .map(|m| format!("  {m} min"))
                .unwrap_or_default();
            let mut spans = vec![
                Span::styled(
                    format!(" {}", row.subject),
                    Style::default()
                        .fg(colors.fg())
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(goal, Style::default().fg(colors.muted())),
            ];
            if row.complete {
                spans.push(Span::styled("  done", Style::default().fg(colors.success())));
            }
            Paragraph::new(Line::from(spans)).render(Rect::new(inner.x, y, inner.width, 1), buf);
            ProgressBar::new(row.percent, self.theme).render(
                Rect::new(inner.x + 1, y + 1, inner.width.saturating_sub(2), 1),
                buf,
            );
        }
    }
}
