use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};

use crate::clock::format_hms;
use crate::engine::progress::SubjectProgress;
use crate::session::stopwatch::Stopwatch;
use crate::ui::components::progress_bar::ProgressBar;
use crate::ui::theme::Theme;

/// Subject buttons, elapsed time and the active quest's progress line.
pub struct StopwatchPanel<'a> {
    pub stopwatch: &'a Stopwatch,
    pub subjects: &'a [SubjectProgress],
    pub theme: &'a Theme,
}

impl<'a> StopwatchPanel<'a> {
    pub fn new(stopwatch: &'a Stopwatch, subjects: &'a [SubjectProgress], theme: &'a Theme) -> Self {
        Self {
            stopwatch,
            subjects,
            theme,
        }
    }
}

impl Widget for StopwatchPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let sw = self.stopwatch;

        let state = match sw.session() {
            Some(s) if s.running => " running ",
            Some(_) => " paused ",
            None => " idle ",
        };
        let block = Block::bordered()
            .title(" Stopwatch ")
            .title_bottom(Line::from(state).right_aligned())
            .border_style(Style::default().fg(if sw.is_running() {
                colors.border_focused()
            } else {
                colors.border()
            }))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .split(inner);

        let current = sw.current_subject();
        let mut buttons = vec![Span::raw(" ")];
        for (i, progress) in self.subjects.iter().enumerate() {
            let active = current == Some(progress.subject.as_str());
            let mut style = Style::default().fg(if progress.complete {
                colors.success()
            } else {
                colors.fg()
            });
            if active {
                style = style.bg(colors.accent()).fg(colors.bg()).add_modifier(Modifier::BOLD);
            }
            let mark = if progress.complete { " \u{2713}" } else { "" };
            buttons.push(Span::styled(
                format!(" [{}] {}{} ", i + 1, progress.subject, mark),
                style,
            ));
            buttons.push(Span::raw(" "));
        }
        Paragraph::new(Line::from(buttons)).render(rows[0], buf);

        let elapsed = Line::from(vec![
            Span::styled("  Elapsed  ", Style::default().fg(colors.muted())),
            Span::styled(
                format_hms(sw.elapsed()),
                Style::default()
                    .fg(if sw.is_running() { colors.running() } else { colors.fg() })
                    .add_modifier(Modifier::BOLD),
            ),
        ]);
        Paragraph::new(elapsed).render(rows[1], buf);

        match sw.progress() {
            Some(line) => {
                let label = format!("  {} \u{00b7} {}% ", line.title, line.percent);
                let label_w = (label.chars().count() as u16).min(rows[2].width);
                Paragraph::new(Span::styled(label, Style::default().fg(colors.fg())))
                    .render(Rect::new(rows[2].x, rows[2].y, label_w, 1), buf);
                let bar_w = rows[2].width.saturating_sub(label_w + 2).min(40);
                ProgressBar::new(line.percent, self.theme)
                    .render(Rect::new(rows[2].x + label_w, rows[2].y, bar_w, 1), buf);
            }
            None => {
                Paragraph::new(Span::styled(
                    "  No quest in progress",
                    Style::default().fg(colors.muted()),
                ))
                .render(rows[2], buf);
            }
        }
    }
}
