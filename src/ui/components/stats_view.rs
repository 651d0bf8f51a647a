use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};

use crate::api::model::StatsSummary;
use crate::ui::theme::Theme;

const BAR_WIDTH: usize = 24;

/// Width of a day's bar relative to the busiest day in range.
pub fn bar_len(minutes: u64, max_minutes: u64, width: usize) -> usize {
    if max_minutes == 0 {
        return 0;
    }
    ((minutes as f64 / max_minutes as f64) * width as f64).round() as usize
}

pub struct StatsView<'a> {
    pub summary: Option<&'a StatsSummary>,
    pub theme: &'a Theme,
}

impl Widget for StatsView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let block = Block::bordered()
            .title(" Study stats ")
            .title_bottom(Line::from(" [Esc] Close ").right_aligned())
            .border_style(Style::default().fg(colors.accent()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let Some(summary) = self.summary else {
            Paragraph::new(Span::styled("  Loading...", Style::default().fg(colors.muted())))
                .render(inner, buf);
            return;
        };

        let heading = Style::default()
            .fg(colors.accent())
            .add_modifier(Modifier::BOLD);
        let mut lines = vec![
            Line::from(vec![
                Span::styled(format!("  Last {} days  ", summary.range_days), heading),
                Span::styled(
                    format!("total {} min", summary.total_minutes),
                    Style::default().fg(colors.fg()),
                ),
                Span::styled(
                    format!("  streak {} days", summary.streak_days),
                    Style::default().fg(colors.success()),
                ),
            ]),
            Line::from(""),
            Line::from(Span::styled("  By subject", heading)),
        ];
        for (subject, minutes) in &summary.totals_by_subject {
            lines.push(Line::from(vec![
                Span::styled(format!("    {subject}"), Style::default().fg(colors.fg())),
                Span::styled(format!("  {minutes} min"), Style::default().fg(colors.muted())),
            ]));
        }

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("  Daily", heading)));
        let max = summary
            .daily
            .iter()
            .map(|d| d.total_minutes)
            .max()
            .unwrap_or(0);
        for day in &summary.daily {
            let len = bar_len(day.total_minutes, max, BAR_WIDTH);
            lines.push(Line::from(vec![
                Span::styled(format!("    {} ", day.date), Style::default().fg(colors.muted())),
                Span::styled(
                    "\u{2588}".repeat(len),
                    Style::default().fg(colors.bar_filled()),
                ),
                Span::styled(
                    format!(" {} min", day.total_minutes),
                    Style::default().fg(colors.fg()),
                ),
            ]));
        }

        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .render(inner, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_len_scales_to_busiest_day() {
        assert_eq!(bar_len(60, 60, 24), 24);
        assert_eq!(bar_len(30, 60, 24), 12);
        assert_eq!(bar_len(0, 60, 24), 0);
        assert_eq!(bar_len(10, 0, 24), 0);
    }
}
