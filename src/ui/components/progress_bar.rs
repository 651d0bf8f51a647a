use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::Widget;

use crate::ui::theme::Theme;

/// One-row bar with a centred percentage. Draws no border so it can sit
/// inside list rows and panels.
pub struct ProgressBar<'a> {
    pub percent: u8,
    pub complete: bool,
    pub theme: &'a Theme,
}

impl<'a> ProgressBar<'a> {
    pub fn new(percent: u8, theme: &'a Theme) -> Self {
        Self {
            percent: percent.min(100),
            complete: percent >= 100,
            theme,
        }
    }
}

impl Widget for ProgressBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        if area.width == 0 || area.height == 0 {
            return;
        }

        let filled_width = (u32::from(self.percent) * u32::from(area.width) / 100) as u16;
        let fill = if self.complete {
            colors.success()
        } else {
            colors.bar_filled()
        };
        for x in area.x..area.x + area.width {
            let style = if x < area.x + filled_width {
                Style::default().fg(colors.bg()).bg(fill)
            } else {
                Style::default().fg(colors.fg()).bg(colors.bar_empty())
            };
            buf[(x, area.y)].set_style(style);
        }

        let label = format!("{}%", self.percent);
        let label_x = area.x + (area.width.saturating_sub(label.len() as u16)) / 2;
        for (i, ch) in label.chars().enumerate() {
            let x = label_x + i as u16;
            if x >= area.x + area.width {
                break;
            }
            buf[(x, area.y)].set_char(ch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(buf: &Buffer, width: u16) -> String {
        (0..width).map(|x| buf[(x, 0)].symbol().to_string()).collect()
    }

    #[test]
    fn test_label_and_fill() {
        let theme = Theme::default();
        let area = Rect::new(0, 0, 10, 1);
        let mut buf = Buffer::empty(area);
        ProgressBar::new(50, &theme).render(area, &mut buf);
        assert!(row(&buf, 10).contains("50%"));
        assert_eq!(buf[(0, 0)].bg, theme.colors.bar_filled());
        assert_eq!(buf[(9, 0)].bg, theme.colors.bar_empty());
    }

    #[test]
    fn test_clamps_over_100() {
        let theme = Theme::default();
        let bar = ProgressBar::new(250, &theme);
        assert_eq!(bar.percent, 100);
        assert!(bar.complete);
    }
}
