use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Widget, Wrap};

use studyquest::api::client::HttpClient;
use studyquest::app::{AnswerFeedback, App, Modal, StatusKind};
use studyquest::bus::DevAction;
use studyquest::clock::DayClock;
use studyquest::config::Config;
use studyquest::event::{AppEvent, EventHandler};
use studyquest::logging;
use studyquest::store::json_store::JsonStore;
use studyquest::ui::components::quest_list::QuestList;
use studyquest::ui::components::stats_view::StatsView;
use studyquest::ui::components::stopwatch_panel::StopwatchPanel;
use studyquest::ui::components::subject_sidebar::SubjectSidebar;
use studyquest::ui::layout::{AppLayout, centered_rect, pack_hint_lines};
use studyquest::ui::line_input::{InputResult, LineInput};
use studyquest::ui::theme::Theme;
use studyquest::worker::ThreadDispatcher;

#[derive(Parser)]
#[command(name = "studyquest", version, about = "Terminal client for daily study quests")]
struct Cli {
    #[arg(long, help = "Quest backend base URL")]
    api_base: Option<String>,

    #[arg(short, long, help = "User id to track quests for")]
    user: Option<String>,

    #[arg(short, long, help = "Theme name")]
    theme: Option<String>,

    #[arg(long, help = "Write the effective config file and exit")]
    init_config: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, load_err) = match Config::load() {
        Ok(config) => (config, None),
        Err(err) => (Config::default(), Some(err)),
    };
    if let Some(api_base) = cli.api_base {
        config.api_base = api_base;
    }
    if let Some(user) = cli.user {
        config.user_id = user;
    }
    if let Some(theme) = cli.theme {
        config.theme = theme;
    }
    config.normalize();

    if cli.init_config {
        config.save()?;
        println!("wrote {}", Config::config_path().display());
        return Ok(());
    }

    let _log_guard = logging::init(&Config::data_dir().join("logs"), &config.log_filter)?;
    if let Some(err) = load_err {
        tracing::warn!(%err, "config unreadable, using defaults");
    }
    tracing::info!(api_base = %config.api_base, user = %config.user_id, "starting");

    let backend = HttpClient::new(&config.api_base).context("building HTTP client")?;
    let events = EventHandler::new(Duration::from_millis(250));
    let dispatcher = ThreadDispatcher::new(Arc::new(backend), events.sender());
    let store = match JsonStore::new() {
        Ok(store) => Some(store),
        Err(err) => {
            tracing::warn!(%err, "completion cache disabled");
            None
        }
    };
    let day_clock = DayClock::system(config.utc_offset_minutes);
    let mut app = App::new(config, Box::new(dispatcher), day_clock, store);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    app.start();
    let result = run_app(&mut terminal, &mut app, &events);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        tracing::error!(?err, "event loop failed");
        eprintln!("Error: {err:?}");
    }
    tracing::info!("bye");

    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|frame| render(frame, app))?;

        match events.next()? {
            AppEvent::Key(key) => handle_key(app, key, Instant::now()),
            AppEvent::Tick => app.on_tick(Instant::now()),
            AppEvent::Resize(_, _) => {}
            AppEvent::Api(event) => app.on_api_event(event, Instant::now()),
        }
        // Ticks only arrive on idle polls; a burst of keys must not stall timers.
        app.on_tick(Instant::now());

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent, now: Instant) {
    if key.kind != KeyEventKind::Press {
        return;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }

    if app.modal.is_some() {
        handle_modal_key(app, key, now);
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char(ch @ '1'..='9') => {
            let index = ch as usize - '1' as usize;
            app.select_subject_index(index, now);
        }
        KeyCode::Char('p') => app.pause(now),
        KeyCode::Char('s') => app.stop(now),
        KeyCode::Up | KeyCode::Char('k') => app.move_selection(-1),
        KeyCode::Down | KeyCode::Char('j') => app.move_selection(1),
        KeyCode::Enter | KeyCode::Char(' ') => app.activate_selected(now),
        KeyCode::Char('a') => app.open_ask_ai(),
        KeyCode::Char('g') => app.generate_problem(),
        KeyCode::Char('t') => app.open_stats(),
        KeyCode::Char('r') => app.trigger_dev_action(DevAction::RefreshQuests, now),
        KeyCode::Char('R') => app.request_full_reset(),
        KeyCode::Char('d') | KeyCode::F(12) => app.toggle_debug(),
        _ => {}
    }
}

fn handle_modal_key(app: &mut App, key: KeyEvent, now: Instant) {
    match app.modal.as_mut() {
        Some(Modal::ConfirmReset) => match key.code {
            KeyCode::Char('y') => app.confirm_full_reset(now),
            KeyCode::Char('n') | KeyCode::Esc => app.dismiss_modal(),
            _ => {}
        },
        Some(Modal::Message { .. }) | Some(Modal::Stats(_)) => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
                app.dismiss_modal();
            }
        }
        Some(Modal::Answer(prompt)) => match prompt.input.handle(key) {
            InputResult::Submit => app.submit_answer(),
            InputResult::Cancel => app.dismiss_modal(),
            InputResult::Continue => {}
        },
        Some(Modal::AskAi(prompt)) => {
            if key.code == KeyCode::Tab {
                app.cycle_ai_subject();
                return;
            }
            match prompt.input.handle(key) {
                InputResult::Submit => app.submit_ai(),
                InputResult::Cancel => app.dismiss_modal(),
                InputResult::Continue => {}
            }
        }
        Some(Modal::Debug { selected }) => match key.code {
            KeyCode::Esc | KeyCode::Char('d') | KeyCode::F(12) => app.dismiss_modal(),
            KeyCode::Up | KeyCode::Char('k') => app.move_debug_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => app.move_debug_selection(1),
            KeyCode::Enter => {
                let action = DevAction::ALL[(*selected).min(DevAction::ALL.len() - 1)];
                app.trigger_dev_action(action, now);
            }
            _ => {}
        },
        None => {}
    }
}

fn render(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let colors = &app.theme.colors;

    let bg = Block::default().style(Style::default().bg(colors.bg()));
    frame.render_widget(bg, area);

    let layout = AppLayout::new(area);
    render_header(frame, app, layout.header);

    frame.render_widget(
        StopwatchPanel::new(&app.stopwatch, &app.subject_progress, app.theme),
        layout.stopwatch,
    );

    let running = app.quest_timer.active().map(|a| a.quest_id.as_str());
    frame.render_widget(
        QuestList::new(&app.board, app.selected, app.theme)
            .running(running)
            .loading(app.loading),
        layout.main,
    );

    if let Some(sidebar) = layout.sidebar {
        frame.render_widget(
            SubjectSidebar {
                rows: &app.subject_progress,
                day: &app.active_day,
                theme: app.theme,
            },
            sidebar,
        );
    }

    let hints = [
        "[1-3] Subject",
        "[p] Pause",
        "[s] Stop",
        "[j/k] Move",
        "[Enter] Start/Answer",
        "[g] New problem",
        "[a] Ask AI",
        "[t] Stats",
        "[r] Refresh",
        "[R] Reset all",
        "[d] Debug",
        "[q] Quit",
    ];
    let lines: Vec<Line> = pack_hint_lines(&hints, layout.footer.width as usize)
        .into_iter()
        .map(|l| Line::from(Span::styled(l, Style::default().fg(colors.muted()))))
        .collect();
    frame.render_widget(Paragraph::new(lines), layout.footer);

    if let Some(modal) = &app.modal {
        render_modal(frame, app, modal);
    }
}

fn render_header(frame: &mut ratatui::Frame, app: &App, area: Rect) {
    let colors = &app.theme.colors;
    let mut spans = vec![
        Span::styled(
            " studyquest ",
            Style::default()
                .fg(colors.header_fg())
                .bg(colors.header_bg())
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(
                " {} | {} {} ",
                app.identity.get(),
                app.active_day,
                app.day_clock.local_time()
            ),
            Style::default().fg(colors.muted()).bg(colors.header_bg()),
        ),
    ];
    if let Some(status) = &app.status {
        let color = match status.kind {
            StatusKind::Info => colors.fg(),
            StatusKind::Success => colors.success(),
            StatusKind::Error => colors.error(),
        };
        spans.push(Span::styled(
            format!(" {} ", status.text),
            Style::default().fg(color).bg(colors.header_bg()),
        ));
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(colors.header_bg())),
        area,
    );
}

fn input_line<'a>(input: &'a LineInput, app: &App) -> Line<'a> {
    let colors = &app.theme.colors;
    let (before, cursor, after) = input.render_parts();
    let text_style = if input.is_selected() {
        Style::default().fg(colors.bg()).bg(colors.accent())
    } else {
        Style::default().fg(colors.fg())
    };
    let cursor_style = Style::default().fg(colors.bg()).bg(colors.fg());
    let cursor_text = cursor.map_or_else(|| " ".to_string(), |c| c.to_string());
    Line::from(vec![
        Span::raw("  > "),
        Span::styled(before, text_style),
        Span::styled(cursor_text, cursor_style),
        Span::styled(after, text_style),
    ])
}

fn modal_block<'a>(title: &'a str, app: &App, is_error: bool) -> Block<'a> {
    let colors = &app.theme.colors;
    Block::bordered()
        .title(format!(" {title} "))
        .border_style(Style::default().fg(if is_error {
            colors.error()
        } else {
            colors.accent()
        }))
        .style(Style::default().bg(colors.bg()))
}

fn render_modal(frame: &mut ratatui::Frame, app: &App, modal: &Modal) {
    let colors = &app.theme.colors;
    let (percent_x, percent_y) = match modal {
        Modal::Stats(_) => (70, 80),
        _ => (60, 50),
    };
    let area = centered_rect(percent_x, percent_y, frame.area());
    frame.render_widget(Clear, area);
    let muted = Style::default().fg(colors.muted());

    match modal {
        Modal::ConfirmReset => {
            let lines = vec![
                Line::from(""),
                Line::from("  Reset everything? All quest data will be deleted."),
                Line::from(""),
                Line::from(Span::styled("  [y] Reset   [n] Cancel", muted)),
            ];
            frame.render_widget(
                Paragraph::new(lines).block(modal_block("Full reset", app, true)),
                area,
            );
        }
        Modal::Message {
            title,
            body,
            is_error,
        } => {
            let lines = vec![
                Line::from(""),
                Line::from(format!("  {body}")),
                Line::from(""),
                Line::from(Span::styled("  [Enter] OK", muted)),
            ];
            frame.render_widget(
                Paragraph::new(lines)
                    .wrap(Wrap { trim: false })
                    .block(modal_block(title, app, *is_error)),
                area,
            );
        }
        Modal::Answer(prompt) => {
            let mut lines = vec![
                Line::from(""),
                Line::from(Span::styled(
                    format!("  {}", prompt.prompt.as_deref().unwrap_or("(no problem text)")),
                    Style::default().fg(colors.fg()).add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                input_line(&prompt.input, app),
                Line::from(""),
            ];
            let feedback_style = Style::default().fg(colors.error());
            match &prompt.feedback {
                _ if prompt.waiting => lines.push(Line::from(Span::styled("  Checking...", muted))),
                Some(AnswerFeedback::Empty) => lines.push(Line::from(Span::styled(
                    "  Type an answer first",
                    Style::default().fg(colors.warning()),
                ))),
                Some(AnswerFeedback::Wrong {
                    expected,
                    explanation,
                }) => {
                    let expected = expected.as_deref().unwrap_or("?");
                    lines.push(Line::from(Span::styled(
                        format!("  Not quite. Answer: {expected}"),
                        feedback_style,
                    )));
                    if let Some(explanation) = explanation {
                        lines.push(Line::from(Span::styled(format!("  {explanation}"), muted)));
                    }
                }
                Some(AnswerFeedback::Failed(err)) => lines.push(Line::from(Span::styled(
                    format!("  Could not submit: {err}"),
                    feedback_style,
                ))),
                None => {}
            }
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled("  [Enter] Submit   [Esc] Close", muted)));
            frame.render_widget(
                Paragraph::new(lines)
                    .wrap(Wrap { trim: false })
                    .block(modal_block(&prompt.title, app, false)),
                area,
            );
        }
        Modal::AskAi(prompt) => {
            let subject = prompt
                .subject
                .and_then(|i| app.config.subjects.get(i))
                .map_or("any", String::as_str);
            let mut lines = vec![
                Line::from(""),
                Line::from(vec![
                    Span::styled("  Subject: ", muted),
                    Span::styled(subject, Style::default().fg(colors.accent())),
                    Span::styled("  [Tab] change", muted),
                ]),
                Line::from(""),
                input_line(&prompt.input, app),
                Line::from(""),
            ];
            match &prompt.answer {
                _ if prompt.waiting => lines.push(Line::from(Span::styled("  Thinking...", muted))),
                Some(Ok(answer)) => {
                    for line in answer.lines() {
                        lines.push(Line::from(format!("  {line}")));
                    }
                }
                Some(Err(err)) => lines.push(Line::from(Span::styled(
                    format!("  {err}"),
                    Style::default().fg(colors.error()),
                ))),
                None => {}
            }
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled("  [Enter] Ask   [Esc] Close", muted)));
            frame.render_widget(
                Paragraph::new(lines)
                    .wrap(Wrap { trim: false })
                    .block(modal_block("Ask AI", app, false)),
                area,
            );
        }
        Modal::Stats(summary) => {
            StatsView {
                summary: summary.as_ref(),
                theme: app.theme,
            }
            .render(area, frame.buffer_mut());
        }
        Modal::Debug { selected } => {
            let mut lines = vec![Line::from("")];
            for (i, action) in DevAction::ALL.iter().enumerate() {
                let style = if i == *selected {
                    Style::default().fg(colors.accent()).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(colors.fg())
                };
                let indicator = if i == *selected { ">" } else { " " };
                lines.push(Line::from(Span::styled(
                    format!("  {indicator} {}", action.label()),
                    style,
                )));
            }
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!(
                    "  pending: stopwatch {}s, quest {}s",
                    app.stopwatch.pending(),
                    app.quest_timer.pending()
                ),
                muted,
            )));
            lines.push(Line::from(Span::styled(
                format!("  theme: {} ({})", app.theme.name, Theme::available_themes().join(", ")),
                muted,
            )));
            lines.push(Line::from(Span::styled("  [Enter] Run   [Esc] Close", muted)));
            frame.render_widget(
                Paragraph::new(lines).block(modal_block("Debug", app, false)),
                area,
            );
        }
    }
}
