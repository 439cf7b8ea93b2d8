use crate::app::{App, AppMode, MessageLevel, SettingsField, Tab};
use crate::config::Theme;
use chrono::{DateTime, Local};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Block, BorderType, Borders, Clear, Gauge, Paragraph, Tabs, Wrap},
    Frame,
};
use tomato_ipc::{format_clock, TimerState};

pub fn draw(f: &mut Frame, app: &App, now: DateTime<Local>) {
    let theme = app.config.theme();
    f.render_widget(
        Block::default().style(Style::default().bg(theme.background).fg(theme.foreground)),
        f.area(),
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_header(f, chunks[0], app);
    match app.tab {
        Tab::Timer => draw_timer(f, chunks[1], app),
        Tab::Stats => draw_stats(f, chunks[1], app, now),
        Tab::Settings => draw_settings(f, chunks[1], app),
    }
    draw_status_bar(f, chunks[2], app);

    match app.mode {
        AppMode::Help => draw_help_overlay(f, app),
        AppMode::ConfirmClearStats => draw_clear_stats_overlay(f, app, now),
        AppMode::ConfirmRestoreDefaults => draw_confirm_overlay(
            f,
            app,
            " Restore defaults ",
            vec![Line::raw(
                "Reset all settings to their default values?",
            )],
            "restore",
        ),
        _ => {}
    }
}

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
    let theme = app.config.theme();
    let icons = &app.config.icons;
    let title = Line::from(vec![
        Span::raw(icons.header_left.clone()),
        Span::styled(
            "TOMATO",
            Style::default()
                .fg(theme.session_color(app.clock.session()))
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(icons.header_right.clone()),
    ]);
    let titles: Vec<Line> = Tab::ALL
        .iter()
        .enumerate()
        .map(|(i, tab)| Line::from(format!("{} {}", i + 1, tab.title())))
        .collect();
    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .title(title)
                .title_alignment(Alignment::Center)
                .borders(Borders::BOTTOM)
                .border_style(Style::default().fg(theme.surface)),
        )
        .select(app.tab.index())
        .style(Style::default().fg(theme.muted))
        .highlight_style(
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        )
        .divider(Span::raw(icons.separator.clone()));
    f.render_widget(tabs, area);
}

fn panel<'a>(title: String, theme: &Theme, border: Color) -> Block<'a> {
    Block::default()
        .title(Span::styled(title, Style::default().fg(theme.muted)))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border))
}

fn draw_timer(f: &mut Frame, area: Rect, app: &App) {
    let theme = app.config.theme();
    let icons = &app.config.icons;
    let status = app.status();
    let color = theme.session_color(status.session);

    let block = panel(
        format!(" {} {} ", icons.session(status.session), status.session),
        theme,
        color,
    );
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(inner);

    let state_icon = match status.state {
        TimerState::Running => &icons.play,
        TimerState::Paused => &icons.pause,
    };
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(format!("{} ", state_icon), Style::default().fg(color)),
            Span::styled(
                format_clock(status.remaining),
                Style::default()
                    .fg(theme.foreground)
                    .add_modifier(Modifier::BOLD),
            ),
        ]))
        .alignment(Alignment::Center),
        rows[1],
    );

    f.render_widget(
        Gauge::default()
            .gauge_style(Style::default().fg(color).bg(theme.surface))
            .ratio(status.progress.clamp(0.0, 1.0))
            .label(format!("{:.0}%", status.progress * 100.0)),
        rows[3],
    );

    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("Completed ", Style::default().fg(theme.muted)),
            Span::styled(
                status.completed_focus.to_string(),
                Style::default().fg(theme.foreground),
            ),
            Span::styled(
                format!(" {} ", icons.separator),
                Style::default().fg(theme.surface),
            ),
            Span::styled("Up next ", Style::default().fg(theme.muted)),
            Span::styled(
                format!("{} {}", icons.session(status.next_session), status.next_session),
                Style::default().fg(theme.session_color(status.next_session)),
            ),
        ]))
        .alignment(Alignment::Center),
        rows[5],
    );

    let hint = if app.clock.pending_auto_start().is_some() {
        format!("{} starting shortly...", status.session)
    } else if status.state == TimerState::Running {
        "space pause".to_string()
    } else {
        "space start".to_string()
    };
    f.render_widget(
        Paragraph::new(hint)
            .style(Style::default().fg(theme.muted))
            .alignment(Alignment::Center),
        rows[6],
    );
}

fn draw_stats(f: &mut Frame, area: Rect, app: &App, now: DateTime<Local>) {
    let theme = app.config.theme();
    let icons = &app.config.icons;
    let summary = app.stats_summary(now);
    let totals = app.ledger.totals();

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(36), Constraint::Min(20)])
        .split(area);

    let label = Style::default().fg(theme.muted);
    let value = Style::default()
        .fg(theme.foreground)
        .add_modifier(Modifier::BOLD);
    let row = |name: &'static str, v: String| {
        Line::from(vec![Span::styled(format!("{:<22}", name), label), Span::styled(v, value)])
    };
    let lines = vec![
        Line::from(Span::styled("Today", Style::default().fg(theme.accent))),
        row("Sessions", summary.today_sessions.to_string()),
        row("Focus minutes", summary.today_minutes.to_string()),
        row("Streak", format!("{} {}", summary.streak, icons.streak)),
        Line::raw(""),
        Line::from(Span::styled("All time", Style::default().fg(theme.accent))),
        row("Sessions", totals.total_sessions.to_string()),
        row("Focus hours", totals.total_hours().to_string()),
        row("Days active", totals.days_active.to_string()),
        row(
            "Avg sessions / day",
            format!("{:.1}", totals.average_sessions_per_day()),
        ),
        row(
            "Avg minutes / day",
            totals.average_minutes_per_day().to_string(),
        ),
    ];
    f.render_widget(
        Paragraph::new(lines).block(panel(" Summary ".to_string(), theme, theme.accent)),
        cols[0],
    );

    let charts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(cols[1]);
    let day_label = |label: &str| label.split_whitespace().next().unwrap_or(label).to_string();
    let labels: Vec<String> = summary.week.iter().map(|d| day_label(&d.label)).collect();

    let sessions: Vec<(&str, u64)> = labels
        .iter()
        .zip(&summary.week)
        .map(|(l, d)| (l.as_str(), u64::from(d.sessions)))
        .collect();
    f.render_widget(
        week_chart(" Sessions, last 7 days ", &sessions, theme, theme.focus),
        charts[0],
    );

    let minutes: Vec<(&str, u64)> = labels
        .iter()
        .zip(&summary.week)
        .map(|(l, d)| (l.as_str(), u64::from(d.minutes)))
        .collect();
    f.render_widget(
        week_chart(" Focus minutes, last 7 days ", &minutes, theme, theme.short_break),
        charts[1],
    );
}

fn week_chart<'a>(title: &'a str, data: &'a [(&'a str, u64)], theme: &Theme, color: Color) -> BarChart<'a> {
    BarChart::default()
        .block(panel(title.to_string(), theme, theme.accent))
        .data(data)
        .bar_width(5)
        .bar_gap(2)
        .bar_style(Style::default().fg(color))
        .value_style(Style::default().fg(theme.background).bg(color))
        .label_style(Style::default().fg(theme.muted))
}

fn draw_settings(f: &mut Frame, area: Rect, app: &App) {
    let theme = app.config.theme();
    let icons = &app.config.icons;
    let draft = &app.settings_draft;
    let dirty = draft != app.clock.settings();

    let title = if dirty {
        " Settings (unsaved) ".to_string()
    } else {
        " Settings ".to_string()
    };
    let block = panel(title, theme, theme.accent);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(SettingsField::ALL.len() as u16),
            Constraint::Length(1),
            Constraint::Min(1),
        ])
        .split(inner);

    let lines: Vec<Line> = SettingsField::ALL
        .iter()
        .map(|field| {
            let selected = *field == app.selected_field;
            let marker = if selected {
                Span::styled(format!("{} ", icons.select), Style::default().fg(theme.accent))
            } else {
                Span::raw("  ")
            };
            let value = match app.mode {
                AppMode::EditingField(editing) if editing == *field => Span::styled(
                    format!("{}{}", app.input_buffer, icons.input_cursor),
                    Style::default()
                        .fg(theme.warning)
                        .add_modifier(Modifier::SLOW_BLINK),
                ),
                _ => Span::styled(field.value(draft), Style::default().fg(theme.foreground)),
            };
            let label_style = if selected {
                Style::default()
                    .fg(theme.foreground)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.muted)
            };
            Line::from(vec![
                marker,
                Span::styled(format!("{:<26}", field.label()), label_style),
                value,
            ])
        })
        .collect();
    f.render_widget(Paragraph::new(lines), rows[0]);

    let feedback = match app.draft_error() {
        Some(e) => Span::styled(e.to_string(), Style::default().fg(theme.error)),
        None => Span::styled(draft.cycle_preview(), Style::default().fg(theme.muted)),
    };
    f.render_widget(
        Paragraph::new(Line::from(feedback)).wrap(Wrap { trim: true }),
        rows[2],
    );
}

fn draw_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let theme = app.config.theme();
    let (mode_text, mode_color) = match app.mode {
        AppMode::Normal => ("NORMAL", theme.short_break),
        AppMode::Help => ("HELP", theme.accent),
        AppMode::EditingField(_) => ("EDIT", theme.warning),
        AppMode::ConfirmClearStats | AppMode::ConfirmRestoreDefaults => {
            ("CONFIRM", theme.error)
        }
    };

    let body = match &app.message {
        Some(msg) => {
            let color = match msg.level {
                MessageLevel::Info => theme.foreground,
                MessageLevel::Success => theme.short_break,
                MessageLevel::Warning => theme.warning,
                MessageLevel::Error => theme.error,
            };
            Span::styled(msg.text.clone(), Style::default().fg(color))
        }
        None => Span::styled(key_hints(app), Style::default().fg(theme.muted)),
    };

    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(
                format!(" {} ", mode_text),
                Style::default()
                    .bg(mode_color)
                    .fg(theme.background)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
            body,
        ]))
        .style(Style::default().bg(theme.surface)),
        area,
    );
}

fn key_hints(app: &App) -> &'static str {
    match (app.mode, app.tab) {
        (AppMode::EditingField(_), _) => "0-9:value │ enter:confirm │ esc:cancel",
        (AppMode::ConfirmClearStats, _) => "y:clear │ n:keep",
        (AppMode::ConfirmRestoreDefaults, _) => "y:restore │ n:keep",
        (AppMode::Help, _) => "esc:close",
        (AppMode::Normal, Tab::Timer) => {
            "space:start/pause │ r:reset │ s:skip │ 1-3:tabs │ t:theme │ ?:help │ q:quit"
        }
        (AppMode::Normal, Tab::Stats) => "e:export │ c:clear │ 1-3:tabs │ ?:help │ q:quit",
        (AppMode::Normal, Tab::Settings) => {
            "j/k:select │ enter:edit │ w:save │ d:defaults │ x:export │ esc:discard │ q:quit"
        }
    }
}

fn draw_help_overlay(f: &mut Frame, app: &App) {
    let theme = app.config.theme();
    let area = centered_rect(60, 80, f.area());
    f.render_widget(Clear, area);

    let sections = [
        (
            "General",
            vec![
                ("1 / 2 / 3", "Timer, stats, settings"),
                ("Tab", "Next tab"),
                ("t", "Toggle light/dark theme"),
                ("h / ?", "Toggle help"),
                ("q", "Quit"),
            ],
        ),
        (
            "Timer",
            vec![
                ("Space / Enter", "Start or pause"),
                ("r", "Reset current session"),
                ("s", "Skip to next session"),
            ],
        ),
        (
            "Stats",
            vec![("e", "Export to JSON"), ("c", "Clear history")],
        ),
        (
            "Settings",
            vec![
                ("j / k", "Select field"),
                ("Enter", "Edit value or flip switch"),
                ("w", "Save"),
                ("d", "Restore defaults"),
                ("x", "Export settings"),
                ("Esc", "Discard changes"),
            ],
        ),
    ];

    let mut lines = Vec::new();
    for (section, keys) in sections {
        lines.push(Line::from(Span::styled(
            section,
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        )));
        for (key, desc) in keys {
            lines.push(Line::from(vec![
                Span::styled(format!("  {:<16}", key), Style::default().fg(theme.warning)),
                Span::styled(desc, Style::default().fg(theme.foreground)),
            ]));
        }
        lines.push(Line::raw(""));
    }

    f.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .title(" Help ")
                .borders(Borders::ALL)
                .border_type(BorderType::Double)
                .border_style(Style::default().fg(theme.accent))
                .style(Style::default().bg(theme.background)),
        ),
        area,
    );
}

fn draw_clear_stats_overlay(f: &mut Frame, app: &App, now: DateTime<Local>) {
    let totals = app.ledger.totals();
    let streak = app.ledger.streak_length(now.date_naive());
    let lines = vec![
        Line::raw("This will permanently delete:"),
        Line::raw(format!("{} completed sessions", totals.total_sessions)),
        Line::raw(format!(
            "{}h {}m of focused work",
            totals.total_hours(),
            totals.total_minutes % 60
        )),
        Line::raw(format!("{} days of activity data", totals.days_active)),
        Line::raw(format!("your current {}-day streak", streak)),
        Line::raw(""),
        Line::raw("This cannot be undone."),
    ];
    draw_confirm_overlay(f, app, " Reset all history ", lines, "clear");
}

fn draw_confirm_overlay(f: &mut Frame, app: &App, title: &str, mut lines: Vec<Line>, action: &str) {
    let theme = app.config.theme();
    let area = centered_rect(50, 50, f.area());
    f.render_widget(Clear, area);
    lines.push(Line::raw(""));
    lines.push(Line::from(vec![
        Span::styled("y", Style::default().fg(theme.error).add_modifier(Modifier::BOLD)),
        Span::raw(format!(" {}   ", action)),
        Span::styled("n", Style::default().fg(theme.short_break).add_modifier(Modifier::BOLD)),
        Span::raw(" keep"),
    ]));
    f.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title(title.to_string())
                    .borders(Borders::ALL)
                    .border_type(BorderType::Double)
                    .border_style(Style::default().fg(theme.error))
                    .style(Style::default().bg(theme.background)),
            ),
        area,
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ledger::FocusRecorder;
    use crate::notify::SilentNotifier;
    use crate::persistence::Persistence;
    use chrono::TimeZone;
    use ratatui::{backend::TestBackend, Terminal};
    use tempfile::tempdir;

    fn render(app: &App) -> String {
        let now = Local.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap();
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| draw(f, app, now)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn every_tab_renders() {
        let dir = tempdir().unwrap();
        let mut app = App::new(
            Config::default(),
            Persistence::with_dir(dir.path()),
            Box::new(SilentNotifier),
        );

        assert!(render(&app).contains("25:00"));

        app.tab = Tab::Stats;
        let stats = render(&app);
        assert!(stats.contains("Sessions, last 7 days"));
        assert!(stats.contains("Focus minutes, last 7 days"));

        app.ledger
            .record_focus_session(Local.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap().date_naive(), 25);
        app.mode = AppMode::ConfirmClearStats;
        let overlay = render(&app);
        assert!(overlay.contains("1 completed sessions"));
        assert!(overlay.contains("your current 1-day streak"));
        app.mode = AppMode::Normal;

        app.tab = Tab::Settings;
        assert!(render(&app).contains("Cycle preview"));

        app.settings_draft.long_break_minutes = 2;
        assert!(render(&app).contains("Long break should be longer"));

        app.mode = AppMode::Help;
        assert!(render(&app).contains("Help"));
    }
}
