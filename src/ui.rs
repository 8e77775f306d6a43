use crate::app::{App, AuthState, Overlay, ProbeStatus, Tab};
use crate::form::{FormField, TestForm};
use crate::highlight::highlight_value;
use crate::models::{AbTest, StatusKind, VariantMetrics};
use crate::session::AuthStatus;
use chrono::{DateTime, NaiveDateTime};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Tabs, Wrap},
};

mod colors {
    use ratatui::style::Color;

    pub const PRIMARY: Color = Color::Rgb(137, 180, 250);
    pub const SECONDARY: Color = Color::Rgb(250, 179, 135); // selection, focused field
    pub const SUCCESS: Color = Color::Rgb(166, 227, 161);
    pub const ERROR: Color = Color::Rgb(243, 139, 168);
    pub const WARNING: Color = Color::Rgb(249, 226, 175); // pending tests, hints
    pub const INFO: Color = Color::Rgb(116, 199, 236);
    pub const MUTED: Color = Color::Rgb(127, 132, 156);
    pub const TEXT: Color = Color::Rgb(205, 214, 244);
    pub const BACKGROUND: Color = Color::Rgb(49, 50, 68);
    pub const SURFACE: Color = Color::Rgb(69, 71, 90);
}

const SPINNER: [&str; 8] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧"];

pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(4), // API + auth status
            Constraint::Min(0),    // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    draw_header(frame, app, chunks[0]);

    if app.auth == AuthState::Authenticated {
        draw_dashboard(frame, app, chunks[1]);
    } else {
        draw_login(frame, app, chunks[1]);
    }

    match &app.overlay {
        Overlay::None => {}
        Overlay::RedirectPrompt { input, error } => {
            draw_redirect_prompt(frame, input, error.as_deref(), chunks[1])
        }
        Overlay::CreateTest(form) => draw_create_form(frame, form, chunks[1]),
    }

    draw_status_bar(frame, app, chunks[2]);
}

fn label(text: &'static str) -> Span<'static> {
    Span::styled(
        text,
        Style::default()
            .fg(colors::PRIMARY)
            .add_modifier(Modifier::BOLD),
    )
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let probe_color = match app.probe {
        ProbeStatus::Connecting => colors::WARNING,
        ProbeStatus::Connected(_) => colors::SUCCESS,
        ProbeStatus::Failed => colors::ERROR,
    };
    let auth_color = match app.session.status() {
        AuthStatus::Authenticated => colors::SUCCESS,
        AuthStatus::NotAuthenticated => colors::MUTED,
        AuthStatus::DecodeFailed | AuthStatus::Failed(_) => colors::ERROR,
    };

    let mut auth_line = vec![
        label("Auth Status: "),
        Span::styled(
            app.session.status().message(),
            Style::default().fg(auth_color).add_modifier(Modifier::BOLD),
        ),
    ];
    if let Some(credential) = app.session.credential() {
        auth_line.push(Span::styled(
            format!("  (token {})", credential.preview()),
            Style::default().fg(colors::MUTED),
        ));
    }

    let lines = vec![
        Line::from(vec![
            label("API Status:  "),
            Span::styled(
                app.probe.message(),
                Style::default()
                    .fg(probe_color)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(auth_line),
    ];

    let header = Paragraph::new(lines).block(
        Block::default()
            .title(" YouTube A/B Testing ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(colors::PRIMARY)),
    );
    frame.render_widget(header, area);
}

fn draw_login(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(9), Constraint::Min(0)])
        .split(area);

    let login_enabled = app.probe.is_connected();
    let button_style = if login_enabled {
        Style::default()
            .fg(colors::SECONDARY)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
            .fg(colors::MUTED)
            .add_modifier(Modifier::CROSSED_OUT)
    };

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled("[l] Connect YouTube Account", button_style)),
        Line::from(""),
    ];

    if login_enabled {
        lines.push(Line::from(vec![
            Span::styled("Login URL: ", Style::default().fg(colors::MUTED)),
            Span::styled(app.login_url.clone(), Style::default().fg(colors::TEXT)),
        ]));
    } else {
        lines.push(Line::from(Span::styled(
            "Waiting for the API to respond before sign-in is possible",
            Style::default().fg(colors::WARNING),
        )));
    }
    lines.push(Line::from(Span::styled(
        "After signing in, press p and paste the URL your browser landed on.",
        Style::default().fg(colors::MUTED),
    )));
    if let Some(notice) = &app.notice {
        lines.push(Line::from(Span::styled(
            notice.clone(),
            Style::default().fg(colors::INFO),
        )));
    }
    lines.push(Line::from(Span::styled(
        format!("API Endpoint: {}", app.api_base_url),
        Style::default().fg(colors::MUTED),
    )));

    let login = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title(" Sign in ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors::PRIMARY)),
        );
    frame.render_widget(login, chunks[0]);

    if let ProbeStatus::Connected(payload) = &app.probe {
        let response = Paragraph::new(highlight_value(payload)).block(
            Block::default()
                .title(" API Response ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors::MUTED)),
        );
        frame.render_widget(response, chunks[1]);
    }
}

fn draw_dashboard(frame: &mut Frame, app: &App, area: Rect) {
    let error_height = if app.view.error.is_some() { 4 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(error_height),
            Constraint::Min(0),
        ])
        .split(area);

    let titles = [Tab::Videos, Tab::Tests].map(|tab| {
        let count = match tab {
            Tab::Videos => app.videos.len(),
            Tab::Tests => app.tests.len(),
        };
        Line::from(format!(" {} ({}) ", tab.title(), count))
    });
    let tabs = Tabs::new(titles)
        .select(app.view.active_tab.index())
        .style(Style::default().fg(colors::MUTED))
        .highlight_style(
            Style::default()
                .fg(colors::SECONDARY)
                .add_modifier(Modifier::BOLD),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors::PRIMARY)),
        );
    frame.render_widget(tabs, chunks[0]);

    if let Some(error) = &app.view.error {
        draw_error_banner(frame, error, app.view.hint.as_deref(), chunks[1]);
    }

    if app.view.loading {
        let spinner = SPINNER[app.loading_frame % SPINNER.len()];
        let loading = Paragraph::new(format!(
            "{} Loading {}...",
            spinner,
            app.view.active_tab.title().to_lowercase()
        ))
        .style(Style::default().fg(colors::WARNING))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(loading, chunks[2]);
        return;
    }

    match app.view.active_tab {
        Tab::Videos => draw_videos(frame, app, chunks[2]),
        Tab::Tests => draw_tests(frame, app, chunks[2]),
    }
}

fn draw_error_banner(frame: &mut Frame, message: &str, hint: Option<&str>, area: Rect) {
    let mut lines = vec![Line::from(Span::styled(
        message.to_string(),
        Style::default()
            .fg(colors::ERROR)
            .add_modifier(Modifier::BOLD),
    ))];
    if let Some(hint) = hint {
        lines.push(Line::from(Span::styled(
            format!("💡 {}", hint),
            Style::default().fg(colors::WARNING),
        )));
    }

    let banner = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .title(" Error (x to dismiss) ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(colors::ERROR)),
    );
    frame.render_widget(banner, area);
}

fn empty_panel(frame: &mut Frame, title: &'static str, message: &'static str, area: Rect) {
    let panel = Paragraph::new(message)
        .style(Style::default().fg(colors::MUTED))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(colors::MUTED)),
        );
    frame.render_widget(panel, area);
}

fn draw_videos(frame: &mut Frame, app: &App, area: Rect) {
    if app.videos.is_empty() {
        empty_panel(frame, " Videos ", "No videos found for this channel", area);
        return;
    }

    let rows: Vec<Row> = app
        .videos
        .iter()
        .map(|video| {
            Row::new(vec![
                Cell::from(format_date(&video.published_at)).style(Style::default().fg(colors::MUTED)),
                Cell::from(video.title.clone()).style(Style::default().fg(colors::TEXT)),
                Cell::from(video.id.clone()).style(Style::default().fg(colors::MUTED)),
            ])
        })
        .collect();

    let header = Row::new(vec!["Published", "Title", "Video ID"])
        .style(
            Style::default()
                .fg(colors::PRIMARY)
                .add_modifier(Modifier::BOLD),
        )
        .bottom_margin(1);

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Percentage(70),
            Constraint::Min(12),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .title(" Videos ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(colors::PRIMARY)),
    )
    .row_highlight_style(Style::default().bg(colors::SURFACE))
    .highlight_symbol("> ");

    let mut table_state = TableState::default();
    table_state.select(Some(app.selected_video_index));
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn status_style(test: &AbTest) -> Style {
    let color = match test.status_kind() {
        StatusKind::Pending => colors::WARNING,
        StatusKind::Active => colors::SUCCESS,
        StatusKind::Completed => colors::INFO,
        StatusKind::Other => colors::MUTED,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

fn format_counters(metrics: Option<VariantMetrics>) -> String {
    match metrics {
        Some(m) => format!("{} views / {} clicks", m.views, m.clicks),
        None => "-".to_string(),
    }
}

fn draw_tests(frame: &mut Frame, app: &App, area: Rect) {
    if app.tests.is_empty() {
        empty_panel(frame, " Tests ", "No A/B tests yet. Press n on a video to create one.", area);
        return;
    }

    let rows: Vec<Row> = app
        .tests
        .iter()
        .map(|test| {
            let metrics = test.metrics.as_ref();
            Row::new(vec![
                Cell::from(test.status.clone()).style(status_style(test)),
                Cell::from(test.video_title.clone()).style(Style::default().fg(colors::TEXT)),
                Cell::from(test.variant_a.clone()).style(Style::default().fg(colors::TEXT)),
                Cell::from(test.variant_b.clone()).style(Style::default().fg(colors::TEXT)),
                Cell::from(format_counters(metrics.map(|m| m.variant_a)))
                    .style(Style::default().fg(colors::MUTED)),
                Cell::from(format_counters(metrics.map(|m| m.variant_b)))
                    .style(Style::default().fg(colors::MUTED)),
                Cell::from(format_date(&test.created_at)).style(Style::default().fg(colors::MUTED)),
            ])
        })
        .collect();

    let header = Row::new(vec![
        "Status", "Video", "Variant A", "Variant B", "A", "B", "Created",
    ])
    .style(
        Style::default()
            .fg(colors::PRIMARY)
            .add_modifier(Modifier::BOLD),
    )
    .bottom_margin(1);

    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Percentage(20),
            Constraint::Percentage(20),
            Constraint::Percentage(20),
            Constraint::Length(22),
            Constraint::Length(22),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .title(" Tests ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(colors::PRIMARY)),
    )
    .row_highlight_style(Style::default().bg(colors::SURFACE))
    .highlight_symbol("> ");

    let mut table_state = TableState::default();
    table_state.select(Some(app.selected_test_index));
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let popup_width = (area.width * percent_x / 100).max(1);
    let x = area.x + (area.width.saturating_sub(popup_width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, popup_width, height.min(area.height))
}

fn draw_redirect_prompt(frame: &mut Frame, input: &str, error: Option<&str>, area: Rect) {
    let popup_area = centered_rect(80, 8, area);
    frame.render_widget(Clear, popup_area);

    let mut lines = vec![
        Line::from(Span::styled(
            "Paste the URL your browser was redirected to after signing in:",
            Style::default().fg(colors::TEXT),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!("{}▎", input),
            Style::default().fg(colors::SECONDARY),
        )),
        Line::from(""),
    ];
    match error {
        Some(error) => lines.push(Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(colors::ERROR),
        ))),
        None => lines.push(Line::from(Span::styled(
            "Enter: Continue | Esc: Cancel",
            Style::default().fg(colors::MUTED),
        ))),
    }

    let popup = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .title(" Complete sign-in ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(colors::PRIMARY)),
    );
    frame.render_widget(popup, popup_area);
}

fn draw_create_form(frame: &mut Frame, form: &TestForm, area: Rect) {
    let popup_area = centered_rect(70, 14, area);
    frame.render_widget(Clear, popup_area);

    let field = |name: &'static str, value: &str, focused: bool| -> Vec<Line<'static>> {
        let border = if focused { colors::SECONDARY } else { colors::MUTED };
        let cursor = if focused { "▎" } else { "" };
        vec![
            Line::from(Span::styled(name, Style::default().fg(border).add_modifier(Modifier::BOLD))),
            Line::from(Span::styled(
                format!("  {}{}", value, cursor),
                Style::default().fg(colors::TEXT),
            )),
        ]
    };

    let mut lines = vec![
        Line::from(vec![
            label("Video: "),
            Span::styled(form.video.title.clone(), Style::default().fg(colors::TEXT)),
        ]),
        Line::from(""),
    ];
    lines.extend(field(
        "Variant A (current)",
        &form.variant_a,
        form.focus == FormField::VariantA,
    ));
    lines.push(Line::from(""));
    lines.extend(field(
        "Variant B (challenger)",
        &form.variant_b,
        form.focus == FormField::VariantB,
    ));
    lines.push(Line::from(""));

    if let Some(error) = &form.error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default()
                .fg(colors::ERROR)
                .add_modifier(Modifier::BOLD),
        )));
    }
    lines.push(Line::from(Span::styled(
        if form.submitting {
            "Creating test..."
        } else {
            "Tab: Switch field | Enter: Create | Esc: Cancel"
        },
        Style::default().fg(colors::MUTED),
    )));

    let popup = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .title(" New A/B Test ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(colors::PRIMARY)),
    );
    frame.render_widget(popup, popup_area);
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),     // Status and shortcuts
            Constraint::Length(20), // Session indicator
        ])
        .split(area);

    let (status_text, shortcuts) = match (&app.overlay, app.auth) {
        (Overlay::CreateTest(_), _) => ("🧪 New Test".to_string(), "Enter: Create | Esc: Cancel"),
        (Overlay::RedirectPrompt { .. }, _) => {
            ("🔑 Sign in".to_string(), "Enter: Continue | Esc: Cancel")
        }
        (Overlay::None, AuthState::Authenticated) => {
            let status = if app.view.loading {
                let spinner = SPINNER[app.loading_frame % SPINNER.len()];
                format!("{} {}", spinner, app.view.active_tab.title())
            } else {
                format!("📺 {}", app.view.active_tab.title())
            };
            (
                status,
                "1/2/Tab: Tabs | ↑/↓: Select | N: New test | R: Refresh | X: Dismiss | O: Logout | Q: Quit",
            )
        }
        (Overlay::None, _) => (
            "🔒 Signed out".to_string(),
            "L: Login | P: Paste redirect URL | Q: Quit",
        ),
    };

    let status_spans = vec![
        Span::styled(
            status_text,
            Style::default()
                .fg(colors::SECONDARY)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled(shortcuts, Style::default().fg(colors::MUTED)),
    ];

    let status_paragraph = Paragraph::new(Line::from(status_spans))
        .style(Style::default().bg(colors::BACKGROUND))
        .alignment(Alignment::Left);
    frame.render_widget(status_paragraph, chunks[0]);

    let session_status = if app.session.is_authenticated() {
        Span::styled(
            "🟢 Signed in",
            Style::default()
                .fg(colors::SUCCESS)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(
            "🔴 No session",
            Style::default()
                .fg(colors::ERROR)
                .add_modifier(Modifier::BOLD),
        )
    };

    let session_paragraph = Paragraph::new(Line::from(vec![session_status]))
        .style(Style::default().bg(colors::BACKGROUND))
        .alignment(Alignment::Center);
    frame.render_widget(session_paragraph, chunks[1]);
}

/// Day portion of a server timestamp. Unparseable values are shown as-is.
fn format_date(raw: &str) -> String {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.format("%Y-%m-%d").to_string();
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return parsed.format("%Y-%m-%d").to_string();
    }
    raw.to_string()
}
