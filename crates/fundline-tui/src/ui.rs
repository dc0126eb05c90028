//! Rendering.
//!
//! Pure functions from [`App`] state to ratatui widgets. Nothing in here
//! mutates wizard state or issues gateway calls.

use crate::app::{App, MainFocus, ModalWidget, PRESET_AMOUNTS, modal_ring, picked_amount};
use chrono::Utc;
use fundline_core::feed::{FeedSnapshot, LogEntry};
use fundline_core::flow::FlowAction;
use fundline_core::session::{AuthMode, DonationSession, DonationStep};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

const ASCII_LOGO: &str = r#" ███████╗██╗   ██╗███╗   ██╗██████╗ ██╗     ██╗███╗   ██╗███████╗
 ██╔════╝██║   ██║████╗  ██║██╔══██╗██║     ██║████╗  ██║██╔════╝
 █████╗  ██║   ██║██╔██╗ ██║██║  ██║██║     ██║██╔██╗ ██║█████╗
 ██╔══╝  ██║   ██║██║╚██╗██║██║  ██║██║     ██║██║╚██╗██║██╔══╝
 ██║     ╚██████╔╝██║ ╚████║██████╔╝███████╗██║██║ ╚████║███████╗
 ╚═╝      ╚═════╝ ╚═╝  ╚═══╝╚═════╝ ╚══════╝╚═╝╚═╝  ╚═══╝╚══════╝"#;

const PROGRESS_CELLS: usize = 20;

fn green() -> Style {
    Style::default().fg(Color::Green)
}

fn dim_green() -> Style {
    Style::default().fg(Color::DarkGray)
}

fn amber() -> Style {
    Style::default().fg(Color::Yellow)
}

fn red() -> Style {
    Style::default().fg(Color::Red)
}

fn focused_style() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(Color::Green)
        .add_modifier(Modifier::BOLD)
}

/// The 20-cell fund monitor bar. With a goal configured the fill tracks
/// progress toward it; without one the monitor runs in unlimited mode.
pub fn progress_bar(total_dollars: f64, goal: Option<f64>) -> String {
    match goal {
        Some(goal) if goal > 0.0 => {
            let ratio = (total_dollars / goal).clamp(0.0, 1.0);
            let filled = (ratio * PROGRESS_CELLS as f64).floor() as usize;
            format!(
                "[{}{}] {}%",
                "█".repeat(filled),
                "░".repeat(PROGRESS_CELLS - filled),
                (ratio * 100.0).floor() as i64
            )
        }
        _ => format!("[{}] ∞ UNLIMITED", "░".repeat(PROGRESS_CELLS)),
    }
}

/// One `tail -f donations.log` line.
pub fn log_line(entry: &LogEntry) -> String {
    let level = if entry.is_anonymous() { "INFO" } else { "SUCCESS" };
    format!(
        "[{}] {}: {} sent packet {{ amount: ${:.0} }}",
        entry.created_at.format("%Y-%m-%d %H:%M:%S"),
        level,
        entry.donor_label,
        entry.amount_dollars()
    )
}

pub fn draw(f: &mut Frame, app: &App) {
    let session = app.session();
    let feed = app.feed();
    let area = f.size();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(12),
                Constraint::Length(7),
                Constraint::Length(8),
                Constraint::Min(5),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(area);

    draw_boot(f, rows[0], app);
    draw_stats(f, rows[1], app, &session, &feed);
    draw_picker(f, rows[2], app);
    draw_logs(f, rows[3], &feed);
    draw_footer(f, rows[4], &session);

    if session.modal_open {
        draw_modal(f, area, app, &session);
    }
}

fn draw_boot(f: &mut Frame, area: Rect, app: &App) {
    let mut lines: Vec<Line> = vec![Line::from(vec![
        Span::styled("root@fundline:~$ ", green().add_modifier(Modifier::BOLD)),
        Span::styled("./init_system.sh", green()),
    ])];
    for (text, _) in app.boot.visible_lines() {
        lines.push(Line::from(Span::styled(*text, dim_green())));
    }
    if app.boot.banner_visible() {
        for logo_line in ASCII_LOGO.lines() {
            lines.push(Line::from(Span::styled(
                logo_line,
                green().add_modifier(Modifier::BOLD),
            )));
        }
    }
    f.render_widget(Paragraph::new(Text::from(lines)), area);
}

fn draw_stats(f: &mut Frame, area: Rect, app: &App, session: &DonationSession, feed: &FeedSnapshot) {
    if !app.boot.stats_visible() {
        return;
    }
    let account = session
        .user
        .as_ref()
        .map(|u| u.username.clone())
        .unwrap_or_else(|| "anonymous".to_string());
    let goal_suffix = match app.funding_goal {
        Some(goal) => format!(" / ${goal:.0}"),
        None => " / UNLIMITED".to_string(),
    };
    let sync = match feed.fetched_at {
        Some(at) => format!("last sync {}s ago", (Utc::now() - at).num_seconds().max(0)),
        None => "awaiting first sync".to_string(),
    };

    let lines = vec![
        Line::from(vec![
            Span::styled("STATUS: ", dim_green()),
            Span::styled("ONLINE", green().add_modifier(Modifier::BOLD)),
            Span::styled("   ACCOUNT: ", dim_green()),
            Span::styled(account, green()),
        ]),
        Line::from(vec![
            Span::styled("[SYSTEM_FUNDS]: ", green().add_modifier(Modifier::BOLD)),
            Span::styled(format!("${:.2}", feed.total_dollars), amber()),
            Span::styled(goal_suffix, dim_green()),
        ]),
        Line::from(Span::styled(
            progress_bar(feed.total_dollars, app.funding_goal),
            green(),
        )),
        Line::from(Span::styled(sync, dim_green())),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(green())
        .title(" SYSTEM_STATUS ");
    f.render_widget(Paragraph::new(Text::from(lines)).block(block), area);
}

fn draw_picker(f: &mut Frame, area: Rect, app: &App) {
    let current = picked_amount(app.custom_amount.value(), app.selected_preset).unwrap_or(0.0);

    let mut preset_spans: Vec<Span> = Vec::new();
    for (i, amount) in PRESET_AMOUNTS.iter().enumerate() {
        let label = format!("[ ./donate_{amount}.sh ]");
        let style = if app.focus == MainFocus::Preset(i) {
            focused_style()
        } else if app.selected_preset == Some(i) {
            green().add_modifier(Modifier::BOLD)
        } else {
            dim_green()
        };
        preset_spans.push(Span::styled(label, style));
        preset_spans.push(Span::raw("  "));
    }

    let custom_style = if app.focus == MainFocus::Custom {
        focused_style()
    } else {
        green()
    };
    let custom_display = if app.custom_amount.is_empty() {
        "___".to_string()
    } else {
        app.custom_amount.display()
    };

    let execute_style = if app.focus == MainFocus::Execute {
        focused_style()
    } else {
        green()
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled("root@user:~$ ", green().add_modifier(Modifier::BOLD)),
            Span::styled("donate --amount ", green()),
            Span::styled(format!("[{current:.0}]"), amber()),
            Span::styled("_", green().add_modifier(Modifier::SLOW_BLINK)),
        ]),
        Line::from(preset_spans),
        Line::from(vec![
            Span::styled("> custom_amount: $", dim_green()),
            Span::styled(custom_display, custom_style),
        ]),
        Line::from(Span::styled("> EXECUTE_TRANSFER [ENTER]", execute_style)),
    ];
    if let Some(error) = &app.amount_error {
        lines.push(Line::from(Span::styled(format!("[ERROR] {error}"), red())));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(green())
        .title(" donation_terminal.exe ");
    f.render_widget(Paragraph::new(Text::from(lines)).block(block), area);
}

fn draw_logs(f: &mut Frame, area: Rect, feed: &FeedSnapshot) {
    let mut lines: Vec<Line> = Vec::new();
    for entry in &feed.recent {
        let style = if entry.is_anonymous() { dim_green() } else { green() };
        lines.push(Line::from(Span::styled(log_line(entry), style)));
    }
    if feed.recent.is_empty() {
        lines.push(Line::from(Span::styled("-- no donations yet --", dim_green())));
    }
    lines.push(Line::from(Span::styled(
        format!(
            "--- LIVE FEED ACTIVE --- {} entries loaded ---",
            feed.recent.len()
        ),
        dim_green(),
    )));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(green())
        .title(" root@user:~$ tail -f donations.log ");
    f.render_widget(
        Paragraph::new(Text::from(lines))
            .block(block)
            .wrap(Wrap { trim: false }),
        area,
    );
}

fn draw_footer(f: &mut Frame, area: Rect, session: &DonationSession) {
    let help = if session.modal_open {
        "Tab: focus  Enter: select  Esc: close terminal"
    } else {
        "Tab: focus  Enter: execute  q: quit"
    };
    f.render_widget(
        Paragraph::new(Span::styled(help, dim_green())).alignment(Alignment::Center),
        area,
    );
}

fn modal_title(session: &DonationSession) -> &'static str {
    match session.step {
        DonationStep::Auth => " > AUTHENTICATION_TERMINAL ",
        DonationStep::Payment => " > PAYMENT_TERMINAL ",
        DonationStep::Success => " > TRANSACTION_COMPLETE ",
        DonationStep::Amount => " > DONATION_TERMINAL ",
    }
}

fn draw_modal(f: &mut Frame, area: Rect, app: &App, session: &DonationSession) {
    let window = centered_rect(area, 64, 18);
    f.render_widget(Clear, window);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(green().add_modifier(Modifier::BOLD))
        .title(modal_title(session));
    f.render_widget(block, window);

    let inner = window.inner(ratatui::layout::Margin {
        vertical: 1,
        horizontal: 2,
    });

    let ring = modal_ring(session.step, session.auth_mode);
    let focused = ring
        .get(app.modal_focus.min(ring.len().saturating_sub(1)))
        .copied();

    let lines = match session.step {
        DonationStep::Auth => auth_lines(app, session, focused),
        DonationStep::Payment => payment_lines(app, session, focused),
        DonationStep::Success => success_lines(session, focused),
        DonationStep::Amount => Vec::new(),
    };
    f.render_widget(
        Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false }),
        inner,
    );
}

fn field_line(label: &str, value: String, focused: bool) -> Line<'static> {
    let marker = if focused { "> " } else { "  " };
    Line::from(vec![
        Span::styled(format!("{marker}{label} "), dim_green()),
        Span::styled(
            value,
            if focused { focused_style() } else { green() },
        ),
        Span::styled(if focused { "_" } else { "" }, green()),
    ])
}

fn button_line(label: &str, focused: bool) -> Line<'static> {
    let style = if focused { focused_style() } else { green() };
    Line::from(Span::styled(format!("  {label}"), style))
}

fn error_line(message: &str) -> Line<'static> {
    Line::from(Span::styled(format!("  [ERROR] {message}"), red()))
}

fn auth_lines(
    app: &App,
    session: &DonationSession,
    focused: Option<ModalWidget>,
) -> Vec<Line<'static>> {
    let is = |w: ModalWidget| focused == Some(w);
    let busy = app.is_busy(FlowAction::Auth);
    let mut lines = vec![
        Line::from(Span::styled(
            "> Authentication enables donation history tracking",
            dim_green(),
        )),
        Line::from(Span::styled("> You can also donate anonymously", dim_green())),
        Line::from(""),
    ];
    if let Some(error) = &app.auth_error {
        lines.push(error_line(error));
        lines.push(Line::from(""));
    }

    match session.auth_mode {
        AuthMode::SignIn => {
            lines.push(field_line(
                "EMAIL_ADDRESS:",
                app.email.display(),
                is(ModalWidget::EmailField),
            ));
            lines.push(field_line(
                "PASSWORD:     ",
                app.password.display(),
                is(ModalWidget::PasswordField),
            ));
            lines.push(Line::from(""));
            let label = if busy { "AUTHENTICATING..." } else { "> SIGN_IN [ENTER]" };
            lines.push(button_line(label, is(ModalWidget::SignInBtn)));
            lines.push(button_line("CREATE_ACCOUNT", is(ModalWidget::ToSignUpBtn)));
            lines.push(button_line("SKIP_→ (donate anonymously)", is(ModalWidget::SkipBtn)));
        }
        AuthMode::SignUp => {
            lines.push(field_line(
                "NAME (Optional):",
                app.name.display(),
                is(ModalWidget::NameField),
            ));
            lines.push(field_line(
                "EMAIL_ADDRESS:  ",
                app.email.display(),
                is(ModalWidget::EmailField),
            ));
            lines.push(field_line(
                "PASSWORD:       ",
                app.password.display(),
                is(ModalWidget::PasswordField),
            ));
            lines.push(Line::from(""));
            let label = if busy {
                "CREATING_ACCOUNT..."
            } else {
                "> CREATE_ACCOUNT [ENTER]"
            };
            lines.push(button_line(label, is(ModalWidget::SignUpBtn)));
            lines.push(button_line("< BACK_TO_SIGN_IN", is(ModalWidget::ToSignInBtn)));
        }
        AuthMode::Confirm => {
            let email = session.pending_email.clone().unwrap_or_default();
            lines.push(Line::from(vec![
                Span::styled("  Verification code sent to: ", dim_green()),
                Span::styled(email, green().add_modifier(Modifier::BOLD)),
            ]));
            lines.push(field_line(
                "VERIFICATION_CODE:",
                app.code.display(),
                is(ModalWidget::CodeField),
            ));
            lines.push(Line::from(""));
            let label = if busy { "VERIFYING..." } else { "> VERIFY_CODE [ENTER]" };
            lines.push(button_line(label, is(ModalWidget::VerifyBtn)));
            lines.push(button_line("< BACK_TO_SIGN_IN", is(ModalWidget::ToSignInBtn)));
        }
    }
    lines
}

fn payment_lines(
    app: &App,
    session: &DonationSession,
    focused: Option<ModalWidget>,
) -> Vec<Line<'static>> {
    let is = |w: ModalWidget| focused == Some(w);
    let mut lines = vec![Line::from(vec![
        Span::styled("  TRANSACTION_AMOUNT: ", dim_green()),
        Span::styled(
            format!("${:.2}", session.amount),
            amber().add_modifier(Modifier::BOLD),
        ),
    ])];
    lines.push(Line::from(""));

    if session.intent.is_none() {
        if app.is_busy(FlowAction::Intent) {
            lines.push(Line::from(Span::styled(
                "  [INITIALIZING PAYMENT TERMINAL...]",
                dim_green(),
            )));
        } else if let Some(error) = &app.payment_error {
            lines.push(error_line(error));
            lines.push(Line::from(Span::styled(
                "  Press ENTER to retry initialization.",
                dim_green(),
            )));
        }
        lines.push(Line::from(""));
        lines.push(button_line("> RETRY_INIT [ENTER]", is(ModalWidget::ExecutePaymentBtn)));
    } else {
        lines.push(Line::from(Span::styled(
            "> Establishing secure connection...",
            dim_green(),
        )));
        lines.push(Line::from(Span::styled(
            "> Card entry delegated to the payment processor.",
            dim_green(),
        )));
        lines.push(Line::from(""));
        if let Some(error) = &app.payment_error {
            lines.push(error_line(error));
            lines.push(Line::from(""));
        }
        let label = if app.is_busy(FlowAction::Payment) {
            "PROCESSING_TRANSACTION..."
        } else {
            ">> EXECUTE_PAYMENT [ENTER]"
        };
        lines.push(button_line(label, is(ModalWidget::ExecutePaymentBtn)));
    }
    lines.push(button_line("< BACK", is(ModalWidget::BackBtn)));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  Secured by the payment processor • Card data never touches this terminal",
        dim_green(),
    )));
    lines
}

fn success_lines(session: &DonationSession, focused: Option<ModalWidget>) -> Vec<Line<'static>> {
    let is = |w: ModalWidget| focused == Some(w);
    vec![
        Line::from(Span::styled(
            "  ╔═══════════════════════════════════════╗",
            green(),
        )),
        Line::from(Span::styled(
            "  ║        TRANSACTION SUCCESSFUL         ║",
            green().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "  ╚═══════════════════════════════════════╝",
            green(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("  STATUS: ", dim_green()),
            Span::styled("[COMPLETED]", green().add_modifier(Modifier::BOLD)),
        ]),
        Line::from(vec![
            Span::styled("  AMOUNT: ", dim_green()),
            Span::styled(
                format!("${:.2} USD", session.amount),
                amber().add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled("  TIMESTAMP: ", dim_green()),
            Span::styled(Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(), green()),
        ]),
        Line::from(""),
        Line::from(Span::styled("  > Payment processed successfully", dim_green())),
        Line::from(Span::styled("  > Updating donation counter...", dim_green())),
        Line::from(Span::styled("  > [OK] All systems updated", green())),
        Line::from(""),
        Line::from(Span::styled(
            "  THANK YOU FOR YOUR SUPPORT!",
            green().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        button_line("> CLOSE_TERMINAL [ESC]", is(ModalWidget::CloseBtn)),
    ]
}

/// A fixed-size window centered in `area`, clamped to it.
fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
