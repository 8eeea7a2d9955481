use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap},
};

use super::{Phase, RunOutcome, WizardApp};
use crate::ui::Layout as ScreenLayout;

/// Main draw function for the installer wizard
pub fn draw(frame: &mut Frame, app: &WizardApp) {
    let layout = ScreenLayout::new(frame.area());
    frame.render_widget(Clear, layout.full);

    draw_header(frame, layout.header, app);

    match app.phase {
        Phase::Welcome => draw_welcome(frame, layout.content, app),
        Phase::Asking(i) => draw_question(frame, layout.content, app, i),
        Phase::Summary => draw_summary(frame, layout.content, app),
        Phase::Running => draw_progress(frame, layout.content, app),
        Phase::Done => draw_done(frame, layout.content, app),
    }

    draw_message(frame, layout.message, app);
    draw_status_bar(frame, layout.status, app);
}

fn draw_header(frame: &mut Frame, area: Rect, app: &WizardApp) {
    frame.render_widget(Clear, area);

    frame.render_widget(
        Paragraph::new(format!(" {} ", app.title))
            .style(app.theme.primary_style().add_modifier(Modifier::BOLD)),
        area,
    );

    let right = if app.is_dryrun() {
        "[dryrun] ".to_string()
    } else if app.phase == Phase::Running {
        format!("{} ", app.spinner_char())
    } else {
        String::new()
    };
    frame.render_widget(
        Paragraph::new(right)
            .style(app.theme.secondary_style())
            .alignment(Alignment::Right),
        area,
    );
}

fn draw_welcome(frame: &mut Frame, area: Rect, app: &WizardApp) {
    let boxed = centered(area, 62, 12);
    let block = bordered(app, format!(" {} ", app.title));
    let inner = block.inner(boxed);
    frame.render_widget(Clear, boxed);
    frame.render_widget(block, boxed);

    let lines = vec![
        Line::raw(""),
        Line::styled(app.subtitle.clone(), app.theme.secondary_style()),
        Line::raw(""),
        Line::raw("This wizard will guide you through installing the"),
        Line::raw(format!(
            "optional tools for Zush ({} available).",
            app.catalog.len()
        )),
        Line::raw(""),
        Line::raw("You will be asked about each tool in turn, then shown"),
        Line::raw("a summary before anything is installed."),
    ];
    frame.render_widget(
        Paragraph::new(lines)
            .style(app.theme.style())
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        inner,
    );

    draw_button_row(frame, inner, app, &[("[ Start Installation ]", true)]);
}

fn draw_question(frame: &mut Frame, area: Rect, app: &WizardApp, index: usize) {
    let Some(task) = app.catalog.get(index) else {
        return;
    };
    let (position, total) = app.position().unwrap_or((index + 1, app.catalog.len()));

    let boxed = centered(area, 66, 13);
    let block = bordered(app, format!(" Install {}? ({position}/{total}) ", task.name));
    let inner = block.inner(boxed);
    frame.render_widget(Clear, boxed);
    frame.render_widget(block, boxed);

    let body = Rect::new(
        inner.x + 1,
        inner.y + 1,
        inner.width.saturating_sub(2),
        inner.height.saturating_sub(4),
    );
    frame.render_widget(
        Paragraph::new(task.description.clone())
            .style(app.theme.style())
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        body,
    );

    draw_button_row(frame, inner, app, &[("[ Yes (y) ]", true), ("[ No (n) ]", false)]);
}

fn draw_summary(frame: &mut Frame, area: Rect, app: &WizardApp) {
    let height = (app.selected.len() as u16 + 9).min(area.height);
    let boxed = centered(area, 66, height);
    let block = bordered(app, " Installation Summary ".to_string());
    let inner = block.inner(boxed);
    frame.render_widget(Clear, boxed);
    frame.render_widget(block, boxed);

    let mut lines = vec![Line::raw("")];
    if app.selected.is_empty() {
        lines.push(Line::styled(
            "No tools selected for installation.",
            app.theme.muted_style(),
        ));
    } else {
        lines.push(Line::raw("The following tools will be installed:"));
        lines.push(Line::raw(""));
        for task in &app.selected {
            lines.push(Line::styled(
                format!("  * {}", task.name),
                app.theme.secondary_style(),
            ));
        }
        lines.push(Line::raw(""));
        lines.push(Line::styled(
            format!("Total: {} tool(s)", app.selected.len()),
            app.theme.primary_style(),
        ));
    }
    frame.render_widget(
        Paragraph::new(lines).style(app.theme.style()),
        Rect::new(
            inner.x + 1,
            inner.y,
            inner.width.saturating_sub(2),
            inner.height.saturating_sub(2),
        ),
    );

    let confirm = if app.selected.is_empty() {
        "[ Finish (Enter) ]"
    } else {
        "[ Install (Enter) ]"
    };
    draw_button_row(frame, inner, app, &[(confirm, true), ("[ Cancel (Esc) ]", false)]);
}

fn draw_progress(frame: &mut Frame, area: Rect, app: &WizardApp) {
    let block = bordered(app, " Installing Zush Tools ".to_string());
    let inner = block.inner(area);
    frame.render_widget(Clear, area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Status line
            Constraint::Length(1), // Gauge
            Constraint::Length(1), // Count
            Constraint::Length(1), // Spacer
            Constraint::Min(3),    // Log
        ])
        .split(inner);

    frame.render_widget(
        Paragraph::new(app.run.status_line.clone()).style(app.theme.secondary_style()),
        chunks[0],
    );

    frame.render_widget(
        Gauge::default()
            .gauge_style(app.theme.primary_style())
            .ratio(app.run.ratio())
            .label(format!("{:.0}%", app.run.ratio() * 100.0)),
        chunks[1],
    );

    frame.render_widget(
        Paragraph::new(format!(
            "{} / {} tools installed",
            app.run.completed, app.run.total
        ))
        .style(app.theme.muted_style()),
        chunks[2],
    );

    draw_log(frame, chunks[4], app);
}

fn draw_done(frame: &mut Frame, area: Rect, app: &WizardApp) {
    let block = bordered(app, " Installation Finished ".to_string());
    let inner = block.inner(area);
    frame.render_widget(Clear, area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Outcome summary
            Constraint::Min(3),    // Log
        ])
        .split(inner);

    let mut lines = Vec::new();
    match app.outcome {
        Some(RunOutcome::CompletedRun {
            selected,
            succeeded,
            failed,
        }) => {
            lines.push(Line::styled(
                format!("Installed {succeeded} of {selected} tool(s)."),
                app.theme.success_style(),
            ));
            if failed > 0 {
                lines.push(Line::styled(
                    format!("{failed} tool(s) failed to install; see the log below."),
                    app.theme.error_style(),
                ));
            }
        }
        Some(RunOutcome::CancelledDuringExecution { completed, total }) => {
            lines.push(Line::styled(
                format!("Cancelled after {completed} of {total} tool(s)."),
                app.theme.secondary_style(),
            ));
        }
        Some(RunOutcome::CompletedWithNoSelection) => {
            lines.push(Line::raw("Nothing to install."));
        }
        _ => {}
    }
    lines.push(Line::styled(
        "Zush installation process finished!",
        app.theme.primary_style(),
    ));
    frame.render_widget(Paragraph::new(lines).style(app.theme.style()), chunks[0]);

    draw_log(frame, chunks[1], app);
}

fn draw_log(frame: &mut Frame, area: Rect, app: &WizardApp) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.theme.border_style())
        .title(" Installation Log ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let visible = inner.height as usize;
    let lines: Vec<Line> = app
        .run
        .log
        .iter()
        .rev()
        .take(visible)
        .rev()
        .map(|entry| {
            if entry.starts_with("[failed]") {
                Line::styled(entry.clone(), app.theme.error_style())
            } else if entry.starts_with("[ok]") {
                Line::styled(entry.clone(), app.theme.success_style())
            } else {
                Line::styled(entry.clone(), app.theme.muted_style())
            }
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_message(frame: &mut Frame, area: Rect, app: &WizardApp) {
    let text = if app.run.cancel_requested && !app.run.finished {
        Some((
            "Cancelling... the current tool will finish first.".to_string(),
            app.theme.secondary_style(),
        ))
    } else {
        app.finalizer_note
            .clone()
            .map(|note| (note, app.theme.error_style()))
    };

    let Some((text, style)) = text else {
        return;
    };
    frame.render_widget(
        Paragraph::new(text)
            .style(style)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn draw_status_bar(frame: &mut Frame, area: Rect, app: &WizardApp) {
    let (left, right) = app.status_hints();
    frame.render_widget(
        Paragraph::new(format!(" {left}")).style(app.theme.muted_style()),
        area,
    );
    frame.render_widget(
        Paragraph::new(format!("{right} "))
            .style(app.theme.muted_style())
            .alignment(Alignment::Right),
        area,
    );
}

fn draw_button_row(frame: &mut Frame, inner: Rect, app: &WizardApp, buttons: &[(&str, bool)]) {
    if inner.height < 2 {
        return;
    }
    let y = inner.y + inner.height - 2;
    let total_width: u16 = buttons.iter().map(|(b, _)| b.len() as u16 + 2).sum();
    let mut x = inner.x + inner.width.saturating_sub(total_width) / 2;

    for (label, active) in buttons {
        frame.render_widget(
            Paragraph::new(*label).style(app.theme.button_style(*active)),
            Rect::new(x, y, label.len() as u16, 1),
        );
        x += label.len() as u16 + 2;
    }
}

fn bordered(app: &WizardApp, title: String) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(app.theme.border_style())
        .title(title)
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    ScreenLayout::centered_box(
        area,
        width.min(area.width),
        height.min(area.height),
    )
}
