mod build_logs;
mod dashboard;
mod file_diff;
pub mod pr_detail;
mod pr_files;

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::state::{AppState, Tab, View};

const HEADER_ROWS: u16 = 1;
const FOOTER_ROWS: u16 = 2;
const BORDER_ROWS: u16 = 2;

/// Rows of content visible in `view` on a terminal `terminal_rows` high. The
/// App sizes cursor windows and scroll limits with this, so it has to agree
/// with the layout below.
pub fn viewport_rows(view: View, terminal_rows: u16) -> usize {
    let inner = terminal_rows.saturating_sub(HEADER_ROWS + FOOTER_ROWS + BORDER_ROWS) as usize;
    match view {
        // column header row
        View::Dashboard => inner.saturating_sub(1),
        View::PrDetail | View::PrFiles | View::FileDiff | View::BuildLogs => inner,
    }
}

pub fn render(frame: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_ROWS),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, state, chunks[0]);

    let page = viewport_rows(state.view, frame.area().height);
    match state.view {
        View::Dashboard => dashboard::render(frame, state, chunks[1], page),
        View::PrDetail => pr_detail::render(frame, state, chunks[1], page),
        View::PrFiles => pr_files::render(frame, state, chunks[1], page),
        View::FileDiff => file_diff::render(frame, state, chunks[1], page),
        View::BuildLogs => build_logs::render(frame, state, chunks[1], page),
    }

    render_status_line(frame, state, chunks[2]);
    render_error_line(frame, state, chunks[3]);
}

fn render_header(frame: &mut Frame, state: &AppState, area: Rect) {
    let title_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let mut spans = vec![Span::styled(
        format!("adboard - {} ", state.organization),
        title_style,
    )];

    match state.view {
        View::Dashboard => {
            for tab in [Tab::PullRequests, Tab::Builds] {
                let count = match tab {
                    Tab::PullRequests => state.pull_requests.len(),
                    Tab::Builds => state.builds.len(),
                };
                let style = if tab == state.tab {
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::Gray)
                };
                spans.push(Span::raw(" "));
                spans.push(Span::styled(format!("[{} ({})]", tab.title(), count), style));
            }
        }
        View::PrDetail | View::PrFiles | View::FileDiff => {
            if let Some(pr) = &state.selected_pr {
                spans.push(Span::raw(format!(
                    "| {}/{} PR #{}",
                    pr.project, pr.repository, pr.id
                )));
            }
            if let (View::FileDiff, Some(diff)) = (state.view, &state.diff) {
                spans.push(Span::raw(format!(" | {}", diff.path)));
            }
        }
        View::BuildLogs => {
            if let Some(build) = &state.selected_build {
                spans.push(Span::raw(format!(
                    "| {} #{}",
                    build.definition.name, build.number
                )));
            }
        }
    }

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_status_line(frame: &mut Frame, state: &AppState, area: Rect) {
    let updated = match state.last_updated {
        Some(at) => format!("Updated {}", at.format("%H:%M:%S")),
        None => "Not updated yet".to_string(),
    };
    let auto = if state.auto_refresh {
        format!("Auto-refresh {}s", state.refresh_interval.as_secs())
    } else {
        "Auto-refresh off".to_string()
    };

    let mut spans = vec![
        Span::styled(updated, Style::default().fg(Color::Gray)),
        Span::raw(" | "),
        Span::styled(auto, Style::default().fg(Color::Gray)),
    ];

    let loading = [
        (state.loading.refresh, "Refreshing..."),
        (state.loading.files, "Loading files..."),
        (state.loading.diff, "Loading diff..."),
        (state.loading.logs, "Loading logs..."),
    ];
    for (_, label) in loading.iter().filter(|(active, _)| *active) {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(*label, Style::default().fg(Color::Yellow)));
    }

    let status = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(status, area);
}

fn render_error_line(frame: &mut Frame, state: &AppState, area: Rect) {
    let line = if let Some(error) = &state.last_error {
        Line::from(Span::styled(
            format!("Error: {}", error),
            Style::default().fg(Color::Red),
        ))
    } else {
        let help = match state.view {
            View::Dashboard => {
                "Tab: switch | j/k: nav | Enter: open | r: refresh | a: auto | +/-: interval | q: quit"
            }
            View::PrDetail => "Enter: files | g: browser | c: clone | j/k: scroll | h: back | q: quit",
            View::PrFiles => "Enter: diff | j/k: nav | h: back | q: quit",
            View::FileDiff => "j/k: scroll | Ctrl+d/u: page | h: back | q: quit",
            View::BuildLogs => "j/k: scroll | Ctrl+d/u: page | g: browser | h: back | q: quit",
        };
        Line::from(Span::styled(help, Style::default().fg(Color::Gray)))
    };
    frame.render_widget(Paragraph::new(line), area);
}

/// Cut `text` to at most `width` characters, marking the cut with "...".
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width <= 3 {
        return text.chars().take(width).collect();
    }
    let mut cut: String = text.chars().take(width - 3).collect();
    cut.push_str("...");
    cut
}

/// Visible slice of `lines` for a scroll offset, clamped again here so a
/// stale offset can never index past the content.
fn visible<T>(lines: &[T], offset: usize, page: usize) -> &[T] {
    let start = offset.min(crate::state::max_scroll(lines.len(), page));
    let end = (start + page).min(lines.len());
    &lines[start..end]
}

fn selected_style() -> Style {
    Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD | Modifier::REVERSED)
}
