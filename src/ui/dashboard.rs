use chrono::Local;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::state::{AppState, ListCursor, Tab};
use crate::types::{Build, BuildResult, BuildStatus, PullRequest};

use super::{selected_style, truncate};

pub fn render(frame: &mut Frame, state: &AppState, area: Rect, page: usize) {
    let count = match state.tab {
        Tab::PullRequests => state.pull_requests.len(),
        Tab::Builds => state.builds.len(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ({}) ", state.tab.title(), count))
        .border_style(Style::default().fg(Color::Yellow));

    if state.loading.refresh && state.pull_requests.is_empty() && state.builds.is_empty() {
        let loading = Paragraph::new("Loading data...")
            .block(block)
            .style(Style::default().fg(Color::Yellow));
        frame.render_widget(loading, area);
        return;
    }

    if count == 0 {
        let message = match state.tab {
            Tab::PullRequests => "No active pull requests",
            Tab::Builds => "No builds",
        };
        let empty = Paragraph::new(message)
            .block(block)
            .style(Style::default().fg(Color::Gray));
        frame.render_widget(empty, area);
        return;
    }

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(inner);

    let width = inner.width as usize;
    let (header, rows) = match state.tab {
        Tab::PullRequests => (
            pr_header(width),
            window_rows(&state.pull_requests, &state.pr_cursor, page, |pr| {
                pr_row(pr, width)
            }),
        ),
        Tab::Builds => (
            build_header(width),
            window_rows(&state.builds, &state.build_cursor, page, |build| {
                build_row(build, width)
            }),
        ),
    };

    let header_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD);
    frame.render_widget(Paragraph::new(header).style(header_style), chunks[0]);
    frame.render_widget(Paragraph::new(rows), chunks[1]);
}

fn window_rows<'a, T>(
    items: &'a [T],
    cursor: &ListCursor,
    page: usize,
    row: impl Fn(&'a T) -> Line<'a>,
) -> Vec<Line<'a>> {
    cursor
        .window(items.len(), page)
        .map(|i| {
            let line = row(&items[i]);
            if cursor.selected == Some(i) {
                line.style(selected_style())
            } else {
                line
            }
        })
        .collect()
}

// #id(7) title author(16) repository(24) created(16)
const PR_FIXED: usize = 7 + 1 + 1 + 16 + 1 + 24 + 1 + 16;

fn pr_header(width: usize) -> String {
    let title_width = width.saturating_sub(PR_FIXED).max(10);
    format!(
        "{:<7} {:<title_width$} {:<16} {:<24} {}",
        "ID", "Title", "Author", "Repository", "Created"
    )
}

fn pr_row(pr: &PullRequest, width: usize) -> Line<'_> {
    let title_width = width.saturating_sub(PR_FIXED).max(10);
    let title = if pr.is_draft {
        format!("[draft] {}", pr.title)
    } else {
        pr.title.clone()
    };
    let repository = format!("{}/{}", pr.project, pr.repository);

    Line::from(vec![
        Span::styled(
            format!("{:<7}", format!("#{}", pr.id)),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(" "),
        Span::raw(format!(
            "{:<title_width$}",
            truncate(&title, title_width)
        )),
        Span::raw(" "),
        Span::styled(
            format!("{:<16}", truncate(&pr.author, 16)),
            Style::default().fg(Color::Yellow),
        ),
        Span::raw(" "),
        Span::styled(
            format!("{:<24}", truncate(&repository, 24)),
            Style::default().fg(Color::Blue),
        ),
        Span::raw(" "),
        Span::styled(
            pr.created_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string(),
            Style::default().fg(Color::Gray),
        ),
    ])
}

// icon(2) number(14) pipeline(18) branch state(20) requested by(16) project
const BUILD_FIXED: usize = 2 + 14 + 1 + 18 + 1 + 1 + 20 + 1 + 16 + 1 + 16;

fn build_header(width: usize) -> String {
    let branch_width = width.saturating_sub(BUILD_FIXED).max(10);
    format!(
        "  {:<14} {:<18} {:<branch_width$} {:<20} {:<16} {}",
        "Build", "Pipeline", "Branch", "Status", "Requested by", "Project"
    )
}

fn build_row(build: &Build, width: usize) -> Line<'_> {
    let branch_width = width.saturating_sub(BUILD_FIXED).max(10);
    let state_color = match (build.status, build.result) {
        (_, BuildResult::Succeeded) => Color::Green,
        (_, BuildResult::Failed) => Color::Red,
        (_, BuildResult::PartiallySucceeded) => Color::Yellow,
        (_, BuildResult::Canceled) => Color::Gray,
        (BuildStatus::InProgress, BuildResult::None) => Color::Cyan,
        (_, BuildResult::None) => Color::Gray,
    };

    Line::from(vec![
        Span::styled(
            format!("{} ", build.icon()),
            Style::default().fg(state_color),
        ),
        Span::raw(format!("{:<14}", truncate(&build.number, 14))),
        Span::raw(" "),
        Span::styled(
            format!("{:<18}", truncate(&build.definition.name, 18)),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(" "),
        Span::styled(
            format!(
                "{:<branch_width$}",
                truncate(build.branch(), branch_width)
            ),
            Style::default().fg(Color::Blue),
        ),
        Span::raw(" "),
        Span::styled(
            format!("{:<20}", build.state_label()),
            Style::default().fg(state_color),
        ),
        Span::raw(" "),
        Span::styled(
            format!("{:<16}", truncate(&build.requested_for, 16)),
            Style::default().fg(Color::Yellow),
        ),
        Span::raw(" "),
        Span::raw(truncate(&build.project, 16)),
    ])
}
