use chrono::Local;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::state::AppState;
use crate::types::{PrStatus, PullRequest};

use super::visible;

/// Lines of the detail view; the App clamps `detail_scroll` against their count.
pub fn content_lines(pr: &PullRequest) -> Vec<Line<'_>> {
    let status_color = match pr.status {
        PrStatus::Active => Color::Green,
        PrStatus::Completed => Color::Magenta,
        PrStatus::Abandoned => Color::Red,
    };
    let label = Style::default().fg(Color::Gray);

    let mut status = vec![Span::styled(
        pr.status.to_string(),
        Style::default()
            .fg(status_color)
            .add_modifier(Modifier::BOLD),
    )];
    if pr.is_draft {
        status.push(Span::styled(" (draft)", Style::default().fg(Color::Yellow)));
    }

    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                format!("#{} ", pr.id),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(pr.title.as_str(), Style::default().add_modifier(Modifier::BOLD)),
        ]),
        Line::from(status),
        Line::from(vec![
            Span::styled("Author:     ", label),
            Span::styled(pr.author.as_str(), Style::default().fg(Color::Yellow)),
        ]),
        Line::from(vec![
            Span::styled("Repository: ", label),
            Span::raw(format!("{}/{}", pr.project, pr.repository)),
        ]),
        Line::from(vec![
            Span::styled("Branches:   ", label),
            Span::styled(
                format!("{} -> {}", pr.source_branch(), pr.target_branch()),
                Style::default().fg(Color::Cyan),
            ),
        ]),
        Line::from(vec![
            Span::styled("Created:    ", label),
            Span::raw(
                pr.created_at
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string(),
            ),
        ]),
        Line::default(),
        Line::from(Span::styled(
            "Description",
            Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )),
    ];

    match pr.description.as_deref() {
        Some(description) => lines.extend(
            description
                .lines()
                .map(|l| Line::from(l.trim_end_matches('\r').replace('\t', "    "))),
        ),
        None => lines.push(Line::from(Span::styled(
            "No description provided.",
            Style::default().fg(Color::Gray),
        ))),
    }

    lines
}

pub fn content_height(pr: &PullRequest) -> usize {
    content_lines(pr).len()
}

pub fn render(frame: &mut Frame, state: &AppState, area: Rect, page: usize) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Pull Request ");

    let Some(pr) = &state.selected_pr else {
        let empty = Paragraph::new("No pull request selected")
            .block(block)
            .style(Style::default().fg(Color::Gray));
        frame.render_widget(empty, area);
        return;
    };

    let lines = content_lines(pr);
    let shown = visible(&lines, state.detail_scroll, page).to_vec();
    frame.render_widget(Paragraph::new(Text::from(shown)).block(block), area);
}
