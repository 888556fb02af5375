use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::state::AppState;

use super::visible;

pub fn render(frame: &mut Frame, state: &AppState, area: Rect, page: usize) {
    let title = match &state.selected_build {
        Some(build) => format!(" Logs: {} {} ", build.definition.name, build.state_label()),
        None => " Logs ".to_string(),
    };
    let block = Block::default().borders(Borders::ALL).title(title);

    let Some(logs) = &state.logs else {
        let empty = Paragraph::new("No logs loaded")
            .block(block)
            .style(Style::default().fg(Color::Gray));
        frame.render_widget(empty, area);
        return;
    };

    let banner = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    let lines: Vec<Line> = visible(logs.lines(), state.log_scroll, page)
        .iter()
        .map(|line| {
            if line.starts_with("=== ") {
                Line::styled(line.as_str(), banner)
            } else {
                Line::raw(line.as_str())
            }
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
