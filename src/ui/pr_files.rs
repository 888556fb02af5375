use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::state::AppState;

use super::selected_style;

pub fn render(frame: &mut Frame, state: &AppState, area: Rect, page: usize) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Changed files ({}) ", state.files.len()));

    if state.files.is_empty() {
        let empty = Paragraph::new("No files changed in the latest iteration")
            .block(block)
            .style(Style::default().fg(Color::Gray));
        frame.render_widget(empty, area);
        return;
    }

    let rows: Vec<Line> = state
        .file_cursor
        .window(state.files.len(), page)
        .map(|i| {
            let file = &state.files[i];
            let color = match file.marker() {
                'A' => Color::Green,
                'D' => Color::Red,
                'R' => Color::Magenta,
                'M' => Color::Yellow,
                _ => Color::Gray,
            };
            let line = Line::from(vec![
                Span::styled(file.marker().to_string(), Style::default().fg(color)),
                Span::raw(" "),
                Span::raw(file.path.as_str()),
            ]);
            if state.file_cursor.selected == Some(i) {
                line.style(selected_style())
            } else {
                line
            }
        })
        .collect();

    frame.render_widget(Paragraph::new(rows).block(block), area);
}
