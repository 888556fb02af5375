use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::diff::{DiffKind, DiffLine};
use crate::state::AppState;

use super::visible;

pub fn render(frame: &mut Frame, state: &AppState, area: Rect, page: usize) {
    let Some(diff) = &state.diff else {
        let empty = Paragraph::new("No diff loaded")
            .block(Block::default().borders(Borders::ALL).title(" Diff "))
            .style(Style::default().fg(Color::Gray));
        frame.render_widget(empty, area);
        return;
    };

    let title = format!(
        " {} (+{} -{}) ",
        diff.path,
        diff.added_count(),
        diff.removed_count()
    );
    let lines: Vec<Line> = visible(&diff.lines, state.diff_scroll, page)
        .iter()
        .map(diff_line)
        .collect();

    let body = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(body, area);
}

fn diff_line(line: &DiffLine) -> Line<'_> {
    let (marker_style, background) = match line.kind {
        DiffKind::Header => {
            return Line::from(Span::styled(
                line.raw.as_str(),
                Style::default().add_modifier(Modifier::BOLD),
            ))
        }
        DiffKind::Hunk => {
            return Line::from(Span::styled(
                line.raw.as_str(),
                Style::default().fg(Color::Cyan),
            ))
        }
        DiffKind::Added => (Style::default().fg(Color::Green), Some(Color::Rgb(0, 48, 0))),
        DiffKind::Removed => (Style::default().fg(Color::Red), Some(Color::Rgb(56, 0, 0))),
        DiffKind::Context => (Style::default(), None),
    };

    let marker = line.raw.get(..1).unwrap_or(" ");
    let mut spans = vec![Span::styled(marker, marker_style)];

    match &line.highlighted {
        Some(pieces) => spans.extend(pieces.iter().map(|(style, text)| {
            let style = match background {
                Some(bg) => style.bg(bg),
                None => *style,
            };
            Span::styled(text.as_str(), style)
        })),
        None => spans.push(Span::styled(line.content(), marker_style)),
    }

    Line::from(spans)
}
