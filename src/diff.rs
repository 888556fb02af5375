use std::time::Instant;

use ratatui::style::Style;
use similar::{Algorithm, ChangeTag, DiffableStr, TextDiff};
use tracing::debug;

use crate::error::{DashError, Result};
use crate::highlight::{language_for, Highlighter};
use crate::types::DiffInputs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    Context,
    Added,
    Removed,
    Header,
    Hunk,
}

impl DiffKind {
    fn is_content(self) -> bool {
        matches!(self, DiffKind::Context | DiffKind::Added | DiffKind::Removed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiffLine {
    pub kind: DiffKind,
    /// The unified-diff line including its marker
    pub raw: String,
    pub highlighted: Option<Vec<(Style, String)>>,
}

impl DiffLine {
    fn new(kind: DiffKind, raw: String) -> Self {
        Self {
            kind,
            raw: raw.replace('\t', "    "),
            highlighted: None,
        }
    }

    /// Line text without the diff marker. Headers and hunks have no marker.
    pub fn content(&self) -> &str {
        if self.kind.is_content() {
            self.raw.get(1..).unwrap_or("")
        } else {
            &self.raw
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiffDocument {
    pub pr_id: u32,
    pub path: String,
    pub language: Option<&'static str>,
    pub lines: Vec<DiffLine>,
}

impl DiffDocument {
    pub fn from_inputs(pr_id: u32, path: &str, inputs: DiffInputs) -> Result<Self> {
        Self::from_inputs_until(pr_id, path, inputs, None)
    }

    /// Like `from_inputs`, but once `deadline` passes the line diff stops
    /// searching for a minimal edit script and reports the rest as replaced.
    pub fn from_inputs_until(
        pr_id: u32,
        path: &str,
        inputs: DiffInputs,
        deadline: Option<Instant>,
    ) -> Result<Self> {
        let display = path.trim_start_matches('/');
        let mut lines = vec![DiffLine::new(
            DiffKind::Header,
            format!("diff --git a/{} b/{}", display, display),
        )];

        match (inputs.target.as_deref(), inputs.source.as_deref()) {
            (None, None) => {
                return Err(DashError::NotFound(format!(
                    "{} does not exist on either side of pull request {}",
                    path, pr_id
                )))
            }
            (None, Some(source)) => {
                let body = split_lines(source);
                lines.push(header("new file mode 100644"));
                lines.push(header("--- /dev/null"));
                lines.push(header(&format!("+++ b/{}", display)));
                lines.push(DiffLine::new(
                    DiffKind::Hunk,
                    format!("@@ -0,0 {} @@", range('+', body.len())),
                ));
                lines.extend(
                    body.into_iter()
                        .map(|l| DiffLine::new(DiffKind::Added, format!("+{}", l))),
                );
            }
            (Some(target), None) => {
                let body = split_lines(target);
                lines.push(header("deleted file mode 100644"));
                lines.push(header(&format!("--- a/{}", display)));
                lines.push(header("+++ /dev/null"));
                lines.push(DiffLine::new(
                    DiffKind::Hunk,
                    format!("@@ {} +0,0 @@", range('-', body.len())),
                ));
                lines.extend(
                    body.into_iter()
                        .map(|l| DiffLine::new(DiffKind::Removed, format!("-{}", l))),
                );
            }
            (Some(target), Some(source)) => {
                lines.push(header(&format!("--- a/{}", display)));
                lines.push(header(&format!("+++ b/{}", display)));
                lines.push(DiffLine::new(
                    DiffKind::Hunk,
                    format!(
                        "@@ {} {} @@",
                        range('-', split_lines(target).len()),
                        range('+', split_lines(source).len())
                    ),
                ));
                lines.extend(line_diff(target, source, deadline));
            }
        }

        Ok(Self {
            pr_id,
            path: path.to_string(),
            language: language_for(path),
            lines,
        })
    }

    /// Tokenize every content line on its own. Lines the highlighter cannot
    /// handle keep their plain rendering.
    pub fn highlight(&mut self, highlighter: &Highlighter) {
        self.highlight_until(highlighter, None);
    }

    /// Like `highlight`, but lines reached after `deadline` stay plain.
    pub fn highlight_until(&mut self, highlighter: &Highlighter, deadline: Option<Instant>) {
        let Some(language) = self.language else {
            return;
        };
        if !highlighter.supports(language) {
            return;
        }

        for line in self.lines.iter_mut().filter(|l| l.kind.is_content()) {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                debug!(path = %self.path, "highlight deadline reached");
                break;
            }
            line.highlighted = highlighter.highlight(language, line.content());
        }
    }

    pub fn added_count(&self) -> usize {
        self.count(DiffKind::Added)
    }

    pub fn removed_count(&self) -> usize {
        self.count(DiffKind::Removed)
    }

    fn count(&self, kind: DiffKind) -> usize {
        self.lines.iter().filter(|l| l.kind == kind).count()
    }
}

fn header(text: &str) -> DiffLine {
    DiffLine::new(DiffKind::Header, text.to_string())
}

fn range(sign: char, count: usize) -> String {
    if count == 0 {
        format!("{}0,0", sign)
    } else {
        format!("{}1,{}", sign, count)
    }
}

/// Lines as the line diff tokenizes them (`\n`, `\r\n` or a bare `\r`),
/// without their endings.
fn split_lines(text: &str) -> Vec<&str> {
    text.tokenize_lines().into_iter().map(strip_ending).collect()
}

fn strip_ending(line: &str) -> &str {
    line.strip_suffix("\r\n")
        .or_else(|| line.strip_suffix('\n'))
        .or_else(|| line.strip_suffix('\r'))
        .unwrap_or(line)
}

fn line_diff(target: &str, source: &str, deadline: Option<Instant>) -> Vec<DiffLine> {
    let mut config = TextDiff::configure();
    config.algorithm(Algorithm::Myers);
    if let Some(deadline) = deadline {
        config.deadline(deadline);
    }
    let diff = config.diff_lines(target, source);
    let mut lines = Vec::new();

    for change in diff.iter_all_changes() {
        let (kind, marker) = match change.tag() {
            ChangeTag::Equal => (DiffKind::Context, ' '),
            ChangeTag::Delete => (DiffKind::Removed, '-'),
            ChangeTag::Insert => (DiffKind::Added, '+'),
        };
        lines.push(DiffLine::new(
            kind,
            format!("{}{}", marker, strip_ending(change.value())),
        ));
    }
    lines
}
