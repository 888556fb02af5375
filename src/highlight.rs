use std::path::Path;

use ratatui::style::{Color, Modifier, Style};
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use tracing::debug;

const THEME: &str = "base16-ocean.dark";

const LANGUAGES: &[(&str, &str)] = &[
    ("rs", "Rust"),
    ("go", "Go"),
    ("py", "Python"),
    ("js", "JavaScript"),
    ("jsx", "JavaScript"),
    ("mjs", "JavaScript"),
    ("ts", "TypeScript"),
    ("tsx", "TypeScript"),
    ("java", "Java"),
    ("kt", "Kotlin"),
    ("scala", "Scala"),
    ("cs", "C#"),
    ("fs", "F#"),
    ("c", "C"),
    ("h", "C"),
    ("cpp", "C++"),
    ("cc", "C++"),
    ("hpp", "C++"),
    ("rb", "Ruby"),
    ("php", "PHP"),
    ("swift", "Swift"),
    ("lua", "Lua"),
    ("pl", "Perl"),
    ("r", "R"),
    ("hs", "Haskell"),
    ("sh", "Bash"),
    ("bash", "Bash"),
    ("ps1", "PowerShell"),
    ("sql", "SQL"),
    ("json", "JSON"),
    ("yaml", "YAML"),
    ("yml", "YAML"),
    ("toml", "TOML"),
    ("xml", "XML"),
    ("csproj", "XML"),
    ("html", "HTML"),
    ("htm", "HTML"),
    ("css", "CSS"),
    ("scss", "SCSS"),
    ("md", "Markdown"),
    ("tf", "Terraform"),
    ("proto", "Protocol Buffers"),
];

/// Detect the language of a file from its extension, or its name for the few
/// build files that have none.
pub fn language_for(path: &str) -> Option<&'static str> {
    let path = Path::new(path);
    let file_name = path.file_name().and_then(|n| n.to_str())?;

    match file_name {
        "Makefile" | "makefile" | "GNUmakefile" => return Some("Makefile"),
        "Dockerfile" => return Some("Dockerfile"),
        "Jenkinsfile" => return Some("Groovy"),
        _ => {}
    }

    let ext = path.extension().and_then(|e| e.to_str())?.to_ascii_lowercase();
    LANGUAGES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, language)| *language)
}

/// Per-line syntax highlighter. Loading the syntax definitions is slow, so one
/// instance is built at startup and shared.
pub struct Highlighter {
    syntax_set: SyntaxSet,
    theme: Theme,
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl Highlighter {
    pub fn new() -> Self {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let mut themes = ThemeSet::load_defaults().themes;
        let theme = themes.remove(THEME).unwrap_or_default();
        Self { syntax_set, theme }
    }

    fn syntax(&self, language: &str) -> Option<&SyntaxReference> {
        self.syntax_set
            .find_syntax_by_name(language)
            .or_else(|| self.syntax_set.find_syntax_by_token(language))
    }

    pub fn supports(&self, language: &str) -> bool {
        self.syntax(language).is_some()
    }

    /// Tokenize a single line on its own. Returns `None` when the language has
    /// no syntax definition or tokenizing fails.
    pub fn highlight(&self, language: &str, text: &str) -> Option<Vec<(Style, String)>> {
        let syntax = self.syntax(language)?;
        let mut lines = HighlightLines::new(syntax, &self.theme);
        let input = format!("{}\n", text);

        let ranges = match lines.highlight_line(&input, &self.syntax_set) {
            Ok(ranges) => ranges,
            Err(err) => {
                debug!(language, "highlighting failed: {}", err);
                return None;
            }
        };

        Some(
            ranges
                .into_iter()
                .map(|(style, piece)| (convert_style(style), piece.trim_end_matches('\n')))
                .filter(|(_, piece)| !piece.is_empty())
                .map(|(style, piece)| (style, piece.to_string()))
                .collect(),
        )
    }
}

// Background is left to the diff line colouring.
fn convert_style(style: syntect::highlighting::Style) -> Style {
    let mut converted = Style::default().fg(Color::Rgb(
        style.foreground.r,
        style.foreground.g,
        style.foreground.b,
    ));

    if style.font_style.contains(FontStyle::BOLD) {
        converted = converted.add_modifier(Modifier::BOLD);
    }
    if style.font_style.contains(FontStyle::ITALIC) {
        converted = converted.add_modifier(Modifier::ITALIC);
    }
    if style.font_style.contains(FontStyle::UNDERLINE) {
        converted = converted.add_modifier(Modifier::UNDERLINED);
    }
    converted
}
