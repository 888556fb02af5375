use chrono::{DateTime, Utc};
use std::fmt;

/// How a configured pipeline is identified: by definition name or numeric id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineRef {
    Name(String),
    Id(u32),
}

impl fmt::Display for PipelineRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineRef::Name(name) => write!(f, "{}", name),
            PipelineRef::Id(id) => write!(f, "ID:{}", id),
        }
    }
}

/// A configured (project, repository) or (project, pipeline) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Repository { project: String, repository: String },
    Pipeline { project: String, pipeline: PipelineRef },
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Repository {
                project,
                repository,
            } => write!(f, "pull requests for {}/{}", project, repository),
            Source::Pipeline { project, pipeline } => {
                write!(f, "builds for {}/{}", project, pipeline)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrStatus {
    Active,
    Completed,
    Abandoned,
}

impl fmt::Display for PrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrStatus::Active => write!(f, "Active"),
            PrStatus::Completed => write!(f, "Completed"),
            PrStatus::Abandoned => write!(f, "Abandoned"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub id: u32,
    pub title: String,
    pub description: Option<String>,
    pub status: PrStatus,
    pub is_draft: bool,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub source_ref: String,
    pub target_ref: String,
    pub project: String,
    pub repository: String,
}

impl PullRequest {
    pub fn source_branch(&self) -> &str {
        branch_name(&self.source_ref)
    }

    pub fn target_branch(&self) -> &str {
        branch_name(&self.target_ref)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildStatus::NotStarted => write!(f, "Not started"),
            BuildStatus::InProgress => write!(f, "In progress"),
            BuildStatus::Completed => write!(f, "Completed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildResult {
    Succeeded,
    Failed,
    Canceled,
    PartiallySucceeded,
    #[default]
    None,
}

impl fmt::Display for BuildResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildResult::Succeeded => write!(f, "Succeeded"),
            BuildResult::Failed => write!(f, "Failed"),
            BuildResult::Canceled => write!(f, "Canceled"),
            BuildResult::PartiallySucceeded => write!(f, "Partially succeeded"),
            BuildResult::None => write!(f, "-"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub id: u32,
    pub name: String,
}

/// One run of a pipeline definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Build {
    pub id: u32,
    pub number: String,
    pub status: BuildStatus,
    pub result: BuildResult,
    pub queued_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub source_branch: String,
    pub definition: Definition,
    pub requested_for: String,
    pub project: String,
}

impl Build {
    /// Status icon shown in the build list. The result wins once the build has one.
    pub fn icon(&self) -> &'static str {
        match (self.status, self.result) {
            (_, BuildResult::Succeeded) => "✓",
            (_, BuildResult::Failed) => "✗",
            (_, BuildResult::PartiallySucceeded) => "◐",
            (_, BuildResult::Canceled) => "○",
            (BuildStatus::InProgress, BuildResult::None) => "●",
            (BuildStatus::NotStarted, BuildResult::None) => "·",
            (BuildStatus::Completed, BuildResult::None) => "◯",
        }
    }

    pub fn state_label(&self) -> String {
        match self.result {
            BuildResult::None => self.status.to_string(),
            result => result.to_string(),
        }
    }

    pub fn branch(&self) -> &str {
        branch_name(&self.source_branch)
    }
}

/// A file touched by the latest iteration of a pull request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    pub path: String,
    pub change_type: String,
}

impl ChangedFile {
    pub fn marker(&self) -> char {
        let change = self.change_type.to_ascii_lowercase();
        if change.contains("add") {
            'A'
        } else if change.contains("delete") {
            'D'
        } else if change.contains("rename") {
            'R'
        } else if change.contains("edit") {
            'M'
        } else {
            '?'
        }
    }
}

/// Pre- and post-change bodies of one file. `None` means the file does not
/// exist on that side of the pull request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffInputs {
    pub target: Option<String>,
    pub source: Option<String>,
}

/// Reference to one log of a build, fetchable by id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRef {
    pub id: u32,
    pub name: String,
    pub line_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSegment {
    pub id: u32,
    pub name: String,
    pub content: String,
}

/// All fetched log segments of one build, flattened into display lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLogBundle {
    pub build_id: u32,
    pub segments: Vec<LogSegment>,
    lines: Vec<String>,
}

impl BuildLogBundle {
    pub fn new(build_id: u32, segments: Vec<LogSegment>) -> Self {
        let mut lines = Vec::new();
        for segment in &segments {
            lines.push(format!("=== {} ===", segment.name));
            // Logs use tabs and the odd carriage return; both break cell layout.
            lines.extend(
                segment
                    .content
                    .lines()
                    .map(|l| l.trim_end_matches('\r').replace('\t', "    ")),
            );
            lines.push(String::new());
        }
        if lines.is_empty() {
            lines.push("No logs available for this build".to_string());
        }
        Self {
            build_id,
            segments,
            lines,
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

fn branch_name(reference: &str) -> &str {
    reference.strip_prefix("refs/heads/").unwrap_or(reference)
}
