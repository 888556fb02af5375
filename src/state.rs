use std::time::Duration;

use chrono::{DateTime, Local};

use crate::diff::DiffDocument;
use crate::types::{Build, BuildLogBundle, ChangedFile, PullRequest};
use crate::ui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    PrDetail,
    PrFiles,
    FileDiff,
    BuildLogs,
}

/// Section of the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    PullRequests,
    Builds,
}

impl Tab {
    pub fn toggle(self) -> Self {
        match self {
            Tab::PullRequests => Tab::Builds,
            Tab::Builds => Tab::PullRequests,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Tab::PullRequests => "Pull Requests",
            Tab::Builds => "Builds",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadingFlags {
    pub refresh: bool,
    pub files: bool,
    pub diff: bool,
    pub logs: bool,
}

/// Selection plus the first visible row of a list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListCursor {
    pub selected: Option<usize>,
    pub offset: usize,
}

impl ListCursor {
    /// Pull the selection back into `[0, len-1]` (unset for an empty list) and
    /// keep it inside a window of `page` rows.
    pub fn clamp(&mut self, len: usize, page: usize) {
        self.selected = match (len, self.selected) {
            (0, _) => None,
            (_, None) => Some(0),
            (len, Some(i)) => Some(i.min(len - 1)),
        };
        self.follow(len, page);
    }

    pub fn reset(&mut self, len: usize, page: usize) {
        *self = Self::default();
        self.clamp(len, page);
    }

    pub fn move_by(&mut self, delta: isize, len: usize, page: usize) {
        if let Some(selected) = self.selected {
            let target = selected.saturating_add_signed(delta);
            self.selected = Some(target);
        }
        self.clamp(len, page);
    }

    pub fn first(&mut self, len: usize, page: usize) {
        self.selected = Some(0);
        self.clamp(len, page);
    }

    pub fn last(&mut self, len: usize, page: usize) {
        self.selected = Some(usize::MAX);
        self.clamp(len, page);
    }

    fn follow(&mut self, len: usize, page: usize) {
        let page = page.max(1);
        self.offset = self.offset.min(len.saturating_sub(page));
        if let Some(selected) = self.selected {
            if selected < self.offset {
                self.offset = selected;
            } else if selected >= self.offset + page {
                self.offset = selected + 1 - page;
            }
        }
    }

    /// Index range of the rows currently in view.
    pub fn window(&self, len: usize, page: usize) -> std::ops::Range<usize> {
        let start = self.offset.min(len);
        start..(start + page).min(len)
    }
}

/// Largest scroll offset that still fills a `page`-row viewport.
pub fn max_scroll(content: usize, page: usize) -> usize {
    content.saturating_sub(page.max(1))
}

/// Everything the renderer draws. Only `App::update` writes to it.
#[derive(Debug)]
pub struct AppState {
    pub organization: String,
    pub view: View,
    pub tab: Tab,

    pub pull_requests: Vec<PullRequest>,
    pub builds: Vec<Build>,
    pub pr_cursor: ListCursor,
    pub build_cursor: ListCursor,

    // Drill-down snapshots and their data
    pub selected_pr: Option<PullRequest>,
    pub files: Vec<ChangedFile>,
    pub file_cursor: ListCursor,
    pub diff: Option<DiffDocument>,
    pub selected_build: Option<Build>,
    pub logs: Option<BuildLogBundle>,

    pub detail_scroll: usize,
    pub diff_scroll: usize,
    pub log_scroll: usize,

    pub loading: LoadingFlags,
    pub last_error: Option<String>,
    pub last_updated: Option<DateTime<Local>>,
    pub auto_refresh: bool,
    pub refresh_interval: Duration,
    /// Terminal size as (columns, rows)
    pub size: (u16, u16),
}

impl AppState {
    pub fn new(organization: String, refresh_interval: Duration) -> Self {
        Self {
            organization,
            view: View::Dashboard,
            tab: Tab::default(),
            pull_requests: Vec::new(),
            builds: Vec::new(),
            pr_cursor: ListCursor::default(),
            build_cursor: ListCursor::default(),
            selected_pr: None,
            files: Vec::new(),
            file_cursor: ListCursor::default(),
            diff: None,
            selected_build: None,
            logs: None,
            detail_scroll: 0,
            diff_scroll: 0,
            log_scroll: 0,
            loading: LoadingFlags {
                refresh: true,
                ..LoadingFlags::default()
            },
            last_error: None,
            last_updated: None,
            auto_refresh: true,
            refresh_interval,
            size: (80, 24),
        }
    }

    pub fn page(&self, view: View) -> usize {
        ui::viewport_rows(view, self.size.1)
    }

    pub fn selected_pull_request(&self) -> Option<&PullRequest> {
        self.pr_cursor
            .selected
            .and_then(|i| self.pull_requests.get(i))
    }

    pub fn selected_dashboard_build(&self) -> Option<&Build> {
        self.build_cursor.selected.and_then(|i| self.builds.get(i))
    }

    pub fn selected_file(&self) -> Option<&ChangedFile> {
        self.file_cursor.selected.and_then(|i| self.files.get(i))
    }

    pub fn detail_height(&self) -> usize {
        self.selected_pr
            .as_ref()
            .map_or(0, ui::pr_detail::content_height)
    }

    pub fn diff_height(&self) -> usize {
        self.diff.as_ref().map_or(0, |d| d.lines.len())
    }

    pub fn log_height(&self) -> usize {
        self.logs.as_ref().map_or(0, |l| l.lines().len())
    }

    /// Re-establish every cursor and scroll invariant, after a list
    /// replacement or a resize.
    pub fn clamp_all(&mut self) {
        let list_page = self.page(View::Dashboard);
        self.pr_cursor.clamp(self.pull_requests.len(), list_page);
        self.build_cursor.clamp(self.builds.len(), list_page);

        let files_page = self.page(View::PrFiles);
        self.file_cursor.clamp(self.files.len(), files_page);

        self.detail_scroll = self
            .detail_scroll
            .min(max_scroll(self.detail_height(), self.page(View::PrDetail)));
        self.diff_scroll = self
            .diff_scroll
            .min(max_scroll(self.diff_height(), self.page(View::FileDiff)));
        self.log_scroll = self
            .log_scroll
            .min(max_scroll(self.log_height(), self.page(View::BuildLogs)));
    }
}
