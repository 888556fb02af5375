use std::time::Instant;

use chrono::{DateTime, Local};

use crate::diff::DiffDocument;
use crate::error::Result;
use crate::loader::RefreshOutcome;
use crate::types::{Build, BuildLogBundle, ChangedFile, PullRequest};

/// Messages applied to the `App`, one at a time. Input, ticks and load
/// completions all arrive as one of these.
#[derive(Debug)]
pub enum Action {
    Quit,
    Back,
    Up,
    Down,
    PageUp,
    PageDown,
    Top,
    Bottom,
    Select,
    SwitchTab,

    // Refresh control
    Refresh,
    ToggleAutoRefresh,
    IncreaseInterval,
    DecreaseInterval,

    // Side effects
    OpenInBrowser,
    ClonePullRequest,

    Resize(u16, u16),
    Tick(Instant),

    // Load completions
    RefreshLoaded {
        load_id: u64,
        outcome: RefreshOutcome,
        completed_at: Instant,
        stamp: DateTime<Local>,
    },
    FilesLoaded {
        load_id: u64,
        pr_id: u32,
        result: Result<Vec<ChangedFile>>,
    },
    DiffLoaded {
        load_id: u64,
        pr_id: u32,
        path: String,
        result: Result<DiffDocument>,
    },
    LogsLoaded {
        load_id: u64,
        build_id: u32,
        result: Result<BuildLogBundle>,
    },

    None,
}

/// Work the `App` asks the `DataLoader` to start.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Refresh { load_id: u64 },
    LoadFiles { load_id: u64, pr: PullRequest },
    LoadDiff { load_id: u64, pr: PullRequest, path: String },
    LoadLogs { load_id: u64, build: Build },
    OpenPullRequest(PullRequest),
    OpenBuild(Build),
    ClonePullRequest(PullRequest),
}
