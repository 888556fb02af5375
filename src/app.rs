use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, info};

use crate::action::{Action, Command};
use crate::config::Config;
use crate::event::Event;
use crate::scheduler::RefreshScheduler;
use crate::state::{max_scroll, AppState, Tab, View};
use crate::types::{Build, PullRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Motion {
    Up,
    Down,
    PageUp,
    PageDown,
    Top,
    Bottom,
}

/// The latest forward fetch of each class, with the key it was issued for.
/// A completion that does not match is stale.
#[derive(Debug, Default)]
struct Pending {
    refresh: Option<u64>,
    files: Option<(u64, PullRequest)>,
    diff: Option<(u64, u32, String)>,
    logs: Option<(u64, Build)>,
}

pub struct App {
    pub state: AppState,
    pub should_quit: bool,
    scheduler: RefreshScheduler,
    pending: Pending,
    next_load_id: u64,
}

impl App {
    pub fn new(config: &Config) -> Self {
        let scheduler = RefreshScheduler::new(config.refresh_interval());
        Self {
            state: AppState::new(config.organization.clone(), scheduler.interval()),
            should_quit: false,
            scheduler,
            pending: Pending::default(),
            next_load_id: 0,
        }
    }

    /// The refresh that fills the dashboard on startup.
    pub fn init(&mut self) -> Command {
        let load_id = self.next_id();
        self.pending.refresh = Some(load_id);
        self.state.loading.refresh = true;
        Command::Refresh { load_id }
    }

    fn next_id(&mut self) -> u64 {
        self.next_load_id += 1;
        self.next_load_id
    }

    pub fn handle_event(&self, event: Event) -> Action {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Resize(width, height) => Action::Resize(width, height),
            Event::Tick(now) => Action::Tick(now),
        }
    }

    fn handle_key(&self, key: KeyEvent) -> Action {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') => Action::Quit,
                KeyCode::Char('d') => Action::PageDown,
                KeyCode::Char('u') => Action::PageUp,
                _ => Action::None,
            };
        }

        match key.code {
            KeyCode::Char('q') => Action::Quit,
            KeyCode::Esc | KeyCode::Backspace | KeyCode::Left | KeyCode::Char('h') => Action::Back,
            KeyCode::Char('j') | KeyCode::Down => Action::Down,
            KeyCode::Char('k') | KeyCode::Up => Action::Up,
            KeyCode::PageDown => Action::PageDown,
            KeyCode::PageUp => Action::PageUp,
            KeyCode::Home => Action::Top,
            KeyCode::End | KeyCode::Char('G') => Action::Bottom,
            KeyCode::Enter => Action::Select,
            KeyCode::Tab | KeyCode::BackTab => Action::SwitchTab,
            KeyCode::Char('r') => Action::Refresh,
            KeyCode::Char('a') => Action::ToggleAutoRefresh,
            KeyCode::Char('+') | KeyCode::Char('=') => Action::IncreaseInterval,
            KeyCode::Char('-') => Action::DecreaseInterval,
            KeyCode::Char('g') | KeyCode::Char('o') => Action::OpenInBrowser,
            KeyCode::Char('c') => Action::ClonePullRequest,
            _ => Action::None,
        }
    }

    pub fn update(&mut self, action: Action) -> Vec<Command> {
        match action {
            Action::Quit => {
                self.should_quit = true;
            }
            Action::Back => self.back(),
            Action::Up => self.navigate(Motion::Up),
            Action::Down => self.navigate(Motion::Down),
            Action::PageUp => self.navigate(Motion::PageUp),
            Action::PageDown => self.navigate(Motion::PageDown),
            Action::Top => self.navigate(Motion::Top),
            Action::Bottom => self.navigate(Motion::Bottom),
            Action::Select => return self.select().into_iter().collect(),
            Action::SwitchTab => {
                if self.state.view == View::Dashboard {
                    self.state.tab = self.state.tab.toggle();
                }
            }

            Action::Refresh => return self.request_refresh().into_iter().collect(),
            Action::ToggleAutoRefresh => {
                self.state.auto_refresh = self.scheduler.toggle();
                info!(enabled = self.state.auto_refresh, "auto refresh toggled");
            }
            Action::IncreaseInterval => {
                self.state.refresh_interval = self.scheduler.increase();
            }
            Action::DecreaseInterval => {
                self.state.refresh_interval = self.scheduler.decrease();
            }

            Action::OpenInBrowser => match self.state.view {
                View::PrDetail => {
                    if let Some(pr) = &self.state.selected_pr {
                        return vec![Command::OpenPullRequest(pr.clone())];
                    }
                }
                View::BuildLogs => {
                    if let Some(build) = &self.state.selected_build {
                        return vec![Command::OpenBuild(build.clone())];
                    }
                }
                _ => {}
            },
            Action::ClonePullRequest => {
                if self.state.view == View::PrDetail {
                    if let Some(pr) = &self.state.selected_pr {
                        return vec![Command::ClonePullRequest(pr.clone())];
                    }
                }
            }

            Action::Resize(width, height) => {
                self.state.size = (width, height);
                self.state.clamp_all();
            }
            Action::Tick(now) => {
                if !self.state.loading.refresh && self.scheduler.is_due(now) {
                    return self.request_refresh().into_iter().collect();
                }
            }

            Action::RefreshLoaded {
                load_id,
                outcome,
                completed_at,
                stamp,
            } => {
                if self.pending.refresh != Some(load_id) {
                    debug!(load_id, "dropping stale refresh");
                    return Vec::new();
                }
                self.pending.refresh = None;
                self.state.loading.refresh = false;
                self.scheduler.mark_refreshed(completed_at);

                let (pull_requests, builds, error) = outcome.into_parts();
                if let Some(pull_requests) = pull_requests {
                    self.state.pull_requests = pull_requests;
                }
                if let Some(builds) = builds {
                    self.state.builds = builds;
                }
                self.state.clamp_all();

                match error {
                    Some(err) => self.state.last_error = Some(err.to_string()),
                    None => {
                        self.state.last_error = None;
                        self.state.last_updated = Some(stamp);
                    }
                }
            }

            Action::FilesLoaded {
                load_id,
                pr_id,
                result,
            } => {
                let current = matches!(&self.pending.files, Some((id, pr)) if *id == load_id && pr.id == pr_id);
                if !current {
                    debug!(load_id, pr_id, "dropping stale file list");
                    return Vec::new();
                }
                self.pending.files = None;
                self.state.loading.files = false;
                if self.state.view != View::PrDetail {
                    debug!(load_id, pr_id, "file list arrived after leaving the pull request");
                    return Vec::new();
                }

                match result {
                    Ok(files) => {
                        let page = self.state.page(View::PrFiles);
                        self.state.files = files;
                        self.state.file_cursor.reset(self.state.files.len(), page);
                        self.state.view = View::PrFiles;
                        self.state.last_error = None;
                    }
                    Err(err) => self.state.last_error = Some(err.to_string()),
                }
            }

            Action::DiffLoaded {
                load_id,
                pr_id,
                path,
                result,
            } => {
                let current = matches!(&self.pending.diff, Some((id, pending_pr, pending_path))
                    if *id == load_id && *pending_pr == pr_id && *pending_path == path);
                if !current {
                    debug!(load_id, pr_id, %path, "dropping stale diff");
                    return Vec::new();
                }
                self.pending.diff = None;
                self.state.loading.diff = false;
                if self.state.view != View::PrFiles {
                    debug!(load_id, pr_id, %path, "diff arrived after leaving the file list");
                    return Vec::new();
                }

                match result {
                    Ok(document) => {
                        self.state.diff = Some(document);
                        self.state.diff_scroll = 0;
                        self.state.view = View::FileDiff;
                        self.state.last_error = None;
                    }
                    Err(err) => self.state.last_error = Some(err.to_string()),
                }
            }

            Action::LogsLoaded {
                load_id,
                build_id,
                result,
            } => {
                let build = match self.pending.logs.take() {
                    Some((id, build)) if id == load_id && build.id == build_id => build,
                    other => {
                        self.pending.logs = other;
                        debug!(load_id, build_id, "dropping stale build logs");
                        return Vec::new();
                    }
                };
                self.state.loading.logs = false;
                if self.state.view != View::Dashboard {
                    debug!(load_id, build_id, "logs arrived after leaving the dashboard");
                    return Vec::new();
                }

                match result {
                    Ok(bundle) => {
                        self.state.selected_build = Some(build);
                        self.state.logs = Some(bundle);
                        self.state.log_scroll = 0;
                        self.state.view = View::BuildLogs;
                        self.state.last_error = None;
                    }
                    Err(err) => self.state.last_error = Some(err.to_string()),
                }
            }

            Action::None => {}
        }
        Vec::new()
    }

    /// Start a full refresh unless one is already in flight.
    fn request_refresh(&mut self) -> Option<Command> {
        if self.state.loading.refresh {
            debug!("refresh already in flight");
            return None;
        }
        let load_id = self.next_id();
        self.pending.refresh = Some(load_id);
        self.state.loading.refresh = true;
        Some(Command::Refresh { load_id })
    }

    fn select(&mut self) -> Option<Command> {
        match self.state.view {
            View::Dashboard => match self.state.tab {
                Tab::PullRequests => {
                    let pr = self.state.selected_pull_request()?.clone();
                    self.cancel_logs();
                    self.state.selected_pr = Some(pr);
                    self.state.detail_scroll = 0;
                    self.state.view = View::PrDetail;
                    self.state.last_error = None;
                    None
                }
                Tab::Builds => {
                    let build = self.state.selected_dashboard_build()?.clone();
                    let load_id = self.next_id();
                    self.pending.logs = Some((load_id, build.clone()));
                    self.state.loading.logs = true;
                    self.state.last_error = None;
                    Some(Command::LoadLogs { load_id, build })
                }
            },
            View::PrDetail => {
                let pr = self.state.selected_pr.clone()?;
                let load_id = self.next_id();
                self.pending.files = Some((load_id, pr.clone()));
                self.state.loading.files = true;
                self.state.last_error = None;
                Some(Command::LoadFiles { load_id, pr })
            }
            View::PrFiles => {
                let path = self.state.selected_file()?.path.clone();
                let pr = self.state.selected_pr.clone()?;
                let load_id = self.next_id();
                self.pending.diff = Some((load_id, pr.id, path.clone()));
                self.state.loading.diff = true;
                self.state.last_error = None;
                Some(Command::LoadDiff { load_id, pr, path })
            }
            View::FileDiff | View::BuildLogs => None,
        }
    }

    fn back(&mut self) {
        let state = &mut self.state;
        match state.view {
            View::Dashboard => return,
            View::PrDetail => {
                self.pending.files = None;
                state.loading.files = false;
                state.selected_pr = None;
                state.view = View::Dashboard;
            }
            View::PrFiles => {
                self.pending.diff = None;
                state.loading.diff = false;
                state.files.clear();
                state.file_cursor = Default::default();
                state.view = View::PrDetail;
            }
            View::FileDiff => {
                state.diff = None;
                state.diff_scroll = 0;
                state.view = View::PrFiles;
            }
            View::BuildLogs => {
                state.logs = None;
                state.selected_build = None;
                state.log_scroll = 0;
                state.view = View::Dashboard;
            }
        }
        state.last_error = None;
    }

    fn cancel_logs(&mut self) {
        self.pending.logs = None;
        self.state.loading.logs = false;
    }

    fn navigate(&mut self, motion: Motion) {
        let state = &mut self.state;
        let page = state.page(state.view);
        let step = |current: usize, max: usize| -> usize {
            let target = match motion {
                Motion::Up => current.saturating_sub(1),
                Motion::Down => current.saturating_add(1),
                Motion::PageUp => current.saturating_sub(page),
                Motion::PageDown => current.saturating_add(page),
                Motion::Top => 0,
                Motion::Bottom => max,
            };
            target.min(max)
        };

        match state.view {
            View::Dashboard => {
                let (cursor, len) = match state.tab {
                    Tab::PullRequests => (&mut state.pr_cursor, state.pull_requests.len()),
                    Tab::Builds => (&mut state.build_cursor, state.builds.len()),
                };
                move_cursor(cursor, motion, len, page);
            }
            View::PrFiles => {
                move_cursor(&mut state.file_cursor, motion, state.files.len(), page);
            }
            View::PrDetail => {
                let max = max_scroll(state.detail_height(), page);
                state.detail_scroll = step(state.detail_scroll, max);
            }
            View::FileDiff => {
                let max = max_scroll(state.diff_height(), page);
                state.diff_scroll = step(state.diff_scroll, max);
            }
            View::BuildLogs => {
                let max = max_scroll(state.log_height(), page);
                state.log_scroll = step(state.log_scroll, max);
            }
        }
    }
}

fn move_cursor(cursor: &mut crate::state::ListCursor, motion: Motion, len: usize, page: usize) {
    let page_delta = isize::try_from(page).unwrap_or(isize::MAX);
    match motion {
        Motion::Up => cursor.move_by(-1, len, page),
        Motion::Down => cursor.move_by(1, len, page),
        Motion::PageUp => cursor.move_by(-page_delta, len, page),
        Motion::PageDown => cursor.move_by(page_delta, len, page),
        Motion::Top => cursor.first(len, page),
        Motion::Bottom => cursor.last(len, page),
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use chrono::Local;

    use super::*;
    use crate::diff::DiffDocument;
    use crate::error::{DashError, SourceFailure};
    use crate::loader::RefreshOutcome;
    use crate::testing::{build, changed_file, pull_request};
    use crate::types::{BuildLogBundle, DiffInputs, LogSegment, PipelineRef, Source};

    fn config() -> Config {
        serde_json::from_str(
            r#"{
                "organization": "contoso",
                "pullRequests": [
                    { "project": "ProjectA", "repository": "RepoA" },
                    { "project": "ProjectB", "repository": "RepoB" }
                ],
                "pipelines": [{ "project": "ProjectA", "pipeline": "CI" }]
            }"#,
        )
        .unwrap()
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn refresh_id(commands: &[Command]) -> u64 {
        match commands {
            [Command::Refresh { load_id }] => *load_id,
            other => panic!("expected one refresh, got {:?}", other),
        }
    }

    fn loaded(load_id: u64, prs: Vec<PullRequest>, builds: Vec<Build>) -> Action {
        Action::RefreshLoaded {
            load_id,
            outcome: RefreshOutcome {
                pull_requests: Some(prs),
                builds: Some(builds),
                failures: Vec::new(),
            },
            completed_at: Instant::now(),
            stamp: Local::now(),
        }
    }

    /// App after the initial refresh completed with the given lists.
    fn started(prs: Vec<PullRequest>, builds: Vec<Build>) -> App {
        let mut app = App::new(&config());
        let Command::Refresh { load_id } = app.init() else {
            panic!("init must refresh");
        };
        app.update(loaded(load_id, prs, builds));
        app
    }

    fn diff_for(pr_id: u32, path: &str) -> DiffDocument {
        DiffDocument::from_inputs(
            pr_id,
            path,
            DiffInputs {
                target: Some("a\n".into()),
                source: Some("a\nb\n".into()),
            },
        )
        .unwrap()
    }

    #[test]
    fn key_bindings() {
        let app = App::new(&config());
        assert!(matches!(app.handle_event(key(KeyCode::Char('q'))), Action::Quit));
        assert!(matches!(
            app.handle_event(Event::Key(KeyEvent::new(
                KeyCode::Char('c'),
                KeyModifiers::CONTROL
            ))),
            Action::Quit
        ));
        assert!(matches!(app.handle_event(key(KeyCode::Esc)), Action::Back));
        assert!(matches!(app.handle_event(key(KeyCode::Char('h'))), Action::Back));
        assert!(matches!(app.handle_event(key(KeyCode::Enter)), Action::Select));
        assert!(matches!(app.handle_event(key(KeyCode::Tab)), Action::SwitchTab));
        assert!(matches!(app.handle_event(key(KeyCode::Char('r'))), Action::Refresh));
        assert!(matches!(app.handle_event(key(KeyCode::Char('c'))), Action::ClonePullRequest));
        assert!(matches!(app.handle_event(key(KeyCode::Char('g'))), Action::OpenInBrowser));
        assert!(matches!(app.handle_event(Event::Resize(100, 40)), Action::Resize(100, 40)));
    }

    #[test]
    fn initial_state_and_command() {
        let mut app = App::new(&config());
        assert_eq!(app.state.view, View::Dashboard);
        assert_eq!(app.state.tab, Tab::PullRequests);
        assert!(app.state.loading.refresh);
        assert!(matches!(app.init(), Command::Refresh { .. }));
    }

    #[test]
    fn selection_is_clamped_after_list_replacement() {
        let prs: Vec<_> = (1..=5).map(|i| pull_request(i, "ProjectA", "RepoA")).collect();
        let mut app = started(prs, Vec::new());
        app.update(Action::Bottom);
        assert_eq!(app.state.pr_cursor.selected, Some(4));

        let id = refresh_id(&app.update(Action::Refresh));
        app.update(loaded(id, vec![pull_request(1, "ProjectA", "RepoA")], Vec::new()));
        assert_eq!(app.state.pr_cursor.selected, Some(0));

        let id = refresh_id(&app.update(Action::Refresh));
        app.update(loaded(id, Vec::new(), Vec::new()));
        assert_eq!(app.state.pr_cursor.selected, None);
        assert!(app.update(Action::Select).is_empty());
        assert_eq!(app.state.view, View::Dashboard);
    }

    #[test]
    fn back_navigation_chain() {
        let mut app = started(vec![pull_request(42, "ProjectA", "RepoA")], Vec::new());
        app.update(Action::Select);
        assert_eq!(app.state.view, View::PrDetail);

        let Command::LoadFiles { load_id, .. } = app.update(Action::Select).remove(0) else {
            panic!("expected LoadFiles");
        };
        app.update(Action::FilesLoaded {
            load_id,
            pr_id: 42,
            result: Ok(vec![changed_file("/a.rs")]),
        });
        assert_eq!(app.state.view, View::PrFiles);

        let Command::LoadDiff { load_id, .. } = app.update(Action::Select).remove(0) else {
            panic!("expected LoadDiff");
        };
        app.update(Action::DiffLoaded {
            load_id,
            pr_id: 42,
            path: "/a.rs".into(),
            result: Ok(diff_for(42, "/a.rs")),
        });
        assert_eq!(app.state.view, View::FileDiff);

        app.update(Action::Back);
        assert_eq!(app.state.view, View::PrFiles);
        app.update(Action::Back);
        assert_eq!(app.state.view, View::PrDetail);
        app.update(Action::Back);
        assert_eq!(app.state.view, View::Dashboard);
        app.update(Action::Back);
        assert_eq!(app.state.view, View::Dashboard);
        assert!(!app.should_quit);
    }

    #[test]
    fn build_logs_round_trip() {
        let mut app = started(Vec::new(), vec![build(900, "ProjectA", "CI")]);
        app.update(Action::SwitchTab);
        assert_eq!(app.state.tab, Tab::Builds);

        let Command::LoadLogs { load_id, build } = app.update(Action::Select).remove(0) else {
            panic!("expected LoadLogs");
        };
        assert_eq!(app.state.view, View::Dashboard);
        assert!(app.state.loading.logs);

        let bundle = BuildLogBundle::new(
            build.id,
            vec![LogSegment {
                id: 1,
                name: "Log 1".into(),
                content: "ok".into(),
            }],
        );
        app.update(Action::LogsLoaded {
            load_id,
            build_id: 900,
            result: Ok(bundle),
        });
        assert_eq!(app.state.view, View::BuildLogs);
        assert_eq!(app.state.selected_build.as_ref().map(|b| b.id), Some(900));
        assert!(matches!(
            app.update(Action::OpenInBrowser).as_slice(),
            [Command::OpenBuild(b)] if b.id == 900
        ));

        app.update(Action::Back);
        assert_eq!(app.state.view, View::Dashboard);
        assert_eq!(app.state.tab, Tab::Builds);
    }

    #[test]
    fn failed_precondition_fetch_does_not_transition() {
        let mut app = started(vec![pull_request(42, "ProjectA", "RepoA")], Vec::new());
        app.update(Action::Select);
        let Command::LoadFiles { load_id, .. } = app.update(Action::Select).remove(0) else {
            panic!("expected LoadFiles");
        };
        app.update(Action::FilesLoaded {
            load_id,
            pr_id: 42,
            result: Err(DashError::Timeout(Duration::from_secs(30))),
        });

        assert_eq!(app.state.view, View::PrDetail);
        assert!(!app.state.loading.files);
        assert_eq!(
            app.state.last_error.as_deref(),
            Some("Request timed out after 30s")
        );

        app.update(Action::Back);
        assert_eq!(app.state.last_error, None);
    }

    #[test]
    fn partial_refresh_keeps_failed_class_and_names_failures() {
        let mut app = started(
            vec![pull_request(1, "ProjectA", "RepoA")],
            vec![build(900, "ProjectA", "CI")],
        );
        let first_update = app.state.last_updated;
        assert!(first_update.is_some());

        let id = refresh_id(&app.update(Action::Refresh));
        app.update(Action::RefreshLoaded {
            load_id: id,
            outcome: RefreshOutcome {
                pull_requests: Some(vec![
                    pull_request(1, "ProjectA", "RepoA"),
                    pull_request(2, "ProjectA", "RepoA"),
                ]),
                builds: None,
                failures: vec![
                    SourceFailure {
                        source: Source::Repository {
                            project: "ProjectB".into(),
                            repository: "RepoB".into(),
                        },
                        error: DashError::Network("reset".into()),
                    },
                    SourceFailure {
                        source: Source::Pipeline {
                            project: "ProjectA".into(),
                            pipeline: PipelineRef::Name("CI".into()),
                        },
                        error: DashError::Auth("denied".into()),
                    },
                ],
            },
            completed_at: Instant::now(),
            stamp: Local::now(),
        });

        assert_eq!(app.state.pull_requests.len(), 2);
        assert_eq!(app.state.builds.len(), 1);
        let error = app.state.last_error.clone().unwrap();
        assert!(error.contains("pull requests for ProjectB/RepoB"));
        assert!(error.contains("builds for ProjectA/CI"));
        assert!(!error.contains("ProjectA/RepoA"));
        assert_eq!(app.state.last_updated, first_update);

        let id = refresh_id(&app.update(Action::Refresh));
        app.update(loaded(id, Vec::new(), Vec::new()));
        assert_eq!(app.state.last_error, None);
    }

    #[test]
    fn manual_refreshes_coalesce_while_in_flight() {
        let mut app = App::new(&config());
        app.init();
        assert!(app.update(Action::Refresh).is_empty());
        assert!(app.update(Action::Refresh).is_empty());

        let mut app = started(Vec::new(), Vec::new());
        let first = app.update(Action::Refresh);
        let second = app.update(Action::Refresh);
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }

    #[test]
    fn refresh_keeps_view_and_snapshot() {
        let mut app = started(vec![pull_request(42, "ProjectA", "RepoA")], Vec::new());
        app.update(Action::Select);
        let id = refresh_id(&app.update(Action::Refresh));
        app.update(loaded(id, Vec::new(), Vec::new()));

        assert_eq!(app.state.view, View::PrDetail);
        assert_eq!(app.state.selected_pr.as_ref().map(|p| p.id), Some(42));
    }

    #[test]
    fn scheduler_ticks_trigger_refresh() {
        let mut app = App::new(&config());
        let Command::Refresh { load_id } = app.init() else {
            panic!("init must refresh");
        };
        let start = Instant::now();
        assert!(app.update(Action::Tick(start)).is_empty());

        app.update(Action::RefreshLoaded {
            load_id,
            outcome: RefreshOutcome::default(),
            completed_at: start,
            stamp: Local::now(),
        });
        assert!(app
            .update(Action::Tick(start + Duration::from_secs(29)))
            .is_empty());
        assert_eq!(
            app.update(Action::Tick(start + Duration::from_secs(30))).len(),
            1
        );

        // Disabled auto refresh stays quiet.
        let mut app = started(Vec::new(), Vec::new());
        app.update(Action::ToggleAutoRefresh);
        assert!(!app.state.auto_refresh);
        assert!(app
            .update(Action::Tick(Instant::now() + Duration::from_secs(3600)))
            .is_empty());
    }

    #[test]
    fn interval_adjustment_is_reflected_in_state() {
        let mut app = App::new(&config());
        app.update(Action::IncreaseInterval);
        assert_eq!(app.state.refresh_interval, Duration::from_secs(40));
        app.update(Action::DecreaseInterval);
        app.update(Action::DecreaseInterval);
        assert_eq!(app.state.refresh_interval, Duration::from_secs(20));
    }

    #[test]
    fn project_a_scenario_reaches_the_right_diff_and_drops_stale_results() {
        let mut app = started(
            vec![
                pull_request(41, "ProjectB", "RepoB"),
                pull_request(42, "ProjectA", "RepoA"),
            ],
            Vec::new(),
        );

        app.update(Action::Down);
        app.update(Action::Select);
        assert_eq!(app.state.view, View::PrDetail);
        assert_eq!(app.state.selected_pr.as_ref().map(|p| p.id), Some(42));

        // Confirming twice supersedes the first request.
        let Command::LoadFiles { load_id: stale, .. } = app.update(Action::Select).remove(0) else {
            panic!("expected LoadFiles");
        };
        let Command::LoadFiles { load_id, pr } = app.update(Action::Select).remove(0) else {
            panic!("expected LoadFiles");
        };
        assert_eq!((pr.project.as_str(), pr.repository.as_str()), ("ProjectA", "RepoA"));

        app.update(Action::FilesLoaded {
            load_id: stale,
            pr_id: 42,
            result: Ok(vec![changed_file("/stale.rs")]),
        });
        assert_eq!(app.state.view, View::PrDetail);
        assert!(app.state.loading.files);

        app.update(Action::FilesLoaded {
            load_id,
            pr_id: 42,
            result: Ok(vec![changed_file("/src/a.rs"), changed_file("/src/b.rs")]),
        });
        assert_eq!(app.state.view, View::PrFiles);
        assert_eq!(app.state.files.len(), 2);

        app.update(Action::Down);
        let Command::LoadDiff { load_id, pr, path } = app.update(Action::Select).remove(0) else {
            panic!("expected LoadDiff");
        };
        assert_eq!((pr.id, path.as_str()), (42, "/src/b.rs"));

        app.update(Action::DiffLoaded {
            load_id,
            pr_id: 42,
            path: path.clone(),
            result: Ok(diff_for(42, &path)),
        });
        assert_eq!(app.state.view, View::FileDiff);
        let diff = app.state.diff.as_ref().unwrap();
        assert_eq!((diff.pr_id, diff.path.as_str()), (42, "/src/b.rs"));
    }

    #[test]
    fn earlier_file_diff_does_not_overwrite_later_selection() {
        let mut app = started(vec![pull_request(42, "ProjectA", "RepoA")], Vec::new());
        app.update(Action::Select);
        let Command::LoadFiles { load_id, .. } = app.update(Action::Select).remove(0) else {
            panic!("expected LoadFiles");
        };
        app.update(Action::FilesLoaded {
            load_id,
            pr_id: 42,
            result: Ok(vec![changed_file("/src/a.rs"), changed_file("/src/b.rs")]),
        });
        assert_eq!(app.state.view, View::PrFiles);

        let Command::LoadDiff {
            load_id: first,
            path: first_path,
            ..
        } = app.update(Action::Select).remove(0)
        else {
            panic!("expected LoadDiff");
        };
        assert_eq!(first_path, "/src/a.rs");

        app.update(Action::Down);
        let Command::LoadDiff {
            load_id: second,
            path: second_path,
            ..
        } = app.update(Action::Select).remove(0)
        else {
            panic!("expected LoadDiff");
        };
        assert_eq!(second_path, "/src/b.rs");

        app.update(Action::DiffLoaded {
            load_id: first,
            pr_id: 42,
            path: first_path.clone(),
            result: Ok(diff_for(42, &first_path)),
        });
        assert_eq!(app.state.view, View::PrFiles);
        assert!(app.state.diff.is_none());
        assert!(app.state.loading.diff);

        app.update(Action::DiffLoaded {
            load_id: second,
            pr_id: 42,
            path: second_path.clone(),
            result: Ok(diff_for(42, &second_path)),
        });
        assert_eq!(app.state.view, View::FileDiff);
        assert_eq!(app.state.diff.as_ref().map(|d| d.path.as_str()), Some("/src/b.rs"));
        assert!(!app.state.loading.diff);
    }

    #[test]
    fn completion_after_back_is_dropped() {
        let mut app = started(vec![pull_request(42, "ProjectA", "RepoA")], Vec::new());
        app.update(Action::Select);
        let Command::LoadFiles { load_id, .. } = app.update(Action::Select).remove(0) else {
            panic!("expected LoadFiles");
        };
        app.update(Action::FilesLoaded {
            load_id,
            pr_id: 42,
            result: Ok(vec![changed_file("/a.rs")]),
        });

        let Command::LoadDiff { load_id, .. } = app.update(Action::Select).remove(0) else {
            panic!("expected LoadDiff");
        };
        app.update(Action::Back);
        assert!(!app.state.loading.diff);

        app.update(Action::DiffLoaded {
            load_id,
            pr_id: 42,
            path: "/a.rs".into(),
            result: Ok(diff_for(42, "/a.rs")),
        });
        assert_eq!(app.state.view, View::PrDetail);
        assert!(app.state.diff.is_none());
    }

    #[test]
    fn logs_completing_after_leaving_dashboard_are_dropped() {
        let mut app = started(
            vec![pull_request(42, "ProjectA", "RepoA")],
            vec![build(900, "ProjectA", "CI")],
        );
        app.update(Action::SwitchTab);
        let Command::LoadLogs { load_id, .. } = app.update(Action::Select).remove(0) else {
            panic!("expected LoadLogs");
        };
        app.update(Action::SwitchTab);
        app.update(Action::Select);
        assert_eq!(app.state.view, View::PrDetail);
        assert!(!app.state.loading.logs);

        app.update(Action::LogsLoaded {
            load_id,
            build_id: 900,
            result: Ok(BuildLogBundle::new(900, Vec::new())),
        });
        assert_eq!(app.state.view, View::PrDetail);
        assert!(app.state.logs.is_none());
    }

    #[test]
    fn text_scroll_is_clamped_to_content() {
        let mut app = started(vec![pull_request(42, "ProjectA", "RepoA")], Vec::new());
        app.update(Action::Resize(80, 10));
        app.update(Action::Select);
        for _ in 0..100 {
            app.update(Action::Down);
        }
        let page = app.state.page(View::PrDetail);
        assert_eq!(
            app.state.detail_scroll,
            max_scroll(app.state.detail_height(), page)
        );
        app.update(Action::Top);
        assert_eq!(app.state.detail_scroll, 0);
        app.update(Action::Up);
        assert_eq!(app.state.detail_scroll, 0);
    }

    #[test]
    fn resize_reclamps_cursor_window() {
        let prs: Vec<_> = (1..=50).map(|i| pull_request(i, "ProjectA", "RepoA")).collect();
        let mut app = started(prs, Vec::new());
        app.update(Action::Bottom);
        app.update(Action::Resize(80, 12));

        let page = app.state.page(View::Dashboard);
        let window = app.state.pr_cursor.window(50, page);
        assert!(window.contains(&49));
        assert_eq!(window.len(), page);
    }

    #[test]
    fn side_effects_only_from_their_views() {
        let mut app = started(vec![pull_request(42, "ProjectA", "RepoA")], Vec::new());
        assert!(app.update(Action::OpenInBrowser).is_empty());
        assert!(app.update(Action::ClonePullRequest).is_empty());

        app.update(Action::Select);
        assert!(matches!(
            app.update(Action::ClonePullRequest).as_slice(),
            [Command::ClonePullRequest(pr)] if pr.id == 42
        ));
        assert!(matches!(
            app.update(Action::OpenInBrowser).as_slice(),
            [Command::OpenPullRequest(pr)] if pr.id == 42
        ));
    }
}
