use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::action::{Action, Command};
use crate::config::Config;
use crate::diff::DiffDocument;
use crate::error::{DashError, Result, SourceFailure};
use crate::external;
use crate::forge::Forge;
use crate::highlight::Highlighter;
use crate::types::{Build, BuildLogBundle, ChangedFile, LogSegment, PullRequest, Source};

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
pub const BUILDS_PER_PIPELINE: u32 = 10;
const LOG_CONCURRENCY: usize = 4;

/// Result of one full refresh. A class is `None` when every configured source
/// of that class failed, which tells the App to keep the list it has.
#[derive(Debug, Default)]
pub struct RefreshOutcome {
    pub pull_requests: Option<Vec<PullRequest>>,
    pub builds: Option<Vec<Build>>,
    pub failures: Vec<SourceFailure>,
}

impl RefreshOutcome {
    pub fn into_parts(self) -> (Option<Vec<PullRequest>>, Option<Vec<Build>>, Option<DashError>) {
        let error = (!self.failures.is_empty()).then(|| DashError::PartialBatch(self.failures));
        (self.pull_requests, self.builds, error)
    }
}

pub async fn with_timeout<T>(limit: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .unwrap_or_else(|_| Err(DashError::Timeout(limit)))
}

enum Fetched {
    PullRequests(Vec<PullRequest>),
    Builds(Vec<Build>),
}

async fn fetch_source(forge: &dyn Forge, source: &Source, limit: Duration) -> Result<Fetched> {
    match source {
        Source::Repository {
            project,
            repository,
        } => with_timeout(limit, forge.list_pull_requests(project, repository))
            .await
            .map(Fetched::PullRequests),
        Source::Pipeline { project, pipeline } => with_timeout(
            limit,
            forge.list_builds(project, pipeline, BUILDS_PER_PIPELINE),
        )
        .await
        .map(Fetched::Builds),
    }
}

/// Fetch every configured source concurrently. A failing source never stops
/// its siblings; it ends up in `failures` instead.
pub async fn full_refresh(forge: &dyn Forge, sources: &[Source], limit: Duration) -> RefreshOutcome {
    let results = join_all(sources.iter().map(|s| fetch_source(forge, s, limit))).await;

    let has_repositories = sources
        .iter()
        .any(|s| matches!(s, Source::Repository { .. }));
    let has_pipelines = sources
        .iter()
        .any(|s| matches!(s, Source::Pipeline { .. }));

    let mut outcome = RefreshOutcome {
        pull_requests: (!has_repositories).then(Vec::new),
        builds: (!has_pipelines).then(Vec::new),
        failures: Vec::new(),
    };

    for (source, result) in sources.iter().zip(results) {
        match result {
            Ok(Fetched::PullRequests(prs)) => {
                outcome
                    .pull_requests
                    .get_or_insert_with(Vec::new)
                    .extend(prs);
            }
            Ok(Fetched::Builds(builds)) => {
                outcome.builds.get_or_insert_with(Vec::new).extend(builds);
            }
            Err(error) => {
                warn!(%source, "refresh failed: {}", error);
                outcome.failures.push(SourceFailure {
                    source: source.clone(),
                    error,
                });
            }
        }
    }

    outcome
}

pub async fn load_files(
    forge: &dyn Forge,
    pr: &PullRequest,
    limit: Duration,
) -> Result<Vec<ChangedFile>> {
    with_timeout(
        limit,
        forge.list_changed_files(&pr.project, &pr.repository, pr.id),
    )
    .await
}

/// Fetch both sides of a file, then diff and highlight on the blocking pool.
/// The whole load shares one `limit`; the blocking work is also handed the
/// deadline so it winds down instead of running on after the timeout.
pub async fn load_diff(
    forge: &dyn Forge,
    highlighter: Arc<Highlighter>,
    pr: &PullRequest,
    path: &str,
    limit: Duration,
) -> Result<DiffDocument> {
    let deadline = Instant::now() + limit;
    with_timeout(limit, build_diff(forge, highlighter, pr, path, deadline)).await
}

async fn build_diff(
    forge: &dyn Forge,
    highlighter: Arc<Highlighter>,
    pr: &PullRequest,
    path: &str,
    deadline: Instant,
) -> Result<DiffDocument> {
    let inputs = forge
        .fetch_diff_inputs(&pr.project, &pr.repository, pr.id, path)
        .await?;

    let pr_id = pr.id;
    let path = path.to_string();
    tokio::task::spawn_blocking(move || {
        let mut document = DiffDocument::from_inputs_until(pr_id, &path, inputs, Some(deadline))?;
        document.highlight_until(&highlighter, Some(deadline));
        Ok::<_, DashError>(document)
    })
    .await?
}

/// Fetch every log segment of a build. Segments that fail are skipped; the
/// load only fails when all of them do.
pub async fn load_logs(forge: &dyn Forge, build: &Build, limit: Duration) -> Result<BuildLogBundle> {
    with_timeout(limit, fetch_segments(forge, build)).await
}

async fn fetch_segments(forge: &dyn Forge, build: &Build) -> Result<BuildLogBundle> {
    let logs = forge.list_build_logs(&build.project, build.id).await?;

    let results: Vec<_> = stream::iter(logs)
        .map(|log| async move {
            let content = forge.get_build_log(&build.project, build.id, log.id).await;
            (log, content)
        })
        .buffered(LOG_CONCURRENCY)
        .collect()
        .await;

    let mut segments = Vec::new();
    let mut last_error = None;
    for (log, content) in results {
        match content {
            Ok(content) => segments.push(LogSegment {
                id: log.id,
                name: log.name,
                content,
            }),
            Err(err) => {
                warn!(build = build.id, log = log.id, "skipping log segment: {}", err);
                last_error = Some(err);
            }
        }
    }

    match last_error {
        Some(err) if segments.is_empty() => Err(err),
        _ => Ok(BuildLogBundle::new(build.id, segments)),
    }
}

/// Runs `Command`s in background tasks and reports each completion back on
/// the action channel.
pub struct DataLoader {
    forge: Arc<dyn Forge>,
    sources: Arc<Vec<Source>>,
    highlighter: Arc<Highlighter>,
    action_tx: mpsc::UnboundedSender<Action>,
    timeout: Duration,
}

impl DataLoader {
    pub fn new(
        forge: Arc<dyn Forge>,
        config: &Config,
        highlighter: Arc<Highlighter>,
        action_tx: mpsc::UnboundedSender<Action>,
    ) -> Self {
        let mut sources = config.repository_sources();
        sources.extend(config.pipeline_sources());

        Self {
            forge,
            sources: Arc::new(sources),
            highlighter,
            action_tx,
            timeout: FETCH_TIMEOUT,
        }
    }

    pub fn dispatch(&self, command: Command) {
        debug!(?command, "dispatch");
        match command {
            Command::Refresh { load_id } => self.spawn_refresh(load_id),
            Command::LoadFiles { load_id, pr } => self.spawn_load_files(load_id, pr),
            Command::LoadDiff { load_id, pr, path } => self.spawn_load_diff(load_id, pr, path),
            Command::LoadLogs { load_id, build } => self.spawn_load_logs(load_id, build),
            Command::OpenPullRequest(pr) => {
                external::open_in_browser(self.forge.pull_request_url(&pr));
            }
            Command::OpenBuild(build) => {
                external::open_in_browser(self.forge.build_url(&build));
            }
            Command::ClonePullRequest(pr) => {
                external::clone_and_checkout(
                    self.forge.clone_url(&pr),
                    pr.repository.clone(),
                    pr.source_branch().to_string(),
                );
            }
        }
    }

    fn spawn_refresh(&self, load_id: u64) {
        let tx = self.action_tx.clone();
        let forge = Arc::clone(&self.forge);
        let sources = Arc::clone(&self.sources);
        let limit = self.timeout;
        tokio::spawn(async move {
            let outcome = full_refresh(forge.as_ref(), &sources, limit).await;
            tx.send(Action::RefreshLoaded {
                load_id,
                outcome,
                completed_at: Instant::now(),
                stamp: Local::now(),
            })
            .ok();
        });
    }

    fn spawn_load_files(&self, load_id: u64, pr: PullRequest) {
        let tx = self.action_tx.clone();
        let forge = Arc::clone(&self.forge);
        let limit = self.timeout;
        tokio::spawn(async move {
            let result = load_files(forge.as_ref(), &pr, limit).await;
            tx.send(Action::FilesLoaded {
                load_id,
                pr_id: pr.id,
                result,
            })
            .ok();
        });
    }

    fn spawn_load_diff(&self, load_id: u64, pr: PullRequest, path: String) {
        let tx = self.action_tx.clone();
        let forge = Arc::clone(&self.forge);
        let highlighter = Arc::clone(&self.highlighter);
        let limit = self.timeout;
        tokio::spawn(async move {
            let result = load_diff(forge.as_ref(), highlighter, &pr, &path, limit).await;
            tx.send(Action::DiffLoaded {
                load_id,
                pr_id: pr.id,
                path,
                result,
            })
            .ok();
        });
    }

    fn spawn_load_logs(&self, load_id: u64, build: Build) {
        let tx = self.action_tx.clone();
        let forge = Arc::clone(&self.forge);
        let limit = self.timeout;
        tokio::spawn(async move {
            let result = load_logs(forge.as_ref(), &build, limit).await;
            tx.send(Action::LogsLoaded {
                load_id,
                build_id: build.id,
                result,
            })
            .ok();
        });
    }
}
