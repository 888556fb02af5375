//! Fixtures and an in-memory `Forge` shared by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::error::{DashError, Result};
use crate::forge::Forge;
use crate::types::{
    Build, BuildResult, BuildStatus, ChangedFile, Definition, DiffInputs, LogRef, PipelineRef,
    PrStatus, PullRequest,
};

pub fn pull_request(id: u32, project: &str, repository: &str) -> PullRequest {
    PullRequest {
        id,
        title: format!("Pull request {}", id),
        description: Some("Adds the thing.\nAlso fixes the other thing.".into()),
        status: PrStatus::Active,
        is_draft: false,
        author: "Dana".into(),
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
        source_ref: format!("refs/heads/feature/{}", id),
        target_ref: "refs/heads/main".into(),
        project: project.into(),
        repository: repository.into(),
    }
}

pub fn build(id: u32, project: &str, pipeline: &str) -> Build {
    Build {
        id,
        number: format!("20240301.{}", id),
        status: BuildStatus::Completed,
        result: BuildResult::Succeeded,
        queued_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()),
        started_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 1, 0).unwrap()),
        finished_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 6, 0).unwrap()),
        source_branch: "refs/heads/main".into(),
        definition: Definition {
            id: 5,
            name: pipeline.into(),
        },
        requested_for: "Dana".into(),
        project: project.into(),
    }
}

pub fn changed_file(path: &str) -> ChangedFile {
    ChangedFile {
        path: path.into(),
        change_type: "edit".into(),
    }
}

/// Canned responses keyed like the requests. Anything not registered answers
/// with `NotFound`; keys listed in `failing` answer with a network error.
#[derive(Debug, Default)]
pub struct FakeForge {
    pub pull_requests: HashMap<String, Vec<PullRequest>>,
    pub builds: HashMap<String, Vec<Build>>,
    pub files: HashMap<u32, Vec<ChangedFile>>,
    pub diffs: HashMap<(u32, String), DiffInputs>,
    pub logs: HashMap<u32, Vec<(LogRef, Option<String>)>>,
    pub failing: Vec<String>,
    pub delay: Option<Duration>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeForge {
    async fn enter(&self, key: String) -> Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.calls.lock().unwrap().push(key.clone());
        if self.failing.contains(&key) {
            return Err(DashError::Network(format!("connection reset ({})", key)));
        }
        Ok(())
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

fn missing(key: &str) -> DashError {
    DashError::NotFound(key.to_string())
}

#[async_trait]
impl Forge for FakeForge {
    fn name(&self) -> &str {
        "fake"
    }

    fn pull_request_url(&self, pr: &PullRequest) -> String {
        format!("https://example.test/{}/pr/{}", pr.repository, pr.id)
    }

    fn build_url(&self, build: &Build) -> String {
        format!("https://example.test/build/{}", build.id)
    }

    fn clone_url(&self, pr: &PullRequest) -> String {
        format!("https://example.test/{}", pr.repository)
    }

    async fn list_pull_requests(
        &self,
        project: &str,
        repository: &str,
    ) -> Result<Vec<PullRequest>> {
        let key = format!("{}/{}", project, repository);
        self.enter(key.clone()).await?;
        self.pull_requests
            .get(&key)
            .cloned()
            .ok_or_else(|| missing(&key))
    }

    async fn list_builds(
        &self,
        project: &str,
        pipeline: &PipelineRef,
        _top: u32,
    ) -> Result<Vec<Build>> {
        let key = format!("{}/{}", project, pipeline);
        self.enter(key.clone()).await?;
        self.builds.get(&key).cloned().ok_or_else(|| missing(&key))
    }

    async fn list_changed_files(
        &self,
        _project: &str,
        _repository: &str,
        pr_id: u32,
    ) -> Result<Vec<ChangedFile>> {
        let key = format!("files/{}", pr_id);
        self.enter(key.clone()).await?;
        self.files.get(&pr_id).cloned().ok_or_else(|| missing(&key))
    }

    async fn fetch_diff_inputs(
        &self,
        _project: &str,
        _repository: &str,
        pr_id: u32,
        path: &str,
    ) -> Result<DiffInputs> {
        let key = format!("diff/{}/{}", pr_id, path);
        self.enter(key.clone()).await?;
        self.diffs
            .get(&(pr_id, path.to_string()))
            .cloned()
            .ok_or_else(|| missing(&key))
    }

    async fn list_build_logs(&self, _project: &str, build_id: u32) -> Result<Vec<LogRef>> {
        let key = format!("logs/{}", build_id);
        self.enter(key.clone()).await?;
        self.logs
            .get(&build_id)
            .map(|logs| logs.iter().map(|(log, _)| log.clone()).collect())
            .ok_or_else(|| missing(&key))
    }

    async fn get_build_log(&self, _project: &str, build_id: u32, log_id: u32) -> Result<String> {
        let key = format!("logs/{}/{}", build_id, log_id);
        self.enter(key.clone()).await?;
        self.logs
            .get(&build_id)
            .and_then(|logs| logs.iter().find(|(log, _)| log.id == log_id))
            .and_then(|(_, content)| content.clone())
            .ok_or_else(|| DashError::Api {
                status: 500,
                message: key,
            })
    }
}
