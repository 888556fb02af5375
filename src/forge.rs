use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Build, ChangedFile, DiffInputs, LogRef, PipelineRef, PullRequest};

/// The remote work-tracking service. The dashboard only ever talks to it
/// through this trait, so tests can substitute an in-memory implementation.
#[async_trait]
pub trait Forge: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    fn pull_request_url(&self, pr: &PullRequest) -> String;
    fn build_url(&self, build: &Build) -> String;
    fn clone_url(&self, pr: &PullRequest) -> String;

    async fn list_pull_requests(&self, project: &str, repository: &str)
        -> Result<Vec<PullRequest>>;

    async fn list_builds(
        &self,
        project: &str,
        pipeline: &PipelineRef,
        top: u32,
    ) -> Result<Vec<Build>>;

    /// Files changed by the latest iteration of the pull request
    async fn list_changed_files(
        &self,
        project: &str,
        repository: &str,
        pr_id: u32,
    ) -> Result<Vec<ChangedFile>>;

    async fn fetch_diff_inputs(
        &self,
        project: &str,
        repository: &str,
        pr_id: u32,
        path: &str,
    ) -> Result<DiffInputs>;

    async fn list_build_logs(&self, project: &str, build_id: u32) -> Result<Vec<LogRef>>;

    async fn get_build_log(&self, project: &str, build_id: u32, log_id: u32) -> Result<String>;
}
