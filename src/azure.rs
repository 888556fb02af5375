use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::error::{DashError, Result};
use crate::forge::Forge;
use crate::types::{
    Build, BuildResult, BuildStatus, ChangedFile, Definition, DiffInputs, LogRef, PipelineRef,
    PrStatus, PullRequest,
};

const API_VERSION: &str = "7.1";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Azure DevOps REST client authenticated with a personal access token.
pub struct AzureDevOps {
    client: Client,
    base_url: String,
    organization: String,
    token: String,
}

impl std::fmt::Debug for AzureDevOps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureDevOps")
            .field("base_url", &self.base_url)
            .field("organization", &self.organization)
            .finish_non_exhaustive()
    }
}

impl From<reqwest::Error> for DashError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DashError::Timeout(REQUEST_TIMEOUT)
        } else if err.is_decode() {
            DashError::Api {
                status: err.status().map_or(200, |s| s.as_u16()),
                message: format!("unexpected response body: {}", err),
            }
        } else {
            DashError::Network(err.to_string())
        }
    }
}

impl AzureDevOps {
    pub fn new(base_url: &str, organization: &str, token: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("adboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DashError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            organization: organization.to_string(),
            token,
        })
    }

    fn project_url(&self, project: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            urlencoding::encode(&self.organization),
            urlencoding::encode(project)
        )
    }

    fn api_url(&self, project: &str, path: &str) -> String {
        let separator = if path.contains('?') { '&' } else { '?' };
        format!(
            "{}/_apis{}{}api-version={}",
            self.project_url(project),
            path,
            separator,
            API_VERSION
        )
    }

    fn repository_api(&self, project: &str, repository: &str, path: &str) -> String {
        self.api_url(
            project,
            &format!(
                "/git/repositories/{}{}",
                urlencoding::encode(repository),
                path
            ),
        )
    }

    async fn send(&self, url: &str, accept: &str) -> Result<reqwest::Response> {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .basic_auth("", Some(&self.token))
            .header(ACCEPT, accept)
            .send()
            .await?;

        let status = response.status();
        // Azure DevOps answers an unauthenticated request with a 203 sign-in page.
        if status.is_success() && status != StatusCode::NON_AUTHORITATIVE_INFORMATION {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED
            | StatusCode::FORBIDDEN
            | StatusCode::NON_AUTHORITATIVE_INFORMATION => DashError::Auth(format!(
                "Azure DevOps rejected the access token ({})",
                status
            )),
            StatusCode::NOT_FOUND => DashError::NotFound(summarize(&body, url)),
            _ => DashError::Api {
                status: status.as_u16(),
                message: summarize(&body, url),
            },
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.send(url, "application/json").await?;
        Ok(response.json().await?)
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.send(url, "text/plain").await?;
        Ok(response.text().await?)
    }

    async fn resolve_definition(
        &self,
        project: &str,
        pipeline: &PipelineRef,
    ) -> Result<AzDefinition> {
        match pipeline {
            PipelineRef::Id(id) => {
                let url = self.api_url(project, &format!("/build/definitions/{}", id));
                self.get_json(&url).await
            }
            PipelineRef::Name(name) => {
                let url = self.api_url(
                    project,
                    &format!("/build/definitions?name={}", urlencoding::encode(name)),
                );
                let response: AzList<AzDefinition> = self.get_json(&url).await?;
                response.value.into_iter().next().ok_or_else(|| {
                    DashError::NotFound(format!(
                        "pipeline '{}' not found in project '{}'",
                        name, project
                    ))
                })
            }
        }
    }

    /// Fetch a file body at a commit; a missing file is `None`, not an error.
    async fn get_item(
        &self,
        project: &str,
        repository: &str,
        path: &str,
        commit: Option<&str>,
    ) -> Result<Option<String>> {
        let Some(commit) = commit.filter(|c| !c.is_empty()) else {
            return Ok(None);
        };
        let url = self.repository_api(
            project,
            repository,
            &format!(
                "/items?path={}&versionDescriptor.versionType=commit&versionDescriptor.version={}",
                urlencoding::encode(path),
                urlencoding::encode(commit)
            ),
        );
        match self.get_text(&url).await {
            Ok(text) => Ok(Some(text)),
            Err(DashError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

fn summarize(body: &str, url: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return url.to_string();
    }
    // Error bodies are JSON with a "message" field; fall back to the raw text.
    if let Ok(err) = serde_json::from_str::<AzErrorBody>(trimmed) {
        return err.message;
    }
    trimmed.chars().take(200).collect()
}

// Azure DevOps API response types

#[derive(Deserialize)]
struct AzList<T> {
    value: Vec<T>,
}

#[derive(Deserialize)]
struct AzErrorBody {
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzIdentity {
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct AzProject {
    name: String,
}

#[derive(Deserialize)]
struct AzRepository {
    name: String,
    project: Option<AzProject>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzPullRequest {
    pull_request_id: u32,
    title: Option<String>,
    description: Option<String>,
    status: Option<String>,
    is_draft: Option<bool>,
    created_by: Option<AzIdentity>,
    creation_date: Option<String>,
    source_ref_name: Option<String>,
    target_ref_name: Option<String>,
    repository: Option<AzRepository>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzCommitRef {
    commit_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzPullRequestCommits {
    last_merge_source_commit: Option<AzCommitRef>,
    last_merge_target_commit: Option<AzCommitRef>,
}

#[derive(Deserialize, Clone)]
struct AzDefinition {
    id: u32,
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzBuild {
    id: u32,
    build_number: Option<String>,
    status: Option<String>,
    result: Option<String>,
    queue_time: Option<String>,
    start_time: Option<String>,
    finish_time: Option<String>,
    source_branch: Option<String>,
    definition: Option<AzDefinition>,
    requested_for: Option<AzIdentity>,
}

#[derive(Deserialize)]
struct AzIteration {
    id: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzChanges {
    #[serde(default, alias = "changes")]
    change_entries: Vec<AzChange>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzChange {
    change_type: Option<String>,
    item: Option<AzItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzItem {
    path: Option<String>,
    #[serde(default)]
    is_folder: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzLog {
    id: u32,
    line_count: Option<u64>,
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .ok()
}

fn pr_status(status: Option<&str>) -> PrStatus {
    match status {
        Some("completed") => PrStatus::Completed,
        Some("abandoned") => PrStatus::Abandoned,
        _ => PrStatus::Active,
    }
}

fn build_status(status: Option<&str>) -> BuildStatus {
    match status {
        Some("inProgress") | Some("cancelling") => BuildStatus::InProgress,
        Some("completed") => BuildStatus::Completed,
        _ => BuildStatus::NotStarted,
    }
}

fn build_result(result: Option<&str>) -> BuildResult {
    match result {
        Some("succeeded") => BuildResult::Succeeded,
        Some("failed") => BuildResult::Failed,
        Some("canceled") => BuildResult::Canceled,
        Some("partiallySucceeded") => BuildResult::PartiallySucceeded,
        _ => BuildResult::None,
    }
}

fn display_name(identity: Option<AzIdentity>) -> String {
    identity
        .and_then(|i| i.display_name)
        .unwrap_or_else(|| "unknown".to_string())
}

impl AzPullRequest {
    fn into_pull_request(self, project: &str, repository: &str) -> PullRequest {
        let (repo_name, project_name) = match self.repository {
            Some(repo) => (
                repo.name,
                repo.project
                    .map(|p| p.name)
                    .unwrap_or_else(|| project.to_string()),
            ),
            None => (repository.to_string(), project.to_string()),
        };

        PullRequest {
            id: self.pull_request_id,
            title: self.title.unwrap_or_default(),
            description: self.description.filter(|d| !d.trim().is_empty()),
            status: pr_status(self.status.as_deref()),
            is_draft: self.is_draft.unwrap_or(false),
            author: display_name(self.created_by),
            created_at: self
                .creation_date
                .as_deref()
                .and_then(parse_datetime)
                .unwrap_or_default(),
            source_ref: self.source_ref_name.unwrap_or_default(),
            target_ref: self.target_ref_name.unwrap_or_default(),
            project: project_name,
            repository: repo_name,
        }
    }
}

impl AzBuild {
    fn into_build(self, project: &str, definition: &AzDefinition) -> Build {
        // The builds listing does not always carry the full definition.
        let definition = match self.definition {
            Some(d) if d.id != 0 && !d.name.is_empty() => d,
            _ => definition.clone(),
        };

        Build {
            id: self.id,
            number: self.build_number.unwrap_or_else(|| self.id.to_string()),
            status: build_status(self.status.as_deref()),
            result: build_result(self.result.as_deref()),
            queued_at: self.queue_time.as_deref().and_then(parse_datetime),
            started_at: self.start_time.as_deref().and_then(parse_datetime),
            finished_at: self.finish_time.as_deref().and_then(parse_datetime),
            source_branch: self.source_branch.unwrap_or_default(),
            definition: Definition {
                id: definition.id,
                name: definition.name,
            },
            requested_for: display_name(self.requested_for),
            project: project.to_string(),
        }
    }
}

#[async_trait]
impl Forge for AzureDevOps {
    fn name(&self) -> &str {
        "Azure DevOps"
    }

    fn pull_request_url(&self, pr: &PullRequest) -> String {
        format!(
            "{}/_git/{}/pullrequest/{}",
            self.project_url(&pr.project),
            urlencoding::encode(&pr.repository),
            pr.id
        )
    }

    fn build_url(&self, build: &Build) -> String {
        format!(
            "{}/_build/results?buildId={}",
            self.project_url(&build.project),
            build.id
        )
    }

    fn clone_url(&self, pr: &PullRequest) -> String {
        format!(
            "{}/_git/{}",
            self.project_url(&pr.project),
            urlencoding::encode(&pr.repository)
        )
    }

    async fn list_pull_requests(
        &self,
        project: &str,
        repository: &str,
    ) -> Result<Vec<PullRequest>> {
        let url = self.repository_api(
            project,
            repository,
            "/pullrequests?searchCriteria.status=active",
        );
        let response: AzList<AzPullRequest> = self.get_json(&url).await?;

        Ok(response
            .value
            .into_iter()
            .map(|pr| pr.into_pull_request(project, repository))
            .collect())
    }

    async fn list_builds(
        &self,
        project: &str,
        pipeline: &PipelineRef,
        top: u32,
    ) -> Result<Vec<Build>> {
        let definition = self.resolve_definition(project, pipeline).await?;
        let url = self.api_url(
            project,
            &format!(
                "/build/builds?definitions={}&statusFilter=all&queryOrder=queueTimeDescending&$top={}",
                definition.id, top
            ),
        );
        let response: AzList<AzBuild> = self.get_json(&url).await?;

        Ok(response
            .value
            .into_iter()
            .map(|build| build.into_build(project, &definition))
            .collect())
    }

    async fn list_changed_files(
        &self,
        project: &str,
        repository: &str,
        pr_id: u32,
    ) -> Result<Vec<ChangedFile>> {
        let url = self.repository_api(
            project,
            repository,
            &format!("/pullRequests/{}/iterations", pr_id),
        );
        let iterations: AzList<AzIteration> = self.get_json(&url).await?;
        let Some(latest) = iterations.value.last() else {
            return Ok(Vec::new());
        };

        let url = self.repository_api(
            project,
            repository,
            &format!("/pullRequests/{}/iterations/{}/changes", pr_id, latest.id),
        );
        let changes: AzChanges = self.get_json(&url).await?;

        Ok(changes
            .change_entries
            .into_iter()
            .filter_map(|change| {
                let item = change.item?;
                if item.is_folder {
                    return None;
                }
                Some(ChangedFile {
                    path: item.path?,
                    change_type: change.change_type.unwrap_or_default(),
                })
            })
            .collect())
    }

    async fn fetch_diff_inputs(
        &self,
        project: &str,
        repository: &str,
        pr_id: u32,
        path: &str,
    ) -> Result<DiffInputs> {
        let url = self.repository_api(project, repository, &format!("/pullRequests/{}", pr_id));
        let commits: AzPullRequestCommits = self.get_json(&url).await?;

        let target_commit = commits.last_merge_target_commit.and_then(|c| c.commit_id);
        let source_commit = commits.last_merge_source_commit.and_then(|c| c.commit_id);

        let (target, source) = tokio::try_join!(
            self.get_item(project, repository, path, target_commit.as_deref()),
            self.get_item(project, repository, path, source_commit.as_deref()),
        )?;

        Ok(DiffInputs { target, source })
    }

    async fn list_build_logs(&self, project: &str, build_id: u32) -> Result<Vec<LogRef>> {
        let url = self.api_url(project, &format!("/build/builds/{}/logs", build_id));
        let response: AzList<AzLog> = self.get_json(&url).await?;

        Ok(response
            .value
            .into_iter()
            .map(|log| LogRef {
                id: log.id,
                name: format!("Log {}", log.id),
                line_count: log.line_count,
            })
            .collect())
    }

    async fn get_build_log(&self, project: &str, build_id: u32, log_id: u32) -> Result<String> {
        let url = self.api_url(
            project,
            &format!("/build/builds/{}/logs/{}", build_id, log_id),
        );
        self.get_text(&url).await
    }
}
