use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::{DashError, Result};
use crate::types::{PipelineRef, Source};

pub const DEFAULT_CONFIG_FILE: &str = ".adboard.json";
pub const DEFAULT_BASE_URL: &str = "https://dev.azure.com";
pub const DEFAULT_TOKEN_ENV: &str = "AZURE_DEVOPS_PAT";
pub const DEFAULT_REFRESH_SECS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepositorySource {
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub repository: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSource {
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub pipeline: Option<String>,
    #[serde(default)]
    pub definition_id: Option<i64>,
}

impl PipelineSource {
    /// A positive definition id wins over the pipeline name.
    pub fn pipeline_ref(&self) -> Option<PipelineRef> {
        match (self.definition_id, self.pipeline.as_deref()) {
            (Some(id), _) if id > 0 => u32::try_from(id).ok().map(PipelineRef::Id),
            (_, Some(name)) if !name.trim().is_empty() => {
                Some(PipelineRef::Name(name.trim().to_string()))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub pull_requests: Vec<RepositorySource>,
    #[serde(default)]
    pub pipelines: Vec<PipelineSource>,
    #[serde(default)]
    pub refresh_interval: Option<i64>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub token_env: Option<String>,
}

impl Config {
    /// Read and parse a config file. `.toml` files are parsed as TOML, anything
    /// else as JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DashError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;

        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            toml::from_str(&content).map_err(|e| {
                DashError::Config(format!("failed to parse {}: {}", path.display(), e))
            })
        } else {
            serde_json::from_str(&content).map_err(|e| {
                DashError::Config(format!("failed to parse {}: {}", path.display(), e))
            })
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.organization.trim().is_empty() {
            return Err(DashError::Config("organization is required".into()));
        }

        if self.pull_requests.is_empty() && self.pipelines.is_empty() {
            return Err(DashError::Config(
                "at least one pull request or pipeline source must be configured".into(),
            ));
        }

        for (i, source) in self.pull_requests.iter().enumerate() {
            if source.project.trim().is_empty() {
                return Err(DashError::Config(format!(
                    "pull request source {}: project is required",
                    i
                )));
            }
            if source.repository.trim().is_empty() {
                return Err(DashError::Config(format!(
                    "pull request source {}: repository is required",
                    i
                )));
            }
        }

        for (i, source) in self.pipelines.iter().enumerate() {
            if source.project.trim().is_empty() {
                return Err(DashError::Config(format!(
                    "pipeline source {}: project is required",
                    i
                )));
            }
            if source.pipeline_ref().is_none() {
                return Err(DashError::Config(format!(
                    "pipeline source {}: either pipeline or definitionId is required",
                    i
                )));
            }
        }

        Ok(())
    }

    /// Refresh interval, falling back to the default when absent or non-positive.
    pub fn refresh_interval(&self) -> Duration {
        let secs = match self.refresh_interval {
            Some(secs) if secs > 0 => secs,
            _ => DEFAULT_REFRESH_SECS,
        };
        Duration::from_secs(secs.unsigned_abs())
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn token_env(&self) -> &str {
        self.token_env
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_TOKEN_ENV)
    }

    pub fn repository_sources(&self) -> Vec<Source> {
        self.pull_requests
            .iter()
            .map(|s| Source::Repository {
                project: s.project.clone(),
                repository: s.repository.clone(),
            })
            .collect()
    }

    /// Pipeline sources that survived validation.
    pub fn pipeline_sources(&self) -> Vec<Source> {
        self.pipelines
            .iter()
            .filter_map(|s| {
                Some(Source::Pipeline {
                    project: s.project.clone(),
                    pipeline: s.pipeline_ref()?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "organization": "contoso",
        "pullRequests": [
            { "project": "ProjectA", "repository": "RepoA" }
        ],
        "pipelines": [
            { "project": "ProjectA", "pipeline": "CI" },
            { "project": "ProjectB", "pipeline": "ignored", "definitionId": 42 }
        ]
    }"#;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parse_valid_json_config() {
        let file = write_temp(".json", SAMPLE);
        let config = Config::load(file.path()).unwrap();
        config.validate().unwrap();

        assert_eq!(config.organization, "contoso");
        assert_eq!(config.pull_requests.len(), 1);
        assert_eq!(config.refresh_interval(), Duration::from_secs(30));
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.token_env(), DEFAULT_TOKEN_ENV);
        assert_eq!(
            config.pipeline_sources(),
            vec![
                Source::Pipeline {
                    project: "ProjectA".into(),
                    pipeline: PipelineRef::Name("CI".into()),
                },
                Source::Pipeline {
                    project: "ProjectB".into(),
                    pipeline: PipelineRef::Id(42),
                },
            ]
        );
    }

    #[test]
    fn parse_toml_config() {
        let file = write_temp(
            ".toml",
            r#"
organization = "contoso"
refreshInterval = 90
baseUrl = "https://tfs.example.com/tfs/"

[[pullRequests]]
project = "ProjectA"
repository = "RepoA"
"#,
        );
        let config = Config::load(file.path()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.refresh_interval(), Duration::from_secs(90));
        assert_eq!(config.base_url(), "https://tfs.example.com/tfs");
    }

    #[test]
    fn non_positive_interval_uses_default() {
        let config: Config =
            serde_json::from_str(r#"{"organization":"o","refreshInterval":-5}"#).unwrap();
        assert_eq!(config.refresh_interval(), Duration::from_secs(30));
        let config: Config =
            serde_json::from_str(r#"{"organization":"o","refreshInterval":0}"#).unwrap();
        assert_eq!(config.refresh_interval(), Duration::from_secs(30));
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = Config::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, DashError::Config(_)));
    }

    #[test]
    fn malformed_file_is_config_error() {
        let file = write_temp(".json", "{ not json");
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, DashError::Config(_)));
    }

    #[test]
    fn validate_rejects_incomplete_sources() {
        let parse = |json: &str| serde_json::from_str::<Config>(json).unwrap();

        assert!(parse(r#"{"pullRequests":[{"project":"p","repository":"r"}]}"#)
            .validate()
            .is_err());
        assert!(parse(r#"{"organization":"o"}"#).validate().is_err());
        assert!(
            parse(r#"{"organization":"o","pullRequests":[{"project":"p"}]}"#)
                .validate()
                .is_err()
        );
        assert!(
            parse(r#"{"organization":"o","pipelines":[{"project":"p"}]}"#)
                .validate()
                .is_err()
        );
        assert!(
            parse(r#"{"organization":"o","pipelines":[{"project":"p","definitionId":0}]}"#)
                .validate()
                .is_err()
        );
        assert!(
            parse(r#"{"organization":"o","pipelines":[{"project":"p","definitionId":3}]}"#)
                .validate()
                .is_ok()
        );
    }
}
