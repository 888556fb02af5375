use crate::config::Config;
use crate::error::{DashError, Result};

/// Load the personal access token from the environment variable named by the
/// config (`AZURE_DEVOPS_PAT` unless overridden).
pub fn load_token(config: &Config) -> Result<String> {
    let var = config.token_env();
    token_from(var, std::env::var(var).ok())
}

fn token_from(var: &str, value: Option<String>) -> Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(DashError::Auth(format!(
            "{} environment variable is not set",
            var
        ))),
    }
}
