use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{info, warn};

use crate::error::{DashError, Result};

/// Open a URL with the system handler. Fire-and-forget: the outcome is only
/// logged.
pub fn open_in_browser(url: String) {
    tokio::task::spawn_blocking(move || match open::that(&url) {
        Ok(()) => info!(%url, "opened in browser"),
        Err(err) => warn!(%url, "failed to open browser: {}", err),
    });
}

/// Clone `url` into `dir` under the working directory and check out `branch`.
/// Fire-and-forget like `open_in_browser`.
pub fn clone_and_checkout(url: String, dir: String, branch: String) {
    tokio::spawn(async move {
        match run_clone(&url, &dir, &branch).await {
            Ok(()) => info!(%url, %dir, %branch, "cloned pull request branch"),
            Err(err) => warn!(%url, %dir, %branch, "clone failed: {}", err),
        }
    });
}

async fn run_clone(url: &str, dir: &str, branch: &str) -> Result<()> {
    if Path::new(dir).exists() {
        return Err(DashError::Task(format!("{} already exists", dir)));
    }
    run_git(&clone_args(url, dir)).await?;
    run_git(&checkout_args(dir, branch)).await
}

fn clone_args(url: &str, dir: &str) -> Vec<String> {
    vec!["clone".into(), url.into(), dir.into()]
}

fn checkout_args(dir: &str, branch: &str) -> Vec<String> {
    vec!["-C".into(), dir.into(), "checkout".into(), branch.into()]
}

async fn run_git(args: &[String]) -> Result<()> {
    // Output would tear the alternate screen and a credential prompt would hang.
    let status = Command::new("git")
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await?;

    if status.success() {
        Ok(())
    } else {
        Err(DashError::Task(format!(
            "git {} exited with {}",
            args.first().map(String::as_str).unwrap_or_default(),
            status
        )))
    }
}
