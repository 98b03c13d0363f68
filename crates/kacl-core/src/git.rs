//! Git queries used to update a changelog.
//!
//! Shells out to `git` so the user's configuration applies. Every query runs
//! in an explicit repository directory.

use std::process::Command;

use camino::Utf8Path;
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// Failed to execute the `git` command.
    #[error("failed to run git: {0}")]
    Exec(#[from] std::io::Error),

    /// `git` returned a non-zero exit code.
    #[error("git {command} failed: {stderr}")]
    Command {
        /// The git subcommand that failed (e.g., "log").
        command: String,
        /// Captured stderr.
        stderr: String,
    },

    /// Not inside a git repository.
    #[error("not a git repository (or any parent up to mount point)")]
    NotARepo,
}

/// Result alias for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// Newest tag starting with `prefix`, by version sort.
#[instrument]
pub fn most_recent_tag(root: &Utf8Path, prefix: &str) -> GitResult<Option<String>> {
    let pattern = format!("{prefix}*");
    let output = git(root, &["tag", "--list", &pattern, "--sort=-version:refname"])?;
    let tag = output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string);
    debug!(?tag, "most recent tag");
    Ok(tag)
}

/// Subjects of non-merge commits after `since` (all history when `None`),
/// newest first.
#[instrument]
pub fn commit_subjects_since(root: &Utf8Path, since: Option<&str>) -> GitResult<Vec<String>> {
    let range = since.map_or_else(|| "HEAD".to_string(), |tag| format!("{tag}..HEAD"));
    let output = match git(root, &["log", &range, "--no-merges", "--format=%s"]) {
        Ok(output) => output,
        // A repository without commits has no HEAD yet.
        Err(GitError::Command { stderr, .. })
            if since.is_none()
                && (stderr.contains("does not have any commits")
                    || stderr.contains("unknown revision")) =>
        {
            String::new()
        }
        Err(e) => return Err(e),
    };

    let subjects: Vec<String> = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    debug!(count = subjects.len(), "commit subjects");
    Ok(subjects)
}

/// URL of the named remote, or `None` when it does not exist.
#[instrument]
pub fn remote_url(root: &Utf8Path, remote: &str) -> GitResult<Option<String>> {
    match git(root, &["remote", "get-url", remote]) {
        Ok(url) => {
            let url = url.trim().to_string();
            debug!(%remote, %url, "remote URL");
            Ok(Some(url))
        }
        Err(GitError::Command { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Browsable `https://<host>/<owner>/<repo>` URL of a remote.
///
/// Handles both HTTPS and SSH formats:
/// - `https://github.com/owner/repo.git`
/// - `git@github.com:owner/repo.git`
/// - `ssh://git@github.com/owner/repo.git`
///
/// Returns `None` if the URL cannot be parsed.
pub fn repository_url(remote: &str) -> Option<String> {
    let remote = remote.trim();
    let (host, path) = if let Some((_, rest)) = remote.split_once("://") {
        let rest = rest.rsplit_once('@').map_or(rest, |(_, host_path)| host_path);
        rest.split_once('/')?
    } else {
        let rest = remote.rsplit_once('@').map_or(remote, |(_, host_path)| host_path);
        rest.split_once(':')?
    };

    // Drop an explicit port.
    let host = host.split_once(':').map_or(host, |(host, _)| host);
    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let (owner, repo) = path.split_once('/')?;
    if host.is_empty() || owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }

    Some(format!("https://{host}/{owner}/{repo}"))
}

/// Check if `root` is inside a git work tree.
#[instrument]
pub fn is_inside_repo(root: &Utf8Path) -> GitResult<bool> {
    match git(root, &["rev-parse", "--is-inside-work-tree"]) {
        Ok(output) => Ok(output.trim() == "true"),
        Err(GitError::Command { .. } | GitError::NotARepo) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Run a git command in `root` and return its stdout.
fn git(root: &Utf8Path, args: &[&str]) -> GitResult<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(root.as_std_path())
        .output()?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if stderr.contains("not a git repository") {
            return Err(GitError::NotARepo);
        }

        Err(GitError::Command {
            command: args.first().unwrap_or(&"").to_string(),
            stderr,
        })
    }
}
