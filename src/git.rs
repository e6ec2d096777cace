//! Repository detection from a local git checkout

use crate::error::Result;
use crate::page::{parse_github_repo, RepoSlug};
use git2::Repository;
use std::path::Path;
use tracing::debug;

/// Remote consulted when none is named
pub const DEFAULT_REMOTE: &str = "origin";

/// URL of a remote in the checkout containing `repo_path`
///
/// The checkout is found by walking up from `repo_path`. A remote that does
/// not exist, or has no URL, is `None` rather than an error.
pub fn get_remote_url(repo_path: &Path, remote_name: Option<&str>) -> Result<Option<String>> {
    let repo = Repository::discover(repo_path)?;
    let name = remote_name.unwrap_or(DEFAULT_REMOTE);

    let url = repo
        .find_remote(name)
        .ok()
        .and_then(|remote| remote.url().map(str::to_string));
    if url.is_none() {
        debug!("Remote {} has no URL in {:?}", name, repo.path());
    }
    Ok(url)
}

/// GitHub repository the checkout at `repo_path` points to, if any
pub fn detect_repository(repo_path: &Path) -> Result<Option<RepoSlug>> {
    let Some(url) = get_remote_url(repo_path, None)? else {
        debug!("No {} remote in {:?}", DEFAULT_REMOTE, repo_path);
        return Ok(None);
    };

    match parse_github_repo(&url) {
        Ok(slug) => Ok(Some(slug)),
        Err(e) => {
            debug!("Origin remote is not a GitHub repository: {}", e);
            Ok(None)
        }
    }
}
