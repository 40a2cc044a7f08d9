//! Remote URL handling
//!
//! Builds the credential-carrying push URL and keeps `origin` pointed at it.

use super::ops::{GitError, GitOps};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info};

/// Name of the single remote the engine manages
pub const ORIGIN: &str = "origin";

lazy_static! {
    static ref URL_CREDENTIALS: Regex =
        Regex::new(r"(?P<scheme>[a-zA-Z][a-zA-Z0-9+.-]*://)[^/@\s]+@").unwrap();
}

/// Embed `token` into an `https://` URL
///
/// URLs that already carry credentials, and non-https URLs (ssh, file paths),
/// are returned unchanged.
pub fn authenticated_url(repo_url: &str, token: &str) -> String {
    if token.is_empty() || repo_url.contains('@') {
        return repo_url.to_string();
    }
    match repo_url.strip_prefix("https://") {
        Some(rest) => format!("https://x-access-token:{}@{}", token, rest),
        None => repo_url.to_string(),
    }
}

/// Mask credentials in a URL (or any string containing one)
pub fn redact_url(text: &str) -> String {
    URL_CREDENTIALS
        .replace_all(text, "${scheme}***@")
        .into_owned()
}

/// Outcome of [`reconcile_origin`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteChange {
    Added,
    Updated,
    Unchanged,
}

/// Point `origin` at `url`: add when absent, set-url when different
pub async fn reconcile_origin(git: &GitOps, url: &str) -> Result<RemoteChange, GitError> {
    match git.remote_url(ORIGIN).await {
        Some(current) if current == url => {
            debug!("Remote {} already up to date", ORIGIN);
            Ok(RemoteChange::Unchanged)
        }
        Some(_) => {
            git.set_remote_url(ORIGIN, url).await?;
            info!("Updated remote {} -> {}", ORIGIN, redact_url(url));
            Ok(RemoteChange::Updated)
        }
        None => {
            git.add_remote(ORIGIN, url).await?;
            info!("Added remote {} -> {}", ORIGIN, redact_url(url));
            Ok(RemoteChange::Added)
        }
    }
}

/// Drop any existing `origin` and add it fresh
pub async fn replace_origin(git: &GitOps, url: &str) -> Result<(), GitError> {
    if git.remote_url(ORIGIN).await.is_some() {
        git.remove_remote(ORIGIN).await?;
    }
    git.add_remote(ORIGIN, url).await?;
    info!("Configured remote {} -> {}", ORIGIN, redact_url(url));
    Ok(())
}
