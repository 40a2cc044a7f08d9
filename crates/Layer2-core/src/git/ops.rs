//! Git Operations
//!
//! Thin, stateless wrapper over the `git` binary bound to one working
//! directory. Every method maps to one (occasionally two) git commands.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum GitError {
    #[error("git {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Unexpected git output: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GitError {
    /// Whether git's message contains `needle`
    pub fn mentions(&self, needle: &str) -> bool {
        match self {
            GitError::CommandFailed { stderr, .. } => stderr.contains(needle),
            _ => false,
        }
    }

    /// Remote-side "the ref is already gone" for a deletion push
    pub fn is_missing_remote_ref(&self) -> bool {
        self.mentions("remote ref does not exist") || self.mentions("deletion of")
    }
}

// ============================================================================
// Git Status Types
// ============================================================================

/// One `git status --porcelain` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// Index (staged) column
    pub index: char,
    /// Working tree column
    pub worktree: char,
    pub path: String,
}

impl StatusEntry {
    /// Two-letter code followed by the path, e.g. `?? notes.txt`
    pub fn summary(&self) -> String {
        format!("{}{} {}", self.index, self.worktree, self.path)
    }
}

/// Overall git repository status
#[derive(Debug, Clone, Default)]
pub struct GitStatus {
    /// Current branch name (`None` when detached or unborn)
    pub branch: Option<String>,

    /// Whether HEAD points directly at a commit
    pub detached: bool,

    /// Files with their status
    pub files: Vec<StatusEntry>,

    /// Number of commits ahead of upstream
    pub ahead: u32,

    /// Number of commits behind upstream
    pub behind: u32,
}

/// A stash entry, addressed positionally (`stash@{n}`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StashEntry {
    pub index: usize,
    pub reference: String,
    pub message: String,
}

/// Tree object of an empty directory; valid in every repository
pub const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

// ============================================================================
// Git Operations
// ============================================================================

/// Git operations handler
#[derive(Debug, Clone)]
pub struct GitOps {
    /// Working tree root
    root: PathBuf,
}

impl GitOps {
    /// Bind to `path`; the directory itself is the working tree root
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { root: path.into() }
    }

    /// Get repository root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `root` holds its own repository (not an ancestor's)
    pub async fn is_repo(&self) -> bool {
        if !self.root.join(".git").exists() {
            return false;
        }
        matches!(
            self.run_git(&["rev-parse", "--is-inside-work-tree"]).await.as_deref(),
            Ok("true")
        )
    }

    /// Run a git command
    async fn run_git(&self, args: &[&str]) -> Result<String, GitError> {
        self.run_git_with_env(args, &[]).await
    }

    async fn run_git_with_env(
        &self,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<String, GitError> {
        debug!("git {}", redact_args(args));

        let mut cmd = Command::new("git");
        cmd.args(args)
            .current_dir(&self.root)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("LC_ALL", "C")
            .stdin(Stdio::null());
        for (key, value) in env {
            cmd.env(key, value);
        }

        let output = cmd.output().await?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stderr = if stderr.is_empty() {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            } else {
                stderr
            };
            Err(GitError::CommandFailed {
                command: args.first().copied().unwrap_or_default().to_string(),
                stderr: super::remote::redact_url(&stderr),
            })
        }
    }

    // ========================================================================
    // Repository
    // ========================================================================

    pub async fn init(&self) -> Result<(), GitError> {
        self.run_git(&["init"]).await?;
        Ok(())
    }

    pub async fn config_get(&self, key: &str) -> Option<String> {
        self.run_git(&["config", "--get", key])
            .await
            .ok()
            .filter(|v| !v.is_empty())
    }

    pub async fn config_set_local(&self, key: &str, value: &str) -> Result<(), GitError> {
        self.run_git(&["config", "--local", key, value]).await?;
        Ok(())
    }

    // ========================================================================
    // Index / Commits
    // ========================================================================

    /// Stage all changes (including deletions and untracked files)
    pub async fn add_all(&self) -> Result<(), GitError> {
        self.run_git(&["add", "-A"]).await?;
        Ok(())
    }

    /// Commit staged changes; `None` when there was nothing to commit
    pub async fn commit(&self, message: &str) -> Result<Option<String>, GitError> {
        if self.is_clean().await? {
            return Ok(None);
        }

        match self.run_git(&["commit", "-m", message]).await {
            Ok(_) => {}
            Err(e) if e.mentions("nothing to commit") => return Ok(None),
            Err(e) => return Err(e),
        }

        let hash = self.head().await?;
        info!("Created commit: {}", short(&hash));
        Ok(Some(hash))
    }

    /// Index entries as `<mode> <object> <stage>\t<path>` lines
    pub async fn ls_files_stage(&self) -> Result<String, GitError> {
        self.run_git(&["ls-files", "--stage"]).await
    }

    /// Drop `path` from the index only
    pub async fn rm_cached(&self, path: &str) -> Result<(), GitError> {
        self.run_git(&["rm", "--cached", "--ignore-unmatch", "-q", "--", path])
            .await?;
        Ok(())
    }

    // ========================================================================
    // Refs
    // ========================================================================

    /// Get current commit hash
    pub async fn head(&self) -> Result<String, GitError> {
        self.run_git(&["rev-parse", "HEAD"]).await
    }

    /// Resolve any revision to an object id
    pub async fn rev_parse_verify(&self, rev: &str) -> Result<String, GitError> {
        self.run_git(&["rev-parse", "--verify", rev]).await
    }

    /// Resolve a revision (tags are peeled) to a commit id
    pub async fn resolve_commit(&self, rev: &str) -> Result<String, GitError> {
        self.run_git(&["rev-parse", "--verify", &format!("{}^{{commit}}", rev)])
            .await
    }

    /// Current branch; `None` when HEAD is detached
    pub async fn current_branch(&self) -> Result<Option<String>, GitError> {
        match self.run_git(&["symbolic-ref", "-q", "--short", "HEAD"]).await {
            Ok(name) if !name.is_empty() => Ok(Some(name)),
            Ok(_) => Ok(None),
            // symbolic-ref exits 1 with no output on a detached HEAD
            Err(GitError::CommandFailed { stderr, .. }) if stderr.is_empty() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn local_branch_exists(&self, name: &str) -> bool {
        self.run_git(&["show-ref", "--verify", "--quiet", &format!("refs/heads/{}", name)])
            .await
            .is_ok()
    }

    // ========================================================================
    // Working tree
    // ========================================================================

    /// Raw porcelain status
    async fn porcelain(&self) -> Result<String, GitError> {
        self.run_git(&["status", "--porcelain=v1", "--untracked-files=all"])
            .await
    }

    pub async fn is_clean(&self) -> Result<bool, GitError> {
        Ok(self.porcelain().await?.is_empty())
    }

    /// Get repository status
    pub async fn status(&self) -> Result<GitStatus, GitError> {
        let branch = self.current_branch().await?;
        let output = self.porcelain().await?;

        let mut status = GitStatus {
            detached: branch.is_none() && self.head().await.is_ok(),
            branch,
            files: output.lines().filter_map(parse_status_line).collect(),
            ..Default::default()
        };

        // Get ahead/behind counts
        if let Ok(counts) = self
            .run_git(&["rev-list", "--left-right", "--count", "HEAD...@{upstream}"])
            .await
        {
            let parts: Vec<&str> = counts.split_whitespace().collect();
            if parts.len() == 2 {
                status.ahead = parts[0].parse().unwrap_or(0);
                status.behind = parts[1].parse().unwrap_or(0);
            }
        }

        Ok(status)
    }

    /// Check out a branch or commit
    pub async fn checkout(&self, target: &str) -> Result<(), GitError> {
        self.run_git(&["checkout", target]).await?;
        Ok(())
    }

    /// Check out a commit with a detached HEAD
    pub async fn checkout_detached(&self, commit: &str) -> Result<(), GitError> {
        self.run_git(&["checkout", "--detach", commit]).await?;
        Ok(())
    }

    pub async fn checkout_new_branch(&self, name: &str) -> Result<(), GitError> {
        self.run_git(&["checkout", "-b", name]).await?;
        Ok(())
    }

    // ========================================================================
    // Tags
    // ========================================================================

    pub async fn tag_exists(&self, name: &str) -> Result<bool, GitError> {
        let output = self.run_git(&["tag", "-l", name]).await?;
        Ok(output.lines().any(|l| l.trim() == name))
    }

    /// Create an annotated tag
    ///
    /// `date` pins the tagger date (any format git accepts in
    /// `GIT_COMMITTER_DATE`), used when rewriting a tag in place.
    pub async fn create_tag(
        &self,
        name: &str,
        message: &str,
        target: Option<&str>,
        force: bool,
        date: Option<&str>,
    ) -> Result<(), GitError> {
        let mut args = vec!["tag", "-a", "--cleanup=whitespace"];
        if force {
            args.push("-f");
        }
        args.extend(["-m", message, name]);
        if let Some(target) = target {
            args.push(target);
        }

        match date {
            Some(date) => {
                self.run_git_with_env(&args, &[("GIT_COMMITTER_DATE", date)])
                    .await?
            }
            None => self.run_git(&args).await?,
        };
        Ok(())
    }

    pub async fn delete_tag(&self, name: &str) -> Result<(), GitError> {
        self.run_git(&["tag", "-d", name]).await?;
        Ok(())
    }

    /// Full annotation message of a tag
    pub async fn tag_contents(&self, name: &str) -> Result<String, GitError> {
        self.run_git(&[
            "for-each-ref",
            "--format=%(contents)",
            &format!("refs/tags/{}", name),
        ])
        .await
    }

    /// Tag creation date in git's internal `<epoch> <tz>` form
    pub async fn tag_date_raw(&self, name: &str) -> Result<String, GitError> {
        let date = self
            .run_git(&[
                "for-each-ref",
                "--format=%(creatordate:raw)",
                &format!("refs/tags/{}", name),
            ])
            .await?;
        if date.is_empty() {
            return Err(GitError::Parse(format!("no creation date for tag {}", name)));
        }
        Ok(date)
    }

    /// List tags matching `pattern`, newest first, rendered with `format`
    pub async fn list_tags(&self, pattern: &str, format: &str) -> Result<String, GitError> {
        self.run_git(&[
            "tag",
            "-l",
            pattern,
            "--sort=-creatordate",
            &format!("--format={}", format),
        ])
        .await
    }

    // ========================================================================
    // Remotes
    // ========================================================================

    pub async fn remote_url(&self, remote: &str) -> Option<String> {
        self.run_git(&["remote", "get-url", remote]).await.ok()
    }

    pub async fn add_remote(&self, remote: &str, url: &str) -> Result<(), GitError> {
        self.run_git(&["remote", "add", remote, url]).await?;
        Ok(())
    }

    pub async fn set_remote_url(&self, remote: &str, url: &str) -> Result<(), GitError> {
        self.run_git(&["remote", "set-url", remote, url]).await?;
        Ok(())
    }

    pub async fn remove_remote(&self, remote: &str) -> Result<(), GitError> {
        self.run_git(&["remote", "remove", remote]).await?;
        Ok(())
    }

    pub async fn fetch(&self, args: &[&str]) -> Result<(), GitError> {
        let mut full = vec!["fetch"];
        full.extend_from_slice(args);
        self.run_git(&full).await?;
        Ok(())
    }

    pub async fn push(&self, args: &[&str]) -> Result<(), GitError> {
        let mut full = vec!["push"];
        full.extend_from_slice(args);
        self.run_git(&full).await?;
        Ok(())
    }

    /// Whether `remote` has `refs/heads/<branch>`
    pub async fn remote_branch_exists(&self, remote: &str, branch: &str) -> Result<bool, GitError> {
        let output = self
            .run_git(&["ls-remote", "--heads", remote, branch])
            .await?;
        let wanted = format!("refs/heads/{}", branch);
        Ok(output
            .lines()
            .any(|l| l.split_whitespace().nth(1) == Some(wanted.as_str())))
    }

    // ========================================================================
    // Stash
    // ========================================================================

    /// Stash tracked and untracked changes; `false` when there was nothing to stash
    pub async fn stash_push(&self, message: &str) -> Result<bool, GitError> {
        let output = self
            .run_git(&["stash", "push", "--include-untracked", "-m", message])
            .await?;
        Ok(!output.contains("No local changes to save"))
    }

    pub async fn stash_list(&self) -> Result<Vec<StashEntry>, GitError> {
        let output = self
            .run_git(&["stash", "list", "--format=%gd%x1f%gs"])
            .await?;
        Ok(output
            .lines()
            .enumerate()
            .filter_map(|(index, line)| {
                let (reference, message) = line.split_once('\u{1f}')?;
                Some(StashEntry {
                    index,
                    reference: reference.to_string(),
                    message: message.to_string(),
                })
            })
            .collect())
    }

    pub async fn stash_apply(&self, reference: &str) -> Result<(), GitError> {
        self.run_git(&["stash", "apply", reference]).await?;
        Ok(())
    }

    pub async fn stash_drop(&self, reference: &str) -> Result<(), GitError> {
        self.run_git(&["stash", "drop", reference]).await?;
        Ok(())
    }

    pub async fn stash_pop(&self, reference: &str) -> Result<(), GitError> {
        self.run_git(&["stash", "pop", reference]).await?;
        Ok(())
    }

    // ========================================================================
    // Diff
    // ========================================================================

    /// NUL-separated `--name-status` output with rename/copy detection
    pub async fn diff_name_status(&self, from: &str, to: &str) -> Result<String, GitError> {
        self.run_git(&["diff", "--name-status", "-M", "-C", "-z", from, to])
            .await
    }

    /// NUL-separated list of every file in `rev`
    pub async fn ls_tree_names(&self, rev: &str) -> Result<String, GitError> {
        self.run_git(&["ls-tree", "-r", "-z", "--name-only", rev])
            .await
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_status_line(line: &str) -> Option<StatusEntry> {
    let mut chars = line.chars();
    let index = chars.next()?;
    let worktree = chars.next()?;
    let path = line.get(3..)?.to_string();

    Some(StatusEntry {
        index,
        worktree,
        path,
    })
}

fn short(hash: &str) -> &str {
    hash.get(..7).unwrap_or(hash)
}

/// Render args for logging with any URL credentials masked
fn redact_args(args: &[&str]) -> String {
    args.iter()
        .map(|a| super::remote::redact_url(a))
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Tests
// ============================================================================
