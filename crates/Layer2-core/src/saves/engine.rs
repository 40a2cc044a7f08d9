//! Save Lifecycle Engine
//!
//! Maps saves onto git: a save is an annotated tag on a commit of the data
//! directory, mirrored to `origin`. Every entry point that runs git commands
//! against the repository holds the [`OperationLock`] for its whole duration.
//!
//! Push policy: a branch push is best effort, a tag push is fatal and rolls
//! back the local tag. Pushing a tag uploads every object it references, so
//! a save is complete on the remote even when its branch push failed.

use super::error::{GitContext, SaveError, SaveResult};
use super::lock::{OperationGuard, OperationKind, OperationLock};
use super::registry::SaveRegistry;
use super::stash::StashManager;
use super::tag;
use super::types::{
    ChangeStatus, ChangedFile, DeleteOutcome, LoadOutcome, OverwriteOutcome, RenameOutcome, Save,
    SaveDescriptor, SaveStatus, StashApplyOutcome, StashCheck,
};
use crate::git::{
    authenticated_url, bootstrap, reconcile_origin, replace_origin, BootstrapOptions, GitError,
    GitOps, StatusEntry, EMPTY_TREE, ORIGIN,
};
use crate::github::GithubClient;
use chrono::Utc;
use cloudsave_foundation::{ConfigStore, CurrentSave, LastSave, SafeConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Commit message of the first commit made by authorization
pub const AUTHORIZE_COMMIT_MESSAGE: &str = "Initial commit of existing data directory";

/// Commit message of the first commit after a forced re-initialization
pub const REINIT_COMMIT_MESSAGE: &str = "Initial commit after forced re-initialization";

/// Identity used when the repository has none configured
const FALLBACK_USER_NAME: &str = "Cloud Saves";
const FALLBACK_USER_EMAIL: &str = "cloud-saves@localhost";

// ============================================================================
// Overwrite flavours
// ============================================================================

/// Who asked for an overwrite; only the generated texts differ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteMode {
    Manual,
    Auto,
}

impl OverwriteMode {
    fn commit_message(&self, tag: &str) -> String {
        match self {
            Self::Manual => format!("Overwrite save: {}", tag),
            Self::Auto => format!("Auto Save Overwrite: {}", tag),
        }
    }

    fn default_description(&self, tag: &str) -> String {
        match self {
            Self::Manual => format!("Overwrite of {}", tag),
            Self::Auto => format!("Auto Save Overwrite: {}", tag),
        }
    }
}

/// Result of a forced re-initialization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReinitOutcome {
    /// `origin` could not be configured; the local repository is fine
    pub remote_warning: Option<String>,
}

// ============================================================================
// Engine
// ============================================================================

/// Save lifecycle over one data directory
#[derive(Debug, Clone)]
pub struct SaveEngine {
    data_dir: PathBuf,
    config: Arc<ConfigStore>,
    lock: OperationLock,
    bootstrap: BootstrapOptions,
    github: GithubClient,
}

impl SaveEngine {
    pub fn new(data_dir: impl Into<PathBuf>, config: Arc<ConfigStore>) -> Self {
        Self {
            data_dir: data_dir.into(),
            config,
            lock: OperationLock::new(),
            bootstrap: BootstrapOptions::default(),
            github: GithubClient::default(),
        }
    }

    pub fn with_bootstrap_options(mut self, options: BootstrapOptions) -> Self {
        self.bootstrap = options;
        self
    }

    pub fn with_github(mut self, github: GithubClient) -> Self {
        self.github = github;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config_store(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    pub fn lock(&self) -> &OperationLock {
        &self.lock
    }

    fn acquire(&self, kind: OperationKind) -> SaveResult<OperationGuard> {
        self.lock.try_acquire(kind).map_err(|current| {
            debug!("Rejecting {}: {} in progress", kind, current);
            SaveError::Busy(current)
        })
    }

    // ========================================================================
    // Gateway handles
    // ========================================================================

    /// Handle for the data directory with `origin` pointed at the
    /// authenticated URL when a repository URL and token are configured
    pub async fn git(&self) -> GitOps {
        let git = GitOps::new(&self.data_dir);

        let config = match self.config.load() {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to read config for remote setup: {}", e);
                return git;
            }
        };
        if config.repo_url.is_empty() || !config.has_token() || !git.is_repo().await {
            return git;
        }

        let url = authenticated_url(&config.repo_url, &config.github_token);
        if let Err(e) = reconcile_origin(&git, &url).await {
            warn!("Failed to configure authenticated remote: {}", e);
        }
        git
    }

    /// Like [`git`](Self::git), but the repository must exist
    async fn repo(&self) -> SaveResult<GitOps> {
        let git = self.git().await;
        if !git.is_repo().await {
            return Err(SaveError::NotInitialized);
        }
        Ok(git)
    }

    fn stash(&self, git: &GitOps) -> StashManager {
        StashManager::new(git.clone(), Arc::clone(&self.config))
    }

    // ========================================================================
    // Create
    // ========================================================================

    /// Commit the working tree (when dirty) and tag it as a new save
    pub async fn create_save(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> SaveResult<SaveDescriptor> {
        let _guard = self.acquire(OperationKind::CreateSave)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(SaveError::InvalidInput("save name must not be empty".into()));
        }
        let git = self.repo().await?;
        let config = self.config.load()?;
        info!("Creating save: {}", name);

        git.add_all().await.context("stage changes")?;
        let commit = git
            .commit(&format!("Save: {}", name))
            .await
            .context("commit changes")?;

        let now = Utc::now();
        let tag_name = tag::make_tag(name, now);
        let description = non_empty(description)
            .map(str::to_string)
            .unwrap_or_else(|| default_description(name));

        git.create_tag(
            &tag_name,
            &tag::annotation(&description, now),
            None,
            false,
            None,
        )
        .await
        .context("create save tag")?;

        if commit.is_some() {
            push_branch_if_current(&git, &config.branch).await;
        }
        push_tag_or_rollback(&git, &tag_name).await?;

        self.config.update(|c| {
            c.last_save = Some(LastSave {
                name: name.to_string(),
                tag: tag_name.clone(),
                timestamp: now,
                description: description.clone(),
            })
        })?;

        info!("Created save {} ({})", name, tag_name);
        Ok(SaveDescriptor {
            name: name.to_string(),
            tag: tag_name,
            description,
            timestamp: now,
            commit,
        })
    }

    // ========================================================================
    // List
    // ========================================================================

    /// Every save on the remote (after a tag sync), newest first
    pub async fn list_saves(&self) -> SaveResult<Vec<Save>> {
        let _guard = self.acquire(OperationKind::ListSaves)?;
        let git = self.repo().await?;
        SaveRegistry::new(git).list().await
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// Check out a save's commit (detached), stashing local changes first
    pub async fn load_save(&self, tag_name: &str) -> SaveResult<LoadOutcome> {
        let _guard = self.acquire(OperationKind::LoadSave)?;
        let git = self.repo().await?;
        info!("Loading save {}", tag_name);

        if git.remote_url(ORIGIN).await.is_some() {
            let refspec = format!("refs/tags/{0}:refs/tags/{0}", tag_name);
            if let Err(e) = git.fetch(&[ORIGIN, "--force", "--no-tags", &refspec]).await {
                warn!("Failed to fetch tag {}: {}", tag_name, e);
            }
        }
        if !git.tag_exists(tag_name).await.context("look up save tag")? {
            return Err(SaveError::NotFound(format!("save {}", tag_name)));
        }

        let stash = self.stash(&git);
        let dirty = !git.is_clean().await.context("read working tree status")?;
        let stash_created = if dirty { stash.create().await? } else { false };
        if stash_created {
            stash.set_flag(true)?;
        }

        let checkout: SaveResult<String> = async {
            let commit = git
                .resolve_commit(tag_name)
                .await
                .context("resolve save commit")?;
            git.checkout_detached(&commit)
                .await
                .context("check out save")?;
            Ok(commit)
        }
        .await;

        match checkout {
            Ok(commit) => {
                self.config.update(|c| {
                    c.current_save = Some(CurrentSave {
                        tag: tag_name.to_string(),
                        loaded_at: Utc::now(),
                    })
                })?;
                info!("Loaded save {} at {}", tag_name, short(&commit));
                Ok(LoadOutcome { stash_created })
            }
            Err(e) => {
                if stash_created {
                    match stash.restore().await {
                        Ok(()) => info!("Restored local changes after failed load"),
                        Err(pop) => error!(
                            "Failed to restore temporary stash after load failure: {}",
                            pop
                        ),
                    }
                }
                Err(e)
            }
        }
    }

    // ========================================================================
    // Delete
    // ========================================================================

    /// Remove a save locally and from the remote; idempotent
    pub async fn delete_save(&self, tag_name: &str) -> SaveResult<DeleteOutcome> {
        let _guard = self.acquire(OperationKind::DeleteSave)?;
        let git = self.repo().await?;
        info!("Deleting save {}", tag_name);

        if git.tag_exists(tag_name).await.context("look up save tag")? {
            git.delete_tag(tag_name)
                .await
                .context("delete local tag")?;
        } else {
            debug!("Local tag {} already absent", tag_name);
        }

        let warning = match delete_remote_tag(&git, tag_name).await {
            Ok(()) => None,
            Err(e) => {
                warn!("Local save deleted but remote deletion failed: {}", e);
                Some(format!(
                    "Local save deleted, but deleting it on the remote failed: {}",
                    e
                ))
            }
        };

        self.config.update(|c| {
            if c.current_save.as_ref().is_some_and(|s| s.tag == tag_name) {
                c.current_save = None;
            }
        })?;

        Ok(DeleteOutcome { warning })
    }

    // ========================================================================
    // Rename
    // ========================================================================

    /// Rename a save or update its description
    ///
    /// An unchanged name rewrites the tag in place. A new name mints a new tag
    /// on the same commit and retires the old one. Either way the tag keeps
    /// its original creation date.
    pub async fn rename_save(
        &self,
        old_tag: &str,
        new_name: &str,
        description: Option<&str>,
    ) -> SaveResult<RenameOutcome> {
        let _guard = self.acquire(OperationKind::RenameSave)?;

        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(SaveError::InvalidInput("save name must not be empty".into()));
        }
        let git = self.repo().await?;

        if !git.tag_exists(old_tag).await.context("look up save tag")? {
            return Err(SaveError::NotFound(format!("save {}", old_tag)));
        }
        let commit = git
            .resolve_commit(old_tag)
            .await
            .context("resolve save commit")?;
        let created = match git.tag_date_raw(old_tag).await {
            Ok(date) => Some(date),
            Err(e) => {
                warn!("Could not read creation date of {}: {}", old_tag, e);
                None
            }
        };

        let now = Utc::now();
        let description = non_empty(description)
            .map(str::to_string)
            .unwrap_or_else(|| default_description(new_name));
        let message = tag::annotation(&description, now);

        if tag::tag_display_name(old_tag).as_deref() == Some(new_name) {
            info!("Name unchanged, rewriting {} in place", old_tag);
            git.create_tag(old_tag, &message, Some(&commit), true, created.as_deref())
                .await
                .context("rewrite save tag")?;
            let refspec = format!("refs/tags/{}", old_tag);
            git.push(&[ORIGIN, &refspec, "--force"])
                .await
                .map_err(|e| SaveError::git(format!("push tag {}", old_tag), e))?;

            self.config.update(|c| {
                if let Some(last) = c.last_save.as_mut().filter(|l| l.tag == old_tag) {
                    last.description = description.clone();
                    last.timestamp = now;
                }
            })?;

            return Ok(RenameOutcome {
                old_tag: old_tag.to_string(),
                new_tag: old_tag.to_string(),
                new_name: new_name.to_string(),
            });
        }

        let new_tag = tag::make_tag(new_name, now);
        info!("Renaming {} -> {}", old_tag, new_tag);
        git.create_tag(&new_tag, &message, Some(&commit), false, created.as_deref())
            .await
            .context("create renamed tag")?;
        push_tag_or_rollback(&git, &new_tag).await?;

        if let Err(e) = git.delete_tag(old_tag).await {
            warn!("Failed to delete old local tag {}: {}", old_tag, e);
        }
        if let Err(e) = delete_remote_tag(&git, old_tag).await {
            warn!("Failed to delete old remote tag {}: {}", old_tag, e);
        }

        self.config.update(|c| {
            if let Some(current) = c.current_save.as_mut().filter(|s| s.tag == old_tag) {
                current.tag = new_tag.clone();
            }
            if let Some(last) = c.last_save.as_mut().filter(|l| l.tag == old_tag) {
                last.tag = new_tag.clone();
                last.name = new_name.to_string();
                last.description = description.clone();
                last.timestamp = now;
            }
            if c.auto_save_target_tag == old_tag {
                c.auto_save_target_tag = new_tag.clone();
            }
        })?;

        Ok(RenameOutcome {
            old_tag: old_tag.to_string(),
            new_tag,
            new_name: new_name.to_string(),
        })
    }

    // ========================================================================
    // Overwrite
    // ========================================================================

    /// Move an existing save to the current working tree
    pub async fn overwrite_save(&self, tag_name: &str) -> SaveResult<OverwriteOutcome> {
        let _guard = self.acquire(OperationKind::OverwriteSave)?;
        self.overwrite(tag_name, OverwriteMode::Manual).await
    }

    /// One auto-save tick; `Ok(None)` when the policy is not armed
    pub async fn auto_save(&self) -> SaveResult<Option<OverwriteOutcome>> {
        let _guard = self.acquire(OperationKind::AutoSave)?;

        let config = self.config.load()?;
        if !config.auto_save_armed() {
            debug!("Auto-save conditions not met, skipping");
            return Ok(None);
        }
        info!("Auto-saving to {}", config.auto_save_target_tag);
        self.overwrite(&config.auto_save_target_tag, OverwriteMode::Auto)
            .await
            .map(Some)
    }

    /// Overwrite protocol; the caller holds the lock
    async fn overwrite(&self, tag_name: &str, mode: OverwriteMode) -> SaveResult<OverwriteOutcome> {
        let config = self.config.load()?;
        if !config.is_authorized {
            return Err(SaveError::Unauthorized(
                "connect a repository before overwriting saves".into(),
            ));
        }
        let Some(parsed) = tag::parse_tag(tag_name) else {
            return Err(SaveError::InvalidInput(format!(
                "{} is not a save tag",
                tag_name
            )));
        };
        let git = self.repo().await?;

        let existed = git.tag_exists(tag_name).await.context("look up save tag")?;
        let (description, created) = if existed {
            let description = match git.tag_contents(tag_name).await {
                Ok(contents) => tag::parse_annotation(&contents).description,
                Err(e) => {
                    warn!("Could not read description of {}: {}", tag_name, e);
                    String::new()
                }
            };
            let created = match git.tag_date_raw(tag_name).await {
                Ok(date) => Some(date),
                Err(e) => {
                    warn!("Could not read creation date of {}: {}", tag_name, e);
                    None
                }
            };
            (description, created)
        } else {
            (String::new(), None)
        };
        let description = if description.is_empty() {
            mode.default_description(tag_name)
        } else {
            description
        };

        git.add_all().await.context("stage changes")?;
        let committed = git
            .commit(&mode.commit_message(tag_name))
            .await
            .context("commit changes")?;
        let commit = match &committed {
            Some(hash) => {
                push_branch_if_current(&git, &config.branch).await;
                hash.clone()
            }
            None => {
                debug!("Nothing to commit, reusing HEAD");
                git.head().await.context("resolve HEAD")?
            }
        };

        if existed {
            git.delete_tag(tag_name)
                .await
                .context("delete local tag")?;
        }
        if let Err(e) = delete_remote_tag(&git, tag_name).await {
            warn!("Problem deleting remote tag {}: {}", tag_name, e);
        }

        let now = Utc::now();
        git.create_tag(
            tag_name,
            &tag::annotation(&description, now),
            Some(&commit),
            false,
            created.as_deref(),
        )
        .await
        .context("recreate save tag")?;
        push_tag_or_rollback(&git, tag_name).await?;

        self.config.update(|c| {
            if c.last_save.as_ref().is_some_and(|l| l.tag == tag_name) {
                c.last_save = Some(LastSave {
                    name: parsed.name.clone(),
                    tag: tag_name.to_string(),
                    timestamp: now,
                    description: description.clone(),
                });
            }
        })?;

        info!("Overwrote save {} at {}", tag_name, short(&commit));
        Ok(OverwriteOutcome {
            tag: tag_name.to_string(),
            commit,
            committed: committed.is_some(),
        })
    }

    // ========================================================================
    // Diff
    // ========================================================================

    /// Files changed between two revisions
    ///
    /// `ref1` may be the empty tree. A `ref1` of the form `<x>^` or `<x>~1`
    /// that does not resolve (the parent of a root commit) also means the
    /// empty tree.
    pub async fn save_diff(&self, ref1: &str, ref2: &str) -> SaveResult<Vec<ChangedFile>> {
        let _guard = self.acquire(OperationKind::Diff)?;
        let git = self.repo().await?;

        let from = if ref1 == EMPTY_TREE {
            EMPTY_TREE.to_string()
        } else {
            match git.rev_parse_verify(ref1).await {
                Ok(_) => ref1.to_string(),
                Err(e) if ref1.ends_with('^') || ref1.ends_with("~1") => {
                    debug!("{} does not resolve ({}), diffing against the empty tree", ref1, e);
                    EMPTY_TREE.to_string()
                }
                Err(e) => return Err(invalid_ref(ref1, e)),
            }
        };
        git.rev_parse_verify(ref2)
            .await
            .map_err(|e| invalid_ref(ref2, e))?;

        if from == EMPTY_TREE {
            let names = git.ls_tree_names(ref2).await.context("list files")?;
            return Ok(names
                .split('\0')
                .filter(|n| !n.is_empty())
                .map(|n| ChangedFile {
                    status: ChangeStatus::Added,
                    path: n.to_string(),
                    previous_path: None,
                })
                .collect());
        }

        let raw = git
            .diff_name_status(&from, ref2)
            .await
            .context("diff saves")?;
        Ok(parse_name_status(&raw))
    }

    // ========================================================================
    // Status
    // ========================================================================

    /// Working tree and pointer snapshot; does not take the lock
    pub async fn status(&self) -> SaveResult<SaveStatus> {
        let config = self.config.load()?;
        let git = GitOps::new(&self.data_dir);

        if !git.is_repo().await {
            return Ok(SaveStatus {
                initialized: false,
                current_save: config.current_save,
                temp_stash: config.has_temp_stash,
                ..Default::default()
            });
        }

        let status = git.status().await.context("read repository status")?;
        Ok(SaveStatus {
            initialized: true,
            changes: status.files.iter().map(StatusEntry::summary).collect(),
            current_branch: status.branch,
            current_save: config.current_save,
            is_detached: status.detached,
            ahead: status.ahead,
            behind: status.behind,
            temp_stash: config.has_temp_stash,
        })
    }

    // ========================================================================
    // Safety stash
    // ========================================================================

    pub async fn check_temp_stash(&self) -> SaveResult<StashCheck> {
        let git = GitOps::new(&self.data_dir);
        self.stash(&git).check().await
    }

    pub async fn apply_temp_stash(&self) -> SaveResult<StashApplyOutcome> {
        let _guard = self.acquire(OperationKind::ApplyStash)?;
        let git = self.repo().await?;
        self.stash(&git).apply().await
    }

    pub async fn discard_temp_stash(&self) -> SaveResult<()> {
        let _guard = self.acquire(OperationKind::DiscardStash)?;
        let git = self.repo().await?;
        self.stash(&git).discard().await
    }

    // ========================================================================
    // Authorization / initialization
    // ========================================================================

    /// Connect the data directory to the configured remote
    ///
    /// Any failure leaves `is_authorized` false.
    pub async fn authorize(&self, branch: Option<&str>) -> SaveResult<SafeConfig> {
        let _guard = self.acquire(OperationKind::Authorize)?;

        let result = self.authorize_inner(branch).await;
        if let Err(e) = &result {
            warn!("Authorization failed: {}", e);
            if let Err(save_err) = self.config.update(|c| c.is_authorized = false) {
                error!("Failed to reset authorization flag: {}", save_err);
            }
        }
        result
    }

    async fn authorize_inner(&self, branch: Option<&str>) -> SaveResult<SafeConfig> {
        let config = self.config.load()?;
        if config.repo_url.is_empty() {
            return Err(SaveError::InvalidInput(
                "repository URL is not configured".into(),
            ));
        }
        let target = non_empty(branch)
            .map(str::to_string)
            .unwrap_or_else(|| config.branch.clone());

        self.config.update(|c| {
            c.is_authorized = false;
            c.branch = target.clone();
        })?;

        let git = GitOps::new(&self.data_dir);
        bootstrap(&git, &self.bootstrap)
            .await
            .context("initialize repository")?;
        initial_commit(&git, AUTHORIZE_COMMIT_MESSAGE).await?;

        let url = authenticated_url(&config.repo_url, &config.github_token);
        reconcile_origin(&git, &url)
            .await
            .context("configure remote")?;

        git.fetch(&[ORIGIN, "--tags", "--prune", "--force"])
            .await
            .map_err(|e| {
                SaveError::Remote(format!(
                    "cannot access the remote repository or fetch its tags; check the URL and token permissions ({})",
                    e
                ))
            })?;

        let remote_has_branch = match git.remote_branch_exists(ORIGIN, &target).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!("ls-remote for {} failed, assuming it is missing: {}", target, e);
                false
            }
        };

        if remote_has_branch {
            debug!("Remote branch {} exists, leaving local branches untouched", target);
        } else {
            info!("Remote branch {} missing, creating it", target);
            let switched = if git.local_branch_exists(&target).await {
                git.checkout(&target).await
            } else {
                git.checkout_new_branch(&target).await
            };
            switched.context("switch to target branch")?;

            git.push(&["--set-upstream", ORIGIN, &target])
                .await
                .map_err(|e| {
                    let step = if e.mentions("non-fast-forward") {
                        format!(
                            "push branch {} (remote history conflicts with local history)",
                            target
                        )
                    } else {
                        format!("push branch {}", target)
                    };
                    SaveError::git(step, e)
                })?;
        }

        let username = self.github.login(&config.github_token).await;
        let view = self.config.update(|c| {
            c.is_authorized = true;
            c.branch = target.clone();
            if username.is_some() {
                c.username = username.clone();
            }
            c.safe_view()
        })?;

        info!("Authorized against {} on branch {}", view.repo_url, target);
        Ok(view)
    }

    /// Delete the repository metadata and start over from the working tree
    pub async fn reinitialize(&self) -> SaveResult<ReinitOutcome> {
        let _guard = self.acquire(OperationKind::Reinitialize)?;
        let config = self.config.load()?;
        warn!("Force re-initializing repository at {}", self.data_dir.display());

        let git_dir = self.data_dir.join(".git");
        if git_dir.exists() {
            std::fs::remove_dir_all(&git_dir)
                .map_err(|e| SaveError::git("remove old repository", GitError::Io(e)))?;
        }

        let git = GitOps::new(&self.data_dir);
        bootstrap(&git, &self.bootstrap)
            .await
            .context("initialize repository")?;
        if let Err(e) = initial_commit(&git, REINIT_COMMIT_MESSAGE).await {
            error!("Initial commit after re-initialization failed: {}", e);
        }

        // stash entries and the loaded save went away with the old repository
        self.config.update(|c| {
            c.has_temp_stash = false;
            c.current_save = None;
        })?;

        let mut outcome = ReinitOutcome::default();
        if !config.repo_url.is_empty() {
            let url = authenticated_url(&config.repo_url, &config.github_token);
            if let Err(e) = replace_origin(&git, &url).await {
                warn!("Repository re-initialized but remote setup failed: {}", e);
                outcome.remote_warning = Some(e.to_string());
            }
        }
        Ok(outcome)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn default_description(name: &str) -> String {
    format!("Save: {}", name)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn short(hash: &str) -> &str {
    hash.get(..7).unwrap_or(hash)
}

fn invalid_ref(reference: &str, e: GitError) -> SaveError {
    SaveError::NotFound(format!("invalid reference {}: {}", reference, e))
}

/// Stage everything and commit with a local identity if none is set
async fn initial_commit(git: &GitOps, message: &str) -> SaveResult<()> {
    git.add_all().await.context("stage data directory")?;
    ensure_identity(git).await;
    match git.commit(message).await.context("create initial commit")? {
        Some(hash) => info!("Initial commit {}", short(&hash)),
        None => debug!("Data directory unchanged, no initial commit"),
    }
    Ok(())
}

async fn ensure_identity(git: &GitOps) {
    for (key, value) in [
        ("user.name", FALLBACK_USER_NAME),
        ("user.email", FALLBACK_USER_EMAIL),
    ] {
        if git.config_get(key).await.is_none() {
            if let Err(e) = git.config_set_local(key, value).await {
                error!("Failed to set local {}: {}", key, e);
            }
        }
    }
}

/// Push `branch` when it is checked out; failures are only logged
async fn push_branch_if_current(git: &GitOps, branch: &str) {
    match git.current_branch().await {
        Ok(Some(current)) if current == branch => {
            if let Err(e) = git.push(&[ORIGIN, branch]).await {
                warn!("Failed to push branch {}: {}", branch, e);
            }
        }
        Ok(current) => debug!(
            "Not on configured branch {} (current: {}), skipping branch push",
            branch,
            current.as_deref().unwrap_or("detached")
        ),
        Err(e) => warn!("Could not determine current branch: {}", e),
    }
}

/// Push a new tag; on failure the local tag is removed again
async fn push_tag_or_rollback(git: &GitOps, tag_name: &str) -> SaveResult<()> {
    let refspec = format!("refs/tags/{}", tag_name);
    if let Err(e) = git.push(&[ORIGIN, &refspec]).await {
        if let Err(rollback) = git.delete_tag(tag_name).await {
            error!(
                "Failed to remove local tag {} after push failure: {}",
                tag_name, rollback
            );
        }
        return Err(SaveError::git(format!("push tag {}", tag_name), e));
    }
    Ok(())
}

/// Delete a tag on `origin`; an already-missing ref counts as success
async fn delete_remote_tag(git: &GitOps, tag_name: &str) -> Result<(), GitError> {
    let refspec = format!(":refs/tags/{}", tag_name);
    match git.push(&[ORIGIN, &refspec]).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_missing_remote_ref() => {
            debug!("Remote tag {} already absent", tag_name);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Parse `git diff --name-status -z` output
fn parse_name_status(raw: &str) -> Vec<ChangedFile> {
    let mut files = Vec::new();
    let mut tokens = raw.split('\0').filter(|t| !t.is_empty());

    while let Some(code) = tokens.next() {
        let Some(letter) = code.chars().next() else {
            continue;
        };
        let status = ChangeStatus::from_code(letter);
        if status.has_source() {
            let (Some(from), Some(to)) = (tokens.next(), tokens.next()) else {
                break;
            };
            files.push(ChangedFile {
                status,
                path: to.to_string(),
                previous_path: Some(from.to_string()),
            });
        } else {
            let Some(path) = tokens.next() else {
                break;
            };
            files.push(ChangedFile {
                status,
                path: path.to_string(),
                previous_path: None,
            });
        }
    }
    files
}
