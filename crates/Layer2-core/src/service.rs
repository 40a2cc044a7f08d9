//! CloudSaves service
//!
//! The surface an API layer or the CLI talks to. Wires the engine to the
//! auto-save scheduler so every policy change re-arms the timer.

use crate::git::BootstrapOptions;
use crate::github::GithubClient;
use crate::saves::{
    ChangedFile, DeleteOutcome, LoadOutcome, OverwriteOutcome, ReinitOutcome, RenameOutcome, Save,
    SaveDescriptor, SaveEngine, SaveError, SaveResult, SaveStatus, StashApplyOutcome, StashCheck,
};
use crate::scheduler::AutoSaveScheduler;
use cloudsave_foundation::{ConfigStore, ConfigUpdate, Error, SafeConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct CloudSaves {
    engine: SaveEngine,
    scheduler: AutoSaveScheduler,
}

impl CloudSaves {
    pub fn new(data_dir: impl Into<PathBuf>, config: Arc<ConfigStore>) -> Self {
        Self::from_engine(SaveEngine::new(data_dir, config))
    }

    pub fn from_engine(engine: SaveEngine) -> Self {
        Self {
            scheduler: AutoSaveScheduler::new(engine.clone()),
            engine,
        }
    }

    pub fn with_bootstrap_options(self, options: BootstrapOptions) -> Self {
        Self::from_engine(self.engine.clone().with_bootstrap_options(options))
    }

    pub fn with_github(self, github: GithubClient) -> Self {
        Self::from_engine(self.engine.clone().with_github(github))
    }

    pub fn engine(&self) -> &SaveEngine {
        &self.engine
    }

    pub fn scheduler(&self) -> &AutoSaveScheduler {
        &self.scheduler
    }

    // ========================================================================
    // Saves
    // ========================================================================

    pub async fn create_save(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> SaveResult<SaveDescriptor> {
        self.engine.create_save(name, description).await
    }

    pub async fn list_saves(&self) -> SaveResult<Vec<Save>> {
        self.engine.list_saves().await
    }

    pub async fn load_save(&self, tag: &str) -> SaveResult<LoadOutcome> {
        self.engine.load_save(tag).await
    }

    pub async fn delete_save(&self, tag: &str) -> SaveResult<DeleteOutcome> {
        self.engine.delete_save(tag).await
    }

    pub async fn rename_save(
        &self,
        old_tag: &str,
        new_name: &str,
        description: Option<&str>,
    ) -> SaveResult<RenameOutcome> {
        self.engine.rename_save(old_tag, new_name, description).await
    }

    pub async fn overwrite_save(&self, tag: &str) -> SaveResult<OverwriteOutcome> {
        self.engine.overwrite_save(tag).await
    }

    pub async fn save_diff(&self, ref1: &str, ref2: &str) -> SaveResult<Vec<ChangedFile>> {
        self.engine.save_diff(ref1, ref2).await
    }

    pub async fn status(&self) -> SaveResult<SaveStatus> {
        self.engine.status().await
    }

    // ========================================================================
    // Safety stash
    // ========================================================================

    pub async fn check_temp_stash(&self) -> SaveResult<StashCheck> {
        self.engine.check_temp_stash().await
    }

    pub async fn apply_temp_stash(&self) -> SaveResult<StashApplyOutcome> {
        self.engine.apply_temp_stash().await
    }

    pub async fn discard_temp_stash(&self) -> SaveResult<()> {
        self.engine.discard_temp_stash().await
    }

    // ========================================================================
    // Config / authorization
    // ========================================================================

    /// Token-free view of the configuration
    pub fn config(&self) -> SaveResult<SafeConfig> {
        Ok(self.engine.config_store().load()?.safe_view())
    }

    /// Apply a partial update; re-arms auto-save when it touches its policy
    pub async fn update_config(&self, update: ConfigUpdate) -> SaveResult<SafeConfig> {
        let view = self
            .engine
            .config_store()
            .try_update(|c| -> SaveResult<SafeConfig> {
                update.apply(c).map_err(|e| match e {
                    Error::InvalidInput(msg) => SaveError::InvalidInput(msg),
                    other => other.into(),
                })?;
                Ok(c.safe_view())
            })?;
        info!("Configuration updated");

        if update.touches_auto_save() {
            self.scheduler.rearm().await;
        }
        Ok(view)
    }

    pub async fn authorize(&self, branch: Option<&str>) -> SaveResult<SafeConfig> {
        let result = self.engine.authorize(branch).await;
        self.scheduler.rearm().await;
        result
    }

    pub async fn reinitialize(&self) -> SaveResult<ReinitOutcome> {
        let result = self.engine.reinitialize().await;
        self.scheduler.rearm().await;
        result
    }

    // ========================================================================
    // Auto-save
    // ========================================================================

    /// Arm the scheduler from the stored policy; returns the period if armed
    pub async fn start_auto_save(&self) -> Option<Duration> {
        self.scheduler.rearm().await
    }

    pub async fn stop_auto_save(&self) {
        self.scheduler.stop().await
    }
}
