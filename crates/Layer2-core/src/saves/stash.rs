//! Safety-Stash Manager
//!
//! Uncommitted work is stashed before a load replaces the working tree. The
//! entry is found again by its marker message, never by a remembered index,
//! since other stash operations shift positions.

use super::error::{GitContext, SaveError, SaveResult};
use super::types::{StashApplyOutcome, StashCheck};
use crate::git::{GitOps, StashEntry};
use cloudsave_foundation::ConfigStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Message identifying the safety stash
pub const STASH_MARKER: &str = "Temporary stash before loading save";

#[derive(Debug, Clone)]
pub struct StashManager {
    git: GitOps,
    config: Arc<ConfigStore>,
}

impl StashManager {
    pub fn new(git: GitOps, config: Arc<ConfigStore>) -> Self {
        Self { git, config }
    }

    /// Stash local changes (untracked included); `false` when there were none
    pub async fn create(&self) -> SaveResult<bool> {
        let created = self
            .git
            .stash_push(STASH_MARKER)
            .await
            .context("stash local changes")?;
        if created {
            info!("Stashed local changes before load");
        }
        Ok(created)
    }

    /// Locate the safety stash by its marker
    pub async fn find(&self) -> SaveResult<Option<StashEntry>> {
        let entries = self.git.stash_list().await.context("list stashes")?;
        Ok(entries.into_iter().find(|e| e.message.contains(STASH_MARKER)))
    }

    /// Reconcile the persisted flag against the actual stash list
    pub async fn check(&self) -> SaveResult<StashCheck> {
        let flagged = self.config.load()?.has_temp_stash;
        if !flagged {
            return Ok(StashCheck::default());
        }

        match self.find().await {
            Ok(Some(_)) => Ok(StashCheck {
                exists: true,
                error: None,
            }),
            Ok(None) => {
                warn!("Temp stash flagged but no stash entry found, clearing flag");
                self.set_flag(false)?;
                Ok(StashCheck::default())
            }
            Err(e) => Ok(StashCheck {
                exists: true,
                error: Some(e.to_string()),
            }),
        }
    }

    /// Apply the safety stash, then drop it
    pub async fn apply(&self) -> SaveResult<StashApplyOutcome> {
        let entry = self.require_entry().await?;

        self.git
            .stash_apply(&entry.reference)
            .await
            .context("apply temporary stash")?;
        info!("Applied temporary stash {}", entry.reference);

        let warning = match self.git.stash_drop(&entry.reference).await {
            Ok(()) => None,
            Err(e) => {
                warn!("Applied stash but failed to drop it: {}", e);
                Some(format!(
                    "Stash applied but could not be dropped ({}); remove it manually",
                    e
                ))
            }
        };

        self.set_flag(false)?;
        Ok(StashApplyOutcome { warning })
    }

    /// Drop the safety stash without applying it
    pub async fn discard(&self) -> SaveResult<()> {
        if !self.config.load()?.has_temp_stash {
            return Err(SaveError::NotFound("no temporary stash recorded".into()));
        }

        match self.find().await? {
            Some(entry) => {
                self.git
                    .stash_drop(&entry.reference)
                    .await
                    .context("discard temporary stash")?;
                info!("Discarded temporary stash {}", entry.reference);
            }
            None => info!("Temporary stash already gone"),
        }

        self.set_flag(false)?;
        Ok(())
    }

    /// Pop the safety stash after a failed load
    pub async fn restore(&self) -> SaveResult<()> {
        let entry = self
            .find()
            .await?
            .ok_or_else(|| SaveError::NotFound("temporary stash".into()))?;
        self.git
            .stash_pop(&entry.reference)
            .await
            .context("restore temporary stash")?;
        self.set_flag(false)?;
        Ok(())
    }

    pub(crate) fn set_flag(&self, value: bool) -> SaveResult<()> {
        self.config.update(|c| c.has_temp_stash = value)?;
        Ok(())
    }

    async fn require_entry(&self) -> SaveResult<StashEntry> {
        if !self.config.load()?.has_temp_stash {
            return Err(SaveError::NotFound("no temporary stash recorded".into()));
        }
        match self.find().await? {
            Some(entry) => Ok(entry),
            None => {
                self.set_flag(false)?;
                Err(SaveError::NotFound(
                    "temporary stash entry not found; flag cleared".into(),
                ))
            }
        }
    }
}
