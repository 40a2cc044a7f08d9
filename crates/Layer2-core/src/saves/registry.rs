//! Save Registry
//!
//! Enumerates saves from the tag namespace after syncing tags from `origin`.

use super::error::{GitContext, SaveResult};
use super::tag::{self, TAG_PATTERN};
use super::types::Save;
use crate::git::{GitOps, ORIGIN};
use chrono::{DateTime, TimeZone, Utc};
use tracing::{debug, warn};

const FIELD_SEP: char = '\u{0}';
const RECORD_SEP: char = '\u{1e}';

/// short name, peeled commit, creation date, tagger, subject, full message
const LIST_FORMAT: &str = "%(refname:strip=2)%00%(*objectname)%00%(creatordate:iso-strict)%00%(taggername)%00%(subject)%00%(contents)%1e";

/// Read-side view over the save tags of one repository
#[derive(Debug, Clone)]
pub struct SaveRegistry {
    git: GitOps,
}

impl SaveRegistry {
    pub fn new(git: GitOps) -> Self {
        Self { git }
    }

    /// Pull every tag from `origin`, pruning ones deleted remotely
    pub async fn sync_tags(&self) -> SaveResult<()> {
        if self.git.remote_url(ORIGIN).await.is_none() {
            debug!("No {} remote configured, listing local tags only", ORIGIN);
            return Ok(());
        }
        self.git
            .fetch(&[ORIGIN, "--tags", "--force", "--prune", "--prune-tags"])
            .await
            .context("fetch tags from remote")
    }

    /// Sync, then list every save, newest first
    pub async fn list(&self) -> SaveResult<Vec<Save>> {
        self.sync_tags().await?;
        self.list_local().await
    }

    /// List saves from local tags without touching the remote
    pub async fn list_local(&self) -> SaveResult<Vec<Save>> {
        let output = self
            .git
            .list_tags(TAG_PATTERN, LIST_FORMAT)
            .await
            .context("list save tags")?;

        let saves: Vec<Save> = output
            .split(RECORD_SEP)
            .map(|r| r.trim_start_matches(['\n', '\r']))
            .filter(|r| !r.is_empty())
            .filter_map(parse_record)
            .collect();

        debug!("Found {} saves", saves.len());
        Ok(saves)
    }
}

fn parse_record(record: &str) -> Option<Save> {
    let mut fields = record.splitn(6, FIELD_SEP);
    let tag = fields.next()?.trim().to_string();
    let commit = fields.next().map(str::trim).filter(|c| !c.is_empty());
    let created = fields.next().unwrap_or_default().trim();
    let tagger = fields.next().unwrap_or_default().trim();
    let subject = fields.next().unwrap_or_default().trim();
    let contents = fields.next().unwrap_or_default();

    let Some(parsed) = tag::parse_tag(&tag) else {
        warn!("Skipping tag outside the save namespace: {}", tag);
        return None;
    };

    let created_at = DateTime::parse_from_rfc3339(created)
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| Utc.timestamp_millis_opt(parsed.millis).single())
        .unwrap_or_else(Utc::now);

    let annotation = tag::parse_annotation(contents);
    let description = if annotation.description.is_empty() {
        subject.to_string()
    } else {
        annotation.description
    };

    Some(Save {
        name: parsed.name,
        commit: commit.map(str::to_string),
        description,
        created_at,
        updated_at: annotation.updated_at.unwrap_or(created_at),
        creator: if tagger.is_empty() {
            "unknown".to_string()
        } else {
            tagger.to_string()
        },
        tag,
    })
}
