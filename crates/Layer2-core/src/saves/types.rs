//! Save types returned to callers

use chrono::{DateTime, Utc};
use cloudsave_foundation::CurrentSave;
use serde::{Deserialize, Serialize};

// ============================================================================
// Saves
// ============================================================================

/// A save as listed from the tag namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Save {
    pub name: String,
    pub tag: String,
    pub commit: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub creator: String,
}

/// Result of creating a save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDescriptor {
    pub name: String,
    pub tag: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    /// Commit created for this save; `None` when the tree was unchanged
    pub commit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadOutcome {
    pub stash_created: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    /// Remote deletion failed; the local tag is gone
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameOutcome {
    pub old_tag: String,
    pub new_tag: String,
    pub new_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverwriteOutcome {
    pub tag: String,
    pub commit: String,
    /// Whether a new commit was made (false: the tag moved to HEAD as-is)
    pub committed: bool,
}

// ============================================================================
// Diff
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
    TypeChanged,
}

impl ChangeStatus {
    /// Map a `--name-status` letter; unknown letters count as modified
    pub fn from_code(code: char) -> Self {
        match code {
            'A' => Self::Added,
            'D' => Self::Deleted,
            'R' => Self::Renamed,
            'C' => Self::Copied,
            'T' => Self::TypeChanged,
            _ => Self::Modified,
        }
    }

    /// Whether the entry carries a source path
    pub fn has_source(&self) -> bool {
        matches!(self, Self::Renamed | Self::Copied)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangedFile {
    pub status: ChangeStatus,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_path: Option<String>,
}

// ============================================================================
// Status
// ============================================================================

/// Snapshot of the working tree and save pointers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveStatus {
    pub initialized: bool,
    /// Porcelain lines, e.g. `?? notes.txt`
    pub changes: Vec<String>,
    pub current_branch: Option<String>,
    pub current_save: Option<CurrentSave>,
    pub is_detached: bool,
    pub ahead: u32,
    pub behind: u32,
    pub temp_stash: bool,
}

/// Result of a safety-stash presence check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StashCheck {
    pub exists: bool,
    /// Set when the stash list could not be read and the flag was trusted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of applying the safety stash
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StashApplyOutcome {
    /// Applied, but the entry could not be dropped
    pub warning: Option<String>,
}
