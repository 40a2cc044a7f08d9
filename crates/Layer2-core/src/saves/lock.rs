//! Operation lock - 단일 슬롯 작업 잠금
//!
//! A name, not a queue: at most one operation runs against the repository at
//! a time and a second caller is turned away immediately.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Operation currently holding the lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Authorize,
    Reinitialize,
    ListSaves,
    CreateSave,
    LoadSave,
    DeleteSave,
    RenameSave,
    OverwriteSave,
    AutoSave,
    Diff,
    ApplyStash,
    DiscardStash,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authorize => "authorize",
            Self::Reinitialize => "reinitialize",
            Self::ListSaves => "list_saves",
            Self::CreateSave => "create_save",
            Self::LoadSave => "load_save",
            Self::DeleteSave => "delete_save",
            Self::RenameSave => "rename_save",
            Self::OverwriteSave => "overwrite_save",
            Self::AutoSave => "auto_save",
            Self::Diff => "diff",
            Self::ApplyStash => "apply_stash",
            Self::DiscardStash => "discard_stash",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process-wide single-slot lock; clones share the slot
#[derive(Debug, Clone, Default)]
pub struct OperationLock {
    slot: Arc<Mutex<Option<OperationKind>>>,
}

impl OperationLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot, or report who holds it
    pub fn try_acquire(&self, kind: OperationKind) -> Result<OperationGuard, OperationKind> {
        let mut slot = self.slot.lock();
        if let Some(current) = *slot {
            return Err(current);
        }
        *slot = Some(kind);
        debug!("Operation lock acquired: {}", kind);
        Ok(OperationGuard {
            slot: Arc::clone(&self.slot),
            kind,
        })
    }

    /// Name of the in-flight operation, if any
    pub fn current(&self) -> Option<OperationKind> {
        *self.slot.lock()
    }

    pub fn is_held(&self) -> bool {
        self.current().is_some()
    }
}

/// Releases the slot when dropped
#[derive(Debug)]
pub struct OperationGuard {
    slot: Arc<Mutex<Option<OperationKind>>>,
    kind: OperationKind,
}

impl OperationGuard {
    pub fn kind(&self) -> OperationKind {
        self.kind
    }
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        *self.slot.lock() = None;
        debug!("Operation lock released: {}", self.kind);
    }
}
