//! Saves - 세이브 관리
//!
//! - `tag` - 태그 이름 인코딩, 주석 sentinel
//! - `registry` - 세이브 목록 조회
//! - `engine` - create/load/delete/rename/overwrite/diff/status
//! - `stash` - 로드 전 안전 stash
//! - `lock` - 단일 작업 잠금

mod engine;
mod error;
mod lock;
mod registry;
mod stash;
pub mod tag;
mod types;

pub use engine::{
    OverwriteMode, ReinitOutcome, SaveEngine, AUTHORIZE_COMMIT_MESSAGE, REINIT_COMMIT_MESSAGE,
};
pub use error::{SaveError, SaveResult};
pub use lock::{OperationGuard, OperationKind, OperationLock};
pub use registry::SaveRegistry;
pub use stash::{StashManager, STASH_MARKER};
pub use types::{
    ChangeStatus, ChangedFile, DeleteOutcome, LoadOutcome, OverwriteOutcome, RenameOutcome, Save,
    SaveDescriptor, SaveStatus, StashApplyOutcome, StashCheck,
};
