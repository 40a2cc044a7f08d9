//! cloudsave-core: git-backed save engine
//!
//! Layer2 - 세이브 엔진 레이어
//!
//! # 주요 모듈
//!
//! - `git`: git 바이너리 래퍼, remote 설정, 저장소 bootstrap
//! - `saves`: 세이브 생성/로드/삭제/이름변경/덮어쓰기/diff, 안전 stash, 작업 잠금
//! - `scheduler`: 자동 저장 타이머
//! - `github`: GitHub 사용자 조회
//! - `service`: `CloudSaves` 파사드
//!
//! # 사용 예시
//!
//! ```ignore
//! use cloudsave_core::CloudSaves;
//! use cloudsave_foundation::ConfigStore;
//!
//! let saves = CloudSaves::new("/srv/data", Arc::new(ConfigStore::global()?));
//! saves.authorize(None).await?;
//!
//! let save = saves.create_save("Chapter 1", None).await?;
//! saves.load_save(&save.tag).await?;
//! ```

pub mod git;
pub mod github;
pub mod saves;
pub mod scheduler;
pub mod service;

// Re-exports: Git
pub use git::{GitError, GitOps, EMPTY_TREE};

// Re-exports: Saves
pub use saves::{
    ChangeStatus, ChangedFile, DeleteOutcome, LoadOutcome, OperationKind, OperationLock,
    OverwriteOutcome, ReinitOutcome, RenameOutcome, Save, SaveDescriptor, SaveEngine, SaveError,
    SaveResult, SaveStatus, StashApplyOutcome, StashCheck,
};

// Re-exports: Scheduler / Service
pub use github::GithubClient;
pub use scheduler::{AutoSaveScheduler, TickOutcome};
pub use service::CloudSaves;
