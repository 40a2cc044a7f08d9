//! # cloudsave-foundation
//!
//! Foundation layer for CloudSave:
//! - Config: 영속 설정 레코드 (SaveConfig, ConfigStore)
//! - Storage: JsonStore (범용)
//! - Error: 공통 에러 타입

pub mod config;
pub mod error;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{
    ConfigStore, ConfigUpdate, CurrentSave, LastSave, SafeConfig, SaveConfig,
    DEFAULT_AUTO_SAVE_INTERVAL, DEFAULT_BRANCH, MAX_AUTO_SAVE_INTERVAL, MIN_AUTO_SAVE_INTERVAL,
    SAVE_CONFIG_FILE,
};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::JsonStore;
