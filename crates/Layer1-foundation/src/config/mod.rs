//! Config - 설정 관리
//!
//! - `save.rs` - SaveConfig 레코드, 부분 업데이트, 안전한 뷰
//! - `store.rs` - ConfigStore (JSON 영속화)

mod save;
mod store;

pub use save::{
    ConfigUpdate, CurrentSave, LastSave, SafeConfig, SaveConfig, DEFAULT_AUTO_SAVE_INTERVAL,
    DEFAULT_BRANCH, MAX_AUTO_SAVE_INTERVAL, MIN_AUTO_SAVE_INTERVAL, SAVE_CONFIG_FILE,
};
pub use store::ConfigStore;
