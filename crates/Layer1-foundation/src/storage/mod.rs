//! Storage module for CloudSave
//!
//! - `json`: JSON - 범용 파일 저장/로드

mod json;

// JSON Storage (범용)
pub use json::JsonStore;
