//! Save Config - 클라우드 저장 설정 레코드
//!
//! The only persisted state of the engine. JSON keys keep the historical
//! mixed naming (`repo_url`, `autoSaveEnabled`) so older files load unchanged.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 설정 파일명
pub const SAVE_CONFIG_FILE: &str = "config.json";

/// Branch used when none is configured
pub const DEFAULT_BRANCH: &str = "main";

/// Auto-save interval (minutes) used when none is configured
pub const DEFAULT_AUTO_SAVE_INTERVAL: f64 = 30.0;

/// Smallest interval the scheduler will arm with (minutes)
pub const MIN_AUTO_SAVE_INTERVAL: f64 = 1.0;

/// Largest accepted interval (minutes), one year
pub const MAX_AUTO_SAVE_INTERVAL: f64 = 525_600.0;

/// Finite, positive and at most [`MAX_AUTO_SAVE_INTERVAL`]
pub fn valid_auto_save_interval(minutes: f64) -> bool {
    minutes.is_finite() && minutes > 0.0 && minutes <= MAX_AUTO_SAVE_INTERVAL
}

// ============================================================================
// Pointers
// ============================================================================

/// Cache of the most recently created save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastSave {
    pub name: String,
    pub tag: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
}

/// The save most recently restored into the working tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentSave {
    pub tag: String,
    pub loaded_at: DateTime<Utc>,
}

// ============================================================================
// Save Config
// ============================================================================

/// Persisted engine configuration
///
/// Every field is defaulted independently, so a file written by an older
/// version (or trimmed by hand) still loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    /// 버전 (마이그레이션용)
    pub version: u32,

    pub repo_url: String,
    pub branch: String,
    pub username: Option<String>,
    pub github_token: String,
    pub display_name: String,
    pub is_authorized: bool,

    pub last_save: Option<LastSave>,
    pub current_save: Option<CurrentSave>,
    pub has_temp_stash: bool,

    #[serde(rename = "autoSaveEnabled")]
    pub auto_save_enabled: bool,

    /// Minutes between auto-saves
    #[serde(rename = "autoSaveInterval")]
    pub auto_save_interval: f64,

    #[serde(rename = "autoSaveTargetTag")]
    pub auto_save_target_tag: String,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            version: 1,
            repo_url: String::new(),
            branch: DEFAULT_BRANCH.to_string(),
            username: None,
            github_token: String::new(),
            display_name: String::new(),
            is_authorized: false,
            last_save: None,
            current_save: None,
            has_temp_stash: false,
            auto_save_enabled: false,
            auto_save_interval: DEFAULT_AUTO_SAVE_INTERVAL,
            auto_save_target_tag: String::new(),
        }
    }
}

impl SaveConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill values that deserialize fine but are unusable
    pub fn normalize(&mut self) {
        if self.branch.trim().is_empty() {
            self.branch = DEFAULT_BRANCH.to_string();
        }
        if !valid_auto_save_interval(self.auto_save_interval) {
            self.auto_save_interval = DEFAULT_AUTO_SAVE_INTERVAL;
        }
    }

    pub fn has_token(&self) -> bool {
        !self.github_token.is_empty()
    }

    /// Interval the scheduler actually uses, clamped to the accepted range
    pub fn effective_auto_save_interval(&self) -> f64 {
        if self.auto_save_interval.is_nan() {
            return DEFAULT_AUTO_SAVE_INTERVAL;
        }
        self.auto_save_interval
            .clamp(MIN_AUTO_SAVE_INTERVAL, MAX_AUTO_SAVE_INTERVAL)
    }

    /// Whether the auto-save policy allows the scheduler to run
    pub fn auto_save_armed(&self) -> bool {
        self.is_authorized && self.auto_save_enabled && !self.auto_save_target_tag.is_empty()
    }

    /// Token-free view for callers
    pub fn safe_view(&self) -> SafeConfig {
        SafeConfig {
            repo_url: self.repo_url.clone(),
            display_name: self.display_name.clone(),
            branch: self.branch.clone(),
            is_authorized: self.is_authorized,
            username: self.username.clone(),
            auto_save_enabled: self.auto_save_enabled,
            auto_save_interval: self.auto_save_interval,
            auto_save_target_tag: self.auto_save_target_tag.clone(),
            has_github_token: self.has_token(),
        }
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn github_token(mut self, token: impl Into<String>) -> Self {
        self.github_token = token.into();
        self
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }
}

// ============================================================================
// Safe view
// ============================================================================

/// Config as exposed to callers; the credential is reduced to a presence flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafeConfig {
    pub repo_url: String,
    pub display_name: String,
    pub branch: String,
    pub is_authorized: bool,
    pub username: Option<String>,
    #[serde(rename = "autoSaveEnabled")]
    pub auto_save_enabled: bool,
    #[serde(rename = "autoSaveInterval")]
    pub auto_save_interval: f64,
    #[serde(rename = "autoSaveTargetTag")]
    pub auto_save_target_tag: String,
    pub has_github_token: bool,
}

// ============================================================================
// Partial update
// ============================================================================

/// Partial config update; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigUpdate {
    pub repo_url: Option<String>,
    /// Only replaces the stored token when non-empty
    pub github_token: Option<String>,
    pub display_name: Option<String>,
    pub branch: Option<String>,
    pub is_authorized: Option<bool>,
    #[serde(rename = "autoSaveEnabled")]
    pub auto_save_enabled: Option<bool>,
    #[serde(rename = "autoSaveInterval")]
    pub auto_save_interval: Option<f64>,
    #[serde(rename = "autoSaveTargetTag")]
    pub auto_save_target_tag: Option<String>,
}

impl ConfigUpdate {
    /// Whether this update touches anything the auto-save scheduler depends on
    pub fn touches_auto_save(&self) -> bool {
        self.is_authorized.is_some()
            || self.auto_save_enabled.is_some()
            || self.auto_save_interval.is_some()
            || self.auto_save_target_tag.is_some()
    }

    /// Validate and apply onto `config`; nothing is applied on error
    pub fn apply(&self, config: &mut SaveConfig) -> Result<()> {
        if let Some(interval) = self.auto_save_interval {
            if !valid_auto_save_interval(interval) {
                return Err(Error::InvalidInput(format!(
                    "auto-save interval must be greater than 0 and at most {} minutes, got {}",
                    MAX_AUTO_SAVE_INTERVAL, interval
                )));
            }
        }

        if let Some(url) = &self.repo_url {
            config.repo_url = url.trim().to_string();
        }
        if let Some(token) = self.github_token.as_deref().filter(|t| !t.is_empty()) {
            config.github_token = token.to_string();
        }
        if let Some(name) = &self.display_name {
            config.display_name = name.trim().to_string();
        }
        if let Some(branch) = &self.branch {
            let branch = branch.trim();
            config.branch = if branch.is_empty() {
                DEFAULT_BRANCH.to_string()
            } else {
                branch.to_string()
            };
        }
        if let Some(authorized) = self.is_authorized {
            config.is_authorized = authorized;
        }
        if let Some(enabled) = self.auto_save_enabled {
            config.auto_save_enabled = enabled;
        }
        if let Some(interval) = self.auto_save_interval {
            config.auto_save_interval = interval;
        }
        if let Some(tag) = &self.auto_save_target_tag {
            config.auto_save_target_tag = tag.trim().to_string();
        }
        Ok(())
    }
}
