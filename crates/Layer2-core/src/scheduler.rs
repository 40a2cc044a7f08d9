//! Auto-Save Scheduler
//!
//! One background task that periodically overwrites the configured target
//! save. It goes through the same operation lock as foreground calls and
//! skips a tick outright when the lock is held; there is no catch-up.

use crate::saves::{OverwriteOutcome, SaveEngine, SaveError};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// Outcome of a single scheduler tick
#[derive(Debug)]
pub enum TickOutcome {
    /// Another operation held the lock
    Skipped,
    /// Not authorized, disabled, or no target
    NotArmed,
    Saved(OverwriteOutcome),
    Failed(SaveError),
}

pub struct AutoSaveScheduler {
    engine: SaveEngine,
    handle: RwLock<Option<JoinHandle<()>>>,
}

impl AutoSaveScheduler {
    pub fn new(engine: SaveEngine) -> Self {
        Self {
            engine,
            handle: RwLock::new(None),
        }
    }

    /// Stop any running timer and start a new one if the policy allows
    ///
    /// Returns the armed period.
    pub async fn rearm(&self) -> Option<Duration> {
        self.stop().await;

        let config = match self.engine.config_store().load() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to read config before arming auto-save: {}", e);
                return None;
            }
        };
        if !config.auto_save_armed() {
            info!("Auto-save not started (unauthorized, disabled or no target)");
            return None;
        }

        let minutes = config.effective_auto_save_interval();
        let period = match Duration::try_from_secs_f64(minutes * 60.0) {
            Ok(period) => period,
            Err(e) => {
                error!("Invalid auto-save interval {} minutes: {}", minutes, e);
                return None;
            }
        };
        info!(
            "Auto-save every {} minutes, target {}",
            minutes, config.auto_save_target_tag
        );

        let engine = self.engine.clone();
        let handle = tokio::spawn(async move {
            let mut timer = interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                timer.tick().await;
                log_tick(run_tick(&engine).await);
            }
        });

        *self.handle.write().await = Some(handle);
        Some(period)
    }

    /// Stop the timer
    pub async fn stop(&self) {
        if let Some(handle) = self.handle.write().await.take() {
            debug!("Stopping auto-save timer");
            handle.abort();
        }
    }

    pub async fn is_running(&self) -> bool {
        self.handle
            .read()
            .await
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Run one tick now
    pub async fn tick(&self) -> TickOutcome {
        run_tick(&self.engine).await
    }
}

async fn run_tick(engine: &SaveEngine) -> TickOutcome {
    if engine.lock().is_held() {
        return TickOutcome::Skipped;
    }
    match engine.auto_save().await {
        Ok(Some(outcome)) => TickOutcome::Saved(outcome),
        Ok(None) => TickOutcome::NotArmed,
        Err(SaveError::Busy(_)) => TickOutcome::Skipped,
        Err(e) => TickOutcome::Failed(e),
    }
}

fn log_tick(outcome: TickOutcome) {
    match outcome {
        TickOutcome::Skipped => info!("Skipping auto-save, another operation is in progress"),
        TickOutcome::NotArmed => debug!("Auto-save conditions not met"),
        TickOutcome::Saved(saved) => info!("Auto-saved {}", saved.tag),
        TickOutcome::Failed(e) => error!("Auto-save failed: {}", e),
    }
}

impl Drop for AutoSaveScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.get_mut().take() {
            handle.abort();
        }
    }
}
