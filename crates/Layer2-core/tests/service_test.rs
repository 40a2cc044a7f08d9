//! 설정/자동 저장/재초기화 통합 테스트

mod common;

use cloudsave_core::{SaveError, TickOutcome};
use cloudsave_foundation::{ConfigUpdate, DEFAULT_AUTO_SAVE_INTERVAL};
use common::{git, Fixture};

#[tokio::test]
async fn test_update_config_rejects_bad_interval() {
    let fx = Fixture::new();
    let update = ConfigUpdate {
        auto_save_interval: Some(0.0),
        display_name: Some("ignored".into()),
        ..Default::default()
    };

    let err = fx.saves.update_config(update).await.unwrap_err();
    assert!(matches!(err, SaveError::InvalidInput(_)));
    // nothing applied
    assert_eq!(fx.config.load().unwrap().display_name, "");
}

#[tokio::test]
async fn test_update_config_rejects_huge_interval() {
    let fx = Fixture::authorized().await;
    let created = fx.saves.create_save("Auto", None).await.unwrap();

    let err = fx
        .saves
        .update_config(ConfigUpdate {
            auto_save_enabled: Some(true),
            auto_save_interval: Some(1e18),
            auto_save_target_tag: Some(created.tag),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SaveError::InvalidInput(_)));
    assert!(!fx.saves.scheduler().is_running().await);

    let config = fx.config.load().unwrap();
    assert_eq!(config.auto_save_interval, DEFAULT_AUTO_SAVE_INTERVAL);
    assert!(!config.auto_save_enabled);
    assert!(fx.saves.start_auto_save().await.is_none());
}

#[tokio::test]
async fn test_update_config_keeps_token_when_blank() {
    let fx = Fixture::new();
    fx.config.update(|c| c.github_token = "ghp_secret".into()).unwrap();

    let view = fx
        .saves
        .update_config(ConfigUpdate {
            github_token: Some(String::new()),
            branch: Some("  ".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(view.has_github_token);
    assert_eq!(view.branch, "main");
    assert_eq!(fx.config.load().unwrap().github_token, "ghp_secret");
}

#[tokio::test]
async fn test_auto_save_arms_only_when_configured() {
    let fx = Fixture::authorized().await;
    assert!(fx.saves.start_auto_save().await.is_none());
    assert!(!fx.saves.scheduler().is_running().await);

    let created = fx.saves.create_save("Auto", None).await.unwrap();
    fx.saves
        .update_config(ConfigUpdate {
            auto_save_enabled: Some(true),
            auto_save_interval: Some(5.0),
            auto_save_target_tag: Some(created.tag.clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(fx.saves.scheduler().is_running().await);

    fx.saves.stop_auto_save().await;
    assert!(!fx.saves.scheduler().is_running().await);
}

#[tokio::test]
async fn test_tick_overwrites_target() {
    let fx = Fixture::authorized().await;
    let created = fx.saves.create_save("Auto", Some("kept")).await.unwrap();
    fx.config
        .update(|c| {
            c.auto_save_enabled = true;
            c.auto_save_target_tag = created.tag.clone();
        })
        .unwrap();

    fx.write("notes.txt", "autosaved");
    match fx.saves.scheduler().tick().await {
        TickOutcome::Saved(outcome) => {
            assert!(outcome.committed);
            assert_eq!(outcome.tag, created.tag);
        }
        other => panic!("expected a save, got {:?}", other),
    }

    let message = git(&fx.data, &["log", "-1", "--format=%s"]);
    assert_eq!(message, format!("Auto Save Overwrite: {}", created.tag));

    let saves = fx.saves.list_saves().await.unwrap();
    assert_eq!(saves[0].description, "kept");
}

#[tokio::test]
async fn test_tick_not_armed_when_disabled() {
    let fx = Fixture::authorized().await;
    assert!(matches!(
        fx.saves.scheduler().tick().await,
        TickOutcome::NotArmed
    ));
}

#[tokio::test]
async fn test_authorize_requires_repo_url() {
    let fx = Fixture::new();
    fx.config.update(|c| c.repo_url.clear()).unwrap();

    let err = fx.saves.authorize(None).await.unwrap_err();
    assert!(matches!(err, SaveError::InvalidInput(_)));
    assert!(!fx.config.load().unwrap().is_authorized);
}

#[tokio::test]
async fn test_authorize_unreachable_remote() {
    let fx = Fixture::new();
    fx.config
        .update(|c| c.repo_url = "/nonexistent/remote.git".into())
        .unwrap();

    let err = fx.saves.authorize(None).await.unwrap_err();
    assert!(matches!(err, SaveError::Remote(_)));
    assert!(!fx.config.load().unwrap().is_authorized);
}

#[tokio::test]
async fn test_reinitialize_resets_repository() {
    let fx = Fixture::authorized().await;
    let created = fx.saves.create_save("old", None).await.unwrap();
    fx.saves.load_save(&created.tag).await.unwrap();

    let outcome = fx.saves.reinitialize().await.unwrap();
    assert!(outcome.remote_warning.is_none());

    assert!(fx.local_tags().is_empty());
    let origin = git(&fx.data, &["remote", "get-url", "origin"]);
    assert_eq!(origin, fx.remote.to_string_lossy());

    let config = fx.config.load().unwrap();
    assert!(config.current_save.is_none());
    assert!(!config.has_temp_stash);

    // saves remain on the remote and come back on the next listing
    let saves = fx.saves.list_saves().await.unwrap();
    assert_eq!(saves.len(), 1);
    assert_eq!(saves[0].tag, created.tag);
}
