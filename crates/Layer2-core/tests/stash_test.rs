//! 안전 stash 통합 테스트

mod common;

use cloudsave_core::saves::STASH_MARKER;
use cloudsave_core::SaveError;
use common::{git, Fixture};

/// Save "base" with notes v1, then leave notes at v2 plus an untracked file
async fn dirty_after_save(fx: &Fixture) -> String {
    fx.write("notes.txt", "v1");
    let created = fx.saves.create_save("base", None).await.unwrap();
    fx.write("notes.txt", "v2");
    fx.write("scratch/untracked.txt", "keep me");
    created.tag
}

#[tokio::test]
async fn test_load_dirty_tree_stashes() {
    let fx = Fixture::authorized().await;
    let tag = dirty_after_save(&fx).await;

    let outcome = fx.saves.load_save(&tag).await.unwrap();
    assert!(outcome.stash_created);
    assert_eq!(fx.read("notes.txt"), "v1");
    assert!(!fx.data.join("scratch/untracked.txt").exists());

    let stashes = git(&fx.data, &["stash", "list"]);
    assert!(stashes.contains(STASH_MARKER));

    let check = fx.saves.check_temp_stash().await.unwrap();
    assert!(check.exists);
    assert!(fx.saves.status().await.unwrap().temp_stash);
}

#[tokio::test]
async fn test_apply_restores_changes() {
    let fx = Fixture::authorized().await;
    let tag = dirty_after_save(&fx).await;
    fx.saves.load_save(&tag).await.unwrap();

    let applied = fx.saves.apply_temp_stash().await.unwrap();
    assert!(applied.warning.is_none());
    assert_eq!(fx.read("notes.txt"), "v2");
    assert_eq!(fx.read("scratch/untracked.txt"), "keep me");

    assert!(!fx.saves.check_temp_stash().await.unwrap().exists);
    assert!(git(&fx.data, &["stash", "list"]).is_empty());

    // nothing left to apply
    let err = fx.saves.apply_temp_stash().await.unwrap_err();
    assert!(matches!(err, SaveError::NotFound(_)));
}

#[tokio::test]
async fn test_discard_drops_stash() {
    let fx = Fixture::authorized().await;
    let tag = dirty_after_save(&fx).await;
    fx.saves.load_save(&tag).await.unwrap();

    fx.saves.discard_temp_stash().await.unwrap();
    assert_eq!(fx.read("notes.txt"), "v1");
    assert!(git(&fx.data, &["stash", "list"]).is_empty());
    assert!(!fx.config.load().unwrap().has_temp_stash);

    let err = fx.saves.discard_temp_stash().await.unwrap_err();
    assert!(matches!(err, SaveError::NotFound(_)));
}

#[tokio::test]
async fn test_stale_flag_is_cleared() {
    let fx = Fixture::authorized().await;
    fx.config.update(|c| c.has_temp_stash = true).unwrap();

    let check = fx.saves.check_temp_stash().await.unwrap();
    assert!(!check.exists);
    assert!(!fx.config.load().unwrap().has_temp_stash);
}

#[tokio::test]
async fn test_apply_with_stale_flag_not_found() {
    let fx = Fixture::authorized().await;
    fx.config.update(|c| c.has_temp_stash = true).unwrap();

    let err = fx.saves.apply_temp_stash().await.unwrap_err();
    assert!(matches!(err, SaveError::NotFound(_)));
    assert!(!fx.config.load().unwrap().has_temp_stash);
}

#[tokio::test]
async fn test_discard_with_stale_flag_succeeds() {
    let fx = Fixture::authorized().await;
    fx.config.update(|c| c.has_temp_stash = true).unwrap();

    fx.saves.discard_temp_stash().await.unwrap();
    assert!(!fx.config.load().unwrap().has_temp_stash);
}

#[tokio::test]
async fn test_failed_load_restores_stash() {
    let fx = Fixture::authorized().await;
    fx.write("notes.txt", "v1");
    fx.saves.create_save("base", None).await.unwrap();
    fx.write("notes.txt", "v2");

    // a tag that exists but points at a blob, so it cannot be checked out
    let blob = git(&fx.data, &["hash-object", "-w", "notes.txt"]);
    git(
        &fx.data,
        &["tag", "-a", "-m", "bogus", "save_1_YnJva2Vu", &blob],
    );

    let err = fx.saves.load_save("save_1_YnJva2Vu").await.unwrap_err();
    assert!(matches!(err, SaveError::Git { .. }));
    assert_eq!(fx.read("notes.txt"), "v2");
    assert!(git(&fx.data, &["stash", "list"]).is_empty());
    assert!(!fx.config.load().unwrap().has_temp_stash);
}
