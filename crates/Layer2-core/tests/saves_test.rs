//! 세이브 라이프사이클 통합 테스트
//!
//! `cargo test -p cloudsave-core --test saves_test`

mod common;

use chrono::Utc;
use cloudsave_core::saves::tag;
use cloudsave_core::{ChangeStatus, GitOps, OperationKind, SaveError, EMPTY_TREE};
use common::{git, Fixture};

#[tokio::test]
async fn test_authorize_pushes_branch() {
    let fx = Fixture::authorized().await;

    let config = fx.saves.config().unwrap();
    assert!(config.is_authorized);
    assert_eq!(config.branch, "main");
    assert!(!config.has_github_token);

    let heads = git(&fx.remote, &["branch", "--list", "main"]);
    assert!(heads.contains("main"));
    assert!(fx.data.join(".gitignore").exists());

    let status = fx.saves.status().await.unwrap();
    assert!(status.initialized);
    assert_eq!(status.current_branch.as_deref(), Some("main"));
    assert!(!status.is_detached);
    assert!(status.changes.is_empty());
}

#[tokio::test]
async fn test_create_then_list() {
    let fx = Fixture::authorized().await;
    fx.write("default-user/chats/hero.jsonl", "{\"turn\":2}\n");

    let before = Utc::now();
    let created = fx.saves.create_save("Chapter 1", None).await.unwrap();

    assert_eq!(created.name, "Chapter 1");
    assert_eq!(created.description, "Save: Chapter 1");
    assert!(created.commit.is_some());
    assert!(fx.remote_tags().contains(&created.tag));

    let saves = fx.saves.list_saves().await.unwrap();
    assert_eq!(saves.len(), 1);
    let save = &saves[0];
    assert_eq!(save.tag, created.tag);
    assert_eq!(save.name, "Chapter 1");
    assert_eq!(save.description, "Save: Chapter 1");
    assert!((save.created_at - before).num_seconds().abs() < 60);
    assert_ne!(save.creator, "");

    let last = fx.config.load().unwrap().last_save.unwrap();
    assert_eq!(last.tag, created.tag);
}

#[tokio::test]
async fn test_create_without_changes_still_tags() {
    let fx = Fixture::authorized().await;

    let created = fx
        .saves
        .create_save("第一章 / start", Some("clean tree"))
        .await
        .unwrap();
    assert!(created.commit.is_none());

    let saves = fx.saves.list_saves().await.unwrap();
    assert_eq!(saves.len(), 1);
    assert_eq!(saves[0].name, "第一章 / start");
    assert_eq!(saves[0].description, "clean tree");
}

#[tokio::test]
async fn test_create_rolls_back_tag_on_push_failure() {
    let fx = Fixture::authorized().await;
    GitOps::new(&fx.data)
        .set_remote_url("origin", "/nonexistent/remote.git")
        .await
        .unwrap();

    let err = fx.saves.create_save("doomed", None).await.unwrap_err();
    assert!(matches!(err, SaveError::Git { .. }));
    assert!(fx.local_tags().is_empty());
    assert!(fx.config.load().unwrap().last_save.is_none());
}

#[tokio::test]
async fn test_empty_name_rejected() {
    let fx = Fixture::authorized().await;
    let err = fx.saves.create_save("   ", None).await.unwrap_err();
    assert!(matches!(err, SaveError::InvalidInput(_)));
}

#[tokio::test]
async fn test_concurrent_calls_busy() {
    let fx = Fixture::authorized().await;

    let (first, second) = tokio::join!(
        fx.saves.create_save("one", None),
        fx.saves.create_save("two", None)
    );

    assert!(first.is_ok());
    match second {
        Err(SaveError::Busy(kind)) => assert_eq!(kind, OperationKind::CreateSave),
        other => panic!("expected busy, got {:?}", other),
    }
    assert!(!fx.saves.engine().lock().is_held());
}

#[tokio::test]
async fn test_load_detaches_at_save() {
    let fx = Fixture::authorized().await;
    fx.write("notes.txt", "v1");
    let first = fx.saves.create_save("first", None).await.unwrap();
    fx.write("notes.txt", "v2");
    fx.saves.create_save("second", None).await.unwrap();

    let outcome = fx.saves.load_save(&first.tag).await.unwrap();
    assert!(!outcome.stash_created);
    assert_eq!(fx.read("notes.txt"), "v1");

    let status = fx.saves.status().await.unwrap();
    assert!(status.is_detached);
    assert!(status.current_branch.is_none());
    assert_eq!(status.current_save.unwrap().tag, first.tag);
}

#[tokio::test]
async fn test_load_missing_tag() {
    let fx = Fixture::authorized().await;
    let err = fx.saves.load_save("save_1_bm9wZQ").await.unwrap_err();
    assert!(matches!(err, SaveError::NotFound(_)));
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let fx = Fixture::authorized().await;
    let created = fx.saves.create_save("temp", None).await.unwrap();
    fx.saves.load_save(&created.tag).await.unwrap();

    let outcome = fx.saves.delete_save(&created.tag).await.unwrap();
    assert!(outcome.warning.is_none());
    assert!(!fx.remote_tags().contains(&created.tag));
    assert!(fx.config.load().unwrap().current_save.is_none());

    let again = fx.saves.delete_save(&created.tag).await.unwrap();
    assert!(again.warning.is_none());
    assert!(fx.saves.list_saves().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rename_same_name_keeps_tag() {
    let fx = Fixture::authorized().await;
    let created = fx.saves.create_save("Boss", None).await.unwrap();
    let before = fx.saves.list_saves().await.unwrap().remove(0);

    let renamed = fx
        .saves
        .rename_save(&created.tag, "Boss", Some("before the boss fight"))
        .await
        .unwrap();
    assert_eq!(renamed.old_tag, created.tag);
    assert_eq!(renamed.new_tag, created.tag);

    let after = fx.saves.list_saves().await.unwrap();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].description, "before the boss fight");
    assert_eq!(after[0].created_at, before.created_at);
    assert!(after[0].updated_at >= before.updated_at);
}

#[tokio::test]
async fn test_rename_new_name_mints_tag() {
    let fx = Fixture::authorized().await;
    let created = fx.saves.create_save("Old name", None).await.unwrap();
    fx.saves.load_save(&created.tag).await.unwrap();

    let renamed = fx
        .saves
        .rename_save(&created.tag, "New name", None)
        .await
        .unwrap();
    assert_ne!(renamed.new_tag, created.tag);
    assert_eq!(
        tag::tag_display_name(&renamed.new_tag).as_deref(),
        Some("New name")
    );

    let saves = fx.saves.list_saves().await.unwrap();
    assert_eq!(saves.len(), 1);
    assert_eq!(saves[0].tag, renamed.new_tag);
    assert_eq!(saves[0].description, "Save: New name");
    assert!(!fx.remote_tags().contains(&created.tag));

    let config = fx.config.load().unwrap();
    assert_eq!(config.current_save.unwrap().tag, renamed.new_tag);
    assert_eq!(config.last_save.unwrap().tag, renamed.new_tag);
}

#[tokio::test]
async fn test_rename_missing_tag() {
    let fx = Fixture::authorized().await;
    let err = fx
        .saves
        .rename_save("save_1_bm9wZQ", "x", None)
        .await
        .unwrap_err();
    assert!(matches!(err, SaveError::NotFound(_)));
}

#[tokio::test]
async fn test_overwrite_idempotent_without_changes() {
    let fx = Fixture::authorized().await;
    let created = fx
        .saves
        .create_save("Slot", Some("my slot"))
        .await
        .unwrap();

    let first = fx.saves.overwrite_save(&created.tag).await.unwrap();
    let second = fx.saves.overwrite_save(&created.tag).await.unwrap();
    assert!(!first.committed);
    assert!(!second.committed);
    assert_eq!(first.commit, second.commit);

    let saves = fx.saves.list_saves().await.unwrap();
    assert_eq!(saves.len(), 1);
    assert_eq!(saves[0].tag, created.tag);
    assert_eq!(saves[0].description, "my slot");
}

#[tokio::test]
async fn test_overwrite_moves_tag_to_new_commit() {
    let fx = Fixture::authorized().await;
    let created = fx.saves.create_save("Slot", None).await.unwrap();
    let before = fx.saves.list_saves().await.unwrap().remove(0);
    let old_commit = git(&fx.data, &["rev-parse", &format!("{}^{{commit}}", created.tag)]);

    fx.write("notes.txt", "more progress");
    let outcome = fx.saves.overwrite_save(&created.tag).await.unwrap();
    assert!(outcome.committed);
    assert_ne!(outcome.commit, old_commit);

    let remote_commit = git(&fx.remote, &["rev-parse", &format!("{}^{{commit}}", created.tag)]);
    assert_eq!(remote_commit, outcome.commit);

    let after = fx.saves.list_saves().await.unwrap();
    assert_eq!(after[0].created_at, before.created_at);
}

#[tokio::test]
async fn test_overwrite_requires_authorization() {
    let fx = Fixture::authorized().await;
    let created = fx.saves.create_save("Slot", None).await.unwrap();
    fx.config.update(|c| c.is_authorized = false).unwrap();

    let err = fx.saves.overwrite_save(&created.tag).await.unwrap_err();
    assert!(matches!(err, SaveError::Unauthorized(_)));
}

#[tokio::test]
async fn test_diff_from_empty_tree() {
    let fx = Fixture::authorized().await;
    let created = fx.saves.create_save("Start", None).await.unwrap();

    let files = fx.saves.save_diff(EMPTY_TREE, &created.tag).await.unwrap();
    assert!(!files.is_empty());
    assert!(files.iter().all(|f| f.status == ChangeStatus::Added));
    assert!(files.iter().any(|f| f.path == "settings.json"));

    // parent of the root commit falls back to the empty tree
    let root = git(&fx.data, &["rev-list", "--max-parents=0", "HEAD"]);
    let from_parent = fx
        .saves
        .save_diff(&format!("{}^", root), &root)
        .await
        .unwrap();
    assert_eq!(from_parent.len(), files.len());
}

#[tokio::test]
async fn test_diff_between_saves() {
    let fx = Fixture::authorized().await;
    let first = fx.saves.create_save("a", None).await.unwrap();
    fx.write("settings.json", "{\"volume\":3}");
    fx.write("extra.txt", "new");
    fs_remove(&fx, "default-user/chats/hero.jsonl");
    let second = fx.saves.create_save("b", None).await.unwrap();

    let files = fx.saves.save_diff(&first.tag, &second.tag).await.unwrap();
    let status_of = |path: &str| files.iter().find(|f| f.path == path).map(|f| f.status);
    assert_eq!(status_of("settings.json"), Some(ChangeStatus::Modified));
    assert_eq!(status_of("extra.txt"), Some(ChangeStatus::Added));
    assert_eq!(
        status_of("default-user/chats/hero.jsonl"),
        Some(ChangeStatus::Deleted)
    );

    let err = fx.saves.save_diff("no-such-ref", &second.tag).await.unwrap_err();
    assert!(matches!(err, SaveError::NotFound(_)));
}

fn fs_remove(fx: &Fixture, rel: &str) {
    std::fs::remove_file(fx.data.join(rel)).unwrap();
}

async fn break_remote(fx: &Fixture) {
    GitOps::new(&fx.data)
        .set_remote_url("origin", "/nonexistent/remote.git")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_overwrite_push_failure_removes_local_tag() {
    let fx = Fixture::authorized().await;
    let created = fx.saves.create_save("Slot", None).await.unwrap();
    fx.write("notes.txt", "unsynced");
    break_remote(&fx).await;

    let err = fx.saves.overwrite_save(&created.tag).await.unwrap_err();
    assert!(matches!(err, SaveError::Git { .. }));
    assert!(!fx.local_tags().contains(&created.tag));
    assert!(fx.remote_tags().contains(&created.tag));
}

#[tokio::test]
async fn test_rename_push_failure_keeps_old_tag() {
    let fx = Fixture::authorized().await;
    let created = fx.saves.create_save("Old name", None).await.unwrap();
    break_remote(&fx).await;

    let err = fx
        .saves
        .rename_save(&created.tag, "New name", None)
        .await
        .unwrap_err();
    assert!(matches!(err, SaveError::Git { .. }));
    assert_eq!(fx.local_tags(), vec![created.tag.clone()]);
    assert_eq!(fx.remote_tags(), vec![created.tag]);
}

#[tokio::test]
async fn test_delete_remote_failure_is_warning() {
    let fx = Fixture::authorized().await;
    let created = fx.saves.create_save("temp", None).await.unwrap();
    break_remote(&fx).await;

    let outcome = fx.saves.delete_save(&created.tag).await.unwrap();
    assert!(outcome.warning.is_some());
    assert!(fx.local_tags().is_empty());
    assert!(fx.remote_tags().contains(&created.tag));
}

#[tokio::test]
async fn test_delete_after_remote_tag_removed() {
    let fx = Fixture::authorized().await;
    let created = fx.saves.create_save("temp", None).await.unwrap();
    git(
        &fx.data,
        &["push", "origin", &format!(":refs/tags/{}", created.tag)],
    );
    assert!(fx.remote_tags().is_empty());
    assert!(fx.local_tags().contains(&created.tag));

    let outcome = fx.saves.delete_save(&created.tag).await.unwrap();
    assert!(outcome.warning.is_none());
    assert!(fx.local_tags().is_empty());
}
