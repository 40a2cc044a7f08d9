//! 통합 테스트 공용 fixture
//!
//! A bare repository in a temp dir stands in for the remote; the data
//! directory is authorized against it by path.

#![allow(dead_code)]

use cloudsave_core::CloudSaves;
use cloudsave_foundation::ConfigStore;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tempfile::TempDir;

pub struct Fixture {
    _root: TempDir,
    pub data: PathBuf,
    pub remote: PathBuf,
    pub config: Arc<ConfigStore>,
    pub saves: CloudSaves,
}

impl Fixture {
    /// Data directory with a couple of files, not yet a repository
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("tempdir");
        let data = root.path().join("data");
        let remote = root.path().join("remote.git");

        fs::create_dir_all(data.join("default-user/chats")).unwrap();
        fs::write(data.join("default-user/chats/hero.jsonl"), "{\"turn\":1}\n").unwrap();
        fs::write(data.join("settings.json"), "{}").unwrap();

        git(root.path(), &["init", "--bare", "-q", remote.to_str().unwrap()]);

        let config = Arc::new(ConfigStore::at_path(root.path().join("config.json")));
        let remote_url = remote.to_string_lossy().into_owned();
        config
            .update(|c| {
                c.repo_url = remote_url;
                c.branch = "main".into();
            })
            .unwrap();

        let saves = CloudSaves::new(&data, Arc::clone(&config));
        Self {
            _root: root,
            data,
            remote,
            config,
            saves,
        }
    }

    /// Fixture already connected to its remote
    pub async fn authorized() -> Self {
        let fixture = Self::new();
        fixture
            .saves
            .authorize(None)
            .await
            .expect("authorize against local bare remote");
        fixture
    }

    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.data.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.data.join(rel)).unwrap()
    }

    /// Tags present on the remote
    pub fn remote_tags(&self) -> Vec<String> {
        git(&self.remote, &["tag", "-l"])
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn local_tags(&self) -> Vec<String> {
        git(&self.data, &["tag", "-l"])
            .lines()
            .map(str::to_string)
            .collect()
    }
}

/// Run git synchronously and return trimmed stdout
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .expect("run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}
