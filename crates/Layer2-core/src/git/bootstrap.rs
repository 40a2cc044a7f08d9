//! Repository bootstrap
//!
//! Turns an arbitrary data directory into a repository whose whole tree is
//! trackable: nested repositories under the extensions directory are
//! flattened, empty directories get a `.gitkeep`, and a root `.gitignore`
//! un-ignores everything except scratch directories.

use super::ops::{GitError, GitOps};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Extensions directory, relative to the data directory
pub const DEFAULT_EXTENSIONS_PATH: &str = "default-user/extensions";

/// Root `.gitignore` written on bootstrap
pub const ROOT_GITIGNORE: &str = "# Ensure data directory contents are tracked, overriding parent ignores.
!*

# Ignore specific subdirectories within data
_uploads/
_cache/
_storage/
_webpack/
";

const GITKEEP: &str = ".gitkeep";
const GITLINK_MODE: &str = "160000";

/// Bootstrap options
#[derive(Debug, Clone)]
pub struct BootstrapOptions {
    /// Subtree whose nested `.git`/`.gitignore` entries are removed
    pub extensions_path: PathBuf,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            extensions_path: PathBuf::from(DEFAULT_EXTENSIONS_PATH),
        }
    }
}

impl BootstrapOptions {
    pub fn with_extensions_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.extensions_path = path.into();
        self
    }
}

/// Initialize the repository; `Ok(false)` when one already exists
pub async fn bootstrap(git: &GitOps, options: &BootstrapOptions) -> Result<bool, GitError> {
    if git.is_repo().await {
        debug!("Repository already initialized at {}", git.root().display());
        return Ok(false);
    }

    let root = git.root().to_path_buf();
    fs::create_dir_all(&root)?;
    git.init().await?;
    info!("Initialized repository at {}", root.display());

    let extensions = root.join(&options.extensions_path);
    if extensions.is_dir() {
        warn!(
            "Removing nested .git/.gitignore within {}",
            extensions.display()
        );
        remove_nested_git_files(&extensions);
    } else {
        debug!(
            "Extensions directory {} not found, skipping nested git removal",
            extensions.display()
        );
    }

    let prefix = options.extensions_path.to_string_lossy().replace('\\', "/");
    if let Err(e) = strip_gitlinks(git, &prefix).await {
        error!("Failed to strip gitlink entries under {}: {}", prefix, e);
    }

    let created = add_gitkeep_files(&root);
    debug!("Created {} .gitkeep files", created);

    if let Err(e) = fs::write(root.join(".gitignore"), ROOT_GITIGNORE) {
        error!("Failed to write root .gitignore: {}", e);
    }

    Ok(true)
}

/// Delete `.git` directories and `.gitignore` files below `dir`
pub fn remove_nested_git_files(dir: &Path) {
    let mut it = WalkDir::new(dir).min_depth(1).into_iter();
    while let Some(entry) = it.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        let path = entry.path();
        let name = entry.file_name();

        if entry.file_type().is_dir() && name == ".git" {
            warn!("Removing nested .git directory: {}", path.display());
            if let Err(e) = fs::remove_dir_all(path) {
                error!("Failed to remove {}: {}", path.display(), e);
            }
            it.skip_current_dir();
        } else if name == ".git" || name == ".gitignore" {
            // `.git` may also be a file (worktree/submodule pointer)
            warn!("Removing nested {}: {}", name.to_string_lossy(), path.display());
            if let Err(e) = fs::remove_file(path) {
                error!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }
}

/// Drop staged gitlinks (submodule pointers) under `prefix` from the index
pub async fn strip_gitlinks(git: &GitOps, prefix: &str) -> Result<usize, GitError> {
    let prefix = format!("{}/", prefix.trim_end_matches('/'));
    let staged = git.ls_files_stage().await?;
    let gitlinks = parse_gitlinks(&staged, &prefix);

    for path in &gitlinks {
        match git.rm_cached(path).await {
            Ok(()) => info!("Removed gitlink {} from index", path),
            Err(e) => error!("Failed to remove gitlink {} from index: {}", path, e),
        }
    }
    Ok(gitlinks.len())
}

fn parse_gitlinks(ls_files: &str, prefix: &str) -> Vec<String> {
    ls_files
        .lines()
        .filter_map(|line| {
            let (meta, path) = line.split_once('\t')?;
            let mode = meta.split_whitespace().next()?;
            (mode == GITLINK_MODE && path.starts_with(prefix)).then(|| path.to_string())
        })
        .collect()
}

/// Place an empty `.gitkeep` in every directory that lacks one
pub fn add_gitkeep_files(root: &Path) -> usize {
    let mut created = 0;
    let dirs = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git")
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir());

    for dir in dirs {
        let keep = dir.path().join(GITKEEP);
        if keep.exists() {
            continue;
        }
        match fs::write(&keep, "") {
            Ok(()) => created += 1,
            Err(e) => error!("Failed to create {}: {}", keep.display(), e),
        }
    }
    created
}
