//! Git Integration Module
//!
//! The engine's only path to version control:
//! - `ops` - `GitOps`, a per-directory wrapper over the `git` binary
//! - `remote` - credential URL building and `origin` reconciliation
//! - `bootstrap` - repository initialization for a data directory

pub mod bootstrap;
pub mod ops;
pub mod remote;

pub use bootstrap::{bootstrap, BootstrapOptions, DEFAULT_EXTENSIONS_PATH, ROOT_GITIGNORE};
pub use ops::{GitError, GitOps, GitStatus, StashEntry, StatusEntry, EMPTY_TREE};
pub use remote::{authenticated_url, reconcile_origin, redact_url, replace_origin, ORIGIN};
