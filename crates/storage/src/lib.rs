//! Storage layer: tag persistence for single files.
//!
//! Tags live in a JSON sidecar next to the files they describe, one sidecar
//! per directory, keyed by file name.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod sidecar;
pub mod tag;

pub use sidecar::{SidecarStore, DEFAULT_SIDECAR_NAME};
pub use tag::{EmptyTag, Tag, TagSet, TaggedFile};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no such file or directory: {}", .0.display())]
    NotFound(PathBuf),
    #[error("destination already exists: {}", .0.display())]
    Conflict(PathBuf),
    #[error("not a regular file: {}", .0.display())]
    NotAFile(PathBuf),
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("{}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("malformed tag file {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Get/set/remove access to the tag set of a single path.
///
/// Implementations hold no state between calls; every operation goes back to
/// the underlying storage.
pub trait TagStore {
    /// Tags of `path`. Untagged files yield an empty set.
    fn get_tags(&self, path: &Path) -> Result<TagSet, StoreError>;

    /// Adds `tag` to `path`. Adding a tag that is already present succeeds.
    fn add_tag(&self, path: &Path, tag: &Tag) -> Result<(), StoreError>;

    /// Removes `tag` from `path`. Removing an absent tag succeeds.
    fn remove_tag(&self, path: &Path, tag: &Tag) -> Result<(), StoreError>;

    /// Files directly under `dir`, ordered by name, optionally restricted to
    /// those carrying `tag`.
    fn list_files(&self, dir: &Path, tag: Option<&Tag>) -> Result<Vec<TaggedFile>, StoreError>;

    /// Renames `source` to `destination`, carrying its tags along.
    fn move_path(&self, source: &Path, destination: &Path) -> Result<(), StoreError>;
}
