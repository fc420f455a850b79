//! Sidecar-backed tag store.
//!
//! Every directory holding tagged files carries one JSON file (by default
//! `tags.json`) mapping file names to their tags:
//!
//! ```json
//! {
//!     "report.pdf": [
//!         "draft",
//!         "work"
//!     ]
//! }
//! ```
//!
//! Files without tags have no entry, and a sidecar with no entries is deleted.

use crate::{StoreError, Tag, TagSet, TagStore, TaggedFile};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

pub const DEFAULT_SIDECAR_NAME: &str = "tags.json";

type Sidecar = BTreeMap<String, TagSet>;

#[derive(Debug, Clone)]
pub struct SidecarStore {
    sidecar_name: String,
}

impl Default for SidecarStore {
    fn default() -> Self {
        Self::new(DEFAULT_SIDECAR_NAME)
    }
}

impl SidecarStore {
    pub fn new(sidecar_name: impl Into<String>) -> Self {
        Self {
            sidecar_name: sidecar_name.into(),
        }
    }

    pub fn sidecar_name(&self) -> &str {
        &self.sidecar_name
    }

    fn sidecar_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.sidecar_name)
    }

    fn temp_name(&self) -> String {
        format!(".{}.tmp", self.sidecar_name)
    }

    fn is_reserved(&self, name: &str) -> bool {
        name == self.sidecar_name || name == self.temp_name()
    }

    /// Directory and file name of `path`, without touching the filesystem.
    fn split(path: &Path) -> Result<(PathBuf, String), StoreError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                StoreError::io(
                    path,
                    io::Error::new(ErrorKind::InvalidInput, "path has no UTF-8 file name"),
                )
            })?
            .to_string();
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Ok((dir, name))
    }

    /// Like `split`, but `path` must be an existing regular file.
    fn locate(&self, path: &Path) -> Result<(PathBuf, String), StoreError> {
        let meta = fs::metadata(path).map_err(|e| not_found_or_io(path, e))?;
        if !meta.is_file() {
            return Err(StoreError::NotAFile(path.to_path_buf()));
        }
        let (dir, name) = Self::split(path)?;
        if self.is_reserved(&name) {
            return Err(StoreError::NotAFile(path.to_path_buf()));
        }
        Ok((dir, name))
    }

    fn load(&self, dir: &Path) -> Result<Sidecar, StoreError> {
        let path = self.sidecar_path(dir);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Sidecar::new()),
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        serde_json::from_str(&content).map_err(|source| StoreError::Corrupt { path, source })
    }

    fn save(&self, dir: &Path, sidecar: &Sidecar) -> Result<(), StoreError> {
        let path = self.sidecar_path(dir);
        if sidecar.is_empty() {
            debug!(path = %path.display(), "removing empty tag file");
            return match fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(StoreError::io(&path, e)),
            };
        }

        let mut buf = Vec::new();
        let mut ser =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        sidecar
            .serialize(&mut ser)
            .map_err(|source| StoreError::Corrupt {
                path: path.clone(),
                source,
            })?;
        buf.push(b'\n');

        // Write-then-rename keeps readers from ever seeing a partial sidecar.
        let tmp = dir.join(self.temp_name());
        fs::write(&tmp, &buf).map_err(|e| StoreError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| StoreError::io(&path, e))?;
        debug!(path = %path.display(), entries = sidecar.len(), "wrote tag file");
        Ok(())
    }

    /// Renames `source` to `destination`, then runs `update`. If `update`
    /// fails the rename is undone.
    fn rename_then(
        &self,
        source: &Path,
        destination: &Path,
        update: impl FnOnce() -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        fs::rename(source, destination).map_err(|e| StoreError::io(source, e))?;
        if let Err(e) = update() {
            if let Err(undo) = fs::rename(destination, source) {
                warn!(
                    source = %source.display(),
                    destination = %destination.display(),
                    error = %undo,
                    "could not undo rename after tag file update failed"
                );
            }
            return Err(e);
        }
        Ok(())
    }
}

impl TagStore for SidecarStore {
    fn get_tags(&self, path: &Path) -> Result<TagSet, StoreError> {
        let (dir, name) = self.locate(path)?;
        Ok(self.load(&dir)?.remove(&name).unwrap_or_default())
    }

    fn add_tag(&self, path: &Path, tag: &Tag) -> Result<(), StoreError> {
        let (dir, name) = self.locate(path)?;
        let mut sidecar = self.load(&dir)?;
        if sidecar.entry(name).or_default().insert(tag.clone()) {
            self.save(&dir, &sidecar)?;
        } else {
            debug!(path = %path.display(), %tag, "tag already present");
        }
        Ok(())
    }

    fn remove_tag(&self, path: &Path, tag: &Tag) -> Result<(), StoreError> {
        let (dir, name) = self.locate(path)?;
        let mut sidecar = self.load(&dir)?;
        let removed = match sidecar.get_mut(&name) {
            Some(tags) => {
                let removed = tags.remove(tag);
                if tags.is_empty() {
                    sidecar.remove(&name);
                }
                removed
            }
            None => false,
        };
        if removed {
            self.save(&dir, &sidecar)?;
        } else {
            debug!(path = %path.display(), %tag, "tag not present");
        }
        Ok(())
    }

    fn list_files(&self, dir: &Path, tag: Option<&Tag>) -> Result<Vec<TaggedFile>, StoreError> {
        let meta = fs::metadata(dir).map_err(|e| not_found_or_io(dir, e))?;
        if !meta.is_dir() {
            return Err(StoreError::NotADirectory(dir.to_path_buf()));
        }
        let sidecar = self.load(dir)?;

        let mut files = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(dir).to_path_buf();
                StoreError::Io {
                    path,
                    source: e.into(),
                }
            })?;
            if !entry.path().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                warn!(path = %entry.path().display(), "skipping file with non UTF-8 name");
                continue;
            };
            if self.is_reserved(name) {
                continue;
            }
            let tags = sidecar.get(name).cloned().unwrap_or_default();
            if tag.map_or(true, |t| tags.contains(t)) {
                files.push(TaggedFile {
                    name: name.to_string(),
                    tags,
                });
            }
        }
        debug!(dir = %dir.display(), count = files.len(), "listed files");
        Ok(files)
    }

    fn move_path(&self, source: &Path, destination: &Path) -> Result<(), StoreError> {
        let (src_dir, src_name) = self.locate(source)?;
        if fs::symlink_metadata(destination).is_ok() {
            return Err(StoreError::Conflict(destination.to_path_buf()));
        }
        let (dst_dir, dst_name) = Self::split(destination)?;
        if self.is_reserved(&dst_name) {
            return Err(StoreError::Conflict(destination.to_path_buf()));
        }
        if !dst_dir.is_dir() {
            return Err(StoreError::NotFound(dst_dir));
        }
        let same_dir = canonical(&src_dir)? == canonical(&dst_dir)?;

        let src_original = self.load(&src_dir)?;
        let mut src_updated = src_original.clone();
        let tags = src_updated.remove(&src_name).unwrap_or_default();
        debug!(
            source = %source.display(),
            destination = %destination.display(),
            tags = tags.len(),
            "moving tagged file"
        );

        if same_dir {
            put(&mut src_updated, &dst_name, tags);
            return self.rename_then(source, destination, || {
                if src_updated != src_original {
                    self.save(&src_dir, &src_updated)?;
                }
                Ok(())
            });
        }

        let dst_original = self.load(&dst_dir)?;
        let mut dst_updated = dst_original.clone();
        put(&mut dst_updated, &dst_name, tags);
        self.rename_then(source, destination, || {
            if dst_updated != dst_original {
                self.save(&dst_dir, &dst_updated)?;
            }
            if src_updated != src_original {
                if let Err(e) = self.save(&src_dir, &src_updated) {
                    if let Err(restore) = self.save(&dst_dir, &dst_original) {
                        warn!(
                            dir = %dst_dir.display(),
                            error = %restore,
                            "could not restore destination tag file"
                        );
                    }
                    return Err(e);
                }
            }
            Ok(())
        })
    }
}

fn put(sidecar: &mut Sidecar, name: &str, tags: TagSet) {
    if tags.is_empty() {
        sidecar.remove(name);
    } else {
        sidecar.insert(name.to_string(), tags);
    }
}

fn canonical(dir: &Path) -> Result<PathBuf, StoreError> {
    fs::canonicalize(dir).map_err(|e| StoreError::io(dir, e))
}

fn not_found_or_io(path: &Path, e: io::Error) -> StoreError {
    match e.kind() {
        ErrorKind::NotFound => StoreError::NotFound(path.to_path_buf()),
        _ => StoreError::io(path, e),
    }
}
