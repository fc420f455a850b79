use crate::parse::quote;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use storage::{StoreError, Tag, TagSet, TagStore, TaggedFile};
use tracing::debug;

/// One parsed operation. Paths are kept as written and resolved against the
/// working directory at execution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List { target: Option<PathBuf> },
    Filter { tag: Tag, target: Option<PathBuf> },
    Add { tag: Tag, path: PathBuf },
    Remove { tag: Tag, path: PathBuf },
    Move { source: PathBuf, destination: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// Tags of a single file.
    Tags { tags: TagSet },
    /// Every file of a directory with its tags, ordered by name.
    Listing { files: Vec<TaggedFile> },
    /// Names of the files matching a filter, ordered by name.
    Files { files: Vec<String> },
    Done,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::List { .. } => "ls",
            Command::Filter { .. } => "filter",
            Command::Add { .. } => "add",
            Command::Remove { .. } => "rm",
            Command::Move { .. } => "mv",
        }
    }

    pub fn execute<S: TagStore + ?Sized>(
        &self,
        store: &S,
        working_dir: &Path,
    ) -> Result<Outcome, StoreError> {
        debug!(command = %self, "executing");
        match self {
            Command::List { target } => {
                let target = resolve_or_cwd(working_dir, target.as_deref());
                if target.is_dir() {
                    let files = store.list_files(&target, None)?;
                    Ok(Outcome::Listing { files })
                } else {
                    let tags = store.get_tags(&target)?;
                    Ok(Outcome::Tags { tags })
                }
            }
            Command::Filter { tag, target } => {
                let dir = resolve_or_cwd(working_dir, target.as_deref());
                let files = store
                    .list_files(&dir, Some(tag))?
                    .into_iter()
                    .map(|f| f.name)
                    .collect();
                Ok(Outcome::Files { files })
            }
            Command::Add { tag, path } => {
                store.add_tag(&resolve(working_dir, path), tag)?;
                Ok(Outcome::Done)
            }
            Command::Remove { tag, path } => {
                store.remove_tag(&resolve(working_dir, path), tag)?;
                Ok(Outcome::Done)
            }
            Command::Move {
                source,
                destination,
            } => {
                store.move_path(
                    &resolve(working_dir, source),
                    &resolve(working_dir, destination),
                )?;
                Ok(Outcome::Done)
            }
        }
    }
}

fn resolve(working_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir.join(path)
    }
}

fn resolve_or_cwd(working_dir: &Path, path: Option<&Path>) -> PathBuf {
    path.map(|p| resolve(working_dir, p))
        .unwrap_or_else(|| working_dir.to_path_buf())
}

fn show(path: &Path) -> String {
    quote(&path.to_string_lossy())
}

/// Renders the command in the form it is typed on the command line.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())?;
        match self {
            Command::List { target } => {
                if let Some(t) = target {
                    write!(f, " {}", show(t))?;
                }
            }
            Command::Filter { tag, target } => {
                write!(f, " {}", quote(tag.as_str()))?;
                if let Some(t) = target {
                    write!(f, " {}", show(t))?;
                }
            }
            Command::Add { tag, path: p } | Command::Remove { tag, path: p } => {
                write!(f, " {} {}", quote(tag.as_str()), show(p))?;
            }
            Command::Move {
                source,
                destination,
            } => {
                write!(f, " {} {}", show(source), show(destination))?;
            }
        }
        Ok(())
    }
}
