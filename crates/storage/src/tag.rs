use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("tag must not be empty")]
pub struct EmptyTag;

/// A case-sensitive, non-empty label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Tag(String);

impl Tag {
    pub fn new(name: impl Into<String>) -> Result<Self, EmptyTag> {
        let name = name.into();
        if name.is_empty() {
            return Err(EmptyTag);
        }
        Ok(Tag(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Tag {
    type Error = EmptyTag;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Tag::new(value)
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub type TagSet = BTreeSet<Tag>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaggedFile {
    pub name: String,
    pub tags: TagSet,
}
