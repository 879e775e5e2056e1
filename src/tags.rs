use crate::error::{MetricsError, Result};
use std::{collections::BTreeMap, fmt, iter::FromIterator};

const MAX_LENGTH: usize = 255;

/// Free-form key/value pairs attached to a recording and kept on exemplars.
pub type Attachments = BTreeMap<String, String>;

fn is_printable(s: &str) -> bool {
    s.chars().all(|c| (' '..='~').contains(&c))
}

/// The name of a dimension measurements can be broken down by.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagKey(String);

impl TagKey {
    /// Creates a tag key.
    ///
    /// Keys must be non-empty, at most 255 characters, and printable ASCII.
    pub fn new<S: Into<String>>(name: S) -> Result<TagKey> {
        let name = name.into();
        if name.is_empty() || name.len() > MAX_LENGTH || !is_printable(&name) {
            return Err(MetricsError::InvalidTagKey(name));
        }
        Ok(TagKey(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The value of one dimension for a given recording.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagValue(String);

impl TagValue {
    /// Creates a tag value.
    ///
    /// Values may be empty, but must be at most 255 characters of printable ASCII.
    pub fn new<S: Into<String>>(value: S) -> Result<TagValue> {
        let value = value.into();
        if value.len() > MAX_LENGTH || !is_printable(&value) {
            return Err(MetricsError::InvalidTagValue(value));
        }
        Ok(TagValue(value))
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An insertion-ordered set of tags.
///
/// Setting a key that is already present overwrites its value in place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TagMap {
    tags: Vec<(TagKey, TagValue)>,
}

impl TagMap {
    pub fn new() -> TagMap {
        Default::default()
    }

    pub fn set(&mut self, key: TagKey, value: TagValue) {
        match self.tags.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.tags.push((key, value)),
        }
    }

    pub fn get(&self, key: &TagKey) -> Option<&TagValue> {
        self.tags.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn delete(&mut self, key: &TagKey) -> Option<TagValue> {
        let pos = self.tags.iter().position(|(k, _)| k == key)?;
        Some(self.tags.remove(pos).1)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TagKey, &TagValue)> {
        self.tags.iter().map(|(k, v)| (k, v))
    }

    /// Projects this map onto `columns`, yielding one slot per column in column order.
    ///
    /// Columns with no tag in this map yield `None`.
    pub fn project(&self, columns: &[TagKey]) -> Vec<Option<TagValue>> {
        columns.iter().map(|key| self.get(key).cloned()).collect()
    }
}

impl FromIterator<(TagKey, TagValue)> for TagMap {
    fn from_iter<I: IntoIterator<Item = (TagKey, TagValue)>>(iter: I) -> Self {
        let mut map = TagMap::new();
        for (k, v) in iter {
            map.set(k, v);
        }
        map
    }
}
