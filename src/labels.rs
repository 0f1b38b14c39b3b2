//! Class label table.
//!
//! Labels are loaded once per detector and shared read-only between the
//! pipeline, the worker thread and every detection that names a class.

use crate::util::{SmartSightError, SmartSightResult};
use std::path::Path;
use std::sync::Arc;

/// Ordered, index-stable list of class names.
///
/// Cloning is cheap: the names live behind a shared `Arc`.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelTable {
    names: Arc<[Arc<str>]>,
}

impl Default for LabelTable {
    fn default() -> Self {
        Self::new(std::iter::empty::<&str>())
    }
}

impl LabelTable {
    /// Creates a table from names in class-index order.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<Arc<str>> = names.into_iter().map(|s| Arc::from(s.as_ref())).collect();
        Self {
            names: names.into(),
        }
    }

    /// Parses one label per line; lines are trimmed and blank lines skipped.
    pub fn from_lines(text: &str) -> Self {
        Self::new(text.lines().map(str::trim).filter(|line| !line.is_empty()))
    }

    /// Reads a label file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> SmartSightResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| SmartSightError::LabelsIo {
            reason: err.to_string(),
        })?;
        Ok(Self::from_lines(&text))
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` when no class names were loaded.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns the name of class `class_id`.
    pub fn get(&self, class_id: usize) -> Option<&Arc<str>> {
        self.names.get(class_id)
    }

    /// Iterates class names in index order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|name| name.as_ref())
    }
}
