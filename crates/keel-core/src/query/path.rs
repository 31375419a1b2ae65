use serde::{Deserialize, Serialize};
use std::fmt;

///
/// PropertyPath
///
/// Full dotted path from the queried entity to a field, crossing zero or
/// more associations (`friend.name`). Backends need every segment to
/// translate traversals into joins or graph patterns.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct PropertyPath {
    segments: Vec<String>,
}

impl PropertyPath {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            segments: vec![name.into()],
        }
    }

    /// Parse a dotted path. Empty segments are dropped.
    #[must_use]
    pub fn parse(dotted: &str) -> Self {
        Self {
            segments: dotted
                .split('.')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Extend this path with the segments of `tail`.
    #[must_use]
    pub fn join(&self, tail: &Self) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(tail.segments.iter().cloned());

        Self { segments }
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Final segment: the field actually read.
    #[must_use]
    pub fn leaf(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }

    /// Association segments crossed before the leaf.
    #[must_use]
    pub fn traversal(&self) -> &[String] {
        self.segments
            .split_last()
            .map_or(&[], |(_, head)| head)
    }

    #[must_use]
    pub fn is_traversal(&self) -> bool {
        self.segments.len() > 1
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}
