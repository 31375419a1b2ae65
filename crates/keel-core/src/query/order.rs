use crate::query::path::PropertyPath;
use derive_more::Display;
use serde::{Deserialize, Serialize};

///
/// Direction
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum Direction {
    #[default]
    #[display("asc")]
    Ascending,
    #[display("desc")]
    Descending,
}

///
/// OrderBy
///
/// One sort key. A query holds an ordered list of these; earlier keys
/// take precedence.
///

#[derive(Clone, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[display("{path} {direction}")]
pub struct OrderBy {
    pub path: PropertyPath,
    pub direction: Direction,
}

impl OrderBy {
    #[must_use]
    pub const fn new(path: PropertyPath, direction: Direction) -> Self {
        Self { path, direction }
    }

    #[must_use]
    pub const fn asc(path: PropertyPath) -> Self {
        Self::new(path, Direction::Ascending)
    }

    #[must_use]
    pub const fn desc(path: PropertyPath) -> Self {
        Self::new(path, Direction::Descending)
    }
}
