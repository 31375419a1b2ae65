use crate::{
    entity::EntityReference,
    query::{
        QueryError, Variables,
        expr::{Predicate, PredicateKind},
        order::OrderBy,
    },
};

///
/// FinderQuery
///
/// One execution request handed to a finder. Borrowed from the query that
/// issued it; finders translate it into their native form.
///

#[derive(Clone, Copy, Debug)]
pub struct FinderQuery<'a> {
    pub entity_type: &'a str,
    pub predicate: Option<&'a Predicate>,
    pub order_by: &'a [OrderBy],
    pub first_result: usize,
    pub max_results: Option<usize>,
    pub variables: &'a Variables,
}

impl<'a> FinderQuery<'a> {
    #[must_use]
    pub const fn new(entity_type: &'a str, variables: &'a Variables) -> Self {
        Self {
            entity_type,
            predicate: None,
            order_by: &[],
            first_result: 0,
            max_results: None,
            variables,
        }
    }
}

///
/// FinderCapabilities
///
/// What a finder can push down. Anything it cannot do is applied by the
/// caller in process.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FinderCapabilities {
    pub ordering: bool,
    pub paging: bool,
}

impl FinderCapabilities {
    pub const ALL: Self = Self {
        ordering: true,
        paging: true,
    };

    pub const NONE: Self = Self {
        ordering: false,
        paging: false,
    };
}

/// Lazy stream of matching references.
pub type ReferenceIter<'a> = Box<dyn Iterator<Item = Result<EntityReference, QueryError>> + 'a>;

///
/// EntityFinder
///
/// Contract every indexing/query backend implements. Finders return
/// references only; resolving them into live entities is the caller's job.
///

pub trait EntityFinder: Send + Sync {
    /// Backend name used in diagnostics and `Unsupported` errors.
    fn name(&self) -> &str;

    fn capabilities(&self) -> FinderCapabilities {
        FinderCapabilities::NONE
    }

    /// Whether this backend can translate nodes of `kind`.
    fn supports(&self, _kind: PredicateKind) -> bool {
        true
    }

    fn find_entities<'a>(&'a self, query: FinderQuery<'a>) -> Result<ReferenceIter<'a>, QueryError>;

    /// First match only. Backends that can should push `max_results = 1`
    /// down instead of relying on this default.
    fn find_entity(&self, query: FinderQuery<'_>) -> Result<Option<EntityReference>, QueryError> {
        let limited = FinderQuery {
            max_results: Some(1),
            ..query
        };

        self.find_entities(limited)?.next().transpose()
    }

    /// Number of matches, ignoring ordering and paging.
    fn count_entities(&self, query: FinderQuery<'_>) -> Result<u64, QueryError>;
}
