//! Query expression trees, the finder contract, and query execution.
//!
//! - `template`: typed field descriptors that build expression trees.
//! - `expr`: the immutable tree itself.
//! - `finder`: what a backend implements to run a tree.
//! - `entity` / `iterable`: executable queries over a unit of work or an
//!   in-memory collection.

mod builder;
mod entity;
mod eval;
mod expr;
mod finder;
mod iterable;
mod memory;
mod order;
mod path;
mod template;
mod variables;


use crate::{
    entity::EntityReference,
    error::{Error, ErrorClass, ErrorOrigin},
};
use thiserror::Error as ThisError;

// re-exports
pub use builder::QueryBuilder;
pub use entity::EntityQuery;
pub use eval::{Evaluator, FieldPresence, Row, StateRow, compare_keys, order_keys, sort_rows};
pub use expr::{
    CompareOp, ComparePredicate, NullTarget, Operand, Predicate, PredicateKind, and,
    ensure_supported, not, or,
};
pub use finder::{EntityFinder, FinderCapabilities, FinderQuery, ReferenceIter};
pub use iterable::IterableQuery;
pub use memory::MemoryEntityFinder;
pub use order::{Direction, OrderBy};
pub use path::PropertyPath;
pub use template::{
    Association, AssociationExpr, ManyAssociation, ManyAssociationExpr, Property, PropertyExpr,
};
pub use variables::Variables;

///
/// QueryError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum QueryError {
    #[error("variable '{name}' is referenced but not bound")]
    UnboundVariable { name: String },

    #[error("{backend} cannot evaluate {kind} expressions")]
    Unsupported { kind: PredicateKind, backend: String },

    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("no entity finder is configured")]
    FinderUnavailable,

    #[error("finder failure: {message}")]
    Backend { message: String },
}

impl QueryError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::UnboundVariable { .. } | Self::InvalidPattern { .. } => ErrorClass::Invalid,
            Self::Unsupported { .. } => ErrorClass::Unsupported,
            Self::FinderUnavailable => ErrorClass::InvalidState,
            Self::Backend { .. } => ErrorClass::Backend,
        }
    }

    /// Translation problems belong to the query; execution problems to
    /// the finder that ran it.
    #[must_use]
    pub const fn origin(&self) -> ErrorOrigin {
        match self {
            Self::UnboundVariable { .. } | Self::InvalidPattern { .. } => ErrorOrigin::Query,
            Self::Unsupported { .. } | Self::FinderUnavailable | Self::Backend { .. } => {
                ErrorOrigin::Finder
            }
        }
    }
}

///
/// QuerySettings
///
/// Execution attributes kept outside the expression tree so one tree can
/// be run with different ordering, paging, and variable bindings.
///

#[derive(Clone, Debug, Default)]
pub struct QuerySettings {
    pub order_by: Vec<OrderBy>,
    pub first_result: usize,
    pub max_results: Option<usize>,
    pub variables: Variables,
}

///
/// Query
///
/// Shared execution contract of `EntityQuery` and `IterableQuery`.
///

pub trait Query {
    type Item;

    fn settings(&self) -> &QuerySettings;

    fn settings_mut(&mut self) -> &mut QuerySettings;

    /// Replace the ordering. Earlier keys take precedence.
    fn order_by(&mut self, order: impl IntoIterator<Item = OrderBy>) -> &mut Self
    where
        Self: Sized,
    {
        self.settings_mut().order_by = order.into_iter().collect();
        self
    }

    fn first_result(&mut self, first: usize) -> &mut Self
    where
        Self: Sized,
    {
        self.settings_mut().first_result = first;
        self
    }

    fn max_results(&mut self, max: usize) -> &mut Self
    where
        Self: Sized,
    {
        self.settings_mut().max_results = Some(max);
        self
    }

    /// Bind or rebind a variable referenced by the tree.
    fn set_variable(
        &mut self,
        name: impl Into<String>,
        value: impl Into<crate::value::Value>,
    ) -> &mut Self
    where
        Self: Sized,
    {
        self.settings_mut().variables.bind(name, value);
        self
    }

    fn variable(&self, name: &str) -> Option<&crate::value::Value> {
        self.settings().variables.get(name)
    }

    /// First result under the current ordering and paging, if any.
    fn find(&self) -> Result<Option<Self::Item>, Error>;

    fn iter(&self) -> Result<Box<dyn Iterator<Item = Result<Self::Item, Error>> + '_>, Error>;

    fn list(&self) -> Result<Vec<Self::Item>, Error> {
        self.iter()?.collect()
    }

    /// Matches ignoring paging.
    fn count(&self) -> Result<u64, Error>;
}

// Shared by both query kinds when a finder or collection hands back a
// reference that no longer resolves.
pub(crate) fn log_stale(entity_type: &str, reference: &EntityReference) {
    tracing::debug!(entity_type, %reference, "skipping stale reference");
}
