use crate::{
    query::{
        EntityQuery, IterableQuery, QuerySettings, Row,
        expr::{Predicate, conjoin},
    },
    traits::EntityType,
    uow::UnitOfWork,
};
use std::{fmt, marker::PhantomData};

///
/// QueryBuilder
///
/// Accumulates the filter for queries over `E`. Not tied to a unit of
/// work: one builder (and the tree it holds) can produce queries for any
/// number of units of work or collections.
///

pub struct QueryBuilder<E> {
    predicate: Option<Predicate>,
    _marker: PhantomData<fn() -> E>,
}

impl<E: EntityType> QueryBuilder<E> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            predicate: None,
            _marker: PhantomData,
        }
    }

    /// New builder whose filter is this one's AND `predicate`. `self` is
    /// left unchanged.
    #[must_use]
    pub fn filter(&self, predicate: Predicate) -> Self {
        let predicate = match &self.predicate {
            Some(existing) => conjoin(existing.clone(), predicate),
            None => predicate,
        };

        Self {
            predicate: Some(predicate),
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    /// Query executed by `uow`'s finder and resolved through its identity map.
    #[must_use]
    pub fn new_query(&self, uow: &UnitOfWork) -> EntityQuery<E> {
        EntityQuery::new(uow.clone(), self.predicate.clone())
    }

    /// Query evaluated in process over `items`.
    #[must_use]
    pub fn new_query_over<T, I>(&self, items: I) -> IterableQuery<T>
    where
        T: Row + Clone,
        I: IntoIterator<Item = T>,
    {
        IterableQuery::new(items, self.predicate.clone(), QuerySettings::default())
    }
}

impl<E: EntityType> Default for QueryBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for QueryBuilder<E> {
    fn clone(&self) -> Self {
        Self {
            predicate: self.predicate.clone(),
            _marker: PhantomData,
        }
    }
}

impl<E> fmt::Debug for QueryBuilder<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("predicate", &self.predicate)
            .finish()
    }
}
