use crate::{
    entity::{EntityReference, EntityState},
    query::{
        QueryError,
        eval::{Evaluator, StateRow, compare_keys, order_keys},
        finder::{EntityFinder, FinderCapabilities, FinderQuery, ReferenceIter},
    },
    store::{EntityStore, MemoryEntityStore},
};
use std::sync::Arc;

///
/// MemoryEntityFinder
///
/// Finder over the committed records of a `MemoryEntityStore`. Trees are
/// evaluated in process; association paths resolve against the store.
/// Supports every node kind, ordering, and paging.
///

#[derive(Clone, Debug)]
pub struct MemoryEntityFinder {
    store: Arc<MemoryEntityStore>,
}

impl MemoryEntityFinder {
    #[must_use]
    pub const fn new(store: Arc<MemoryEntityStore>) -> Self {
        Self { store }
    }

    // Matching states of the requested type, in reference order.
    fn matching(&self, query: &FinderQuery<'_>) -> Result<Vec<EntityState>, QueryError> {
        let candidates = self
            .store
            .entities_of_type(query.entity_type)
            .map_err(|err| QueryError::backend(err.to_string()))?;
        let Some(predicate) = query.predicate else {
            return Ok(candidates);
        };

        let evaluator = Evaluator::new(query.variables);
        let mut matched = Vec::new();
        for state in candidates {
            if evaluator.eval(&self.row(&state), predicate)? {
                matched.push(state);
            }
        }

        Ok(matched)
    }

    fn row<'a>(
        &'a self,
        state: &'a EntityState,
    ) -> StateRow<'a, impl Fn(&EntityReference) -> Result<Option<EntityState>, QueryError> + 'a>
    {
        StateRow::new(state, move |reference: &EntityReference| {
            self.store
                .load(reference)
                .map_err(|err| QueryError::backend(err.to_string()))
        })
    }
}

impl EntityFinder for MemoryEntityFinder {
    fn name(&self) -> &str {
        "memory"
    }

    fn capabilities(&self) -> FinderCapabilities {
        FinderCapabilities::ALL
    }

    fn find_entities<'a>(&'a self, query: FinderQuery<'a>) -> Result<ReferenceIter<'a>, QueryError> {
        let matched = self.matching(&query)?;

        let mut keyed = matched
            .iter()
            .map(|state| {
                let keys = order_keys(&self.row(state), query.order_by)?;
                Ok((keys, state.reference().clone()))
            })
            .collect::<Result<Vec<_>, QueryError>>()?;
        if !query.order_by.is_empty() {
            keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b, query.order_by));
        }

        let max = query.max_results.unwrap_or(usize::MAX);
        let references: Vec<EntityReference> = keyed
            .into_iter()
            .map(|(_, reference)| reference)
            .skip(query.first_result)
            .take(max)
            .collect();

        Ok(Box::new(references.into_iter().map(Ok)))
    }

    fn count_entities(&self, query: FinderQuery<'_>) -> Result<u64, QueryError> {
        Ok(self.matching(&query)?.len() as u64)
    }
}
