use crate::{
    error::Error,
    query::{
        Query, QuerySettings,
        eval::{Evaluator, Row, sort_rows},
        expr::Predicate,
    },
};

///
/// IterableQuery
///
/// Query over an in-memory collection with no backend. Every candidate is
/// evaluated in process; ordering and paging sort and slice the fully
/// materialized match list.
///

#[derive(Clone, Debug)]
pub struct IterableQuery<T> {
    items: Vec<T>,
    predicate: Option<Predicate>,
    settings: QuerySettings,
}

impl<T: Row + Clone> IterableQuery<T> {
    pub fn new(
        items: impl IntoIterator<Item = T>,
        predicate: Option<Predicate>,
        settings: QuerySettings,
    ) -> Self {
        Self {
            items: items.into_iter().collect(),
            predicate,
            settings,
        }
    }

    #[must_use]
    pub const fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    // Matching items in source order.
    fn matches(&self) -> Result<Vec<T>, Error> {
        let Some(predicate) = &self.predicate else {
            return Ok(self.items.clone());
        };
        predicate.check_bound(&self.settings.variables)?;

        let evaluator = Evaluator::new(&self.settings.variables);
        let mut matched = Vec::new();
        for item in &self.items {
            if evaluator.eval(item, predicate)? {
                matched.push(item.clone());
            }
        }

        Ok(matched)
    }
}

impl<T: Row + Clone> Query for IterableQuery<T> {
    type Item = T;

    fn settings(&self) -> &QuerySettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut QuerySettings {
        &mut self.settings
    }

    fn find(&self) -> Result<Option<T>, Error> {
        self.iter()?.next().transpose()
    }

    fn iter(&self) -> Result<Box<dyn Iterator<Item = Result<T, Error>> + '_>, Error> {
        let mut matched = self.matches()?;
        sort_rows(&mut matched, &self.settings.order_by)?;

        let max = self.settings.max_results.unwrap_or(usize::MAX);
        Ok(Box::new(
            matched
                .into_iter()
                .skip(self.settings.first_result)
                .take(max)
                .map(Ok),
        ))
    }

    fn count(&self) -> Result<u64, Error> {
        Ok(self.matches()?.len() as u64)
    }
}
