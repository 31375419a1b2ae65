use crate::{
    entity::{Entity, EntityReference},
    error::Error,
    obs::MetricsEvent,
    query::{
        Query, QueryError, QuerySettings, log_stale,
        eval::sort_rows,
        expr::{Predicate, ensure_supported},
        finder::{EntityFinder, FinderQuery},
    },
    traits::EntityType,
    uow::UnitOfWork,
};
use std::fmt;

///
/// Plan
///
/// How much of a query the finder runs and how much is applied here.
/// Ordering is always honoured: a finder that cannot order gets an
/// unordered, unpaged request and the results are sorted and sliced in
/// process.
///

#[derive(Clone, Copy, Debug)]
struct Plan {
    push_order: bool,
    push_paging: bool,
    sort_locally: bool,
}

///
/// EntityQuery
///
/// Query executed by the unit of work's finder. Returned references are
/// resolved through the unit of work's identity map; references that no
/// longer resolve (stale index entries) are skipped.
///

pub struct EntityQuery<E: EntityType> {
    uow: UnitOfWork,
    predicate: Option<Predicate>,
    settings: QuerySettings,
    _marker: std::marker::PhantomData<fn() -> E>,
}

impl<E: EntityType> EntityQuery<E> {
    pub(crate) fn new(uow: UnitOfWork, predicate: Option<Predicate>) -> Self {
        Self {
            uow,
            predicate,
            settings: QuerySettings::default(),
            _marker: std::marker::PhantomData,
        }
    }

    #[must_use]
    pub const fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    #[must_use]
    pub const fn unit_of_work(&self) -> &UnitOfWork {
        &self.uow
    }

    // Fails before any finder call on a closed unit of work, an unbound
    // variable, or a node the finder cannot translate.
    fn prepare(&self) -> Result<&dyn EntityFinder, Error> {
        self.uow.ensure_open()?;
        let finder = self
            .uow
            .module()
            .finder
            .as_deref()
            .ok_or(QueryError::FinderUnavailable)?;

        if let Some(predicate) = &self.predicate {
            predicate.check_bound(&self.settings.variables)?;
            ensure_supported(predicate, finder.name(), |kind| finder.supports(kind))?;
        }

        Ok(finder)
    }

    fn effective_max_results(&self) -> Option<usize> {
        self.settings
            .max_results
            .or(self.uow.module().config.query.default_max_results)
    }

    fn plan(&self, finder: &dyn EntityFinder) -> Plan {
        let caps = finder.capabilities();
        let sort_locally = !self.settings.order_by.is_empty() && !caps.ordering;

        Plan {
            push_order: caps.ordering,
            push_paging: caps.paging && !sort_locally,
            sort_locally,
        }
    }

    fn request<'a>(&'a self, plan: Plan) -> FinderQuery<'a> {
        let mut request = FinderQuery::new(E::type_name(), &self.settings.variables);
        request.predicate = self.predicate.as_ref();
        if plan.push_order {
            request.order_by = &self.settings.order_by;
        }
        if plan.push_paging {
            request.first_result = self.settings.first_result;
            request.max_results = self.effective_max_results();
        }

        request
    }

    // Live entity for `reference`, or None when it no longer resolves.
    fn resolve(&self, reference: &EntityReference) -> Result<Option<Entity<E>>, Error> {
        match self.uow.find_by_reference::<E>(reference) {
            Ok(entity) => Ok(Some(entity)),
            Err(err) if err.is_not_found() => {
                log_stale(E::type_name(), reference);
                self.uow
                    .module()
                    .metrics
                    .record(MetricsEvent::StaleReferenceSkipped {
                        entity_type: E::type_name(),
                    });
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn record(&self, results: u64) {
        self.uow.module().metrics.record(MetricsEvent::QueryExecuted {
            entity_type: E::type_name(),
            results,
        });
    }
}

impl<E: EntityType> Query for EntityQuery<E> {
    type Item = Entity<E>;

    fn settings(&self) -> &QuerySettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut QuerySettings {
        &mut self.settings
    }

    fn find(&self) -> Result<Option<Entity<E>>, Error> {
        let finder = self.prepare()?;
        let plan = self.plan(finder);
        let local_paging = !plan.push_paging && self.settings.first_result > 0;

        let found = if plan.sort_locally || local_paging {
            self.iter()?.next().transpose()?
        } else {
            match finder.find_entity(self.request(plan))? {
                Some(reference) => match self.resolve(&reference)? {
                    Some(entity) => Some(entity),
                    // the first hit is stale; take the next live one
                    None => self.iter()?.next().transpose()?,
                },
                None => None,
            }
        };
        self.record(u64::from(found.is_some()));

        Ok(found)
    }

    fn iter(&self) -> Result<Box<dyn Iterator<Item = Result<Entity<E>, Error>> + '_>, Error> {
        let finder = self.prepare()?;
        let plan = self.plan(finder);
        let references = finder.find_entities(self.request(plan))?;

        let live = references.filter_map(move |reference| {
            reference
                .map_err(Error::from)
                .and_then(|reference| self.resolve(&reference))
                .transpose()
        });

        if plan.push_paging {
            return Ok(Box::new(live));
        }

        let mut entities = live.collect::<Result<Vec<_>, _>>()?;
        if plan.sort_locally {
            sort_rows(&mut entities, &self.settings.order_by)?;
        }
        let max = self.effective_max_results().unwrap_or(usize::MAX);

        Ok(Box::new(
            entities
                .into_iter()
                .skip(self.settings.first_result)
                .take(max)
                .map(Ok),
        ))
    }

    fn list(&self) -> Result<Vec<Entity<E>>, Error> {
        let entities = self.iter()?.collect::<Result<Vec<_>, _>>()?;
        self.record(entities.len() as u64);

        Ok(entities)
    }

    fn count(&self) -> Result<u64, Error> {
        let finder = self.prepare()?;
        let request = self.request(Plan {
            push_order: false,
            push_paging: false,
            sort_locally: false,
        });
        let count = finder.count_entities(request)?;
        self.record(count);

        Ok(count)
    }
}

impl<E: EntityType> fmt::Debug for EntityQuery<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityQuery")
            .field("entity_type", &E::type_name())
            .field("predicate", &self.predicate)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
