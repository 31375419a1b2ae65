use crate::{
    config::RuntimeConfig,
    entity::{IdentityGenerator, UlidIdentityGenerator},
    obs::{MetricsSink, NoopSink},
    query::{EntityFinder, MemoryEntityFinder},
    store::{EntityStore, MemoryEntityStore},
    uow::{UnitOfWork, Usecase},
};
use std::sync::Arc;

///
/// Module
///
/// Collaborators shared by every unit of work a factory opens.
///

pub(crate) struct Module {
    pub store: Arc<dyn EntityStore>,
    pub finder: Option<Arc<dyn EntityFinder>>,
    pub identities: Arc<dyn IdentityGenerator>,
    pub metrics: Arc<dyn MetricsSink>,
    pub config: RuntimeConfig,
}

///
/// UnitOfWorkFactory
///
/// Opens units of work over one store/finder pair. Cheap to clone and
/// safe to share across threads; the units of work it opens are not.
///

#[derive(Clone)]
pub struct UnitOfWorkFactory {
    module: Arc<Module>,
}

impl UnitOfWorkFactory {
    #[must_use]
    pub fn builder(store: Arc<dyn EntityStore>) -> UnitOfWorkFactoryBuilder {
        UnitOfWorkFactoryBuilder {
            store,
            finder: None,
            identities: Arc::new(UlidIdentityGenerator),
            metrics: Arc::new(NoopSink),
            config: RuntimeConfig::default(),
        }
    }

    /// Factory over a fresh in-memory store with a finder that queries it.
    #[must_use]
    pub fn in_memory() -> (Self, Arc<MemoryEntityStore>) {
        let store = Arc::new(MemoryEntityStore::new());
        let factory = Self::builder(store.clone())
            .finder(Arc::new(MemoryEntityFinder::new(store.clone())))
            .build();

        (factory, store)
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.module.config
    }

    /// Open a unit of work for the default usecase. It becomes current.
    #[must_use]
    pub fn new_unit_of_work(&self) -> UnitOfWork {
        self.new_unit_of_work_for(Usecase::default())
    }

    #[must_use]
    pub fn new_unit_of_work_for(&self, usecase: Usecase) -> UnitOfWork {
        UnitOfWork::open(Arc::clone(&self.module), usecase)
    }

    /// The current unit of work on this thread, if any.
    #[must_use]
    pub fn current_unit_of_work(&self) -> Option<UnitOfWork> {
        UnitOfWork::current()
    }
}

///
/// UnitOfWorkFactoryBuilder
///

#[must_use]
pub struct UnitOfWorkFactoryBuilder {
    store: Arc<dyn EntityStore>,
    finder: Option<Arc<dyn EntityFinder>>,
    identities: Arc<dyn IdentityGenerator>,
    metrics: Arc<dyn MetricsSink>,
    config: RuntimeConfig,
}

impl UnitOfWorkFactoryBuilder {
    pub fn finder(mut self, finder: Arc<dyn EntityFinder>) -> Self {
        self.finder = Some(finder);
        self
    }

    pub fn identities(mut self, identities: Arc<dyn IdentityGenerator>) -> Self {
        self.identities = identities;
        self
    }

    pub fn metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> UnitOfWorkFactory {
        UnitOfWorkFactory {
            module: Arc::new(Module {
                store: self.store,
                finder: self.finder,
                identities: self.identities,
                metrics: self.metrics,
                config: self.config,
            }),
        }
    }
}
