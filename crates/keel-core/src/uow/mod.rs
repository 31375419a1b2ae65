//! Unit of work: the transactional boundary around entity access.
//!
//! A unit of work owns an identity map from `EntityReference` to cached
//! `EntityState`. Entities are loaded lazily, mutated in place, and
//! written as one change set by `complete()`. Conflicts with other units
//! of work are detected at completion through store versions, never
//! prevented by locks.

mod builder;
mod callback;
mod current;
mod error;
mod factory;
mod usecase;

#[cfg(test)]
mod tests;

use crate::{
    config::UnitOfWorkConfig,
    entity::{Entity, EntityReference, EntityState, EntityStatus, StateError},
    error::Error,
    model::EntityModel,
    obs::MetricsEvent,
    query::{EntityQuery, QueryBuilder},
    store::{ChangeSet, StoreError},
    traits::EntityType,
};
use chrono::{DateTime, Utc};
use std::{
    cell::{Cell, RefCell},
    collections::{BTreeMap, BTreeSet},
    fmt,
    rc::Rc,
    sync::Arc,
};
use tracing::{debug, info, info_span, warn};
use ulid::Ulid;

// re-exports
pub use builder::EntityBuilder;
pub use callback::{CallbackId, UnitOfWorkCallback, UnitOfWorkStatus};
pub use current::{CurrentGuard, with_unit_of_work};
pub use error::{CompletionError, ConstructionError, UnitOfWorkError};
pub use factory::{UnitOfWorkFactory, UnitOfWorkFactoryBuilder};
pub use usecase::Usecase;

pub(crate) use factory::Module;

///
/// CacheEntry
///

struct CacheEntry {
    state: Rc<RefCell<EntityState>>,
    model: &'static EntityModel,
}

impl CacheEntry {
    fn new(state: EntityState, model: &'static EntityModel) -> Self {
        Self {
            state: Rc::new(RefCell::new(state)),
            model,
        }
    }

    fn status(&self) -> EntityStatus {
        self.state.borrow().status()
    }
}

///
/// UnitOfWorkInner
///

pub(crate) struct UnitOfWorkInner {
    id: Ulid,
    usecase: Usecase,
    options: UnitOfWorkConfig,
    current_time: DateTime<Utc>,
    module: Arc<Module>,
    open: Cell<bool>,
    paused: Cell<bool>,
    cache: RefCell<BTreeMap<EntityReference, CacheEntry>>,
    callbacks: RefCell<Vec<(CallbackId, Rc<dyn UnitOfWorkCallback>)>>,
    next_callback: Cell<u64>,
}

///
/// UnitOfWork
///
/// Handle to one unit of work. Clones share the same instance. Not `Send`:
/// a unit of work belongs to the thread that opened it.
///

#[derive(Clone)]
pub struct UnitOfWork {
    inner: Rc<UnitOfWorkInner>,
}

impl UnitOfWork {
    pub(crate) fn open(module: Arc<Module>, usecase: Usecase) -> Self {
        let options = usecase.options.unwrap_or(module.config.unit_of_work);
        let inner = Rc::new(UnitOfWorkInner {
            id: Ulid::new(),
            usecase,
            options,
            current_time: Utc::now(),
            module,
            open: Cell::new(true),
            paused: Cell::new(false),
            cache: RefCell::new(BTreeMap::new()),
            callbacks: RefCell::new(Vec::new()),
            next_callback: Cell::new(0),
        });
        current::push(&inner);
        inner.module.metrics.record(MetricsEvent::UnitOfWorkStarted);
        debug!(uow = %inner.id, usecase = %inner.usecase.name, "unit of work opened");

        Self { inner }
    }

    /// The current unit of work on this thread, if any.
    #[must_use]
    pub fn current() -> Option<Self> {
        current::top().map(|inner| Self { inner })
    }

    // ------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------

    #[must_use]
    pub fn id(&self) -> Ulid {
        self.inner.id
    }

    #[must_use]
    pub fn usecase(&self) -> &Usecase {
        &self.inner.usecase
    }

    #[must_use]
    pub fn options(&self) -> UnitOfWorkConfig {
        self.inner.options
    }

    /// Wall-clock time captured when the unit of work was opened.
    #[must_use]
    pub fn current_time(&self) -> DateTime<Utc> {
        self.inner.current_time
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.inner.open.get()
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.inner.paused.get()
    }

    pub(crate) fn module(&self) -> &Module {
        &self.inner.module
    }

    pub(crate) fn ensure_open(&self) -> Result<(), UnitOfWorkError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(UnitOfWorkError::Closed { id: self.id() })
        }
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Load `identity` of type `E`, failing if the store has no record.
    pub fn find<E: EntityType>(&self, identity: &str) -> Result<Entity<E>, Error> {
        self.find_by_reference(&EntityReference::new(E::type_name(), identity))
    }

    pub fn find_by_reference<E: EntityType>(
        &self,
        reference: &EntityReference,
    ) -> Result<Entity<E>, Error> {
        self.ensure_open()?;
        let cell = self.load(reference, E::MODEL)?;
        if cell.borrow().status() == EntityStatus::Removed {
            return Err(UnitOfWorkError::NoSuchEntity {
                reference: reference.clone(),
            }
            .into());
        }

        Ok(Entity::new(reference.clone(), self.clone()))
    }

    /// Handle to `identity` without touching the store. Existence is
    /// checked on first access.
    pub fn get_reference<E: EntityType>(&self, identity: &str) -> Result<Entity<E>, Error> {
        self.ensure_open()?;
        let reference = EntityReference::new(E::type_name(), identity);
        if self.cached_status(&reference) == Some(EntityStatus::Removed) {
            return Err(UnitOfWorkError::NoSuchEntity { reference }.into());
        }

        Ok(Entity::new(reference, self.clone()))
    }

    /// Cached state object for `reference`, if this unit of work holds one.
    #[must_use]
    pub fn cached_state(&self, reference: &EntityReference) -> Option<Rc<RefCell<EntityState>>> {
        self.inner
            .cache
            .borrow()
            .get(reference)
            .map(|entry| Rc::clone(&entry.state))
    }

    fn cached_status(&self, reference: &EntityReference) -> Option<EntityStatus> {
        self.inner.cache.borrow().get(reference).map(CacheEntry::status)
    }

    // Identity-map lookup, loading from the store on a miss.
    fn load(
        &self,
        reference: &EntityReference,
        model: &'static EntityModel,
    ) -> Result<Rc<RefCell<EntityState>>, Error> {
        if let Some(state) = self.cached_state(reference) {
            debug!(uow = %self.id(), %reference, "cache hit");
            return Ok(state);
        }

        let state = self
            .module()
            .store
            .load(reference)?
            .ok_or_else(|| UnitOfWorkError::EntityNotFound {
                reference: reference.clone(),
            })?;
        debug!(uow = %self.id(), %reference, version = ?state.version(), "entity loaded");
        self.module().metrics.record(MetricsEvent::EntityLoaded);

        let entry = CacheEntry::new(state, model);
        let cell = Rc::clone(&entry.state);
        self.inner.cache.borrow_mut().insert(reference.clone(), entry);

        Ok(cell)
    }

    // State access for entity handles: closed units of work detach their
    // entities.
    pub(crate) fn state_cell(
        &self,
        reference: &EntityReference,
        model: &'static EntityModel,
    ) -> Result<Rc<RefCell<EntityState>>, Error> {
        if !self.is_open() {
            return Err(StateError::Detached {
                reference: reference.clone(),
            }
            .into());
        }

        self.load(reference, model)
    }

    /// Snapshot of `reference` for path traversal: cached state if held,
    /// otherwise the committed record, without caching it.
    pub(crate) fn peek_state(
        &self,
        reference: &EntityReference,
    ) -> Result<Option<EntityState>, StoreError> {
        if let Some(state) = self.cached_state(reference) {
            return Ok(Some(state.borrow().clone()));
        }

        self.module().store.load(reference)
    }

    // ------------------------------------------------------------------
    // Creation and removal
    // ------------------------------------------------------------------

    /// Builder for a new `E` with a generated identity.
    pub fn new_entity_builder<E: EntityType>(&self) -> Result<EntityBuilder<E>, Error> {
        self.ensure_open()?;
        EntityBuilder::new(self.clone(), None)
    }

    /// Builder for a new `E` with a fixed identity.
    pub fn new_entity_builder_with_identity<E: EntityType>(
        &self,
        identity: &str,
    ) -> Result<EntityBuilder<E>, Error> {
        self.ensure_open()?;
        EntityBuilder::new(self.clone(), Some(identity.to_string()))
    }

    /// Create an `E` directly from its defaults.
    pub fn new_entity<E: EntityType>(&self, identity: Option<&str>) -> Result<Entity<E>, Error> {
        let mut builder = match identity {
            Some(identity) => self.new_entity_builder_with_identity(identity)?,
            None => self.new_entity_builder()?,
        };

        builder.new_instance()
    }

    // Called by the builder once construction has been validated.
    pub(crate) fn register_new(
        &self,
        state: EntityState,
        model: &'static EntityModel,
    ) -> Result<(), Error> {
        self.ensure_open()?;
        let reference = state.reference().clone();
        debug!(uow = %self.id(), %reference, "entity created");
        self.inner
            .cache
            .borrow_mut()
            .insert(reference, CacheEntry::new(state, model));

        Ok(())
    }

    pub(crate) fn is_cached(&self, reference: &EntityReference) -> bool {
        self.inner.cache.borrow().contains_key(reference)
    }

    /// Mark `entity` removed. Its type's removal hook may veto.
    pub fn remove<E: EntityType>(&self, entity: &Entity<E>) -> Result<(), Error> {
        self.ensure_open()?;
        let reference = entity.reference();
        let cell = self.load(reference, E::MODEL)?;
        let mut state = cell.borrow_mut();
        if state.status() == EntityStatus::Removed {
            return Err(UnitOfWorkError::NoSuchEntity {
                reference: reference.clone(),
            }
            .into());
        }

        if let Some(hook) = E::MODEL.hooks.on_remove {
            hook(&state).map_err(|source| UnitOfWorkError::RemovalRejected {
                reference: reference.clone(),
                source,
            })?;
        }
        state.transition(EntityStatus::Removed)?;
        debug!(uow = %self.id(), %reference, "entity removed");

        Ok(())
    }

    // ------------------------------------------------------------------
    // Refresh
    // ------------------------------------------------------------------

    /// Reload `entity` from the store, dropping local changes to it.
    /// New entities have nothing to reload and are left untouched; removed
    /// ones are gone from this unit of work and cannot be reloaded.
    pub fn refresh<E: EntityType>(&self, entity: &Entity<E>) -> Result<(), Error> {
        self.ensure_open()?;
        let reference = entity.reference();
        match self.cached_status(reference) {
            Some(EntityStatus::New) => return Ok(()),
            Some(EntityStatus::Removed) => {
                return Err(UnitOfWorkError::NoSuchEntity {
                    reference: reference.clone(),
                }
                .into());
            }
            Some(_) => {}
            None => {
                self.load(reference, E::MODEL)?;
                return Ok(());
            }
        }

        let fresh = self.fetch(reference)?;
        self.replace(reference, fresh);

        Ok(())
    }

    /// Reload every cached entity that exists in the store. New and removed
    /// entities are skipped. All records are fetched before any is replaced.
    pub fn refresh_all(&self) -> Result<(), Error> {
        self.ensure_open()?;
        let references: Vec<EntityReference> = self
            .inner
            .cache
            .borrow()
            .iter()
            .filter(|(_, entry)| {
                !matches!(entry.status(), EntityStatus::New | EntityStatus::Removed)
            })
            .map(|(reference, _)| reference.clone())
            .collect();

        let fresh = references
            .iter()
            .map(|reference| self.fetch(reference))
            .collect::<Result<Vec<_>, _>>()?;
        for state in fresh {
            let reference = state.reference().clone();
            self.replace(&reference, state);
        }

        Ok(())
    }

    fn fetch(&self, reference: &EntityReference) -> Result<EntityState, Error> {
        Ok(self
            .module()
            .store
            .load(reference)?
            .ok_or_else(|| UnitOfWorkError::EntityNotFound {
                reference: reference.clone(),
            })?)
    }

    // Swap in a new state object; the old one keeps its (monotonic) status.
    fn replace(&self, reference: &EntityReference, state: EntityState) {
        let mut cache = self.inner.cache.borrow_mut();
        if let Some(entry) = cache.get_mut(reference) {
            entry.state = Rc::new(RefCell::new(state));
            debug!(uow = %self.id(), %reference, "entity refreshed");
        }
    }

    // ------------------------------------------------------------------
    // Completion
    // ------------------------------------------------------------------

    /// Write every new, updated, and removed entity as one change set.
    ///
    /// On a version conflict or store failure the unit of work stays open
    /// so the caller can refresh and retry. A rejecting pre-completion
    /// hook or callback discards it.
    pub fn complete(&self) -> Result<(), Error> {
        let span = info_span!("complete", uow = %self.id(), usecase = %self.usecase().name);
        let _enter = span.enter();

        self.ensure_open()?;
        if self.is_paused() {
            return Err(UnitOfWorkError::NotActive { id: self.id() }.into());
        }

        let conflicts = self
            .verify_versions()
            .map_err(CompletionError::Store)?;
        if !conflicts.is_empty() {
            return Err(self.conflict(conflicts));
        }

        if let Err(err) = self.before_completion() {
            warn!(error = %err, "commit rejected before completion; discarding");
            self.discard();
            return Err(err.into());
        }

        let changes = self.change_set();
        let (created, updated, removed) = (
            changes.created.len() as u64,
            changes.updated.len() as u64,
            changes.removed.len() as u64,
        );
        let time = changes.time;

        let receipt = if changes.is_empty() {
            crate::store::CommitReceipt::default()
        } else {
            match self.module().store.apply_changes(changes) {
                Ok(receipt) => receipt,
                Err(StoreError::Conflict { references }) => return Err(self.conflict(references)),
                Err(StoreError::AlreadyExists { reference }) => {
                    return Err(self.conflict(BTreeSet::from([reference])));
                }
                Err(err) => return Err(CompletionError::Store(err).into()),
            }
        };

        for (reference, version) in &receipt.versions {
            if let Some(state) = self.cached_state(reference) {
                state.borrow_mut().mark_committed(*version, time);
            }
        }

        self.close_inner();
        self.module().metrics.record(MetricsEvent::UnitOfWorkCompleted {
            created,
            updated,
            removed,
        });
        info!(created, updated, removed, "unit of work completed");
        self.after_completion(UnitOfWorkStatus::Completed);

        Ok(())
    }

    fn conflict(&self, entities: BTreeSet<EntityReference>) -> Error {
        warn!(conflicts = entities.len(), "concurrent modification detected");
        self.module().metrics.record(MetricsEvent::UnitOfWorkConflicted {
            entities: entities.len() as u64,
        });

        CompletionError::ConcurrentModification { entities }.into()
    }

    // References whose store version moved on since they were loaded.
    fn verify_versions(&self) -> Result<BTreeSet<EntityReference>, StoreError> {
        let checks: Vec<(EntityReference, crate::entity::Version)> = self
            .inner
            .cache
            .borrow()
            .iter()
            .filter_map(|(reference, entry)| {
                let state = entry.state.borrow();
                let version = state.version()?;
                let check = match state.status() {
                    EntityStatus::Updated | EntityStatus::Removed => true,
                    EntityStatus::Loaded => self.inner.options.verify_loaded_versions,
                    EntityStatus::New => false,
                };

                check.then(|| (reference.clone(), version))
            })
            .collect();

        let mut conflicts = BTreeSet::new();
        for (reference, version) in checks {
            if !self.module().store.verify_version(&reference, version)? {
                conflicts.insert(reference);
            }
        }

        Ok(conflicts)
    }

    // Entity hooks first, then registered callbacks in order.
    fn before_completion(&self) -> Result<(), CompletionError> {
        let hooked: Vec<_> = self
            .inner
            .cache
            .borrow()
            .values()
            .filter_map(|entry| {
                entry
                    .model
                    .hooks
                    .before_completion
                    .map(|hook| (hook, Rc::clone(&entry.state)))
            })
            .collect();

        for (hook, state) in hooked {
            let state = state.borrow();
            if state.status() == EntityStatus::Removed {
                continue;
            }
            hook(&state).map_err(|source| CompletionError::EntityRejected {
                reference: state.reference().clone(),
                source,
            })?;
        }

        for callback in self.callbacks() {
            callback
                .before_completion()
                .map_err(|source| CompletionError::CallbackRejected { source })?;
        }

        Ok(())
    }

    fn change_set(&self) -> ChangeSet {
        let mut changes = ChangeSet::new(Utc::now());
        for entry in self.inner.cache.borrow().values() {
            let state = entry.state.borrow();
            match (state.status(), state.version()) {
                (EntityStatus::New, _) => changes.created.push(state.clone()),
                (EntityStatus::Updated, _) => changes.updated.push(state.clone()),
                (EntityStatus::Removed, Some(version)) => {
                    changes.removed.push((state.reference().clone(), version));
                }
                // loaded, or created and removed within this unit of work
                (EntityStatus::Loaded | EntityStatus::Removed, _) => {}
            }
        }

        changes
    }

    /// Abandon all local changes and close. A no-op once closed.
    pub fn discard(&self) {
        if !self.is_open() {
            return;
        }

        self.close_inner();
        self.module().metrics.record(MetricsEvent::UnitOfWorkDiscarded);
        debug!(uow = %self.id(), "unit of work discarded");
        self.after_completion(UnitOfWorkStatus::Discarded);
    }

    /// Same as `discard`.
    pub fn close(&self) {
        self.discard();
    }

    fn close_inner(&self) {
        self.inner.open.set(false);
        self.inner.paused.set(false);
        self.inner.cache.borrow_mut().clear();
        current::remove_all(&self.inner);
    }

    fn after_completion(&self, status: UnitOfWorkStatus) {
        for callback in self.callbacks() {
            if let Err(err) = callback.after_completion(status) {
                warn!(uow = %self.id(), %status, error = %err, "completion callback failed");
            }
        }
    }

    // ------------------------------------------------------------------
    // Callbacks
    // ------------------------------------------------------------------

    pub fn register_callback(&self, callback: impl UnitOfWorkCallback + 'static) -> CallbackId {
        let id = CallbackId(self.inner.next_callback.get());
        self.inner.next_callback.set(id.0 + 1);
        self.inner
            .callbacks
            .borrow_mut()
            .push((id, Rc::new(callback)));

        id
    }

    /// Unregister `id`; returns false if it was not registered.
    pub fn remove_callback(&self, id: CallbackId) -> bool {
        let mut callbacks = self.inner.callbacks.borrow_mut();
        let before = callbacks.len();
        callbacks.retain(|(registered, _)| *registered != id);

        callbacks.len() != before
    }

    // Snapshot so callbacks may register or remove callbacks themselves.
    fn callbacks(&self) -> Vec<Rc<dyn UnitOfWorkCallback>> {
        self.inner
            .callbacks
            .borrow()
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect()
    }

    // ------------------------------------------------------------------
    // Current scoping
    // ------------------------------------------------------------------

    /// Stop being current without touching the cache. With
    /// `prune_on_pause`, unmodified cached entities are dropped.
    pub fn pause(&self) -> Result<(), Error> {
        self.ensure_open()?;
        if self.is_paused() {
            return Err(UnitOfWorkError::NotActive { id: self.id() }.into());
        }

        self.inner.paused.set(true);
        current::remove(&self.inner);
        if self.inner.options.prune_on_pause {
            self.inner
                .cache
                .borrow_mut()
                .retain(|_, entry| entry.status() != EntityStatus::Loaded);
        }
        debug!(uow = %self.id(), "unit of work paused");

        Ok(())
    }

    /// Become current again after `pause`.
    pub fn resume(&self) -> Result<(), Error> {
        self.ensure_open()?;
        if !self.is_paused() {
            return Err(UnitOfWorkError::NotPaused { id: self.id() }.into());
        }

        self.inner.paused.set(false);
        current::push(&self.inner);
        debug!(uow = %self.id(), "unit of work resumed");

        Ok(())
    }

    /// Make this the current unit of work until the guard drops.
    pub fn enter(&self) -> CurrentGuard {
        CurrentGuard::enter(&self.inner)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    #[must_use]
    pub fn new_query<E: EntityType>(&self, builder: &QueryBuilder<E>) -> EntityQuery<E> {
        builder.new_query(self)
    }

    pub(crate) fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("id", &self.inner.id)
            .field("usecase", &self.inner.usecase.name)
            .field("open", &self.is_open())
            .field("paused", &self.is_paused())
            .field("cached", &self.inner.cache.borrow().len())
            .finish()
    }
}
