use crate::{
    entity::{EntityReference, EntityState, EntityStatus, StateError, Version},
    error::Error,
    query::{
        Association, FieldPresence, ManyAssociation, Property, PropertyPath, QueryError, Row,
        StateRow,
    },
    traits::{EntityType, FieldValue, HasMixin, Mixin},
    uow::UnitOfWork,
    value::Value,
};
use std::{fmt, marker::PhantomData};

///
/// Entity
///
/// Typed handle to one entity inside one unit of work. Holds no data of
/// its own: every access resolves through the unit of work's identity
/// map, so all handles to a reference observe the same state, a refresh
/// is seen everywhere, and a closed unit of work detaches them all.
///

pub struct Entity<E: EntityType> {
    reference: EntityReference,
    uow: UnitOfWork,
    _marker: PhantomData<fn() -> E>,
}

impl<E: EntityType> Entity<E> {
    pub(crate) const fn new(reference: EntityReference, uow: UnitOfWork) -> Self {
        Self {
            reference,
            uow,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn reference(&self) -> &EntityReference {
        &self.reference
    }

    #[must_use]
    pub fn identity(&self) -> &str {
        self.reference.identity()
    }

    #[must_use]
    pub const fn unit_of_work(&self) -> &UnitOfWork {
        &self.uow
    }

    // Any status, including removed.
    fn with_state<T>(&self, f: impl FnOnce(&EntityState) -> T) -> Result<T, Error> {
        let cell = self.uow.state_cell(&self.reference, E::MODEL)?;
        let state = cell.borrow();

        Ok(f(&state))
    }

    fn read<T>(&self, f: impl FnOnce(&EntityState) -> Result<T, Error>) -> Result<T, Error> {
        let cell = self.uow.state_cell(&self.reference, E::MODEL)?;
        let state = cell.borrow();
        if state.status() == EntityStatus::Removed {
            return Err(StateError::Removed {
                reference: self.reference.clone(),
            }
            .into());
        }

        f(&state)
    }

    fn write<T>(&self, f: impl FnOnce(&mut EntityState) -> Result<T, Error>) -> Result<T, Error> {
        let cell = self.uow.state_cell(&self.reference, E::MODEL)?;
        let mut state = cell.borrow_mut();

        f(&mut state)
    }

    fn check_field(&self, name: &str) -> Result<(), StateError> {
        if E::MODEL.field(name).is_some() {
            Ok(())
        } else {
            Err(StateError::UnknownField {
                entity_type: E::type_name().to_string(),
                field: name.to_string(),
            })
        }
    }

    // ------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------

    pub fn status(&self) -> Result<EntityStatus, Error> {
        self.with_state(EntityState::status)
    }

    pub fn version(&self) -> Result<Option<Version>, Error> {
        self.with_state(EntityState::version)
    }

    /// Detached copy of the current state.
    pub fn state(&self) -> Result<EntityState, Error> {
        self.with_state(EntityState::clone)
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    /// Read a property. An unset property reads as null.
    pub fn get<V: FieldValue>(&self, property: Property<E, V>) -> Result<V, Error> {
        self.read(|state| read_property(state, property.name()))
    }

    pub fn set<V: FieldValue>(
        &self,
        property: Property<E, V>,
        value: impl Into<V>,
    ) -> Result<(), Error> {
        self.check_field(property.name())?;
        let value = value.into().to_value();

        self.write(|state| Ok(state.set_property(property.name(), value)?))
    }

    // ------------------------------------------------------------------
    // Associations
    // ------------------------------------------------------------------

    /// Associated entity, as a lazy handle in the same unit of work.
    pub fn association<T: EntityType>(
        &self,
        association: Association<E, T>,
    ) -> Result<Option<Entity<T>>, Error> {
        let target = self.read(|state| {
            Ok(state
                .association(association.name())
                .flatten()
                .cloned())
        })?;

        Ok(target.map(|reference| Entity::new(reference, self.uow.clone())))
    }

    pub fn set_association<T: EntityType>(
        &self,
        association: Association<E, T>,
        target: Option<&Entity<T>>,
    ) -> Result<(), Error> {
        self.check_field(association.name())?;
        let target = target.map(|entity| entity.reference.clone());

        self.write(|state| Ok(state.set_association(association.name(), target)?))
    }

    pub fn many_association<T: EntityType>(
        &self,
        association: ManyAssociation<E, T>,
    ) -> Result<Vec<Entity<T>>, Error> {
        let targets = self.read(|state| Ok(state.many_association(association.name()).to_vec()))?;

        Ok(targets
            .into_iter()
            .map(|reference| Entity::new(reference, self.uow.clone()))
            .collect())
    }

    /// Append `target`; false if it was already present.
    pub fn add_association<T: EntityType>(
        &self,
        association: ManyAssociation<E, T>,
        target: &Entity<T>,
    ) -> Result<bool, Error> {
        self.check_field(association.name())?;

        self.write(|state| Ok(state.add_to_many(association.name(), target.reference.clone())?))
    }

    /// Remove `target`; false if it was not present.
    pub fn remove_association<T: EntityType>(
        &self,
        association: ManyAssociation<E, T>,
        target: &Entity<T>,
    ) -> Result<bool, Error> {
        self.check_field(association.name())?;

        self.write(|state| Ok(state.remove_from_many(association.name(), &target.reference)?))
    }

    // ------------------------------------------------------------------
    // Mixins
    // ------------------------------------------------------------------

    /// Typed access to the fields contributed by mixin `M`.
    #[must_use]
    pub const fn mixin<M: Mixin>(&self) -> MixinAccess<'_, E, M>
    where
        E: HasMixin<M>,
    {
        MixinAccess {
            entity: self,
            _marker: PhantomData,
        }
    }
}

fn read_property<V: FieldValue>(state: &EntityState, name: &str) -> Result<V, Error> {
    let value = state.property(name).unwrap_or(&Value::Null);

    V::from_value(value).ok_or_else(|| {
        StateError::TypeMismatch {
            reference: state.reference().clone(),
            field: name.to_string(),
            found: value.kind_label(),
        }
        .into()
    })
}

impl<E: EntityType> Clone for Entity<E> {
    fn clone(&self) -> Self {
        Self::new(self.reference.clone(), self.uow.clone())
    }
}

impl<E: EntityType> PartialEq for Entity<E> {
    fn eq(&self, other: &Self) -> bool {
        self.reference == other.reference && self.uow.same_as(&other.uow)
    }
}

impl<E: EntityType> Eq for Entity<E> {}

impl<E: EntityType> fmt::Debug for Entity<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.reference)
    }
}

impl<E: EntityType> From<&Entity<E>> for EntityReference {
    fn from(entity: &Entity<E>) -> Self {
        entity.reference.clone()
    }
}

// Evaluation reads through the identity map; traversals see uncommitted
// changes of cached targets. An unreadable entity has no fields; a store
// failure while following a path is a query error.
impl<E: EntityType> Row for Entity<E> {
    fn field(&self, path: &PropertyPath) -> Result<FieldPresence, QueryError> {
        let resolve = |reference: &EntityReference| {
            self.uow
                .peek_state(reference)
                .map_err(|err| QueryError::backend(err.to_string()))
        };

        self.read(|state| Ok(StateRow::new(state, resolve).field(path)))
            .unwrap_or(Ok(FieldPresence::Missing))
    }
}

///
/// MixinAccess
///

pub struct MixinAccess<'a, E: EntityType, M> {
    entity: &'a Entity<E>,
    _marker: PhantomData<fn() -> M>,
}

impl<E: HasMixin<M>, M: Mixin> MixinAccess<'_, E, M> {
    pub fn get<V: FieldValue>(&self, property: Property<M, V>) -> Result<V, Error> {
        self.entity
            .read(|state| read_property(state, property.name()))
    }

    pub fn set<V: FieldValue>(
        &self,
        property: Property<M, V>,
        value: impl Into<V>,
    ) -> Result<(), Error> {
        let value = value.into().to_value();

        self.entity
            .write(|state| Ok(state.set_property(property.name(), value)?))
    }
}

///
/// StateView
///
/// Typed read/write view over a not-yet-registered state, scoped to the
/// fields declared on `O` (an entity type or one of its mixins).
///

pub struct StateView<'a, O> {
    state: &'a mut EntityState,
    _marker: PhantomData<fn() -> O>,
}

impl<'a, O> StateView<'a, O> {
    pub(crate) const fn new(state: &'a mut EntityState) -> Self {
        Self {
            state,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn reference(&self) -> &EntityReference {
        self.state.reference()
    }

    pub fn get<V: FieldValue>(&self, property: Property<O, V>) -> Result<V, Error> {
        read_property(self.state, property.name())
    }

    pub fn set<V: FieldValue>(
        &mut self,
        property: Property<O, V>,
        value: impl Into<V>,
    ) -> Result<&mut Self, Error> {
        self.state
            .set_property(property.name(), value.into().to_value())?;

        Ok(self)
    }

    pub fn set_association<T: EntityType>(
        &mut self,
        association: Association<O, T>,
        target: Option<&Entity<T>>,
    ) -> Result<&mut Self, Error> {
        self.state.set_association(
            association.name(),
            target.map(|entity| entity.reference().clone()),
        )?;

        Ok(self)
    }

    pub fn add_association<T: EntityType>(
        &mut self,
        association: ManyAssociation<O, T>,
        target: &Entity<T>,
    ) -> Result<&mut Self, Error> {
        self.state
            .add_to_many(association.name(), target.reference().clone())?;

        Ok(self)
    }
}
