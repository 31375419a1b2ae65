use crate::{
    entity::{Entity, EntityReference, EntityState, StateView},
    error::Error,
    model::FieldKind,
    traits::{EntityType, HasMixin, Mixin},
    uow::{ConstructionError, UnitOfWork},
};
use std::marker::PhantomData;

///
/// EntityBuilder
///
/// Staged construction of a new entity. The in-progress state is private
/// to the builder until `new_instance` validates it and registers it with
/// the unit of work as `New`.
///
/// Builders are reusable: each `new_instance` registers a copy of the
/// current state. Without a fixed identity a fresh one is minted after
/// every instance; with a fixed identity a second instance fails with
/// `AlreadyExists`.
///

pub struct EntityBuilder<E: EntityType> {
    uow: UnitOfWork,
    state: EntityState,
    fixed_identity: bool,
    _marker: PhantomData<fn() -> E>,
}

impl<E: EntityType> EntityBuilder<E> {
    pub(crate) fn new(uow: UnitOfWork, identity: Option<String>) -> Result<Self, Error> {
        let fixed_identity = identity.is_some();
        let identity = identity.unwrap_or_else(|| uow.module().identities.generate(E::type_name()));
        let mut state = EntityState::new(EntityReference::new(E::type_name(), identity));

        for field in E::MODEL.all_fields() {
            match field.kind {
                FieldKind::ManyAssociation => state.init_many(field.name),
                FieldKind::Property => {
                    if let Some(default) = field.default {
                        state.set_property(field.name, default())?;
                    }
                }
                FieldKind::Association => {}
            }
        }

        Ok(Self {
            uow,
            state,
            fixed_identity,
            _marker: PhantomData,
        })
    }

    /// Reference the next instance will be registered under.
    #[must_use]
    pub const fn reference(&self) -> &EntityReference {
        self.state.reference()
    }

    /// Typed view over the whole in-progress state.
    pub fn state_of_composite(&mut self) -> StateView<'_, E> {
        StateView::new(&mut self.state)
    }

    /// Typed view restricted to the fields of mixin `M`.
    pub fn state_for<M: Mixin>(&mut self) -> StateView<'_, M>
    where
        E: HasMixin<M>,
    {
        StateView::new(&mut self.state)
    }

    /// Validate, run the creation hook, and register the entity as `New`.
    pub fn new_instance(&mut self) -> Result<Entity<E>, Error> {
        self.uow.ensure_open()?;

        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(ConstructionError::MissingFields {
                entity_type: E::type_name().to_string(),
                fields: missing,
            }
            .into());
        }

        let reference = self.state.reference().clone();
        if self.uow.is_cached(&reference) || self.uow.module().store.exists(&reference)? {
            return Err(ConstructionError::AlreadyExists { reference }.into());
        }

        let mut instance = self.state.clone();
        if let Some(hook) = E::MODEL.hooks.on_create {
            hook(&mut instance).map_err(|source| ConstructionError::CreateRejected {
                reference: reference.clone(),
                source,
            })?;
        }
        self.uow.register_new(instance, E::MODEL)?;

        if !self.fixed_identity {
            let identity = self.uow.module().identities.generate(E::type_name());
            self.state
                .set_reference(reference.with_identity(identity));
        }

        Ok(Entity::new(reference, self.uow.clone()))
    }

    // Required fields still unset. Null counts as unset.
    fn missing_fields(&self) -> Vec<String> {
        E::MODEL
            .all_fields()
            .filter(|field| !field.optional)
            .filter(|field| match field.kind {
                FieldKind::Property => self.state.property(field.name).is_none_or(|v| v.is_null()),
                FieldKind::Association => !matches!(self.state.association(field.name), Some(Some(_))),
                FieldKind::ManyAssociation => false,
            })
            .map(|field| field.name.to_string())
            .collect()
    }
}

impl<E: EntityType> Iterator for EntityBuilder<E> {
    type Item = Result<Entity<E>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.new_instance())
    }
}
