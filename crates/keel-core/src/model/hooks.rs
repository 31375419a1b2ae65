use crate::entity::EntityState;
use thiserror::Error as ThisError;

/// Runs once when a builder produces a new instance; may adjust the state.
pub type CreateHook = fn(&mut EntityState) -> Result<(), LifecycleError>;

/// Read-only hook (removal, pre-completion); an error vetoes the operation.
pub type InspectHook = fn(&EntityState) -> Result<(), LifecycleError>;

///
/// LifecycleError
///
/// Business-rule rejection raised from a lifecycle hook.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{message}")]
pub struct LifecycleError {
    pub message: String,
}

impl LifecycleError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

///
/// LifecycleHooks
///
/// Optional lifecycle capabilities of an entity type. Each hook is absent
/// unless the model installs it.
///

#[derive(Clone, Copy, Default)]
pub struct LifecycleHooks {
    pub on_create: Option<CreateHook>,
    pub on_remove: Option<InspectHook>,
    pub before_completion: Option<InspectHook>,
}

impl LifecycleHooks {
    pub const NONE: Self = Self {
        on_create: None,
        on_remove: None,
        before_completion: None,
    };

    #[must_use]
    pub const fn on_create(mut self, hook: CreateHook) -> Self {
        self.on_create = Some(hook);
        self
    }

    #[must_use]
    pub const fn on_remove(mut self, hook: InspectHook) -> Self {
        self.on_remove = Some(hook);
        self
    }

    #[must_use]
    pub const fn before_completion(mut self, hook: InspectHook) -> Self {
        self.before_completion = Some(hook);
        self
    }
}
