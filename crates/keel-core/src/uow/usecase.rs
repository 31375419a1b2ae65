use crate::config::UnitOfWorkConfig;
use serde::{Deserialize, Serialize};

///
/// Usecase
///
/// Names the business operation a unit of work serves. Carries optional
/// unit-of-work options that replace the factory defaults.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Usecase {
    pub name: String,
    pub options: Option<UnitOfWorkConfig>,
}

impl Usecase {
    pub const DEFAULT_NAME: &'static str = "default";

    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: None,
        }
    }

    #[must_use]
    pub const fn with_options(mut self, options: UnitOfWorkConfig) -> Self {
        self.options = Some(options);
        self
    }
}

impl Default for Usecase {
    fn default() -> Self {
        Self::new(Self::DEFAULT_NAME)
    }
}
