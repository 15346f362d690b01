//! Managed resource lifecycle.
//!
//! A resource is driven by the host through plan → create / update / delete,
//! with read refreshing state between runs and import seeding state from an
//! externally supplied identifier.

pub mod token;

use async_trait::async_trait;

use crate::errors::ProviderError;
use crate::schema::Schema;

/// Result of refreshing a resource from the remote API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome<S> {
    Found(S),
    /// The remote record is gone; the host should drop it from state.
    NotFound,
}

impl<S> ReadOutcome<S> {
    pub fn found(self) -> Option<S> {
        match self {
            ReadOutcome::Found(s) => Some(s),
            ReadOutcome::NotFound => None,
        }
    }
}

/// What applying a desired configuration against prior state requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanAction {
    Create,
    Update { changed: Vec<&'static str> },
    /// Destroy then recreate; `attributes` are the changed replace triggers.
    Replace { attributes: Vec<&'static str> },
    NoChange,
}

#[async_trait]
pub trait Resource: Send + Sync {
    /// Desired configuration as written by the user.
    type Config: Send + Sync;
    /// Persisted state, including computed attributes.
    type State: Send + Sync;

    /// Resource type suffix, joined with the provider type name.
    const TYPE_SUFFIX: &'static str;

    fn type_name(&self, provider_type_name: &str) -> String {
        format!("{}_{}", provider_type_name, Self::TYPE_SUFFIX)
    }

    fn schema(&self) -> Schema;

    fn plan(&self, prior: Option<&Self::State>, desired: &Self::Config) -> PlanAction;

    async fn create(&self, desired: &Self::Config) -> Result<Self::State, ProviderError>;

    async fn read(&self, state: &Self::State) -> Result<ReadOutcome<Self::State>, ProviderError>;

    async fn update(
        &self,
        prior: &Self::State,
        desired: &Self::Config,
    ) -> Result<Self::State, ProviderError>;

    async fn delete(&self, state: &Self::State) -> Result<(), ProviderError>;

    /// Seed state from an imported identifier; a following read fills the rest.
    fn import_state(&self, id: &str) -> Self::State;
}
