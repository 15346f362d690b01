//! Mapbox provider — library crate.
//!
//! Exposes the `mapbox_token` resource lifecycle, the authenticated API
//! client and the provider configuration. The binary in `main.rs` and the
//! integration tests in `tests/` drive it through these modules.

pub mod client;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod provider;
pub mod resource;
pub mod schema;

pub use client::Client;
pub use diagnostics::{Diagnostic, Diagnostics};
pub use errors::{ApiError, ProviderError};
pub use provider::MapboxProvider;
pub use resource::token::{TokenId, TokenPlan, TokenResource, TokenState};
pub use resource::{PlanAction, ReadOutcome, Resource};
