use std::sync::Arc;

use serde::Serialize;

use crate::client::Client;
use crate::config::{self, EnvSettings, ProviderConfig};
use crate::diagnostics::Diagnostics;
use crate::errors::ProviderError;
use crate::resource::token::TokenResource;
use crate::resource::Resource;
use crate::schema::{Attribute, AttributeType, Schema};

pub const PROVIDER_TYPE_NAME: &str = "mapbox";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderMetadata {
    pub type_name: String,
    pub version: String,
    pub resources: Vec<String>,
    pub data_sources: Vec<String>,
}

/// The Mapbox provider. Holds the client shared by every resource once
/// [`MapboxProvider::configure`] has succeeded.
#[derive(Debug)]
pub struct MapboxProvider {
    /// Release version, "dev" for local builds, "test" under acceptance tests.
    version: String,
    client: Option<Arc<Client>>,
}

impl MapboxProvider {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            client: None,
        }
    }

    /// Provider with an already built client, bypassing configuration.
    pub fn with_client(version: impl Into<String>, client: Client) -> Self {
        Self {
            version: version.into(),
            client: Some(Arc::new(client)),
        }
    }

    pub fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            type_name: PROVIDER_TYPE_NAME.to_string(),
            version: self.version.clone(),
            resources: vec![format!("{}_{}", PROVIDER_TYPE_NAME, TokenResource::TYPE_SUFFIX)],
            data_sources: Vec::new(),
        }
    }

    pub fn schema() -> Schema {
        Schema::new("Manage Mapbox resources").with_attribute(
            "access_token",
            Attribute::optional(AttributeType::String)
                .with_description("Access token to authenticate to mapbox with")
                .sensitive(),
        )
    }

    /// Resolve configuration and build the shared client.
    ///
    /// Every problem found is returned in the diagnostics. The client is only
    /// installed when there were no errors.
    pub fn configure(&mut self, config: &ProviderConfig, env: &EnvSettings) -> Diagnostics {
        let (resolved, mut diags) = config::resolve(config, env);

        if diags.has_error() {
            tracing::warn!(errors = diags.errors().count(), "provider configuration failed");
            return diags;
        }

        match Client::with_base_url(resolved.base_url.clone(), resolved.access_token) {
            Ok(client) => {
                tracing::debug!(base_url = %resolved.base_url, "configured Mapbox client");
                self.client = Some(Arc::new(client));
            }
            Err(e) => diags.add_error("Client Configuration Error", e.to_string()),
        }

        diags
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    pub fn token_resource(&self) -> Result<TokenResource, ProviderError> {
        self.client
            .clone()
            .map(TokenResource::new)
            .ok_or(ProviderError::NotConfigured)
    }
}
