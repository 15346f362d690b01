use serde::Deserialize;

use crate::client::MAPBOX_ENDPOINT;
use crate::diagnostics::Diagnostics;

pub const ACCESS_TOKEN_ENV: &str = "MAPBOX_ACCESS_TOKEN";
/// Overrides the API base URL. Useful for proxies and local mock servers.
pub const API_URL_ENV: &str = "MAPBOX_API_URL";

/// The provider configuration block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderConfig {
    /// Access token to authenticate to Mapbox with.
    #[serde(default)]
    pub access_token: Option<String>,
}

/// Settings taken from the process environment.
#[derive(Debug, Clone, Default)]
pub struct EnvSettings {
    pub access_token: Option<String>,
    pub api_url: Option<String>,
}

/// Load environment settings, honouring a `.env` file if present.
pub fn load() -> EnvSettings {
    dotenvy::dotenv().ok();

    EnvSettings {
        access_token: std::env::var(ACCESS_TOKEN_ENV).ok(),
        api_url: std::env::var(API_URL_ENV).ok(),
    }
}

/// Fully resolved settings used to build the shared client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub access_token: Option<String>,
    pub base_url: String,
}

/// Resolve the provider configuration against the environment.
///
/// A non-empty `access_token` in the configuration block wins over the
/// environment. Problems are collected into the returned diagnostics instead
/// of stopping at the first one.
pub fn resolve(config: &ProviderConfig, env: &EnvSettings) -> (ResolvedConfig, Diagnostics) {
    let mut diags = Diagnostics::new();

    let access_token = non_empty(config.access_token.as_deref())
        .or_else(|| non_empty(env.access_token.as_deref()))
        .map(String::from);

    if access_token.is_none() {
        diags.add_error(
            "Missing Access Token Configuration",
            format!(
                "While configuring the provider, the API token was not found in the \
                 {} environment variable or provider configuration block access_token \
                 attribute.",
                ACCESS_TOKEN_ENV
            ),
        );
    }

    let base_url = match non_empty(env.api_url.as_deref()) {
        Some(raw) => match url::Url::parse(raw) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => {
                diags.add_warning(
                    "Custom API URL",
                    format!("{} is set, requests will be sent to {}", API_URL_ENV, raw),
                );
                raw.to_string()
            }
            Ok(u) => {
                diags.add_error(
                    "Invalid API URL",
                    format!("{} must use http or https, got scheme {:?}", API_URL_ENV, u.scheme()),
                );
                MAPBOX_ENDPOINT.to_string()
            }
            Err(e) => {
                diags.add_error(
                    "Invalid API URL",
                    format!("{} is not a valid URL ({:?}): {}", API_URL_ENV, raw, e),
                );
                MAPBOX_ENDPOINT.to_string()
            }
        },
        None => MAPBOX_ENDPOINT.to_string(),
    };

    (
        ResolvedConfig {
            access_token,
            base_url,
        },
        diags,
    )
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
