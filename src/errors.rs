use serde::Deserialize;
use thiserror::Error;

/// Failure decoded from a Mapbox response outside the 200–399 range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("API Error: {status} {endpoint} {message}")]
pub struct ApiError {
    pub status: u16,
    /// Relative endpoint that was requested, e.g. `tokens/v2/alice`.
    pub endpoint: String,
    pub message: String,
}

/// Error body shapes returned by the API. Mapbox mostly answers with a flat
/// `{"message": ..}`, older endpoints nest it under `error`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<NestedError>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NestedError {
    #[serde(default)]
    message: Option<String>,
}

impl ApiError {
    /// Build an error from a failing response body, falling back to the raw
    /// body text when it isn't a recognised JSON error document.
    pub fn from_body(status: u16, endpoint: impl Into<String>, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error.and_then(|e| e.message).or(b.message))
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| body.to_string());

        Self {
            status,
            endpoint: endpoint.into(),
            message,
        }
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("failed to encode {step}: {source}")]
    Encode {
        step: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode {step}: {source}")]
    Decode {
        step: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{step} response is missing `{field}`")]
    MissingField {
        step: &'static str,
        field: &'static str,
    },

    #[error("unexpected format of ID ({0:?}), expected TOKEN-ID:USERNAME")]
    InvalidId(String),

    #[error("invalid username {0:?}: must be non-empty and must not contain ':'")]
    InvalidUsername(String),

    #[error("attribute `{attribute}` cannot be changed in place, the resource must be replaced")]
    RequiresReplace { attribute: &'static str },

    #[error("provider has not been configured")]
    NotConfigured,
}

impl ProviderError {
    /// Short diagnostic summary for the error kind.
    pub fn summary(&self) -> &'static str {
        match self {
            ProviderError::Transport(_) | ProviderError::Api(_) => "Client Error",
            ProviderError::Encode { .. } => "Parsing Error",
            ProviderError::Decode { .. } | ProviderError::MissingField { .. } => "Unmarshall Error",
            ProviderError::InvalidId(_) | ProviderError::InvalidUsername(_) => {
                "Invalid Identifier"
            }
            ProviderError::RequiresReplace { .. } => "Replacement Required",
            ProviderError::NotConfigured => "Unconfigured Provider",
        }
    }

    pub fn api_status(&self) -> Option<u16> {
        match self {
            ProviderError::Api(e) => Some(e.status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_error_message() {
        let err = ApiError::from_body(
            401,
            "tokens/v2/alice",
            r#"{"error":{"message":"Not Authorized - Invalid Token"}}"#,
        );
        assert_eq!(err.message, "Not Authorized - Invalid Token");
        assert_eq!(
            err.to_string(),
            "API Error: 401 tokens/v2/alice Not Authorized - Invalid Token"
        );
    }

    #[test]
    fn test_flat_error_message() {
        let err = ApiError::from_body(422, "tokens/v2/alice", r#"{"message":"Invalid scope"}"#);
        assert_eq!(err.message, "Invalid scope");
    }

    #[test]
    fn test_unparseable_body_used_verbatim() {
        let err = ApiError::from_body(502, "tokens/v2/alice", "<html>Bad Gateway</html>");
        assert_eq!(err.message, "<html>Bad Gateway</html>");
    }

    #[test]
    fn test_json_without_message_falls_back_to_body() {
        let err = ApiError::from_body(500, "tokens/v2/alice", r#"{"code":"oops"}"#);
        assert_eq!(err.message, r#"{"code":"oops"}"#);
    }

    #[test]
    fn test_invalid_id_names_expected_format() {
        let err = ProviderError::InvalidId("abc".into());
        assert!(err.to_string().contains("expected TOKEN-ID:USERNAME"));
        assert!(err.to_string().contains("\"abc\""));
    }

    #[test]
    fn test_summaries() {
        let api = ProviderError::Api(ApiError::from_body(404, "x", ""));
        assert_eq!(api.summary(), "Client Error");
        assert_eq!(api.api_status(), Some(404));
        assert_eq!(ProviderError::InvalidId("x".into()).summary(), "Invalid Identifier");
        assert_eq!(
            ProviderError::MissingField { step: "create", field: "id" }.summary(),
            "Unmarshall Error"
        );
    }
}
