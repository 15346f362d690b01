//! `mapbox_token` — scoped access tokens under `tokens/v2/{username}`.
//!
//! Mapbox scopes tokens by username and has no get-by-id endpoint, so the
//! local identifier is the composite `"{token_id}:{username}"` and reads list
//! every token for the user and pick the matching one.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{PlanAction, ReadOutcome, Resource};
use crate::client::{decode_json, encode_json, Client};
use crate::errors::ProviderError;
use crate::schema::{Attribute, AttributeType, Schema};

/// Parsed composite identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenId {
    pub token_id: String,
    pub username: String,
}

impl TokenId {
    pub fn new(token_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            token_id: token_id.into(),
            username: username.into(),
        }
    }

    /// Split `TOKEN-ID:USERNAME`. Anything but exactly two non-empty parts
    /// is rejected.
    pub fn parse(id: &str) -> Result<Self, ProviderError> {
        let parts: Vec<&str> = id.split(':').collect();
        match parts.as_slice() {
            [token_id, username] if !token_id.is_empty() && !username.is_empty() => {
                Ok(Self::new(*token_id, *username))
            }
            _ => Err(ProviderError::InvalidId(id.to_string())),
        }
    }

    /// Build an identifier from a server-assigned id, rejecting ids that
    /// would not parse back.
    pub fn from_parts(token_id: impl Into<String>, username: &str) -> Result<Self, ProviderError> {
        validate_username(username)?;
        let id = Self::new(token_id, username);
        if id.token_id.is_empty() || id.token_id.contains(':') {
            return Err(ProviderError::InvalidId(id.to_string()));
        }
        Ok(id)
    }

    pub fn list_endpoint(&self) -> String {
        list_endpoint(&self.username)
    }

    pub fn item_endpoint(&self) -> String {
        format!(
            "tokens/v2/{}/{}",
            urlencoding::encode(&self.username),
            urlencoding::encode(&self.token_id)
        )
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.token_id, self.username)
    }
}

/// Usernames become the second half of the composite id, so they must be
/// non-empty and colon-free.
pub fn validate_username(username: &str) -> Result<(), ProviderError> {
    if username.is_empty() || username.contains(':') {
        return Err(ProviderError::InvalidUsername(username.to_string()));
    }
    Ok(())
}

fn list_endpoint(username: &str) -> String {
    format!("tokens/v2/{}", urlencoding::encode(username))
}

/// Desired configuration for a token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPlan {
    pub username: String,
    pub note: String,
    pub scopes: BTreeSet<String>,
    #[serde(default)]
    pub allowed_urls: BTreeSet<String>,
}

/// Persisted state of a token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenState {
    /// Composite `TOKEN-ID:USERNAME`.
    pub id: String,
    pub username: String,
    pub note: String,
    pub scopes: BTreeSet<String>,
    #[serde(default)]
    pub allowed_urls: BTreeSet<String>,
    pub token: String,
}

impl TokenState {
    pub fn token_id(&self) -> Result<TokenId, ProviderError> {
        TokenId::parse(&self.id)
    }

    /// Copy with the secret masked, for display.
    pub fn redacted(&self) -> Self {
        let mut state = self.clone();
        if !state.token.is_empty() {
            state.token = "(sensitive)".to_string();
        }
        state
    }
}

/// Body sent on create and update. `username`, `id` and `token` are never
/// part of it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest<'a> {
    note: &'a str,
    scopes: &'a BTreeSet<String>,
    allowed_urls: &'a BTreeSet<String>,
}

impl<'a> From<&'a TokenPlan> for TokenRequest<'a> {
    fn from(plan: &'a TokenPlan) -> Self {
        Self {
            note: &plan.note,
            scopes: &plan.scopes,
            allowed_urls: &plan.allowed_urls,
        }
    }
}

/// Token record as returned by the API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteToken {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    note: Option<String>,
    #[serde(default)]
    scopes: Option<BTreeSet<String>>,
    #[serde(default)]
    allowed_urls: Option<BTreeSet<String>>,
    #[serde(default)]
    token: Option<String>,
}

pub struct TokenResource {
    client: Arc<Client>,
}

impl TokenResource {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Resource for TokenResource {
    type Config = TokenPlan;
    type State = TokenState;

    const TYPE_SUFFIX: &'static str = "token";

    fn schema(&self) -> Schema {
        token_schema()
    }

    fn plan(&self, prior: Option<&TokenState>, desired: &TokenPlan) -> PlanAction {
        let Some(prior) = prior else {
            return PlanAction::Create;
        };

        let mut changed = Vec::new();
        if prior.username != desired.username {
            changed.push("username");
        }
        if prior.note != desired.note {
            changed.push("note");
        }
        if prior.scopes != desired.scopes {
            changed.push("scopes");
        }
        if prior.allowed_urls != desired.allowed_urls {
            changed.push("allowed_urls");
        }

        if changed.is_empty() {
            return PlanAction::NoChange;
        }

        let schema = self.schema();
        let attributes: Vec<&'static str> = changed
            .iter()
            .copied()
            .filter(|name| schema.attribute(name).is_some_and(|a| a.requires_replace))
            .collect();

        if attributes.is_empty() {
            PlanAction::Update { changed }
        } else {
            PlanAction::Replace { attributes }
        }
    }

    async fn create(&self, desired: &TokenPlan) -> Result<TokenState, ProviderError> {
        validate_username(&desired.username)?;
        let body = encode_json(&TokenRequest::from(desired), "token create body")?;
        let endpoint = list_endpoint(&desired.username);

        let resp = self.client.post(&endpoint, body).await?;
        let created: RemoteToken = decode_json(resp, "token create response").await?;

        let token_id = created.id.ok_or(ProviderError::MissingField {
            step: "token create",
            field: "id",
        })?;
        let token = created.token.ok_or(ProviderError::MissingField {
            step: "token create",
            field: "token",
        })?;

        let id = TokenId::from_parts(token_id, &desired.username)?;
        tracing::info!(id = %id, "created token");

        Ok(TokenState {
            id: id.to_string(),
            username: desired.username.clone(),
            note: desired.note.clone(),
            scopes: desired.scopes.clone(),
            allowed_urls: desired.allowed_urls.clone(),
            token,
        })
    }

    async fn read(&self, state: &TokenState) -> Result<ReadOutcome<TokenState>, ProviderError> {
        let id = state.token_id()?;
        tracing::debug!(username = %id.username, "listing tokens");

        let resp = self.client.get(&id.list_endpoint()).await?;
        let tokens: Vec<RemoteToken> = decode_json(resp, "token list response").await?;

        let Some(remote) = tokens
            .into_iter()
            .find(|t| t.id.as_deref() == Some(id.token_id.as_str()))
        else {
            tracing::warn!(id = %id, "token no longer exists, removing from state");
            return Ok(ReadOutcome::NotFound);
        };

        Ok(ReadOutcome::Found(TokenState {
            id: state.id.clone(),
            username: id.username,
            note: remote.note.unwrap_or_default(),
            scopes: remote.scopes.unwrap_or_default(),
            allowed_urls: remote.allowed_urls.unwrap_or_default(),
            token: remote.token.unwrap_or_else(|| state.token.clone()),
        }))
    }

    async fn update(
        &self,
        prior: &TokenState,
        desired: &TokenPlan,
    ) -> Result<TokenState, ProviderError> {
        let id = prior.token_id()?;
        if id.username != desired.username {
            return Err(ProviderError::RequiresReplace {
                attribute: "username",
            });
        }

        let body = encode_json(&TokenRequest::from(desired), "token update body")?;
        self.client.patch(&id.item_endpoint(), body).await?;
        tracing::info!(id = %id, "updated token");

        Ok(TokenState {
            id: prior.id.clone(),
            username: desired.username.clone(),
            note: desired.note.clone(),
            scopes: desired.scopes.clone(),
            allowed_urls: desired.allowed_urls.clone(),
            token: prior.token.clone(),
        })
    }

    async fn delete(&self, state: &TokenState) -> Result<(), ProviderError> {
        let id = state.token_id()?;
        self.client.delete(&id.item_endpoint()).await?;
        tracing::info!(id = %id, "deleted token");
        Ok(())
    }

    fn import_state(&self, id: &str) -> TokenState {
        TokenState {
            id: id.to_string(),
            ..TokenState::default()
        }
    }
}

pub fn token_schema() -> Schema {
    Schema::new("Token resource")
        .with_attribute(
            "username",
            Attribute::required(AttributeType::String)
                .with_description("The username of the account for which to list scopes.")
                .requires_replace(),
        )
        .with_attribute(
            "note",
            Attribute::required(AttributeType::String)
                .with_description("A description for the token."),
        )
        .with_attribute(
            "scopes",
            Attribute::required(AttributeType::SetOfString).with_description(
                "Specify the scopes that the new token will have. The authorizing token \
                 needs to have the same scopes as, or more scopes than, the new token you \
                 are creating.",
            ),
        )
        .with_attribute(
            "allowed_urls",
            Attribute::optional(AttributeType::SetOfString)
                .with_description("URLs that this token is allowed to work with."),
        )
        .with_attribute(
            "token",
            Attribute::computed(AttributeType::String)
                .with_description("Token value")
                .sensitive()
                .use_state_for_unknown(),
        )
        .with_attribute(
            "id",
            Attribute::computed(AttributeType::String)
                .with_description("Token identifier")
                .use_state_for_unknown(),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn resource() -> TokenResource {
        TokenResource::new(Arc::new(Client::new(Some("sk.test".into())).unwrap()))
    }

    fn state() -> TokenState {
        TokenState {
            id: "tk1:alice".into(),
            username: "alice".into(),
            note: "ci".into(),
            scopes: set(&["styles:read"]),
            allowed_urls: BTreeSet::new(),
            token: "pk.abc".into(),
        }
    }

    fn plan_from(state: &TokenState) -> TokenPlan {
        TokenPlan {
            username: state.username.clone(),
            note: state.note.clone(),
            scopes: state.scopes.clone(),
            allowed_urls: state.allowed_urls.clone(),
        }
    }

    #[test]
    fn test_parse_valid_id() {
        let id = TokenId::parse("cktoken123:example").unwrap();
        assert_eq!(id.token_id, "cktoken123");
        assert_eq!(id.username, "example");
        assert_eq!(id.to_string(), "cktoken123:example");
    }

    #[test]
    fn test_parse_rejects_malformed_ids() {
        for bad in ["", "nocolon", "a:b:c", ":user", "id:", ":", "a::b"] {
            let err = TokenId::parse(bad).unwrap_err();
            assert!(
                matches!(err, ProviderError::InvalidId(ref s) if s == bad),
                "expected InvalidId for {:?}, got {:?}",
                bad,
                err
            );
        }
    }

    #[test]
    fn test_from_parts_round_trips_through_parse() {
        let id = TokenId::from_parts("cktk1", "example").unwrap();
        assert_eq!(TokenId::parse(&id.to_string()).unwrap(), id);

        assert!(matches!(
            TokenId::from_parts("ck:tk1", "example"),
            Err(ProviderError::InvalidId(ref s)) if s == "ck:tk1:example"
        ));
        assert!(matches!(
            TokenId::from_parts("", "example"),
            Err(ProviderError::InvalidId(_))
        ));
        assert!(matches!(
            TokenId::from_parts("cktk1", "a:b"),
            Err(ProviderError::InvalidUsername(_))
        ));
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("example").is_ok());
        for bad in ["", "a:b", ":"] {
            assert!(matches!(
                validate_username(bad),
                Err(ProviderError::InvalidUsername(ref s)) if s == bad
            ));
        }
    }

    #[test]
    fn test_remote_token_accepts_null_fields() {
        let remote: RemoteToken = serde_json::from_str(
            r#"{"id":"tk1","note":null,"scopes":null,"allowedUrls":null,"token":null}"#,
        )
        .unwrap();
        assert_eq!(remote.id.as_deref(), Some("tk1"));
        assert!(remote.note.is_none());
        assert!(remote.scopes.is_none());
    }

    #[test]
    fn test_endpoints_encode_segments() {
        let id = TokenId::new("tk 1", "al/ice");
        assert_eq!(id.list_endpoint(), "tokens/v2/al%2Fice");
        assert_eq!(id.item_endpoint(), "tokens/v2/al%2Fice/tk%201");
    }

    #[test]
    fn test_request_body_shape() {
        let plan = TokenPlan {
            username: "alice".into(),
            note: "n".into(),
            scopes: set(&["styles:read", "fonts:read"]),
            allowed_urls: BTreeSet::new(),
        };
        let json = serde_json::to_value(TokenRequest::from(&plan)).unwrap();
        assert_eq!(json["note"], "n");
        assert_eq!(json["scopes"], serde_json::json!(["fonts:read", "styles:read"]));
        assert_eq!(json["allowedUrls"], serde_json::json!([]));
        assert!(json.get("username").is_none());
        assert!(json.get("token").is_none());
        assert!(json.get("id").is_none());
    }

    #[test]
    fn test_plan_create_without_prior() {
        let r = resource();
        assert_eq!(r.plan(None, &plan_from(&state())), PlanAction::Create);
    }

    #[test]
    fn test_plan_no_change_is_order_insensitive() {
        let r = resource();
        let prior = state();
        let desired = plan_from(&prior);
        assert_eq!(r.plan(Some(&prior), &desired), PlanAction::NoChange);
    }

    #[test]
    fn test_plan_update_in_place() {
        let r = resource();
        let prior = state();
        let mut desired = plan_from(&prior);
        desired.note = "renamed".into();
        desired.allowed_urls = set(&["https://docs.mapbox.com"]);
        assert_eq!(
            r.plan(Some(&prior), &desired),
            PlanAction::Update {
                changed: vec!["note", "allowed_urls"]
            }
        );
    }

    #[test]
    fn test_plan_username_change_replaces() {
        let r = resource();
        let prior = state();
        let mut desired = plan_from(&prior);
        desired.username = "bob".into();
        desired.note = "other".into();
        assert_eq!(
            r.plan(Some(&prior), &desired),
            PlanAction::Replace {
                attributes: vec!["username"]
            }
        );
    }

    #[test]
    fn test_import_passes_id_through() {
        let imported = resource().import_state("whatever:format");
        assert_eq!(imported.id, "whatever:format");
        assert!(imported.username.is_empty());
        assert!(imported.token.is_empty());
    }

    #[test]
    fn test_type_name() {
        assert_eq!(resource().type_name("mapbox"), "mapbox_token");
    }

    #[test]
    fn test_schema_flags() {
        let schema = token_schema();
        assert!(schema.attribute("username").unwrap().requires_replace);
        assert!(schema.attribute("token").unwrap().sensitive);
        assert!(schema.attribute("allowed_urls").unwrap().optional);
        assert_eq!(schema.replace_triggers().collect::<Vec<_>>(), vec!["username"]);
    }

    #[test]
    fn test_redacted_masks_secret() {
        let s = state().redacted();
        assert_eq!(s.token, "(sensitive)");
        assert_eq!(s.note, "ci");
    }

    #[tokio::test]
    async fn test_update_rejects_username_change() {
        let r = resource();
        let prior = state();
        let mut desired = plan_from(&prior);
        desired.username = "bob".into();
        let err = r.update(&prior, &desired).await.unwrap_err();
        assert!(matches!(err, ProviderError::RequiresReplace { attribute: "username" }));
    }

    #[tokio::test]
    async fn test_read_with_malformed_id_fails_before_request() {
        let r = resource();
        let imported = r.import_state("not-a-composite-id");
        let err = r.read(&imported).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidId(_)));
    }
}
