use std::collections::HashMap;

use anyhow::Result;
use oauth2::EndpointNotSet;
use url::Url;

use crate::session::{Session, TokenGrant};

pub mod auth_code;
pub mod implicit;

pub use auth_code::{AuthorizationCodeOptions, AuthorizationCodeProvider};
pub use implicit::{ImplicitGrantOptions, ImplicitGrantProvider};

/// Lifetime in seconds assumed for an access token issued without `expires_in`.
pub const DEFAULT_EXPIRES_IN: i64 = 3600;

fn default_expires_in() -> i64 {
    DEFAULT_EXPIRES_IN
}

/// Error reported by the identity backend in a redirect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{error}: {description} ({uri})")]
pub struct ProviderError {
    pub error: String,
    pub description: String,
    pub uri: String,
}

impl ProviderError {
    pub fn new(error: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            description: description.into(),
            uri: String::new(),
        }
    }
}

/// One identity backend: how to start a login and how to read its outcome.
pub trait Provider: Send + Sync {
    /// Expected origin of messages relayed from the popup. `None` disables
    /// origin filtering.
    fn origin(&self) -> Option<String>;

    fn build_authorize_url(&self) -> Result<Url>;

    fn extract_error(&self, redirect: &str) -> Option<ProviderError>;

    fn extract_session(&self, redirect: &str) -> Result<Session>;

    /// An absent session is never valid.
    fn validate_session(&self, session: Option<&Session>) -> bool;

    /// Synchronous access-token derivation for a resource. Defaults to the
    /// session's own access token.
    fn access_token_for(&self, session: &Session, _resource_id: &str) -> Option<String> {
        session.access_token.clone()
    }

    /// Present for backends whose redirect only carries a code.
    fn token_exchange(&self) -> Option<&dyn TokenExchange> {
        None
    }

    /// Present for backends able to terminate the session remotely.
    fn remote_sign_out(&self) -> Option<&dyn RemoteSignOut> {
        None
    }

    fn sign_out_url(&self, _redirect_url: &str) -> Option<String> {
        None
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait TokenExchange: Send + Sync {
    async fn exchange(&self, session: &Session) -> Result<TokenGrant>;
}

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait RemoteSignOut: Send + Sync {
    async fn sign_out(&self, session: &Session) -> Result<()>;
}

type OAuthTokenResponse =
    oauth2::StandardTokenResponse<oauth2::EmptyExtraTokenFields, oauth2::basic::BasicTokenType>;
type OAuthClient<
    HasAuthUrl = EndpointNotSet,
    HasDeviceAuthUrl = EndpointNotSet,
    HasIntrospectionUrl = EndpointNotSet,
    HasRevocationUrl = EndpointNotSet,
    HasTokenUrl = EndpointNotSet,
> = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    OAuthTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    HasAuthUrl,
    HasDeviceAuthUrl,
    HasIntrospectionUrl,
    HasRevocationUrl,
    HasTokenUrl,
>;

/// Parameters carried back by a redirect, from its fragment and query.
///
/// The payload may be a full URL or just the `key=value&...` part. Fragment
/// parameters win over query parameters of the same name.
#[derive(Debug, Default)]
pub(crate) struct RedirectParams(HashMap<String, String>);

impl RedirectParams {
    pub(crate) fn parse(redirect: &str) -> Self {
        let redirect = redirect.trim();
        let mut params = HashMap::new();
        match Url::parse(redirect) {
            Ok(url) => {
                params.extend(url.query_pairs().into_owned());
                if let Some(fragment) = url.fragment() {
                    params.extend(url::form_urlencoded::parse(fragment.as_bytes()).into_owned());
                }
            }
            Err(_) => {
                let raw = redirect.trim_start_matches(['#', '?']);
                params.extend(url::form_urlencoded::parse(raw.as_bytes()).into_owned());
            }
        }
        Self(params)
    }

    pub(crate) fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// The OAuth2 error triple, if the backend signaled a failure.
    pub(crate) fn error(&self) -> Option<ProviderError> {
        let error = self.get("error")?;
        Some(ProviderError {
            error: error.to_string(),
            description: self.get("error_description").unwrap_or_default().to_string(),
            uri: self.get("error_uri").unwrap_or_default().to_string(),
        })
    }

    /// Compares the returned `state` with the pending CSRF token.
    pub(crate) fn check_state(&self, expected: Option<&str>) -> Option<ProviderError> {
        let expected = expected?;
        match self.get("state") {
            Some(state) if state == expected => None,
            Some(state) => Some(ProviderError::new(
                "state_mismatch",
                format!("expected {expected}, got {state}"),
            )),
            None => Some(ProviderError::new(
                "state_mismatch",
                "missing state in the response",
            )),
        }
    }
}

/// `scheme://host[:port]` of a URL, as browsers report `MessageEvent.origin`.
pub(crate) fn origin_of(url: &Url) -> Option<String> {
    let origin = url.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}
