use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use oauth2::{
    AuthorizationCode, Client, ClientId, ClientSecret, CsrfToken, EndpointMaybeSet,
    EndpointNotSet, EndpointSet, PkceCodeChallenge, PkceCodeVerifier, RefreshToken,
    RevocationUrl, Scope, StandardRevocableToken, TokenResponse,
};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{
    DEFAULT_EXPIRES_IN, OAuthClient, Provider, ProviderError, RedirectParams, RemoteSignOut,
    TokenExchange, default_expires_in, origin_of,
};
use crate::session::{Session, TokenGrant};

type AuthorizationCodeClient = OAuthClient<
    EndpointSet,      // AuthUri is set
    EndpointNotSet,   // DeviceAuthUri is not set
    EndpointNotSet,   // IntrospectionUri is not set
    EndpointMaybeSet, // RevocationUri is optional
    EndpointSet,      // TokenUri is set
>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationCodeOptions {
    pub authorize_url: String,
    pub token_url: String,
    #[serde(default)]
    pub revocation_url: Option<String>,
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub login_hint: Option<String>,
    /// Seconds a token stays valid when the token response omits `expires_in`.
    #[serde(default = "default_expires_in")]
    pub default_expires_in: i64,
}

impl AuthorizationCodeOptions {
    /// Microsoft identity platform (v2.0) endpoints for `tenant_id`.
    pub fn azure_ad(tenant_id: &str, client_id: &str, redirect_uri: &str, scopes: &[&str]) -> Self {
        Self {
            authorize_url: format!(
                "https://login.microsoftonline.com/{tenant_id}/oauth2/v2.0/authorize"
            ),
            token_url: format!("https://login.microsoftonline.com/{tenant_id}/oauth2/v2.0/token"),
            revocation_url: None,
            client_id: client_id.to_string(),
            client_secret: None,
            redirect_uri: redirect_uri.to_string(),
            scopes: scopes.iter().map(ToString::to_string).collect(),
            prompt: None,
            login_hint: None,
            default_expires_in: DEFAULT_EXPIRES_IN,
        }
    }
}

struct PendingAuthorization {
    csrf_state: CsrfToken,
    pkce_code_verifier: PkceCodeVerifier,
}

/// Authorization code grant with PKCE. The redirect carries a code which is
/// exchanged for tokens once the popup has closed.
pub struct AuthorizationCodeProvider {
    client: AuthorizationCodeClient,
    redirect_uri: Url,
    options: AuthorizationCodeOptions,
    http_client: reqwest::Client,
    pending: Mutex<Option<PendingAuthorization>>,
}

impl std::fmt::Debug for AuthorizationCodeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationCodeProvider")
            .field("client_id", &self.options.client_id)
            .field("redirect_uri", &self.redirect_uri.as_str())
            .finish_non_exhaustive()
    }
}

fn default_http_client() -> Result<reqwest::Client> {
    // Following redirects from the token endpoint would leak the code.
    #[cfg(not(target_arch = "wasm32"))]
    let builder = reqwest::ClientBuilder::new().redirect(reqwest::redirect::Policy::none());
    #[cfg(target_arch = "wasm32")]
    let builder = reqwest::ClientBuilder::new();
    Ok(builder.build()?)
}

impl AuthorizationCodeProvider {
    pub fn new(options: AuthorizationCodeOptions) -> Result<Self> {
        Self::with_http_client(options, default_http_client()?)
    }

    pub fn with_http_client(
        options: AuthorizationCodeOptions,
        http_client: reqwest::Client,
    ) -> Result<Self> {
        let auth_url = oauth2::AuthUrl::new(options.authorize_url.clone())
            .context("parsing authorize url")?;
        let token_url =
            oauth2::TokenUrl::new(options.token_url.clone()).context("parsing token url")?;
        let revocation_url = options
            .revocation_url
            .clone()
            .map(RevocationUrl::new)
            .transpose()
            .context("parsing revocation url")?;
        let redirect_uri = Url::parse(&options.redirect_uri).context("parsing redirect uri")?;

        let mut client: AuthorizationCodeClient =
            Client::new(ClientId::new(options.client_id.clone()))
                .set_auth_uri(auth_url)
                .set_token_uri(token_url)
                .set_revocation_url_option(revocation_url)
                // Microsoft identity platform expects client credentials in the body.
                .set_auth_type(oauth2::AuthType::RequestBody)
                .set_redirect_uri(oauth2::RedirectUrl::from_url(redirect_uri.clone()));
        if let Some(client_secret) = &options.client_secret {
            client = client.set_client_secret(ClientSecret::new(client_secret.clone()));
        }

        Ok(Self {
            client,
            redirect_uri,
            options,
            http_client,
            pending: Mutex::new(None),
        })
    }

    fn pending_state(&self) -> Option<String> {
        let pending = self.pending.lock().ok()?;
        pending
            .as_ref()
            .map(|pending| pending.csrf_state.secret().clone())
    }

    fn grant_from(&self, token: &impl TokenResponse) -> TokenGrant {
        let expires_in = token
            .expires_in()
            .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
            .unwrap_or(self.options.default_expires_in);
        TokenGrant {
            access_token: token.access_token().secret().clone(),
            refresh_token: token.refresh_token().map(|t| t.secret().clone()),
            expires_in: Some(expires_in),
        }
    }

    fn take_pending(&self) -> Result<PendingAuthorization> {
        self.pending
            .lock()
            .map_err(|_| anyhow!("pending authorization lock poisoned"))?
            .take()
            .ok_or_else(|| anyhow!("no authorization is pending"))
    }
}

impl Provider for AuthorizationCodeProvider {
    fn origin(&self) -> Option<String> {
        origin_of(&self.redirect_uri)
    }

    fn build_authorize_url(&self) -> Result<Url> {
        let scopes = self.options.scopes.iter().cloned().map(Scope::new);
        let (pkce_code_challenge, pkce_code_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut auth_url_builder = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(scopes)
            .set_pkce_challenge(pkce_code_challenge);
        if let Some(prompt_value) = &self.options.prompt {
            auth_url_builder = auth_url_builder.add_extra_param("prompt", prompt_value);
        }
        if let Some(login_hint_value) = &self.options.login_hint {
            auth_url_builder = auth_url_builder.add_extra_param("login_hint", login_hint_value);
        }
        let (authorize_url, csrf_state) = auth_url_builder.url();

        *self
            .pending
            .lock()
            .map_err(|_| anyhow!("pending authorization lock poisoned"))? =
            Some(PendingAuthorization {
                csrf_state,
                pkce_code_verifier,
            });
        Ok(authorize_url)
    }

    fn extract_error(&self, redirect: &str) -> Option<ProviderError> {
        let params = RedirectParams::parse(redirect);
        params
            .error()
            .or_else(|| params.check_state(self.pending_state().as_deref()))
    }

    fn extract_session(&self, redirect: &str) -> Result<Session> {
        let params = RedirectParams::parse(redirect);
        let code = params
            .get("code")
            .ok_or_else(|| anyhow!("no code in the redirect"))?;
        Ok(Session {
            code: Some(code.to_string()),
            access_token: None,
            refresh_token: None,
            expires_in: 0,
            created_at: Utc::now().timestamp_millis(),
        })
    }

    fn validate_session(&self, session: Option<&Session>) -> bool {
        session.is_some_and(|session| {
            session.access_token.is_some() && session.is_live_at(Utc::now())
        })
    }

    fn token_exchange(&self) -> Option<&dyn TokenExchange> {
        Some(self)
    }

    fn remote_sign_out(&self) -> Option<&dyn RemoteSignOut> {
        self.options
            .revocation_url
            .is_some()
            .then_some(self as &dyn RemoteSignOut)
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl TokenExchange for AuthorizationCodeProvider {
    async fn exchange(&self, session: &Session) -> Result<TokenGrant> {
        let code = session
            .code
            .clone()
            .ok_or_else(|| anyhow!("the session carries no authorization code"))?;
        let pending = self.take_pending()?;

        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pending.pkce_code_verifier)
            .request_async(&self.http_client)
            .await
            .context("exchanging the authorization code")?;

        Ok(self.grant_from(&token))
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl RemoteSignOut for AuthorizationCodeProvider {
    async fn sign_out(&self, session: &Session) -> Result<()> {
        let token = match (&session.refresh_token, &session.access_token) {
            (Some(refresh_token), _) => {
                StandardRevocableToken::RefreshToken(RefreshToken::new(refresh_token.clone()))
            }
            (None, Some(access_token)) => StandardRevocableToken::AccessToken(
                oauth2::AccessToken::new(access_token.clone()),
            ),
            (None, None) => return Ok(()),
        };
        self.client
            .revoke_token(token)?
            .request_async(&self.http_client)
            .await
            .context("revoking the token")?;
        Ok(())
    }
}
