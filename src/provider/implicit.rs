use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use oauth2::CsrfToken;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{
    DEFAULT_EXPIRES_IN, Provider, ProviderError, RedirectParams, default_expires_in, origin_of,
};
use crate::session::Session;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplicitGrantOptions {
    pub authorize_url: String,
    #[serde(default)]
    pub logout_url: Option<String>,
    pub client_id: String,
    pub redirect_uri: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub login_hint: Option<String>,
    /// Seconds a token stays valid when the redirect omits `expires_in`.
    #[serde(default = "default_expires_in")]
    pub default_expires_in: i64,
}

impl ImplicitGrantOptions {
    /// Microsoft identity platform (v2.0) endpoints for `tenant_id`.
    pub fn azure_ad(tenant_id: &str, client_id: &str, redirect_uri: &str, scopes: &[&str]) -> Self {
        Self {
            authorize_url: format!(
                "https://login.microsoftonline.com/{tenant_id}/oauth2/v2.0/authorize"
            ),
            logout_url: Some(format!(
                "https://login.microsoftonline.com/{tenant_id}/oauth2/v2.0/logout"
            )),
            client_id: client_id.to_string(),
            redirect_uri: redirect_uri.to_string(),
            scopes: scopes.iter().map(ToString::to_string).collect(),
            prompt: None,
            login_hint: None,
            default_expires_in: DEFAULT_EXPIRES_IN,
        }
    }
}

/// Implicit grant: the redirect fragment carries the access token itself.
#[derive(Debug)]
pub struct ImplicitGrantProvider {
    authorize_url: Url,
    logout_url: Option<Url>,
    redirect_uri: Url,
    options: ImplicitGrantOptions,
    pending_state: Mutex<Option<String>>,
}

impl ImplicitGrantProvider {
    pub fn new(options: ImplicitGrantOptions) -> Result<Self> {
        let authorize_url = Url::parse(&options.authorize_url).context("parsing authorize url")?;
        let logout_url = options
            .logout_url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .context("parsing logout url")?;
        let redirect_uri = Url::parse(&options.redirect_uri).context("parsing redirect uri")?;
        Ok(Self {
            authorize_url,
            logout_url,
            redirect_uri,
            options,
            pending_state: Mutex::new(None),
        })
    }

    fn pending_state(&self) -> Option<String> {
        self.pending_state
            .lock()
            .map(|state| state.clone())
            .unwrap_or_default()
    }
}

impl Provider for ImplicitGrantProvider {
    fn origin(&self) -> Option<String> {
        origin_of(&self.redirect_uri)
    }

    fn build_authorize_url(&self) -> Result<Url> {
        let state = CsrfToken::new_random();
        let mut url = self.authorize_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "token")
                .append_pair("client_id", &self.options.client_id)
                .append_pair("redirect_uri", self.redirect_uri.as_str())
                .append_pair("state", state.secret());
            if !self.options.scopes.is_empty() {
                query.append_pair("scope", &self.options.scopes.join(" "));
            }
            if let Some(prompt) = &self.options.prompt {
                query.append_pair("prompt", prompt);
            }
            if let Some(login_hint) = &self.options.login_hint {
                query.append_pair("login_hint", login_hint);
            }
        }
        *self
            .pending_state
            .lock()
            .map_err(|_| anyhow!("pending state lock poisoned"))? = Some(state.secret().clone());
        Ok(url)
    }

    fn extract_error(&self, redirect: &str) -> Option<ProviderError> {
        let params = RedirectParams::parse(redirect);
        params
            .error()
            .or_else(|| params.check_state(self.pending_state().as_deref()))
    }

    fn extract_session(&self, redirect: &str) -> Result<Session> {
        let params = RedirectParams::parse(redirect);
        let access_token = params
            .get("access_token")
            .ok_or_else(|| anyhow!("no access_token in the redirect"))?;
        let expires_in = params
            .get("expires_in")
            .map(str::parse::<i64>)
            .transpose()
            .context("parsing expires_in")?
            .unwrap_or(self.options.default_expires_in);
        Ok(Session {
            code: None,
            access_token: Some(access_token.to_string()),
            refresh_token: None,
            expires_in,
            created_at: Utc::now().timestamp_millis(),
        })
    }

    fn validate_session(&self, session: Option<&Session>) -> bool {
        session.is_some_and(|session| {
            session.access_token.is_some() && session.is_live_at(Utc::now())
        })
    }

    fn sign_out_url(&self, redirect_url: &str) -> Option<String> {
        let mut url = self.logout_url.clone()?;
        url.query_pairs_mut()
            .append_pair("post_logout_redirect_uri", redirect_url);
        Some(url.to_string())
    }
}
