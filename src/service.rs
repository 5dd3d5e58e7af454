use std::rc::Rc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::correlation::CorrelationKey;
use crate::error::AuthError;
use crate::host::{PopupGeometry, WindowHost};
use crate::provider::Provider;
use crate::session::Session;
use crate::storage::{SESSION_KEY, Storage};

pub mod poll;
pub mod relay;

use self::poll::ClosePoller;
use self::relay::Relay;

pub const DEFAULT_POPUP_SIZE: i32 = 500;
pub const DEFAULT_ACK_MESSAGE: &str = "ack";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthServiceOptions {
    pub poll_interval_ms: u64,
    pub popup_width: i32,
    pub popup_height: i32,
    pub session_key: String,
    pub ack_message: String,
}

impl Default for AuthServiceOptions {
    fn default() -> Self {
        Self {
            poll_interval_ms: poll::DEFAULT_POLL_INTERVAL.as_millis() as u64,
            popup_width: DEFAULT_POPUP_SIZE,
            popup_height: DEFAULT_POPUP_SIZE,
            session_key: SESSION_KEY.to_string(),
            ack_message: DEFAULT_ACK_MESSAGE.to_string(),
        }
    }
}

/// Outcome of a successful [`AuthenticationService::acquire_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acquired {
    pub session: Session,
    /// `false` when a valid cached session was returned without a popup.
    pub renewed: bool,
}

/// What [`AuthenticationService::invalidate_session`] did.
#[derive(Debug)]
pub enum Invalidation {
    NothingCached,
    Removed,
    /// Remote sign-out failed; the cached session is kept so invalidation
    /// can be retried.
    Retained(anyhow::Error),
}

/// Acquires, caches, validates and invalidates a popup-based login session.
///
/// The service is the only writer of the session slot in `storage`. It is
/// single-threaded: all collaborators live behind `Rc`.
pub struct AuthenticationService {
    storage: Rc<dyn Storage>,
    host: Rc<dyn WindowHost>,
    options: AuthServiceOptions,
}

impl AuthenticationService {
    pub fn new(storage: Rc<dyn Storage>, host: Rc<dyn WindowHost>) -> Self {
        Self::with_options(storage, host, AuthServiceOptions::default())
    }

    pub fn with_options(
        storage: Rc<dyn Storage>,
        host: Rc<dyn WindowHost>,
        options: AuthServiceOptions,
    ) -> Self {
        Self {
            storage,
            host,
            options,
        }
    }

    /// A service over `window.localStorage` and the current window.
    #[cfg(target_arch = "wasm32")]
    pub fn browser(options: AuthServiceOptions) -> anyhow::Result<Self> {
        let storage = Rc::new(crate::storage::LocalStorage::new());
        let host = Rc::new(crate::host::WebWindowHost::current()?);
        Ok(Self::with_options(storage, host, options))
    }

    pub fn options(&self) -> &AuthServiceOptions {
        &self.options
    }

    /// Returns a valid cached session, or runs an interactive popup login.
    ///
    /// With `allow_cached == false` the cache is bypassed and a popup is
    /// always opened. The returned future stays pending until the popup closes.
    #[tracing::instrument(skip(self, provider))]
    pub async fn acquire_session(
        &self,
        provider: &dyn Provider,
        allow_cached: bool,
    ) -> Result<Acquired, AuthError> {
        if allow_cached {
            if let Some(session) = self.restore_session() {
                if provider.validate_session(Some(&session)) {
                    tracing::debug!("Reusing the cached session");
                    return Ok(Acquired {
                        session,
                        renewed: false,
                    });
                }
            }
        }

        let key = CorrelationKey::generate();
        let authorize_url = provider
            .build_authorize_url()
            .map_err(AuthError::AuthorizeUrl)?;
        let geometry = PopupGeometry::centered(
            self.host.screen(),
            self.options.popup_width,
            self.options.popup_height,
        );
        tracing::info!(key = %key, "Opening the login popup");
        let popup = self
            .host
            .open(authorize_url.as_str(), key.as_str(), &geometry.features())
            .ok_or(AuthError::PopupBlocked)?;

        let relay = Relay::arm(
            &self.host,
            Rc::clone(&self.storage),
            Rc::clone(&popup),
            key.clone(),
            provider.origin(),
            &self.options.ack_message,
        );
        let poller = ClosePoller::new(Duration::from_millis(self.options.poll_interval_ms));
        let ticks = poller.wait_closed(popup.as_ref()).await;
        tracing::debug!(
            key = %key,
            relayed = relay.relayed(),
            "Popup closed after {ticks} checks every {:?}",
            poller.interval()
        );
        drop(relay);

        let payload = self
            .storage
            .take_item(key.as_str())
            .filter(|payload| !payload.is_empty())
            .ok_or(AuthError::Incomplete)?;

        if let Some(error) = provider.extract_error(&payload) {
            tracing::info!(key = %key, "The provider reported an error: {error}");
            return Err(AuthError::Provider(error));
        }
        let mut session = provider
            .extract_session(&payload)
            .map_err(AuthError::InvalidRedirect)?;
        session.stamp(Utc::now());

        if let Some(exchange) = provider.token_exchange() {
            let grant = exchange
                .exchange(&session)
                .await
                .map_err(AuthError::TokenExchange)?;
            session.apply_grant(grant, Utc::now());
        }

        self.persist(&session)?;
        tracing::info!(key = %key, "Session acquired");
        Ok(Acquired {
            session,
            renewed: true,
        })
    }

    fn persist(&self, session: &Session) -> Result<(), AuthError> {
        let serialized =
            serde_json::to_string(session).map_err(|e| AuthError::Storage(e.into()))?;
        self.storage
            .set_item(&self.options.session_key, &serialized)
            .map_err(AuthError::Storage)
    }

    /// Reads the cached session without judging its validity. A corrupt entry
    /// is removed and reported as absent.
    pub fn restore_session(&self) -> Option<Session> {
        let key = &self.options.session_key;
        let raw = self.storage.get_item(key).filter(|raw| !raw.is_empty())?;
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!("Removing the unreadable cached session: {e}");
                self.storage.remove_item(key);
                None
            }
        }
    }

    pub fn has_session(&self) -> bool {
        self.restore_session().is_some()
    }

    pub fn session_is_valid(&self, provider: &dyn Provider) -> bool {
        provider.validate_session(self.restore_session().as_ref())
    }

    /// The cached access token, if the session exists and is still valid.
    pub fn access_token(&self, provider: &dyn Provider) -> Option<String> {
        let session = self.restore_session()?;
        if !provider.validate_session(Some(&session)) {
            return None;
        }
        session.access_token
    }

    /// Resource-scoped access token. Fails with [`AuthError::NoSession`] when
    /// nothing was ever cached, and yields `None` when the session is invalid.
    pub fn get_access_token(
        &self,
        provider: &dyn Provider,
        resource_id: &str,
    ) -> Result<Option<String>, AuthError> {
        let session = self.restore_session().ok_or(AuthError::NoSession)?;
        if !provider.validate_session(Some(&session)) {
            return Ok(None);
        }
        Ok(provider.access_token_for(&session, resource_id))
    }

    /// Drops the cached session, signing out remotely first when the provider
    /// can. Never fails: a failed remote sign-out keeps the local session.
    pub async fn invalidate_session(&self, provider: &dyn Provider) -> Invalidation {
        let Some(session) = self.restore_session() else {
            return Invalidation::NothingCached;
        };
        if let Some(remote) = provider.remote_sign_out() {
            if let Err(e) = remote.sign_out(&session).await {
                tracing::warn!("Remote sign-out failed, keeping the cached session: {e:#}");
                return Invalidation::Retained(e);
            }
        }
        self.storage.remove_item(&self.options.session_key);
        Invalidation::Removed
    }

    pub fn sign_out_url(&self, provider: &dyn Provider, redirect_url: &str) -> Option<String> {
        provider.sign_out_url(redirect_url)
    }
}
