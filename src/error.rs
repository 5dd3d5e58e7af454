use crate::provider::ProviderError;

/// Failures surfaced by [`crate::service::AuthenticationService`].
///
/// None of these are retried; calling `acquire_session` again is the retry.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("the login popup could not be opened (blocked by the browser?)")]
    PopupBlocked,

    #[error("the login window was closed before completion")]
    Incomplete,

    #[error("the identity provider reported an error: {0}")]
    Provider(#[from] ProviderError),

    #[error("exchanging the authorization code for a token failed")]
    TokenExchange(#[source] anyhow::Error),

    #[error("building the authorize url failed")]
    AuthorizeUrl(#[source] anyhow::Error),

    #[error("the redirect did not describe a session")]
    InvalidRedirect(#[source] anyhow::Error),

    #[error("no session is cached")]
    NoSession,

    #[error("persisting the session failed")]
    Storage(#[source] anyhow::Error),
}

impl AuthError {
    /// True when the user closed the popup (or it never reported back).
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Incomplete)
    }
}
