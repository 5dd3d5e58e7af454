//! Popup-window login for browser-hosted applications.
//!
//! [`AuthenticationService`] opens the identity provider's authorize page in a
//! popup named by a fresh [`CorrelationKey`], relays the single authenticated
//! message the popup posts back, waits for the popup to close, and turns the
//! relayed redirect into a cached [`Session`] through a [`Provider`].

pub mod correlation;
pub mod error;
pub mod host;
pub mod log;
pub mod provider;
pub mod service;
pub mod session;
pub mod storage;

#[cfg(target_arch = "wasm32")]
pub mod wasm_exports;

pub use correlation::CorrelationKey;
pub use error::AuthError;
pub use host::{MessageEvent, PopupWindow, WindowHost};
pub use provider::{Provider, ProviderError, RemoteSignOut, TokenExchange};
pub use service::{Acquired, AuthServiceOptions, AuthenticationService, Invalidation};
pub use session::{Session, TokenGrant};
pub use storage::{MemoryStorage, SESSION_KEY, Storage};
