use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// A cached authenticated grant.
///
/// `created_at` is stamped (epoch milliseconds) by the service when a provider
/// extracts the session from a redirect, so expiry can be computed later
/// without any other clock reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub created_at: i64,
}

/// Tokens returned by an out-of-band code exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

impl Session {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.created_at)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.created_at()?
            .checked_add_signed(TimeDelta::try_seconds(self.expires_in)?)
    }

    /// True while `created_at + expires_in` lies strictly after `now`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|expires_at| now < expires_at)
    }

    pub fn stamp(&mut self, now: DateTime<Utc>) {
        self.created_at = now.timestamp_millis();
    }

    /// Folds an exchanged grant into the session. The grant's lifetime starts
    /// at `now`, so the session is re-stamped when the grant carries one.
    pub fn apply_grant(&mut self, grant: TokenGrant, now: DateTime<Utc>) {
        self.access_token = Some(grant.access_token);
        if grant.refresh_token.is_some() {
            self.refresh_token = grant.refresh_token;
        }
        if let Some(expires_in) = grant.expires_in {
            self.expires_in = expires_in;
            self.stamp(now);
        }
    }
}
