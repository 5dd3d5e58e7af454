use std::fmt;

use chrono::Utc;
use uuid::{Builder, Uuid};

/// Per-attempt key binding a popup to its message listener and to the one-shot
/// storage slot the relayed payload is written to.
///
/// Formatted as a lowercase v4 GUID (`8-4-4-4-12` hex groups). Random bytes are
/// mixed with the current time so keys stay distinct even when the random source
/// is weak; uniqueness only matters among concurrently open attempts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationKey(String);

impl CorrelationKey {
    pub fn generate() -> Self {
        let mut bytes = *Uuid::new_v4().as_bytes();
        let seed = Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_else(|| Utc::now().timestamp_millis())
            .to_be_bytes();
        for (b, s) in bytes.iter_mut().zip(seed) {
            *b ^= s;
        }
        // Builder rewrites the version and variant bits after mixing.
        let uuid = Builder::from_random_bytes(bytes).into_uuid();
        Self(uuid.hyphenated().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks the GUID shape: 36 chars, version nibble `4`, variant `8`-`b`.
    #[cfg(test)]
    pub(crate) fn is_well_formed(s: &str) -> bool {
        let bytes = s.as_bytes();
        if bytes.len() != 36 {
            return false;
        }
        for (i, c) in s.chars().enumerate() {
            let ok = match i {
                8 | 13 | 18 | 23 => c == '-',
                _ => c.is_ascii_digit() || ('a'..='f').contains(&c),
            };
            if !ok {
                return false;
            }
        }
        bytes[14] == b'4' && matches!(bytes[19], b'8' | b'9' | b'a' | b'b')
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CorrelationKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
