//! Credential shapes
//!
//! A deployment runs in exactly one [`TokenMode`]. Servers hand out
//! [`TokenGrant`]s with relative lifetimes; the credential store turns
//! them into [`CredentialState`] with absolute expiry timestamps.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::MiniappError;

/// Which credential scheme the backend uses. Fixed when the client is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenMode {
    /// One bearer token, no refresh capability.
    Single,
    /// Short-lived access token plus a longer-lived refresh token.
    #[default]
    Dual,
}

/// Single-token login payload as sent by the backend (`expiresIn` in seconds).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SingleTokenGrant {
    pub token: String,
    #[serde(rename = "expiresIn")]
    pub expires_in: i64,
}

/// Dual-token login/refresh payload as sent by the backend (lifetimes in seconds).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DualTokenGrant {
    pub access_token: String,
    #[serde(rename = "accessExpiresIn")]
    pub access_expires_in: i64,
    pub refresh_token: String,
    #[serde(rename = "refreshExpiresIn")]
    pub refresh_expires_in: i64,
}

/// A freshly issued credential, shape detected from the payload fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TokenGrant {
    Dual(DualTokenGrant),
    Single(SingleTokenGrant),
}

impl TokenGrant {
    pub fn mode(&self) -> TokenMode {
        match self {
            TokenGrant::Single(_) => TokenMode::Single,
            TokenGrant::Dual(_) => TokenMode::Dual,
        }
    }

    /// Pin relative lifetimes to absolute epoch milliseconds, starting at `now_ms`.
    pub fn into_state(self, now_ms: i64) -> CredentialState {
        match self {
            TokenGrant::Single(g) => CredentialState::Single(SingleCredential {
                token: g.token,
                expires_at: expiry_from(now_ms, g.expires_in),
            }),
            TokenGrant::Dual(g) => CredentialState::Dual(DualCredential {
                access_token: g.access_token,
                access_expires_at: expiry_from(now_ms, g.access_expires_in),
                refresh_token: g.refresh_token,
                refresh_expires_at: expiry_from(now_ms, g.refresh_expires_in),
            }),
        }
    }
}

fn expiry_from(now_ms: i64, expires_in_secs: i64) -> i64 {
    now_ms.saturating_add(expires_in_secs.saturating_mul(1000))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SingleCredential {
    pub token: String,
    /// Absolute expiry, epoch milliseconds. `0` means unknown.
    pub expires_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DualCredential {
    pub access_token: String,
    pub access_expires_at: i64,
    pub refresh_token: String,
    pub refresh_expires_at: i64,
}

/// Stored credential material.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CredentialState {
    Single(SingleCredential),
    Dual(DualCredential),
}

impl CredentialState {
    /// The logged-out shape for `mode`.
    pub fn empty(mode: TokenMode) -> Self {
        match mode {
            TokenMode::Single => CredentialState::Single(SingleCredential::default()),
            TokenMode::Dual => CredentialState::Dual(DualCredential::default()),
        }
    }

    pub fn mode(&self) -> TokenMode {
        match self {
            CredentialState::Single(_) => TokenMode::Single,
            CredentialState::Dual(_) => TokenMode::Dual,
        }
    }

    /// The token sent as `Authorization: Bearer`, expired or not.
    pub fn bearer_token(&self) -> &str {
        match self {
            CredentialState::Single(c) => &c.token,
            CredentialState::Dual(c) => &c.access_token,
        }
    }

    pub fn access_expires_at(&self) -> i64 {
        match self {
            CredentialState::Single(c) => c.expires_at,
            CredentialState::Dual(c) => c.access_expires_at,
        }
    }

    /// The refresh token, when this shape has one and it is non-empty.
    pub fn refresh_token(&self) -> Option<&str> {
        match self {
            CredentialState::Single(_) => None,
            CredentialState::Dual(c) if c.refresh_token.is_empty() => None,
            CredentialState::Dual(c) => Some(&c.refresh_token),
        }
    }

    pub fn refresh_expires_at(&self) -> Option<i64> {
        match self {
            CredentialState::Single(_) => None,
            CredentialState::Dual(c) => Some(c.refresh_expires_at),
        }
    }

    /// Whether a token is present, ignoring expiry.
    pub fn has_token(&self) -> bool {
        !self.bearer_token().is_empty()
    }

    /// Fail unless this state matches the configured `mode`.
    pub fn ensure_mode(&self, mode: TokenMode) -> Result<(), MiniappError> {
        if self.mode() == mode {
            Ok(())
        } else {
            Err(MiniappError::Config(format!(
                "credential shape {:?} does not match configured token mode {:?}",
                self.mode(),
                mode
            )))
        }
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
