//! Authenticated user sessions issued by the backend's identity service.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Bearer token for backend requests. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token for use in an `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

/// Profile fields stored alongside the auth user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Full name if set, else the email's local part, else "User".
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.user_metadata
            .full_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .or_else(|| {
                self.email
                    .as_deref()
                    .and_then(|e| e.split('@').next())
                    .filter(|local| !local.is_empty())
            })
            .unwrap_or("User")
    }

    /// Account creation date formatted for the profile page ("March 4, 2025").
    #[must_use]
    pub fn member_since(&self) -> String {
        self.created_at
            .map_or_else(|| "N/A".to_owned(), |t| t.format("%B %-d, %Y").to_string())
    }
}

/// A backend session: the user plus the tokens that authenticate them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: AccessToken,
    #[serde(default)]
    pub refresh_token: Option<AccessToken>,
    /// Expiry as a unix timestamp in seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

impl Session {
    /// Whether the access token has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now.timestamp())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn user(name: Option<&str>, email: Option<&str>) -> User {
        User {
            id: UserId::new("u1"),
            email: email.map(str::to_owned),
            user_metadata: UserMetadata {
                full_name: name.map(str::to_owned),
            },
            created_at: Some(Utc.with_ymd_and_hms(2025, 3, 4, 10, 0, 0).unwrap()),
        }
    }

    #[test]
    fn test_display_name_fallbacks() {
        assert_eq!(user(Some("Asha Rao"), Some("asha@x.in")).display_name(), "Asha Rao");
        assert_eq!(user(Some("  "), Some("asha@x.in")).display_name(), "asha");
        assert_eq!(user(None, None).display_name(), "User");
    }

    #[test]
    fn test_member_since() {
        assert_eq!(user(None, None).member_since(), "March 4, 2025");
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let session = Session {
            access_token: AccessToken::new("eyJhbGciOi.secret"),
            refresh_token: None,
            expires_at: Some(100),
            user: user(None, None),
        };
        let debug = format!("{session:?}");
        assert!(!debug.contains("secret"));
        assert!(session.is_expired(Utc.timestamp_opt(100, 0).unwrap()));
    }
}
