//! Email/password authentication and session state.
//!
//! The current session lives behind a `tokio::sync::watch` channel: callers
//! read it with [`Auth::session`] and observe login/logout transitions with
//! [`Auth::subscribe`].

use aries_mall_core::{AccessToken, Session, User};
use chrono::Utc;
use serde::Deserialize;
use tokio::sync::watch;
use tracing::{info, instrument, warn};
use url::Url;

use crate::error::{ErrorBody, SupabaseError};

/// Result of a sign-up request.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// The project auto-confirms accounts; the user is signed in.
    SignedIn(Session),
    /// A confirmation email was sent; no session yet.
    ConfirmationRequired(User),
}

/// GoTrue token grant response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: User,
}

impl From<TokenResponse> for Session {
    fn from(token: TokenResponse) -> Self {
        let expires_at = token
            .expires_at
            .or_else(|| token.expires_in.map(|secs| Utc::now().timestamp() + secs));
        Self {
            access_token: AccessToken::new(token.access_token),
            refresh_token: token.refresh_token.map(AccessToken::new),
            expires_at,
            user: token.user,
        }
    }
}

/// Auth API client and session holder.
pub struct Auth {
    http: reqwest::Client,
    base: Url,
    session: watch::Sender<Option<Session>>,
}

impl Auth {
    pub(crate) fn new(http: reqwest::Client, base: Url) -> Self {
        let (session, _) = watch::channel(None);
        Self {
            http,
            base,
            session,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, SupabaseError> {
        self.base
            .join(path)
            .map_err(|e| SupabaseError::InvalidConfig(format!("auth URL {path}: {e}")))
    }

    /// The current session, if any.
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    /// Receiver that yields every session transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }

    /// Replaces the current session, e.g. with one persisted by a previous run.
    ///
    /// Expired sessions are discarded.
    pub fn restore_session(&self, session: Option<Session>) {
        let session = session.filter(|s| !s.is_expired(Utc::now()));
        self.publish(session);
    }

    fn publish(&self, session: Option<Session>) {
        let changed = self.session.send_if_modified(|current| {
            let same_user = current.as_ref().map(|s| &s.user.id) == session.as_ref().map(|s| &s.user.id);
            let same_token = current.as_ref().map(|s| &s.access_token)
                == session.as_ref().map(|s| &s.access_token);
            *current = session;
            !(same_user && same_token)
        });
        if changed {
            info!(signed_in = self.session.borrow().is_some(), "Session changed");
        }
    }

    /// Signs in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `Auth` with the server's message (e.g. "Invalid login
    /// credentials") when the credentials are rejected.
    #[instrument(skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, SupabaseError> {
        let url = self.endpoint("token?grant_type=password")?;
        let response = self
            .http
            .post(url)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;
        if !status.is_success() {
            return Err(SupabaseError::Auth(ErrorBody::extract(&raw)));
        }

        let token: TokenResponse = serde_json::from_str(&raw)
            .map_err(|e| SupabaseError::Parse(format!("token response: {e}")))?;
        let session = Session::from(token);
        self.publish(Some(session.clone()));
        Ok(session)
    }

    /// Creates an account, storing `full_name` in the user metadata.
    ///
    /// # Errors
    ///
    /// Returns `Auth` with the server's message when sign-up is rejected.
    #[instrument(skip(self, password))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<SignUpOutcome, SupabaseError> {
        let url = self.endpoint("signup")?;
        let response = self
            .http
            .post(url)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "data": { "full_name": full_name },
            }))
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;
        if !status.is_success() {
            return Err(SupabaseError::Auth(ErrorBody::extract(&raw)));
        }

        let value: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| SupabaseError::Parse(format!("signup response: {e}")))?;
        if value.get("access_token").is_some() {
            let token: TokenResponse = serde_json::from_value(value)
                .map_err(|e| SupabaseError::Parse(format!("signup session: {e}")))?;
            let session = Session::from(token);
            self.publish(Some(session.clone()));
            return Ok(SignUpOutcome::SignedIn(session));
        }

        let user_value = value.get("user").cloned().unwrap_or(value);
        let user: User = serde_json::from_value(user_value)
            .map_err(|e| SupabaseError::Parse(format!("signup user: {e}")))?;
        Ok(SignUpOutcome::ConfirmationRequired(user))
    }

    /// Signs out. The local session is cleared even if the server call fails.
    ///
    /// # Errors
    ///
    /// Returns the server error after clearing local state.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<(), SupabaseError> {
        let Some(session) = self.session() else {
            return Ok(());
        };
        let result = self.revoke(&session).await;
        self.publish(None);
        if let Err(ref e) = result {
            warn!(error = %e, "Server-side sign-out failed; local session cleared");
        }
        result
    }

    async fn revoke(&self, session: &Session) -> Result<(), SupabaseError> {
        let url = self.endpoint("logout")?;
        let response = self
            .http
            .post(url)
            .bearer_auth(session.access_token.expose())
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let raw = response.text().await.unwrap_or_default();
        Err(SupabaseError::Api {
            status: status.as_u16(),
            message: ErrorBody::extract(&raw),
        })
    }
}
