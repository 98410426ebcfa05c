//! Sign-in and sign-up forms.

use std::sync::{Mutex, PoisonError};

use askama::Template;
use async_trait::async_trait;
use aries_mall_core::{Email, Session};
use aries_mall_supabase::SignUpOutcome;
use tracing::{info, warn};

use super::{Effect, Page, PageContext, UiEvent};
use crate::error::Result;
use crate::outlet::View;

/// Minimum password length for new accounts.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Which form the page shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Signup,
}

/// Per-field validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl FieldErrors {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.email.is_none() && self.password.is_none()
    }
}

/// Checks a submitted form. `full_name` is ignored for [`AuthMode::Login`].
#[must_use]
pub fn validate(mode: AuthMode, full_name: &str, email: &str, password: &str) -> FieldErrors {
    let mut errors = FieldErrors::default();
    if mode == AuthMode::Signup && full_name.trim().is_empty() {
        errors.full_name = Some("Full name is required.".to_owned());
    }
    if email.trim().is_empty() {
        errors.email = Some("Email is required.".to_owned());
    } else if Email::parse(email.trim()).is_err() {
        errors.email = Some("Please enter a valid email address.".to_owned());
    }
    if password.is_empty() {
        errors.password = Some("Password is required.".to_owned());
    } else if mode == AuthMode::Signup && password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.password = Some("Password must be at least 8 characters long.".to_owned());
    }
    errors
}

#[derive(Template)]
#[template(path = "partials/auth_form.html")]
struct AuthFormTemplate<'a> {
    signup: bool,
    full_name: &'a str,
    email: &'a str,
    errors: &'a FieldErrors,
    message: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "pages/auth.html")]
struct AuthTemplate {
    heading: &'static str,
    subheading: &'static str,
    switch_text: &'static str,
    switch_href: &'static str,
    switch_label: &'static str,
}

#[derive(Default)]
struct FormState {
    full_name: String,
    email: String,
    errors: FieldErrors,
    message: Option<String>,
}

/// `/login` and `/signup`
pub struct AuthPage {
    mode: AuthMode,
    ctx: PageContext,
    form: Mutex<FormState>,
}

impl AuthPage {
    #[must_use]
    pub fn new(ctx: PageContext, mode: AuthMode) -> Self {
        Self {
            mode,
            ctx,
            form: Mutex::new(FormState::default()),
        }
    }

    fn render_form(&self, view: &View) -> Result<()> {
        let html = {
            let form = self.form.lock().unwrap_or_else(PoisonError::into_inner);
            AuthFormTemplate {
                signup: self.mode == AuthMode::Signup,
                full_name: &form.full_name,
                email: &form.email,
                errors: &form.errors,
                message: form.message.as_deref(),
            }
            .render()?
        };
        view.set("form", html)
    }

    /// Stores field values and errors; returns whether the form is valid.
    fn check(&self, full_name: &str, email: &str, password: &str) -> bool {
        let errors = validate(self.mode, full_name, email, password);
        let valid = errors.is_empty();
        let mut form = self.form.lock().unwrap_or_else(PoisonError::into_inner);
        form.full_name = full_name.to_owned();
        form.email = email.to_owned();
        form.errors = errors;
        form.message = None;
        valid
    }

    fn fail(&self, view: &View, message: String) -> Result<Effect> {
        self.form
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .message = Some(message);
        self.render_form(view)?;
        Ok(Effect::None)
    }

    async fn signed_in(&self, session: Session) -> Effect {
        self.ctx.store.on_session_change(Some(session)).await;
        Effect::Navigate("/".to_owned())
    }

    async fn login(&self, view: &View, email: &str, password: &str) -> Result<Effect> {
        let Some(backend) = self.ctx.store.backend() else {
            self.service_unavailable();
            return Ok(Effect::None);
        };
        if !self.check("", email, password) {
            self.render_form(view)?;
            return Ok(Effect::None);
        }
        match backend.sign_in(email.trim(), password).await {
            Ok(session) => {
                info!(user_id = %session.user.id, "Signed in");
                self.ctx.toasts.success(
                    "Login Successful",
                    format!("Welcome Back, {}!", session.user.display_name()),
                );
                Ok(self.signed_in(session).await)
            }
            Err(e) => {
                warn!(error = %e, "Sign in failed");
                self.fail(view, e.user_message())
            }
        }
    }

    async fn signup(
        &self,
        view: &View,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> Result<Effect> {
        let Some(backend) = self.ctx.store.backend() else {
            self.service_unavailable();
            return Ok(Effect::None);
        };
        if !self.check(full_name, email, password) {
            self.render_form(view)?;
            return Ok(Effect::None);
        }
        match backend
            .sign_up(email.trim(), password, full_name.trim())
            .await
        {
            Ok(SignUpOutcome::SignedIn(session)) => {
                info!(user_id = %session.user.id, "Account created");
                self.ctx
                    .toasts
                    .success("Account Created!", "Welcome to Aries Mall!");
                Ok(self.signed_in(session).await)
            }
            Ok(SignUpOutcome::ConfirmationRequired(user)) => {
                info!(user_id = %user.id, "Account created, confirmation pending");
                self.ctx.toasts.success(
                    "Account Created!",
                    "Check your email to confirm your account, then sign in.",
                );
                Ok(Effect::Navigate("/login".to_owned()))
            }
            Err(e) => {
                warn!(error = %e, "Sign up failed");
                self.fail(view, e.user_message())
            }
        }
    }

    fn service_unavailable(&self) {
        self.ctx.toasts.error(
            "Service Error",
            "Authentication services are currently unavailable.",
        );
    }
}

#[async_trait]
impl Page for AuthPage {
    fn name(&self) -> &'static str {
        match self.mode {
            AuthMode::Login => "login",
            AuthMode::Signup => "signup",
        }
    }

    fn template(&self) -> std::result::Result<String, askama::Error> {
        match self.mode {
            AuthMode::Login => AuthTemplate {
                heading: "Welcome Back",
                subheading: "Sign in to continue shopping.",
                switch_text: "Don't have an account?",
                switch_href: "#/signup",
                switch_label: "Sign Up",
            },
            AuthMode::Signup => AuthTemplate {
                heading: "Create an Account",
                subheading: "Join Aries Mall today.",
                switch_text: "Already have an account?",
                switch_href: "#/login",
                switch_label: "Sign In",
            },
        }
        .render()
    }

    async fn init(&self, view: &View) -> Result<()> {
        view.set_title(match self.mode {
            AuthMode::Login => "Sign In | Aries Mall",
            AuthMode::Signup => "Sign Up | Aries Mall",
        })?;
        self.render_form(view)
    }

    async fn handle(&self, view: &View, event: UiEvent) -> Result<Effect> {
        match (self.mode, event) {
            (AuthMode::Login, UiEvent::SubmitLogin { email, password }) => {
                self.login(view, &email, &password).await
            }
            (
                AuthMode::Signup,
                UiEvent::SubmitSignup {
                    full_name,
                    email,
                    password,
                },
            ) => self.signup(view, &full_name, &email, &password).await,
            _ => Ok(Effect::None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_validation() {
        let errors = validate(AuthMode::Login, "", "", "");
        assert_eq!(errors.email.as_deref(), Some("Email is required."));
        assert_eq!(errors.password.as_deref(), Some("Password is required."));
        assert!(errors.full_name.is_none());

        let errors = validate(AuthMode::Login, "", "user@localhost", "x");
        assert_eq!(
            errors.email.as_deref(),
            Some("Please enter a valid email address.")
        );
        assert!(errors.password.is_none());

        assert!(validate(AuthMode::Login, "", "a@b.co", "short").is_empty());
    }

    #[test]
    fn test_signup_requires_name_and_long_password() {
        let errors = validate(AuthMode::Signup, "  ", "a@b.co", "short");
        assert_eq!(errors.full_name.as_deref(), Some("Full name is required."));
        assert_eq!(
            errors.password.as_deref(),
            Some("Password must be at least 8 characters long.")
        );
        assert!(validate(AuthMode::Signup, "Asha", "a@b.co", "longenough").is_empty());
    }
}
