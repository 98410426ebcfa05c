//! Administrator sign-in.

use askama::Template;
use aries_mall_storefront::outlet::View;
use aries_mall_supabase::SupabaseError;
use async_trait::async_trait;
use tracing::{info, warn};

use super::{AdminContext, AdminEvent, AdminPage, Effect, NO_BACKEND, Page};
use crate::error::{AdminError, Result};

#[derive(Template)]
#[template(path = "pages/login.html")]
struct LoginTemplate;

/// Inline message block.
#[derive(Template)]
#[template(path = "partials/alert.html")]
pub(crate) struct AlertTemplate<'a> {
    pub kind: &'a str,
    pub message: &'a str,
}

/// Text shown for a failed sign-in.
#[must_use]
pub fn login_error_message(err: &SupabaseError) -> &'static str {
    let raw = err.user_message();
    if raw.contains("Invalid login credentials") {
        "Invalid email or password."
    } else if raw.contains("Email not confirmed") {
        "Please confirm your email address first."
    } else {
        "Login failed. Check your credentials."
    }
}

/// `#/admin-login`
pub struct LoginPage {
    ctx: AdminContext,
}

impl LoginPage {
    #[must_use]
    pub const fn new(ctx: AdminContext) -> Self {
        Self { ctx }
    }

    fn fail(&self, view: &View, message: &str) -> Result<Effect> {
        let html = AlertTemplate {
            kind: "error",
            message,
        }
        .render()?;
        view.set("error", html)?;
        self.ctx.toasts.error("Login Failed", message);
        Ok(Effect::None)
    }

    async fn sign_in(&self, view: &View, email: &str, password: &str) -> Result<Effect> {
        let Some(backend) = self.ctx.backend.as_ref() else {
            return self.fail(view, NO_BACKEND);
        };
        view.set("error", "")?;

        let session = match backend.sign_in(email.trim(), password).await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Admin sign-in failed");
                return self.fail(view, login_error_message(&e));
            }
        };

        let signed_in_as = session.user.email.unwrap_or_default();
        if !self.ctx.config.is_admin_email(&signed_in_as) {
            warn!(email = %signed_in_as, "Non-admin account attempted admin sign-in");
            if let Err(e) = backend.sign_out().await {
                warn!(error = %e, "Failed to sign out non-admin account");
            }
            return self.fail(view, &AdminError::NotAdmin.to_string());
        }

        info!("Administrator signed in");
        self.ctx.toasts.success("Login successful", "Redirecting...");
        Ok(Effect::Navigate(AdminPage::Dashboard))
    }
}

#[async_trait]
impl Page for LoginPage {
    fn name(&self) -> &'static str {
        "admin-login"
    }

    fn template(&self) -> std::result::Result<String, askama::Error> {
        LoginTemplate.render()
    }

    async fn init(&self, view: &View) -> Result<()> {
        view.set("error", "")?;
        Ok(())
    }

    async fn handle(&self, view: &View, event: AdminEvent) -> Result<Effect> {
        match event {
            AdminEvent::SubmitLogin { email, password } => {
                match self.sign_in(view, &email, &password).await {
                    Err(e) if !e.is_stale() && !matches!(e, AdminError::Template(_)) => {
                        warn!(error = %e, "Login submission failed");
                        self.fail(view, "An unexpected error occurred during submission.")
                    }
                    other => other,
                }
            }
            _ => Ok(Effect::None),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            login_error_message(&SupabaseError::Auth("Invalid login credentials".into())),
            "Invalid email or password."
        );
        assert_eq!(
            login_error_message(&SupabaseError::Auth("Email not confirmed".into())),
            "Please confirm your email address first."
        );
        assert_eq!(
            login_error_message(&SupabaseError::Api {
                status: 500,
                message: "boom".into()
            }),
            "Login failed. Check your credentials."
        );
    }
}
