//! Administrator profile and sign-out.

use askama::Template;
use aries_mall_storefront::outlet::View;
use async_trait::async_trait;
use tracing::{error, info};

use super::{AdminContext, AdminPage, Effect, Page};
use crate::error::Result;

#[derive(Template)]
#[template(path = "pages/profile.html")]
struct ProfileTemplate;

/// Signs the administrator out and returns to the login page. The sidebar
/// and the profile page share this.
pub async fn sign_out(ctx: &AdminContext) -> Effect {
    let outcome = match ctx.backend() {
        Ok(backend) => backend.sign_out().await.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };
    match outcome {
        Ok(()) => {
            info!("Administrator signed out");
            ctx.toasts
                .success("Signed Out", "You have been successfully signed out.");
            Effect::Navigate(AdminPage::Login)
        }
        Err(e) => {
            error!(error = %e, "Logout failed");
            ctx.toasts.error("Logout Failed", "");
            Effect::None
        }
    }
}

/// `#/profile`
pub struct ProfilePage {
    ctx: AdminContext,
}

impl ProfilePage {
    #[must_use]
    pub const fn new(ctx: AdminContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Page for ProfilePage {
    fn name(&self) -> &'static str {
        "profile"
    }

    fn template(&self) -> std::result::Result<String, askama::Error> {
        ProfileTemplate.render()
    }

    async fn init(&self, view: &View) -> Result<()> {
        let email = self
            .ctx
            .session_email()
            .filter(|email| self.ctx.config.is_admin_email(email))
            .unwrap_or_else(|| "Unauthorized".to_owned());
        view.set("admin-email", email)?;
        Ok(())
    }
}
