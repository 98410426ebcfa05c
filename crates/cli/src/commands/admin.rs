//! Admin panel commands.
//!
//! # Environment Variables
//!
//! - `ARIES_SUPABASE_URL` / `ARIES_SUPABASE_ANON_KEY` - backend project
//! - `ARIES_ADMIN_EMAIL` - the single account allowed into the panel
//! - `ARIES_DATA_DIR` - where the admin session is kept between runs

use std::path::Path;
use std::sync::Arc;

use aries_mall_admin::media::history::CLEAR_PROMPT;
use aries_mall_admin::media::staging::{UPLOAD_PREFIX, UPSCALE_PREFIX};
use aries_mall_admin::media::{PreviewRegistry, Scale, StagedFile, StagedItem, StagingArea};
use aries_mall_admin::pages::{AdminEvent, AdminPage, Confirm};
use aries_mall_admin::{AdminConfig, AdminPanel};
use tracing::info;

use super::{CommandError, StdinConfirm, password_or_prompt};
use crate::output;

/// Loads configuration and starts the panel.
///
/// # Errors
///
/// Returns `Config` for invalid environment values or `Admin` if the local
/// store cannot be opened.
pub fn open() -> Result<AdminPanel, CommandError> {
    let config = AdminConfig::from_env()?;
    Ok(AdminPanel::start(config, Arc::new(StdinConfirm))?)
}

fn require_admin(panel: &AdminPanel) -> Result<(), CommandError> {
    if panel.context().is_admin() {
        Ok(())
    } else {
        Err(CommandError::NotAdmin)
    }
}

/// Stages one file path or URL and hands it back ready for processing.
async fn stage(
    source: &str,
    prefix: &'static str,
    name: Option<&str>,
) -> Result<StagedItem, CommandError> {
    let mut staging = StagingArea::new(prefix, PreviewRegistry::new());
    let id = if source.starts_with("http://") || source.starts_with("https://") {
        staging.stage_url(source)?
    } else {
        staging.stage_file(StagedFile::from_path(Path::new(source)).await?)?
    };
    if let Some(name) = name {
        staging.rename(&id, name);
    }
    staging
        .take(&id)
        .ok_or_else(|| CommandError::InvalidArgument(format!("nothing staged for {source}")))
}

pub async fn login(
    panel: &AdminPanel,
    email: &str,
    password: Option<String>,
) -> Result<(), CommandError> {
    let password = password_or_prompt(password)?;
    panel.open("#/admin-login").await;
    panel
        .send(AdminEvent::SubmitLogin {
            email: email.to_owned(),
            password,
        })
        .await?;
    output::toasts(&panel.toasts().drain());
    if !panel.context().is_admin() {
        return Err(CommandError::SignInFailed);
    }
    info!("Administrator signed in");
    Ok(())
}

pub async fn logout(panel: &AdminPanel) -> Result<(), CommandError> {
    panel.send(AdminEvent::SignOut).await?;
    output::toasts(&panel.toasts().drain());
    Ok(())
}

pub async fn dashboard(panel: &AdminPanel) -> Result<(), CommandError> {
    let page = panel.open("#/dashboard").await;
    if page != Some(AdminPage::Dashboard) {
        output::toasts(&panel.toasts().drain());
        return Err(CommandError::NotAdmin);
    }
    output::page(panel.outlet().title().as_deref(), &panel.outlet().page());
    output::toasts(&panel.toasts().drain());
    Ok(())
}

pub async fn upload(
    panel: &AdminPanel,
    source: &str,
    name: Option<&str>,
) -> Result<(), CommandError> {
    require_admin(panel)?;
    let item = stage(source, UPLOAD_PREFIX, name).await?;
    let outcome = panel.context().media()?.upload(item).await;
    output::toasts(&panel.toasts().drain());
    let result = outcome?;

    output::line(&format!("{}: {}", result.name, result.asset.secure_url));
    for (label, url) in result.links() {
        output::line(&format!("  {label}: {url}"));
    }
    Ok(())
}

pub async fn upscale(panel: &AdminPanel, source: &str, scale: u8) -> Result<(), CommandError> {
    let scale = Scale::from_factor(scale)
        .ok_or_else(|| CommandError::InvalidArgument(format!("scale must be 2 or 4, got {scale}")))?;
    require_admin(panel)?;
    let item = stage(source, UPSCALE_PREFIX, None).await?;
    let outcome = panel.context().media()?.upscale(item, scale).await;
    output::toasts(&panel.toasts().drain());
    let result = outcome?;

    output::line(&format!(
        "{} ({}x): {}",
        result.name,
        result.scale.factor(),
        result.upscaled_url
    ));
    Ok(())
}

pub async fn history(panel: &AdminPanel, clear: bool) -> Result<(), CommandError> {
    require_admin(panel)?;
    let history = panel.context().media()?.history();
    if clear {
        let cleared = history.clear(StdinConfirm.confirm(CLEAR_PROMPT)).await;
        output::toasts(&panel.toasts().drain());
        if !cleared {
            output::line("History kept.");
        }
        return Ok(());
    }

    let entries = history.load().await;
    output::toasts(&panel.toasts().drain());
    if entries.is_empty() {
        output::line("No history found.");
    }
    for entry in entries {
        let when = entry
            .created_at
            .map(|at| at.format("%b %d, %Y %H:%M").to_string())
            .unwrap_or_default();
        output::line(&format!(
            "{when:<18} {:<7} {}  {}",
            entry.media_type.as_str(),
            entry.file_name,
            entry.file_url
        ));
    }
    Ok(())
}
