//! Integration credentials stored in the backend's `system_config` table.
//!
//! Rows are `(key, value)` pairs. They are read on first use and cached for
//! the configured TTL; [`SettingsCache::invalidate`] forces a reload.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use secrecy::SecretString;
use tracing::{debug, error, instrument};

use crate::backend::{AdminBackend, ConfigRow};
use crate::error::{AdminError, MediaError, Result};

pub const CLOUDINARY_CLOUD_NAME: &str = "CLOUDINARY_CLOUD_NAME";
pub const CLOUDINARY_UPLOAD_PRESET: &str = "CLOUDINARY_UPLOAD_PRESET";
pub const CLOUDINARY_UPSCALER_PRESET: &str = "CLOUDINARY_UPSCALER_PRESET";
pub const TINYPNG_API_KEY: &str = "TINYPNG_API_KEY";
pub const REPLICATE_API_TOKEN: &str = "REPLICATE_API_TOKEN";
pub const UPSCALER_MODEL: &str = "UPSCALER_MODEL";

/// Media API credentials. Blank values count as absent.
#[derive(Clone, Default)]
pub struct IntegrationSettings {
    pub cloudinary_cloud_name: Option<String>,
    pub cloudinary_upload_preset: Option<String>,
    pub cloudinary_upscaler_preset: Option<String>,
    pub tinypng_api_key: Option<SecretString>,
    pub replicate_api_token: Option<SecretString>,
    /// Replicate model version id
    pub upscaler_model: Option<String>,
}

impl std::fmt::Debug for IntegrationSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redacted = |s: &Option<SecretString>| s.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("IntegrationSettings")
            .field("cloudinary_cloud_name", &self.cloudinary_cloud_name)
            .field("cloudinary_upload_preset", &self.cloudinary_upload_preset)
            .field("cloudinary_upscaler_preset", &self.cloudinary_upscaler_preset)
            .field("tinypng_api_key", &redacted(&self.tinypng_api_key))
            .field("replicate_api_token", &redacted(&self.replicate_api_token))
            .field("upscaler_model", &self.upscaler_model)
            .finish()
    }
}

impl IntegrationSettings {
    /// Builds settings from `system_config` rows. Unknown keys are ignored.
    #[must_use]
    pub fn from_rows(rows: &[ConfigRow]) -> Self {
        let value = |key: &str| {
            rows.iter()
                .find(|row| row.key == key)
                .and_then(|row| row.value.as_deref())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        };
        Self {
            cloudinary_cloud_name: value(CLOUDINARY_CLOUD_NAME),
            cloudinary_upload_preset: value(CLOUDINARY_UPLOAD_PRESET),
            cloudinary_upscaler_preset: value(CLOUDINARY_UPSCALER_PRESET),
            tinypng_api_key: value(TINYPNG_API_KEY).map(SecretString::from),
            replicate_api_token: value(REPLICATE_API_TOKEN).map(SecretString::from),
            upscaler_model: value(UPSCALER_MODEL),
        }
    }

    /// Cloud name and upload preset.
    ///
    /// # Errors
    ///
    /// Returns `MissingConfig` naming the first absent key.
    pub fn upload_target(&self) -> std::result::Result<(&str, &str), MediaError> {
        let cloud = self
            .cloudinary_cloud_name
            .as_deref()
            .ok_or(MediaError::MissingConfig(CLOUDINARY_CLOUD_NAME))?;
        let preset = self
            .cloudinary_upload_preset
            .as_deref()
            .ok_or(MediaError::MissingConfig(CLOUDINARY_UPLOAD_PRESET))?;
        Ok((cloud, preset))
    }
}

/// Process-wide cache of [`IntegrationSettings`].
#[derive(Clone)]
pub struct SettingsCache {
    backend: Arc<dyn AdminBackend>,
    cache: Cache<(), Arc<IntegrationSettings>>,
}

impl std::fmt::Debug for SettingsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsCache")
            .field("cached", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}

impl SettingsCache {
    #[must_use]
    pub fn new(backend: Arc<dyn AdminBackend>, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(1).time_to_live(ttl).build();
        Self { backend, cache }
    }

    /// Cached settings, loading them on a miss.
    ///
    /// # Errors
    ///
    /// Returns `Settings` if `system_config` cannot be read. Failures are not
    /// cached.
    #[instrument(skip(self))]
    pub async fn get(&self) -> Result<Arc<IntegrationSettings>> {
        if let Some(settings) = self.cache.get(&()).await {
            debug!("Settings cache hit");
            return Ok(settings);
        }
        let rows = self.backend.system_config().await.map_err(|e| {
            error!(error = %e, "Failed to load system config");
            AdminError::Settings
        })?;
        let settings = Arc::new(IntegrationSettings::from_rows(&rows));
        self.cache.insert((), Arc::clone(&settings)).await;
        debug!(keys = rows.len(), "Settings loaded");
        Ok(settings)
    }

    /// Drops the cached settings.
    pub fn invalidate(&self) {
        self.cache.invalidate_all();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;
    use crate::testing::FakeAdmin;

    fn row(key: &str, value: Option<&str>) -> ConfigRow {
        ConfigRow {
            key: key.to_owned(),
            value: value.map(str::to_owned),
        }
    }

    #[test]
    fn test_blank_values_are_absent() {
        let settings = IntegrationSettings::from_rows(&[
            row(CLOUDINARY_CLOUD_NAME, Some(" demo ")),
            row(CLOUDINARY_UPLOAD_PRESET, Some("")),
            row(TINYPNG_API_KEY, None),
            row(REPLICATE_API_TOKEN, Some("r8_token")),
            row("UNRELATED", Some("x")),
        ]);
        assert_eq!(settings.cloudinary_cloud_name.as_deref(), Some("demo"));
        assert!(settings.cloudinary_upload_preset.is_none());
        assert!(settings.tinypng_api_key.is_none());
        assert_eq!(
            settings.replicate_api_token.unwrap().expose_secret(),
            "r8_token"
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let settings = IntegrationSettings::from_rows(&[row(TINYPNG_API_KEY, Some("tiny-secret"))]);
        let debug = format!("{settings:?}");
        assert!(!debug.contains("tiny-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_upload_target_names_missing_key() {
        let settings = IntegrationSettings::from_rows(&[row(CLOUDINARY_CLOUD_NAME, Some("demo"))]);
        let err = settings.upload_target().unwrap_err();
        assert!(matches!(
            err,
            MediaError::MissingConfig(CLOUDINARY_UPLOAD_PRESET)
        ));
    }

    #[tokio::test]
    async fn test_cache_hits_until_invalidated() {
        let fake = Arc::new(FakeAdmin::new().with_config(CLOUDINARY_CLOUD_NAME, "demo"));
        let cache = SettingsCache::new(fake.clone(), Duration::from_secs(300));

        cache.get().await.unwrap();
        cache.get().await.unwrap();
        assert_eq!(fake.call_count("system_config"), 1);

        cache.invalidate();
        let settings = cache.get().await.unwrap();
        assert_eq!(settings.cloudinary_cloud_name.as_deref(), Some("demo"));
        assert_eq!(fake.call_count("system_config"), 2);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let fake = Arc::new(FakeAdmin::new());
        fake.set_fail_reads(true);
        let cache = SettingsCache::new(fake.clone(), Duration::from_secs(300));

        let err = cache.get().await.unwrap_err();
        assert_eq!(err.user_message(), "Could not load API keys from database.");

        fake.set_fail_reads(false);
        assert!(cache.get().await.is_ok());
    }
}
