//! User-facing notifications shared by the storefront and admin panel.

use std::time::Duration;

use serde::Serialize;

/// Visual style of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    #[default]
    Success,
    Error,
    Info,
}

impl ToastKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

/// A transient notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub title: String,
    pub description: Option<String>,
    pub kind: ToastKind,
    pub duration: Duration,
}

impl Toast {
    /// How long a toast stays visible unless overridden.
    pub const DEFAULT_DURATION: Duration = Duration::from_millis(4000);

    fn build(kind: ToastKind, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            kind,
            duration: Self::DEFAULT_DURATION,
        }
    }

    #[must_use]
    pub fn success(title: impl Into<String>) -> Self {
        Self::build(ToastKind::Success, title)
    }

    #[must_use]
    pub fn error(title: impl Into<String>) -> Self {
        Self::build(ToastKind::Error, title)
    }

    #[must_use]
    pub fn info(title: impl Into<String>) -> Self {
        Self::build(ToastKind::Info, title)
    }

    /// Adds body text below the title.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub const fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}
