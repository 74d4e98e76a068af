//! Platform detection and per-OS introspection backends.
//!
//! Each supported OS family implements [`Platform`]; the variant is picked
//! once per invocation by [`select`].

pub mod linux;
pub mod macos;
#[cfg(target_os = "windows")]
pub mod windows;
mod x11;

use crate::config::Config;
use crate::icon::IconStrategy;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Detected host operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformKind {
    Windows,
    MacOs,
    Linux,
    Unknown,
}

impl PlatformKind {
    /// The OS family this binary was built for.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(any(
            target_os = "linux",
            target_os = "freebsd",
            target_os = "openbsd",
            target_os = "netbsd",
            target_os = "dragonfly"
        )) {
            Self::Linux
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::MacOs => "macos",
            Self::Linux => "linux",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Focused window as reported by the OS.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveWindow {
    pub app_name: String,
    pub title: String,
}

/// One application instance from an OS listing. Names may repeat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningApp {
    pub app_name: String,
    pub title: String,
}

impl RunningApp {
    pub fn new(app_name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            title: title.into(),
        }
    }
}

/// Errors from platform introspection.
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Unsupported platform: {0}")]
    Unsupported(PlatformKind),

    #[error("{helper} failed: {reason}")]
    HelperFailed { helper: String, reason: String },

    #[error("No active window")]
    NoActiveWindow,

    #[error("Unexpected output from {helper}: {output:?}")]
    UnexpectedOutput { helper: String, output: String },

    #[error("Platform call failed: {0}")]
    Native(String),
}

impl PlatformError {
    pub(crate) fn helper(helper: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::HelperFailed {
            helper: helper.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn native(context: &str, err: impl fmt::Display) -> Self {
        Self::Native(format!("{context}: {err}"))
    }
}

/// OS-specific introspection capabilities.
#[async_trait]
pub trait Platform: Send + Sync {
    fn kind(&self) -> PlatformKind;

    /// The currently focused window.
    async fn active_window(&self) -> Result<ActiveWindow, PlatformError>;

    /// Running applications in OS order, duplicates included.
    ///
    /// Items that cannot be read are skipped; an error means the listing
    /// itself could not run.
    async fn running_applications(&self) -> Result<Vec<RunningApp>, PlatformError>;

    /// Native icon strategies in priority order.
    fn icon_strategies(&self) -> Vec<Box<dyn IconStrategy>>;
}

/// Build the platform backend for `kind`.
pub fn select(kind: PlatformKind, config: &Config) -> Result<Box<dyn Platform>, PlatformError> {
    use crate::command::SystemRunner;
    use std::sync::Arc;

    match kind {
        PlatformKind::Linux => Ok(Box::new(linux::LinuxPlatform::new(
            Arc::new(SystemRunner),
            config,
        ))),
        PlatformKind::MacOs => Ok(Box::new(macos::MacPlatform::new(
            Arc::new(SystemRunner),
            config,
        ))),
        #[cfg(target_os = "windows")]
        PlatformKind::Windows => Ok(Box::new(windows::WindowsPlatform::new(config))),
        _ => Err(PlatformError::Unsupported(kind)),
    }
}
