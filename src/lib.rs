//! activity-probe - active window, running application and icon introspection.
//!
//! A [`Probe`] bundles the platform backend for the current OS with one shared
//! [`IconResolver`], and answers the three queries the host asks for.

pub mod apps;
pub mod command;
pub mod config;
pub mod domain;
pub mod icon;
pub mod platform;
pub mod window;

use crate::apps::ApplicationEnumerator;
use crate::config::Config;
use crate::domain::{ApplicationList, WindowInfo};
use crate::icon::{EncodedIcon, IconResolver, IconSynthesizer};
use crate::platform::{Platform, PlatformError, PlatformKind};
use crate::window::WindowInfoResolver;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Query entry point for one platform.
pub struct Probe {
    kind: PlatformKind,
    icons: Arc<IconResolver>,
    windows: WindowInfoResolver,
    apps: ApplicationEnumerator,
}

impl Probe {
    /// Probe for the OS this process runs on.
    pub fn for_current_platform(config: &Config) -> Result<Self, PlatformError> {
        let platform = platform::select(PlatformKind::current(), config)?;
        Ok(Self::new(Arc::from(platform), config))
    }

    pub fn new(platform: Arc<dyn Platform>, config: &Config) -> Self {
        let icons = Arc::new(icon_resolver(platform.as_ref(), config));
        debug!(
            "Icon strategies for {}: {:?}",
            platform.kind(),
            icons.strategy_names()
        );

        Self {
            kind: platform.kind(),
            windows: WindowInfoResolver::new(
                Arc::clone(&platform),
                Arc::clone(&icons),
                config.resolve_icons,
            ),
            apps: ApplicationEnumerator::new(
                platform,
                Arc::clone(&icons),
                config.resolve_icons,
                config.icon_concurrency,
            ),
            icons,
        }
    }

    pub fn kind(&self) -> PlatformKind {
        self.kind
    }

    pub async fn active_window_info(&self) -> WindowInfo {
        self.windows.active_window_info().await
    }

    pub async fn running_applications(&self) -> Result<ApplicationList, PlatformError> {
        self.apps.list_running_applications().await
    }

    pub async fn app_icon(&self, app_name: &str) -> EncodedIcon {
        self.icons.resolve(app_name).await
    }
}

/// Icon resolver using `platform`'s native strategies.
pub fn icon_resolver(platform: &dyn Platform, config: &Config) -> IconResolver {
    IconResolver::new(
        platform.icon_strategies(),
        IconSynthesizer::new(config.placeholder_color),
        config.max_icon_size,
    )
}

/// Icon resolver for the current OS, or placeholders only when the OS has
/// no backend.
pub fn current_icon_resolver(config: &Config) -> IconResolver {
    let synthesizer = IconSynthesizer::new(config.placeholder_color);
    match platform::select(PlatformKind::current(), config) {
        Ok(platform) => icon_resolver(platform.as_ref(), config),
        Err(e) => {
            debug!("Native icons unavailable: {}", e);
            IconResolver::placeholder_only(synthesizer)
        }
    }
}

/// Run one query to completion on a fresh runtime.
///
/// Blocking lookups that missed their deadline may still be running when the
/// query returns. The runtime is shut down without waiting for them, so the
/// process can exit as soon as its output is written.
pub fn block_on<F: Future>(query: F) -> std::io::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let output = runtime.block_on(query);
    runtime.shutdown_background();
    Ok(output)
}
