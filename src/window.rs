//! Active window lookup.

use crate::domain::WindowInfo;
use crate::icon::IconResolver;
use crate::platform::Platform;
use std::sync::Arc;
use tracing::debug;

/// Reports the focused application, its window title and its icon.
pub struct WindowInfoResolver {
    platform: Arc<dyn Platform>,
    icons: Arc<IconResolver>,
    resolve_icons: bool,
}

impl WindowInfoResolver {
    pub fn new(platform: Arc<dyn Platform>, icons: Arc<IconResolver>, resolve_icons: bool) -> Self {
        Self {
            platform,
            icons,
            resolve_icons,
        }
    }

    /// Snapshot of the focused window.
    ///
    /// Never fails. If the platform cannot tell which window has focus, all
    /// fields except `category` are left empty.
    pub async fn active_window_info(&self) -> WindowInfo {
        let window = match self.platform.active_window().await {
            Ok(window) => window,
            Err(e) => {
                debug!("No active window on {}: {}", self.platform.kind(), e);
                return WindowInfo::empty();
            }
        };

        let mut info = WindowInfo::new(window.app_name, window.title);
        if self.resolve_icons && !info.app_name.is_empty() {
            info.icon = self.icons.resolve(&info.app_name).await.to_data_uri();
        }
        info
    }
}
