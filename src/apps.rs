//! Running application enumeration.

use crate::domain::{AppEntry, ApplicationList};
use crate::icon::IconResolver;
use crate::platform::{Platform, PlatformError, RunningApp};
use futures_util::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, trace};

/// Lists running applications, one entry per app name.
pub struct ApplicationEnumerator {
    platform: Arc<dyn Platform>,
    icons: Arc<IconResolver>,
    resolve_icons: bool,
    concurrency: usize,
}

impl ApplicationEnumerator {
    pub fn new(
        platform: Arc<dyn Platform>,
        icons: Arc<IconResolver>,
        resolve_icons: bool,
        concurrency: usize,
    ) -> Self {
        Self {
            platform,
            icons,
            resolve_icons,
            concurrency: concurrency.max(1),
        }
    }

    /// Running applications keyed by name.
    ///
    /// The first instance of each name wins. Fails only when the platform
    /// listing itself cannot run.
    pub async fn list_running_applications(&self) -> Result<ApplicationList, PlatformError> {
        let running = self.platform.running_applications().await?;
        let unique = dedup_first_seen(running);
        debug!(
            "Found {} unique applications on {}",
            unique.len(),
            self.platform.kind()
        );

        // `buffered` keeps input order, so the listing order survives.
        let entries: Vec<(String, AppEntry)> = stream::iter(unique)
            .map(|app| async move {
                let icon = if self.resolve_icons {
                    self.icons.resolve(&app.app_name).await.to_data_uri()
                } else {
                    String::new()
                };
                let entry = AppEntry {
                    title: app.title,
                    icon,
                };
                (app.app_name, entry)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut list = ApplicationList::new();
        for (name, entry) in entries {
            list.insert_first_seen(name, entry);
        }
        Ok(list)
    }
}

/// Drop unnamed apps and every repeat of a name already seen.
fn dedup_first_seen(apps: Vec<RunningApp>) -> Vec<RunningApp> {
    let mut seen: HashSet<String> = HashSet::with_capacity(apps.len());
    let mut unique: Vec<RunningApp> = Vec::with_capacity(apps.len());
    for app in apps {
        if app.app_name.is_empty() {
            trace!("Skipping unnamed application titled {:?}", app.title);
            continue;
        }
        if !seen.insert(app.app_name.clone()) {
            trace!("Skipping duplicate of '{}'", app.app_name);
            continue;
        }
        unique.push(app);
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icon::IconSynthesizer;
    use crate::icon::testing::{FailingStrategy, FixedStrategy};
    use crate::platform::testing::FakePlatform;
    use std::sync::atomic::Ordering;

    fn enumerator(platform: FakePlatform, icons: IconResolver) -> ApplicationEnumerator {
        ApplicationEnumerator::new(Arc::new(platform), Arc::new(icons), true, 4)
    }

    #[test]
    fn test_dedup_first_seen() {
        let unique = dedup_first_seen(vec![
            RunningApp::new("firefox", "Mozilla Firefox"),
            RunningApp::new("", "Desktop"),
            RunningApp::new("kitty", "~"),
            RunningApp::new("firefox", "Private Browsing"),
        ]);

        assert_eq!(
            unique,
            vec![
                RunningApp::new("firefox", "Mozilla Firefox"),
                RunningApp::new("kitty", "~"),
            ]
        );
    }

    #[test]
    fn test_dedup_full_process_table() {
        let apps: Vec<RunningApp> = (0..20_000)
            .map(|pid| RunningApp::new(format!("svc{}.exe", pid % 500), format!("pid {pid}")))
            .collect();

        let unique = dedup_first_seen(apps);
        assert_eq!(unique.len(), 500);
        assert_eq!(unique[0], RunningApp::new("svc0.exe", "pid 0"));
        assert_eq!(unique[499], RunningApp::new("svc499.exe", "pid 499"));
    }

    #[tokio::test]
    async fn test_enumeration_keeps_first_title_and_order() {
        let platform = FakePlatform::with_apps(vec![
            RunningApp::new("code", "main.rs - code"),
            RunningApp::new("firefox", "Mozilla Firefox"),
            RunningApp::new("code", "lib.rs - code"),
            RunningApp::new("kitty", "~"),
        ]);
        let icons = IconResolver::placeholder_only(IconSynthesizer::default());

        let list = enumerator(platform, icons)
            .list_running_applications()
            .await
            .unwrap();

        assert_eq!(list.names().collect::<Vec<_>>(), vec!["code", "firefox", "kitty"]);
        assert_eq!(list.get("code").unwrap().title, "main.rs - code");
        assert!(list.get("kitty").unwrap().icon.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_icon_resolved_once_per_unique_name() {
        let strategy = Arc::new(FixedStrategy::new("firefox", 8));

        struct Counting(Arc<FixedStrategy>);

        #[async_trait::async_trait]
        impl crate::icon::IconStrategy for Counting {
            fn name(&self) -> &'static str {
                "counting"
            }

            async fn attempt(
                &self,
                app: &str,
            ) -> Result<image::DynamicImage, crate::icon::StrategyFailure> {
                self.0.attempt(app).await
            }
        }

        let icons = IconResolver::new(
            vec![Box::new(Counting(strategy.clone()))],
            IconSynthesizer::default(),
            128,
        );
        let platform = FakePlatform::with_apps(vec![
            RunningApp::new("firefox", "a"),
            RunningApp::new("firefox", "b"),
            RunningApp::new("firefox", "c"),
        ]);

        let list = enumerator(platform, icons)
            .list_running_applications()
            .await
            .unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(strategy.calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_failing_icon_lookups_still_produce_entries() {
        let icons = IconResolver::new(
            vec![Box::new(FailingStrategy)],
            IconSynthesizer::default(),
            128,
        );
        let platform = FakePlatform::with_apps(vec![RunningApp::new("not-a-real-app-12345", "x")]);

        let list = enumerator(platform, icons)
            .list_running_applications()
            .await
            .unwrap();
        assert!(!list.get("not-a-real-app-12345").unwrap().icon.is_empty());
    }

    #[tokio::test]
    async fn test_empty_listing_is_an_empty_mapping() {
        let icons = IconResolver::placeholder_only(IconSynthesizer::default());
        let list = enumerator(FakePlatform::with_apps(Vec::new()), icons)
            .list_running_applications()
            .await
            .unwrap();

        assert!(list.is_empty());
        assert_eq!(serde_json::to_string(&list).unwrap(), "{}");
    }

    #[tokio::test]
    async fn test_unavailable_listing_is_an_error() {
        let icons = IconResolver::placeholder_only(IconSynthesizer::default());
        let err = enumerator(FakePlatform::broken(), icons)
            .list_running_applications()
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "process listing failed: unavailable");
    }

    #[tokio::test]
    async fn test_icons_can_be_disabled() {
        let platform = FakePlatform::with_apps(vec![RunningApp::new("kitty", "~")]);
        let icons = IconResolver::placeholder_only(IconSynthesizer::default());
        let enumerator = ApplicationEnumerator::new(Arc::new(platform), Arc::new(icons), false, 0);

        let list = enumerator.list_running_applications().await.unwrap();
        assert_eq!(list.get("kitty").unwrap().icon, "");
    }
}
