//! Linux / generic Unix backend.
//!
//! The active window comes from X11 directly when a display is reachable,
//! else from `xdotool`. Applications are listed with `wmctrl -l` and named
//! after each window's `WM_CLASS` (read with `xprop`). Icons are looked up in
//! desktop entries and the conventional icon-theme and pixmap directories.

use super::{ActiveWindow, Platform, PlatformError, PlatformKind, RunningApp, x11};
use crate::command::CommandRunner;
use crate::config::Config;
use crate::icon::{self, IconStrategy, StrategyFailure};
use async_trait::async_trait;
use image::DynamicImage;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Accepted icon file extensions, most preferred first.
const ICON_EXTENSIONS: [&str; 6] = ["png", "svg", "xpm", "jpg", "jpeg", "ico"];

/// hicolor sizes probed for a themed icon name, largest first.
const THEME_SIZES: [&str; 7] = [
    "512x512", "256x256", "128x128", "96x96", "64x64", "48x48", "32x32",
];

pub struct LinuxPlatform {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
    search_timeout: Duration,
    extra_icon_dirs: Vec<PathBuf>,
    native_x11: bool,
}

impl LinuxPlatform {
    pub fn new(runner: Arc<dyn CommandRunner>, config: &Config) -> Self {
        let native_x11 = env::var_os("DISPLAY").is_some_and(|d| !d.is_empty());
        Self {
            runner,
            timeout: config.command_timeout(),
            search_timeout: config.icon_search_timeout(),
            extra_icon_dirs: config.extra_icon_dirs.clone(),
            native_x11,
        }
    }

    /// Run a helper and return its trimmed stdout, failing on non-zero exit.
    async fn helper(&self, program: &str, args: &[&str]) -> Result<String, PlatformError> {
        let output = self.runner.run(program, args, self.timeout).await;
        if !output.succeeded() {
            return Err(PlatformError::helper(program, output.failure_reason()));
        }
        Ok(output.stdout.trim().to_string())
    }

    async fn active_window_via_xdotool(&self) -> Result<ActiveWindow, PlatformError> {
        let window_id = self.helper("xdotool", &["getactivewindow"]).await?;
        if window_id.is_empty() {
            return Err(PlatformError::NoActiveWindow);
        }

        let title = self.helper("xdotool", &["getwindowname", &window_id]).await?;
        let app_name = self
            .helper("xdotool", &["getwindowclassname", &window_id])
            .await?;

        Ok(ActiveWindow { app_name, title })
    }

    /// WM_CLASS instance of one window, `None` if it cannot be read.
    async fn window_class(&self, window_id: &str) -> Option<String> {
        let output = self
            .runner
            .run("xprop", &["-id", window_id, "WM_CLASS"], self.timeout)
            .await;
        output.stdout_if_success().and_then(parse_wm_class)
    }
}

#[async_trait]
impl Platform for LinuxPlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Linux
    }

    async fn active_window(&self) -> Result<ActiveWindow, PlatformError> {
        if self.native_x11 {
            match x11::active_window(self.timeout).await {
                Ok(window) => return Ok(window),
                Err(e) => debug!("Native X11 lookup failed, falling back to xdotool: {}", e),
            }
        }
        self.active_window_via_xdotool().await
    }

    async fn running_applications(&self) -> Result<Vec<RunningApp>, PlatformError> {
        let listing = self.helper("wmctrl", &["-l"]).await?;

        let mut apps = Vec::new();
        for line in listing.lines() {
            let Some(window) = parse_wmctrl_line(line) else {
                trace!("Ignoring wmctrl line: {}", line);
                continue;
            };
            match self.window_class(window.id).await {
                Some(app_name) => apps.push(RunningApp::new(app_name, window.title)),
                None => debug!("Skipping window {}: WM_CLASS unavailable", window.id),
            }
        }

        Ok(apps)
    }

    fn icon_strategies(&self) -> Vec<Box<dyn IconStrategy>> {
        let icon_dirs = icon_search_roots(&self.extra_icon_dirs);
        vec![
            Box::new(DesktopEntryIcon {
                application_dirs: xdg_data_dirs("applications"),
                icon_dirs: icon_dirs.clone(),
                deadline: self.search_timeout,
            }),
            Box::new(IconThemeSearch {
                roots: icon_dirs,
                deadline: self.search_timeout,
            }),
        ]
    }
}

/// One row of `wmctrl -l`.
#[derive(Debug, PartialEq, Eq)]
struct WmctrlWindow<'a> {
    id: &'a str,
    title: &'a str,
}

/// Parse `<id> <desktop> <host> <title>`; rows without a title are ignored.
fn parse_wmctrl_line(line: &str) -> Option<WmctrlWindow<'_>> {
    let mut rest = line.trim_start();
    let mut fields = [""; 3];
    for field in &mut fields {
        let end = rest.find(char::is_whitespace)?;
        *field = &rest[..end];
        rest = rest[end..].trim_start();
    }

    let title = rest.trim_end();
    if title.is_empty() {
        return None;
    }
    Some(WmctrlWindow {
        id: fields[0],
        title,
    })
}

/// App name from an `xprop WM_CLASS` line such as
/// `WM_CLASS(STRING) = "firefox", "Firefox"`.
///
/// Takes the first comma-delimited token with quotes stripped. A lone
/// `instance.Class` token is cut at the first dot.
fn parse_wm_class(raw: &str) -> Option<String> {
    let (_, value) = raw.split_once('=')?;
    let mut tokens = value.split(',');
    let first = tokens.next()?.trim().trim_matches('"');

    let name = if tokens.next().is_none() {
        first.split_once('.').map_or(first, |(instance, _)| instance)
    } else {
        first
    };
    (!name.is_empty()).then(|| name.to_string())
}

/// Icon named by a matching `.desktop` entry.
struct DesktopEntryIcon {
    application_dirs: Vec<PathBuf>,
    icon_dirs: Vec<PathBuf>,
    deadline: Duration,
}

#[async_trait]
impl IconStrategy for DesktopEntryIcon {
    fn name(&self) -> &'static str {
        "desktop-entry"
    }

    async fn attempt(&self, app: &str) -> Result<DynamicImage, StrategyFailure> {
        let app = app.to_string();
        let application_dirs = self.application_dirs.clone();
        let icon_dirs = self.icon_dirs.clone();

        icon::run_blocking(self.deadline, move || {
            let icon = find_desktop_icon(&application_dirs, &app)
                .ok_or_else(|| StrategyFailure::NotFound(format!("no desktop entry for {app}")))?;
            let path = resolve_icon_path(&icon, &icon_dirs)
                .ok_or_else(|| StrategyFailure::NotFound(format!("icon {icon} not installed")))?;
            icon::load_icon_file(&path)
        })
        .await
    }
}

/// Icon file whose stem matches the app name anywhere under the icon roots.
struct IconThemeSearch {
    roots: Vec<PathBuf>,
    deadline: Duration,
}

#[async_trait]
impl IconStrategy for IconThemeSearch {
    fn name(&self) -> &'static str {
        "icon-theme-search"
    }

    async fn attempt(&self, app: &str) -> Result<DynamicImage, StrategyFailure> {
        let names = icon_name_candidates(app);
        let roots = self.roots.clone();

        icon::run_blocking(self.deadline, move || {
            for path in find_theme_icons(&roots, &names) {
                match icon::load_icon_file(&path) {
                    Ok(image) => return Ok(image),
                    Err(e) => trace!("Skipping {}: {}", path.display(), e),
                }
            }
            Err(StrategyFailure::NotFound(format!(
                "no icon file named {}",
                names.join(" or ")
            )))
        })
        .await
    }
}

/// Case-folded file stems to look for: the name without a trailing `.exe`,
/// and its part before the first dot.
fn icon_name_candidates(app: &str) -> Vec<String> {
    let lowered = app.to_lowercase();
    let name = lowered.strip_suffix(".exe").unwrap_or(&lowered).to_string();

    let mut names = vec![name.clone()];
    if let Some((head, _)) = name.split_once('.')
        && !head.is_empty()
    {
        names.push(head.to_string());
    }
    names
}

/// Matching icon files, ordered by extension preference then scan order.
fn find_theme_icons(roots: &[PathBuf], names: &[String]) -> Vec<PathBuf> {
    let mut found: Vec<(usize, PathBuf)> = Vec::new();

    for root in roots.iter().filter(|r| r.is_dir()) {
        // Themes and pixmaps commonly symlink into package directories.
        let walker = WalkDir::new(root).follow_links(true).sort_by_file_name();
        for entry in walker.into_iter().flatten() {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Some(rank) = extension_rank(path) else {
                continue;
            };
            let stem_matches = path
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|stem| names.iter().any(|n| stem.to_lowercase() == *n));
            if stem_matches {
                found.push((rank, path.to_path_buf()));
            }
        }
    }

    found.sort_by_key(|(rank, _)| *rank);
    found.into_iter().map(|(_, path)| path).collect()
}

fn extension_rank(path: &Path) -> Option<usize> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    ICON_EXTENSIONS.iter().position(|e| *e == ext)
}

/// `<dir>/<leaf>` for `$XDG_DATA_HOME` and every `$XDG_DATA_DIRS` entry.
fn xdg_data_dirs(leaf: &str) -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    if let Some(data_home) = dirs::data_dir() {
        dirs.push(data_home.join(leaf));
    }

    let data_dirs =
        env::var("XDG_DATA_DIRS").unwrap_or_else(|_| "/usr/local/share:/usr/share".to_owned());
    for dir in data_dirs.split(':').filter(|d| !d.is_empty()) {
        dirs.push(PathBuf::from(dir).join(leaf));
    }

    dirs
}

/// Configured extra dirs, then XDG icon dirs, then the system defaults.
fn icon_search_roots(extra: &[PathBuf]) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = extra.to_vec();
    roots.extend(xdg_data_dirs("icons"));
    roots.push(PathBuf::from("/usr/share/icons"));
    roots.push(PathBuf::from("/usr/share/pixmaps"));

    let mut unique = Vec::with_capacity(roots.len());
    for root in roots {
        if !unique.contains(&root) {
            unique.push(root);
        }
    }
    unique
}

struct DesktopEntry {
    icon: Option<String>,
    startup_wm_class: Option<String>,
}

fn parse_desktop_entry(content: &str) -> DesktopEntry {
    let mut in_desktop_entry = false;
    let mut icon = None;
    let mut startup_wm_class = None;

    for line in content.lines().map(str::trim) {
        if line.starts_with('[') {
            in_desktop_entry = line == "[Desktop Entry]";
            continue;
        }
        if !in_desktop_entry {
            continue;
        }

        if let Some(value) = line.strip_prefix("Icon=") {
            icon = Some(value.trim().to_owned());
        } else if let Some(value) = line.strip_prefix("StartupWMClass=") {
            startup_wm_class = Some(value.trim().to_owned());
        }
    }

    DesktopEntry {
        icon,
        startup_wm_class,
    }
}

/// `Icon=` value of the desktop entry for `app`.
///
/// Entries whose `StartupWMClass` matches win over entries matched by file
/// stem (or the last segment of a reverse-DNS stem).
fn find_desktop_icon(application_dirs: &[PathBuf], app: &str) -> Option<String> {
    let mut by_stem = None;

    for dir in application_dirs {
        let Ok(entries) = std::fs::read_dir(dir) else {
            continue;
        };
        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|e| e == "desktop"))
            .collect();
        paths.sort();

        for path in paths {
            let Ok(content) = std::fs::read_to_string(&path) else {
                continue;
            };
            let entry = parse_desktop_entry(&content);
            let Some(icon) = entry.icon else {
                continue;
            };

            if entry
                .startup_wm_class
                .is_some_and(|class| class.eq_ignore_ascii_case(app))
            {
                return Some(icon);
            }

            let stem_matches = path.file_stem().and_then(|s| s.to_str()).is_some_and(|stem| {
                stem.eq_ignore_ascii_case(app)
                    || stem
                        .rsplit('.')
                        .next()
                        .is_some_and(|last| last.eq_ignore_ascii_case(app))
            });
            if stem_matches && by_stem.is_none() {
                by_stem = Some(icon);
            }
        }
    }

    by_stem
}

/// Resolve an `Icon=` value (absolute path or theme name) to a file.
fn resolve_icon_path(icon: &str, icon_dirs: &[PathBuf]) -> Option<PathBuf> {
    let path = Path::new(icon);
    if path.is_absolute() {
        return path.is_file().then(|| path.to_path_buf());
    }
    // `Icon=foo.png` names a theme icon with its extension spelled out.
    let icon = match extension_rank(path) {
        Some(_) => path.file_stem().and_then(|s| s.to_str()).unwrap_or(icon),
        None => icon,
    };

    for base_dir in icon_dirs {
        for size in THEME_SIZES {
            for ext in ICON_EXTENSIONS {
                let candidate = base_dir
                    .join("hicolor")
                    .join(size)
                    .join("apps")
                    .join(format!("{icon}.{ext}"));
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
        for ext in ICON_EXTENSIONS {
            let candidate = base_dir.join(format!("{icon}.{ext}"));
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandOutput;
    use crate::command::testing::ScriptedRunner;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use std::fs;

    fn platform(runner: ScriptedRunner) -> LinuxPlatform {
        LinuxPlatform {
            runner: Arc::new(runner),
            timeout: Duration::from_secs(1),
            search_timeout: Duration::from_secs(5),
            extra_icon_dirs: Vec::new(),
            native_x11: false,
        }
    }

    fn write_png(path: &Path, size: u32) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbaImage::from_pixel(size, size, Rgba([200, 10, 10, 255]))
            .save(path)
            .unwrap();
    }

    fn write_jpeg(path: &Path, size: u32) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbImage::from_pixel(size, size, Rgb([1, 2, 3]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_parse_wm_class() {
        assert_eq!(
            parse_wm_class(r#"WM_CLASS(STRING) = "firefox", "Firefox""#).as_deref(),
            Some("firefox")
        );
        assert_eq!(
            parse_wm_class(r#"WM_CLASS(STRING) = "firefox.Firefox""#).as_deref(),
            Some("firefox")
        );
        assert_eq!(
            parse_wm_class(r#"WM_CLASS(STRING) = "org.gnome.Nautilus", "Org.gnome.Nautilus""#)
                .as_deref(),
            Some("org.gnome.Nautilus")
        );
        assert_eq!(parse_wm_class("WM_CLASS:  not found."), None);
        assert_eq!(parse_wm_class(r#"WM_CLASS(STRING) = "", """#), None);
    }

    #[test]
    fn test_parse_wmctrl_line() {
        assert_eq!(
            parse_wmctrl_line("0x01e00003  0 laptop Mozilla Firefox"),
            Some(WmctrlWindow {
                id: "0x01e00003",
                title: "Mozilla Firefox",
            })
        );
        assert_eq!(
            parse_wmctrl_line("0x02400004 -1 laptop   main.rs - code  "),
            Some(WmctrlWindow {
                id: "0x02400004",
                title: "main.rs - code",
            })
        );
        assert_eq!(parse_wmctrl_line("0x03000001 -1 laptop"), None);
        assert_eq!(parse_wmctrl_line(""), None);
    }

    #[tokio::test]
    async fn test_active_window_via_xdotool() {
        let runner = ScriptedRunner::new()
            .on("xdotool getactivewindow", CommandOutput::success("41943043\n"))
            .on(
                "xdotool getwindowname 41943043",
                CommandOutput::success("Mozilla Firefox\n"),
            )
            .on(
                "xdotool getwindowclassname 41943043",
                CommandOutput::success("Firefox\n"),
            );

        let window = platform(runner).active_window().await.unwrap();
        assert_eq!(window.app_name, "Firefox");
        assert_eq!(window.title, "Mozilla Firefox");
    }

    #[tokio::test]
    async fn test_active_window_without_xdotool_fails() {
        let err = platform(ScriptedRunner::new()).active_window().await.unwrap_err();
        assert!(matches!(err, PlatformError::HelperFailed { ref helper, .. } if helper == "xdotool"));
    }

    #[tokio::test]
    async fn test_active_window_title_lookup_failure_fails_whole_step() {
        let runner = ScriptedRunner::new()
            .on("xdotool getactivewindow", CommandOutput::success("7\n"))
            .on("xdotool getwindowclassname 7", CommandOutput::success("kitty\n"));

        assert!(platform(runner).active_window().await.is_err());
    }

    #[tokio::test]
    async fn test_running_applications_skips_unreadable_windows() {
        let listing = "\
0x01e00003  0 laptop Mozilla Firefox
0x02400004  0 laptop Terminal
0x01e00010  0 laptop Private Browsing
0x03000001 -1 laptop
";
        let runner = ScriptedRunner::new()
            .on("wmctrl -l", CommandOutput::success(listing))
            .on(
                "xprop -id 0x01e00003 WM_CLASS",
                CommandOutput::success("WM_CLASS(STRING) = \"firefox\", \"Firefox\"\n"),
            )
            .on(
                "xprop -id 0x01e00010 WM_CLASS",
                CommandOutput::success("WM_CLASS(STRING) = \"firefox\", \"Firefox\"\n"),
            );
        let linux = platform(runner);

        let apps = linux.running_applications().await.unwrap();
        assert_eq!(
            apps,
            vec![
                RunningApp::new("firefox", "Mozilla Firefox"),
                RunningApp::new("firefox", "Private Browsing"),
            ]
        );
    }

    #[tokio::test]
    async fn test_running_applications_without_wmctrl_fails() {
        let err = platform(ScriptedRunner::new())
            .running_applications()
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("wmctrl failed"));
    }

    #[test]
    fn test_icon_name_candidates() {
        assert_eq!(icon_name_candidates("Firefox"), vec!["firefox"]);
        assert_eq!(icon_name_candidates("Skype.EXE"), vec!["skype"]);
        assert_eq!(
            icon_name_candidates("org.gnome.Nautilus"),
            vec!["org.gnome.nautilus", "org"]
        );
    }

    #[tokio::test]
    async fn test_theme_search_finds_case_folded_stem() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("hicolor/48x48/apps/firefox.png"), 48);

        let strategy = IconThemeSearch {
            roots: vec![dir.path().to_path_buf()],
            deadline: Duration::from_secs(5),
        };
        let image = strategy.attempt("Firefox").await.unwrap();
        assert_eq!((image.width(), image.height()), (48, 48));
    }

    #[tokio::test]
    async fn test_theme_search_skips_undecodable_candidates() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("code.svg"), "<svg/>").unwrap();
        fs::write(dir.path().join("code.png"), "not a png").unwrap();
        write_jpeg(&dir.path().join("pixmaps/code.jpg"), 8);

        let strategy = IconThemeSearch {
            roots: vec![dir.path().to_path_buf()],
            deadline: Duration::from_secs(5),
        };
        let image = strategy.attempt("code").await.unwrap();
        assert_eq!((image.width(), image.height()), (8, 8));
    }

    #[test]
    fn test_theme_search_prefers_png() {
        let dir = tempfile::tempdir().unwrap();
        write_jpeg(&dir.path().join("a/slack.jpg"), 4);
        write_png(&dir.path().join("b/slack.png"), 16);

        let found = find_theme_icons(&[dir.path().to_path_buf()], &["slack".to_string()]);
        assert_eq!(
            found,
            vec![dir.path().join("b/slack.png"), dir.path().join("a/slack.jpg")]
        );
    }

    #[tokio::test]
    async fn test_theme_search_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let strategy = IconThemeSearch {
            roots: vec![dir.path().to_path_buf(), dir.path().join("missing")],
            deadline: Duration::from_secs(5),
        };
        let err = strategy.attempt("not-a-real-app-12345").await.unwrap_err();
        assert!(matches!(err, StrategyFailure::NotFound(_)));
    }

    #[test]
    fn test_parse_desktop_entry_ignores_other_groups() {
        let entry = parse_desktop_entry(
            "[Desktop Entry]\nName=Firefox\nIcon=firefox\nStartupWMClass=Navigator\n\n[Desktop Action new-window]\nIcon=other\n",
        );
        assert_eq!(entry.icon.as_deref(), Some("firefox"));
        assert_eq!(entry.startup_wm_class.as_deref(), Some("Navigator"));
    }

    #[tokio::test]
    async fn test_desktop_entry_icon_by_wm_class() {
        let dir = tempfile::tempdir().unwrap();
        let apps = dir.path().join("applications");
        let icons = dir.path().join("icons");
        fs::create_dir_all(&apps).unwrap();
        fs::write(
            apps.join("org.mozilla.firefox.desktop"),
            "[Desktop Entry]\nIcon=firefox-esr\nStartupWMClass=Navigator\n",
        )
        .unwrap();
        write_png(&icons.join("hicolor/64x64/apps/firefox-esr.png"), 64);

        let strategy = DesktopEntryIcon {
            application_dirs: vec![apps],
            icon_dirs: vec![icons],
            deadline: Duration::from_secs(5),
        };

        let by_class = strategy.attempt("navigator").await.unwrap();
        assert_eq!(by_class.width(), 64);

        // Last reverse-DNS segment of the file stem also matches.
        let by_stem = strategy.attempt("Firefox").await.unwrap();
        assert_eq!(by_stem.width(), 64);

        assert!(strategy.attempt("thunderbird").await.is_err());
    }

    #[test]
    fn test_resolve_icon_name_with_extension() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("hicolor/48x48/apps/foo.png"), 4);
        write_png(&dir.path().join("bar.png"), 4);
        let dirs = [dir.path().to_path_buf()];

        assert_eq!(
            resolve_icon_path("foo.png", &dirs),
            Some(dir.path().join("hicolor/48x48/apps/foo.png"))
        );
        assert_eq!(resolve_icon_path("bar.png", &dirs), Some(dir.path().join("bar.png")));
        assert_eq!(resolve_icon_path("bar", &dirs), Some(dir.path().join("bar.png")));
        // Dotted theme names are not mistaken for extensions.
        write_png(&dir.path().join("org.gnome.Nautilus.png"), 4);
        assert_eq!(
            resolve_icon_path("org.gnome.Nautilus", &dirs),
            Some(dir.path().join("org.gnome.Nautilus.png"))
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_theme_search_follows_symlinked_icons() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("lib/firefox/browser/default48.png");
        write_png(&target, 48);
        let link = dir.path().join("icons/hicolor/48x48/apps/firefox.png");
        fs::create_dir_all(link.parent().unwrap()).unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let strategy = IconThemeSearch {
            roots: vec![dir.path().join("icons")],
            deadline: Duration::from_secs(5),
        };
        let image = strategy.attempt("firefox").await.unwrap();
        assert_eq!((image.width(), image.height()), (48, 48));
    }

    #[cfg(unix)]
    #[test]
    fn test_theme_search_survives_symlink_loops() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("apps/slack.png"), 4);
        std::os::unix::fs::symlink(dir.path(), dir.path().join("apps/loop")).unwrap();

        let found = find_theme_icons(&[dir.path().to_path_buf()], &["slack".to_string()]);
        assert_eq!(found, vec![dir.path().join("apps/slack.png")]);
    }

    #[test]
    fn test_resolve_absolute_icon_path() {
        let dir = tempfile::tempdir().unwrap();
        let icon = dir.path().join("custom.png");
        write_png(&icon, 4);

        assert_eq!(
            resolve_icon_path(icon.to_str().unwrap(), &[]),
            Some(icon.clone())
        );
        assert_eq!(
            resolve_icon_path(dir.path().join("gone.png").to_str().unwrap(), &[]),
            None
        );
    }

    #[test]
    #[serial_test::serial]
    fn test_native_x11_requires_display() {
        let saved = env::var_os("DISPLAY");

        unsafe { env::remove_var("DISPLAY") };
        let headless = LinuxPlatform::new(Arc::new(ScriptedRunner::new()), &Config::default());
        assert!(!headless.native_x11);

        unsafe { env::set_var("DISPLAY", ":0") };
        let desktop = LinuxPlatform::new(Arc::new(ScriptedRunner::new()), &Config::default());
        assert!(desktop.native_x11);

        match saved {
            Some(display) => unsafe { env::set_var("DISPLAY", display) },
            None => unsafe { env::remove_var("DISPLAY") },
        }
    }

    #[test]
    #[serial_test::serial]
    fn test_xdg_data_dirs_honours_environment() {
        let saved = env::var_os("XDG_DATA_DIRS");

        unsafe { env::set_var("XDG_DATA_DIRS", "/opt/share::/usr/share") };
        let dirs = xdg_data_dirs("applications");
        assert!(dirs.ends_with(&[
            PathBuf::from("/opt/share/applications"),
            PathBuf::from("/usr/share/applications"),
        ]));

        unsafe { env::remove_var("XDG_DATA_DIRS") };
        let dirs = xdg_data_dirs("icons");
        assert!(dirs.ends_with(&[
            PathBuf::from("/usr/local/share/icons"),
            PathBuf::from("/usr/share/icons"),
        ]));

        if let Some(value) = saved {
            unsafe { env::set_var("XDG_DATA_DIRS", value) };
        }
    }

    #[test]
    #[serial_test::serial]
    fn test_icon_search_roots_are_unique_and_ordered() {
        let extra = PathBuf::from("/opt/icons");
        let roots = icon_search_roots(&[extra.clone(), PathBuf::from("/usr/share/icons")]);
        assert_eq!(roots[0], extra);
        assert_eq!(
            roots.iter().filter(|r| **r == PathBuf::from("/usr/share/icons")).count(),
            1
        );
        assert!(roots.contains(&PathBuf::from("/usr/share/pixmaps")));
    }
}
