//! macOS backend driven through `osascript` and System Events.
//!
//! Icons are read from the application bundle: the bundle path comes from
//! AppleScript, the icon file name from `Info.plist`, and `sips` converts
//! the `.icns` resource into a scratch PNG that is removed afterwards.

use super::{ActiveWindow, Platform, PlatformError, PlatformKind, RunningApp};
use crate::command::CommandRunner;
use crate::config::Config;
use crate::icon::{self, IconStrategy, StrategyFailure};
use async_trait::async_trait;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

const FRONTMOST_SCRIPT: &str = r#"
tell application "System Events"
    set frontApp to name of first application process whose frontmost is true
    set frontAppPath to path of first application process whose frontmost is true
    set windowTitle to ""
    tell process frontApp
        if exists (1st window whose value of attribute "AXMain" is true) then
            set windowTitle to name of 1st window whose value of attribute "AXMain" is true
        end if
    end tell
    return frontApp & ":" & windowTitle & ":" & frontAppPath
end tell
"#;

const RUNNING_APPS_SCRIPT: &str = r#"
tell application "System Events"
    set appList to ""
    repeat with theProcess in application processes
        set appList to appList & (name of theProcess) & ":" & (path of theProcess) & ";"
    end repeat
    return appList
end tell
"#;

pub struct MacPlatform {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
    max_icon_size: u32,
}

impl MacPlatform {
    pub fn new(runner: Arc<dyn CommandRunner>, config: &Config) -> Self {
        Self {
            runner,
            timeout: config.command_timeout(),
            max_icon_size: config.max_icon_size,
        }
    }

    async fn osascript(&self, script: &str) -> Result<String, PlatformError> {
        let output = self.runner.run("osascript", &["-e", script], self.timeout).await;
        if !output.succeeded() {
            return Err(PlatformError::helper("osascript", output.failure_reason()));
        }
        Ok(output.stdout.trim().to_string())
    }
}

#[async_trait]
impl Platform for MacPlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::MacOs
    }

    async fn active_window(&self) -> Result<ActiveWindow, PlatformError> {
        let output = self.osascript(FRONTMOST_SCRIPT).await?;
        parse_frontmost(&output)
    }

    async fn running_applications(&self) -> Result<Vec<RunningApp>, PlatformError> {
        let output = self.osascript(RUNNING_APPS_SCRIPT).await?;
        Ok(parse_application_list(&output))
    }

    fn icon_strategies(&self) -> Vec<Box<dyn IconStrategy>> {
        vec![Box::new(AppBundleIcon {
            runner: Arc::clone(&self.runner),
            timeout: self.timeout,
            max_icon_size: self.max_icon_size,
        })]
    }
}

/// Parse `name:title:path`. The path is HFS-style and may itself contain
/// colons, so everything after the second colon belongs to it.
fn parse_frontmost(output: &str) -> Result<ActiveWindow, PlatformError> {
    let mut parts = output.splitn(3, ':');
    let (Some(app_name), Some(title), Some(_path)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(PlatformError::UnexpectedOutput {
            helper: "osascript".to_string(),
            output: output.to_string(),
        });
    };

    if app_name.is_empty() {
        return Err(PlatformError::NoActiveWindow);
    }
    Ok(ActiveWindow {
        app_name: app_name.to_string(),
        title: title.to_string(),
    })
}

/// Parse `name:path;name:path;...`. Each entry is titled with its name.
fn parse_application_list(output: &str) -> Vec<RunningApp> {
    output
        .split(';')
        .filter_map(|entry| {
            let (name, _path) = entry.split_once(':')?;
            let name = name.trim();
            if name.is_empty() {
                trace!("Ignoring application entry: {:?}", entry);
                return None;
            }
            Some(RunningApp::new(name, name))
        })
        .collect()
}

/// Quote `value` as an AppleScript string literal.
fn applescript_string(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// `<bundle>/Contents/Resources/<icon file>`, adding `.icns` when the plist
/// value omits it.
fn icns_path(bundle: &Path, icon_file: &str) -> PathBuf {
    let resources = bundle.join("Contents").join("Resources");
    if Path::new(icon_file).extension().is_some() {
        resources.join(icon_file)
    } else {
        resources.join(format!("{icon_file}.icns"))
    }
}

/// Icon resource of the installed application bundle.
struct AppBundleIcon {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
    max_icon_size: u32,
}

impl AppBundleIcon {
    async fn step(&self, program: &str, args: &[&str]) -> Result<String, StrategyFailure> {
        let output = self.runner.run(program, args, self.timeout).await;
        if !output.succeeded() {
            return Err(StrategyFailure::Helper(format!(
                "{program} {}",
                output.failure_reason()
            )));
        }
        Ok(output.stdout.trim().to_string())
    }

    async fn bundle_path(&self, app: &str) -> Result<PathBuf, StrategyFailure> {
        let script = format!(
            "POSIX path of (path to application {})",
            applescript_string(app)
        );
        let path = self.step("osascript", &["-e", &script]).await?;
        if path.is_empty() {
            return Err(StrategyFailure::NotFound(format!("no bundle for {app}")));
        }
        Ok(PathBuf::from(path.trim_end_matches('/')))
    }
}

#[async_trait]
impl IconStrategy for AppBundleIcon {
    fn name(&self) -> &'static str {
        "app-bundle"
    }

    async fn attempt(&self, app: &str) -> Result<DynamicImage, StrategyFailure> {
        let bundle = self.bundle_path(app).await?;

        let info = bundle.join("Contents").join("Info");
        let icon_file = self
            .step(
                "defaults",
                &["read", &info.to_string_lossy(), "CFBundleIconFile"],
            )
            .await?;
        if icon_file.is_empty() {
            return Err(StrategyFailure::NotFound(format!(
                "{} declares no icon",
                bundle.display()
            )));
        }
        let icns = icns_path(&bundle, &icon_file);
        debug!("Converting {} for '{}'", icns.display(), app);

        // Removed when dropped, whichever way this function returns.
        let scratch = tempfile::Builder::new()
            .prefix("activity-probe-icon-")
            .suffix(".png")
            .tempfile()?;
        let max_size = self.max_icon_size.to_string();
        self.step(
            "sips",
            &[
                "-s",
                "format",
                "png",
                "-Z",
                &max_size,
                &icns.to_string_lossy(),
                "--out",
                &scratch.path().to_string_lossy(),
            ],
        )
        .await?;

        icon::load_icon_file(scratch.path())
    }
}
