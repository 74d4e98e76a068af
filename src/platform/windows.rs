//! Windows backend over the Win32 API.

use super::{ActiveWindow, Platform, PlatformError, PlatformKind, RunningApp};
use crate::config::Config;
use crate::icon::{self, IconStrategy, StrategyFailure};
use async_trait::async_trait;
use image::{DynamicImage, RgbaImage};
use std::ffi::OsString;
use std::os::windows::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};
use std::time::Duration;
use sysinfo::{ProcessesToUpdate, System};
use tracing::{debug, trace};
use windows_sys::Win32::{
    Foundation::{CloseHandle, HANDLE, HWND},
    Graphics::Gdi::{
        BI_RGB, BITMAPINFO, BITMAPINFOHEADER, CreateCompatibleDC, DIB_RGB_COLORS, DeleteDC,
        DeleteObject, GetDIBits, HBITMAP, HDC, HGDIOBJ, SelectObject,
    },
    System::Threading::{
        OpenProcess, PROCESS_NAME_WIN32, PROCESS_QUERY_LIMITED_INFORMATION,
        QueryFullProcessImageNameW,
    },
    UI::{
        Shell::{ExtractIconExW, SHFILEINFOW, SHGFI_ICON, SHGFI_LARGEICON, SHGetFileInfoW},
        WindowsAndMessaging::{
            DestroyIcon, GetForegroundWindow, GetIconInfo, GetWindowTextW,
            GetWindowThreadProcessId, HICON, ICONINFO, IsWindow,
        },
    },
};

/// Reported when the focused window's process cannot be inspected.
const UNKNOWN_PROCESS: &str = "Unknown";

pub struct WindowsPlatform {
    timeout: Duration,
    search_timeout: Duration,
}

impl WindowsPlatform {
    pub fn new(config: &Config) -> Self {
        Self {
            timeout: config.command_timeout(),
            search_timeout: config.icon_search_timeout(),
        }
    }
}

#[async_trait]
impl Platform for WindowsPlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Windows
    }

    async fn active_window(&self) -> Result<ActiveWindow, PlatformError> {
        let lookup = tokio::task::spawn_blocking(foreground_window_info);
        match tokio::time::timeout(self.timeout, lookup).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(PlatformError::native("foreground window task", e)),
            Err(_) => Err(PlatformError::helper(
                "foreground window lookup",
                format!("timed out after {:?}", self.timeout),
            )),
        }
    }

    async fn running_applications(&self) -> Result<Vec<RunningApp>, PlatformError> {
        let listing = tokio::task::spawn_blocking(process_names);
        let names = match tokio::time::timeout(self.timeout, listing).await {
            Ok(Ok(names)) => names,
            Ok(Err(e)) => return Err(PlatformError::native("process listing task", e)),
            Err(_) => {
                return Err(PlatformError::helper(
                    "process listing",
                    format!("timed out after {:?}", self.timeout),
                ));
            }
        };

        if names.is_empty() {
            return Err(PlatformError::helper(
                "process listing",
                "no processes visible",
            ));
        }
        Ok(names
            .into_iter()
            .map(|name| RunningApp::new(name.clone(), name))
            .collect())
    }

    fn icon_strategies(&self) -> Vec<Box<dyn IconStrategy>> {
        vec![
            Box::new(InstallDirIcon {
                program_dirs: program_dirs(),
                deadline: self.search_timeout,
            }),
            Box::new(ShellIcon {
                deadline: self.search_timeout,
            }),
        ]
    }
}

fn foreground_window_info() -> Result<ActiveWindow, PlatformError> {
    let hwnd = foreground_window().ok_or(PlatformError::NoActiveWindow)?;
    let title = window_title(hwnd);

    let app_name = match window_process_id(hwnd).and_then(process_name) {
        Some(name) => name,
        None => {
            debug!("Foreground process could not be inspected");
            UNKNOWN_PROCESS.to_string()
        }
    };

    Ok(ActiveWindow { app_name, title })
}

fn foreground_window() -> Option<HWND> {
    let hwnd = unsafe { GetForegroundWindow() };
    if hwnd.is_null() || unsafe { IsWindow(hwnd) } == 0 {
        None
    } else {
        Some(hwnd)
    }
}

fn window_title(hwnd: HWND) -> String {
    let mut buffer = [0u16; 512];
    let len = unsafe { GetWindowTextW(hwnd, buffer.as_mut_ptr(), buffer.len() as i32) };
    let Ok(len) = usize::try_from(len) else {
        return String::new();
    };
    OsString::from_wide(&buffer[..len])
        .to_string_lossy()
        .into_owned()
}

fn window_process_id(hwnd: HWND) -> Option<u32> {
    let mut process_id = 0u32;
    unsafe {
        GetWindowThreadProcessId(hwnd, &mut process_id);
    }
    (process_id != 0).then_some(process_id)
}

struct HandleGuard(HANDLE);

impl Drop for HandleGuard {
    fn drop(&mut self) {
        unsafe { CloseHandle(self.0) };
    }
}

/// Executable base name (e.g. `firefox.exe`) of a process.
///
/// Limited query rights are enough here, so elevated processes still resolve.
fn process_name(process_id: u32) -> Option<String> {
    let handle = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, process_id) };
    if handle.is_null() {
        return None;
    }
    let _guard = HandleGuard(handle);

    let mut buffer = vec![0u16; 32768];
    let mut len = buffer.len() as u32;
    let ok = unsafe {
        QueryFullProcessImageNameW(handle, PROCESS_NAME_WIN32, buffer.as_mut_ptr(), &mut len)
    };
    if ok == 0 || len == 0 {
        return None;
    }

    let image_path = OsString::from_wide(&buffer[..len as usize]);
    executable_name(Path::new(&image_path))
}

/// File name of an executable image path.
fn executable_name(image_path: &Path) -> Option<String> {
    image_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
}

/// Names of all visible processes, ordered by pid.
fn process_names() -> Vec<String> {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);

    let mut processes: Vec<_> = system.processes().iter().collect();
    processes.sort_by_key(|(pid, _)| **pid);

    processes
        .into_iter()
        .filter_map(|(pid, process)| {
            let name = process.name().to_string_lossy().into_owned();
            if name.is_empty() {
                trace!("Skipping process {} without a name", pid);
                return None;
            }
            Some(name)
        })
        .collect()
}

/// `%ProgramFiles%` and `%ProgramFiles(x86)%`, with their usual defaults.
fn program_dirs() -> Vec<PathBuf> {
    [
        ("ProgramFiles", r"C:\Program Files"),
        ("ProgramFiles(x86)", r"C:\Program Files (x86)"),
    ]
    .into_iter()
    .map(|(var, default)| std::env::var_os(var).map_or_else(|| PathBuf::from(default), PathBuf::from))
    .collect()
}

/// `<root>\<name>` and `<root>\<stem>\<name>` for every program root.
fn install_candidates(program_dirs: &[PathBuf], app: &str) -> Vec<PathBuf> {
    let stem = Path::new(app)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(app);

    program_dirs
        .iter()
        .flat_map(|root| [root.join(app), root.join(stem).join(app)])
        .collect()
}

fn wide_null(path: &Path) -> Vec<u16> {
    path.as_os_str().encode_wide().chain(Some(0)).collect()
}

/// First icon resource of an executable under the program directories.
struct InstallDirIcon {
    program_dirs: Vec<PathBuf>,
    deadline: Duration,
}

#[async_trait]
impl IconStrategy for InstallDirIcon {
    fn name(&self) -> &'static str {
        "install-dir"
    }

    async fn attempt(&self, app: &str) -> Result<DynamicImage, StrategyFailure> {
        let candidates = install_candidates(&self.program_dirs, app);
        let app = app.to_string();

        icon::run_blocking(self.deadline, move || {
            let executable = candidates
                .into_iter()
                .find(|path| path.is_file())
                .ok_or_else(|| StrategyFailure::NotFound(format!("{app} is not installed")))?;
            trace!("Extracting icon from {}", executable.display());
            extract_executable_icon(&executable).map(DynamicImage::ImageRgba8)
        })
        .await
    }
}

/// Shell-assigned icon of the identifier resolved through `PATH`.
struct ShellIcon {
    deadline: Duration,
}

#[async_trait]
impl IconStrategy for ShellIcon {
    fn name(&self) -> &'static str {
        "shell"
    }

    async fn attempt(&self, app: &str) -> Result<DynamicImage, StrategyFailure> {
        let app = app.to_string();

        icon::run_blocking(self.deadline, move || {
            let path = which::which(&app)
                .map_err(|e| StrategyFailure::NotFound(format!("{app}: {e}")))?;
            shell_file_icon(&path).map(DynamicImage::ImageRgba8)
        })
        .await
    }
}

fn extract_executable_icon(executable: &Path) -> Result<RgbaImage, StrategyFailure> {
    let path = wide_null(executable);
    let mut hicon_large: HICON = std::ptr::null_mut();
    let count = unsafe {
        ExtractIconExW(path.as_ptr(), 0, &mut hicon_large, std::ptr::null_mut(), 1)
    };

    if count == 0 || hicon_large.is_null() {
        return Err(StrategyFailure::NotFound(format!(
            "{} has no icon resource",
            executable.display()
        )));
    }

    let result = icon_handle_to_image(hicon_large);
    unsafe { DestroyIcon(hicon_large) };
    result
}

fn shell_file_icon(path: &Path) -> Result<RgbaImage, StrategyFailure> {
    let wide = wide_null(path);
    let mut info: SHFILEINFOW = unsafe { std::mem::zeroed() };
    let ok = unsafe {
        SHGetFileInfoW(
            wide.as_ptr(),
            0,
            &mut info,
            std::mem::size_of::<SHFILEINFOW>() as u32,
            SHGFI_ICON | SHGFI_LARGEICON,
        )
    };

    if ok == 0 || info.hIcon.is_null() {
        return Err(StrategyFailure::Native(format!(
            "no shell icon for {}",
            path.display()
        )));
    }

    let result = icon_handle_to_image(info.hIcon);
    unsafe { DestroyIcon(info.hIcon) };
    result
}

struct DcGuard(HDC);

impl Drop for DcGuard {
    fn drop(&mut self) {
        if !self.0.is_null() {
            unsafe { DeleteDC(self.0) };
        }
    }
}

struct IconBitmapGuard {
    hdc: HDC,
    old_bitmap: HGDIOBJ,
    hbm_color: HBITMAP,
    hbm_mask: HBITMAP,
}

impl Drop for IconBitmapGuard {
    fn drop(&mut self) {
        unsafe {
            if !self.hdc.is_null() {
                SelectObject(self.hdc, self.old_bitmap);
            }
            if !self.hbm_color.is_null() {
                DeleteObject(self.hbm_color);
            }
            if !self.hbm_mask.is_null() {
                DeleteObject(self.hbm_mask);
            }
        }
    }
}

/// Copy an icon's color bitmap into an RGBA image.
fn icon_handle_to_image(hicon: HICON) -> Result<RgbaImage, StrategyFailure> {
    let mut icon_info: ICONINFO = unsafe { std::mem::zeroed() };
    if unsafe { GetIconInfo(hicon, &mut icon_info) } == 0 {
        return Err(StrategyFailure::Native("failed to get icon info".into()));
    }

    let bitmap = if icon_info.hbmColor.is_null() {
        icon_info.hbmMask
    } else {
        icon_info.hbmColor
    };

    let hdc = unsafe { CreateCompatibleDC(std::ptr::null_mut()) };
    let _dc_guard = DcGuard(hdc);
    if hdc.is_null() {
        unsafe {
            if !icon_info.hbmColor.is_null() {
                DeleteObject(icon_info.hbmColor);
            }
            if !icon_info.hbmMask.is_null() {
                DeleteObject(icon_info.hbmMask);
            }
        }
        return Err(StrategyFailure::Native("failed to create DC".into()));
    }

    let old_bitmap = unsafe { SelectObject(hdc, bitmap) };
    let _bmp_guard = IconBitmapGuard {
        hdc,
        old_bitmap,
        hbm_color: icon_info.hbmColor,
        hbm_mask: icon_info.hbmMask,
    };

    let mut bmi: BITMAPINFO = unsafe { std::mem::zeroed() };
    bmi.bmiHeader.biSize = std::mem::size_of::<BITMAPINFOHEADER>() as u32;

    if unsafe {
        GetDIBits(
            hdc,
            bitmap,
            0,
            0,
            std::ptr::null_mut(),
            &mut bmi,
            DIB_RGB_COLORS,
        )
    } == 0
    {
        return Err(StrategyFailure::Native("failed to get bitmap info".into()));
    }

    let width = bmi.bmiHeader.biWidth.unsigned_abs();
    let height = bmi.bmiHeader.biHeight.unsigned_abs();
    if width == 0 || height == 0 {
        return Err(StrategyFailure::Native("invalid icon dimensions".into()));
    }

    bmi.bmiHeader.biBitCount = 32;
    bmi.bmiHeader.biCompression = BI_RGB;
    bmi.bmiHeader.biHeight = -(height as i32);

    let mut pixels: Vec<u8> = vec![0; (width * height) as usize * 4];
    if unsafe {
        GetDIBits(
            hdc,
            bitmap,
            0,
            height,
            pixels.as_mut_ptr().cast(),
            &mut bmi,
            DIB_RGB_COLORS,
        )
    } == 0
    {
        return Err(StrategyFailure::Native("failed to get bitmap bits".into()));
    }

    // BGRA -> RGBA
    for pixel in pixels.chunks_exact_mut(4) {
        pixel.swap(0, 2);
    }

    RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| StrategyFailure::Native("icon bitmap size mismatch".into()))
}
