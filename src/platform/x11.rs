//! Native X11 active-window lookup over the EWMH root properties.

use super::{ActiveWindow, PlatformError};
use std::time::Duration;
use tracing::trace;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{AtomEnum, ConnectionExt};
use x11rb::rust_connection::RustConnection;

const MAX_STRING_PROPERTY_LEN: u32 = 4096;

/// Look up the focused window, giving up after `deadline`.
pub(crate) async fn active_window(deadline: Duration) -> Result<ActiveWindow, PlatformError> {
    let lookup = tokio::task::spawn_blocking(query_active_window);
    match tokio::time::timeout(deadline, lookup).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(PlatformError::native("X11 lookup task", e)),
        Err(_) => Err(PlatformError::helper(
            "X11",
            format!("timed out after {deadline:?}"),
        )),
    }
}

fn query_active_window() -> Result<ActiveWindow, PlatformError> {
    let (conn, screen_num) = RustConnection::connect(None)
        .map_err(|e| PlatformError::helper("X11 display", e.to_string()))?;
    let root = conn
        .setup()
        .roots
        .get(screen_num)
        .map(|screen| screen.root)
        .ok_or_else(|| PlatformError::Native(format!("no X11 screen {screen_num}")))?;

    let net_active_window = intern_atom(&conn, b"_NET_ACTIVE_WINDOW")?;
    let net_wm_name = intern_atom(&conn, b"_NET_WM_NAME")?;
    let utf8_string = intern_atom(&conn, b"UTF8_STRING")?;

    let window = conn
        .get_property(false, root, net_active_window, AtomEnum::WINDOW, 0, 1)
        .map_err(|e| PlatformError::native("request _NET_ACTIVE_WINDOW", e))?
        .reply()
        .map_err(|e| PlatformError::native("read _NET_ACTIVE_WINDOW", e))?
        .value32()
        .and_then(|mut ids| ids.next())
        .filter(|&id| id != 0)
        .ok_or(PlatformError::NoActiveWindow)?;
    trace!("X11 active window: 0x{:x}", window);

    let title = match string_property(&conn, window, net_wm_name, utf8_string)? {
        Some(title) => title,
        None => string_property(&conn, window, AtomEnum::WM_NAME.into(), AtomEnum::STRING.into())?
            .unwrap_or_default(),
    };

    let raw_class = string_property(&conn, window, AtomEnum::WM_CLASS.into(), AtomEnum::STRING.into())?
        .ok_or_else(|| PlatformError::Native(format!("window 0x{window:x} has no WM_CLASS")))?;
    let app_name = wm_class_name(&raw_class)
        .ok_or_else(|| PlatformError::Native(format!("window 0x{window:x} has an empty WM_CLASS")))?;

    Ok(ActiveWindow { app_name, title })
}

fn intern_atom(conn: &RustConnection, name: &[u8]) -> Result<u32, PlatformError> {
    let reply = conn
        .intern_atom(false, name)
        .map_err(|e| PlatformError::native("intern atom", e))?
        .reply()
        .map_err(|e| PlatformError::native("intern atom reply", e))?;
    Ok(reply.atom)
}

fn string_property(
    conn: &RustConnection,
    window: u32,
    property: u32,
    property_type: u32,
) -> Result<Option<String>, PlatformError> {
    let reply = conn
        .get_property(false, window, property, property_type, 0, MAX_STRING_PROPERTY_LEN)
        .map_err(|e| PlatformError::native("request window property", e))?
        .reply()
        .map_err(|e| PlatformError::native("read window property", e))?;

    if reply.value_len == 0 {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&reply.value).into_owned()))
}

/// Class part of a raw `WM_CLASS` value (`instance\0Class\0`).
///
/// Falls back to the instance when only one string is present.
fn wm_class_name(raw: &str) -> Option<String> {
    let mut parts = raw.trim_end_matches('\0').splitn(2, '\0');
    let instance = parts.next().unwrap_or_default();
    let class = parts.next().filter(|c| !c.is_empty()).unwrap_or(instance);
    (!class.is_empty()).then(|| class.to_string())
}
