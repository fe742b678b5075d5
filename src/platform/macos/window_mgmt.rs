use std::process::Command;

use core_foundation::base::{CFRelease, CFTypeRef};

use crate::error::AxError;
use crate::model::{Bounds, Window};
use crate::platform::macos::ax_helpers::{self, AXUIElementRef};
use crate::platform::macos::cg_helpers;

fn to_window(w: &cg_helpers::WindowInfo, focused: bool) -> Window {
    Window {
        app: w.owner_name.clone(),
        pid: w.pid,
        title: w.title.clone(),
        id: w.id,
        bounds: Bounds { x: w.x.round() as i64, y: w.y.round() as i64, w: w.width.round() as i64, h: w.height.round() as i64 },
        focused,
    }
}

/// List windows, optionally filtered by app name (case-insensitive substring).
pub fn list_windows(app_name: Option<&str>) -> Vec<Window> {
    let windows = cg_helpers::list_windows();
    windows
        .into_iter()
        .filter(|w| match app_name {
            Some(name) => w.owner_name.to_lowercase().contains(&name.to_lowercase()),
            None => true,
        })
        .map(|w| to_window(&w, w.layer == 0 && w.on_screen))
        .collect()
}

pub fn resolve_pid_for_app_name(name: &str) -> Result<i32, AxError> {
    cg_helpers::list_windows()
        .into_iter()
        .find(|w| w.owner_name.to_lowercase().contains(&name.to_lowercase()))
        .map(|w| w.pid)
        .ok_or_else(|| AxError::NotFound { query: name.to_string(), scope: "running applications".into() })
}

/// Raise an application to the front by pid.
pub fn raise_app(pid: i32) -> Result<(), AxError> {
    let app_ref = unsafe { ax_helpers::AXUIElementCreateApplication(pid) };
    if app_ref.is_null() {
        return Err(AxError::Provider(format!("failed to create AX element for pid {pid}")));
    }
    let raise_result = ax_helpers::perform_ax_action(app_ref, ax_helpers::AX_RAISE_ACTION);
    unsafe { CFRelease(app_ref as CFTypeRef) };

    let script = format!(
        r#"tell application "System Events" to set frontmost of (first process whose unix id is {pid}) to true"#
    );
    let _ = Command::new("osascript").arg("-e").arg(&script).output();

    raise_result.map_err(|code| AxError::Provider(format!("AXRaise failed with error code {code}")))
}

pub fn focus_window(window_id: u32) -> Result<(), AxError> {
    let win = cg_helpers::get_window(window_id)
        .ok_or_else(|| AxError::NotFound { query: format!("window id {window_id}"), scope: "windows".into() })?;

    let app_ref = unsafe { ax_helpers::AXUIElementCreateApplication(win.pid) };
    if app_ref.is_null() {
        return Err(AxError::Provider("failed to create AX application element".into()));
    }

    let raise_result = ax_helpers::perform_ax_action(app_ref, ax_helpers::AX_RAISE_ACTION);
    if let Some(ax_win) = find_ax_window(app_ref, &win) {
        let _ = ax_helpers::perform_ax_action(ax_win, ax_helpers::AX_RAISE_ACTION);
        unsafe { CFRelease(ax_win as CFTypeRef) };
    }

    let script = format!(
        r#"tell application "System Events" to set frontmost of (first process whose unix id is {}) to true"#,
        win.pid
    );
    let _ = Command::new("osascript").arg("-e").arg(&script).output();

    unsafe { CFRelease(app_ref as CFTypeRef) };
    raise_result.map_err(|code| AxError::Provider(format!("AXRaise failed with error code {code}")))
}

pub fn move_window(window_id: u32, x: f64, y: f64) -> Result<(), AxError> {
    with_ax_window(window_id, |ax_win| ax_helpers::set_ax_position(ax_win, x, y))
}

pub fn resize_window(window_id: u32, width: f64, height: f64) -> Result<(), AxError> {
    with_ax_window(window_id, |ax_win| ax_helpers::set_ax_size(ax_win, width, height))
}

pub fn minimize_window(window_id: u32) -> Result<(), AxError> {
    with_ax_window(window_id, |ax_win| ax_helpers::set_ax_bool(ax_win, ax_helpers::AX_MINIMIZED, true))
}

pub fn close_window(window_id: u32) -> Result<(), AxError> {
    with_ax_window(window_id, |ax_win| {
        match ax_helpers::get_ax_raw(ax_win, ax_helpers::AX_CLOSE_BUTTON) {
            Some(close_btn) => {
                let res = ax_helpers::perform_ax_action(close_btn as AXUIElementRef, ax_helpers::AX_PRESS_ACTION);
                unsafe { CFRelease(close_btn) };
                res
            }
            None => Err(-1),
        }
    })
}

fn with_ax_window(
    window_id: u32,
    op: impl FnOnce(AXUIElementRef) -> Result<(), ax_helpers::AXError>,
) -> Result<(), AxError> {
    let win = cg_helpers::get_window(window_id)
        .ok_or_else(|| AxError::NotFound { query: format!("window id {window_id}"), scope: "windows".into() })?;

    let app_ref = unsafe { ax_helpers::AXUIElementCreateApplication(win.pid) };
    if app_ref.is_null() {
        return Err(AxError::Provider("failed to create AX application element".into()));
    }

    let result = match find_ax_window(app_ref, &win) {
        Some(ax_win) => {
            let res = op(ax_win);
            unsafe { CFRelease(ax_win as CFTypeRef) };
            res
        }
        None => {
            unsafe { CFRelease(app_ref as CFTypeRef) };
            return Err(AxError::Provider(format!("could not find AX window element for window {window_id}")));
        }
    };

    unsafe { CFRelease(app_ref as CFTypeRef) };
    result.map_err(|code| AxError::Provider(format!("AX error {code} on window {window_id}")))
}

/// Match a CG WindowInfo to an AXUIElement window by comparing position and size.
/// The caller must CFRelease the returned AXUIElementRef.
fn find_ax_window(app_ref: AXUIElementRef, target: &cg_helpers::WindowInfo) -> Option<AXUIElementRef> {
    let windows_ref = ax_helpers::get_ax_raw(app_ref, ax_helpers::AX_WINDOWS)?;

    let count = unsafe { core_foundation::array::CFArrayGetCount(windows_ref as *const _) };

    let mut best_match: Option<AXUIElementRef> = None;
    let mut best_distance = f64::MAX;

    for i in 0..count {
        let ax_win = unsafe { core_foundation::array::CFArrayGetValueAtIndex(windows_ref as *const _, i) };
        if ax_win.is_null() {
            continue;
        }
        let ax_win = ax_win as AXUIElementRef;

        if let Some((ax_x, ax_y)) = ax_helpers::get_ax_position(ax_win) {
            if let Some((ax_w, ax_h)) = ax_helpers::get_ax_size(ax_win) {
                let dx = ax_x - target.x;
                let dy = ax_y - target.y;
                let dw = ax_w - target.width;
                let dh = ax_h - target.height;
                let distance = dx * dx + dy * dy + dw * dw + dh * dh;

                if distance < best_distance {
                    best_distance = distance;
                    best_match = Some(ax_win);
                }
            }
        }
    }

    if let Some(win) = best_match {
        unsafe { core_foundation::base::CFRetain(win as CFTypeRef) };
    }

    unsafe { CFRelease(windows_ref) };
    best_match
}
