pub mod accessibility;
pub mod ax_helpers;
pub mod cg_helpers;
pub mod input_sim;
pub mod window_mgmt;

use core_foundation::base::{CFRelease, CFTypeRef};
use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::Mutex;

use crate::error::AxError;
use crate::model::{Element, Scope, Window};
use crate::platform::{AxProvider, MouseButton};
use ax_helpers::AXUIElementRef;

/// Injected handle owning OS-native resources. `enhanced_ui_pids` tracks which processes
/// already received the `AXEnhancedUserInterface` hint, so `ensure_enhanced_ui` stays
/// idempotent without a global singleton.
pub struct MacosProvider {
    enhanced_ui_pids: Mutex<RefCell<HashSet<i32>>>,
}

impl MacosProvider {
    pub fn new() -> Self {
        Self { enhanced_ui_pids: Mutex::new(RefCell::new(HashSet::new())) }
    }

    fn resolve_scope_pid(&self, scope: &Scope) -> Result<i32, AxError> {
        match scope {
            Scope::Pid(pid) => Ok(*pid),
            Scope::App(name) => window_mgmt::resolve_pid_for_app_name(name),
            Scope::WindowId(id) => cg_helpers::get_window(*id)
                .map(|w| w.pid)
                .ok_or_else(|| AxError::NotFound { query: format!("window id {id}"), scope: "windows".into() }),
        }
    }
}

impl Default for MacosProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AxProvider for MacosProvider {
    fn ensure_trusted(&self) -> Result<(), AxError> {
        ax_helpers::ensure_trusted().map_err(AxError::Permission)
    }

    fn list_windows(&self) -> Result<Vec<Window>, AxError> {
        Ok(window_mgmt::list_windows(None))
    }

    fn read_elements(&self, scope: &Scope, depth: usize) -> Result<Vec<Element>, AxError> {
        self.ensure_trusted()?;
        let pid = self.resolve_scope_pid(scope)?;
        let app = unsafe { ax_helpers::AXUIElementCreateApplication(pid) };
        if app.is_null() {
            return Err(AxError::Provider(format!("failed to create AX element for pid {pid}")));
        }
        let tree = accessibility::read_tree(app, depth);
        unsafe { CFRelease(app as CFTypeRef) };
        Ok(tree)
    }

    fn perform_action(&self, scope: &Scope, id: u32, action_name: &str) -> Result<(), AxError> {
        self.ensure_trusted()?;
        let pid = self.resolve_scope_pid(scope)?;
        let app = unsafe { ax_helpers::AXUIElementCreateApplication(pid) };
        if app.is_null() {
            return Err(AxError::Provider(format!("failed to create AX element for pid {pid}")));
        }
        let result = accessibility::perform_action(app, id, action_name);
        unsafe { CFRelease(app as CFTypeRef) };
        result
    }

    fn set_attribute(&self, scope: &Scope, id: u32, attr_name: &str, value: &str) -> Result<(), AxError> {
        self.ensure_trusted()?;
        let pid = self.resolve_scope_pid(scope)?;
        let app: AXUIElementRef = unsafe { ax_helpers::AXUIElementCreateApplication(pid) };
        if app.is_null() {
            return Err(AxError::Provider(format!("failed to create AX element for pid {pid}")));
        }
        let result = accessibility::set_attribute(app, id, attr_name, value);
        unsafe { CFRelease(app as CFTypeRef) };
        result
    }

    fn raise_window(&self, scope: &Scope) -> Result<(), AxError> {
        self.ensure_trusted()?;
        match scope {
            Scope::WindowId(id) => window_mgmt::focus_window(*id),
            _ => window_mgmt::raise_app(self.resolve_scope_pid(scope)?),
        }
    }

    fn ensure_enhanced_ui(&self, scope: &Scope) -> Result<(), AxError> {
        self.ensure_trusted()?;
        let pid = self.resolve_scope_pid(scope)?;
        let guard = self.enhanced_ui_pids.lock().unwrap();
        if guard.borrow().contains(&pid) {
            return Ok(());
        }
        let app = unsafe { ax_helpers::AXUIElementCreateApplication(pid) };
        if app.is_null() {
            return Err(AxError::Provider(format!("failed to create AX element for pid {pid}")));
        }
        let result = ax_helpers::set_ax_bool(app, "AXEnhancedUserInterface", true);
        unsafe { CFRelease(app as CFTypeRef) };
        guard.borrow_mut().insert(pid);
        result.map_err(|code| AxError::Provider(format!("AXEnhancedUserInterface failed with error {code}")))
    }

    fn resolve_app(&self, name: Option<&str>) -> Result<i32, AxError> {
        match name {
            Some(n) => window_mgmt::resolve_pid_for_app_name(n),
            None => cg_helpers::list_windows()
                .into_iter()
                .find(|w| w.layer == 0 && w.on_screen)
                .map(|w| w.pid)
                .ok_or_else(|| AxError::NotFound { query: "frontmost application".into(), scope: "running applications".into() }),
        }
    }

    fn mouse_move(&self, x: f64, y: f64) -> Result<(), AxError> {
        self.ensure_trusted()?;
        input_sim::mouse_move(x, y)
    }

    fn mouse_click(&self, x: f64, y: f64, button: MouseButton, clicks: u32) -> Result<(), AxError> {
        self.ensure_trusted()?;
        input_sim::mouse_click(x, y, button, clicks)
    }

    fn scroll(&self, x: f64, y: f64, dy: i32, dx: i32) -> Result<(), AxError> {
        self.ensure_trusted()?;
        input_sim::scroll(x, y, dy, dx)
    }

    fn drag(&self, from: (f64, f64), to: (f64, f64), button: MouseButton, duration_ms: u64) -> Result<(), AxError> {
        self.ensure_trusted()?;
        input_sim::drag(from, to, button, duration_ms)
    }

    fn type_text(&self, text: &str, delay_ms_per_char: u64) -> Result<(), AxError> {
        self.ensure_trusted()?;
        input_sim::type_text(text, delay_ms_per_char)
    }

    fn key_combo(&self, combo: &str) -> Result<(), AxError> {
        self.ensure_trusted()?;
        input_sim::key_combo(combo)
    }
}
