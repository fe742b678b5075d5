//! The single seam between platform-agnostic logic and OS-native accessibility/input APIs (C1).
//!
//! One object-safe trait, one implementation per OS, replacing the teacher's per-capability
//! `#[cfg(target_os)]` function-pair pattern with a single injected handle (see DESIGN.md).

#[cfg(target_os = "macos")]
pub mod macos;
#[cfg(not(target_os = "macos"))]
pub mod unsupported;

use crate::error::AxError;
use crate::model::{Element, Scope, Window};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Center,
}

impl MouseButton {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "center" | "middle" => Some(Self::Center),
            _ => None,
        }
    }
}

/// Sole owner of OS-native resources: window enumeration, AX tree traversal, named AX actions,
/// attribute mutation, and synthetic mouse/keyboard/scroll events.
///
/// Never panics on missing attributes; absent attributes map to `None`/empty string.
pub trait AxProvider: Send + Sync {
    fn ensure_trusted(&self) -> Result<(), AxError>;

    fn list_windows(&self) -> Result<Vec<Window>, AxError>;

    /// Traverse the AX tree rooted at `scope`, honoring `depth` (0 = unlimited).
    fn read_elements(&self, scope: &Scope, depth: usize) -> Result<Vec<Element>, AxError>;

    /// Perform a named AX action on the element at pre-order index `id` within `scope`'s tree
    /// (the same traversal order `read_elements` uses).
    fn perform_action(&self, scope: &Scope, id: u32, action_name: &str) -> Result<(), AxError>;

    /// `attr_name` defaults to "value" at the call site; value is coerced to the element's
    /// current attribute type.
    fn set_attribute(&self, scope: &Scope, id: u32, attr_name: &str, value: &str) -> Result<(), AxError>;

    fn raise_window(&self, scope: &Scope) -> Result<(), AxError>;

    /// Idempotent per-process hint that activates deferred/lazy accessibility trees.
    fn ensure_enhanced_ui(&self, scope: &Scope) -> Result<(), AxError>;

    /// Resolve `--app <name>` to a pid, or report the frontmost application when no target
    /// is supplied.
    fn resolve_app(&self, name: Option<&str>) -> Result<i32, AxError>;

    fn mouse_move(&self, x: f64, y: f64) -> Result<(), AxError>;
    fn mouse_click(&self, x: f64, y: f64, button: MouseButton, clicks: u32) -> Result<(), AxError>;
    fn scroll(&self, x: f64, y: f64, dy: i32, dx: i32) -> Result<(), AxError>;
    fn drag(&self, from: (f64, f64), to: (f64, f64), button: MouseButton, duration_ms: u64) -> Result<(), AxError>;

    /// Type a run of text. Per-character, ASCII sets both the unicode string and the US-layout
    /// virtual key code plus shift modifier; non-ASCII falls back to key code 0, unicode only.
    fn type_text(&self, text: &str, delay_ms_per_char: u64) -> Result<(), AxError>;

    /// "mod1+mod2+key" combo string.
    fn key_combo(&self, combo: &str) -> Result<(), AxError>;
}

#[cfg(target_os = "macos")]
pub fn provider() -> Box<dyn AxProvider> {
    Box::new(macos::MacosProvider::new())
}

#[cfg(not(target_os = "macos"))]
pub fn provider() -> Box<dyn AxProvider> {
    Box::new(unsupported::UnsupportedProvider)
}
