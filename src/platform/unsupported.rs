//! Stub provider for non-macOS targets; every call reports the same provider error.

use crate::error::AxError;
use crate::model::{Element, Scope, Window};
use crate::platform::{AxProvider, MouseButton};

fn unsupported() -> AxError {
    AxError::Provider("accessibility automation is only supported on macOS".into())
}

pub struct UnsupportedProvider;

impl AxProvider for UnsupportedProvider {
    fn ensure_trusted(&self) -> Result<(), AxError> {
        Err(unsupported())
    }

    fn list_windows(&self) -> Result<Vec<Window>, AxError> {
        Err(unsupported())
    }

    fn read_elements(&self, _scope: &Scope, _depth: usize) -> Result<Vec<Element>, AxError> {
        Err(unsupported())
    }

    fn perform_action(&self, _scope: &Scope, _id: u32, _action_name: &str) -> Result<(), AxError> {
        Err(unsupported())
    }

    fn set_attribute(&self, _scope: &Scope, _id: u32, _attr_name: &str, _value: &str) -> Result<(), AxError> {
        Err(unsupported())
    }

    fn raise_window(&self, _scope: &Scope) -> Result<(), AxError> {
        Err(unsupported())
    }

    fn ensure_enhanced_ui(&self, _scope: &Scope) -> Result<(), AxError> {
        Err(unsupported())
    }

    fn resolve_app(&self, _name: Option<&str>) -> Result<i32, AxError> {
        Err(unsupported())
    }

    fn mouse_move(&self, _x: f64, _y: f64) -> Result<(), AxError> {
        Err(unsupported())
    }

    fn mouse_click(&self, _x: f64, _y: f64, _button: MouseButton, _clicks: u32) -> Result<(), AxError> {
        Err(unsupported())
    }

    fn scroll(&self, _x: f64, _y: f64, _dy: i32, _dx: i32) -> Result<(), AxError> {
        Err(unsupported())
    }

    fn drag(&self, _from: (f64, f64), _to: (f64, f64), _button: MouseButton, _duration_ms: u64) -> Result<(), AxError> {
        Err(unsupported())
    }

    fn type_text(&self, _text: &str, _delay_ms_per_char: u64) -> Result<(), AxError> {
        Err(unsupported())
    }

    fn key_combo(&self, _combo: &str) -> Result<(), AxError> {
        Err(unsupported())
    }
}
