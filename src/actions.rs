//! Action executors: click, type, key-combo, named action, set-value, scroll, drag, hover,
//! focus (C6). Each returns an `ActionResult` carrying post-action target/focused/display state.

use std::thread;
use std::time::Duration;

use serde_json::json;

use crate::encoder::ActionResult;
use crate::error::AxError;
use crate::model::{FlatElement, Scope, flatten};
use crate::platform::{AxProvider, MouseButton};
use crate::post_action::{self, DisplayElement};

#[derive(Debug, Clone, Copy)]
pub struct PostActionOptions {
    pub capture_display: bool,
    pub max_display: usize,
    /// Settle time before the post-action re-read, for actions that trigger animated UI (§6).
    pub delay_ms: u64,
}

impl Default for PostActionOptions {
    fn default() -> Self {
        Self { capture_display: true, max_display: post_action::DEFAULT_MAX_DISPLAY, delay_ms: 0 }
    }
}

/// Attaches `target` (the pre-action element, per §4.6 "capture before performing"), then
/// re-reads the tree to attach `focused`/`display`. Best-effort: a failed re-read degrades to
/// an unadorned success, it never turns success into failure.
fn attach_post_state(
    provider: &dyn AxProvider,
    scope: &Scope,
    target: Option<&FlatElement>,
    action_point: Option<(f64, f64)>,
    opts: &PostActionOptions,
    result: &mut ActionResult,
) {
    result.target = target.cloned();

    if opts.delay_ms > 0 {
        thread::sleep(Duration::from_millis(opts.delay_ms));
    }
    let Ok(tree) = provider.read_elements(scope, 0) else { return };
    let flat = flatten(&tree);

    // Prefer the deepest focused element (longest ancestor path) when several report focus.
    result.focused = flat
        .iter()
        .filter(|e| e.focused)
        .max_by_key(|e| e.path.len())
        .cloned();

    if opts.capture_display {
        let center = action_point
            .or_else(|| target.map(|t| t.bounds.center()))
            .unwrap_or((0.0, 0.0));
        let display: Vec<DisplayElement> = post_action::collect_display(&tree, center, opts.max_display);
        if !display.is_empty() {
            result.display = Some(display);
        }
    }
}

pub fn click(
    provider: &dyn AxProvider,
    scope: &Scope,
    target: &FlatElement,
    button: MouseButton,
    clicks: u32,
    opts: &PostActionOptions,
) -> ActionResult {
    let (x, y) = target.bounds.center();
    match provider.mouse_click(x, y, button, clicks) {
        Ok(()) => {
            let mut result = ActionResult::ok("click").with_extra("point", json!([x, y]));
            attach_post_state(provider, scope, Some(target), Some((x, y)), opts, &mut result);
            result
        }
        Err(e) => ActionResult::from_error("click", &e),
    }
}

pub fn hover(provider: &dyn AxProvider, x: f64, y: f64) -> ActionResult {
    match provider.mouse_move(x, y) {
        Ok(()) => ActionResult::ok("hover").with_extra("point", json!([x, y])),
        Err(e) => ActionResult::from_error("hover", &e),
    }
}

pub fn scroll(
    provider: &dyn AxProvider,
    x: f64,
    y: f64,
    dy: i32,
    dx: i32,
) -> ActionResult {
    match provider.scroll(x, y, dy, dx) {
        Ok(()) => ActionResult::ok("scroll")
            .with_extra("point", json!([x, y]))
            .with_extra("direction", json!({ "dx": dx, "dy": dy })),
        Err(e) => ActionResult::from_error("scroll", &e),
    }
}

pub fn drag(
    provider: &dyn AxProvider,
    from: (f64, f64),
    to: (f64, f64),
    button: MouseButton,
    duration_ms: u64,
) -> ActionResult {
    match provider.drag(from, to, button, duration_ms) {
        Ok(()) => ActionResult::ok("drag")
            .with_extra("from", json!([from.0, from.1]))
            .with_extra("to", json!([to.0, to.1])),
        Err(e) => ActionResult::from_error("drag", &e),
    }
}

pub fn key_combo(provider: &dyn AxProvider, combo: &str) -> ActionResult {
    match provider.key_combo(combo) {
        Ok(()) => ActionResult::ok("key-combo").with_extra("combo", json!(combo)),
        Err(e) => ActionResult::from_error("key-combo", &e),
    }
}

pub fn set_value(
    provider: &dyn AxProvider,
    scope: &Scope,
    target: &FlatElement,
    value: &str,
    opts: &PostActionOptions,
) -> ActionResult {
    match provider.set_attribute(scope, target.id, "value", value) {
        Ok(()) => {
            let mut result = ActionResult::ok("set-value").with_extra("value", json!(value));
            attach_post_state(provider, scope, Some(target), None, opts, &mut result);
            result
        }
        Err(e) => ActionResult::from_error("set-value", &e),
    }
}

pub fn focus_element(
    provider: &dyn AxProvider,
    scope: &Scope,
    target: &FlatElement,
    opts: &PostActionOptions,
) -> ActionResult {
    match provider.set_attribute(scope, target.id, "focused", "true") {
        Ok(()) => {
            let mut result = ActionResult::ok("focus");
            attach_post_state(provider, scope, Some(target), None, opts, &mut result);
            result
        }
        Err(e) => ActionResult::from_error("focus", &e),
    }
}

/// Named AX action dispatch (e.g. `action --name press`, `action --name showMenu`).
pub fn perform_named_action(
    provider: &dyn AxProvider,
    scope: &Scope,
    target: &FlatElement,
    action_name: &str,
    opts: &PostActionOptions,
) -> ActionResult {
    match provider.perform_action(scope, target.id, action_name) {
        Ok(()) => {
            let mut result = ActionResult::ok("action").with_extra("name", json!(action_name));
            attach_post_state(provider, scope, Some(target), None, opts, &mut result);
            result
        }
        Err(e) => ActionResult::from_error("action", &e),
    }
}

// ── Typing ──────────────────────────────────────────────────────────────

pub fn is_calculator_app(app_name: &str) -> bool {
    app_name.to_lowercase().contains("calculator")
}

/// Maps a character a Calculator-class app exposes as a titled button rather than a keyboard
/// shortcut. Digits map to themselves; arithmetic symbols map to their spelled-out AX titles.
pub fn calculator_button_title(ch: char) -> Option<String> {
    match ch {
        '0'..='9' => Some(ch.to_string()),
        '+' => Some("Add".to_string()),
        '-' => Some("Subtract".to_string()),
        '*' | '×' => Some("Multiply".to_string()),
        '/' | '÷' => Some("Divide".to_string()),
        '=' => Some("Equals".to_string()),
        '.' => Some("Point".to_string()),
        '%' => Some("Percent".to_string()),
        _ => None,
    }
}

fn type_via_calculator_buttons(provider: &dyn AxProvider, scope: &Scope, text: &str) -> Result<(), AxError> {
    let tree = provider.read_elements(scope, 0)?;
    let flat = flatten(&tree);
    for ch in text.chars() {
        let Some(title) = calculator_button_title(ch) else { continue };
        let button = flat
            .iter()
            .find(|e| e.title.as_deref() == Some(title.as_str()))
            .ok_or_else(|| AxError::NotFound { query: format!("calculator button \"{title}\""), scope: "calculator".into() })?;
        provider.perform_action(scope, button.id, "press")?;
    }
    Ok(())
}

/// Types `text` into `target` (if given, focused first) or the frontmost responder. Calculator-
/// class apps route digits/operators through their titled buttons instead of keystrokes, since
/// they often ignore synthetic key events on their display field.
pub fn type_text(
    provider: &dyn AxProvider,
    scope: &Scope,
    target: Option<&FlatElement>,
    app_name: Option<&str>,
    text: &str,
    delay_ms_per_char: u64,
    opts: &PostActionOptions,
) -> ActionResult {
    if let Some(t) = target {
        if let Err(e) = provider.set_attribute(scope, t.id, "focused", "true") {
            return ActionResult::from_error("type", &e);
        }
    }

    let calculator = app_name.is_some_and(is_calculator_app);
    let outcome = if calculator {
        type_via_calculator_buttons(provider, scope, text)
    } else {
        provider.type_text(text, delay_ms_per_char)
    };

    match outcome {
        Ok(()) => {
            let mut result = ActionResult::ok("type").with_extra("text", json!(text));
            attach_post_state(provider, scope, target, None, opts, &mut result);
            result
        }
        Err(e) => ActionResult::from_error("type", &e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calculator_button_title_maps_operators() {
        assert_eq!(calculator_button_title('+').as_deref(), Some("Add"));
        assert_eq!(calculator_button_title('5').as_deref(), Some("5"));
        assert_eq!(calculator_button_title('=').as_deref(), Some("Equals"));
        assert_eq!(calculator_button_title('a'), None);
    }

    #[test]
    fn is_calculator_app_matches_substring_case_insensitive() {
        assert!(is_calculator_app("Calculator"));
        assert!(is_calculator_app("com.apple.calculator"));
        assert!(!is_calculator_app("Calendar"));
    }
}
