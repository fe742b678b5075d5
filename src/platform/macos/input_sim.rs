//! Synthetic mouse/keyboard/scroll event generation backing C6's click/type/key-combo/scroll/
//! drag, adapted from the teacher's CGEvent-based input simulation.

use std::thread;
use std::time::Duration;

use core_graphics::event::{CGEvent, CGEventFlags, CGEventTapLocation, CGEventType, CGKeyCode, CGMouseButton, EventField};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
use core_graphics::geometry::CGPoint;

use crate::error::AxError;
use crate::platform::MouseButton;

fn source() -> Result<CGEventSource, AxError> {
    CGEventSource::new(CGEventSourceStateID::HIDSystemState)
        .map_err(|_| AxError::Provider("failed to create CGEventSource".into()))
}

fn to_cg_button(button: MouseButton) -> CGMouseButton {
    match button {
        MouseButton::Left => CGMouseButton::Left,
        MouseButton::Right => CGMouseButton::Right,
        MouseButton::Center => CGMouseButton::Center,
    }
}

// ── Keycode lookup ──────────────────────────────────────────────────────────

/// Map an ASCII character to its US-layout virtual keycode and whether it needs shift.
fn keycode_for_char(ch: char) -> Option<(CGKeyCode, bool)> {
    let lower = ch.to_ascii_lowercase();
    let base: CGKeyCode = match lower {
        'a' => 0x00, 'b' => 0x0B, 'c' => 0x08, 'd' => 0x02, 'e' => 0x0E, 'f' => 0x03, 'g' => 0x05,
        'h' => 0x04, 'i' => 0x22, 'j' => 0x26, 'k' => 0x28, 'l' => 0x25, 'm' => 0x2E, 'n' => 0x2D,
        'o' => 0x1F, 'p' => 0x23, 'q' => 0x0C, 'r' => 0x0F, 's' => 0x01, 't' => 0x11, 'u' => 0x20,
        'v' => 0x09, 'w' => 0x0D, 'x' => 0x07, 'y' => 0x10, 'z' => 0x06,
        '0' => 0x1D, '1' => 0x12, '2' => 0x13, '3' => 0x14, '4' => 0x15, '5' => 0x17, '6' => 0x16,
        '7' => 0x1A, '8' => 0x1C, '9' => 0x19,
        ' ' => 0x31, '\n' | '\r' => 0x24, '\t' => 0x30,
        '\'' => 0x27, '\\' => 0x2A, ',' => 0x2B, '=' => 0x18, '`' => 0x32, '[' => 0x21, '-' => 0x1B,
        '.' => 0x2F, ']' => 0x1E, ';' => 0x29, '/' => 0x2C,
        _ => return None,
    };
    let shift = ch.is_ascii_uppercase()
        || matches!(ch, '!' | '@' | '#' | '$' | '%' | '^' | '&' | '*' | '(' | ')' | '_' | '+' | '{' | '}' | '|' | ':' | '"' | '<' | '>' | '?' | '~');
    Some((base, shift))
}

/// Map a named key (as used in `--key`/key-combo strings) to a virtual keycode.
pub fn keycode_for_name(name: &str) -> Option<CGKeyCode> {
    match name.to_lowercase().as_str() {
        "return" | "enter" => Some(0x24),
        "tab" => Some(0x30),
        "space" => Some(0x31),
        "delete" | "backspace" => Some(0x33),
        "escape" | "esc" => Some(0x35),
        "forward_delete" | "forwarddelete" => Some(0x75),
        "home" => Some(0x73),
        "end" => Some(0x77),
        "pageup" | "page_up" => Some(0x74),
        "pagedown" | "page_down" => Some(0x79),
        "left" => Some(0x7B),
        "right" => Some(0x7C),
        "down" => Some(0x7D),
        "up" => Some(0x7E),
        "f1" => Some(0x7A), "f2" => Some(0x78), "f3" => Some(0x63), "f4" => Some(0x76),
        "f5" => Some(0x60), "f6" => Some(0x61), "f7" => Some(0x62), "f8" => Some(0x64),
        "f9" => Some(0x65), "f10" => Some(0x6D), "f11" => Some(0x67), "f12" => Some(0x6F),
        other if other.chars().count() == 1 => keycode_for_char(other.chars().next().unwrap()).map(|(k, _)| k),
        _ => None,
    }
}

fn modifier_flags(modifiers: &[&str]) -> CGEventFlags {
    let mut flags = CGEventFlags::CGEventFlagNull;
    for m in modifiers {
        match m.to_lowercase().as_str() {
            "cmd" | "command" | "meta" | "super" => flags |= CGEventFlags::CGEventFlagCommand,
            "shift" => flags |= CGEventFlags::CGEventFlagShift,
            "alt" | "option" | "opt" => flags |= CGEventFlags::CGEventFlagAlternate,
            "ctrl" | "control" => flags |= CGEventFlags::CGEventFlagControl,
            "fn" | "function" => flags |= CGEventFlags::CGEventFlagSecondaryFn,
            _ => {}
        }
    }
    flags
}

fn post_key(keycode: CGKeyCode, flags: CGEventFlags, unicode: Option<&str>) -> Result<(), AxError> {
    let down = CGEvent::new_keyboard_event(source()?, keycode, true)
        .map_err(|_| AxError::Provider("failed to create key-down event".into()))?;
    if flags != CGEventFlags::CGEventFlagNull {
        down.set_flags(flags);
    }
    if let Some(s) = unicode {
        down.set_string(s);
    }
    down.post(CGEventTapLocation::HID);

    let up = CGEvent::new_keyboard_event(source()?, keycode, false)
        .map_err(|_| AxError::Provider("failed to create key-up event".into()))?;
    if flags != CGEventFlags::CGEventFlagNull {
        up.set_flags(flags);
    }
    up.post(CGEventTapLocation::HID);
    Ok(())
}

// ── Mouse ───────────────────────────────────────────────────────────────────

pub fn mouse_move(x: f64, y: f64) -> Result<(), AxError> {
    let point = CGPoint::new(x, y);
    let event = CGEvent::new_mouse_event(source()?, CGEventType::MouseMoved, point, CGMouseButton::Left)
        .map_err(|_| AxError::Provider("failed to create mouse-move event".into()))?;
    event.post(CGEventTapLocation::HID);
    Ok(())
}

pub fn mouse_click(x: f64, y: f64, button: MouseButton, clicks: u32) -> Result<(), AxError> {
    let (down_type, up_type) = match button {
        MouseButton::Left => (CGEventType::LeftMouseDown, CGEventType::LeftMouseUp),
        MouseButton::Right => (CGEventType::RightMouseDown, CGEventType::RightMouseUp),
        MouseButton::Center => (CGEventType::OtherMouseDown, CGEventType::OtherMouseUp),
    };
    let cg_button = to_cg_button(button);
    let point = CGPoint::new(x, y);

    for click_num in 1..=clicks.max(1) {
        let down = CGEvent::new_mouse_event(source()?, down_type, point, cg_button)
            .map_err(|_| AxError::Provider("failed to create mouse-down event".into()))?;
        down.set_integer_value_field(EventField::MOUSE_EVENT_CLICK_STATE, click_num as i64);
        down.post(CGEventTapLocation::HID);

        let up = CGEvent::new_mouse_event(source()?, up_type, point, cg_button)
            .map_err(|_| AxError::Provider("failed to create mouse-up event".into()))?;
        up.set_integer_value_field(EventField::MOUSE_EVENT_CLICK_STATE, click_num as i64);
        up.post(CGEventTapLocation::HID);
    }
    Ok(())
}

pub fn scroll(x: f64, y: f64, delta_y: i32, delta_x: i32) -> Result<(), AxError> {
    let point = CGPoint::new(x, y);
    let move_event = CGEvent::new_mouse_event(source()?, CGEventType::MouseMoved, point, CGMouseButton::Left)
        .map_err(|_| AxError::Provider("failed to create mouse-move event".into()))?;
    move_event.post(CGEventTapLocation::HID);

    let scroll_event = unsafe { CGEventCreateScrollWheelEvent2(std::ptr::null(), 0, 2, delta_y, delta_x) };
    if scroll_event.is_null() {
        return Err(AxError::Provider("failed to create scroll event".into()));
    }
    unsafe {
        CGEventPost(CGEventTapLocation::HID as u32, scroll_event);
        core_foundation::base::CFRelease(scroll_event as core_foundation::base::CFTypeRef);
    }
    Ok(())
}

#[link(name = "CoreGraphics", kind = "framework")]
unsafe extern "C" {
    fn CGEventCreateScrollWheelEvent2(
        source: *const std::ffi::c_void,
        units: u32,
        wheel_count: u32,
        wheel1: i32,
        wheel2: i32,
    ) -> *const std::ffi::c_void;
    fn CGEventPost(tap: u32, event: *const std::ffi::c_void);
}

pub fn drag(from: (f64, f64), to: (f64, f64), button: MouseButton, duration_ms: u64) -> Result<(), AxError> {
    let (down_type, drag_type, up_type) = match button {
        MouseButton::Left => (CGEventType::LeftMouseDown, CGEventType::LeftMouseDragged, CGEventType::LeftMouseUp),
        MouseButton::Right => (CGEventType::RightMouseDown, CGEventType::RightMouseDragged, CGEventType::RightMouseUp),
        MouseButton::Center => (CGEventType::OtherMouseDown, CGEventType::OtherMouseDragged, CGEventType::OtherMouseUp),
    };
    let cg_button = to_cg_button(button);
    let (from_x, from_y) = from;
    let (to_x, to_y) = to;

    let down = CGEvent::new_mouse_event(source()?, down_type, CGPoint::new(from_x, from_y), cg_button)
        .map_err(|_| AxError::Provider("failed to create mouse-down event".into()))?;
    down.post(CGEventTapLocation::HID);

    let steps = 20u64;
    let step_delay = Duration::from_millis(duration_ms / steps.max(1));
    for i in 1..=steps {
        let t = i as f64 / steps as f64;
        let cx = from_x + (to_x - from_x) * t;
        let cy = from_y + (to_y - from_y) * t;
        if let Ok(drag_ev) = CGEvent::new_mouse_event(source()?, drag_type, CGPoint::new(cx, cy), cg_button) {
            drag_ev.post(CGEventTapLocation::HID);
        }
        thread::sleep(step_delay);
    }

    // Mouse-up always fires, even if an intermediate drag event above failed to construct,
    // so a held-down button can't outlive this call.
    let up = CGEvent::new_mouse_event(source()?, up_type, CGPoint::new(to_x, to_y), cg_button)
        .map_err(|_| AxError::Provider("failed to create mouse-up event".into()))?;
    up.post(CGEventTapLocation::HID);
    Ok(())
}

// ── Keyboard ────────────────────────────────────────────────────────────────

/// Types `text` one character at a time. ASCII characters carry both a virtual keycode (with
/// shift flag) and the literal unicode string; non-ASCII characters post with keycode 0 and
/// rely entirely on the unicode string, per the dual key-code/unicode event contract.
pub fn type_text(text: &str, delay_ms_per_char: u64) -> Result<(), AxError> {
    for ch in text.chars() {
        let mut buf = [0u8; 4];
        let s = ch.encode_utf8(&mut buf);
        match keycode_for_char(ch) {
            Some((keycode, shift)) => {
                let flags = if shift { CGEventFlags::CGEventFlagShift } else { CGEventFlags::CGEventFlagNull };
                post_key(keycode, flags, Some(s))?;
            }
            None => post_key(0, CGEventFlags::CGEventFlagNull, Some(s))?,
        }
        if delay_ms_per_char > 0 {
            thread::sleep(Duration::from_millis(delay_ms_per_char));
        }
    }
    Ok(())
}

/// Parse and post a "mod1+mod2+key" combo, e.g. "cmd+shift+s".
pub fn key_combo(combo: &str) -> Result<(), AxError> {
    let parts: Vec<&str> = combo.split('+').map(|s| s.trim()).filter(|s| !s.is_empty()).collect();
    let Some((key_name, modifiers)) = parts.split_last() else {
        return Err(AxError::InvalidArgument("empty key combo".into()));
    };
    let keycode = keycode_for_name(key_name)
        .ok_or_else(|| AxError::InvalidArgument(format!("unknown key name '{key_name}'")))?;
    let flags = modifier_flags(modifiers);
    post_key(keycode, flags, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keycode_for_name_resolves_named_and_single_char_keys() {
        assert_eq!(keycode_for_name("return"), Some(0x24));
        assert_eq!(keycode_for_name("a"), Some(0x00));
        assert_eq!(keycode_for_name("unknownkey"), None);
    }

    #[test]
    fn keycode_for_char_flags_shift_for_uppercase() {
        assert_eq!(keycode_for_char('a'), Some((0x00, false)));
        assert_eq!(keycode_for_char('A'), Some((0x00, true)));
    }
}
