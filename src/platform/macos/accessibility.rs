use core_foundation::base::{CFRelease, CFTypeRef, TCFType};
use core_foundation::string::CFString;

use crate::error::AxError;
use crate::model::{Bounds, Element};
use crate::platform::macos::ax_helpers;
use ax_helpers::AXUIElementRef;

const AX_SELECTED: &str = "AXSelected";
const UNBOUNDED_DEPTH: usize = usize::MAX;

/// Read the UI element tree rooted at `app`, honoring `max_depth` (0 = unlimited).
pub fn read_tree(app: AXUIElementRef, max_depth: usize) -> Vec<Element> {
    let cap = if max_depth == 0 { UNBOUNDED_DEPTH } else { max_depth };
    let mut counter = 0u32;
    vec![read_element(app, 0, cap, &mut counter)]
}

fn read_element(element: AXUIElementRef, depth: usize, max_depth: usize, counter: &mut u32) -> Element {
    let raw_role = ax_helpers::get_ax_string(element, ax_helpers::AX_ROLE).unwrap_or_default();
    let subrole = ax_helpers::get_ax_string(element, ax_helpers::AX_SUBROLE).filter(|s| !s.is_empty());
    let title = ax_helpers::get_ax_string(element, ax_helpers::AX_TITLE).filter(|s| !s.is_empty());
    let description =
        ax_helpers::get_ax_string(element, ax_helpers::AX_DESCRIPTION).filter(|s| !s.is_empty());
    let value = ax_helpers::get_ax_string(element, ax_helpers::AX_VALUE).filter(|s| !s.is_empty());
    let position = ax_helpers::get_ax_position(element);
    let size = ax_helpers::get_ax_size(element);
    let enabled = ax_helpers::get_ax_bool(element, ax_helpers::AX_ENABLED);
    let focused = ax_helpers::get_ax_bool(element, ax_helpers::AX_FOCUSED).unwrap_or(false);
    let selected = ax_helpers::get_ax_bool(element, AX_SELECTED).unwrap_or(false);
    let actions = read_action_names(element);

    let bounds = match (position, size) {
        (Some((x, y)), Some((w, h))) => Bounds { x: x.round() as i64, y: y.round() as i64, w: w.round() as i64, h: h.round() as i64 },
        _ => Bounds::ZERO,
    };

    let id = *counter;
    *counter += 1;

    let mut children = Vec::new();
    // Skip recursing into menu items — unexpanded menus can throw ObjC exceptions.
    if depth < max_depth && raw_role != "AXMenuBarItem" && raw_role != "AXMenuItem" {
        if let Some(children_ref) = ax_helpers::get_ax_raw(element, ax_helpers::AX_CHILDREN) {
            let count = unsafe { core_foundation::array::CFArrayGetCount(children_ref as *const _) };
            for i in 0..count {
                let child = unsafe { core_foundation::array::CFArrayGetValueAtIndex(children_ref as *const _, i) };
                if !child.is_null() {
                    children.push(read_element(child as AXUIElementRef, depth + 1, max_depth, counter));
                }
            }
            unsafe { CFRelease(children_ref) };
        }
    }

    Element {
        id,
        role: crate::model::RoleCode::from_ax_role(&raw_role),
        subrole,
        title,
        value,
        description,
        bounds,
        focused,
        enabled,
        selected,
        actions,
        reference: None,
        children,
    }
}

fn read_action_names(element: AXUIElementRef) -> Vec<String> {
    let mut names_ref: CFTypeRef = std::ptr::null();
    let err = unsafe { ax_helpers::AXUIElementCopyActionNames(element, &mut names_ref) };
    if err != ax_helpers::AX_ERROR_SUCCESS || names_ref.is_null() {
        return Vec::new();
    }
    let count = unsafe { core_foundation::array::CFArrayGetCount(names_ref as *const _) };
    let mut actions = Vec::with_capacity(count as usize);
    for i in 0..count {
        let name_ref = unsafe { core_foundation::array::CFArrayGetValueAtIndex(names_ref as *const _, i) };
        if !name_ref.is_null() {
            let name_cf: CFString = unsafe { CFString::wrap_under_get_rule(name_ref as *const _) };
            actions.push(normalize_action(&name_cf.to_string()));
        }
    }
    unsafe { CFRelease(names_ref) };
    actions
}

/// "AXPress" -> "press", "AXShowMenu" -> "showMenu": strip the prefix and lowercase only the
/// leading letter, preserving the §3 action-name convention's internal camelCase.
fn normalize_action(raw: &str) -> String {
    let stripped = raw.strip_prefix("AX").unwrap_or(raw);
    let mut chars = stripped.chars();
    match chars.next() {
        Some(first) => format!("{}{}", first.to_lowercase(), chars.as_str()),
        None => stripped.to_string(),
    }
}

fn denormalize_action(name: &str) -> String {
    if name.starts_with("AX") {
        name.to_string()
    } else {
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => format!("AX{}{}", first.to_uppercase(), chars.as_str()),
            None => name.to_string(),
        }
    }
}

/// Walk to the pre-order node at `target_id`, using the same traversal order and skip rules
/// as `read_tree`. Returned reference is borrowed from `root`'s subtree.
pub fn find_by_preorder_id(root: AXUIElementRef, target_id: u32) -> AXUIElementRef {
    let mut counter = 0u32;
    find_by_preorder_id_rec(root, target_id, UNBOUNDED_DEPTH, 0, &mut counter)
}

fn find_by_preorder_id_rec(
    element: AXUIElementRef,
    target_id: u32,
    max_depth: usize,
    depth: usize,
    counter: &mut u32,
) -> AXUIElementRef {
    if element.is_null() {
        return std::ptr::null();
    }
    let id = *counter;
    *counter += 1;
    if id == target_id {
        return element;
    }

    let raw_role = ax_helpers::get_ax_string(element, ax_helpers::AX_ROLE).unwrap_or_default();
    if depth >= max_depth || raw_role == "AXMenuBarItem" || raw_role == "AXMenuItem" {
        return std::ptr::null();
    }

    if let Some(children_ref) = ax_helpers::get_ax_raw(element, ax_helpers::AX_CHILDREN) {
        let count = unsafe { core_foundation::array::CFArrayGetCount(children_ref as *const _) };
        for i in 0..count {
            let child = unsafe { core_foundation::array::CFArrayGetValueAtIndex(children_ref as *const _, i) };
            if !child.is_null() {
                let found = find_by_preorder_id_rec(child as AXUIElementRef, target_id, max_depth, depth + 1, counter);
                if !found.is_null() {
                    unsafe { CFRelease(children_ref) };
                    return found;
                }
            }
        }
        unsafe { CFRelease(children_ref) };
    }
    std::ptr::null()
}

pub fn perform_action(app: AXUIElementRef, id: u32, action_name: &str) -> Result<(), AxError> {
    let found = find_by_preorder_id(app, id);
    if found.is_null() {
        return Err(AxError::NotFound { query: format!("id={id}"), scope: "tree".into() });
    }
    let ax_action = denormalize_action(action_name);
    ax_helpers::perform_ax_action(found, &ax_action)
        .map_err(|code| AxError::Provider(format!("{ax_action} failed with AX error {code}")))
}

const BOOL_ATTRS: &[&str] = &["focused", "selected", "enabled", "AXFocused", "AXSelected", "AXEnabled"];

pub fn set_attribute(app: AXUIElementRef, id: u32, attr_name: &str, value: &str) -> Result<(), AxError> {
    let found = find_by_preorder_id(app, id);
    if found.is_null() {
        return Err(AxError::NotFound { query: format!("id={id}"), scope: "tree".into() });
    }
    let ax_attr_name = if attr_name.eq_ignore_ascii_case("value") {
        ax_helpers::AX_VALUE.to_string()
    } else {
        denormalize_action(attr_name)
    };

    if BOOL_ATTRS.contains(&attr_name) || BOOL_ATTRS.contains(&ax_attr_name.as_str()) {
        let b = value.eq_ignore_ascii_case("true") || value == "1";
        return ax_helpers::set_ax_bool(found, &ax_attr_name, b)
            .map_err(|code| AxError::Provider(format!("set {ax_attr_name} failed with AX error {code}")));
    }

    let attr = ax_helpers::ax_attr(&ax_attr_name);
    let cf_value = CFString::new(value);
    let err = unsafe {
        ax_helpers::AXUIElementSetAttributeValue(found, attr.as_CFTypeRef(), cf_value.as_CFTypeRef())
    };
    if err == ax_helpers::AX_ERROR_SUCCESS {
        Ok(())
    } else {
        Err(AxError::Provider(format!("set {ax_attr_name} failed with AX error {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_action_strips_ax_prefix() {
        assert_eq!(normalize_action("AXPress"), "press");
        assert_eq!(normalize_action("AXShowMenu"), "showMenu");
    }

    #[test]
    fn denormalize_action_restores_prefix() {
        assert_eq!(denormalize_action("press"), "AXPress");
        assert_eq!(denormalize_action("AXPress"), "AXPress");
    }
}
