//! Frontmost dialog/sheet/overlay detection (C4).

use crate::model::{Bounds, Element};

const OVERLAY_SUBROLES: &[&str] = &[
    "AXDialog",
    "AXSheet",
    "AXSystemDialog",
    "AXSystemFloating",
    "AXFloatingWindow",
];

/// Three strategies in order, first hit wins. `window_bounds` is the bounds of the enclosing
/// window, needed for the focus and bounds-centering strategies.
pub fn detect_frontmost_overlay<'a>(
    tree: &'a [Element],
    window_bounds: Bounds,
) -> Option<&'a Element> {
    by_subrole(tree).or_else(|| by_focus(tree, window_bounds)).or_else(|| by_bounds(tree, window_bounds))
}

fn by_subrole(tree: &[Element]) -> Option<&Element> {
    let mut deepest: Option<(&Element, usize)> = None;
    walk_collect_subrole(tree, 0, &mut deepest);
    deepest.map(|(el, _)| el)
}

fn walk_collect_subrole<'a>(
    tree: &'a [Element],
    depth: usize,
    best: &mut Option<(&'a Element, usize)>,
) {
    for el in tree {
        if el.subrole.as_deref().is_some_and(|s| OVERLAY_SUBROLES.contains(&s)) {
            let deeper = best.map_or(true, |(_, d)| depth > d);
            if deeper {
                *best = Some((el, depth));
            }
        }
        walk_collect_subrole(&el.children, depth + 1, best);
    }
}

/// If the focused element is inside a non-first top-level child of the window whose bounds
/// are strictly smaller than the window, use that child.
fn by_focus<'a>(tree: &'a [Element], window_bounds: Bounds) -> Option<&'a Element> {
    for (i, child) in tree.iter().enumerate() {
        if i == 0 {
            continue;
        }
        let smaller = child.bounds.w < window_bounds.w || child.bounds.h < window_bounds.h;
        if smaller && subtree_contains_focus(child) {
            return Some(child);
        }
    }
    None
}

fn subtree_contains_focus(el: &Element) -> bool {
    el.focused || el.children.iter().any(subtree_contains_focus)
}

/// Among descendants at depth <= 2, pick one centered in the window whose area is <= 80% of it.
fn by_bounds<'a>(tree: &'a [Element], window_bounds: Bounds) -> Option<&'a Element> {
    let (wcx, wcy) = window_bounds.center();
    let mut found = None;
    walk_bounds(tree, 0, window_bounds, wcx, wcy, &mut found);
    found
}

fn walk_bounds<'a>(
    tree: &'a [Element],
    depth: usize,
    window_bounds: Bounds,
    wcx: f64,
    wcy: f64,
    found: &mut Option<&'a Element>,
) {
    if found.is_some() || depth > 2 {
        return;
    }
    for el in tree {
        let (cx, cy) = el.bounds.center();
        let centered = (cx - wcx).abs() <= window_bounds.w as f64 / 8.0
            && (cy - wcy).abs() <= window_bounds.h as f64 / 8.0;
        let window_area = window_bounds.area().max(1) as f64;
        let small_enough = el.bounds.area() as f64 <= window_area * 0.8;
        if centered && small_enough && el.bounds.area() > 0 {
            *found = Some(el);
            return;
        }
        walk_bounds(&el.children, depth + 1, window_bounds, wcx, wcy, found);
        if found.is_some() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RoleCode;

    fn leaf(id: u32, role: RoleCode, bounds: Bounds) -> Element {
        Element {
            id,
            role,
            subrole: None,
            title: None,
            value: None,
            description: None,
            bounds,
            focused: false,
            enabled: None,
            selected: false,
            actions: vec![],
            reference: None,
            children: vec![],
        }
    }

    #[test]
    fn auto_overlay_scope_resolves_by_subrole() {
        let window_bounds = Bounds { x: 0, y: 0, w: 800, h: 600 };
        let mut dialog = leaf(2, RoleCode::Group, Bounds { x: 200, y: 200, w: 400, h: 200 });
        dialog.subrole = Some("AXDialog".into());
        let tree = vec![
            leaf(1, RoleCode::Group, Bounds { x: 0, y: 0, w: 200, h: 600 }),
            dialog,
        ];
        let found = detect_frontmost_overlay(&tree, window_bounds).unwrap();
        assert_eq!(found.id, 2);
    }

    #[test]
    fn no_overlay_returns_none() {
        let window_bounds = Bounds { x: 0, y: 0, w: 800, h: 600 };
        let tree = vec![leaf(1, RoleCode::Group, Bounds { x: 0, y: 0, w: 800, h: 600 })];
        assert!(detect_frontmost_overlay(&tree, window_bounds).is_none());
    }
}
