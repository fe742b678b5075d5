//! Maps user intent (text/id/coords + filters) to a single target element (C5).

use crate::error::{AxError, Candidate};
use crate::filter;
use crate::model::{Bounds, Element, FlatElement, RoleCode, flatten};
use crate::overlay;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NearDirection {
    Left,
    Right,
    Above,
    Below,
}

impl NearDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "above" => Some(Self::Above),
            "below" => Some(Self::Below),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct TextQuery {
    pub query: String,
    pub roles: Vec<RoleCode>,
    pub exact: bool,
    pub scope_id: Option<u32>,
    pub no_auto_scope: bool,
    pub near: Option<String>,
    pub near_direction: Option<NearDirection>,
}

/// `Resolved { One | Many | None }` (§9 design note).
pub enum Resolved {
    One(FlatElement),
    Many(Vec<FlatElement>),
    None,
}

fn truncate80(s: &str) -> String {
    if s.chars().count() <= 80 { s.to_string() } else { format!("{}…", s.chars().take(80).collect::<String>()) }
}

fn to_candidate(e: &FlatElement) -> Candidate {
    let label = e
        .title
        .clone()
        .filter(|s| !s.is_empty())
        .or_else(|| e.description.clone())
        .unwrap_or_default();
    Candidate {
        id: e.id,
        role: e.role.as_str().to_string(),
        bounds: (e.bounds.x, e.bounds.y, e.bounds.w, e.bounds.h),
        label: truncate80(&label),
        path: e.path_string(),
    }
}

fn find_subtree(tree: &[Element], id: u32) -> Option<Element> {
    for el in tree {
        if el.id == id {
            return Some(el.clone());
        }
        if let Some(found) = find_subtree(&el.children, id) {
            return Some(found);
        }
    }
    None
}

fn own_text_matches(e: &FlatElement, query: &str, exact: bool) -> bool {
    let fields = [e.title.as_deref(), e.value.as_deref(), e.description.as_deref()];
    if exact {
        fields.into_iter().flatten().any(|f| f == query)
    } else {
        let q = query.to_lowercase();
        fields.into_iter().flatten().any(|f| f.to_lowercase().contains(&q))
    }
}

fn is_static_noninteractive(e: &FlatElement) -> bool {
    matches!(e.role, RoleCode::Txt | RoleCode::Img | RoleCode::Group | RoleCode::Other)
        && !e.actions.iter().any(|a| a == "press")
}

/// Smart interactive promotion: when candidates mix interactive and static elements with no
/// explicit role filter, drop the statics.
fn smart_promotion(candidates: Vec<FlatElement>, user_roles_empty: bool) -> Vec<FlatElement> {
    if !user_roles_empty {
        return candidates;
    }
    let any_interactive = candidates.iter().any(|c| c.is_interactive());
    let any_static = candidates.iter().any(is_static_noninteractive);
    if any_interactive && any_static {
        candidates.into_iter().filter(|c| !is_static_noninteractive(c)).collect()
    } else {
        candidates
    }
}

fn gather_candidates(scope: &[Element], full_tree: &[Element], q: &TextQuery) -> Vec<FlatElement> {
    let roles = filter::expand_roles_for_web(&q.roles, full_tree);
    let flat = flatten(scope);
    flat.into_iter()
        .filter(|e| !e.bounds.is_zero_dimension())
        .filter(|e| roles.is_empty() || roles.contains(&e.role))
        .filter(|e| own_text_matches(e, &q.query, q.exact))
        .collect()
}

/// `pick_best_near_match`: prefer the rightmost candidate; among those within 50px of the
/// max x, pick the one closest to the currently focused element.
fn pick_best_near_match(
    candidates: Vec<FlatElement>,
    focused: Option<&FlatElement>,
) -> Vec<FlatElement> {
    let Some(max_x) = candidates.iter().map(|c| c.bounds.x).max() else {
        return candidates;
    };
    let near_max: Vec<FlatElement> = candidates
        .into_iter()
        .filter(|c| (max_x - c.bounds.x) <= 50)
        .collect();
    if near_max.len() <= 1 {
        return near_max;
    }
    match focused {
        Some(f) => {
            let (fx, fy) = f.bounds.center();
            let mut sorted = near_max;
            sorted.sort_by(|a, b| {
                let (ax, ay) = a.bounds.center();
                let (bx, by) = b.bounds.center();
                let da = (ax - fx).powi(2) + (ay - fy).powi(2);
                let db = (bx - fx).powi(2) + (by - fy).powi(2);
                da.partial_cmp(&db).unwrap()
            });
            vec![sorted.into_iter().next().unwrap()]
        }
        None => near_max,
    }
}

/// Text-path resolution (§4.5). `window_bounds` backs overlay detection; `focused` is the
/// currently-focused element, used by `near` disambiguation.
pub fn resolve_by_text(
    tree: &[Element],
    window_bounds: Bounds,
    focused: Option<&FlatElement>,
    q: &TextQuery,
) -> Resolved {
    let (scope, tried_overlay) = match q.scope_id {
        Some(sid) => match find_subtree(tree, sid) {
            Some(el) => (vec![el], false),
            None => (vec![], false),
        },
        None if !q.no_auto_scope => match overlay::detect_frontmost_overlay(tree, window_bounds) {
            Some(ov) => (vec![ov.clone()], true),
            None => (tree.to_vec(), false),
        },
        None => (tree.to_vec(), false),
    };

    let mut candidates = gather_candidates(&scope, tree, q);
    candidates = smart_promotion(candidates, q.roles.is_empty());

    if candidates.len() > 1 && tried_overlay {
        let mut full = gather_candidates(tree, tree, q);
        full = smart_promotion(full, q.roles.is_empty());
        candidates = full;
    }

    if candidates.len() > 1 {
        if let Some(_near) = &q.near {
            candidates = pick_best_near_match(candidates, focused);
        }
    }

    match candidates.len() {
        0 => Resolved::None,
        1 => Resolved::One(candidates.into_iter().next().unwrap()),
        _ => Resolved::Many(candidates),
    }
}

pub fn resolve_by_id(tree: &[Element], id: u32) -> Resolved {
    let flat = flatten(tree);
    match flat.into_iter().find(|e| e.id == id) {
        Some(e) => Resolved::One(e),
        None => Resolved::None,
    }
}

/// Translate a `Resolved` into the final `AxError` for command layers (§9 design note).
pub fn to_result(resolved: Resolved, query: &str, scope_desc: &str) -> Result<FlatElement, AxError> {
    match resolved {
        Resolved::One(e) => Ok(e),
        Resolved::Many(candidates) => Err(AxError::Ambiguous {
            candidates: candidates.iter().map(to_candidate).collect(),
        }),
        Resolved::None => Err(AxError::NotFound {
            query: query.to_string(),
            scope: scope_desc.to_string(),
        }),
    }
}

/// `near` logic after resolution: nearest pressable element within `radius` px of the matched
/// element's center, optionally biased by direction; falls back to a fixed offset.
pub fn near_target(
    tree: &[Element],
    matched: &FlatElement,
    direction: Option<NearDirection>,
    radius: f64,
) -> (f64, f64) {
    let (mx, my) = matched.bounds.center();
    let flat = flatten(tree);
    let mut best: Option<(&FlatElement, f64)> = None;
    for e in &flat {
        if e.id == matched.id || !e.actions.iter().any(|a| a == "press") {
            continue;
        }
        let (ex, ey) = e.bounds.center();
        if let Some(dir) = direction {
            let directional_ok = match dir {
                NearDirection::Left => ex < mx,
                NearDirection::Right => ex > mx,
                NearDirection::Above => ey < my,
                NearDirection::Below => ey > my,
            };
            if !directional_ok {
                continue;
            }
        }
        let dist = ((ex - mx).powi(2) + (ey - my).powi(2)).sqrt();
        if dist <= radius && best.as_ref().is_none_or(|(_, d)| dist < *d) {
            best = Some((e, dist));
        }
    }
    match best {
        Some((e, _)) => e.bounds.center(),
        None => match direction {
            Some(NearDirection::Left) => (mx - 24.0, my),
            Some(NearDirection::Right) => (mx + 24.0, my),
            Some(NearDirection::Above) => (mx, my - 24.0),
            Some(NearDirection::Below) => (mx, my + 24.0),
            None => (mx - 24.0, my),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(id: u32, role: RoleCode, title: &str, b: Bounds, actions: &[&str]) -> Element {
        Element {
            id,
            role,
            subrole: None,
            title: Some(title.to_string()),
            value: None,
            description: None,
            bounds: b,
            focused: false,
            enabled: None,
            selected: false,
            actions: actions.iter().map(|s| s.to_string()).collect(),
            reference: None,
            children: vec![],
        }
    }

    #[test]
    fn smart_interactive_promotion_prefers_button() {
        let tree = vec![
            leaf(9, RoleCode::Txt, "3", Bounds { x: 1, y: 1, w: 10, h: 10 }, &[]),
            leaf(26, RoleCode::Btn, "3", Bounds { x: 100, y: 100, w: 40, h: 40 }, &["press"]),
        ];
        let q = TextQuery { query: "3".into(), no_auto_scope: true, ..Default::default() };
        let resolved = resolve_by_text(&tree, Bounds { x: 0, y: 0, w: 800, h: 600 }, None, &q);
        match resolved {
            Resolved::One(e) => {
                assert_eq!(e.id, 26);
                assert_eq!(e.bounds.center(), (120.0, 120.0));
            }
            _ => panic!("expected single resolution"),
        }
    }

    #[test]
    fn zero_dimension_candidates_never_selected() {
        let tree = vec![
            leaf(1, RoleCode::Btn, "x", Bounds { x: 0, y: 0, w: 0, h: 10 }, &["press"]),
            leaf(2, RoleCode::Btn, "x", Bounds { x: 5, y: 5, w: 10, h: 10 }, &["press"]),
        ];
        let q = TextQuery { query: "x".into(), no_auto_scope: true, ..Default::default() };
        let resolved = resolve_by_text(&tree, Bounds { x: 0, y: 0, w: 800, h: 600 }, None, &q);
        match resolved {
            Resolved::One(e) => assert_eq!(e.id, 2),
            _ => panic!("expected single resolution"),
        }
    }

    #[test]
    fn auto_overlay_scope_excludes_background_match() {
        let mut dialog = leaf(50, RoleCode::Group, "dlg", Bounds { x: 200, y: 150, w: 400, h: 300 }, &[]);
        dialog.subrole = Some("AXDialog".into());
        dialog.children = vec![leaf(51, RoleCode::Btn, "OK", Bounds { x: 300, y: 250, w: 40, h: 20 }, &["press"])];
        let tree = vec![
            leaf(1, RoleCode::Txt, "OK", Bounds { x: 10, y: 10, w: 20, h: 10 }, &[]),
            dialog,
        ];
        let q = TextQuery { query: "OK".into(), ..Default::default() };
        let resolved = resolve_by_text(&tree, Bounds { x: 0, y: 0, w: 800, h: 600 }, None, &q);
        match resolved {
            Resolved::One(e) => assert_eq!(e.id, 51),
            _ => panic!("expected single resolution inside overlay"),
        }
    }
}
