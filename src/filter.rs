//! Role/bbox/visibility/text filtering and read profiles (C3).

use crate::model::{Bounds, Element, ReadOptions, RoleCode};

/// Prune by depth (root = 0), then role set, then bbox intersection, then visibility.
pub fn filter(tree: Vec<Element>, opts: &ReadOptions) -> Vec<Element> {
    let roles = effective_roles(&tree, opts);
    tree.into_iter()
        .filter_map(|el| filter_node(el, 0, opts, &roles))
        .collect()
}

fn filter_node(
    mut el: Element,
    depth: usize,
    opts: &ReadOptions,
    roles: &[RoleCode],
) -> Option<Element> {
    if opts.depth != 0 && depth > opts.depth {
        return None;
    }

    el.children = el
        .children
        .into_iter()
        .filter_map(|c| filter_node(c, depth + 1, opts, roles))
        .collect();

    let role_ok = roles.is_empty() || roles.contains(&el.role);
    let bbox_ok = opts.bbox.is_none_or(|b| el.bounds.intersects(&b));
    let visible_ok = !opts.visible_only || !el.bounds.is_zero_dimension();

    if role_ok && bbox_ok && visible_ok {
        Some(el)
    } else {
        None
    }
}

/// `"input"` expands to include `"other"` when the tree has web content, *before* filtering.
pub fn expand_roles_for_web(roles: &[RoleCode], tree: &[Element]) -> Vec<RoleCode> {
    let mut roles = roles.to_vec();
    if roles.contains(&RoleCode::Input) && has_web_content(tree) && !roles.contains(&RoleCode::Other) {
        roles.push(RoleCode::Other);
    }
    roles
}

fn effective_roles(tree: &[Element], opts: &ReadOptions) -> Vec<RoleCode> {
    expand_roles_for_web(&opts.roles, tree)
}

pub fn has_web_content(tree: &[Element]) -> bool {
    tree.iter().any(|el| el.role == RoleCode::Web || has_web_content(&el.children))
}

/// Case-insensitive substring match of `query` against title/value/description.
fn own_text_matches(el: &Element, query: &str) -> bool {
    let q = query.to_lowercase();
    [el.title.as_deref(), el.value.as_deref(), el.description.as_deref()]
        .into_iter()
        .flatten()
        .any(|s| s.to_lowercase().contains(&q))
}

/// Text filter per §4.3: in flat mode only directly-matching leaves are emitted (hoisted out of
/// their ancestor subtrees, pre-order); in tree mode, an ancestor is retained when it has
/// matching descendants even if its own fields don't match.
pub fn filter_by_text(tree: Vec<Element>, query: &str, flat: bool) -> Vec<Element> {
    if flat {
        let mut out = Vec::new();
        collect_text_matches(&tree, query, &mut out);
        out
    } else {
        tree.into_iter().filter_map(|el| filter_by_text_node(el, query)).collect()
    }
}

/// Pre-order walk collecting every directly-matching element as a childless leaf, regardless of
/// nesting depth, so a non-matching ancestor never shadows a matching descendant.
fn collect_text_matches(tree: &[Element], query: &str, out: &mut Vec<Element>) {
    for el in tree {
        if own_text_matches(el, query) {
            let mut leaf = el.clone();
            leaf.children = Vec::new();
            out.push(leaf);
        }
        collect_text_matches(&el.children, query, out);
    }
}

fn filter_by_text_node(mut el: Element, query: &str) -> Option<Element> {
    let self_match = own_text_matches(&el, query);
    el.children = el
        .children
        .into_iter()
        .filter_map(|c| filter_by_text_node(c, query))
        .collect();

    if self_match || !el.children.is_empty() {
        Some(el)
    } else {
        None
    }
}

/// Depth-first; drop a `group`/`other` node with empty title/value/description and no
/// surviving children. Never drops interactive or display-text elements.
pub fn prune_empty_groups(tree: Vec<Element>) -> Vec<Element> {
    tree.into_iter().filter_map(prune_node).collect()
}

fn prune_node(mut el: Element) -> Option<Element> {
    el.children = el.children.into_iter().filter_map(prune_node).collect();

    let prunable_role = matches!(el.role, RoleCode::Group | RoleCode::Other);
    let empty_fields = el.title.as_deref().unwrap_or("").is_empty()
        && el.value.as_deref().unwrap_or("").is_empty()
        && el.description.as_deref().unwrap_or("").is_empty();

    if prunable_role && empty_fields && el.children.is_empty() && !el.is_interactive() && !el.is_display_text() {
        None
    } else {
        Some(el)
    }
}

/// Read profiles (§4.3 "profile" concept referenced from §6's `--format`/verb defaults):
/// `full` keeps everything, `smart` applies the web/overlay/prune smart defaults,
/// `minimal` additionally drops non-interactive, non-display-text leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Full,
    Smart,
    Minimal,
}

pub fn apply_profile(tree: Vec<Element>, profile: Profile) -> Vec<Element> {
    match profile {
        Profile::Full => tree,
        Profile::Smart => prune_empty_groups(tree),
        Profile::Minimal => prune_empty_groups(tree)
            .into_iter()
            .filter_map(minimal_node)
            .collect(),
    }
}

fn minimal_node(mut el: Element) -> Option<Element> {
    el.children = el.children.into_iter().filter_map(minimal_node).collect();
    if el.is_interactive() || el.is_display_text() || !el.children.is_empty() {
        Some(el)
    } else {
        None
    }
}

pub fn drop_zero_dimension(els: Vec<Element>) -> Vec<Element> {
    els.into_iter()
        .filter(|e| !e.bounds.is_zero_dimension())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(id: u32, role: RoleCode, title: &str, b: Bounds) -> Element {
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
            actions: vec![],
            reference: None,
            children: vec![],
        }
    }

    #[test]
    fn visible_only_drops_zero_dimension() {
        let mut opts = ReadOptions::default();
        opts.visible_only = true;
        let tree = vec![
            leaf(1, RoleCode::Btn, "a", Bounds { x: 10, y: 20, w: 100, h: 30 }),
            leaf(2, RoleCode::Btn, "b", Bounds { x: 0, y: 0, w: 0, h: 30 }),
            leaf(3, RoleCode::Lnk, "c", Bounds { x: 0, y: 0, w: 20, h: 0 }),
        ];
        let out = filter(tree, &opts);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, 1);
    }

    #[test]
    fn filter_by_text_flat_only_matches_own_fields() {
        let mut parent = leaf(1, RoleCode::Group, "container", Bounds { x: 0, y: 0, w: 10, h: 10 });
        parent.children = vec![leaf(2, RoleCode::Txt, "hello world", Bounds { x: 0, y: 0, w: 10, h: 10 })];
        let out = filter_by_text(vec![parent], "hello", true);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, 2);
    }

    #[test]
    fn expand_roles_for_web_adds_other() {
        let web = leaf(1, RoleCode::Web, "", Bounds::ZERO);
        let expanded = expand_roles_for_web(&[RoleCode::Input], &[web]);
        assert!(expanded.contains(&RoleCode::Other));
    }
}
