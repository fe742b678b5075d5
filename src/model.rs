//! Canonical element/window data types, role mapping, flattening, and diffing (C2).

use std::collections::HashMap;
use std::fmt;

use serde::{Serialize, Serializer};

/// Short role code. Unknown AX roles map to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleCode {
    Btn,
    Txt,
    Lnk,
    Img,
    Input,
    Chk,
    Radio,
    Menu,
    MenuItem,
    Tab,
    List,
    Row,
    Cell,
    Group,
    Scroll,
    Toolbar,
    Web,
    Window,
    Other,
    Toggle,
}

impl RoleCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Btn => "btn",
            Self::Txt => "txt",
            Self::Lnk => "lnk",
            Self::Img => "img",
            Self::Input => "input",
            Self::Chk => "chk",
            Self::Radio => "radio",
            Self::Menu => "menu",
            Self::MenuItem => "menuitem",
            Self::Tab => "tab",
            Self::List => "list",
            Self::Row => "row",
            Self::Cell => "cell",
            Self::Group => "group",
            Self::Scroll => "scroll",
            Self::Toolbar => "toolbar",
            Self::Web => "web",
            Self::Window => "window",
            Self::Other => "other",
            Self::Toggle => "toggle",
        }
    }

    /// Map a raw platform AX role string to a short code.
    pub fn from_ax_role(raw: &str) -> Self {
        match raw {
            "AXButton" => Self::Btn,
            "AXStaticText" => Self::Txt,
            "AXLink" => Self::Lnk,
            "AXImage" => Self::Img,
            "AXTextField" | "AXTextArea" | "AXComboBox" | "AXSearchField" => Self::Input,
            "AXCheckBox" => Self::Chk,
            "AXRadioButton" => Self::Radio,
            "AXMenu" | "AXMenuBar" => Self::Menu,
            "AXMenuItem" | "AXMenuBarItem" => Self::MenuItem,
            "AXTabGroup" | "AXTab" => Self::Tab,
            "AXList" | "AXOutline" => Self::List,
            "AXRow" => Self::Row,
            "AXCell" => Self::Cell,
            "AXGroup" => Self::Group,
            "AXScrollArea" => Self::Scroll,
            "AXToolbar" => Self::Toolbar,
            "AXWebArea" => Self::Web,
            "AXWindow" => Self::Window,
            "AXSlider" | "AXDisclosureTriangle" | "AXSwitch" => Self::Toggle,
            _ => Self::Other,
        }
    }

    /// Interactive per §2 GLOSSARY: actions include "press", or conventionally actionable role.
    pub fn conventionally_interactive(&self) -> bool {
        matches!(
            self,
            Self::Btn
                | Self::Lnk
                | Self::Input
                | Self::Chk
                | Self::Radio
                | Self::MenuItem
                | Self::Tab
                | Self::Toggle
        )
    }
}

impl fmt::Display for RoleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RoleCode {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

/// Integer bounds in global screen pixels; width/height may be zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bounds {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

impl Bounds {
    pub const ZERO: Bounds = Bounds { x: 0, y: 0, w: 0, h: 0 };

    pub fn is_zero_dimension(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x as f64 + self.w as f64 / 2.0, self.y as f64 + self.h as f64 / 2.0)
    }

    pub fn area(&self) -> i64 {
        self.w * self.h
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }
}

/// A node in the element tree (§3).
#[derive(Debug, Clone, Serialize)]
pub struct Element {
    pub id: u32,
    pub role: RoleCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subrole: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub bounds: Bounds,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub focused: bool,
    /// Tri-state: None = unknown, Some(true)/Some(false) = known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub selected: bool,
    pub actions: Vec<String>,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn is_interactive(&self) -> bool {
        self.actions.iter().any(|a| a == "press") || self.role.conventionally_interactive()
    }

    /// Display element per GLOSSARY: non-interactive text with a non-empty value.
    pub fn is_display_text(&self) -> bool {
        self.role == RoleCode::Txt
            && !self.is_interactive()
            && self.value.as_deref().is_some_and(|v| !v.is_empty())
    }
}

/// Element without children, plus an ancestor role-code path (§3).
#[derive(Debug, Clone, Serialize)]
pub struct FlatElement {
    pub id: u32,
    pub role: RoleCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subrole: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub bounds: Bounds,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub focused: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub selected: bool,
    pub actions: Vec<String>,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub path: Vec<RoleCode>,
}

impl FlatElement {
    pub fn is_interactive(&self) -> bool {
        self.actions.iter().any(|a| a == "press") || self.role.conventionally_interactive()
    }

    pub fn is_display_text(&self) -> bool {
        self.role == RoleCode::Txt
            && !self.is_interactive()
            && self.value.as_deref().is_some_and(|v| !v.is_empty())
    }

    pub fn path_string(&self) -> String {
        self.path
            .iter()
            .map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join(" > ")
    }
}

/// A top-level application window.
#[derive(Debug, Clone, Serialize)]
pub struct Window {
    pub app: String,
    pub pid: i32,
    pub title: String,
    pub id: u32,
    pub bounds: Bounds,
    pub focused: bool,
}

/// Scope argument threaded through the provider and resolver.
#[derive(Debug, Clone)]
pub enum Scope {
    /// Application identified by pid.
    Pid(i32),
    /// Application identified by name (case-insensitive substring against running apps).
    App(String),
    /// A specific window by its platform handle.
    WindowId(u32),
}

/// Parameters controlling a single tree read (§3). `depth == 0` means unlimited.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    pub app: Option<String>,
    pub window_title_substring: Option<String>,
    pub window_id: Option<u32>,
    pub pid: Option<i32>,
    pub depth: usize,
    pub roles: Vec<RoleCode>,
    pub bbox: Option<Bounds>,
    pub text: Option<String>,
    pub flat: bool,
    pub visible_only: bool,
    pub focused_only: bool,
    pub scope_id: Option<u32>,
    pub prune_empty_groups: bool,
    pub raw_mode: bool,
}

/// A single changed field in a `TreeDiff` entry: `(before, after)`.
#[derive(Debug, Clone, Serialize)]
pub struct FieldChange {
    pub before: String,
    pub after: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangedElement {
    pub id: u32,
    pub role: RoleCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub changes: HashMap<String, FieldChange>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct TreeDiff {
    pub added: Vec<FlatElement>,
    pub removed: Vec<FlatElement>,
    pub changed: Vec<ChangedElement>,
    pub unchanged_count: usize,
}

/// Pre-order flatten of a tree into `FlatElement`s, building the ancestor path as it descends.
pub fn flatten(tree: &[Element]) -> Vec<FlatElement> {
    let mut out = Vec::new();
    for root in tree {
        flatten_into(root, &mut Vec::new(), &mut out);
    }
    out
}

fn flatten_into(el: &Element, path: &mut Vec<RoleCode>, out: &mut Vec<FlatElement>) {
    out.push(FlatElement {
        id: el.id,
        role: el.role,
        subrole: el.subrole.clone(),
        title: el.title.clone(),
        value: el.value.clone(),
        description: el.description.clone(),
        bounds: el.bounds,
        focused: el.focused,
        enabled: el.enabled,
        selected: el.selected,
        actions: el.actions.clone(),
        reference: el.reference.clone(),
        path: path.clone(),
    });
    path.push(el.role);
    for child in &el.children {
        flatten_into(child, path, out);
    }
    path.pop();
}

fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    let mut last_dash = false;
    for c in label.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let slug = slug.trim_matches('-');
    slug.chars().take(32).collect()
}

/// Assign short `ref` slugs to interactive elements; ties within a tree get a numeric suffix.
/// Best-effort only — not guaranteed stable across reads (see SPEC_FULL open question notes).
pub fn generate_refs(tree: &mut [Element]) {
    let mut seen: HashMap<String, u32> = HashMap::new();
    for root in tree {
        generate_refs_rec(root, &mut seen);
    }
}

fn generate_refs_rec(el: &mut Element, seen: &mut HashMap<String, u32>) {
    if el.is_interactive() {
        let label = el
            .title
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(el.description.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or(el.role.as_str());
        let base = slugify(label);
        let base = if base.is_empty() { el.role.as_str().to_string() } else { base };
        let count = seen.entry(base.clone()).or_insert(0);
        *count += 1;
        el.reference = Some(if *count == 1 { base } else { format!("{base}-{count}") });
    }
    for child in &mut el.children {
        generate_refs_rec(child, seen);
    }
}

fn fields_match(a: &FlatElement, b: &FlatElement) -> bool {
    a.role == b.role
        && a.title == b.title
        && a.description == b.description
        && a.bounds == b.bounds
}

/// Compute added/removed/changed between two flattened traversals.
/// Identity: prefer id match, fall back to content match (role+title+description+bounds).
pub fn diff(prev: &[FlatElement], curr: &[FlatElement]) -> TreeDiff {
    let mut matched_curr = vec![false; curr.len()];
    let mut out = TreeDiff::default();

    for p in prev {
        let mut match_idx = curr
            .iter()
            .position(|c| c.id == p.id)
            .filter(|&i| !matched_curr[i]);
        if match_idx.is_none() {
            match_idx = curr
                .iter()
                .enumerate()
                .position(|(i, c)| !matched_curr[i] && fields_match(p, c));
        }

        match match_idx {
            Some(i) => {
                matched_curr[i] = true;
                let c = &curr[i];
                let mut changes = HashMap::new();
                track_change(&mut changes, "t", p.title.as_deref(), c.title.as_deref());
                track_change(&mut changes, "v", p.value.as_deref(), c.value.as_deref());
                track_change(&mut changes, "d", p.description.as_deref(), c.description.as_deref());
                if p.bounds != c.bounds {
                    changes.insert(
                        "b".into(),
                        FieldChange {
                            before: format!("{:?}", p.bounds),
                            after: format!("{:?}", c.bounds),
                        },
                    );
                }
                if p.focused != c.focused {
                    changes.insert(
                        "f".into(),
                        FieldChange { before: p.focused.to_string(), after: c.focused.to_string() },
                    );
                }
                if p.selected != c.selected {
                    changes.insert(
                        "s".into(),
                        FieldChange { before: p.selected.to_string(), after: c.selected.to_string() },
                    );
                }
                if p.enabled != c.enabled {
                    changes.insert(
                        "e".into(),
                        FieldChange {
                            before: format!("{:?}", p.enabled),
                            after: format!("{:?}", c.enabled),
                        },
                    );
                }
                if changes.is_empty() {
                    out.unchanged_count += 1;
                } else {
                    out.changed.push(ChangedElement {
                        id: c.id,
                        role: c.role,
                        title: c.title.clone(),
                        changes,
                    });
                }
            }
            None => out.removed.push(p.clone()),
        }
    }

    for (i, c) in curr.iter().enumerate() {
        if !matched_curr[i] {
            out.added.push(c.clone());
        }
    }

    out
}

fn track_change(
    changes: &mut HashMap<String, FieldChange>,
    key: &str,
    before: Option<&str>,
    after: Option<&str>,
) {
    if before != after {
        changes.insert(
            key.into(),
            FieldChange {
                before: before.unwrap_or("").to_string(),
                after: after.unwrap_or("").to_string(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(id: u32, role: RoleCode, title: &str, bounds: Bounds) -> Element {
        Element {
            id,
            role,
            subrole: None,
            title: Some(title.to_string()),
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
    fn flatten_preserves_preorder() {
        let mut parent = leaf(1, RoleCode::Window, "win", Bounds { x: 0, y: 0, w: 100, h: 100 });
        parent.children = vec![
            leaf(2, RoleCode::Group, "g", Bounds { x: 0, y: 0, w: 50, h: 50 }),
            leaf(3, RoleCode::Btn, "b", Bounds { x: 50, y: 0, w: 50, h: 50 }),
        ];
        let flat = flatten(&[parent]);
        let ids: Vec<u32> = flat.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(flat[2].path_string(), "window");
    }

    #[test]
    fn diff_identity_is_empty() {
        let el = leaf(5, RoleCode::Txt, "a", Bounds { x: 0, y: 0, w: 10, h: 10 });
        let flat = flatten(&[el]);
        let d = diff(&flat, &flat);
        assert!(d.added.is_empty());
        assert!(d.removed.is_empty());
        assert!(d.changed.is_empty());
        assert_eq!(d.unchanged_count, flat.len());
    }

    #[test]
    fn diff_detects_bounds_change() {
        let prev = flatten(&[leaf(5, RoleCode::Txt, "a", Bounds { x: 0, y: 0, w: 10, h: 10 })]);
        let curr = flatten(&[leaf(5, RoleCode::Txt, "a", Bounds { x: 1, y: 0, w: 10, h: 10 })]);
        let d = diff(&prev, &curr);
        assert_eq!(d.changed.len(), 1);
        assert!(d.changed[0].changes.contains_key("b"));
    }

    #[test]
    fn generate_refs_deduplicates() {
        let mut btn1 = leaf(1, RoleCode::Btn, "OK", Bounds { x: 0, y: 0, w: 10, h: 10 });
        btn1.actions = vec!["press".into()];
        let mut btn2 = leaf(2, RoleCode::Btn, "OK", Bounds { x: 20, y: 0, w: 10, h: 10 });
        btn2.actions = vec!["press".into()];
        let mut tree = vec![btn1, btn2];
        generate_refs(&mut tree);
        assert_eq!(tree[0].reference.as_deref(), Some("ok"));
        assert_eq!(tree[1].reference.as_deref(), Some("ok-2"));
    }

    #[test]
    fn role_mapping_defaults_to_other() {
        assert_eq!(RoleCode::from_ax_role("AXFooBar"), RoleCode::Other);
        assert_eq!(RoleCode::from_ax_role("AXButton"), RoleCode::Btn);
    }
}
