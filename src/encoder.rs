//! Agent-compact, structured compact/pretty, and screenshot-combined output formats (C8).

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::filter::has_web_content;
use crate::model::{Element, FlatElement};
use crate::post_action::DisplayElement;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Agent,
    Yaml,
    Json,
    Screenshot,
}

impl Format {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "agent" => Some(Self::Agent),
            "yaml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            "screenshot" => Some(Self::Screenshot),
            _ => None,
        }
    }
}

pub const DEFAULT_AGENT_CAP: usize = 200;

/// Tracks which smart-default adjustments were applied, surfaced in structured output only.
#[derive(Debug, Clone, Default)]
pub struct SmartDefaults {
    pub format_defaulted_to_agent: bool,
    pub web_pruned: bool,
    pub web_roles_expanded: bool,
    pub element_cap_applied: Option<usize>,
}

impl SmartDefaults {
    pub fn summary(&self) -> Option<String> {
        let mut parts = Vec::new();
        if self.format_defaulted_to_agent {
            parts.push("format=agent (piped output)".to_string());
        }
        if self.web_pruned {
            parts.push("pruned empty groups (web content)".to_string());
        }
        if self.web_roles_expanded {
            parts.push("expanded input -> input,other (web content)".to_string());
        }
        if let Some(cap) = self.element_cap_applied {
            parts.push(format!("capped at {cap} elements"));
        }
        if parts.is_empty() { None } else { Some(parts.join("; ")) }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionResult {
    pub ok: bool,
    pub action: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<FlatElement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focused: Option<FlatElement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<Vec<DisplayElement>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    pub fn ok(action: &str) -> Self {
        Self {
            ok: true,
            action: action.to_string(),
            extra: Map::new(),
            target: None,
            focused: None,
            display: None,
            state: None,
            warning: None,
            error: None,
        }
    }

    pub fn failed(action: &str, error: &str) -> Self {
        Self {
            ok: false,
            action: action.to_string(),
            extra: Map::new(),
            target: None,
            focused: None,
            display: None,
            state: None,
            warning: None,
            error: Some(error.to_string()),
        }
    }

    pub fn with_extra(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    /// Builds a failed result from an `AxError`, preserving structured detail (candidate list,
    /// not-found query/scope, last-observed state) that `Display`'s one-line summary drops —
    /// required for §7/§8's "ambiguous match enumerates candidates" behavior.
    pub fn from_error(action: &str, e: &crate::error::AxError) -> Self {
        use crate::error::AxError;
        let mut result = Self::failed(action, &e.to_string());
        match e {
            AxError::Ambiguous { candidates } => {
                result.extra.insert("candidates".into(), json!(candidates));
            }
            AxError::NotFound { query, scope } => {
                result.extra.insert("query".into(), json!(query));
                result.extra.insert("scope".into(), json!(scope));
            }
            AxError::Timeout { last_state } => {
                result.extra.insert("last_state".into(), json!(last_state));
            }
            AxError::Assertion { reason } => {
                result.extra.insert("reason".into(), json!(reason));
            }
            _ => {}
        }
        result
    }
}

// ── Compact structured (short-keyed) element encoding ──────────────────────

fn compact_element(e: &Element) -> Value {
    let mut m = Map::new();
    m.insert("i".into(), json!(e.id));
    m.insert("r".into(), json!(e.role.as_str()));
    if let Some(sr) = &e.subrole {
        m.insert("sr".into(), json!(sr));
    }
    if let Some(t) = &e.title {
        m.insert("t".into(), json!(t));
    }
    if let Some(v) = &e.value {
        m.insert("v".into(), json!(v));
    }
    if let Some(d) = &e.description {
        m.insert("d".into(), json!(d));
    }
    m.insert("b".into(), json!([e.bounds.x, e.bounds.y, e.bounds.w, e.bounds.h]));
    if e.focused {
        m.insert("f".into(), json!(true));
    }
    if e.enabled == Some(false) {
        m.insert("e".into(), json!(false));
    }
    if e.selected {
        m.insert("s".into(), json!(true));
    }
    if !e.actions.is_empty() {
        m.insert("a".into(), json!(e.actions));
    }
    if let Some(r) = &e.reference {
        m.insert("ref".into(), json!(r));
    }
    if !e.children.is_empty() {
        m.insert("c".into(), Value::Array(e.children.iter().map(compact_element).collect()));
    }
    Value::Object(m)
}

fn compact_flat_element(e: &FlatElement) -> Value {
    let mut m = Map::new();
    m.insert("i".into(), json!(e.id));
    m.insert("r".into(), json!(e.role.as_str()));
    if let Some(sr) = &e.subrole {
        m.insert("sr".into(), json!(sr));
    }
    if let Some(t) = &e.title {
        m.insert("t".into(), json!(t));
    }
    if let Some(v) = &e.value {
        m.insert("v".into(), json!(v));
    }
    if let Some(d) = &e.description {
        m.insert("d".into(), json!(d));
    }
    m.insert("b".into(), json!([e.bounds.x, e.bounds.y, e.bounds.w, e.bounds.h]));
    if e.focused {
        m.insert("f".into(), json!(true));
    }
    if e.enabled == Some(false) {
        m.insert("e".into(), json!(false));
    }
    if e.selected {
        m.insert("s".into(), json!(true));
    }
    if !e.actions.is_empty() {
        m.insert("a".into(), json!(e.actions));
    }
    if let Some(r) = &e.reference {
        m.insert("ref".into(), json!(r));
    }
    m.insert("p".into(), json!(e.path.iter().map(|r| r.as_str()).collect::<Vec<_>>()));
    Value::Object(m)
}

pub enum ElementsPayload<'a> {
    Tree(&'a [Element]),
    Flat(&'a [FlatElement]),
}

pub struct ReadResult<'a> {
    pub app: Option<String>,
    pub pid: Option<i32>,
    pub window: Option<String>,
    pub smart_defaults: Option<String>,
    pub ts: i64,
    pub elements: ElementsPayload<'a>,
}

fn read_result_to_value(r: &ReadResult) -> Value {
    let mut m = Map::new();
    if let Some(app) = &r.app {
        m.insert("app".into(), json!(app));
    }
    if let Some(pid) = r.pid {
        m.insert("pid".into(), json!(pid));
    }
    if let Some(w) = &r.window {
        m.insert("window".into(), json!(w));
    }
    if let Some(sd) = &r.smart_defaults {
        m.insert("smart_defaults".into(), json!(sd));
    }
    m.insert("ts".into(), json!(r.ts));
    let elements = match r.elements {
        ElementsPayload::Tree(els) => Value::Array(els.iter().map(compact_element).collect()),
        ElementsPayload::Flat(els) => Value::Array(els.iter().map(compact_flat_element).collect()),
    };
    m.insert("elements".into(), elements);
    Value::Object(m)
}

// ── YAML 1.1 boolean-word key unquoting ────────────────────────────────────

const YAML_BOOL_WORDS: &[&str] = &["y", "n", "yes", "no", "on", "off", "true", "false"];

/// serde_yaml quotes any map key that would otherwise parse as a YAML 1.1 boolean; strip those
/// quotes back off per the required wire-format quirk.
fn unquote_yaml_bool_keys(yaml: &str) -> String {
    yaml.lines()
        .map(|line| {
            let trimmed_start = line.len() - line.trim_start().len();
            let (indent, rest) = line.split_at(trimmed_start);
            if let Some(body) = rest.strip_prefix('"') {
                if let Some(end) = body.find('"') {
                    let key = &body[..end];
                    let after = &body[end + 1..];
                    if after.starts_with(':') && YAML_BOOL_WORDS.contains(&key.to_lowercase().as_str()) {
                        return format!("{indent}{key}{after}");
                    }
                }
            }
            line.to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_yaml<T: Serialize>(value: &T) -> Result<String, crate::error::AxError> {
    let raw = serde_yaml::to_string(value)?;
    Ok(unquote_yaml_bool_keys(&raw))
}

pub fn render_json(value: &Value, pretty: bool) -> Result<String, crate::error::AxError> {
    if pretty {
        Ok(serde_json::to_string_pretty(value)?)
    } else {
        Ok(serde_json::to_string(value)?)
    }
}

pub fn render_read(r: &ReadResult, format: Format, pretty: bool) -> Result<String, crate::error::AxError> {
    let value = read_result_to_value(r);
    match format {
        Format::Yaml => render_yaml(&value),
        _ => render_json(&value, pretty),
    }
}

/// Screenshot-combined format (§4.8): an `image` (base64 blob + mime) alongside an `elements`
/// string in agent format. Annotating the image with id labels is the external screenshot
/// collaborator's job (§9 design note); this just assembles the envelope.
pub fn render_screenshot_combined(
    header: &str,
    tree: &[Element],
    cap: Option<usize>,
    image_b64: &str,
    mime: &str,
    pretty: bool,
) -> Result<String, crate::error::AxError> {
    let elements = render_agent(header, tree, cap);
    let value = json!({ "image": image_b64, "mime": mime, "elements": elements });
    render_json(&value, pretty)
}

pub fn render_action(a: &ActionResult, format: Format, pretty: bool) -> Result<String, crate::error::AxError> {
    match format {
        Format::Yaml => render_yaml(a),
        _ => {
            let value = serde_json::to_value(a)?;
            render_json(&value, pretty)
        }
    }
}

// ── Agent format ────────────────────────────────────────────────────────

fn agent_label(e: &FlatElement) -> (String, bool) {
    match e.title.clone().filter(|s| !s.is_empty()) {
        Some(t) => (t, false),
        None => match e.description.clone().filter(|s| !s.is_empty()) {
            Some(d) => (d, false),
            None => (e.value.clone().unwrap_or_default(), true),
        },
    }
}

fn agent_line(e: &FlatElement) -> String {
    let (label, label_is_value) = agent_label(e);
    let id_part = match &e.reference {
        Some(r) => format!("{}|{}", e.id, r),
        None => e.id.to_string(),
    };
    let mut line = format!(
        "[{}] {} \"{}\" ({},{},{},{})",
        id_part, e.role.as_str(), label, e.bounds.x, e.bounds.y, e.bounds.w, e.bounds.h
    );

    if e.is_display_text() {
        line.push_str(" display");
    }
    if e.enabled == Some(false) {
        line.push_str(" disabled");
    }
    if e.selected {
        line.push_str(" selected");
    }
    if e.focused {
        line.push_str(" focused");
    }
    let is_check_like = matches!(e.role, crate::model::RoleCode::Chk | crate::model::RoleCode::Toggle);
    if is_check_like {
        match e.value.as_deref() {
            Some("1") => line.push_str(" checked"),
            Some("0") => line.push_str(" unchecked"),
            _ => {}
        }
    } else if !label_is_value {
        if let Some(v) = e.value.as_deref().filter(|v| !v.is_empty()) {
            line.push_str(&format!(" val=\"{v}\""));
        }
    }
    line
}

/// Only interactive and display-text elements are emitted; zero-dimension elements are dropped.
pub fn render_agent(
    header: &str,
    tree: &[Element],
    cap: Option<usize>,
) -> String {
    let flat = crate::model::flatten(tree);
    let mut emitted: Vec<&FlatElement> = flat
        .iter()
        .filter(|e| !e.bounds.is_zero_dimension() && (e.is_interactive() || e.is_display_text()))
        .collect();

    let total = emitted.len();
    let mut out = String::new();
    out.push_str(header);
    out.push('\n');

    let limit = cap.unwrap_or(total);
    if emitted.len() > limit {
        emitted.truncate(limit);
    }
    for e in &emitted {
        out.push_str(&agent_line(e));
        out.push('\n');
    }
    if total > limit {
        out.push_str(&format!(
            "# ... {} more elements omitted; narrow with --roles/--text/--bbox\n",
            total - limit
        ));
    }
    out
}

pub fn agent_cap_for(tree: &[Element], raw_mode: bool, max_elements: Option<usize>) -> Option<usize> {
    if raw_mode {
        return max_elements;
    }
    Some(max_elements.unwrap_or_else(|| {
        if has_web_content(tree) { DEFAULT_AGENT_CAP } else { usize::MAX }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bounds, RoleCode};

    fn btn(id: u32, title: &str, b: Bounds) -> Element {
        Element {
            id,
            role: RoleCode::Btn,
            subrole: None,
            title: Some(title.to_string()),
            value: None,
            description: None,
            bounds: b,
            focused: false,
            enabled: None,
            selected: false,
            actions: vec!["press".into()],
            reference: None,
            children: vec![],
        }
    }

    #[test]
    fn agent_format_drops_zero_dimension_elements() {
        let tree = vec![
            btn(1, "a", Bounds { x: 0, y: 0, w: 10, h: 10 }),
            btn(2, "b", Bounds { x: 0, y: 0, w: 0, h: 10 }),
        ];
        let out = render_agent("# header", &tree, None);
        assert!(out.contains("[1]"));
        assert!(!out.contains("[2]"));
    }

    #[test]
    fn unquote_yaml_bool_keys_strips_quotes_on_boolish_keys() {
        let yaml = "\"on\": true\nother: 1\n";
        let fixed = unquote_yaml_bool_keys(yaml);
        assert_eq!(fixed, "on: true\nother: 1");
    }
}
