//! Polling primitives: `wait` (until present/absent), `observe` (streamed diffs),
//! `assert` (one-shot or polled property checks) (C7).

use std::io::Write;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde_json::{Value, json};

use crate::error::AxError;
use crate::model::{Bounds, Element, FlatElement, ReadOptions, RoleCode, Scope, TreeDiff, diff, flatten};
use crate::platform::AxProvider;
use crate::resolver::{self, Resolved, TextQuery};

fn now_ts() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

fn own_text_matches(e: &FlatElement, query: &str) -> bool {
    let q = query.to_lowercase();
    [e.title.as_deref(), e.value.as_deref(), e.description.as_deref()]
        .into_iter()
        .flatten()
        .any(|s| s.to_lowercase().contains(&q))
}

// ── wait ─────────────────────────────────────────────────────────────────

/// Conjunction of whichever fields are set; `gone` inverts the match (holds when absent).
#[derive(Debug, Clone, Default)]
pub struct WaitCondition {
    pub for_text: Option<String>,
    pub for_role: Option<RoleCode>,
    pub for_id: Option<u32>,
    pub gone: bool,
}

impl WaitCondition {
    fn find_match(&self, flat: &[FlatElement]) -> Option<FlatElement> {
        flat.iter()
            .find(|e| {
                self.for_id.is_none_or(|id| e.id == id)
                    && self.for_role.is_none_or(|r| e.role == r)
                    && self.for_text.as_deref().is_none_or(|t| own_text_matches(e, t))
            })
            .cloned()
    }
}

#[derive(Debug, Clone)]
pub enum WaitOutcome {
    Present(FlatElement),
    Absent,
}

fn summarize(flat: &[FlatElement]) -> String {
    let interactive = flat.iter().filter(|e| e.is_interactive()).count();
    format!("{} elements ({interactive} interactive)", flat.len())
}

/// Loop until the condition holds (or doesn't, when `gone`) or `timeout_s` elapses.
pub fn wait(
    provider: &dyn AxProvider,
    scope: &Scope,
    condition: &WaitCondition,
    timeout_s: f64,
    interval_ms: u64,
) -> Result<WaitOutcome, AxError> {
    let deadline = Instant::now() + Duration::from_secs_f64(timeout_s.max(0.0));
    loop {
        let tree = provider.read_elements(scope, 0).unwrap_or_default();
        let flat = flatten(&tree);
        let matched = condition.find_match(&flat);
        let holds = if condition.gone { matched.is_none() } else { matched.is_some() };

        if holds {
            return Ok(match matched {
                Some(e) => WaitOutcome::Present(e),
                None => WaitOutcome::Absent,
            });
        }
        if Instant::now() >= deadline {
            return Err(AxError::Timeout { last_state: summarize(&flat) });
        }
        thread::sleep(Duration::from_millis(interval_ms));
    }
}

// ── observe ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ObserveOptions {
    pub interval_ms: u64,
    /// 0 = unlimited; caller (or Ctrl-C) provides the real stop signal in that case.
    pub duration_s: u64,
    pub roles: Vec<RoleCode>,
    pub ignore_bounds: bool,
    pub ignore_focus: bool,
}

fn filter_by_roles(tree: Vec<Element>, roles: &[RoleCode]) -> Vec<Element> {
    if roles.is_empty() {
        return tree;
    }
    let opts = ReadOptions { roles: roles.to_vec(), ..Default::default() };
    crate::filter::filter(tree, &opts)
}

/// Strip ignored fields from each changed entry; an entry left with no changes is dropped
/// entirely rather than emitted as a no-op.
fn strip_ignored(d: &mut TreeDiff, ignore_bounds: bool, ignore_focus: bool) {
    d.changed.retain_mut(|c| {
        if ignore_bounds {
            c.changes.remove("b");
        }
        if ignore_focus {
            c.changes.remove("f");
        }
        !c.changes.is_empty()
    });
}

fn write_event(out: &mut dyn Write, v: &Value) -> Result<(), AxError> {
    writeln!(out, "{v}")?;
    out.flush()?;
    Ok(())
}

/// Emits an initial `snapshot` event, then one `added`/`removed`/`changed` event per tick's
/// diff against the previous flattened tree, and a final `done` event. Line-delimited JSON
/// regardless of the global `--format` choice, per §4.7.
pub fn observe(provider: &dyn AxProvider, scope: &Scope, opts: &ObserveOptions, out: &mut dyn Write) -> Result<(), AxError> {
    let start = Instant::now();
    let deadline = (opts.duration_s > 0).then(|| start + Duration::from_secs(opts.duration_s));
    let mut event_count = 0usize;
    let mut prev: Option<Vec<FlatElement>> = None;

    loop {
        match provider.read_elements(scope, 0) {
            Ok(tree) => {
                let filtered = filter_by_roles(tree, &opts.roles);
                let flat = flatten(&filtered);
                match prev.take() {
                    None => {
                        write_event(out, &json!({"type": "snapshot", "ts": now_ts(), "count": flat.len()}))?;
                        event_count += 1;
                    }
                    Some(p) => {
                        let mut d = diff(&p, &flat);
                        strip_ignored(&mut d, opts.ignore_bounds, opts.ignore_focus);
                        for a in &d.added {
                            write_event(out, &json!({"type": "added", "ts": now_ts(), "element": a}))?;
                            event_count += 1;
                        }
                        for r in &d.removed {
                            write_event(out, &json!({"type": "removed", "ts": now_ts(), "element": r}))?;
                            event_count += 1;
                        }
                        for c in &d.changed {
                            write_event(
                                out,
                                &json!({"type": "changed", "ts": now_ts(), "id": c.id, "role": c.role.as_str(), "title": c.title, "changes": c.changes}),
                            )?;
                            event_count += 1;
                        }
                    }
                }
                prev = Some(flat);
            }
            Err(e) => {
                write_event(out, &json!({"type": "error", "ts": now_ts(), "error": e.to_string()}))?;
                event_count += 1;
            }
        }

        if let Some(dl) = deadline {
            if Instant::now() >= dl {
                break;
            }
        }
        thread::sleep(Duration::from_millis(opts.interval_ms));
        if let Some(dl) = deadline {
            if Instant::now() >= dl {
                break;
            }
        }
    }

    write_event(out, &json!({"type": "done", "ts": now_ts(), "elapsed_s": start.elapsed().as_secs_f64(), "events": event_count}))?;
    Ok(())
}

// ── assert ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssertProperty {
    Exists,
    Gone,
    ValueEquals,
    ValueContains,
    Checked,
    Unchecked,
    Enabled,
    Disabled,
    Focused,
}

impl AssertProperty {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "exists" => Some(Self::Exists),
            "gone" => Some(Self::Gone),
            "value-equals" => Some(Self::ValueEquals),
            "value-contains" => Some(Self::ValueContains),
            "checked" => Some(Self::Checked),
            "unchecked" => Some(Self::Unchecked),
            "enabled" => Some(Self::Enabled),
            "disabled" => Some(Self::Disabled),
            "focused" => Some(Self::Focused),
            _ => None,
        }
    }
}

pub enum AssertTarget {
    ById(u32),
    ByText(TextQuery),
}

fn resolve_candidates(tree: &[Element], window_bounds: Bounds, target: &AssertTarget) -> Vec<FlatElement> {
    match target {
        AssertTarget::ById(id) => match resolver::resolve_by_id(tree, *id) {
            Resolved::One(e) => vec![e],
            _ => vec![],
        },
        AssertTarget::ByText(q) => match resolver::resolve_by_text(tree, window_bounds, None, q) {
            Resolved::One(e) => vec![e],
            Resolved::Many(v) => v,
            Resolved::None => vec![],
        },
    }
}

fn evaluate(candidates: &[FlatElement], property: AssertProperty, value: Option<&str>) -> (bool, String) {
    let first = candidates.first();
    match property {
        AssertProperty::Exists => (!candidates.is_empty(), "target not found".into()),
        AssertProperty::Gone => (candidates.is_empty(), "target still present".into()),
        AssertProperty::ValueEquals => match first {
            Some(e) => {
                let v = e.value.as_deref().unwrap_or("");
                let expect = value.unwrap_or("");
                (v == expect, format!("value '{v}' != '{expect}'"))
            }
            None => (false, "target not found".into()),
        },
        AssertProperty::ValueContains => match first {
            Some(e) => {
                let v = e.value.as_deref().unwrap_or("");
                let expect = value.unwrap_or("");
                (v.contains(expect), format!("value '{v}' does not contain '{expect}'"))
            }
            None => (false, "target not found".into()),
        },
        AssertProperty::Checked => match first {
            Some(e) => (e.value.as_deref() == Some("1"), "element is not checked".into()),
            None => (false, "target not found".into()),
        },
        AssertProperty::Unchecked => match first {
            Some(e) => (e.value.as_deref() == Some("0"), "element is not unchecked".into()),
            None => (false, "target not found".into()),
        },
        AssertProperty::Enabled => match first {
            Some(e) => (e.enabled != Some(false), "element is disabled".into()),
            None => (false, "target not found".into()),
        },
        AssertProperty::Disabled => match first {
            Some(e) => (e.enabled == Some(false), "element is enabled".into()),
            None => (false, "target not found".into()),
        },
        AssertProperty::Focused => match first {
            Some(e) => (e.focused, "element is not focused".into()),
            None => (false, "target not found".into()),
        },
    }
}

/// `timeout_s == 0` evaluates once; otherwise polls at `interval_ms` until the predicate
/// holds or the deadline passes.
pub fn assert(
    provider: &dyn AxProvider,
    scope: &Scope,
    window_bounds: Bounds,
    target: &AssertTarget,
    property: AssertProperty,
    value: Option<&str>,
    timeout_s: f64,
    interval_ms: u64,
) -> Result<(), AxError> {
    let deadline = (timeout_s > 0.0).then(|| Instant::now() + Duration::from_secs_f64(timeout_s));
    loop {
        let tree = provider.read_elements(scope, 0).unwrap_or_default();
        let candidates = resolve_candidates(&tree, window_bounds, target);
        let (passed, reason) = evaluate(&candidates, property, value);
        if passed {
            return Ok(());
        }
        match deadline {
            Some(dl) if Instant::now() < dl => thread::sleep(Duration::from_millis(interval_ms)),
            _ => return Err(AxError::Assertion { reason }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Bounds as B;

    fn txt(id: u32, value: &str) -> FlatElement {
        FlatElement {
            id,
            role: RoleCode::Txt,
            subrole: None,
            title: None,
            value: Some(value.to_string()),
            description: None,
            bounds: B { x: 0, y: 0, w: 10, h: 10 },
            focused: false,
            enabled: None,
            selected: false,
            actions: vec![],
            reference: None,
            path: vec![],
        }
    }

    #[test]
    fn wait_condition_gone_holds_when_absent() {
        let cond = WaitCondition { for_text: Some("ok".into()), gone: true, ..Default::default() };
        assert!(cond.find_match(&[txt(1, "nope")]).is_none());
    }

    #[test]
    fn strip_ignored_drops_bounds_only_change() {
        use crate::model::{ChangedElement, FieldChange};
        let mut d = TreeDiff::default();
        let mut changes = std::collections::HashMap::new();
        changes.insert("b".to_string(), FieldChange { before: "x".into(), after: "y".into() });
        d.changed.push(ChangedElement { id: 5, role: RoleCode::Txt, title: None, changes });
        strip_ignored(&mut d, true, false);
        assert!(d.changed.is_empty());
    }

    #[test]
    fn assert_exists_fails_without_timeout_when_absent() {
        struct Dummy;
        impl AxProvider for Dummy {
            fn ensure_trusted(&self) -> Result<(), AxError> { Ok(()) }
            fn list_windows(&self) -> Result<Vec<crate::model::Window>, AxError> { Ok(vec![]) }
            fn read_elements(&self, _s: &Scope, _d: usize) -> Result<Vec<Element>, AxError> { Ok(vec![]) }
            fn perform_action(&self, _s: &Scope, _i: u32, _a: &str) -> Result<(), AxError> { Ok(()) }
            fn set_attribute(&self, _s: &Scope, _i: u32, _a: &str, _v: &str) -> Result<(), AxError> { Ok(()) }
            fn raise_window(&self, _s: &Scope) -> Result<(), AxError> { Ok(()) }
            fn ensure_enhanced_ui(&self, _s: &Scope) -> Result<(), AxError> { Ok(()) }
            fn resolve_app(&self, _n: Option<&str>) -> Result<i32, AxError> { Ok(0) }
            fn mouse_move(&self, _x: f64, _y: f64) -> Result<(), AxError> { Ok(()) }
            fn mouse_click(&self, _x: f64, _y: f64, _b: crate::platform::MouseButton, _c: u32) -> Result<(), AxError> { Ok(()) }
            fn scroll(&self, _x: f64, _y: f64, _dy: i32, _dx: i32) -> Result<(), AxError> { Ok(()) }
            fn drag(&self, _f: (f64, f64), _t: (f64, f64), _b: crate::platform::MouseButton, _d: u64) -> Result<(), AxError> { Ok(()) }
            fn type_text(&self, _t: &str, _d: u64) -> Result<(), AxError> { Ok(()) }
            fn key_combo(&self, _c: &str) -> Result<(), AxError> { Ok(()) }
        }
        let target = AssertTarget::ById(1);
        let result = assert(&Dummy, &Scope::Pid(0), B::ZERO, &target, AssertProperty::Exists, None, 0.0, 50);
        assert!(result.is_err());
    }
}
