//! Batch Interpreter for the `do` verb (C9): parses a YAML sequence of regular and conditional
//! steps and executes them against a shared context with stop-on-error and try-absorption
//! semantics (§4.9).

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use serde_yaml::Value as YValue;

use crate::actions::{self, PostActionOptions};
use crate::cli::{TargetingArgs, current_focused, parse_roles, resolve_target, resolve_target_context, role_from_short};
use crate::encoder::ActionResult;
use crate::error::AxError;
use crate::filter;
use crate::launch;
use crate::model::{FlatElement, ReadOptions, flatten};
use crate::platform::{AxProvider, MouseButton};
use crate::poller::{self, AssertProperty, AssertTarget, WaitCondition};
use crate::resolver::{self, Resolved, TextQuery};

const ACTION_KEYS: &[&str] = &[
    "click", "type", "action", "set-value", "scroll", "drag", "hover", "wait", "assert", "fill",
    "focus", "open", "read", "sleep",
];

/// Per-step parameter map, mirroring the CLI flags of the verb it stands in for (§6.3).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StepParams {
    pub app: Option<String>,
    pub window: Option<String>,
    pub text: Option<String>,
    pub id: Option<u32>,
    pub roles: Vec<String>,
    pub exact: bool,
    pub scope_id: Option<u32>,
    pub no_auto_scope: bool,
    pub near: Option<String>,
    pub near_direction: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub button: Option<String>,
    pub double: bool,
    pub value: Option<String>,
    pub key: Option<String>,
    pub delay_ms_per_char: Option<u64>,
    pub target: Option<String>,
    pub name: Option<String>,
    pub direction: Option<String>,
    pub amount: Option<u32>,
    pub from_x: Option<f64>,
    pub from_y: Option<f64>,
    pub to_x: Option<f64>,
    pub to_y: Option<f64>,
    pub duration_ms: Option<u64>,
    pub for_text: Option<String>,
    pub for_role: Option<String>,
    pub for_id: Option<u32>,
    pub gone: bool,
    pub timeout_s: Option<f64>,
    pub interval_ms: Option<u64>,
    pub property: Option<String>,
    pub url: Option<String>,
    pub browser: Option<String>,
    pub depth: Option<usize>,
    pub ms: Option<u64>,
}

/// A step of the `do` AST: regular action, or one of the three conditional shapes (§9 design note).
#[derive(Debug, Clone)]
pub enum Step {
    Regular { action: String, params: StepParams },
    IfExists { params: StepParams, then: Vec<Step>, or_else: Option<Vec<Step>> },
    IfFocused { params: StepParams, then: Vec<Step>, or_else: Option<Vec<Step>> },
    Try { steps: Vec<Step> },
}

fn map_get<'a>(map: &'a serde_yaml::Mapping, key: &str) -> Option<&'a YValue> {
    map.get(&YValue::String(key.to_string()))
}

fn params_from(v: &YValue) -> Result<StepParams, AxError> {
    if v.is_null() {
        return Ok(StepParams::default());
    }
    Ok(serde_yaml::from_value(v.clone())?)
}

fn parse_step(item: &YValue) -> Result<Step, AxError> {
    let map = item
        .as_mapping()
        .ok_or_else(|| AxError::InvalidArgument("each `do` step must be a YAML mapping".into()))?;

    if let Some(v) = map_get(map, "try") {
        return Ok(Step::Try { steps: parse_steps_value(v)? });
    }
    if let Some(v) = map_get(map, "if-exists") {
        let params = params_from(v)?;
        let then = map_get(map, "then").map(parse_steps_value).transpose()?.unwrap_or_default();
        let or_else = map_get(map, "else").map(parse_steps_value).transpose()?;
        return Ok(Step::IfExists { params, then, or_else });
    }
    if let Some(v) = map_get(map, "if-focused") {
        let params = params_from(v)?;
        let then = map_get(map, "then").map(parse_steps_value).transpose()?.unwrap_or_default();
        let or_else = map_get(map, "else").map(parse_steps_value).transpose()?;
        return Ok(Step::IfFocused { params, then, or_else });
    }
    for key in ACTION_KEYS {
        if let Some(v) = map_get(map, key) {
            return Ok(Step::Regular { action: (*key).to_string(), params: params_from(v)? });
        }
    }
    Err(AxError::InvalidArgument("step has no recognized action key".into()))
}

fn parse_steps_value(value: &YValue) -> Result<Vec<Step>, AxError> {
    let seq = value
        .as_sequence()
        .ok_or_else(|| AxError::InvalidArgument("expected a YAML sequence of steps".into()))?;
    seq.iter().map(parse_step).collect()
}

/// Parse the `do` stdin payload (a YAML array of step objects, §6.3).
pub fn parse_steps(text: &str) -> Result<Vec<Step>, AxError> {
    let value: YValue = serde_yaml::from_str(text)?;
    parse_steps_value(&value)
}

// ── Execution ───────────────────────────────────────────────────────────────

struct BatchCtx<'a> {
    provider: &'a dyn AxProvider,
    app_default: Option<String>,
    window_default: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub step: usize,
    pub action: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub substeps: Option<Vec<StepResult>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub ok: bool,
    pub completed: usize,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub results: Vec<StepResult>,
}

/// Run `steps` under a shared context. Never fails outright: every step failure is captured in
/// its `StepResult`, and the overall `ok`/`completed` fields summarize them (§4.9).
pub fn run(
    provider: &dyn AxProvider,
    steps: &[Step],
    app_default: Option<String>,
    window_default: Option<String>,
    stop_on_error: bool,
) -> BatchResult {
    let ctx = BatchCtx { provider, app_default, window_default };
    let (results, has_failure) = run_steps(&ctx, steps, stop_on_error);
    let total = steps.len();
    let completed = if has_failure { results.iter().filter(|r| r.ok).count() } else { total };
    BatchResult { ok: !has_failure, completed, total, error: None, results }
}

fn run_steps(ctx: &BatchCtx, steps: &[Step], stop_on_error: bool) -> (Vec<StepResult>, bool) {
    let mut results = Vec::new();
    let mut has_failure = false;
    for (i, step) in steps.iter().enumerate() {
        let idx = i + 1;
        let result = exec_step(ctx, idx, step, stop_on_error);
        if !result.ok {
            has_failure = true;
            results.push(result);
            if stop_on_error {
                break;
            }
        } else {
            results.push(result);
        }
    }
    (results, has_failure)
}

fn exec_step(ctx: &BatchCtx, idx: usize, step: &Step, stop_on_error: bool) -> StepResult {
    match step {
        Step::Regular { action, params } => step_result_from_action(idx, action, run_regular(ctx, action, params)),

        // `try` always reports success; inner failures are absorbed under `substeps` (§4.9).
        Step::Try { steps } => {
            let (substeps, _) = run_steps(ctx, steps, true);
            StepResult {
                step: idx,
                action: "try".into(),
                ok: true,
                error: None,
                extra: Default::default(),
                matched: None,
                branch: None,
                substeps: Some(substeps),
            }
        }

        Step::IfExists { params, then, or_else } => {
            let matched = eval_if_exists(ctx, params);
            run_conditional(ctx, idx, "if-exists", matched, then, or_else, stop_on_error)
        }

        Step::IfFocused { params, then, or_else } => {
            let matched = eval_if_focused(ctx, params);
            run_conditional(ctx, idx, "if-focused", matched, then, or_else, stop_on_error)
        }
    }
}

fn run_conditional(
    ctx: &BatchCtx,
    idx: usize,
    action: &str,
    matched: bool,
    then: &[Step],
    or_else: &Option<Vec<Step>>,
    stop_on_error: bool,
) -> StepResult {
    let (branch_steps, branch_name): (&[Step], Option<String>) = if matched {
        (then, Some("then".to_string()))
    } else if let Some(e) = or_else {
        (e.as_slice(), Some("else".to_string()))
    } else {
        (&[], None)
    };
    let (substeps, inner_failure) = run_steps(ctx, branch_steps, stop_on_error);
    StepResult {
        step: idx,
        action: action.to_string(),
        ok: !inner_failure,
        error: None,
        extra: Default::default(),
        matched: Some(matched),
        branch: branch_name,
        substeps: Some(substeps),
    }
}

fn step_result_from_action(idx: usize, action: &str, result: ActionResult) -> StepResult {
    let ok = result.ok;
    let error = result.error.clone();
    let mut extra = serde_json::Map::new();
    if let Value::Object(map) = serde_json::to_value(&result).unwrap_or_else(|_| json!({})) {
        for (k, v) in map {
            if k != "ok" && k != "action" && k != "error" {
                extra.insert(k, v);
            }
        }
    }
    StepResult { step: idx, action: action.to_string(), ok, error, extra, matched: None, branch: None, substeps: None }
}

fn own_text_matches(e: &FlatElement, query: &str) -> bool {
    let q = query.to_lowercase();
    [e.title.as_deref(), e.value.as_deref(), e.description.as_deref()]
        .into_iter()
        .flatten()
        .any(|s| s.to_lowercase().contains(&q))
}

fn targeting(ctx: &BatchCtx, p: &StepParams) -> TargetingArgs {
    TargetingArgs {
        app: p.app.clone().or_else(|| ctx.app_default.clone()),
        window: p.window.clone().or_else(|| ctx.window_default.clone()),
        window_id: None,
        pid: None,
        id: p.id,
        text: p.text.clone(),
        roles: p.roles.clone(),
        exact: p.exact,
        scope_id: p.scope_id,
        no_auto_scope: p.no_auto_scope,
    }
}

/// `if-exists`: matched when the resolver finds one-or-more elements (ambiguity still counts).
fn eval_if_exists(ctx: &BatchCtx, params: &StepParams) -> bool {
    let t = targeting(ctx, params);
    let Ok(tctx) = resolve_target_context(ctx.provider, &t) else { return false };
    if let Some(id) = params.id {
        return !matches!(resolver::resolve_by_id(&tctx.tree, id), Resolved::None);
    }
    let roles = parse_roles(&params.roles).unwrap_or_default();
    let q = TextQuery {
        query: params.text.clone().unwrap_or_default(),
        roles,
        exact: params.exact,
        scope_id: params.scope_id,
        no_auto_scope: params.no_auto_scope,
        near: None,
        near_direction: None,
    };
    !matches!(resolver::resolve_by_text(&tctx.tree, tctx.window_bounds, None, &q), Resolved::None)
}

/// `if-focused`: matched when the deepest currently-focused element satisfies the supplied
/// id/role/text filters.
fn eval_if_focused(ctx: &BatchCtx, params: &StepParams) -> bool {
    let t = targeting(ctx, params);
    let Ok(tctx) = resolve_target_context(ctx.provider, &t) else { return false };
    let Some(focused) = current_focused(&tctx) else { return false };
    if let Some(id) = params.id {
        if focused.id != id {
            return false;
        }
    }
    if !params.roles.is_empty() {
        let roles = parse_roles(&params.roles).unwrap_or_default();
        if !roles.contains(&focused.role) {
            return false;
        }
    }
    if let Some(text) = &params.text {
        if !own_text_matches(&focused, text) {
            return false;
        }
    }
    true
}

fn run_regular(ctx: &BatchCtx, action: &str, params: &StepParams) -> ActionResult {
    match action {
        "click" => exec_click(ctx, params),
        "type" => exec_type(ctx, params),
        "action" => exec_action(ctx, params),
        "set-value" => exec_set_value(ctx, params),
        "scroll" => exec_scroll(ctx, params),
        "drag" => exec_drag(ctx, params),
        "hover" => exec_hover(ctx, params),
        "wait" => exec_wait(ctx, params),
        "assert" => exec_assert(ctx, params),
        "fill" => exec_fill(ctx, params),
        "focus" => exec_focus(ctx, params),
        "open" => exec_open(params),
        "read" => exec_read(ctx, params),
        "sleep" => {
            std::thread::sleep(std::time::Duration::from_millis(params.ms.unwrap_or(0)));
            ActionResult::ok("sleep")
        }
        other => ActionResult::failed(other, "unknown `do` step action"),
    }
}

fn exec_click(ctx: &BatchCtx, params: &StepParams) -> ActionResult {
    let button = params.button.as_deref().unwrap_or("left");
    let Some(btn) = MouseButton::parse(button) else {
        return ActionResult::failed("click", &format!("unknown button '{button}'"));
    };
    let t = targeting(ctx, params);
    let tctx = match resolve_target_context(ctx.provider, &t) {
        Ok(c) => c,
        Err(e) => return ActionResult::from_error("click", &e),
    };
    let clicks = if params.double { 2 } else { 1 };
    match (params.x, params.y, params.id, &params.text) {
        (Some(x), Some(y), None, None) => match ctx.provider.mouse_click(x, y, btn, clicks) {
            Ok(()) => ActionResult::ok("click").with_extra("point", json!([x, y])),
            Err(e) => ActionResult::from_error("click", &e),
        },
        _ => {
            let focused = current_focused(&tctx);
            match resolve_target(&tctx, &t, params.near.as_deref(), params.near_direction.as_deref(), focused.as_ref()) {
                Ok(target) => actions::click(ctx.provider, &tctx.scope, &target, btn, clicks, &PostActionOptions::default()),
                Err(e) => ActionResult::from_error("click", &e),
            }
        }
    }
}

fn exec_type(ctx: &BatchCtx, params: &StepParams) -> ActionResult {
    let t = targeting(ctx, params);
    let tctx = match resolve_target_context(ctx.provider, &t) {
        Ok(c) => c,
        Err(e) => return ActionResult::from_error("type", &e),
    };
    let target_el = match &params.target {
        Some(label) => {
            let q = TextQuery { query: label.clone(), ..Default::default() };
            let resolved = resolver::resolve_by_text(&tctx.tree, tctx.window_bounds, None, &q);
            match resolver::to_result(resolved, label, "window") {
                Ok(e) => Some(e),
                Err(e) => return ActionResult::from_error("type", &e),
            }
        }
        None => None,
    };

    let mut result = if let Some(txt) = &params.text {
        actions::type_text(
            ctx.provider,
            &tctx.scope,
            target_el.as_ref(),
            tctx.app_name.as_deref(),
            txt,
            params.delay_ms_per_char.unwrap_or(0),
            &PostActionOptions::default(),
        )
    } else {
        ActionResult::ok("type")
    };

    if result.ok {
        if let Some(k) = &params.key {
            let key_result = actions::key_combo(ctx.provider, k);
            if !key_result.ok || params.text.is_none() {
                result = key_result;
            }
        }
    }
    // §8 scenario 6: `target` reflects the pre-type resolution, not post-key focus.
    if let Some(t) = &target_el {
        result.target = Some(t.clone());
    }
    result
}

fn exec_action(ctx: &BatchCtx, params: &StepParams) -> ActionResult {
    let t = targeting(ctx, params);
    let tctx = match resolve_target_context(ctx.provider, &t) {
        Ok(c) => c,
        Err(e) => return ActionResult::from_error("action", &e),
    };
    let focused = current_focused(&tctx);
    match resolve_target(&tctx, &t, None, None, focused.as_ref()) {
        Ok(target) => actions::perform_named_action(
            ctx.provider,
            &tctx.scope,
            &target,
            params.name.as_deref().unwrap_or("press"),
            &PostActionOptions::default(),
        ),
        Err(e) => ActionResult::from_error("action", &e),
    }
}

fn exec_set_value(ctx: &BatchCtx, params: &StepParams) -> ActionResult {
    let t = targeting(ctx, params);
    let tctx = match resolve_target_context(ctx.provider, &t) {
        Ok(c) => c,
        Err(e) => return ActionResult::from_error("set-value", &e),
    };
    let focused = current_focused(&tctx);
    match resolve_target(&tctx, &t, None, None, focused.as_ref()) {
        Ok(target) => {
            actions::set_value(ctx.provider, &tctx.scope, &target, params.value.as_deref().unwrap_or(""), &PostActionOptions::default())
        }
        Err(e) => ActionResult::from_error("set-value", &e),
    }
}

fn exec_scroll(ctx: &BatchCtx, params: &StepParams) -> ActionResult {
    let direction = params.direction.clone().unwrap_or_default();
    let amount = params.amount.unwrap_or(1) as i32;
    let (dx, dy) = match direction.to_lowercase().as_str() {
        "up" => (0, amount),
        "down" => (0, -amount),
        "left" => (amount, 0),
        "right" => (-amount, 0),
        other => return ActionResult::failed("scroll", &format!("unknown scroll direction '{other}'")),
    };
    let t = targeting(ctx, params);
    let (px, py) = match (params.x, params.y) {
        (Some(x), Some(y)) => (x, y),
        _ => {
            let tctx = match resolve_target_context(ctx.provider, &t) {
                Ok(c) => c,
                Err(e) => return ActionResult::from_error("scroll", &e),
            };
            let focused = current_focused(&tctx);
            match resolve_target(&tctx, &t, None, None, focused.as_ref()) {
                Ok(target) => target.bounds.center(),
                Err(e) => return ActionResult::from_error("scroll", &e),
            }
        }
    };
    actions::scroll(ctx.provider, px, py, dy, dx)
}

fn exec_drag(ctx: &BatchCtx, params: &StepParams) -> ActionResult {
    let button = params.button.as_deref().unwrap_or("left");
    let Some(btn) = MouseButton::parse(button) else {
        return ActionResult::failed("drag", &format!("unknown button '{button}'"));
    };
    let (Some(fx), Some(fy), Some(tx), Some(ty)) = (params.from_x, params.from_y, params.to_x, params.to_y) else {
        return ActionResult::failed("drag", "drag requires from_x/from_y/to_x/to_y");
    };
    actions::drag(ctx.provider, (fx, fy), (tx, ty), btn, params.duration_ms.unwrap_or(100))
}

fn exec_hover(ctx: &BatchCtx, params: &StepParams) -> ActionResult {
    let (px, py) = match (params.x, params.y) {
        (Some(x), Some(y)) => (x, y),
        _ => {
            let t = targeting(ctx, params);
            let tctx = match resolve_target_context(ctx.provider, &t) {
                Ok(c) => c,
                Err(e) => return ActionResult::from_error("hover", &e),
            };
            let focused = current_focused(&tctx);
            match resolve_target(&tctx, &t, None, None, focused.as_ref()) {
                Ok(target) => target.bounds.center(),
                Err(e) => return ActionResult::from_error("hover", &e),
            }
        }
    };
    actions::hover(ctx.provider, px, py)
}

fn exec_focus(ctx: &BatchCtx, params: &StepParams) -> ActionResult {
    let t = targeting(ctx, params);
    let tctx = match resolve_target_context(ctx.provider, &t) {
        Ok(c) => c,
        Err(e) => return ActionResult::from_error("focus", &e),
    };
    let focused = current_focused(&tctx);
    match resolve_target(&tctx, &t, None, None, focused.as_ref()) {
        Ok(target) => actions::focus_element(ctx.provider, &tctx.scope, &target, &PostActionOptions::default()),
        Err(e) => ActionResult::from_error("focus", &e),
    }
}

fn exec_fill(ctx: &BatchCtx, params: &StepParams) -> ActionResult {
    let t = targeting(ctx, params);
    let tctx = match resolve_target_context(ctx.provider, &t) {
        Ok(c) => c,
        Err(e) => return ActionResult::from_error("fill", &e),
    };
    let focused = current_focused(&tctx);
    match resolve_target(&tctx, &t, None, None, focused.as_ref()) {
        Ok(target) => actions::type_text(
            ctx.provider,
            &tctx.scope,
            Some(&target),
            tctx.app_name.as_deref(),
            params.value.as_deref().unwrap_or(""),
            0,
            &PostActionOptions::default(),
        ),
        Err(e) => ActionResult::from_error("fill", &e),
    }
}

fn exec_open(params: &StepParams) -> ActionResult {
    let result = match (&params.app, &params.url) {
        (_, Some(url)) => launch::open_url(url, params.browser.as_deref()),
        (Some(app), None) => launch::launch_app(app),
        (None, None) => Err(AxError::InvalidArgument("open requires an app name or url".into())),
    };
    match result {
        Ok(()) => ActionResult::ok("open"),
        Err(e) => ActionResult::from_error("open", &e),
    }
}

fn exec_wait(ctx: &BatchCtx, params: &StepParams) -> ActionResult {
    let t = targeting(ctx, params);
    let tctx = match resolve_target_context(ctx.provider, &t) {
        Ok(c) => c,
        Err(e) => return ActionResult::from_error("wait", &e),
    };
    let condition = WaitCondition {
        for_text: params.for_text.clone(),
        for_role: params.for_role.as_deref().and_then(role_from_short),
        for_id: params.for_id,
        gone: params.gone,
    };
    match poller::wait(ctx.provider, &tctx.scope, &condition, params.timeout_s.unwrap_or(10.0), params.interval_ms.unwrap_or(500)) {
        Ok(poller::WaitOutcome::Present(e)) => {
            let mut r = ActionResult::ok("wait").with_extra("matched", json!(true));
            r.target = Some(e);
            r
        }
        Ok(poller::WaitOutcome::Absent) => ActionResult::ok("wait").with_extra("matched", json!(false)),
        Err(e) => ActionResult::from_error("wait", &e),
    }
}

fn exec_assert(ctx: &BatchCtx, params: &StepParams) -> ActionResult {
    let t = targeting(ctx, params);
    let tctx = match resolve_target_context(ctx.provider, &t) {
        Ok(c) => c,
        Err(e) => return ActionResult::from_error("assert", &e),
    };
    let Some(prop) = params.property.as_deref().and_then(AssertProperty::parse) else {
        return ActionResult::failed("assert", "unknown or missing property");
    };
    let target = match params.id {
        Some(id) => AssertTarget::ById(id),
        None => {
            let roles = match parse_roles(&params.roles) {
                Ok(r) => r,
                Err(e) => return ActionResult::from_error("assert", &e),
            };
            AssertTarget::ByText(TextQuery {
                query: params.text.clone().unwrap_or_default(),
                roles,
                exact: params.exact,
                scope_id: params.scope_id,
                no_auto_scope: params.no_auto_scope,
                near: None,
                near_direction: None,
            })
        }
    };
    match poller::assert(
        ctx.provider,
        &tctx.scope,
        tctx.window_bounds,
        &target,
        prop,
        params.value.as_deref(),
        params.timeout_s.unwrap_or(0.0),
        params.interval_ms.unwrap_or(500),
    ) {
        Ok(()) => ActionResult::ok("assert"),
        Err(e) => ActionResult::from_error("assert", &e),
    }
}

fn exec_read(ctx: &BatchCtx, params: &StepParams) -> ActionResult {
    let t = targeting(ctx, params);
    let tctx = match resolve_target_context(ctx.provider, &t) {
        Ok(c) => c,
        Err(e) => return ActionResult::from_error("read", &e),
    };
    let roles = match parse_roles(&params.roles) {
        Ok(r) => r,
        Err(e) => return ActionResult::from_error("read", &e),
    };
    let opts = ReadOptions { roles, depth: params.depth.unwrap_or(0), visible_only: true, ..Default::default() };
    let tree = filter::filter(tctx.tree, &opts);
    let flat = flatten(&tree);
    ActionResult::ok("read")
        .with_extra("count", json!(flat.len()))
        .with_extra("elements", serde_json::to_value(&flat).unwrap_or_else(|_| json!([])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AxError;
    use crate::model::{Element, Scope, Window};

    struct Dummy;
    impl AxProvider for Dummy {
        fn ensure_trusted(&self) -> Result<(), AxError> {
            Ok(())
        }
        fn list_windows(&self) -> Result<Vec<Window>, AxError> {
            Ok(vec![])
        }
        fn read_elements(&self, _s: &Scope, _d: usize) -> Result<Vec<Element>, AxError> {
            Ok(vec![])
        }
        fn perform_action(&self, _s: &Scope, _i: u32, _a: &str) -> Result<(), AxError> {
            Ok(())
        }
        fn set_attribute(&self, _s: &Scope, _i: u32, _a: &str, _v: &str) -> Result<(), AxError> {
            Ok(())
        }
        fn raise_window(&self, _s: &Scope) -> Result<(), AxError> {
            Ok(())
        }
        fn ensure_enhanced_ui(&self, _s: &Scope) -> Result<(), AxError> {
            Ok(())
        }
        fn resolve_app(&self, _n: Option<&str>) -> Result<i32, AxError> {
            Ok(0)
        }
        fn mouse_move(&self, _x: f64, _y: f64) -> Result<(), AxError> {
            Ok(())
        }
        fn mouse_click(&self, _x: f64, _y: f64, _b: MouseButton, _c: u32) -> Result<(), AxError> {
            Ok(())
        }
        fn scroll(&self, _x: f64, _y: f64, _dy: i32, _dx: i32) -> Result<(), AxError> {
            Ok(())
        }
        fn drag(&self, _f: (f64, f64), _t: (f64, f64), _b: MouseButton, _d: u64) -> Result<(), AxError> {
            Ok(())
        }
        fn type_text(&self, _t: &str, _d: u64) -> Result<(), AxError> {
            Ok(())
        }
        fn key_combo(&self, _c: &str) -> Result<(), AxError> {
            Ok(())
        }
    }

    const BATCH_YAML: &str = r#"
- try:
    - click:
        text: "Dismiss"
- if-exists:
    text: "Accept Cookies"
  then:
    - click:
        text: "Accept Cookies"
- sleep:
    ms: 1
"#;

    #[test]
    fn try_step_absorbs_failure() {
        let steps = parse_steps(BATCH_YAML).expect("parses");
        assert_eq!(steps.len(), 3);
        let result = run(&Dummy, &steps, None, None, true);
        assert!(result.ok);
        assert_eq!(result.total, 3);
        assert_eq!(result.completed, 3);

        let try_result = &result.results[0];
        assert!(try_result.ok);
        let substeps = try_result.substeps.as_ref().expect("try has substeps");
        assert_eq!(substeps.len(), 1);
        assert!(!substeps[0].ok, "inner click against an empty tree should fail");

        let if_exists = &result.results[1];
        assert_eq!(if_exists.matched, Some(false));
        assert_eq!(if_exists.branch, None);
        assert!(if_exists.substeps.as_ref().unwrap().is_empty());

        assert!(result.results[2].ok);
    }

    #[test]
    fn stop_on_error_halts_remaining_regular_steps() {
        let yaml = r#"
- click: { text: "Missing" }
- sleep: { ms: 1 }
"#;
        let steps = parse_steps(yaml).unwrap();
        let result = run(&Dummy, &steps, None, None, true);
        assert!(!result.ok);
        assert_eq!(result.results.len(), 1, "second step never runs when stop_on_error is set");
    }

    #[test]
    fn continues_past_failures_when_stop_on_error_is_false() {
        let yaml = r#"
- click: { text: "Missing" }
- sleep: { ms: 1 }
"#;
        let steps = parse_steps(yaml).unwrap();
        let result = run(&Dummy, &steps, None, None, false);
        assert!(!result.ok);
        assert_eq!(result.results.len(), 2);
        assert!(result.results[1].ok);
    }
}
