//! C11 Command Surface: per-verb option parsing and default wiring between user flags and
//! the Resolver (C5), Action Executors (C6), and Poller (C7). Thin by design (§2).

use std::io::{IsTerminal, Read as _};

use clap::{Args, Parser, Subcommand};
use serde_json::json;

use crate::actions::{self, PostActionOptions};
use crate::batch;
use crate::clipboard;
use crate::encoder::{self, ActionResult, ElementsPayload, Format, ReadResult, SmartDefaults};
use crate::error::AxError;
use crate::filter;
use crate::launch;
use crate::model::{Bounds, Element, FlatElement, ReadOptions, RoleCode, Scope, flatten, generate_refs};
use crate::platform::{self, AxProvider, MouseButton};
use crate::poller::{self, AssertProperty, AssertTarget, ObserveOptions, WaitCondition};
use crate::post_action;
use crate::resolver::{self, NearDirection, TextQuery};
use crate::screenshot::{self, CaptureScope, ImageFormat};

#[derive(Debug, Parser)]
#[command(name = "axctl", about = "Accessibility-tree inspector and input-event driver for AI agents")]
pub struct Cli {
    #[command(subcommand)]
    pub verb: Verb,
}

#[derive(Debug, Clone, Args)]
pub struct TargetingArgs {
    #[arg(long)]
    pub app: Option<String>,
    #[arg(long)]
    pub window: Option<String>,
    #[arg(long = "window-id")]
    pub window_id: Option<u32>,
    #[arg(long)]
    pub pid: Option<i32>,
    #[arg(long)]
    pub id: Option<u32>,
    #[arg(long)]
    pub text: Option<String>,
    #[arg(long, value_delimiter = ',')]
    pub roles: Vec<String>,
    #[arg(long)]
    pub exact: bool,
    #[arg(long = "scope-id")]
    pub scope_id: Option<u32>,
    #[arg(long = "no-auto-scope")]
    pub no_auto_scope: bool,
}

#[derive(Debug, Clone, Args)]
pub struct OutputArgs {
    #[arg(long)]
    pub format: Option<String>,
    #[arg(long)]
    pub pretty: bool,
    #[arg(long)]
    pub raw: bool,
    #[arg(long = "max-elements")]
    pub max_elements: Option<usize>,
}

#[derive(Debug, Clone, Args)]
pub struct ActionArgs {
    #[arg(long = "post-read-delay", default_value_t = 0)]
    pub post_read_delay_ms: u64,
    #[arg(long = "post-read-max-elements")]
    pub post_read_max_elements: Option<usize>,
    #[arg(long = "no-display")]
    pub no_display: bool,
}

#[derive(Debug, Subcommand)]
pub enum Verb {
    List {
        #[command(flatten)]
        targeting: TargetingArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    Read {
        #[command(flatten)]
        targeting: TargetingArgs,
        #[command(flatten)]
        output: OutputArgs,
        #[arg(long)]
        flat: bool,
        #[arg(long, default_value_t = 0)]
        depth: usize,
    },
    Click {
        #[command(flatten)]
        targeting: TargetingArgs,
        #[command(flatten)]
        output: OutputArgs,
        #[command(flatten)]
        action: ActionArgs,
        #[arg(long, default_value = "left")]
        button: String,
        #[arg(long)]
        double: bool,
        #[arg(long)]
        x: Option<f64>,
        #[arg(long)]
        y: Option<f64>,
        #[arg(long)]
        near: Option<String>,
        #[arg(long = "near-direction")]
        near_direction: Option<String>,
    },
    Type {
        #[command(flatten)]
        targeting: TargetingArgs,
        #[command(flatten)]
        output: OutputArgs,
        #[command(flatten)]
        action: ActionArgs,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        key: Option<String>,
        #[arg(long = "delay-ms-per-char", default_value_t = 0)]
        delay_ms_per_char: u64,
        /// Text/label of a field to resolve and click-to-focus before typing.
        #[arg(long)]
        target: Option<String>,
    },
    Action {
        #[command(flatten)]
        targeting: TargetingArgs,
        #[command(flatten)]
        output: OutputArgs,
        #[command(flatten)]
        action: ActionArgs,
        #[arg(long = "name", default_value = "press")]
        name: String,
    },
    SetValue {
        #[command(flatten)]
        targeting: TargetingArgs,
        #[command(flatten)]
        output: OutputArgs,
        #[command(flatten)]
        action: ActionArgs,
        #[arg(long)]
        value: String,
        #[arg(long, default_value = "value")]
        attribute: String,
    },
    Scroll {
        #[command(flatten)]
        targeting: TargetingArgs,
        #[command(flatten)]
        output: OutputArgs,
        #[arg(long)]
        direction: String,
        #[arg(long, default_value_t = 1)]
        amount: u32,
        #[arg(long)]
        x: Option<f64>,
        #[arg(long)]
        y: Option<f64>,
    },
    Drag {
        #[command(flatten)]
        targeting: TargetingArgs,
        #[arg(long = "from-x")]
        from_x: f64,
        #[arg(long = "from-y")]
        from_y: f64,
        #[arg(long = "to-x")]
        to_x: f64,
        #[arg(long = "to-y")]
        to_y: f64,
        #[arg(long, default_value = "left")]
        button: String,
        #[arg(long = "duration-ms", default_value_t = 100)]
        duration_ms: u64,
    },
    Hover {
        #[command(flatten)]
        targeting: TargetingArgs,
        #[arg(long)]
        x: Option<f64>,
        #[arg(long)]
        y: Option<f64>,
    },
    Focus {
        #[command(flatten)]
        targeting: TargetingArgs,
        #[command(flatten)]
        output: OutputArgs,
        #[command(flatten)]
        action: ActionArgs,
    },
    Open {
        app: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        browser: Option<String>,
    },
    Wait {
        #[command(flatten)]
        targeting: TargetingArgs,
        #[arg(long = "for-text")]
        for_text: Option<String>,
        #[arg(long = "for-role")]
        for_role: Option<String>,
        #[arg(long = "for-id")]
        for_id: Option<u32>,
        #[arg(long)]
        gone: bool,
        #[arg(long = "timeout-s", default_value_t = 10.0)]
        timeout_s: f64,
        #[arg(long = "interval-ms", default_value_t = 500)]
        interval_ms: u64,
    },
    Observe {
        #[command(flatten)]
        targeting: TargetingArgs,
        #[arg(long = "interval-ms", default_value_t = 500)]
        interval_ms: u64,
        #[arg(long = "duration-s", default_value_t = 0)]
        duration_s: u64,
        #[arg(long = "ignore-bounds")]
        ignore_bounds: bool,
        #[arg(long = "ignore-focus")]
        ignore_focus: bool,
    },
    Assert {
        #[command(flatten)]
        targeting: TargetingArgs,
        #[arg(long)]
        property: String,
        #[arg(long)]
        value: Option<String>,
        #[arg(long = "timeout-s", default_value_t = 0.0)]
        timeout_s: f64,
        #[arg(long = "interval-ms", default_value_t = 500)]
        interval_ms: u64,
    },
    Find {
        #[command(flatten)]
        targeting: TargetingArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    Fill {
        #[command(flatten)]
        targeting: TargetingArgs,
        #[command(flatten)]
        output: OutputArgs,
        #[command(flatten)]
        action: ActionArgs,
        #[arg(long)]
        value: String,
    },
    Clipboard {
        #[command(subcommand)]
        op: ClipboardOp,
    },
    Screenshot {
        #[arg(long = "window-id")]
        window_id: Option<u32>,
        #[arg(long)]
        display: Option<u32>,
        #[arg(long, default_value_t = 1.0)]
        scale: f64,
        #[arg(long, default_value = "png")]
        format: String,
        #[arg(long)]
        quality: Option<u8>,
        #[arg(long = "include-menubar")]
        include_menubar: bool,
        #[arg(long)]
        x: Option<i32>,
        #[arg(long)]
        y: Option<i32>,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
    },
    Do {
        #[command(flatten)]
        targeting: TargetingArgs,
        #[arg(long = "stop-on-error", default_value_t = true)]
        stop_on_error: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum ClipboardOp {
    Read,
    Write { text: String },
    Clear,
    /// Grab the clipboard as a single read-and-return (the agent-facing alias for `read`).
    Grab,
}

// ── Shared targeting resolution ───────────────────────────────────────────

/// Resolved scope for a single invocation: the provider `Scope` used for reads/actions, the
/// tree to resolve against (already narrowed to one window when the app has several), and the
/// bounds/app/pid metadata the encoder and resolver need.
pub struct TargetContext {
    pub scope: Scope,
    pub tree: Vec<Element>,
    pub window_bounds: Bounds,
    pub app_name: Option<String>,
    pub pid: i32,
    pub window_title: Option<String>,
}

/// Builds the provider `Scope`, reads its tree, and narrows to a single window when the
/// targeting args (or the app having multiple windows) require picking one.
///
/// Multi-window tie-break (SPEC_FULL §9 open question): prefer the window matching
/// `--window`/`--window-id`, else the currently focused window, else enumeration order — see
/// DESIGN.md's Open Question decisions.
pub fn resolve_target_context(provider: &dyn AxProvider, t: &TargetingArgs) -> Result<TargetContext, AxError> {
    let scope = if let Some(wid) = t.window_id {
        Scope::WindowId(wid)
    } else if let Some(pid) = t.pid {
        Scope::Pid(pid)
    } else if let Some(name) = &t.app {
        Scope::App(name.clone())
    } else {
        Scope::Pid(provider.resolve_app(None)?)
    };

    let windows = provider.list_windows()?;
    let pid = match &scope {
        Scope::Pid(p) => *p,
        Scope::App(name) => provider.resolve_app(Some(name))?,
        Scope::WindowId(wid) => windows
            .iter()
            .find(|w| w.id == *wid)
            .map(|w| w.pid)
            .ok_or_else(|| AxError::NotFound { query: format!("window id {wid}"), scope: "windows".into() })?,
    };

    let _ = provider.ensure_enhanced_ui(&scope);
    let full_tree = provider.read_elements(&scope, 0)?;
    let app_name = windows.iter().find(|w| w.pid == pid).map(|w| w.app.clone());

    let window_children: Vec<&Element> = full_tree.iter().filter(|e| e.role == RoleCode::Window).collect();
    let chosen = if let Some(wid) = t.window_id {
        windows
            .iter()
            .find(|w| w.id == wid)
            .and_then(|w| window_children.iter().find(|e| e.title.as_deref() == Some(w.title.as_str())).copied())
    } else if let Some(substr) = &t.window {
        let needle = substr.to_lowercase();
        window_children.iter().find(|e| e.title.as_deref().unwrap_or("").to_lowercase().contains(&needle)).copied()
    } else {
        None
    };
    let chosen = chosen
        .or_else(|| window_children.iter().find(|e| e.focused).copied())
        .or_else(|| window_children.first().copied());

    let (tree, window_bounds, window_title) = match chosen {
        Some(w) => (vec![w.clone()], w.bounds, w.title.clone().filter(|s| !s.is_empty())),
        None => {
            let bounds = windows.iter().find(|w| w.pid == pid).map(|w| w.bounds).unwrap_or(Bounds::ZERO);
            (full_tree, bounds, None)
        }
    };

    Ok(TargetContext { scope, tree, window_bounds, app_name, pid, window_title })
}

pub(crate) fn parse_roles(raw: &[String]) -> Result<Vec<RoleCode>, AxError> {
    raw.iter()
        .map(|r| role_from_short(r).ok_or_else(|| AxError::InvalidArgument(format!("unknown role '{r}'"))))
        .collect()
}

pub(crate) fn role_from_short(s: &str) -> Option<RoleCode> {
    use RoleCode::*;
    Some(match s.to_lowercase().as_str() {
        "btn" => Btn,
        "txt" => Txt,
        "lnk" => Lnk,
        "img" => Img,
        "input" => Input,
        "chk" => Chk,
        "radio" => Radio,
        "menu" => Menu,
        "menuitem" => MenuItem,
        "tab" => Tab,
        "list" => List,
        "row" => Row,
        "cell" => Cell,
        "group" => Group,
        "scroll" => Scroll,
        "toolbar" => Toolbar,
        "web" => Web,
        "window" => Window,
        "other" => Other,
        "toggle" => Toggle,
        _ => return None,
    })
}

/// Resolve `--id`/`--text` against an already-scoped tree into a single `FlatElement`.
pub fn resolve_target(
    ctx: &TargetContext,
    t: &TargetingArgs,
    near: Option<&str>,
    near_direction: Option<&str>,
    focused: Option<&FlatElement>,
) -> Result<FlatElement, AxError> {
    if let Some(id) = t.id {
        return resolver::to_result(resolver::resolve_by_id(&ctx.tree, id), &id.to_string(), "tree");
    }
    let text = t
        .text
        .clone()
        .ok_or_else(|| AxError::InvalidArgument("requires --id or --text (or --x/--y coordinates)".into()))?;
    let roles = parse_roles(&t.roles)?;
    let q = TextQuery {
        query: text.clone(),
        roles,
        exact: t.exact,
        scope_id: t.scope_id,
        no_auto_scope: t.no_auto_scope,
        near: near.map(|s| s.to_string()),
        near_direction: near_direction.and_then(NearDirection::parse),
    };
    let resolved = resolver::resolve_by_text(&ctx.tree, ctx.window_bounds, focused, &q);
    resolver::to_result(resolved, &text, ctx.window_title.as_deref().unwrap_or("window"))
}

pub(crate) fn current_focused(ctx: &TargetContext) -> Option<FlatElement> {
    flatten(&ctx.tree).into_iter().filter(|e| e.focused).max_by_key(|e| e.path.len())
}

fn post_action_opts(a: &ActionArgs) -> PostActionOptions {
    PostActionOptions {
        capture_display: !a.no_display,
        max_display: a.post_read_max_elements.unwrap_or(post_action::DEFAULT_MAX_DISPLAY),
        delay_ms: a.post_read_delay_ms,
    }
}

// ── Format resolution (C8 smart defaults) ─────────────────────────────────

fn resolve_format(raw: Option<&str>, raw_mode: bool, smart: &mut SmartDefaults) -> Result<Format, AxError> {
    if let Some(f) = raw {
        return Format::parse(f).ok_or_else(|| AxError::InvalidArgument(format!("unknown format '{f}'")));
    }
    if !raw_mode && !std::io::stdout().is_terminal() {
        smart.format_defaulted_to_agent = true;
        return Ok(Format::Agent);
    }
    Ok(Format::Json)
}

fn apply_smart_defaults(tree: Vec<Element>, raw_mode: bool, smart: &mut SmartDefaults, roles: &mut Vec<RoleCode>) -> Vec<Element> {
    if raw_mode {
        return tree;
    }
    let web = filter::has_web_content(&tree);
    if web {
        if !roles.is_empty() && roles.contains(&RoleCode::Input) && !roles.contains(&RoleCode::Other) {
            roles.push(RoleCode::Other);
            smart.web_roles_expanded = true;
        }
        smart.web_pruned = true;
        return filter::prune_empty_groups(tree);
    }
    tree
}

// ── Verb handlers ──────────────────────────────────────────────────────────

fn print_action(a: &ActionResult, format: Format, pretty: bool) -> String {
    encoder::render_action(a, format, pretty).unwrap_or_else(|e| format!("{{\"ok\":false,\"error\":{:?}}}", e.to_string()))
}

fn run_list_or_read(
    provider: &dyn AxProvider,
    t: &TargetingArgs,
    out: &OutputArgs,
    flat: bool,
    depth: usize,
) -> Result<(String, i32), AxError> {
    let mut ctx = resolve_target_context(provider, t)?;
    let mut smart = SmartDefaults::default();
    let mut roles = parse_roles(&t.roles)?;

    ctx.tree = apply_smart_defaults(ctx.tree, out.raw, &mut smart, &mut roles);

    let mut opts = ReadOptions {
        app: t.app.clone(),
        window_title_substring: t.window.clone(),
        window_id: t.window_id,
        pid: t.pid,
        depth,
        roles,
        text: t.text.clone(),
        flat,
        visible_only: true,
        raw_mode: out.raw,
        ..Default::default()
    };
    if let Some(b) = out.max_elements {
        smart.element_cap_applied = Some(b);
    }

    let mut tree = filter::filter(ctx.tree, &opts);
    if let Some(q) = &opts.text {
        tree = filter::filter_by_text(tree, q, flat);
    }
    generate_refs(&mut tree);
    opts.text = None;

    let format = resolve_format(out.format.as_deref(), out.raw, &mut smart)?;
    let flat_elements = flatten(&tree);

    let header = format!(
        "# {} - {} (pid: {})",
        ctx.window_title.as_deref().unwrap_or("(no window)"),
        ctx.app_name.as_deref().unwrap_or("?"),
        ctx.pid
    );
    let body = if format == Format::Agent {
        let cap = encoder::agent_cap_for(&tree, out.raw, out.max_elements);
        encoder::render_agent(&header, &tree, cap)
    } else if format == Format::Screenshot {
        let cap = encoder::agent_cap_for(&tree, out.raw, out.max_elements);
        let scope = screenshot::CaptureScope::Region {
            x: ctx.window_bounds.x as i32,
            y: ctx.window_bounds.y as i32,
            width: ctx.window_bounds.w as u32,
            height: ctx.window_bounds.h as u32,
        };
        let (img_b64, mime) = screenshot::capture_base64(scope, 1.0, screenshot::ImageFormat::Png, None, false)?;
        encoder::render_screenshot_combined(&header, &tree, cap, &img_b64, mime, out.pretty)?
    } else {
        let result = ReadResult {
            app: ctx.app_name.clone(),
            pid: Some(ctx.pid),
            window: ctx.window_title.clone(),
            smart_defaults: smart.summary(),
            ts: now_ts(),
            elements: if flat { ElementsPayload::Flat(&flat_elements) } else { ElementsPayload::Tree(&tree) },
        };
        encoder::render_read(&result, format, out.pretty)?
    };
    Ok((body, 0))
}

fn now_ts() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn parse_format_for_action(out: &OutputArgs) -> Result<Format, AxError> {
    let mut smart = SmartDefaults::default();
    resolve_format(out.format.as_deref(), out.raw, &mut smart)
}

fn run_action_like(
    provider: &dyn AxProvider,
    t: &TargetingArgs,
    out: &OutputArgs,
    run: impl FnOnce(&TargetContext) -> ActionResult,
) -> Result<(String, i32), AxError> {
    let ctx = resolve_target_context(provider, t)?;
    let result = run(&ctx);
    let code = if result.ok { 0 } else { 1 };
    let format = parse_format_for_action(out)?;
    Ok((print_action(&result, format, out.pretty), code))
}

pub fn run() -> i32 {
    let cli = Cli::parse();
    let provider = platform::provider();
    let (output, code) = dispatch(&*provider, cli.verb).unwrap_or_else(|e| {
        (print_action(&ActionResult::from_error("error", &e), Format::Json, false), 1)
    });
    println!("{output}");
    code
}

fn dispatch(provider: &dyn AxProvider, verb: Verb) -> Result<(String, i32), AxError> {
    match verb {
        Verb::List { targeting, output } => run_list_or_read(provider, &targeting, &output, true, 0),
        Verb::Read { targeting, output, flat, depth } => run_list_or_read(provider, &targeting, &output, flat, depth),

        Verb::Click { targeting, output, action, button, double, x, y, near, near_direction } => {
            let ctx = resolve_target_context(provider, &targeting)?;
            let btn = MouseButton::parse(&button)
                .ok_or_else(|| AxError::InvalidArgument(format!("unknown button '{button}'")))?;
            let clicks = if double { 2 } else { 1 };
            let opts = post_action_opts(&action);
            let result = match (targeting.id, &targeting.text, x, y) {
                (None, None, Some(x), Some(y)) => {
                    match provider.mouse_click(x, y, btn, clicks) {
                        Ok(()) => ActionResult::ok("click").with_extra("point", json!([x, y])),
                        Err(e) => ActionResult::from_error("click", &e),
                    }
                }
                _ => {
                    let focused = current_focused(&ctx);
                    let target = resolve_target(&ctx, &targeting, near.as_deref(), near_direction.as_deref(), focused.as_ref())?;
                    actions::click(provider, &ctx.scope, &target, btn, clicks, &opts)
                }
            };
            let code = if result.ok { 0 } else { 1 };
            Ok((print_action(&result, parse_format_for_action(&output)?, output.pretty), code))
        }

        Verb::Type { targeting, output, action, text, key, delay_ms_per_char, target } => {
            let ctx = resolve_target_context(provider, &targeting)?;
            let opts = post_action_opts(&action);
            let target_el = match &target {
                Some(label) => {
                    let q = TextQuery { query: label.clone(), ..Default::default() };
                    let resolved = resolver::resolve_by_text(&ctx.tree, ctx.window_bounds, None, &q);
                    Some(resolver::to_result(resolved, label, "window")?)
                }
                None => None,
            };

            let mut result = if let Some(t) = &text {
                actions::type_text(provider, &ctx.scope, target_el.as_ref(), ctx.app_name.as_deref(), t, delay_ms_per_char, &opts)
            } else {
                ActionResult::ok("type")
            };

            if result.ok {
                if let Some(k) = &key {
                    let key_result = actions::key_combo(provider, k);
                    if !key_result.ok {
                        result = key_result;
                    } else if text.is_none() {
                        result = key_result;
                    }
                }
            }
            // §8 scenario 6: `target` must reflect the pre-type resolution, not the post-key focus.
            if let Some(t) = &target_el {
                result.target = Some(t.clone());
            }
            let code = if result.ok { 0 } else { 1 };
            Ok((print_action(&result, parse_format_for_action(&output)?, output.pretty), code))
        }

        Verb::Action { targeting, output, action, name } => {
            run_action_like(provider, &targeting, &output, |ctx| {
                let focused = current_focused(ctx);
                match resolve_target(ctx, &targeting, None, None, focused.as_ref()) {
                    Ok(target) => actions::perform_named_action(provider, &ctx.scope, &target, &name, &post_action_opts(&action)),
                    Err(e) => ActionResult::from_error("action", &e),
                }
            })
        }

        Verb::SetValue { targeting, output, action, value, attribute: _ } => {
            run_action_like(provider, &targeting, &output, |ctx| {
                let focused = current_focused(ctx);
                match resolve_target(ctx, &targeting, None, None, focused.as_ref()) {
                    Ok(target) => actions::set_value(provider, &ctx.scope, &target, &value, &post_action_opts(&action)),
                    Err(e) => ActionResult::from_error("set-value", &e),
                }
            })
        }

        Verb::Scroll { targeting, output, direction, amount, x, y } => {
            let ctx = resolve_target_context(provider, &targeting)?;
            let (dx, dy) = match direction.to_lowercase().as_str() {
                "up" => (0, amount as i32),
                "down" => (0, -(amount as i32)),
                "left" => (amount as i32, 0),
                "right" => (-(amount as i32), 0),
                other => return Err(AxError::InvalidArgument(format!("unknown scroll direction '{other}'"))),
            };
            let (px, py) = match (x, y, targeting.text.clone(), targeting.id) {
                (Some(x), Some(y), _, _) => (x, y),
                _ => {
                    let focused = current_focused(&ctx);
                    let target = resolve_target(&ctx, &targeting, None, None, focused.as_ref())?;
                    target.bounds.center()
                }
            };
            let result = actions::scroll(provider, px, py, dy, dx);
            let code = if result.ok { 0 } else { 1 };
            Ok((print_action(&result, parse_format_for_action(&output)?, output.pretty), code))
        }

        Verb::Drag { targeting: _, from_x, from_y, to_x, to_y, button, duration_ms } => {
            let btn = MouseButton::parse(&button).ok_or_else(|| AxError::InvalidArgument(format!("unknown button '{button}'")))?;
            let result = actions::drag(provider, (from_x, from_y), (to_x, to_y), btn, duration_ms);
            let code = if result.ok { 0 } else { 1 };
            Ok((print_action(&result, Format::Json, false), code))
        }

        Verb::Hover { targeting, x, y } => {
            let (px, py) = match (x, y) {
                (Some(x), Some(y)) => (x, y),
                _ => {
                    let ctx = resolve_target_context(provider, &targeting)?;
                    let focused = current_focused(&ctx);
                    let target = resolve_target(&ctx, &targeting, None, None, focused.as_ref())?;
                    target.bounds.center()
                }
            };
            let result = actions::hover(provider, px, py);
            let code = if result.ok { 0 } else { 1 };
            Ok((print_action(&result, Format::Json, false), code))
        }

        Verb::Focus { targeting, output, action } => {
            run_action_like(provider, &targeting, &output, |ctx| {
                let focused = current_focused(ctx);
                match resolve_target(ctx, &targeting, None, None, focused.as_ref()) {
                    Ok(target) => actions::focus_element(provider, &ctx.scope, &target, &post_action_opts(&action)),
                    Err(e) => ActionResult::from_error("focus", &e),
                }
            })
        }

        Verb::Open { app, url, browser } => {
            let result = match (app, url) {
                (_, Some(url)) => launch::open_url(&url, browser.as_deref()).map(|()| "open".to_string()),
                (Some(app), None) => launch::launch_app(&app).map(|()| "open".to_string()),
                (None, None) => Err(AxError::InvalidArgument("open requires an app name or --url".into())),
            };
            match result {
                Ok(action) => Ok((print_action(&ActionResult::ok(&action), Format::Json, false), 0)),
                Err(e) => Ok((print_action(&ActionResult::from_error("open", &e), Format::Json, false), 1)),
            }
        }

        Verb::Wait { targeting, for_text, for_role, for_id, gone, timeout_s, interval_ms } => {
            let ctx = resolve_target_context(provider, &targeting)?;
            let condition = WaitCondition {
                for_text,
                for_role: for_role.as_deref().and_then(role_from_short),
                for_id,
                gone,
            };
            match poller::wait(provider, &ctx.scope, &condition, timeout_s, interval_ms) {
                Ok(poller::WaitOutcome::Present(e)) => {
                    let mut result = ActionResult::ok("wait").with_extra("matched", json!(true));
                    result.target = Some(e);
                    Ok((print_action(&result, Format::Json, false), 0))
                }
                Ok(poller::WaitOutcome::Absent) => {
                    Ok((print_action(&ActionResult::ok("wait").with_extra("matched", json!(false)), Format::Json, false), 0))
                }
                Err(e) => Ok((print_action(&ActionResult::from_error("wait", &e), Format::Json, false), 1)),
            }
        }

        Verb::Observe { targeting, interval_ms, duration_s, ignore_bounds, ignore_focus } => {
            let ctx = resolve_target_context(provider, &targeting)?;
            let roles = parse_roles(&targeting.roles)?;
            let opts = ObserveOptions { interval_ms, duration_s, roles, ignore_bounds, ignore_focus };
            let mut stdout = std::io::stdout();
            poller::observe(provider, &ctx.scope, &opts, &mut stdout)?;
            Ok((String::new(), 0))
        }

        Verb::Assert { targeting, property, value, timeout_s, interval_ms } => {
            let ctx = resolve_target_context(provider, &targeting)?;
            let prop = AssertProperty::parse(&property).ok_or_else(|| AxError::InvalidArgument(format!("unknown property '{property}'")))?;
            let target = match targeting.id {
                Some(id) => AssertTarget::ById(id),
                None => {
                    let roles = parse_roles(&targeting.roles)?;
                    AssertTarget::ByText(TextQuery {
                        query: targeting.text.clone().unwrap_or_default(),
                        roles,
                        exact: targeting.exact,
                        scope_id: targeting.scope_id,
                        no_auto_scope: targeting.no_auto_scope,
                        near: None,
                        near_direction: None,
                    })
                }
            };
            match poller::assert(provider, &ctx.scope, ctx.window_bounds, &target, prop, value.as_deref(), timeout_s, interval_ms) {
                Ok(()) => Ok((print_action(&ActionResult::ok("assert"), Format::Json, false), 0)),
                Err(e) => Ok((print_action(&ActionResult::from_error("assert", &e), Format::Json, false), 1)),
            }
        }

        Verb::Find { targeting, output } => {
            let ctx = resolve_target_context(provider, &targeting)?;
            let focused = current_focused(&ctx);
            match resolve_target(&ctx, &targeting, None, None, focused.as_ref()) {
                Ok(target) => {
                    let result = ActionResult { target: Some(target), ..ActionResult::ok("find") };
                    Ok((print_action(&result, parse_format_for_action(&output)?, output.pretty), 0))
                }
                Err(e) => Ok((print_action(&ActionResult::from_error("find", &e), Format::Json, false), 1)),
            }
        }

        Verb::Fill { targeting, output, action, value } => {
            run_action_like(provider, &targeting, &output, |ctx| {
                let focused = current_focused(ctx);
                match resolve_target(ctx, &targeting, None, None, focused.as_ref()) {
                    Ok(target) => actions::type_text(provider, &ctx.scope, Some(&target), ctx.app_name.as_deref(), &value, 0, &post_action_opts(&action)),
                    Err(e) => ActionResult::from_error("fill", &e),
                }
            })
        }

        Verb::Clipboard { op } => {
            let result = match op {
                ClipboardOp::Read | ClipboardOp::Grab => clipboard::read().map(|text| ActionResult::ok("clipboard-read").with_extra("text", json!(text))),
                ClipboardOp::Write { text } => clipboard::write(&text).map(|()| ActionResult::ok("clipboard-write")),
                ClipboardOp::Clear => clipboard::clear().map(|()| ActionResult::ok("clipboard-clear")),
            };
            match result {
                Ok(r) => Ok((print_action(&r, Format::Json, false), 0)),
                Err(e) => Ok((print_action(&ActionResult::from_error("clipboard", &e), Format::Json, false), 1)),
            }
        }

        Verb::Screenshot { window_id, display, scale, format, quality, include_menubar, x, y, width, height } => {
            let img_format = ImageFormat::parse(&format).ok_or_else(|| AxError::InvalidArgument(format!("unknown image format '{format}'")))?;
            let scope = match (window_id, x, y, width, height) {
                (Some(id), _, _, _, _) => CaptureScope::Window { window_id: id },
                (None, Some(x), Some(y), Some(w), Some(h)) => CaptureScope::Region { x, y, width: w, height: h },
                _ => CaptureScope::Screen { display_id: display },
            };
            match screenshot::capture_base64(scope, scale, img_format, quality, include_menubar) {
                Ok((b64, mime)) => {
                    let result = ActionResult::ok("screenshot").with_extra("image", json!(b64)).with_extra("mime", json!(mime));
                    Ok((print_action(&result, Format::Json, false), 0))
                }
                Err(e) => Ok((print_action(&ActionResult::from_error("screenshot", &e), Format::Json, false), 1)),
            }
        }

        Verb::Do { targeting, stop_on_error } => {
            let mut stdin_text = String::new();
            std::io::stdin().read_to_string(&mut stdin_text)?;
            let steps = batch::parse_steps(&stdin_text)?;
            let result = batch::run(provider, &steps, targeting.app.clone(), targeting.window.clone(), stop_on_error);
            let code = if result.ok { 0 } else { 1 };
            Ok((serde_json::to_string_pretty(&result)?, code))
        }
    }
}
