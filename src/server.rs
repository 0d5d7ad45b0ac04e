use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::callers::{CallerResolver, TestPathMatcher};
use crate::chains::CallChainBuilder;
use crate::config::load_config;
use crate::context::AnalysisContext;
use crate::graph::CallGraphAnalyzer;
use crate::model::{CallDirection, KindFilter};
use crate::resolver::Resolver;
use crate::scanner::read_file_lossy;
use crate::tiers::{SymbolQuery, TierMode, TierSelector};

pub struct ServerState {
    default_root: Option<PathBuf>,
    contexts: Mutex<HashMap<PathBuf, Arc<AnalysisContext>>>,
    in_flight: Mutex<HashMap<String, CancellationToken>>,
}

fn request_key(id: &Value) -> String {
    id.to_string()
}

fn str_arg<'v>(args: &'v Value, key: &str) -> Option<&'v str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn usize_arg(args: &Value, key: &str) -> Option<usize> {
    args.get(key).and_then(|v| v.as_u64()).map(|n| n as usize)
}

/// `file`/`line`/`column` when both `file` and `line` are given. Column
/// defaults to 1; positions past `u32::MAX` are rejected.
fn position_arg(args: &Value) -> std::result::Result<Option<(&str, u32, u32)>, String> {
    let (Some(file), Some(line)) = (str_arg(args, "file"), usize_arg(args, "line")) else {
        return Ok(None);
    };
    let line = u32::try_from(line).map_err(|_| format!("line {line} is out of range"))?;
    let column = usize_arg(args, "column").unwrap_or(1);
    let column = u32::try_from(column).map_err(|_| format!("column {column} is out of range"))?;
    Ok(Some((file, line, column)))
}

fn render<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\":\"serialization failed: {e}\"}}"))
}

fn not_found(message: String) -> String {
    render(&json!({ "found": false, "message": message }))
}

/// Routine query from `args[key]`; the `method` argument also honours
/// `containing_type`, `parameter_types` and a `file`/`line`/`column` position.
fn method_query(args: &Value, key: &str) -> Option<SymbolQuery> {
    let mut q = SymbolQuery::method(str_arg(args, key)?);
    if key != "method" {
        return Some(q);
    }
    if let Some(t) = str_arg(args, "containing_type") {
        q = q.in_type(t);
    }
    if let Some(types) = args.get("parameter_types").and_then(|v| v.as_array()) {
        q = q.with_parameters(types.iter().filter_map(|t| t.as_str().map(str::to_string)).collect());
    }
    if let Ok(Some((file, line, column))) = position_arg(args) {
        q = q.at(file, line, column);
    }
    Some(q)
}

fn rpc_error(id: Value, code: i64, message: String) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message }
    })
}

fn tool(name: &str, description: &str, properties: Value, required: &[&str]) -> Value {
    let mut props = json!({
        "repoPath": { "type": "string", "description": "Absolute path to the workspace root (defaults to the server root)" },
        "tier": { "type": "string", "enum": ["auto", "semantic", "syntax", "text"], "description": "Optional: force a resolution tier" }
    });
    if let (Some(base), Some(extra)) = (props.as_object_mut(), properties.as_object()) {
        base.extend(extra.clone());
    }
    json!({
        "name": name,
        "description": description,
        "inputSchema": { "type": "object", "properties": props, "required": required }
    })
}

fn method_props() -> Value {
    json!({
        "method": { "type": "string", "description": "Routine name, `Type.Method` or just `Method`" },
        "containing_type": { "type": "string", "description": "Optional: declaring type when `method` is unqualified" },
        "parameter_types": { "type": "array", "items": { "type": "string" }, "description": "Optional: parameter types to pick one overload" },
        "file": { "type": "string" },
        "line": { "type": "integer" },
        "column": { "type": "integer" }
    })
}

fn with_depth(mut props: Value) -> Value {
    if let Some(obj) = props.as_object_mut() {
        obj.insert(
            "max_depth".to_string(),
            json!({ "type": "integer", "description": "Optional: traversal depth (default from config, usually 10)" }),
        );
    }
    props
}

fn scope_props() -> Value {
    json!({
        "scope": { "type": "string", "description": "Optional: containing type, namespace or namespace prefix. Omit for the whole workspace." }
    })
}

fn between_props() -> Value {
    json!({
        "from": { "type": "string", "description": "Starting routine" },
        "to": { "type": "string", "description": "Destination routine" }
    })
}

impl ServerState {
    pub fn new(default_root: Option<PathBuf>) -> Self {
        Self {
            default_root,
            contexts: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Serve an already loaded context for `root`.
    pub fn with_context(root: PathBuf, ctx: Arc<AnalysisContext>) -> Self {
        let state = Self::new(Some(root.clone()));
        state.contexts.lock().insert(root, ctx);
        state
    }

    fn repo_root_from_params(&self, params: &Value) -> PathBuf {
        str_arg(params, "repoPath")
            .map(PathBuf::from)
            .or_else(|| self.default_root.clone())
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    fn context_for(&self, params: &Value) -> Result<(PathBuf, Arc<AnalysisContext>)> {
        let root = self.repo_root_from_params(params);
        if let Some(ctx) = self.contexts.lock().get(&root) {
            return Ok((root, Arc::clone(ctx)));
        }
        // Loaded without the lock; a racing load of the same root keeps the first.
        let cfg = load_config(&root);
        let ctx = AnalysisContext::load(&root, cfg)
            .with_context(|| format!("Failed to load workspace {}", root.display()))?;
        let ctx = Arc::clone(self.contexts.lock().entry(root.clone()).or_insert_with(|| Arc::new(ctx)));
        Ok((root, ctx))
    }

    fn register(&self, id: &Value) -> CancellationToken {
        let token = CancellationToken::new();
        self.in_flight.lock().insert(request_key(id), token.clone());
        token
    }

    fn finish(&self, key: &str) {
        self.in_flight.lock().remove(key);
    }

    /// Trip the token of an in-flight call. Unknown ids are ignored.
    fn cancel(&self, request_id: &Value) -> bool {
        match self.in_flight.lock().get(&request_key(request_id)) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn handle_notification(&self, method: &str, params: &Value) {
        if method == "notifications/cancelled" {
            if let Some(request_id) = params.get("requestId") {
                let hit = self.cancel(request_id);
                debug!(request = %request_id, in_flight = hit, "cancellation requested");
            }
        }
    }

    fn tool_list(&self, id: Value) -> Value {
        let mut callers_props = method_props();
        if let Some(o) = callers_props.as_object_mut() {
            o.insert(
                "include_indirect".into(),
                json!({ "type": "boolean", "description": "Optional: include interface/override callers (default true)" }),
            );
        }
        let mut chain_props = with_depth(method_props());
        if let Some(o) = chain_props.as_object_mut() {
            o.insert(
                "direction".into(),
                json!({ "type": "string", "enum": ["backward", "forward"], "description": "Optional: default backward" }),
            );
        }
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {
                "tools": [
                    tool(
                        "find_callers",
                        "Every call site that invokes a routine: direct calls, calls through interfaces and overrides, and method-group references, each with a confidence level.",
                        callers_props,
                        &["method"],
                    ),
                    tool(
                        "find_direct_callers",
                        "Only the direct, statically bound callers of a routine.",
                        method_props(),
                        &["method"],
                    ),
                    tool(
                        "analyze_call_patterns",
                        "Group a routine's call sites by caller type and expression shape, and flag calls made inside loops, async code and exception handlers.",
                        method_props(),
                        &["method"],
                    ),
                    tool(
                        "find_call_chains",
                        "Trace call chains to (backward) or from (forward) a routine up to a depth limit. Recursive loops are marked, never followed.",
                        chain_props,
                        &["method"],
                    ),
                    tool(
                        "find_recursive_call_chains",
                        "Forward call chains from a routine that loop back into themselves.",
                        with_depth(method_props()),
                        &["method"],
                    ),
                    tool(
                        "find_call_chains_between",
                        "Every call path from one routine to another, up to a depth limit.",
                        with_depth(between_props()),
                        &["from", "to"],
                    ),
                    tool(
                        "find_shortest_path",
                        "The call path with the fewest steps from one routine to another.",
                        between_props(),
                        &["from", "to"],
                    ),
                    tool(
                        "find_reachable_methods",
                        "Routines reachable from a start routine, grouped by call depth, plus every routine that is not reachable.",
                        with_depth(method_props()),
                        &["method"],
                    ),
                    tool(
                        "analyze_call_graph",
                        "Whole-scope call graph: entry points, leaf routines, circular dependencies and call depth statistics.",
                        scope_props(),
                        &[],
                    ),
                    tool(
                        "find_circular_dependencies",
                        "Call cycles within a scope, each reported once.",
                        scope_props(),
                        &[],
                    ),
                    tool(
                        "find_unused_methods",
                        "Routines nothing references. Virtual, abstract and override members are never reported.",
                        scope_props(),
                        &[],
                    ),
                    tool(
                        "find_test_only_methods",
                        "Routines referenced only from test code (paths matching the configured test patterns).",
                        scope_props(),
                        &[],
                    ),
                    tool(
                        "resolve_symbol",
                        "Resolve a name to its declarations through the semantic, syntax and text tiers, reporting which tier answered.",
                        json!({
                            "name": { "type": "string" },
                            "kind": { "type": "string", "enum": ["type", "method", "property", "field"] },
                            "containing_type": { "type": "string" },
                            "parameter_types": { "type": "array", "items": { "type": "string" } },
                            "file": { "type": "string" },
                            "line": { "type": "integer" },
                            "column": { "type": "integer" }
                        }),
                        &["name"],
                    ),
                    tool(
                        "workspace_health",
                        "Files loaded, parse health, the tier queries start at, and cache statistics.",
                        json!({}),
                        &[],
                    ),
                    tool(
                        "update_document",
                        "Replace a document's text (or re-read it from disk when `text` is omitted) and invalidate cached analysis.",
                        json!({
                            "path": { "type": "string", "description": "Workspace-relative path" },
                            "text": { "type": "string", "description": "Optional: new content" }
                        }),
                        &["path"],
                    )
                ]
            }
        })
    }

    pub fn tool_call(&self, id: Value, params: &Value, token: &CancellationToken) -> Value {
        let name = params.get("name").and_then(|n| n.as_str()).unwrap_or("");
        let args = params.get("arguments").cloned().unwrap_or(json!({}));

        let ok = |text: String| {
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": { "content": [{"type":"text","text": text }], "isError": false }
            })
        };

        let err = |msg: String| {
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": { "content": [{"type":"text","text": msg }], "isError": true }
            })
        };

        let (root, ctx) = match self.context_for(&args) {
            Ok(found) => found,
            Err(e) => return err(format!("{e:#}")),
        };
        let cfg = ctx.config().clone();
        let mode = match str_arg(&args, "tier") {
            Some(t) => match TierMode::parse(t) {
                Some(m) => m,
                None => return err(format!("Invalid tier `{t}` (expected auto, semantic, syntax or text)")),
            },
            None => cfg.engine.tier,
        };
        let max_depth = usize_arg(&args, "max_depth").unwrap_or(cfg.engine.default_max_depth);
        if max_depth == 0 {
            return err("max_depth must be at least 1".to_string());
        }
        if let Err(e) = position_arg(&args) {
            return err(e);
        }

        let snapshot = ctx.resolver();
        let resolver: &dyn Resolver = &*snapshot;
        let chains = || {
            CallChainBuilder::new(resolver, mode)
                .with_cancellation(token.clone())
                .with_max_paths(cfg.engine.max_paths)
        };
        let scope = str_arg(&args, "scope");

        match name {
            "find_callers" | "find_direct_callers" => {
                let Some(q) = method_query(&args, "method") else {
                    return err("Missing method".to_string());
                };
                let include_indirect = name == "find_callers"
                    && args.get("include_indirect").and_then(|v| v.as_bool()).unwrap_or(true);
                match CallerResolver::new(resolver, mode).find_callers(&q, include_indirect) {
                    Ok(Some(result)) => ok(render(&result)),
                    Ok(None) if include_indirect => ok(not_found(format!("no routine matches `{}`", q.name))),
                    Ok(None) => ok(not_found(format!("no direct callers of `{}`", q.name))),
                    Err(e) => err(format!("{name} failed: {e}")),
                }
            }
            "analyze_call_patterns" => {
                let Some(q) = method_query(&args, "method") else {
                    return err("Missing method".to_string());
                };
                match CallerResolver::new(resolver, mode).analyze_call_patterns(&q) {
                    Ok(Some(a)) => ok(render(&a)),
                    Ok(None) => ok(not_found(format!("no routine matches `{}`", q.name))),
                    Err(e) => err(format!("analyze_call_patterns failed: {e}")),
                }
            }
            "find_call_chains" => {
                let Some(q) = method_query(&args, "method") else {
                    return err("Missing method".to_string());
                };
                let direction = match str_arg(&args, "direction") {
                    Some(d) => match CallDirection::parse(d) {
                        Some(d) => d,
                        None => return err(format!("Invalid direction `{d}` (expected backward or forward)")),
                    },
                    None => CallDirection::Backward,
                };
                match chains().find_call_chains(&q, direction, max_depth) {
                    Ok(r) => ok(render(&r)),
                    Err(e) => err(format!("find_call_chains failed: {e}")),
                }
            }
            "find_recursive_call_chains" => {
                let Some(q) = method_query(&args, "method") else {
                    return err("Missing method".to_string());
                };
                match chains().find_recursive_call_chains(&q, max_depth) {
                    Ok(r) => ok(render(&r)),
                    Err(e) => err(format!("find_recursive_call_chains failed: {e}")),
                }
            }
            "find_call_chains_between" | "find_shortest_path" => {
                let (Some(from), Some(to)) = (method_query(&args, "from"), method_query(&args, "to")) else {
                    return err("Missing from or to".to_string());
                };
                let outcome = if name == "find_shortest_path" {
                    chains().find_shortest_path(&from, &to, cfg.engine.shortest_path_max_depth)
                } else {
                    chains().find_call_chains_between(&from, &to, max_depth)
                };
                match outcome {
                    Ok(r) => ok(render(&r)),
                    Err(e) => err(format!("{name} failed: {e}")),
                }
            }
            "find_reachable_methods" => {
                let Some(q) = method_query(&args, "method") else {
                    return err("Missing method".to_string());
                };
                match chains().find_reachable_methods(&q, max_depth) {
                    Ok(r) if r.start.is_none() => ok(not_found(format!("no routine matches `{}`", q.name))),
                    Ok(r) => ok(render(&r)),
                    Err(e) => err(format!("find_reachable_methods failed: {e}")),
                }
            }
            "analyze_call_graph" | "find_circular_dependencies" => {
                let analyzer = CallGraphAnalyzer::new(resolver, mode)
                    .with_max_paths(cfg.engine.max_paths)
                    .with_cancellation(token.clone());
                let outcome = if name == "analyze_call_graph" {
                    analyzer.analyze_call_graph(scope).map(|a| render(&a))
                } else {
                    analyzer.find_circular_dependencies(scope).map(|c| render(&c))
                };
                match outcome {
                    Ok(text) => ok(text),
                    Err(e) => err(format!("{name} failed: {e}")),
                }
            }
            "find_unused_methods" => match CallerResolver::new(resolver, mode).find_unused_methods(scope) {
                Ok(m) => ok(render(&json!({ "scope": scope, "count": m.len(), "methods": m }))),
                Err(e) => err(format!("find_unused_methods failed: {e}")),
            },
            "find_test_only_methods" => {
                let matcher = TestPathMatcher::new(&cfg.test_paths.patterns);
                match CallerResolver::new(resolver, mode).find_test_only_methods(scope, &matcher) {
                    Ok(m) => ok(render(&json!({ "scope": scope, "count": m.len(), "methods": m }))),
                    Err(e) => err(format!("find_test_only_methods failed: {e}")),
                }
            }
            "resolve_symbol" => {
                let Some(name) = str_arg(&args, "name") else {
                    return err("Missing name".to_string());
                };
                let mut q = SymbolQuery::named(name);
                if let Some(kind) = str_arg(&args, "kind") {
                    match serde_json::from_value::<KindFilter>(json!(kind.to_ascii_lowercase())) {
                        Ok(k) => q = q.of_kind(k),
                        Err(_) => return err(format!("Invalid kind `{kind}` (expected type, method, property or field)")),
                    }
                }
                if let Some(t) = str_arg(&args, "containing_type") {
                    q = q.in_type(t);
                }
                if let Some(types) = args.get("parameter_types").and_then(|v| v.as_array()) {
                    q = q.with_parameters(types.iter().filter_map(|t| t.as_str().map(str::to_string)).collect());
                }
                if let Ok(Some((file, line, column))) = position_arg(&args) {
                    q = q.at(file, line, column);
                }
                ok(render(&TierSelector::new(resolver, mode).resolve(&q)))
            }
            "workspace_health" => ok(render(&json!({
                "root": root.to_string_lossy(),
                "documents": ctx.document_count(),
                "health": resolver.health(),
                "tier": TierSelector::new(resolver, mode).select(),
                "cache": ctx.cache_stats(),
            }))),
            "update_document" => {
                let Some(path) = str_arg(&args, "path") else {
                    return err("Missing path".to_string());
                };
                if let Some(text) = args.get("text").and_then(|v| v.as_str()) {
                    let change = ctx.update_document(path, text);
                    return ok(render(&json!({ "path": path, "result": change })));
                }
                let abs = resolve_path(&root, path);
                if abs.is_file() {
                    match read_file_lossy(&abs) {
                        Ok(text) => {
                            let change = ctx.update_document(path, &text);
                            ok(render(&json!({ "path": path, "result": change })))
                        }
                        Err(e) => err(format!("{e:#}")),
                    }
                } else {
                    let removed = ctx.remove_document(path);
                    ok(render(&json!({ "path": path, "removed": removed })))
                }
            }
            _ => err(format!("Tool not found: {name}")),
        }
    }

    fn handle(&self, id: Value, method: &str, msg: &Value) -> Value {
        match method {
            "initialize" => json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "protocolVersion": msg.get("params").and_then(|p| p.get("protocolVersion")).cloned().unwrap_or(json!("2024-11-05")),
                    "capabilities": { "tools": { "listChanged": false } },
                    "serverInfo": { "name": "callsight", "version": env!("CARGO_PKG_VERSION") }
                }
            }),
            "ping" => json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {}
            }),
            "tools/list" => self.tool_list(id),
            // Resources and prompts are not served; answer with empty lists.
            "resources/list" => json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": { "resources": [] }
            }),
            "prompts/list" => json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": { "prompts": [] }
            }),
            _ => rpc_error(id, -32601, format!("Method not found: {method}")),
        }
    }
}

fn resolve_path(repo_root: &Path, p: &str) -> PathBuf {
    let pb = PathBuf::from(p);
    if pb.is_absolute() {
        pb
    } else {
        repo_root.join(pb)
    }
}

/// Run the stdio server until STDIN closes. Tool calls run on blocking tasks
/// so a `notifications/cancelled` can reach them while they work.
pub fn run_stdio_server(default_root: Option<PathBuf>) -> Result<()> {
    let rt = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    rt.block_on(serve(Arc::new(ServerState::new(default_root))))
}

async fn serve(state: Arc<ServerState>) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Value>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(reply) = rx.recv().await {
            let mut line = reply.to_string();
            line.push('\n');
            stdout.write_all(line.as_bytes()).await?;
            stdout.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    info!("callsight MCP server ready on stdio");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut calls = JoinSet::new();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let msg: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "dropping malformed message");
                continue;
            }
        };
        let method = msg.get("method").and_then(|m| m.as_str()).unwrap_or("").to_string();
        let params = msg.get("params").cloned().unwrap_or(json!({}));

        // JSON-RPC notifications have no "id" field; they never get a reply.
        let Some(id) = msg.get("id").cloned() else {
            state.handle_notification(&method, &params);
            continue;
        };

        if method != "tools/call" {
            let _ = tx.send(state.handle(id, &method, &msg));
            continue;
        }

        let token = state.register(&id);
        let state = Arc::clone(&state);
        let tx = tx.clone();
        calls.spawn(async move {
            let key = request_key(&id);
            let worker = Arc::clone(&state);
            let worker_id = id.clone();
            let reply = match tokio::task::spawn_blocking(move || worker.tool_call(worker_id, &params, &token)).await {
                Ok(reply) => reply,
                Err(e) => rpc_error(id, -32603, format!("tool task failed: {e}")),
            };
            state.finish(&key);
            let _ = tx.send(reply);
        });
    }

    while calls.join_next().await.is_some() {}
    drop(tx);
    writer.await.context("stdout writer task failed")??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn state() -> ServerState {
        let ctx = AnalysisContext::from_sources(
            Config::default(),
            [
                ("src/Shop.cs", "class Shop {\n    Repo repo;\n    void Checkout() {\n        repo.Save(1);\n    }\n}\n"),
                ("src/Repo.cs", "class Repo {\n    public void Save(int id) {\n    }\n}\n"),
            ],
        );
        ServerState::with_context(PathBuf::from("/virtual"), Arc::new(ctx))
    }

    fn call(s: &ServerState, name: &str, args: Value) -> (bool, String) {
        let reply = s.tool_call(json!(1), &json!({ "name": name, "arguments": args }), &CancellationToken::new());
        let result = &reply["result"];
        (
            result["isError"].as_bool().unwrap(),
            result["content"][0]["text"].as_str().unwrap().to_string(),
        )
    }

    #[test]
    fn find_callers_reports_the_call_site() {
        let s = state();
        let (is_error, text) = call(&s, "find_callers", json!({ "method": "Repo.Save" }));
        assert!(!is_error, "{text}");
        let v: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["callers"].as_array().unwrap().len(), 1);
        assert_eq!(v["callers"][0]["caller"]["name"], "Checkout");
        assert_eq!(v["tier"], "semantic");
    }

    #[test]
    fn not_found_is_in_band() {
        let s = state();
        let (is_error, text) = call(&s, "find_callers", json!({ "method": "Repo.Delete" }));
        assert!(!is_error);
        assert!(text.contains("\"found\": false"));
    }

    #[test]
    fn argument_errors_set_is_error() {
        let s = state();
        assert!(call(&s, "find_callers", json!({})).0);
        assert!(call(&s, "find_call_chains", json!({ "method": "Repo.Save", "direction": "sideways" })).0);
        assert!(call(&s, "find_call_chains", json!({ "method": "Repo.Save", "max_depth": 0 })).0);
        assert!(call(&s, "resolve_symbol", json!({ "name": "Repo", "kind": "module" })).0);
        assert!(call(&s, "no_such_tool", json!({})).0);

        let (is_error, text) = call(
            &s,
            "find_callers",
            json!({ "method": "Repo.Save", "file": "src/Repo.cs", "line": 4_294_967_298u64 }),
        );
        assert!(is_error);
        assert!(text.contains("out of range"), "{text}");
        let (is_error, _) = call(
            &s,
            "resolve_symbol",
            json!({ "name": "Save", "file": "src/Repo.cs", "line": 2, "column": 4_294_967_296u64 }),
        );
        assert!(is_error);
    }

    #[test]
    fn concurrent_cold_loads_share_one_context() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Repo.cs"), "class Repo { void Save() { } }").unwrap();
        let s = ServerState::new(None);
        let params = json!({ "repoPath": dir.path().to_string_lossy() });

        let loaded: Vec<Arc<AnalysisContext>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4).map(|_| scope.spawn(|| s.context_for(&params).unwrap().1)).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        let (_, cached) = s.context_for(&params).unwrap();
        assert!(loaded.iter().all(|ctx| Arc::ptr_eq(ctx, &cached)));
        assert_eq!(s.contexts.lock().len(), 1);
    }

    #[test]
    fn update_document_is_visible_to_the_next_call() {
        let s = state();
        let (_, before) = call(&s, "find_unused_methods", json!({}));
        assert!(before.contains("\"count\": 1"), "{before}");

        let (is_error, _) = call(
            &s,
            "update_document",
            json!({ "path": "src/Repo.cs", "text": "class Repo {\n    public void Save(int id) {\n        Audit();\n    }\n    void Audit() {\n    }\n}\n" }),
        );
        assert!(!is_error);
        let (_, chains) = call(&s, "find_call_chains", json!({ "method": "Shop.Checkout", "direction": "forward" }));
        let v: Value = serde_json::from_str(&chains).unwrap();
        assert_eq!(v["paths"][0]["steps"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn tool_list_names_every_tool() {
        let s = state();
        let list = s.tool_list(json!(7));
        let names: Vec<&str> = list["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names.len(), 15);
        assert!(names.contains(&"find_shortest_path"));
        assert!(names.contains(&"update_document"));
    }

    #[test]
    fn cancellation_notification_trips_the_token() {
        let s = state();
        let token = s.register(&json!(42));
        s.handle_notification("notifications/cancelled", &json!({ "requestId": 42 }));
        assert!(token.is_cancelled());
        s.finish(&request_key(&json!(42)));
        assert!(!s.cancel(&json!(42)));
    }

    #[test]
    fn health_reports_documents_and_tier() {
        let s = state();
        let (_, text) = call(&s, "workspace_health", json!({}));
        let v: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["documents"], 2);
        assert_eq!(v["tier"], "semantic");
        assert_eq!(v["health"]["compile_error_count"], 0);
    }
}
