//! Route compiler and dispatch table.

use crate::error::ServerError;
use crate::operator::{Handler, Operator, Reply, RequestContext};
use crate::route::{clean_path, display_path, Route, RouteTable};
use async_trait::async_trait;
use carrier_protocol::{ErrorCode, StatusError};
use colored::Colorize;
use hyper::Method;
use std::collections::HashMap;
use std::sync::Arc;

/// One path segment of a compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// Compiled path pattern supporting exact and `:param` segments.
#[derive(Debug, Clone)]
pub(crate) struct PathPattern {
    segments: Vec<Segment>,
    literal_count: usize,
}

impl PathPattern {
    fn parse(path: &str) -> Self {
        let segments: Vec<Segment> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s.strip_prefix(':') {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Literal(s.to_string()),
            })
            .collect();
        let literal_count = segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count();
        Self {
            segments,
            literal_count,
        }
    }

    /// Matches a request path, returning `:param` captures on success.
    fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(&parts) {
            match segment {
                Segment::Literal(literal) => {
                    if literal != part {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    params.insert(name.clone(), (*part).to_string());
                }
            }
        }
        Some(params)
    }
}

struct CompiledRoute {
    method: Method,
    path: String,
    pattern: PathPattern,
    handlers: Vec<Arc<dyn Operator>>,
}

/// Read-only dispatch table, built once at compile time and never mutated
/// after serving begins.
pub struct Dispatcher {
    routes: Vec<CompiledRoute>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.entries())
            .finish()
    }
}

impl Dispatcher {
    /// Registered (method, canonical path) entries, in registration order.
    pub fn entries(&self) -> Vec<(Method, String)> {
        self.routes
            .iter()
            .map(|route| (route.method.clone(), route.path.clone()))
            .collect()
    }

    /// Dispatches one request to the matching route's handler chain.
    ///
    /// Matching prefers literal segments over parameter captures; a request
    /// with no matching route gets a structured 404.
    pub async fn dispatch(&self, mut cx: RequestContext) -> Reply {
        let mut best: Option<(&CompiledRoute, HashMap<String, String>)> = None;
        for route in &self.routes {
            if route.method != cx.method {
                continue;
            }
            if let Some(params) = route.pattern.matches(&cx.path) {
                let better = match &best {
                    Some((current, _)) => {
                        route.pattern.literal_count > current.pattern.literal_count
                    }
                    None => true,
                };
                if better {
                    best = Some((route, params));
                }
            }
        }

        let Some((route, params)) = best else {
            return Reply::from_status_error(&StatusError::new(
                ErrorCode::NotFound,
                format!("no route for {} {}", cx.method, cx.path),
            ));
        };

        cx.params = params;

        // Handlers run in chain order; an error short-circuits and the
        // terminal handler's reply is the response.
        let mut reply = Reply::empty();
        for operator in &route.handlers {
            if let Some(handler) = operator.as_handler() {
                match handler.handle(&cx).await {
                    Ok(next) => reply = next,
                    Err(err) => return Reply::from_status_error(&err),
                }
            }
        }
        reply
    }
}

/// Built-in liveness operator, registered unconditionally.
struct Healthz;

impl Operator for Healthz {
    fn name(&self) -> &str {
        "Healthz"
    }

    fn path_segment(&self) -> Option<&str> {
        Some("/healthz")
    }

    fn method(&self) -> Option<Method> {
        Some(Method::GET)
    }

    fn as_handler(&self) -> Option<&dyn Handler> {
        Some(self)
    }
}

#[async_trait]
impl Handler for Healthz {
    async fn handle(&self, _cx: &RequestContext) -> Result<Reply, StatusError> {
        Ok(Reply::empty())
    }
}

/// Compiles a route table into a dispatcher.
///
/// Fails fast on structural misconfiguration: an empty table, a route with
/// no derivable method, or a route with no handler. Routes are sorted by
/// canonical path so registration order (and its log lines) is
/// deterministic; runtime matching does not depend on the order.
pub fn compile(table: RouteTable) -> Result<Dispatcher, ServerError> {
    if table.is_empty() {
        return Err(ServerError::EmptyRouteTable);
    }

    let mut routes = table.into_routes();
    routes.sort_by_key(|route| route.path());

    let mut compiled = Vec::with_capacity(routes.len() + 1);
    for route in &routes {
        let entry = compile_route(route)?;
        tracing::info!(
            "[carrier] {} {}",
            colorize(
                &entry.method,
                &format!("{:<8} {}", entry.method.as_str(), display_path(&entry.path)),
            ),
            route.operator_names().join(" "),
        );
        compiled.push(entry);
    }

    compiled.push(compile_route(&Route::new().with(Healthz))?);

    Ok(Dispatcher { routes: compiled })
}

fn compile_route(route: &Route) -> Result<CompiledRoute, ServerError> {
    let path = route.path();

    let method = route.method().ok_or_else(|| ServerError::MissingMethod {
        path: path.clone(),
        operator: route.terminal_name(),
    })?;

    let handlers = route.handler_operators();
    if handlers.is_empty() {
        return Err(ServerError::NoHandler { path });
    }

    Ok(CompiledRoute {
        method,
        pattern: PathPattern::parse(&path),
        path: clean_path(&path),
        handlers,
    })
}

fn colorize(method: &Method, line: &str) -> String {
    match *method {
        Method::GET => line.blue(),
        Method::POST => line.green(),
        Method::PUT => line.yellow(),
        Method::DELETE => line.red(),
        Method::HEAD => line.white(),
        Method::PATCH => line.magenta(),
        _ => line.normal(),
    }
    .to_string()
}
