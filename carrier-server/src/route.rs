//! Route model.
//!
//! A route is an ordered operator chain. Its HTTP method and path are
//! derived from the chain, never stored: the method comes from the
//! terminal-most method-declaring operator, the path is the chain-order
//! concatenation of every operator's segment contribution, canonicalized.

use crate::operator::Operator;
use hyper::Method;
use std::sync::Arc;

/// Ordered chain of operators compiling to one (method, path) entry.
#[derive(Clone, Default)]
pub struct Route {
    operators: Vec<Arc<dyn Operator>>,
}

impl Route {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an operator to the chain.
    pub fn with(mut self, operator: impl Operator) -> Self {
        self.operators.push(Arc::new(operator));
        self
    }

    /// Appends a shared operator to the chain.
    pub fn with_arc(mut self, operator: Arc<dyn Operator>) -> Self {
        self.operators.push(operator);
        self
    }

    pub fn operators(&self) -> &[Arc<dyn Operator>] {
        &self.operators
    }

    /// Derived HTTP method: the terminal-most declaring operator wins.
    pub fn method(&self) -> Option<Method> {
        self.operators.iter().rev().find_map(|op| op.method())
    }

    /// Derived canonical path.
    pub fn path(&self) -> String {
        let mut path = String::from("/");
        for operator in &self.operators {
            if let Some(segment) = operator.path_segment() {
                path.push('/');
                path.push_str(segment);
            }
        }
        clean_path(&path)
    }

    /// Operators with handler capability, in chain order.
    pub fn handler_operators(&self) -> Vec<Arc<dyn Operator>> {
        self.operators
            .iter()
            .filter(|op| op.as_handler().is_some())
            .cloned()
            .collect()
    }

    /// Operator names, in chain order.
    pub fn operator_names(&self) -> Vec<String> {
        self.operators.iter().map(|op| op.name().to_string()).collect()
    }

    /// Name of the terminal operator, for diagnostics.
    pub fn terminal_name(&self) -> String {
        self.operators
            .last()
            .map(|op| op.name().to_string())
            .unwrap_or_default()
    }
}

/// Unordered collection of routes handed to the compiler.
#[derive(Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, route: Route) {
        self.routes.push(route);
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub(crate) fn into_routes(self) -> Vec<Route> {
        self.routes
    }
}

/// Canonicalizes a path: collapses redundant separators and drops any
/// trailing separator (the root stays `/`).
pub fn clean_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return "/".to_string();
    }
    format!("/{}", segments.join("/"))
}

/// Renders a path for display: `:name` segments become `{name}`.
pub fn display_path(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => format!("{{{}}}", name),
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}
