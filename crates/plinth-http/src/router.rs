//! Path-template route table and dispatch.

use std::sync::Arc;

use axum::http::{Method, StatusCode};

use crate::params::ParamStore;
use crate::response::{HandlerResult, Reply};

/// Everything a handler sees about the current request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub params: ParamStore,
}

impl RequestContext {
    pub fn new(method: Method, path: impl Into<String>, params: ParamStore) -> Self {
        Self {
            method,
            path: path.into(),
            params,
        }
    }
}

type Handler = Arc<dyn Fn(&mut RequestContext) -> HandlerResult + Send + Sync>;

/// Routes for one HTTP method, in registration order.
type RouteList = Vec<(String, Handler)>;

/// A route table for GET, POST, PUT, and DELETE.
///
/// Patterns are matched against the request path segment by segment;
/// `{name}` segments bind the request segment into the parameter store.
/// Registration order decides which of several matching patterns wins.
#[derive(Default, Clone)]
pub struct RouteTable {
    get: RouteList,
    post: RouteList,
    put: RouteList,
    delete: RouteList,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<F>(mut self, pattern: &str, handler: F) -> Self
    where
        F: Fn(&mut RequestContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.get.push((pattern.to_string(), Arc::new(handler)));
        self
    }

    pub fn post<F>(mut self, pattern: &str, handler: F) -> Self
    where
        F: Fn(&mut RequestContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.post.push((pattern.to_string(), Arc::new(handler)));
        self
    }

    pub fn put<F>(mut self, pattern: &str, handler: F) -> Self
    where
        F: Fn(&mut RequestContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.put.push((pattern.to_string(), Arc::new(handler)));
        self
    }

    pub fn delete<F>(mut self, pattern: &str, handler: F) -> Self
    where
        F: Fn(&mut RequestContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.delete.push((pattern.to_string(), Arc::new(handler)));
        self
    }

    /// Resolves and runs the handler for the request in `ctx`.
    ///
    /// Methods other than GET/POST/PUT/DELETE yield `405`. An exact
    /// pattern match is checked first; otherwise patterns are scanned
    /// in registration order and the first match wins, binding its
    /// `{name}` segments into `ctx.params`. No match yields `404`.
    pub fn dispatch(&self, ctx: &mut RequestContext) -> Reply {
        let routes = match ctx.method.as_str() {
            "GET" => &self.get,
            "POST" => &self.post,
            "PUT" => &self.put,
            "DELETE" => &self.delete,
            _ => return Reply::error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"),
        };

        if let Some((_, handler)) = routes.iter().find(|(pattern, _)| *pattern == ctx.path) {
            return run(handler, ctx);
        }

        let path = ctx.path.clone();
        for (pattern, handler) in routes {
            if match_pattern(&path, pattern, &mut ctx.params) {
                return run(handler, ctx);
            }
        }

        tracing::debug!(method = %ctx.method, path, "no route matched");
        Reply::error(StatusCode::NOT_FOUND, "Path not found")
    }
}

fn run(handler: &Handler, ctx: &mut RequestContext) -> Reply {
    match handler(ctx) {
        Ok(reply) => reply,
        Err(halt) => halt.into_reply(),
    }
}

/// Matches `path` against `pattern`, binding `{name}` segments.
///
/// Segment counts must be equal; each pattern segment either matches
/// literally or is a placeholder. Bindings are applied only when the
/// whole pattern matches, overwriting prior values.
fn match_pattern(path: &str, pattern: &str, params: &mut ParamStore) -> bool {
    let path_parts: Vec<&str> = path.split('/').collect();
    let pattern_parts: Vec<&str> = pattern.split('/').collect();

    if path_parts.len() != pattern_parts.len() {
        return false;
    }

    let mut bindings: Vec<(&str, &str)> = Vec::new();
    for (given, expected) in path_parts.iter().zip(&pattern_parts) {
        if given == expected {
            continue;
        }

        if expected.len() >= 2 && expected.starts_with('{') && expected.ends_with('}') {
            bindings.push((&expected[1..expected.len() - 1], given));
            continue;
        }

        return false;
    }

    for (name, value) in bindings {
        params.set(name, value);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> RouteTable {
        RouteTable::new()
            .get("/api/ping", |_ctx| Ok(Reply::ok()))
            .get("/api/items/{id}", |ctx| {
                let id = ctx.params.get("id").unwrap_or("").to_string();
                Ok(Reply::send(json!({ "message": "OK", "id": id })))
            })
            .get("/api/items/{id}/parts/{part}", |ctx| {
                Ok(Reply::send(json!({
                    "message": "OK",
                    "id": ctx.params.get("id"),
                    "part": ctx.params.get("part"),
                })))
            })
            .post("/api/items", |_ctx| Ok(Reply::ok()))
            .put("/api/items/{id}", |ctx| {
                Ok(Reply::send(json!({
                    "message": "updated",
                    "id": ctx.params.get("id"),
                })))
            })
    }

    fn ctx(method: Method, path: &str) -> RequestContext {
        RequestContext::new(method, path, ParamStore::new())
    }

    #[test]
    fn exact_route_matches() {
        let mut c = ctx(Method::GET, "/api/ping");
        assert_eq!(table().dispatch(&mut c).status, StatusCode::OK);
    }

    #[test]
    fn placeholder_binds_the_path_segment() {
        let mut c = ctx(Method::GET, "/api/items/42");
        let reply = table().dispatch(&mut c);
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["id"], "42");
        assert_eq!(c.params.get("id"), Some("42"));
    }

    #[test]
    fn multiple_placeholders_bind_independently() {
        let mut c = ctx(Method::GET, "/api/items/42/parts/7");
        let reply = table().dispatch(&mut c);
        assert_eq!(reply.body["id"], "42");
        assert_eq!(reply.body["part"], "7");
    }

    #[test]
    fn placeholder_binding_overwrites_prior_value() {
        let mut c = ctx(Method::GET, "/api/items/42");
        c.params.set("id", "stale");
        table().dispatch(&mut c);
        assert_eq!(c.params.get("id"), Some("42"));
    }

    #[test]
    fn put_routes_dispatch_with_their_own_table() {
        let mut c = ctx(Method::PUT, "/api/items/42");
        let reply = table().dispatch(&mut c);
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["message"], "updated");
        assert_eq!(reply.body["id"], "42");

        // The same path under GET resolves to the GET handler instead.
        let mut g = ctx(Method::GET, "/api/items/42");
        assert_eq!(table().dispatch(&mut g).body["message"], "OK");
    }

    #[test]
    fn segment_count_mismatch_never_matches() {
        let mut short = ctx(Method::GET, "/api/items");
        assert_eq!(table().dispatch(&mut short).status, StatusCode::NOT_FOUND);

        let mut long = ctx(Method::GET, "/api/items/42/extra");
        assert_eq!(table().dispatch(&mut long).status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn unknown_path_yields_404_with_message() {
        let mut c = ctx(Method::GET, "/api/nowhere");
        let reply = table().dispatch(&mut c);
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        assert_eq!(reply.body["message"], "Path not found");
    }

    #[test]
    fn unsupported_method_yields_405() {
        let mut c = ctx(Method::PATCH, "/api/ping");
        let reply = table().dispatch(&mut c);
        assert_eq!(reply.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(reply.body["message"], "Method not allowed");
    }

    #[test]
    fn first_registered_pattern_wins() {
        let routed = RouteTable::new()
            .get("/a/{x}", |_ctx| Ok(Reply::send(json!({ "message": "first" }))))
            .get("/a/{y}", |_ctx| Ok(Reply::send(json!({ "message": "second" }))));

        let mut c = ctx(Method::GET, "/a/1");
        assert_eq!(routed.dispatch(&mut c).body["message"], "first");
    }

    #[test]
    fn halting_handler_flushes_its_reply() {
        let routed = RouteTable::new().get("/halt", |_ctx| {
            Err(crate::Halt::not_found(Some("gone")))?;
            Ok(Reply::ok())
        });
        let mut c = ctx(Method::GET, "/halt");
        let reply = routed.dispatch(&mut c);
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        assert_eq!(reply.body["details"], "gone");
    }
}
