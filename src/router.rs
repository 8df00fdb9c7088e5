//! Radix-tree request router and dispatcher.
//!
//! One tree per HTTP method, O(path-length) lookup. Each route is stored
//! already wrapped in its full middleware chain, so a request costs one
//! lookup plus one virtual call per layer.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use matchit::Router as MatchitRouter;
use tracing::{Instrument, error, info_span};
use uuid::Uuid;

use crate::context::Values;
use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::middleware::{Layer, wrap_middleware};
use crate::request::Request;
use crate::response::Response;
use crate::shutdown::{Shutdown, ShutdownReason};
use crate::status::Status;

/// The application: route table, global middleware and the shutdown handle.
///
/// Build it once at startup and pass it to [`Server::serve`](crate::Server::serve).
/// Registration methods return `self` so they chain naturally.
pub struct App {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    middleware: Vec<Layer>,
    shutdown: Shutdown,
}

impl App {
    /// Creates an app whose every route is wrapped in `middleware`, first
    /// element outermost.
    pub fn new(shutdown: Shutdown, middleware: Vec<Layer>) -> Self {
        Self { routes: HashMap::new(), middleware, shutdown }
    }

    /// Registers a handler with only the global middleware.
    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.handle(method, path, handler, [])
    }

    /// Registers a handler wrapped in route-specific `middleware` (first
    /// element outermost), itself wrapped in the global middleware.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them.
    ///
    /// # Panics
    ///
    /// Panics if `path` is malformed or conflicts with a route already
    /// registered for `method`. Routes are fixed at startup, so this is a
    /// programming error.
    pub fn handle(
        mut self,
        method: Method,
        path: &str,
        handler: impl Handler,
        middleware: impl IntoIterator<Item = Layer>,
    ) -> Self {
        let route: Vec<Layer> = middleware.into_iter().collect();
        let handler = wrap_middleware(&route, handler.into_boxed_handler());
        let handler = wrap_middleware(&self.middleware, handler);

        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler)
            .unwrap_or_else(|e| panic!("invalid route `{method} {path}`: {e}"));
        self
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    pub(crate) fn lookup(
        &self,
        method: Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(&method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }

    /// True if some method has a route for `path`.
    fn has_path(&self, path: &str) -> bool {
        self.routes.values().any(|tree| tree.at(path).is_ok())
    }

    /// Routes one request and produces its one response.
    ///
    /// Every request gets fresh [`Values`] and runs inside a `request` span
    /// carrying its trace id. Errors that escape the whole chain (no errors
    /// middleware installed) are logged and translated here. If the request
    /// ended in an integrity error the shutdown handle is triggered.
    pub async fn dispatch(&self, req: http::Request<Bytes>) -> Response {
        let values = Arc::new(Values::new(Uuid::new_v4().simple().to_string()));
        let span = info_span!("request", trace_id = values.trace_id());

        async {
            let (parts, body) = req.into_parts();
            let path = parts.uri.path().to_owned();

            let Ok(method) = Method::try_from(&parts.method) else {
                return Error::request(Status::MethodNotAllowed, Status::MethodNotAllowed.reason())
                    .to_response();
            };

            let Some((handler, params)) = self.lookup(method, &path) else {
                let err = if self.has_path(&path) {
                    Error::request(Status::MethodNotAllowed, Status::MethodNotAllowed.reason())
                } else {
                    Error::not_found(Status::NotFound.reason())
                };
                return err.to_response();
            };

            let req = Request::new(method, path, parts.headers, body, params, Arc::clone(&values));
            let response = match handler.call(req).await {
                Ok(response) => response,
                Err(err) => {
                    let detail = format!("{err:#}");
                    error!(error = %detail, "unhandled error");
                    if err.is_shutdown() {
                        values.flag_integrity_failure(err.to_string());
                    }
                    err.to_response()
                }
            };

            if let Some(detail) = values.integrity_failure() {
                self.signal_shutdown(detail);
            }
            response
        }
        .instrument(span)
        .await
    }

    /// Asks the owning process to drain after an integrity error.
    fn signal_shutdown(&self, detail: &str) {
        if self.shutdown.request(ShutdownReason::Integrity(detail.to_owned())) {
            error!(detail, "error returned from handler indicated integrity issue, shutting down service");
        }
    }
}
