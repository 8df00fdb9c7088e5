//! Middleware layer.
//!
//! A middleware wraps one handler into another of the same shape. The route
//! table composes each route once, at registration:
//!
//! ```text
//! global[0]( global[1]( … route[0]( route[1]( … handler ))))
//! ```
//!
//! so the first global middleware sees the request first and the outcome
//! last, and route-specific middleware always sits closer to the handler.
//!
//! Built-in units:
//! - [`logger`]: one log line per request with method, path, status, latency
//! - [`errors`]: turns every error into exactly one response
//! - [`metrics`]: request/error counters and a latency histogram
//! - [`panics`]: converts a panic in an inner layer into an internal error
//! - [`authenticate`]: verifies the bearer token and stores its claims
//! - [`has_roles`]: requires at least one of a set of roles

use std::sync::Arc;

use crate::handler::BoxedHandler;

mod auth;
mod errors;
mod logger;
mod metrics;
mod panics;

pub use auth::{authenticate, has_roles};
pub use errors::errors;
pub use logger::logger;
pub use metrics::metrics;
pub use panics::panics;

/// A transform from handler to handler.
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler;
}

/// A shareable middleware, as stored in global and per-route lists.
pub type Layer = Arc<dyn Middleware>;

/// Wraps `handler` so that `mw[0]` ends up outermost.
pub(crate) fn wrap_middleware(mw: &[Layer], handler: BoxedHandler) -> BoxedHandler {
    mw.iter().rev().fold(handler, |h, m| m.wrap(h))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::handler::{BoxFuture, ErasedHandler, Handler};
    use crate::{Error, Method, Request, Response, Status};

    type Trail = Arc<Mutex<Vec<String>>>;

    struct Record {
        name: &'static str,
        trail: Trail,
    }

    struct Recorded {
        name: &'static str,
        trail: Trail,
        next: BoxedHandler,
    }

    impl Middleware for Record {
        fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
            Arc::new(Recorded { name: self.name, trail: Arc::clone(&self.trail), next })
        }
    }

    impl ErasedHandler for Recorded {
        fn call(&self, req: Request) -> BoxFuture {
            let (name, trail, next) = (self.name, Arc::clone(&self.trail), Arc::clone(&self.next));
            Box::pin(async move {
                trail.lock().unwrap().push(format!("enter {name}"));
                let outcome = next.call(req).await;
                trail.lock().unwrap().push(format!("leave {name}"));
                outcome
            })
        }
    }

    fn record(name: &'static str, trail: &Trail) -> Layer {
        Arc::new(Record { name, trail: Arc::clone(trail) })
    }

    #[tokio::test]
    async fn first_middleware_is_outermost() {
        let trail: Trail = Arc::default();
        let inner = Arc::clone(&trail);
        let handler = (move |_req: Request| {
            let inner = Arc::clone(&inner);
            async move {
                inner.lock().unwrap().push("handler".to_string());
                Ok::<_, Error>(Status::NoContent)
            }
        })
        .into_boxed_handler();

        let route = [record("route", &trail)];
        let global = [record("first", &trail), record("second", &trail)];
        let composed = wrap_middleware(&global, wrap_middleware(&route, handler));

        let res: Response = composed.call(Request::for_test(Method::Get, "/")).await.unwrap();
        assert_eq!(res.status_code(), 204);
        assert_eq!(
            *trail.lock().unwrap(),
            [
                "enter first", "enter second", "enter route", "handler",
                "leave route", "leave second", "leave first",
            ]
        );
    }

    #[tokio::test]
    async fn empty_list_leaves_handler_alone() {
        let handler = (|_req: Request| async { Ok::<_, Error>(Status::Ok) }).into_boxed_handler();
        let composed = wrap_middleware(&[], handler);
        let res = composed.call(Request::for_test(Method::Get, "/")).await.unwrap();
        assert_eq!(res.status_code(), 200);
    }
}
