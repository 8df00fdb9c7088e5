//! Request counters.

use std::sync::Arc;

use metrics::{counter, histogram};

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::request::Request;

use super::{Layer, Middleware};

/// Counts requests and errors and records handler latency.
///
/// Sits inside [`errors`](super::errors) so it still sees the error values.
/// Without an installed recorder the macros are no-ops.
pub fn metrics() -> Layer {
    Arc::new(Metrics)
}

struct Metrics;

struct CountRequest {
    next: BoxedHandler,
}

impl Middleware for Metrics {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(CountRequest { next })
    }
}

impl ErasedHandler for CountRequest {
    fn call(&self, req: Request) -> BoxFuture {
        let next = Arc::clone(&self.next);
        Box::pin(async move {
            let values = Arc::clone(req.values());
            let method = req.method().as_str();

            let outcome = next.call(req).await;

            counter!("requests", "method" => method).increment(1);
            if outcome.is_err() {
                counter!("errors", "method" => method).increment(1);
            }
            histogram!("request_duration_seconds", "method" => method)
                .record(values.elapsed().as_secs_f64());

            outcome
        })
    }
}
