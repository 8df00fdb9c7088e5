//! Request logging.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::request::Request;

use super::{Layer, Middleware};

/// Logs method, path, status and elapsed time once the inner chain returns.
///
/// Place it outside [`errors`](super::errors) so the status it reports is
/// the one actually sent.
pub fn logger() -> Layer {
    Arc::new(Logger)
}

struct Logger;

struct LogRequest {
    next: BoxedHandler,
}

impl Middleware for Logger {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(LogRequest { next })
    }
}

impl ErasedHandler for LogRequest {
    fn call(&self, req: Request) -> BoxFuture {
        let next = Arc::clone(&self.next);
        Box::pin(async move {
            let values = Arc::clone(req.values());
            let method = req.method();
            let path = req.path().to_owned();

            let outcome = next.call(req).await;

            // No errors layer inside us: fall back to what the outcome implies.
            let status = values.status().unwrap_or_else(|| match &outcome {
                Ok(response) => response.status_code(),
                Err(err) => err.status().as_u16(),
            });
            let elapsed_ms = values.elapsed().as_secs_f64() * 1000.0;
            let trace_id = values.trace_id();

            match status {
                500.. => error!(trace_id, %method, path = %path, status, elapsed_ms, "request completed"),
                400..=499 => warn!(trace_id, %method, path = %path, status, elapsed_ms, "request completed"),
                _ => info!(trace_id, %method, path = %path, status, elapsed_ms, "request completed"),
            }

            outcome
        })
    }
}
