//! Terminal error translation.

use std::sync::Arc;

use tracing::{debug, error};

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::request::Request;

use super::{Layer, Middleware};

/// Handles every error coming out of the inner chain.
///
/// Request-class errors are answered with their own status and message.
/// Internal errors are logged in full and answered with a generic `500`.
/// Integrity errors are answered like internal ones and flagged on the
/// request values so the dispatcher can start a drain. The outcome is always
/// `Ok`: nothing outside this layer ever has to build an error response.
///
/// The status of whatever response leaves this layer is recorded on the
/// request values for the logger.
pub fn errors() -> Layer {
    Arc::new(Errors)
}

struct Errors;

struct Translate {
    next: BoxedHandler,
}

impl Middleware for Errors {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(Translate { next })
    }
}

impl ErasedHandler for Translate {
    fn call(&self, req: Request) -> BoxFuture {
        let next = Arc::clone(&self.next);
        Box::pin(async move {
            let values = Arc::clone(req.values());
            let response = match next.call(req).await {
                Ok(response) => response,
                Err(err) => {
                    if err.is_internal() {
                        let detail = format!("{err:#}");
                        error!(trace_id = values.trace_id(), error = %detail, "request failed");
                    } else {
                        debug!(trace_id = values.trace_id(), error = %err, "request rejected");
                    }
                    if err.is_shutdown() {
                        values.flag_integrity_failure(err.to_string());
                    }
                    err.to_response()
                }
            };
            values.record_status(response.status_code());
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;
    use crate::error::Error;
    use crate::handler::Handler;
    use crate::middleware::wrap_middleware;
    use crate::{Method, Status};

    fn failing(make: fn() -> Error) -> BoxedHandler {
        (move |_req: Request| async move { Err::<Status, _>(make()) }).into_boxed_handler()
    }

    #[tokio::test]
    async fn client_errors_keep_their_status() {
        let req = Request::for_test(Method::Get, "/");
        let values = Arc::clone(req.values());
        let chain = wrap_middleware(&[errors()], failing(|| Error::not_found("product not found")));

        let res = chain.call(req).await.unwrap();
        assert_eq!(res.status_code(), 404);
        assert_eq!(res.body(), br#"{"error":"product not found"}"#);
        assert_eq!(values.status(), Some(404));
        assert_eq!(values.integrity_failure(), None);
    }

    #[tokio::test]
    async fn internal_errors_become_generic_500() {
        let chain = wrap_middleware(&[errors()], failing(|| Error::from(anyhow!("db down"))));
        let res = chain.call(Request::for_test(Method::Get, "/")).await.unwrap();
        assert_eq!(res.status_code(), 500);
        assert_eq!(res.body(), br#"{"error":"Internal Server Error"}"#);
    }

    #[tokio::test]
    async fn integrity_errors_are_flagged() {
        let req = Request::for_test(Method::Post, "/");
        let values = Arc::clone(req.values());
        let chain = wrap_middleware(&[errors()], failing(|| Error::integrity("ledger mismatch")));

        let res = chain.call(req).await.unwrap();
        assert_eq!(res.status_code(), 500);
        assert_eq!(values.integrity_failure(), Some("integrity failure: ledger mismatch"));
    }

    #[tokio::test]
    async fn success_status_is_recorded() {
        let req = Request::for_test(Method::Delete, "/");
        let values = Arc::clone(req.values());
        let ok = (|_req: Request| async { Ok::<_, Error>(Status::NoContent) }).into_boxed_handler();

        wrap_middleware(&[errors()], ok).call(req).await.unwrap();
        assert_eq!(values.status(), Some(204));
    }
}
