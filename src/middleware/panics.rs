//! Panic recovery.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::anyhow;
use futures::FutureExt;

use crate::error::Error;
use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::request::Request;

use super::{Layer, Middleware};

/// Turns a panic anywhere inside this layer into an internal error, so the
/// errors layer answers it with a `500` and the connection keeps serving.
pub fn panics() -> Layer {
    Arc::new(Panics)
}

struct Panics;

struct Recover {
    next: BoxedHandler,
}

impl Middleware for Panics {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(Recover { next })
    }
}

impl ErasedHandler for Recover {
    fn call(&self, req: Request) -> BoxFuture {
        let next = Arc::clone(&self.next);
        // `next.call` runs inside the async block so a panic while building
        // the inner future is caught too.
        let inner = async move { next.call(req).await };
        Box::pin(async move {
            AssertUnwindSafe(inner)
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| {
                    Err(Error::Internal(anyhow!("panic: {}", message(payload.as_ref()))))
                })
        })
    }
}

fn message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use crate::middleware::{errors, wrap_middleware};
    use crate::{Method, Response};

    fn echo_id() -> BoxedHandler {
        (|req: Request| async move {
            let id = req.param("id").expect("id param");
            Ok::<_, Error>(Response::json(id.as_bytes().to_vec()))
        })
        .into_boxed_handler()
    }

    #[tokio::test]
    async fn panic_becomes_internal_error() {
        let err = wrap_middleware(&[panics()], echo_id())
            .call(Request::for_test(Method::Get, "/"))
            .await
            .unwrap_err();
        assert!(err.is_internal());
        assert_eq!(err.to_string(), "panic: id param");
    }

    #[tokio::test]
    async fn errors_layer_answers_recovered_panic() {
        let chain = wrap_middleware(&[errors(), panics()], echo_id());
        let res = chain.call(Request::for_test(Method::Get, "/")).await.unwrap();
        assert_eq!(res.status_code(), 500);

        // The same chain keeps serving afterwards.
        let mut req = Request::for_test(Method::Get, "/");
        req.params.insert("id".into(), "7".into());
        assert_eq!(chain.call(req).await.unwrap().body(), b"7");
    }
}
