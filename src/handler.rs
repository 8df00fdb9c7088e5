//! Handler trait and type erasure.
//!
//! The route table holds handlers of different concrete types, and middleware
//! wraps handlers it knows nothing about, so everything is stored behind one
//! trait object:
//!
//! ```text
//! async fn list(req: Request) -> Result<Response, Error> { … }   ← user writes this
//!        ↓ app.on(Method::Get, "/v1/products", list)
//! list.into_boxed_handler()                                     ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(list))                                     ← stored as BoxedHandler
//!        ↓ middleware.wrap(handler)                             ← at registration
//! handler.call(req)  at request time                            ← one vtable call per layer
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::Error;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// What every layer of the chain resolves to.
pub type Outcome = Result<Response, Error>;

/// A heap-allocated, type-erased future that resolves to an [`Outcome`].
pub type BoxFuture = Pin<Box<dyn Future<Output = Outcome> + Send + 'static>>;

/// Dispatch interface shared by route handlers and middleware layers.
///
/// Middleware implement this on their wrapper types; application code
/// normally writes plain async functions and relies on [`Handler`].
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A type-erased handler shared across concurrent requests.
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// Satisfied automatically by any function or closure with the shape:
///
/// ```text
/// Fn(Request) -> impl Future<Output = Result<impl IntoResponse, Error>>
/// ```
///
/// Sealed: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.map(IntoResponse::into_response) })
    }
}
