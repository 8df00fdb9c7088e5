//! # garagesale
//!
//! A product and sales REST service on a small hyper-based framework.
//!
//! ## The framework
//!
//! - Radix-tree routing, one tree per method, via [`matchit`]
//! - Middleware as values with a single [`wrap`](middleware::Middleware::wrap)
//!   capability, composed once per route at registration
//! - Exactly one response per request: handlers return plain values or typed
//!   [`Error`]s, and only the errors middleware turns errors into responses
//! - Graceful drain on SIGTERM / Ctrl-C, or when a handler reports an
//!   integrity error through [`Error::Integrity`]
//!
//! TLS, rate limiting and body-size limits are left to the reverse proxy in
//! front of the service.
//!
//! ## The service
//!
//! [`handlers::api`] wires the routes: a health check, a Basic-auth token
//! exchange, and bearer-protected product and sale resources backed by a
//! [`store::Store`].
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use garagesale::auth::Authenticator;
//! use garagesale::store::MemoryStore;
//! use garagesale::{Server, Shutdown, handlers};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let private = std::fs::read("private.pem")?;
//!     let public = std::fs::read("public.pem")?;
//!     let auth = Authenticator::from_pem(&private, &public, "1", "RS256")?;
//!
//!     let app = handlers::api(Shutdown::new(), Arc::new(MemoryStore::new()), Arc::new(auth));
//!     let reason = Server::bind("0.0.0.0:8000").await?.serve(app).await?;
//!     println!("stopped: {reason:?}");
//!     Ok(())
//! }
//! ```
//!
//! A handler is any async function from [`Request`] to
//! `Result<impl IntoResponse, Error>`:
//!
//! ```rust
//! use garagesale::{Error, Request, Response, Status};
//!
//! async fn show(req: Request) -> Result<Response, Error> {
//!     let id = req.param("id").ok_or_else(|| Error::bad_request("missing id"))?;
//!     Response::respond(&serde_json::json!({ "id": id }), Status::Ok)
//! }
//! ```

mod context;
mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;
mod shutdown;
mod status;

pub mod auth;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod product;
pub mod store;
pub mod telemetry;
pub mod user;

pub use context::{Context, Values};
pub use error::{Error, ErrorKind, ErrorResponse, FieldError};
pub use handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler, Outcome};
pub use method::Method;
pub use request::Request;
pub use response::{IntoResponse, Response};
pub use router::App;
pub use server::Server;
pub use shutdown::{Shutdown, ShutdownReason};
pub use status::Status;
