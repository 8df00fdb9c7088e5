//! The sales API: route table and resource handlers.

use std::future::Future;
use std::sync::Arc;

use crate::auth::{Authenticator, ROLE_ADMIN};
use crate::error::Error;
use crate::handler::Handler;
use crate::method::Method;
use crate::middleware::{authenticate, errors, has_roles, logger, metrics, panics};
use crate::request::Request;
use crate::response::IntoResponse;
use crate::router::App;
use crate::shutdown::Shutdown;
use crate::store::Store;

mod check;
mod product;
mod user;

pub use user::Users;

/// Builds the application with every route the service exposes.
///
/// Global middleware, outermost first: logger, errors, metrics, panics.
/// Product routes require a bearer token; deleting a product and recording a
/// sale also require the `ADMIN` role.
pub fn api(shutdown: Shutdown, store: Arc<dyn Store>, authenticator: Arc<Authenticator>) -> App {
    let app = App::new(shutdown, vec![logger(), errors(), metrics(), panics()]);
    let users = Arc::new(Users::new(Arc::clone(&store), Arc::clone(&authenticator)));
    let bearer = || authenticate(Arc::clone(&authenticator));
    let admin = || has_roles(&[ROLE_ADMIN]);

    app.on(Method::Get, "/v1/health", with(&store, check::health))
        .on(Method::Get, "/v1/users/token", with(&users, user::token))
        .handle(Method::Get, "/v1/products", with(&store, product::list), [bearer()])
        .handle(Method::Get, "/v1/products/{id}", with(&store, product::retrieve), [bearer()])
        .handle(Method::Post, "/v1/products", with(&store, product::create), [bearer()])
        .handle(Method::Put, "/v1/products/{id}", with(&store, product::update), [bearer()])
        .handle(Method::Delete, "/v1/products/{id}", with(&store, product::delete), [bearer(), admin()])
        .handle(Method::Post, "/v1/products/{id}/sales", with(&store, product::add_sale), [bearer(), admin()])
        .handle(Method::Get, "/v1/products/{id}/sales", with(&store, product::list_sales), [bearer()])
}

/// Adapts a handler that also takes shared state into a plain [`Handler`].
fn with<S, F, Fut, R>(state: &Arc<S>, f: F) -> impl Handler
where
    S: ?Sized + Send + Sync + 'static,
    F: Fn(Arc<S>, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    let state = Arc::clone(state);
    move |req: Request| f(Arc::clone(&state), req)
}
