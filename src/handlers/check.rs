//! Service orchestration probes.

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::error::Error;
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;
use crate::store::Store;

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

/// `200 {"status":"ok"}` when the store answers, `500 {"status":"db not ready"}`
/// when it does not.
/// Both are successful outcomes so the body reaches the caller unchanged.
pub(super) async fn health(store: Arc<dyn Store>, _req: Request) -> Result<Response, Error> {
    match store.status_check().await {
        Ok(()) => Response::respond(&Health { status: "ok" }, Status::Ok),
        Err(e) => {
            warn!(error = format!("{e:#}"), "store status check failed");
            Response::respond(&Health { status: "db not ready" }, Status::InternalServerError)
        }
    }
}
