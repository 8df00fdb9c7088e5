//! Product and sale routes.

use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use crate::error::Error;
use crate::product::{NewProduct, NewSale, UpdateProduct};
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;
use crate::store::{Store, parse_id};

/// Path id of the current route. Every route using this is registered with
/// an `{id}` segment.
fn id(req: &Request) -> Result<uuid::Uuid, Error> {
    parse_id(req.param("id").unwrap_or_default())
}

pub(super) async fn list(store: Arc<dyn Store>, _req: Request) -> Result<Response, Error> {
    let products = store.list_products().await?;
    Response::respond(&products, Status::Ok)
}

pub(super) async fn retrieve(store: Arc<dyn Store>, req: Request) -> Result<Response, Error> {
    let product = store.retrieve_product(id(&req)?).await?;
    Response::respond(&product, Status::Ok)
}

pub(super) async fn create(store: Arc<dyn Store>, req: Request) -> Result<Response, Error> {
    let np: NewProduct = req.decode()?;
    np.validate()?;

    let product = store.create_product(np, Utc::now()).await?;
    let body = serde_json::to_vec(&product)
        .map_err(|e| anyhow::Error::new(e).context("marshalling product"))?;
    Ok(Response::builder()
        .status(Status::Created)
        .header("location", &format!("/v1/products/{}", product.id))
        .json(body))
}

pub(super) async fn update(store: Arc<dyn Store>, req: Request) -> Result<Status, Error> {
    let id = id(&req)?;
    let update: UpdateProduct = req.decode()?;
    update.validate()?;

    store.update_product(id, update, Utc::now()).await?;
    Ok(Status::NoContent)
}

pub(super) async fn delete(store: Arc<dyn Store>, req: Request) -> Result<Status, Error> {
    store.delete_product(id(&req)?).await?;
    Ok(Status::NoContent)
}

pub(super) async fn add_sale(store: Arc<dyn Store>, req: Request) -> Result<Response, Error> {
    let product_id = id(&req)?;
    let ns: NewSale = req.decode()?;
    ns.validate()?;

    let sale = store.add_sale(product_id, ns, Utc::now()).await?;
    Response::respond(&sale, Status::Created)
}

pub(super) async fn list_sales(store: Arc<dyn Store>, req: Request) -> Result<Response, Error> {
    let sales = store.list_sales(id(&req)?).await?;
    Response::respond(&sales, Status::Ok)
}
