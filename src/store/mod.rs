//! Storage collaborator.
//!
//! Handlers only see the [`Store`] trait. Two implementations ship:
//! [`MemoryStore`] (the default, also used by the tests) and [`PgStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::{ROLE_ADMIN, ROLE_USER};
use crate::error::Error;
use crate::product::{NewProduct, NewSale, Product, Sale, UpdateProduct};
use crate::user::{NewUser, User};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{DbConfig, PgStore};

/// Message for a path id that is not a UUID.
pub const INVALID_ID: &str = "ID is not in its proper UUID format";
/// Message for an id that names no product.
pub const PRODUCT_NOT_FOUND: &str = "product not found";

/// Parses a product id from a path segment.
pub fn parse_id(raw: &str) -> Result<Uuid, Error> {
    Uuid::parse_str(raw).map_err(|_| Error::bad_request(INVALID_ID))
}

/// Product, sale and user persistence.
///
/// Lookups of a missing product fail with `Error::NotFound`; anything the
/// backend itself fails at is `Error::Internal`. A write that would silently
/// corrupt existing data fails with `Error::Integrity`.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Round-trips to the backend. Used by the health check.
    async fn status_check(&self) -> anyhow::Result<()>;

    async fn list_products(&self) -> Result<Vec<Product>, Error>;

    async fn retrieve_product(&self, id: Uuid) -> Result<Product, Error>;

    async fn create_product(&self, np: NewProduct, now: DateTime<Utc>) -> Result<Product, Error>;

    async fn update_product(
        &self,
        id: Uuid,
        update: UpdateProduct,
        now: DateTime<Utc>,
    ) -> Result<(), Error>;

    /// Removes a product and its sales. Deleting an unknown id succeeds.
    async fn delete_product(&self, id: Uuid) -> Result<(), Error>;

    async fn add_sale(
        &self,
        product_id: Uuid,
        ns: NewSale,
        now: DateTime<Utc>,
    ) -> Result<Sale, Error>;

    async fn list_sales(&self, product_id: Uuid) -> Result<Vec<Sale>, Error>;

    async fn create_user(&self, user: User) -> Result<User, Error>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error>;
}

/// Loads the demo data set: an admin and a regular user (both with password
/// `gophers`) and two products. Passwords are hashed with `hash_cost` rounds.
pub async fn seed(store: &dyn Store, now: DateTime<Utc>, hash_cost: u32) -> Result<(), Error> {
    let users = [
        ("Admin Gopher", "admin@example.com", vec![ROLE_ADMIN, ROLE_USER]),
        ("User Gopher", "user@example.com", vec![ROLE_USER]),
    ];
    for (name, email, roles) in users {
        let user = NewUser {
            name: name.to_owned(),
            email: email.to_owned(),
            roles: roles.into_iter().map(str::to_owned).collect(),
            password: "gophers".to_owned(),
            password_confirm: "gophers".to_owned(),
        };
        store.create_user(user.into_user(now, hash_cost)?).await?;
    }

    let products = [("Comic Books", 50, 42), ("McDonalds Toys", 75, 120)];
    for (name, cost, quantity) in products {
        store.create_product(NewProduct { name: name.to_owned(), cost, quantity }, now).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_rejects_garbage() {
        let err = parse_id("not-a-uuid").unwrap_err();
        assert_eq!(err.status().as_u16(), 400);
        assert_eq!(err.to_string(), INVALID_ID);

        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
    }

    #[tokio::test]
    async fn seed_loads_users_and_products() {
        let store = MemoryStore::new();
        seed(&store, Utc::now(), 4).await.unwrap();

        assert_eq!(store.list_products().await.unwrap().len(), 2);
        let admin = store.find_user_by_email("admin@example.com").await.unwrap().unwrap();
        assert_eq!(admin.roles, vec![ROLE_ADMIN, ROLE_USER]);
        assert!(store.find_user_by_email("user@example.com").await.unwrap().is_some());
    }
}
