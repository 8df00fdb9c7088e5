//! In-process store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Error;
use crate::product::{NewProduct, NewSale, Product, Sale, UpdateProduct};
use crate::user::User;

use super::{PRODUCT_NOT_FOUND, Store};

#[derive(Default)]
struct Tables {
    products: Vec<Product>,
    sales: Vec<Sale>,
    users: Vec<User>,
}

/// A [`Store`] kept in memory behind a `tokio` read-write lock. Products list
/// in insertion order.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn status_check(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn list_products(&self) -> Result<Vec<Product>, Error> {
        Ok(self.tables.read().await.products.clone())
    }

    async fn retrieve_product(&self, id: Uuid) -> Result<Product, Error> {
        let tables = self.tables.read().await;
        tables.products.iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| Error::not_found(PRODUCT_NOT_FOUND))
    }

    async fn create_product(&self, np: NewProduct, now: DateTime<Utc>) -> Result<Product, Error> {
        let product = Product {
            id: Uuid::new_v4(),
            name: np.name,
            cost: np.cost,
            quantity: np.quantity,
            sold: 0,
            revenue: 0,
            date_created: now,
            date_updated: now,
        };

        let mut tables = self.tables.write().await;
        if tables.products.iter().any(|p| p.id == product.id) {
            return Err(Error::integrity(format!("duplicate product id {}", product.id)));
        }
        tables.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: Uuid,
        update: UpdateProduct,
        now: DateTime<Utc>,
    ) -> Result<(), Error> {
        let mut tables = self.tables.write().await;
        let product = tables.products.iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::not_found(PRODUCT_NOT_FOUND))?;
        update.apply(product, now);
        Ok(())
    }

    async fn delete_product(&self, id: Uuid) -> Result<(), Error> {
        let mut tables = self.tables.write().await;
        tables.products.retain(|p| p.id != id);
        tables.sales.retain(|s| s.product_id != id);
        Ok(())
    }

    async fn add_sale(
        &self,
        product_id: Uuid,
        ns: NewSale,
        now: DateTime<Utc>,
    ) -> Result<Sale, Error> {
        let mut tables = self.tables.write().await;
        let sale = Sale {
            id: Uuid::new_v4(),
            product_id,
            quantity: ns.quantity,
            paid: ns.paid,
            date_created: now,
        };
        if tables.sales.iter().any(|s| s.id == sale.id) {
            return Err(Error::integrity(format!("duplicate sale id {}", sale.id)));
        }

        let product = tables.products.iter_mut()
            .find(|p| p.id == product_id)
            .ok_or_else(|| Error::not_found(PRODUCT_NOT_FOUND))?;
        product.record_sale(&sale)?;

        tables.sales.push(sale.clone());
        Ok(sale)
    }

    async fn list_sales(&self, product_id: Uuid) -> Result<Vec<Sale>, Error> {
        let tables = self.tables.read().await;
        Ok(tables.sales.iter().filter(|s| s.product_id == product_id).cloned().collect())
    }

    async fn create_user(&self, user: User) -> Result<User, Error> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(Error::bad_request(format!("email {} is already registered", user.email)));
        }
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 9, 1, 0, 0, 0).unwrap()
    }

    fn comic_books() -> NewProduct {
        NewProduct { name: "Comic Books".into(), cost: 10, quantity: 20 }
    }

    #[tokio::test]
    async fn created_products_can_be_retrieved() {
        let store = MemoryStore::new();
        let p = store.create_product(comic_books(), now()).await.unwrap();

        let saved = store.retrieve_product(p.id).await.unwrap();
        assert_eq!(p, saved);
        assert_eq!(store.list_products().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_products_are_not_found() {
        let store = MemoryStore::new();
        let err = store.retrieve_product(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.status().as_u16(), 404);
        assert_eq!(err.to_string(), PRODUCT_NOT_FOUND);

        let err = store.update_product(Uuid::new_v4(), UpdateProduct::default(), now()).await.unwrap_err();
        assert_eq!(err.status().as_u16(), 404);
    }

    #[tokio::test]
    async fn sales_aggregate_onto_the_product() {
        let store = MemoryStore::new();
        let p = store.create_product(comic_books(), now()).await.unwrap();

        store.add_sale(p.id, NewSale { quantity: 3, paid: 70 }, now()).await.unwrap();
        store.add_sale(p.id, NewSale { quantity: 2, paid: 30 }, now()).await.unwrap();

        let saved = store.retrieve_product(p.id).await.unwrap();
        assert_eq!((saved.sold, saved.revenue), (5, 100));
        assert_eq!(store.list_sales(p.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn overflowing_sale_is_rejected_without_recording() {
        let store = MemoryStore::new();
        let p = store.create_product(comic_books(), now()).await.unwrap();
        store.add_sale(p.id, NewSale { quantity: 1, paid: i32::MAX }, now()).await.unwrap();

        let err = store.add_sale(p.id, NewSale { quantity: 1, paid: 1 }, now()).await.unwrap_err();
        assert_eq!(err.status().as_u16(), 400);

        let saved = store.retrieve_product(p.id).await.unwrap();
        let sales = store.list_sales(p.id).await.unwrap();
        assert_eq!(sales.len(), 1);
        assert_eq!(saved.sold, sales.iter().map(|s| s.quantity).sum::<i32>());
        assert_eq!(saved.revenue, i32::MAX);
    }

    #[tokio::test]
    async fn sale_for_unknown_product_is_not_found() {
        let store = MemoryStore::new();
        let err = store.add_sale(Uuid::new_v4(), NewSale { quantity: 1, paid: 1 }, now()).await.unwrap_err();
        assert_eq!(err.status().as_u16(), 404);
    }

    #[tokio::test]
    async fn delete_drops_sales_and_is_idempotent() {
        let store = MemoryStore::new();
        let p = store.create_product(comic_books(), now()).await.unwrap();
        store.add_sale(p.id, NewSale { quantity: 1, paid: 10 }, now()).await.unwrap();

        store.delete_product(p.id).await.unwrap();
        store.delete_product(p.id).await.unwrap();
        assert!(store.list_products().await.unwrap().is_empty());
        assert!(store.list_sales(p.id).await.unwrap().is_empty());
    }
}
