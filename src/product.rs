//! Product and sale models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::error::Error;

/// Message for a sale whose quantity or payment would push a product's totals
/// past what they can hold.
pub const TOTALS_OVERFLOW: &str = "sale would overflow the product's sold or revenue totals";

/// An item for sale, with its sales aggregated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub cost: i32,
    pub quantity: i32,
    /// Units sold across all sales.
    pub sold: i32,
    /// Total paid across all sales.
    pub revenue: i32,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

/// What a client sends to create a product.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(range(min = 0, message = "cost must not be negative"))]
    pub cost: i32,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: i32,
}

/// Fields a client may change on an existing product. Absent fields are left
/// as they are.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct UpdateProduct {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: Option<String>,
    #[validate(range(min = 0, message = "cost must not be negative"))]
    pub cost: Option<i32>,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: Option<i32>,
}

impl UpdateProduct {
    /// Applies the present fields to `product` and stamps `now`.
    pub fn apply(&self, product: &mut Product, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            product.name.clone_from(name);
        }
        if let Some(cost) = self.cost {
            product.cost = cost;
        }
        if let Some(quantity) = self.quantity {
            product.quantity = quantity;
        }
        product.date_updated = now;
    }
}

impl Product {
    /// Adds `sale` to the aggregated totals. Both totals are computed before
    /// either is written, so a rejected sale leaves the product untouched.
    pub fn record_sale(&mut self, sale: &Sale) -> Result<(), Error> {
        let sold = self.sold.checked_add(sale.quantity);
        let revenue = self.revenue.checked_add(sale.paid);
        let (Some(sold), Some(revenue)) = (sold, revenue) else {
            return Err(Error::bad_request(TOTALS_OVERFLOW));
        };
        self.sold = sold;
        self.revenue = revenue;
        Ok(())
    }
}

/// A recorded sale of some quantity of one product.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Sale {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub paid: i32,
    pub date_created: DateTime<Utc>,
}

/// What a client sends to record a sale.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewSale {
    #[validate(range(min = 0, message = "quantity must not be negative"))]
    pub quantity: i32,
    #[validate(range(min = 0, message = "paid must not be negative"))]
    pub paid: i32,
}
