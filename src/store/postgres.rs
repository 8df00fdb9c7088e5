//! PostgreSQL store.
//!
//! Expects the tables in `migrations/0001_schema.sql`. Queries are checked at runtime, so
//! the crate builds without a reachable database.

use anyhow::Context as _;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use uuid::Uuid;

use crate::error::Error;
use crate::product::{NewProduct, NewSale, Product, Sale, UpdateProduct};
use crate::user::User;

use super::{PRODUCT_NOT_FOUND, Store};

const SELECT_PRODUCTS: &str = r#"
    SELECT
        p.product_id AS id, p.name, p.cost, p.quantity,
        COALESCE(SUM(s.quantity), 0)::int AS sold,
        COALESCE(SUM(s.paid), 0)::int AS revenue,
        p.date_created, p.date_updated
    FROM products AS p
    LEFT JOIN sales AS s ON p.product_id = s.product_id
"#;

/// Where and how to connect.
#[derive(Clone, Debug)]
pub struct DbConfig {
    /// Full connection string; overrides the individual fields when set.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub disable_tls: bool,
    pub max_connections: u32,
}

impl DbConfig {
    fn connect_options(&self) -> anyhow::Result<PgConnectOptions> {
        let options = match &self.url {
            Some(url) => url.parse::<PgConnectOptions>().context("parsing database url")?,
            None => PgConnectOptions::new()
                .host(&self.host)
                .port(self.port)
                .username(&self.user)
                .password(&self.password)
                .database(&self.name)
                .ssl_mode(if self.disable_tls { PgSslMode::Disable } else { PgSslMode::Require }),
        };
        Ok(options.options([("timezone", "UTC")]))
    }
}

/// A [`Store`] over a `sqlx` connection pool.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Builds the pool without connecting. The first query (normally the
    /// health check) opens the first connection.
    pub fn open(config: &DbConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_lazy_with(config.connect_options()?);
        Ok(pool.into())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl From<PgPool> for PgStore {
    fn from(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Wraps a driver error into an internal error carrying `what`.
fn db(what: &'static str) -> impl FnOnce(sqlx::Error) -> Error {
    move |e| Error::Internal(anyhow::Error::new(e).context(what))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}

#[async_trait]
impl Store for PgStore {
    async fn status_check(&self) -> anyhow::Result<()> {
        // Forces a round trip; a pooled connection may have gone stale.
        sqlx::query_scalar::<_, bool>("SELECT true")
            .fetch_one(&self.pool)
            .await
            .context("status check")?;
        Ok(())
    }

    async fn list_products(&self) -> Result<Vec<Product>, Error> {
        let q = format!("{SELECT_PRODUCTS} GROUP BY p.product_id ORDER BY p.date_created");
        sqlx::query_as::<_, Product>(&q)
            .fetch_all(&self.pool)
            .await
            .map_err(db("selecting products"))
    }

    async fn retrieve_product(&self, id: Uuid) -> Result<Product, Error> {
        let q = format!("{SELECT_PRODUCTS} WHERE p.product_id = $1 GROUP BY p.product_id");
        sqlx::query_as::<_, Product>(&q)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db("selecting single product"))?
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

        sqlx::query(
            r#"INSERT INTO products (product_id, name, cost, quantity, date_created, date_updated)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(product.cost)
        .bind(product.quantity)
        .bind(product.date_created)
        .bind(product.date_updated)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return Error::integrity(format!("duplicate product id {}", product.id));
            }
            db("inserting product")(e)
        })?;

        Ok(product)
    }

    async fn update_product(
        &self,
        id: Uuid,
        update: UpdateProduct,
        now: DateTime<Utc>,
    ) -> Result<(), Error> {
        // One statement, so concurrent partial updates never overwrite each
        // other's fields with stale values.
        let result = sqlx::query(
            r#"UPDATE products SET
                   name = COALESCE($2, name),
                   cost = COALESCE($3, cost),
                   quantity = COALESCE($4, quantity),
                   date_updated = $5
               WHERE product_id = $1"#,
        )
        .bind(id)
        .bind(update.name)
        .bind(update.cost)
        .bind(update.quantity)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db("updating product"))?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found(PRODUCT_NOT_FOUND));
        }
        Ok(())
    }

    async fn delete_product(&self, id: Uuid) -> Result<(), Error> {
        // Sales go with it through ON DELETE CASCADE.
        sqlx::query("DELETE FROM products WHERE product_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db("deleting product"))?;
        Ok(())
    }

    async fn add_sale(
        &self,
        product_id: Uuid,
        ns: NewSale,
        now: DateTime<Utc>,
    ) -> Result<Sale, Error> {
        let sale = Sale {
            id: Uuid::new_v4(),
            product_id,
            quantity: ns.quantity,
            paid: ns.paid,
            date_created: now,
        };

        let mut tx = self.pool.begin().await.map_err(db("starting sale transaction"))?;

        // The row lock serializes sales of one product until commit, so the
        // totals checked here are the totals the sale lands on.
        let locked = sqlx::query("SELECT product_id FROM products WHERE product_id = $1 FOR UPDATE")
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db("locking product"))?;
        if locked.is_none() {
            return Err(Error::not_found(PRODUCT_NOT_FOUND));
        }

        let q = format!("{SELECT_PRODUCTS} WHERE p.product_id = $1 GROUP BY p.product_id");
        let mut product = sqlx::query_as::<_, Product>(&q)
            .bind(product_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(db("selecting product totals"))?;
        product.record_sale(&sale)?;

        sqlx::query(
            r#"INSERT INTO sales (sale_id, product_id, quantity, paid, date_created)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(sale.id)
        .bind(sale.product_id)
        .bind(sale.quantity)
        .bind(sale.paid)
        .bind(sale.date_created)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                return Error::not_found(PRODUCT_NOT_FOUND);
            }
            if is_unique_violation(&e) {
                return Error::integrity(format!("duplicate sale id {}", sale.id));
            }
            db("inserting sale")(e)
        })?;

        tx.commit().await.map_err(db("committing sale"))?;
        Ok(sale)
    }

    async fn list_sales(&self, product_id: Uuid) -> Result<Vec<Sale>, Error> {
        sqlx::query_as::<_, Sale>(
            r#"SELECT sale_id AS id, product_id, quantity, paid, date_created
               FROM sales WHERE product_id = $1 ORDER BY date_created"#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db("selecting sales"))
    }

    async fn create_user(&self, user: User) -> Result<User, Error> {
        sqlx::query(
            r#"INSERT INTO users (user_id, name, email, roles, password_hash, date_created, date_updated)
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.roles)
        .bind(&user.password_hash)
        .bind(user.date_created)
        .bind(user.date_updated)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return Error::bad_request(format!("email {} is already registered", user.email));
            }
            db("inserting user")(e)
        })?;

        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        sqlx::query_as::<_, User>(
            r#"SELECT user_id AS id, name, email, roles, password_hash, date_created, date_updated
               FROM users WHERE lower(email) = lower($1)"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db("selecting user by email"))
    }
}
