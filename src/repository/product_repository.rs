use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    error::Result,
    models::{NewProduct, Product},
};

/// CRUD over the products table. The Postgres implementation is the only one
/// in production; tests substitute a mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Inserts a row and returns the store-assigned id.
    async fn insert(&self, product: NewProduct) -> Result<i32>;

    async fn list_all(&self) -> Result<Vec<Product>>;

    async fn find_by_id(&self, id: i32) -> Result<Option<Product>>;

    /// Case-insensitive substring match on `name`.
    async fn find_by_name_contains(&self, fragment: &str) -> Result<Vec<Product>>;

    /// Returns whether a row was actually removed.
    async fn delete_by_id(&self, id: i32) -> Result<bool>;

    /// Removes every row and returns how many there were.
    async fn delete_all(&self) -> Result<u64>;
}

pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Persisted shape of a product. Schema knowledge stays in this module; the
/// rest of the crate only sees `Product`.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    price: f64,
    description: Option<String>,
    image_url: Option<String>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            price: row.price,
            description: row.description,
            image_url: row.image_url,
        }
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn insert(&self, product: NewProduct) -> Result<i32> {
        let (id,): (i32,) = sqlx::query_as(
            "INSERT INTO products (name, price, description, image_url)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(&product.name)
        .bind(product.price)
        .bind(&product.description)
        .bind(&product.image_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn list_all(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, price, description, image_url FROM products",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, price, description, image_url FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    async fn find_by_name_contains(&self, fragment: &str) -> Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, price, description, image_url FROM products WHERE name ILIKE $1",
        )
        .bind(format!("%{}%", fragment))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn delete_by_id(&self, id: i32) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM products")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
