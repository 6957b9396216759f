// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, QueryBuilder};

use super::{CategoryStore, ProductStore, StoreResult, TransactionStore};
use crate::categories::category_structs::{Category, NewCategory};
use crate::config::PoolSettings;
use crate::error::StoreError;
use crate::products::product_structs::{NewProduct, Product};
use crate::transactions::transaction_structs::{
    BestSeller, CheckoutItem, DailyTotals, PendingDetail, ProductSnapshot, Transaction,
    TransactionDetail,
};

/// Postgres SQLSTATE for foreign_key_violation
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// `[start_of_today, start_of_tomorrow)` on the database clock and time zone.
const TODAY_WINDOW: &str =
    "t.created_at >= CURRENT_DATE AND t.created_at < CURRENT_DATE + INTERVAL '1 day'";

/// Store backed by the relational tables in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    price: i64,
    stock: i32,
    category_id: Option<i32>,
}

/// Product LEFT JOIN category. The `cat_*` columns are all NULL when nothing joined.
#[derive(FromRow)]
struct ProductWithCategoryRow {
    id: i32,
    name: String,
    price: i64,
    stock: i32,
    category_id: Option<i32>,
    cat_id: Option<i32>,
    cat_name: Option<String>,
    cat_description: Option<String>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            price: row.price,
            stock: row.stock,
            category_id: row.category_id,
            category: None,
        }
    }
}

impl From<ProductWithCategoryRow> for Product {
    fn from(row: ProductWithCategoryRow) -> Self {
        let category = row.cat_id.map(|id| Category {
            id,
            name: row.cat_name.unwrap_or_default(),
            description: row.cat_description.unwrap_or_default(),
        });

        Product {
            id: row.id,
            name: row.name,
            price: row.price,
            stock: row.stock,
            category_id: row.category_id,
            category,
        }
    }
}

const PRODUCT_WITH_CATEGORY_SELECT: &str = r#"
    SELECT p.id, p.name, p.price, p.stock, p.category_id,
           c.id AS cat_id, c.name AS cat_name, c.description AS cat_description
    FROM product p
    LEFT JOIN category c ON c.id = p.category_id
"#;

/// Turns foreign key violations into `Constraint`, leaves everything else as a database error.
fn constraint_or_db(err: sqlx::Error, message: impl FnOnce() -> String) -> StoreError {
    let is_fk_violation = err
        .as_database_error()
        .and_then(|db_err| db_err.code())
        .map_or(false, |code| code == FOREIGN_KEY_VIOLATION);

    if is_fk_violation {
        StoreError::Constraint(message())
    } else {
        StoreError::Database(err)
    }
}

fn missing_category(category_id: Option<i32>) -> String {
    match category_id {
        Some(id) => format!("category with id {id} does not exist"),
        None => "referenced category does not exist".to_string(),
    }
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    /// Opens a bounded pool against `database_url`.
    pub async fn connect(database_url: &str, settings: &PoolSettings) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .max_lifetime(settings.max_lifetime)
            .idle_timeout(settings.idle_timeout)
            .acquire_timeout(settings.acquire_timeout)
            .connect(database_url)
            .await?;

        tracing::info!(
            max_connections = settings.max_connections,
            "database connected successfully"
        );
        Ok(PgStore::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl ProductStore for PgStore {
    async fn get_all(&self) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, price, stock, category_id FROM product ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn get_all_with_category(&self) -> StoreResult<Vec<Product>> {
        let sql = format!("{PRODUCT_WITH_CATEGORY_SELECT} ORDER BY p.id");
        let rows = sqlx::query_as::<_, ProductWithCategoryRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn get_by_id(&self, id: i32) -> StoreResult<Product> {
        sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, price, stock, category_id FROM product WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Product::from)
        .ok_or_else(|| StoreError::not_found("product", id))
    }

    async fn get_by_id_with_category(&self, id: i32) -> StoreResult<Product> {
        let sql = format!("{PRODUCT_WITH_CATEGORY_SELECT} WHERE p.id = $1");
        sqlx::query_as::<_, ProductWithCategoryRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Product::from)
            .ok_or_else(|| StoreError::not_found("product", id))
    }

    async fn create(&self, product: NewProduct) -> StoreResult<Product> {
        let id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO product (name, price, stock, category_id) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&product.name)
        .bind(product.price)
        .bind(product.stock)
        .bind(product.category_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| constraint_or_db(e, || missing_category(product.category_id)))?;

        Ok(Product::from_new(id, product))
    }

    async fn update(&self, id: i32, product: NewProduct) -> StoreResult<Product> {
        let result = sqlx::query(
            "UPDATE product SET name = $1, price = $2, stock = $3, category_id = $4 WHERE id = $5",
        )
        .bind(&product.name)
        .bind(product.price)
        .bind(product.stock)
        .bind(product.category_id)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| constraint_or_db(e, || missing_category(product.category_id)))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("product", id));
        }
        Ok(Product::from_new(id, product))
    }

    async fn delete(&self, id: i32) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM product WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                constraint_or_db(e, || {
                    format!("product with id {id} is referenced by recorded transactions")
                })
            })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("product", id));
        }
        Ok(())
    }
}

#[async_trait]
impl CategoryStore for PgStore {
    async fn get_all(&self) -> StoreResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, description FROM category ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    async fn get_by_id(&self, id: i32) -> StoreResult<Category> {
        sqlx::query_as::<_, Category>("SELECT id, name, description FROM category WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("category", id))
    }

    async fn create(&self, category: NewCategory) -> StoreResult<Category> {
        let id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO category (name, description) VALUES ($1, $2) RETURNING id",
        )
        .bind(&category.name)
        .bind(&category.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(Category::from_new(id, category))
    }

    async fn update(&self, id: i32, category: NewCategory) -> StoreResult<Category> {
        let result = sqlx::query("UPDATE category SET name = $1, description = $2 WHERE id = $3")
            .bind(&category.name)
            .bind(&category.description)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("category", id));
        }
        Ok(Category::from_new(id, category))
    }

    async fn delete(&self, id: i32) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM category WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                constraint_or_db(e, || format!("category with id {id} still has products"))
            })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("category", id));
        }
        Ok(())
    }
}

#[async_trait]
impl TransactionStore for PgStore {
    async fn create_transaction(&self, items: &[CheckoutItem]) -> StoreResult<Transaction> {
        // 1. Open the unit of work. Dropping `tx` on any early return rolls it back.
        let mut tx = self.pool.begin().await?;

        let mut total_amount: i64 = 0;
        let mut pending: Vec<PendingDetail> = Vec::with_capacity(items.len());

        for item in items {
            // 2. Lock the product row until commit. A repeated product sees the
            //    stock already decremented by its earlier line.
            let product = sqlx::query_as::<_, ProductSnapshot>(
                "SELECT id, name, price, stock FROM product WHERE id = $1 FOR UPDATE",
            )
            .bind(item.product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::ProductNotFound(item.product_id))?;

            // 3. Check stock and price the line at the current price.
            let line = PendingDetail::price_line(&product, item.quantity, 0)?;
            total_amount = line.add_to(total_amount)?;

            // 4. Take the quantity out of stock.
            sqlx::query("UPDATE product SET stock = stock - $1 WHERE id = $2")
                .bind(item.quantity)
                .bind(product.id)
                .execute(&mut *tx)
                .await?;

            pending.push(line);
        }

        // 5. Header row.
        let (transaction_id, created_at): (i32, DateTime<Utc>) = sqlx::query_as(
            "INSERT INTO transactions (total_amount) VALUES ($1) RETURNING id, created_at",
        )
        .bind(total_amount)
        .fetch_one(&mut *tx)
        .await?;

        // 6. All detail lines in one statement.
        let mut insert = QueryBuilder::<Postgres>::new(
            "INSERT INTO transaction_details (transaction_id, product_id, product_name, quantity, subtotal) ",
        );
        insert.push_values(pending, |mut row, line| {
            row.push_bind(transaction_id)
                .push_bind(line.product_id)
                .push_bind(line.product_name)
                .push_bind(line.quantity)
                .push_bind(line.subtotal);
        });
        insert.push(" RETURNING id, transaction_id, product_id, product_name, quantity, subtotal");

        let mut details = insert
            .build_query_as::<TransactionDetail>()
            .fetch_all(&mut *tx)
            .await?;
        details.sort_by_key(|detail| detail.id);

        // 7. Commit. Stock, header and lines become visible together.
        tx.commit().await?;

        Ok(Transaction {
            id: transaction_id,
            total_amount,
            created_at,
            details,
        })
    }

    async fn get_by_id(&self, id: i32) -> StoreResult<Transaction> {
        let (id, total_amount, created_at) = sqlx::query_as::<_, (i32, i64, DateTime<Utc>)>(
            "SELECT id, total_amount, created_at FROM transactions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("transaction", id))?;

        let details = sqlx::query_as::<_, TransactionDetail>(
            r#"
            SELECT id, transaction_id, product_id, product_name, quantity, subtotal
            FROM transaction_details
            WHERE transaction_id = $1
            ORDER BY id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Transaction {
            id,
            total_amount,
            created_at,
            details,
        })
    }

    async fn get_summary_today(&self) -> StoreResult<DailyTotals> {
        let sql = format!(
            r#"
            SELECT COALESCE(SUM(t.total_amount), 0)::BIGINT AS total_revenue,
                   COUNT(*) AS total_transaction_count
            FROM transactions t
            WHERE {TODAY_WINDOW}
            "#
        );
        let (total_revenue, total_transaction_count): (i64, i64) =
            sqlx::query_as(&sql).fetch_one(&self.pool).await?;

        Ok(DailyTotals {
            total_revenue,
            total_transaction_count,
        })
    }

    async fn get_best_seller_today(&self) -> StoreResult<BestSeller> {
        // COLLATE "C" keeps the name tie-break a plain byte-wise comparison.
        let sql = format!(
            r#"
            SELECT td.product_name AS name, SUM(td.quantity)::BIGINT AS qty_sold
            FROM transaction_details td
            JOIN transactions t ON t.id = td.transaction_id
            WHERE {TODAY_WINDOW}
            GROUP BY td.product_name
            ORDER BY qty_sold DESC, td.product_name COLLATE "C" ASC
            LIMIT 1
            "#
        );
        let best = sqlx::query_as::<_, (String, i64)>(&sql)
            .fetch_optional(&self.pool)
            .await?;

        Ok(best
            .map(|(name, quantity)| BestSeller { name, quantity })
            .unwrap_or_default())
    }
}
