// src/store/memory.rs

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, Utc};

use super::{CategoryStore, ProductStore, StoreResult, TransactionStore};
use crate::categories::category_structs::{Category, NewCategory};
use crate::error::StoreError;
use crate::products::product_structs::{NewProduct, Product};
use crate::transactions::transaction_structs::{
    BestSeller, CheckoutItem, DailyTotals, PendingDetail, ProductSnapshot, Transaction,
    TransactionDetail,
};

/// Source of "now" for transaction timestamps and the daily window.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Default)]
struct MemoryState {
    products: BTreeMap<i32, Product>,
    categories: BTreeMap<i32, Category>,
    transactions: BTreeMap<i32, Transaction>,
    last_product_id: i32,
    last_category_id: i32,
    last_transaction_id: i32,
    last_detail_id: i32,
}

impl MemoryState {
    fn with_category(&self, product: &Product) -> Product {
        let mut product = product.clone();
        product.category = product
            .category_id
            .and_then(|id| self.categories.get(&id).cloned());
        product
    }

    fn check_category_ref(&self, category_id: Option<i32>) -> StoreResult<()> {
        match category_id {
            Some(id) if !self.categories.contains_key(&id) => Err(StoreError::Constraint(format!(
                "category with id {id} does not exist"
            ))),
            _ => Ok(()),
        }
    }

    fn product_is_sold(&self, product_id: i32) -> bool {
        self.transactions
            .values()
            .flat_map(|t| t.details.iter())
            .any(|d| d.product_id == product_id)
    }
}

/// Store kept in process memory, keyed by id.
///
/// All state sits behind one lock, so a checkout holds the write lock for its
/// whole unit of work and either applies everything or nothing.
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    clock: Clock,
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::with_clock(Arc::new(Utc::now))
    }

    pub fn with_clock(clock: Clock) -> Self {
        MemoryStore {
            state: RwLock::new(MemoryState::default()),
            clock,
        }
    }

    /// Demo catalog used for local runs without a database.
    pub fn with_demo_data() -> Self {
        let store = MemoryStore::new();
        if let Ok(mut state) = store.state.write() {
            for (name, description) in [
                ("Food", "Makanan Siap Santap"),
                ("Beverage", "Pelepas dahaga"),
                ("Snack", "Penunda lapar"),
            ] {
                state.last_category_id += 1;
                let id = state.last_category_id;
                state.categories.insert(
                    id,
                    Category {
                        id,
                        name: name.to_string(),
                        description: description.to_string(),
                    },
                );
            }

            for (name, price, stock, category_id) in [
                ("Mie Goreng Super", 22000, 50, 1),
                ("Nasi Goreng Super", 22000, 100, 1),
                ("Jeruk Panas", 5000, 80, 2),
            ] {
                state.last_product_id += 1;
                let id = state.last_product_id;
                state.products.insert(
                    id,
                    Product {
                        id,
                        name: name.to_string(),
                        price,
                        stock,
                        category_id: Some(category_id),
                        category: None,
                    },
                );
            }
        }
        store
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, MemoryState>> {
        self.state.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state.write().map_err(|_| StoreError::Poisoned)
    }

    /// Calendar day of the server's local time zone.
    fn today(&self) -> NaiveDate {
        (self.clock)().with_timezone(&Local).date_naive()
    }

    fn is_today(created_at: &DateTime<Utc>, today: NaiveDate) -> bool {
        created_at.with_timezone(&Local).date_naive() == today
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn get_all(&self) -> StoreResult<Vec<Product>> {
        Ok(self.read()?.products.values().cloned().collect())
    }

    async fn get_all_with_category(&self) -> StoreResult<Vec<Product>> {
        let state = self.read()?;
        Ok(state
            .products
            .values()
            .map(|p| state.with_category(p))
            .collect())
    }

    async fn get_by_id(&self, id: i32) -> StoreResult<Product> {
        self.read()?
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("product", id))
    }

    async fn get_by_id_with_category(&self, id: i32) -> StoreResult<Product> {
        let state = self.read()?;
        state
            .products
            .get(&id)
            .map(|p| state.with_category(p))
            .ok_or_else(|| StoreError::not_found("product", id))
    }

    async fn create(&self, product: NewProduct) -> StoreResult<Product> {
        let mut state = self.write()?;
        state.check_category_ref(product.category_id)?;

        state.last_product_id += 1;
        let created = Product::from_new(state.last_product_id, product);
        state.products.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: i32, product: NewProduct) -> StoreResult<Product> {
        let mut state = self.write()?;
        if !state.products.contains_key(&id) {
            return Err(StoreError::not_found("product", id));
        }
        state.check_category_ref(product.category_id)?;

        let updated = Product::from_new(id, product);
        state.products.insert(id, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, id: i32) -> StoreResult<()> {
        let mut state = self.write()?;
        if !state.products.contains_key(&id) {
            return Err(StoreError::not_found("product", id));
        }
        if state.product_is_sold(id) {
            return Err(StoreError::Constraint(format!(
                "product with id {id} is referenced by recorded transactions"
            )));
        }
        state.products.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn get_all(&self) -> StoreResult<Vec<Category>> {
        Ok(self.read()?.categories.values().cloned().collect())
    }

    async fn get_by_id(&self, id: i32) -> StoreResult<Category> {
        self.read()?
            .categories
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("category", id))
    }

    async fn create(&self, category: NewCategory) -> StoreResult<Category> {
        let mut state = self.write()?;
        state.last_category_id += 1;
        let created = Category::from_new(state.last_category_id, category);
        state.categories.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: i32, category: NewCategory) -> StoreResult<Category> {
        let mut state = self.write()?;
        match state.categories.get_mut(&id) {
            Some(existing) => {
                *existing = Category::from_new(id, category);
                Ok(existing.clone())
            }
            None => Err(StoreError::not_found("category", id)),
        }
    }

    async fn delete(&self, id: i32) -> StoreResult<()> {
        let mut state = self.write()?;
        if !state.categories.contains_key(&id) {
            return Err(StoreError::not_found("category", id));
        }
        if state.products.values().any(|p| p.category_id == Some(id)) {
            return Err(StoreError::Constraint(format!(
                "category with id {id} still has products"
            )));
        }
        state.categories.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn create_transaction(&self, items: &[CheckoutItem]) -> StoreResult<Transaction> {
        let mut state = self.write()?;

        // Price every line first; nothing is mutated until all of them pass.
        let mut reserved: HashMap<i32, i32> = HashMap::new();
        let mut pending = Vec::with_capacity(items.len());
        let mut total_amount: i64 = 0;

        for item in items {
            let product = state
                .products
                .get(&item.product_id)
                .ok_or(StoreError::ProductNotFound(item.product_id))?;
            let snapshot = ProductSnapshot {
                id: product.id,
                name: product.name.clone(),
                price: product.price,
                stock: product.stock,
            };

            let already_reserved = reserved.get(&snapshot.id).copied().unwrap_or(0);
            let line = PendingDetail::price_line(&snapshot, item.quantity, already_reserved)?;
            *reserved.entry(snapshot.id).or_insert(0) += item.quantity;

            total_amount = line.add_to(total_amount)?;
            pending.push(line);
        }

        for (product_id, quantity) in &reserved {
            if let Some(product) = state.products.get_mut(product_id) {
                product.stock -= quantity;
            }
        }

        state.last_transaction_id += 1;
        let transaction_id = state.last_transaction_id;

        let mut details = Vec::with_capacity(pending.len());
        for line in pending {
            state.last_detail_id += 1;
            details.push(TransactionDetail {
                id: state.last_detail_id,
                transaction_id,
                product_id: line.product_id,
                product_name: line.product_name,
                quantity: line.quantity,
                subtotal: line.subtotal,
            });
        }

        let transaction = Transaction {
            id: transaction_id,
            total_amount,
            created_at: (self.clock)(),
            details,
        };
        state.transactions.insert(transaction_id, transaction.clone());
        Ok(transaction)
    }

    async fn get_by_id(&self, id: i32) -> StoreResult<Transaction> {
        self.read()?
            .transactions
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("transaction", id))
    }

    async fn get_summary_today(&self) -> StoreResult<DailyTotals> {
        let today = self.today();
        let state = self.read()?;

        Ok(state
            .transactions
            .values()
            .filter(|t| Self::is_today(&t.created_at, today))
            .fold(DailyTotals::default(), |mut totals, t| {
                totals.total_revenue += t.total_amount;
                totals.total_transaction_count += 1;
                totals
            }))
    }

    async fn get_best_seller_today(&self) -> StoreResult<BestSeller> {
        let today = self.today();
        let state = self.read()?;

        let mut sold: HashMap<&str, i64> = HashMap::new();
        for detail in state
            .transactions
            .values()
            .filter(|t| Self::is_today(&t.created_at, today))
            .flat_map(|t| t.details.iter())
        {
            *sold.entry(detail.product_name.as_str()).or_insert(0) += i64::from(detail.quantity);
        }

        Ok(sold
            .into_iter()
            .min_by(|(name_a, qty_a), (name_b, qty_b)| {
                qty_b.cmp(qty_a).then_with(|| name_a.cmp(name_b))
            })
            .map(|(name, quantity)| BestSeller {
                name: name.to_string(),
                quantity,
            })
            .unwrap_or_default())
    }
}
