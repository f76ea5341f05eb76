use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs;
use tokio::sync::Mutex;

use crate::error::AppResult;
use crate::models::{Order, Product, User};

/// One JSON-array file, held in memory behind a lock and rewritten
/// wholesale on every mutation.
pub struct Collection<T> {
    path: PathBuf,
    items: Mutex<Vec<T>>,
}

impl<T> Collection<T>
where
    T: Clone + Serialize + DeserializeOwned,
{
    async fn open(path: PathBuf) -> anyhow::Result<Self> {
        let items = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                write_atomic(&path, &Vec::<T>::new()).await?;
                Vec::new()
            }
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path,
            items: Mutex::new(items),
        })
    }

    pub async fn all(&self) -> Vec<T> {
        self.items.lock().await.clone()
    }

    /// Run `f` against the collection and persist the result. The lock is
    /// held across the file write, so read-modify-write sequences from
    /// other tasks cannot interleave. If `f` or the write fails, the
    /// pre-call contents are restored.
    pub async fn update<F, R>(&self, f: F) -> AppResult<R>
    where
        F: FnOnce(&mut Vec<T>) -> AppResult<R>,
    {
        let mut items = self.items.lock().await;
        let snapshot = items.clone();
        match f(&mut items) {
            Ok(value) => {
                if let Err(err) = write_atomic(&self.path, &items).await {
                    *items = snapshot;
                    return Err(err);
                }
                Ok(value)
            }
            Err(err) => {
                *items = snapshot;
                Err(err)
            }
        }
    }
}

async fn write_atomic<T: Serialize>(path: &Path, items: &[T]) -> AppResult<()> {
    let bytes = serde_json::to_vec_pretty(items)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, &bytes).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

/// The durable state of the shop: three JSON files under one data
/// directory. Files missing on startup are created empty.
pub struct JsonStore {
    pub users: Collection<User>,
    pub products: Collection<Product>,
    pub orders: Collection<Order>,
}

impl JsonStore {
    pub async fn open(dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(dir).await?;
        Ok(Self {
            users: Collection::open(dir.join("users.json")).await?,
            products: Collection::open(dir.join("products.json")).await?,
            orders: Collection::open(dir.join("orders.json")).await?,
        })
    }

    /// Availability check, stock decrement, and order append as one unit.
    /// Both collection locks are held for the duration (products before
    /// orders), so two concurrent purchases of the last unit cannot both
    /// pass the check. A failed order write rolls the decrement back, in
    /// memory and on disk.
    pub async fn transact_order<F>(&self, f: F) -> AppResult<Order>
    where
        F: FnOnce(&mut Vec<Product>, &mut Vec<Order>) -> AppResult<Order>,
    {
        let mut products = self.products.items.lock().await;
        let mut orders = self.orders.items.lock().await;
        let products_before = products.clone();
        let orders_before = orders.clone();

        let created = match f(&mut products, &mut orders) {
            Ok(order) => order,
            Err(err) => {
                *products = products_before;
                *orders = orders_before;
                return Err(err);
            }
        };

        if let Err(err) = write_atomic(&self.products.path, &products).await {
            *products = products_before;
            *orders = orders_before;
            return Err(err);
        }
        if let Err(err) = write_atomic(&self.orders.path, &orders).await {
            *products = products_before;
            *orders = orders_before;
            // The decrement already reached disk; put the old catalog back.
            if let Err(undo) = write_atomic(&self.products.path, &products).await {
                tracing::error!(error = %undo, "could not restore products file after failed order write");
            }
            return Err(err);
        }

        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_product(name: &str, quantity: u32) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: "test".to_string(),
            price: 10_000,
            image: None,
            quantity,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn update_persists_across_reopen() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let product = sample_product("Rose Cream", 5);
        let id = product.id;

        {
            let store = JsonStore::open(dir.path()).await?;
            store
                .products
                .update(|products| {
                    products.push(product.clone());
                    Ok(())
                })
                .await?;
        }

        let store = JsonStore::open(dir.path()).await?;
        let products = store.products.all().await;
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, id);
        assert_eq!(products[0].quantity, 5);
        Ok(())
    }

    #[tokio::test]
    async fn update_rolls_back_on_closure_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = JsonStore::open(dir.path()).await?;
        store
            .products
            .update(|products| {
                products.push(sample_product("Kept", 1));
                Ok(())
            })
            .await?;

        let result: AppResult<()> = store
            .products
            .update(|products| {
                products.clear();
                Err(AppError::BadRequest("no".into()))
            })
            .await;
        assert!(result.is_err());

        let products = store.products.all().await;
        assert_eq!(products.len(), 1, "failed update must leave state intact");
        assert_eq!(products[0].name, "Kept");
        Ok(())
    }

    #[tokio::test]
    async fn transact_order_rolls_back_both_collections() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = JsonStore::open(dir.path()).await?;
        store
            .products
            .update(|products| {
                products.push(sample_product("Serum", 3));
                Ok(())
            })
            .await?;

        let result = store
            .transact_order(|products, orders| {
                products[0].quantity -= 1;
                orders.clear();
                Err(AppError::InsufficientStock)
            })
            .await;
        assert!(matches!(result, Err(AppError::InsufficientStock)));

        assert_eq!(store.products.all().await[0].quantity, 3);
        assert!(store.orders.all().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn missing_files_are_created_empty() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = JsonStore::open(&dir.path().join("nested")).await?;
        assert!(store.users.all().await.is_empty());
        assert!(dir.path().join("nested").join("orders.json").exists());
        Ok(())
    }
}
