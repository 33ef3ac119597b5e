//! JSON document store.
//!
//! All local state lives in one JSON file:
//!
//! ## Keys
//!
//! - `users` - Users seen in a verified launch payload, keyed by id
//! - `orders` - Every placed order, in creation order
//! - `menu` - The last successfully synchronized catalog
//!
//! Missing keys default to empty; a missing file is an empty document.
//!
//! # Concurrency
//!
//! The in-memory document sits behind one async mutex. Every mutation runs
//! as a transaction scoped to one key: the closure mutates the document and
//! the whole file is rewritten (temp file, then rename) before the lock is
//! released, so concurrent checkouts cannot lose each other's writes.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use miniapp_core::{Catalog, OrderRecord, UserId, UserRecord};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the store file failed.
    #[error("store I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store file is not a valid document.
    #[error("data corruption: {0}")]
    DataCorruption(#[from] serde_json::Error),
}

/// The persisted document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub users: BTreeMap<String, UserRecord>,
    #[serde(default)]
    pub orders: Vec<OrderRecord>,
    #[serde(default)]
    pub menu: Catalog,
}

/// Handle to the document store. Clones share the same document.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    path: PathBuf,
    doc: Mutex<Document>,
}

impl Store {
    /// Open the store at `path`, loading the document if the file exists.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the file exists but cannot be read or parsed.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let doc = load(&path).await?;

        tracing::info!(
            path = %path.display(),
            users = doc.users.len(),
            orders = doc.orders.len(),
            menu_products = doc.menu.products.len(),
            "Store opened"
        );

        Ok(Self {
            inner: Arc::new(StoreInner {
                path,
                doc: Mutex::new(doc),
            }),
        })
    }

    /// Re-read the document from disk, discarding the in-memory copy.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the file cannot be read or parsed; the
    /// in-memory document is left as it was.
    pub async fn reload(&self) -> Result<(), StoreError> {
        let mut doc = self.inner.doc.lock().await;
        *doc = load(&self.inner.path).await?;
        Ok(())
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Mutate the users map and persist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the document cannot be written.
    pub async fn with_users<R>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, UserRecord>) -> R,
    ) -> Result<R, StoreError> {
        self.transaction(|doc| f(&mut doc.users)).await
    }

    /// Mutate the order list and persist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the document cannot be written.
    pub async fn with_orders<R>(
        &self,
        f: impl FnOnce(&mut Vec<OrderRecord>) -> R,
    ) -> Result<R, StoreError> {
        self.transaction(|doc| f(&mut doc.orders)).await
    }

    /// Mutate the stored catalog and persist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the document cannot be written.
    pub async fn with_catalog<R>(
        &self,
        f: impl FnOnce(&mut Catalog) -> R,
    ) -> Result<R, StoreError> {
        self.transaction(|doc| f(&mut doc.menu)).await
    }

    async fn transaction<R>(&self, f: impl FnOnce(&mut Document) -> R) -> Result<R, StoreError> {
        let mut doc = self.inner.doc.lock().await;
        let mut draft = doc.clone();
        let result = f(&mut draft);
        persist(&self.inner.path, &draft).await?;
        *doc = draft;
        Ok(result)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// The stored catalog (possibly empty).
    pub async fn catalog(&self) -> Catalog {
        self.inner.doc.lock().await.menu.clone()
    }

    /// The last `limit` orders, newest first.
    pub async fn recent_orders(&self, limit: usize) -> Vec<OrderRecord> {
        let doc = self.inner.doc.lock().await;
        doc.orders.iter().rev().take(limit).cloned().collect()
    }

    /// A user's orders, in creation order.
    pub async fn orders_for_user(&self, user_id: UserId) -> Vec<OrderRecord> {
        let doc = self.inner.doc.lock().await;
        doc.orders
            .iter()
            .filter(|o| o.user_id == Some(user_id))
            .cloned()
            .collect()
    }

    /// Number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.inner.doc.lock().await.orders.len()
    }

    /// Record a user on first sight. An existing record is left untouched.
    ///
    /// Returns the stored record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the document cannot be written.
    pub async fn upsert_user(&self, user: UserRecord) -> Result<UserRecord, StoreError> {
        self.with_users(|users| {
            users
                .entry(user.id.to_string())
                .or_insert(user)
                .clone()
        })
        .await
    }
}

async fn load(path: &Path) -> Result<Document, StoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Document::default()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Document::default()),
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

async fn persist(path: &Path, doc: &Document) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(doc)?;

    let mut tmp: OsString = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    tokio::fs::write(&tmp, json).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use miniapp_core::{Delivery, OrderLine, Price, ProductId};

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("miniapp-store-{}.json", uuid::Uuid::new_v4()))
    }

    fn order(number: &str, user: Option<i64>) -> OrderRecord {
        OrderRecord::new(
            number.to_string(),
            user.map(UserId::new),
            vec![OrderLine {
                id: ProductId::new("p1"),
                name: "Классик Бургер".to_string(),
                price: Price::from_units(350),
                qty: 1,
            }],
            Delivery::default(),
        )
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_document() {
        let store = Store::open(temp_path()).await.unwrap();
        assert!(store.catalog().await.products.is_empty());
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_missing_keys_default() {
        let path = temp_path();
        tokio::fs::write(&path, r#"{"orders":[]}"#).await.unwrap();

        let store = Store::open(&path).await.unwrap();
        assert!(store.catalog().await.categories.is_empty());
        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_transactions_persist() {
        let path = temp_path();
        let store = Store::open(&path).await.unwrap();

        store
            .with_orders(|orders| orders.push(order("aaaaaa", Some(1))))
            .await
            .unwrap();
        store
            .with_catalog(|menu| *menu = Catalog::fallback())
            .await
            .unwrap();

        let reopened = Store::open(&path).await.unwrap();
        assert_eq!(reopened.order_count().await, 1);
        assert_eq!(reopened.catalog().await, Catalog::fallback());
        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_upsert_user_first_write_wins() {
        let path = temp_path();
        let store = Store::open(&path).await.unwrap();

        let first = UserRecord {
            id: UserId::new(7),
            first_name: "Anna".to_string(),
        };
        let renamed = UserRecord {
            id: UserId::new(7),
            first_name: "Anya".to_string(),
        };
        store.upsert_user(first.clone()).await.unwrap();
        let stored = store.upsert_user(renamed).await.unwrap();

        assert_eq!(stored, first);
        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_order_queries() {
        let path = temp_path();
        let store = Store::open(&path).await.unwrap();
        store
            .with_orders(|orders| {
                orders.push(order("first1", Some(1)));
                orders.push(order("other1", Some(2)));
                orders.push(order("second", Some(1)));
            })
            .await
            .unwrap();

        let mine: Vec<String> = store
            .orders_for_user(UserId::new(1))
            .await
            .into_iter()
            .map(|o| o.number)
            .collect();
        assert_eq!(mine, ["first1", "second"]);

        let recent: Vec<String> = store
            .recent_orders(2)
            .await
            .into_iter()
            .map(|o| o.number)
            .collect();
        assert_eq!(recent, ["second", "other1"]);
        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_reload_picks_up_external_edits() {
        let path = temp_path();
        let store = Store::open(&path).await.unwrap();
        store
            .with_catalog(|menu| *menu = Catalog::fallback())
            .await
            .unwrap();

        tokio::fs::write(&path, r#"{"menu":{"categories":[],"products":[]}}"#)
            .await
            .unwrap();
        store.reload().await.unwrap();

        assert!(store.catalog().await.products.is_empty());
        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_transactions_keep_every_write() {
        let path = temp_path();
        let store = Store::open(&path).await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .with_orders(|orders| orders.push(order(&format!("n{i:05}"), None)))
                        .await
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let reopened = Store::open(&path).await.unwrap();
        assert_eq!(reopened.order_count().await, 16);
        tokio::fs::remove_file(&path).await.unwrap();
    }
}
