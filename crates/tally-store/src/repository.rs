//! # Repository
//!
//! Generic in-memory collection with snapshot-on-mutate persistence.
//!
//! ## Transaction Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Operations                                │
//! │                                                                         │
//! │  Service Action            Repository Call         Effect               │
//! │  ──────────────            ───────────────         ──────               │
//! │                                                                         │
//! │  read entity ────────────► get(id) / all() ──────► clone out           │
//! │                                                                         │
//! │  mutate entity ──────────► mutate(|items| …) ────► lock, apply,        │
//! │                                                    serialize, put      │
//! │                                                                         │
//! │  NOTE: The Mutex is the whole concurrency model. One user action       │
//! │        borrows one collection exclusively for its duration; there is   │
//! │        no scheduler, no suspension point, no nested operation.         │
//! │                                                                         │
//! │  NOTE: Persistence is best-effort. If `put` fails after the in-memory  │
//! │        apply, memory and disk diverge until the next successful save;  │
//! │        the caller surfaces the fault but does not roll back.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use tally_core::{
    Customer, Invoice, Location, Order, Product, Rental, Subscription, Transfer,
};

use crate::error::{StoreError, StoreResult};
use crate::store::BlobStore;

// =============================================================================
// HasId
// =============================================================================

/// Anything a repository can key by id.
pub trait HasId {
    fn id(&self) -> &str;
}

macro_rules! impl_has_id {
    ($($entity:ty),* $(,)?) => {
        $(impl HasId for $entity {
            fn id(&self) -> &str {
                &self.id
            }
        })*
    };
}

impl_has_id!(
    Product,
    Location,
    Transfer,
    Order,
    Invoice,
    Rental,
    Subscription,
    Customer,
);

// =============================================================================
// Repository
// =============================================================================

/// A whole-collection repository: `Vec<T>` behind a `Mutex`, serialized
/// in full to the blob store after every mutation.
///
/// ## Usage
/// ```rust,ignore
/// let repo: Repository<Product> = Repository::load("products", store)?;
///
/// let before = repo.get("p-1");
/// repo.mutate(|items| items.retain(|p| p.id != "p-1"))?;
/// ```
pub struct Repository<T> {
    key: &'static str,
    store: Arc<dyn BlobStore>,
    items: Mutex<Vec<T>>,
}

impl<T> Repository<T>
where
    T: HasId + Clone + Serialize + DeserializeOwned,
{
    /// Loads the collection stored under `key`, empty if absent.
    ///
    /// A blob that exists but fails to parse is an error, not an empty
    /// collection - silently discarding a corrupt snapshot would lose data.
    pub fn load(key: &'static str, store: Arc<dyn BlobStore>) -> StoreResult<Self> {
        let items: Vec<T> = match store.get(key)? {
            Some(blob) => {
                serde_json::from_str(&blob).map_err(|err| StoreError::Corrupt {
                    key: key.to_string(),
                    message: err.to_string(),
                })?
            }
            None => Vec::new(),
        };
        debug!(key = %key, count = items.len(), "Loaded collection");
        Ok(Repository {
            key,
            store,
            items: Mutex::new(items),
        })
    }

    /// The collection key this repository persists under.
    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Clones the whole collection out.
    pub fn all(&self) -> Vec<T> {
        self.lock().clone()
    }

    /// Number of entities in the collection.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Clones out the entity with the given id, if present.
    pub fn get(&self, id: &str) -> Option<T> {
        self.lock().iter().find(|item| item.id() == id).cloned()
    }

    /// True when an entity with the given id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.lock().iter().any(|item| item.id() == id)
    }

    /// Runs a read-only closure against the collection under the lock.
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.lock())
    }

    /// Applies a mutation under the lock, then persists the whole
    /// collection. The closure's return value passes through.
    ///
    /// The in-memory mutation is kept even when persistence fails
    /// (see module docs); the error still propagates so the service
    /// layer can report the fault.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut Vec<T>) -> R) -> StoreResult<R> {
        let mut items = self.lock();
        let result = f(&mut items);
        self.persist(&items)?;
        Ok(result)
    }

    /// Replaces the whole collection (bulk import) and persists.
    pub fn replace_all(&self, new_items: Vec<T>) -> StoreResult<()> {
        let mut items = self.lock();
        *items = new_items;
        self.persist(&items)
    }

    fn persist(&self, items: &[T]) -> StoreResult<()> {
        let blob = serde_json::to_string(items)?;
        if let Err(err) = self.store.put(self.key, &blob) {
            warn!(key = %self.key, error = %err, "Snapshot write failed; memory and store now diverge");
            return Err(err);
        }
        debug!(key = %self.key, count = items.len(), "Persisted collection");
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<T>> {
        self.items.lock().expect("Repository mutex poisoned")
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Utc;
    use std::collections::HashMap;

    fn product(id: &str) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {id}"),
            sku: String::new(),
            category: None,
            supplier: None,
            qty: 0,
            loose_units: 0,
            units_per_package: 1,
            cost: 0.0,
            price: 0.0,
            reorder_point: 0,
            stock_by_location: HashMap::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_load_empty_when_absent() {
        let store = Arc::new(MemoryStore::new());
        let repo: Repository<Product> = Repository::load("products", store).unwrap();
        assert!(repo.is_empty());
    }

    #[test]
    fn test_mutate_persists_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let repo: Repository<Product> = Repository::load("products", store.clone()).unwrap();

        repo.mutate(|items| items.push(product("p-1"))).unwrap();
        assert!(repo.contains("p-1"));

        // A fresh repository over the same store sees the snapshot
        let reloaded: Repository<Product> = Repository::load("products", store).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get("p-1").unwrap().name, "Product p-1");
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        store.put("products", "this is not json").unwrap();

        let result: StoreResult<Repository<Product>> = Repository::load("products", store);
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_replace_all() {
        let store = Arc::new(MemoryStore::new());
        let repo: Repository<Product> = Repository::load("products", store).unwrap();
        repo.mutate(|items| items.push(product("old"))).unwrap();

        repo.replace_all(vec![product("a"), product("b")]).unwrap();
        assert_eq!(repo.len(), 2);
        assert!(!repo.contains("old"));
    }
}
