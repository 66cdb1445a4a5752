//! CardStore — the card persistence facade handed to the UI layer.
//!
//! Constructed once at startup and passed by reference. It stays unusable
//! until `init()` succeeds: every other operation fails with
//! [`DatabaseError::Uninitialized`] instead of opening the database lazily.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::cards::model::{Card, CardFields, CardId};
use crate::config::{StoreConfig, StoreLocation};
use crate::error::DatabaseError;
use crate::store::libsql_backend::LibSqlBackend;
use crate::store::traits::CardDatabase;

/// Initialization-gated card storage.
pub struct CardStore {
    location: Option<StoreLocation>,
    backend: OnceCell<Arc<dyn CardDatabase>>,
}

impl CardStore {
    /// An uninitialized store that will open `location` on `init()`.
    pub fn new(location: StoreLocation) -> Self {
        Self {
            location: Some(location),
            backend: OnceCell::new(),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.location.clone())
    }

    /// Build a store from `config` and initialize it in one step.
    pub async fn open(config: &StoreConfig) -> crate::error::Result<Self> {
        let store = Self::from_config(config);
        store.init().await?;
        Ok(store)
    }

    /// A store over an already-initialized backend.
    pub fn with_backend(backend: Arc<dyn CardDatabase>) -> Self {
        Self {
            location: None,
            backend: OnceCell::new_with(Some(backend)),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.backend.initialized()
    }

    /// Open the database and ensure the schema.
    ///
    /// Calling it again after success is a no-op. After a failure the store
    /// stays uninitialized and `init()` may be retried.
    pub async fn init(&self) -> Result<(), DatabaseError> {
        if self.is_initialized() {
            debug!("Card store already initialized");
            return Ok(());
        }

        self.backend
            .get_or_try_init(|| async {
                let location = self.location.as_ref().ok_or_else(|| {
                    DatabaseError::Open("no storage location configured".to_string())
                })?;
                let backend = LibSqlBackend::open(location).await?;
                info!(location = %location, "Card store initialized");
                Ok::<_, DatabaseError>(Arc::new(backend) as Arc<dyn CardDatabase>)
            })
            .await?;
        Ok(())
    }

    fn backend(&self) -> Result<&Arc<dyn CardDatabase>, DatabaseError> {
        self.backend.get().ok_or(DatabaseError::Uninitialized)
    }

    /// Insert a new card stamped with the current time. Returns its id.
    pub async fn create(&self, fields: &CardFields) -> Result<CardId, DatabaseError> {
        self.backend()?.insert_card(fields, Utc::now()).await
    }

    /// Every card, newest first, extra media decoded.
    pub async fn fetch_all(&self) -> Result<Vec<Card>, DatabaseError> {
        self.backend()?.list_cards().await
    }

    /// The card with `id`, or `None` if there is no such card.
    pub async fn fetch_by_id(&self, id: CardId) -> Result<Option<Card>, DatabaseError> {
        self.backend()?.get_card(id).await
    }

    /// Replace the editable fields of a card. `Ok(false)` if no card has `id`.
    pub async fn update(&self, id: CardId, fields: &CardFields) -> Result<bool, DatabaseError> {
        self.backend()?.update_card(id, fields).await
    }

    /// Permanently remove a card. `Ok(false)` if no card has `id`.
    pub async fn delete(&self, id: CardId) -> Result<bool, DatabaseError> {
        self.backend()?.delete_card(id).await
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use super::*;

    /// Backend whose every operation fails at the engine level.
    struct BrokenBackend;

    #[async_trait]
    impl CardDatabase for BrokenBackend {
        async fn init_schema(&self) -> Result<(), DatabaseError> {
            Ok(())
        }
        async fn insert_card(&self, _: &CardFields, _: DateTime<Utc>) -> Result<CardId, DatabaseError> {
            Err(DatabaseError::Query("insert_card: disk I/O error".into()))
        }
        async fn list_cards(&self) -> Result<Vec<Card>, DatabaseError> {
            Err(DatabaseError::Query("list_cards: database disk image is malformed".into()))
        }
        async fn get_card(&self, _: CardId) -> Result<Option<Card>, DatabaseError> {
            Err(DatabaseError::Query("get_card: disk I/O error".into()))
        }
        async fn update_card(&self, _: CardId, _: &CardFields) -> Result<bool, DatabaseError> {
            Err(DatabaseError::Query("update_card: database or disk is full".into()))
        }
        async fn delete_card(&self, _: CardId) -> Result<bool, DatabaseError> {
            Err(DatabaseError::Query("delete_card: database is locked".into()))
        }
    }

    #[tokio::test]
    async fn operations_before_init_fail() {
        let store = CardStore::new(StoreLocation::Memory);
        assert!(!store.is_initialized());

        let fields = CardFields::new("Trip");
        assert!(matches!(store.create(&fields).await, Err(DatabaseError::Uninitialized)));
        assert!(matches!(store.fetch_all().await, Err(DatabaseError::Uninitialized)));
        assert!(matches!(store.fetch_by_id(CardId(1)).await, Err(DatabaseError::Uninitialized)));
        assert!(matches!(store.update(CardId(1), &fields).await, Err(DatabaseError::Uninitialized)));
        assert!(matches!(store.delete(CardId(1)).await, Err(DatabaseError::Uninitialized)));
    }

    #[tokio::test]
    async fn init_is_idempotent() {
        let store = CardStore::new(StoreLocation::Memory);
        store.init().await.unwrap();
        let id = store.create(&CardFields::new("kept")).await.unwrap();

        store.init().await.unwrap();
        assert!(store.is_initialized());
        assert!(store.fetch_by_id(id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn failed_init_leaves_store_unusable() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let store = CardStore::new(StoreLocation::File(blocker.join("cards.db")));
        let err = store.init().await.unwrap_err();
        assert!(err.is_init_failure(), "got {err:?}");
        assert!(!store.is_initialized());
        assert!(matches!(store.fetch_all().await, Err(DatabaseError::Uninitialized)));
    }

    #[tokio::test]
    async fn open_initializes_from_config() {
        let config = StoreConfig {
            location: StoreLocation::Memory,
            ..StoreConfig::default()
        };
        let store = CardStore::open(&config).await.unwrap();
        assert!(store.is_initialized());
        assert!(store.fetch_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn open_surfaces_init_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let config = StoreConfig {
            location: StoreLocation::File(blocker.join("cards.db")),
            ..StoreConfig::default()
        };
        match CardStore::open(&config).await {
            Err(crate::error::Error::Database(err)) => assert!(err.is_init_failure(), "got {err:?}"),
            Err(other) => panic!("unexpected {other:?}"),
            Ok(_) => panic!("open should fail"),
        }
    }

    #[tokio::test]
    async fn storage_failures_propagate_unchanged() {
        let store = CardStore::with_backend(Arc::new(BrokenBackend));
        assert!(store.is_initialized());
        store.init().await.unwrap();

        let fields = CardFields::new("Trip");
        match store.create(&fields).await {
            Err(DatabaseError::Query(msg)) => assert_eq!(msg, "insert_card: disk I/O error"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(store.fetch_all().await, Err(DatabaseError::Query(_))));
        assert!(matches!(store.fetch_by_id(CardId(1)).await, Err(DatabaseError::Query(_))));
        assert!(matches!(store.update(CardId(1), &fields).await, Err(DatabaseError::Query(_))));
        assert!(matches!(store.delete(CardId(1)).await, Err(DatabaseError::Query(_))));
    }

    #[tokio::test]
    async fn create_stamps_current_time() {
        let store = CardStore::new(StoreLocation::Memory);
        store.init().await.unwrap();

        let before = Utc::now() - chrono::Duration::milliseconds(1);
        let id = store.create(&CardFields::new("now")).await.unwrap();
        let after = Utc::now() + chrono::Duration::milliseconds(1);

        let card = store.fetch_by_id(id).await.unwrap().unwrap();
        assert!(card.created_at >= before && card.created_at <= after);
    }
}
