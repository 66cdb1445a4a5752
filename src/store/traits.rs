//! `CardDatabase` trait — backend-agnostic async interface for card persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::cards::model::{Card, CardFields, CardId};
use crate::error::DatabaseError;

/// One round trip to the storage engine per method.
#[async_trait]
pub trait CardDatabase: Send + Sync {
    /// Ensure the schema exists and is current.
    async fn init_schema(&self) -> Result<(), DatabaseError>;

    /// Insert a card stamped with `created_at`, returning the assigned id.
    async fn insert_card(
        &self,
        fields: &CardFields,
        created_at: DateTime<Utc>,
    ) -> Result<CardId, DatabaseError>;

    /// All cards, newest first.
    async fn list_cards(&self) -> Result<Vec<Card>, DatabaseError>;

    /// A single card, or `None` if no row has that id.
    async fn get_card(&self, id: CardId) -> Result<Option<Card>, DatabaseError>;

    /// Replace the editable fields. Returns whether a row matched.
    async fn update_card(&self, id: CardId, fields: &CardFields) -> Result<bool, DatabaseError>;

    /// Remove a card. Returns whether a row was deleted.
    async fn delete_card(&self, id: CardId) -> Result<bool, DatabaseError>;
}
