//! libSQL backend — async `CardDatabase` implementation.
//!
//! Supports local file and in-memory databases. One connection is opened per
//! backend and reused for every operation.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info, warn};

use crate::cards::media::{FallbackReason, MediaDecode, decode_extra_media, encode_extra_media};
use crate::cards::model::{Card, CardFields, CardId};
use crate::config::StoreLocation;
use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::CardDatabase;

/// libSQL database backend.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open the database at `location` and run migrations.
    pub async fn open(location: &StoreLocation) -> Result<Self, DatabaseError> {
        match location {
            StoreLocation::File(path) => Self::new_local(path).await,
            StoreLocation::Memory => Self::new_memory().await,
        }
    }

    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Open(format!(
                    "Failed to create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Open(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        backend.init_schema().await?;
        info!(path = %path.display(), "Card store opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| DatabaseError::Open(format!("Failed to create in-memory database: {e}")))?;

        let backend = Self::from_database(db)?;
        backend.init_schema().await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Open(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Canonical `createdAt` form: RFC 3339, millisecond precision, `Z` suffix.
/// Fixed width, so text order is time order.
pub fn format_created_at(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

/// Read a nullable TEXT column. NULL is `None`; any other non-text value is
/// a query error rather than a silent `None`.
fn read_opt_text(row: &libsql::Row, idx: i32, column: &str) -> Result<Option<String>, DatabaseError> {
    match row.get_value(idx) {
        Ok(libsql::Value::Text(s)) => Ok(Some(s)),
        Ok(libsql::Value::Null) => Ok(None),
        Ok(other) => Err(DatabaseError::Query(format!(
            "card.{column}: expected text, found {other:?}"
        ))),
        Err(e) => Err(DatabaseError::Query(format!("card.{column}: {e}"))),
    }
}

/// Read the extra-media column without ever failing the row.
fn read_extra_media(row: &libsql::Row, idx: i32) -> MediaDecode {
    match row.get_value(idx) {
        Ok(libsql::Value::Text(s)) => decode_extra_media(Some(&s)),
        Ok(libsql::Value::Null) | Err(_) => decode_extra_media(None),
        Ok(_) => MediaDecode::Fallback(FallbackReason::NotText),
    }
}

/// Map a libsql Row to a Card.
///
/// Column order matches CARD_COLUMNS:
/// 0:id, 1:title, 2:notes, 3:imageUri, 4:extraMediaUris, 5:createdAt
fn row_to_card(row: &libsql::Row) -> Result<Card, DatabaseError> {
    let id: i64 = row
        .get(0)
        .map_err(|e| DatabaseError::Query(format!("card.id: {e}")))?;
    let title: String = row
        .get(1)
        .map_err(|e| DatabaseError::Query(format!("card.title: {e}")))?;
    let notes = read_opt_text(row, 2, "notes")?;
    let image_uri = read_opt_text(row, 3, "imageUri")?;

    let extra_media = read_extra_media(row, 4);
    match &extra_media {
        MediaDecode::Fallback(FallbackReason::Missing) => {}
        MediaDecode::Fallback(reason) => {
            warn!(card_id = id, %reason, "Unreadable extraMediaUris, using empty list");
        }
        MediaDecode::Decoded(_) => {}
    }

    let created_str: Option<String> = row.get(5).ok();
    let created_at = created_str
        .map(|s| parse_datetime(&s))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    Ok(Card {
        id: CardId(id),
        title,
        notes,
        image_uri,
        extra_media_uris: extra_media.into_uris(),
        created_at,
    })
}

// ── Trait implementation ────────────────────────────────────────────

const CARD_COLUMNS: &str = "id, title, notes, imageUri, extraMediaUris, createdAt";

#[async_trait]
impl CardDatabase for LibSqlBackend {
    async fn init_schema(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    async fn insert_card(
        &self,
        fields: &CardFields,
        created_at: DateTime<Utc>,
    ) -> Result<CardId, DatabaseError> {
        let conn = self.conn();
        let extra_json = encode_extra_media(&fields.extra_media_uris)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        let mut rows = conn
            .query(
                "INSERT INTO cards (title, notes, imageUri, extraMediaUris, createdAt) VALUES (?1, ?2, ?3, ?4, ?5) RETURNING id",
                params![
                    fields.title.as_str(),
                    opt_text(fields.notes.as_deref()),
                    opt_text(fields.image_uri.as_deref()),
                    extra_json,
                    format_created_at(created_at),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_card: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_card: {e}")))?
            .ok_or_else(|| DatabaseError::Query("insert_card: no id returned".to_string()))?;
        let id: i64 = row
            .get(0)
            .map_err(|e| DatabaseError::Query(format!("insert_card id: {e}")))?;

        debug!(card_id = id, extra_media = fields.extra_media_uris.len(), "Card inserted into DB");
        Ok(CardId(id))
    }

    async fn list_cards(&self) -> Result<Vec<Card>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {CARD_COLUMNS} FROM cards ORDER BY id DESC"),
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_cards: {e}")))?;

        let mut cards = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_cards: {e}")))?
        {
            cards.push(row_to_card(&row)?);
        }
        // Stored stamps may mix RFC 3339 and SQLite's space-separated form,
        // which do not sort together as text. Order on the parsed value.
        cards.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        debug!(count = cards.len(), "Cards listed");
        Ok(cards)
    }

    async fn get_card(&self, id: CardId) -> Result<Option<Card>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = ?1"),
                params![id.0],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_card: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_card(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_card: {e}"))),
        }
    }

    async fn update_card(&self, id: CardId, fields: &CardFields) -> Result<bool, DatabaseError> {
        let conn = self.conn();
        let extra_json = encode_extra_media(&fields.extra_media_uris)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        let count = conn
            .execute(
                "UPDATE cards SET title = ?1, notes = ?2, imageUri = ?3, extraMediaUris = ?4 WHERE id = ?5",
                params![
                    fields.title.as_str(),
                    opt_text(fields.notes.as_deref()),
                    opt_text(fields.image_uri.as_deref()),
                    extra_json,
                    id.0,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_card: {e}")))?;

        debug!(card_id = %id, matched = count > 0, "Card updated in DB");
        Ok(count > 0)
    }

    async fn delete_card(&self, id: CardId) -> Result<bool, DatabaseError> {
        let conn = self.conn();
        let count = conn
            .execute("DELETE FROM cards WHERE id = ?1", params![id.0])
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_card: {e}")))?;

        debug!(card_id = %id, deleted = count > 0, "Card deleted from DB");
        Ok(count > 0)
    }
}
