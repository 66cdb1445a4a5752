//! Card data model — persisted cards, write requests, and form drafts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cards::media::MediaKind;

/// Store-assigned identifier of a card. Never reused while the card exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub i64);

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CardId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(CardId)
    }
}

/// A project card as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    /// Required, but may be empty.
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Opaque reference to the main image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,
    /// Additional media in display order.
    #[serde(default)]
    pub extra_media_uris: Vec<String>,
    /// Set once at insertion; the listing order key.
    pub created_at: DateTime<Utc>,
}

impl Card {
    /// Extra media paired with their sniffed rendering kind.
    pub fn extra_media(&self) -> impl Iterator<Item = (&str, MediaKind)> {
        self.extra_media_uris
            .iter()
            .map(|uri| (uri.as_str(), MediaKind::from_uri(uri)))
    }
}

/// The user-editable fields of a card, used for both create and update.
///
/// `extra_media_uris` defaults to an empty list when omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardFields {
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub image_uri: Option<String>,
    #[serde(default)]
    pub extra_media_uris: Vec<String>,
}

impl CardFields {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_image(mut self, uri: impl Into<String>) -> Self {
        self.image_uri = Some(uri.into());
        self
    }

    pub fn with_extra_media<I, S>(mut self, uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_media_uris = uris.into_iter().map(Into::into).collect();
        self
    }
}

/// Why a form draft cannot be saved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("Please enter at least a title or main image")]
    Empty,
}

/// Contents of the create/edit form before it is saved.
///
/// The store accepts any title, including an empty one. Drafts carry the
/// stricter form rules: text is trimmed and a draft with nothing in it at all
/// is refused.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardDraft {
    pub title: String,
    pub notes: String,
    pub image_uri: Option<String>,
    pub extra_media_uris: Vec<String>,
}

impl CardDraft {
    /// Prefill a draft from an existing card for editing.
    pub fn from_card(card: &Card) -> Self {
        Self {
            title: card.title.clone(),
            notes: card.notes.clone().unwrap_or_default(),
            image_uri: card.image_uri.clone(),
            extra_media_uris: card.extra_media_uris.clone(),
        }
    }

    /// Append a picked media URI.
    pub fn push_extra(&mut self, uri: impl Into<String>) {
        self.extra_media_uris.push(uri.into());
    }

    /// Remove every occurrence of `uri`, keeping the order of the rest.
    pub fn remove_extra(&mut self, uri: &str) {
        self.extra_media_uris.retain(|u| u != uri);
    }

    pub fn clear_image(&mut self) {
        self.image_uri = None;
    }

    /// Normalize into store fields, refusing a completely empty draft.
    pub fn into_fields(self) -> Result<CardFields, DraftError> {
        let title = self.title.trim().to_string();
        let notes = self.notes.trim().to_string();
        let image_uri = self.image_uri.filter(|u| !u.trim().is_empty());

        if title.is_empty() && notes.is_empty() && image_uri.is_none() && self.extra_media_uris.is_empty() {
            return Err(DraftError::Empty);
        }

        Ok(CardFields {
            title,
            notes: if notes.is_empty() { None } else { Some(notes) },
            image_uri,
            extra_media_uris: self.extra_media_uris,
        })
    }
}
