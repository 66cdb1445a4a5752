//! Project cards — the data model and the extra-media column contract.

pub mod media;
pub mod model;

pub use media::{MediaDecode, MediaKind};
pub use model::{Card, CardDraft, CardFields, CardId, DraftError};
