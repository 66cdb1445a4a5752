//! Persistence layer — libSQL-backed storage for project cards.

pub mod card_store;
pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use card_store::CardStore;
pub use libsql_backend::LibSqlBackend;
pub use traits::CardDatabase;
