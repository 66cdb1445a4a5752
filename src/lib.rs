//! BetaStack — local storage for project cards.

pub mod cards;
pub mod cli;
pub mod config;
pub mod error;
pub mod store;
