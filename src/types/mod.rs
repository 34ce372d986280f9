//! Shared types

mod error;

pub use error::{BattleError, Result};
