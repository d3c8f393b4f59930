//! # Lingo Common Library
//!
//! Shared code for the Lingo player workspace including:
//! - Subtitle track data model (`SubtitleItem`)
//! - Engine configuration loading
//! - Epsilon-tolerant media time helpers
//! - Error types

pub mod config;
pub mod error;
pub mod subtitle;
pub mod time;

pub use error::{Error, Result};
pub use subtitle::SubtitleItem;
