//! Core data structures shared across the engine.

mod filter;
mod paper;
mod raw;

pub use filter::FilterParams;
pub use paper::{Paper, PaperType, SourceType};
pub use raw::{RawAuthor, RawRecord};
