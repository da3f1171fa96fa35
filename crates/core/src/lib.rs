#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod progress;
pub mod quiz;

pub use error::Error;
pub use model::{Catalog, CompletionState, normalize_pages};
