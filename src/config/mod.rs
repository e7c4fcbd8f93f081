//! Conversion configuration
//!
//! Provides the lookup tables (numeric id → name) and the per-object wire pin
//! offsets that drive a conversion run.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
