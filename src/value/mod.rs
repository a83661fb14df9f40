//! Value layer for buoy
//!
//! Everything that crosses the driver boundary is a `sea_query::Value` tagged with
//! a [`StoredType`]. This module maps Rust types onto those values and reports
//! extraction failures as [`ConversionError`]s.
//!
//! ## Traits
//!
//! - **`ValueType`** - Maps Rust types to their `sea_query::Value` variant and default stored type
//! - **`TryGetable`** - Safe value extraction with error handling

pub mod try_getable;
pub mod types;

pub use try_getable::{ConversionError, TryGetable};
pub use types::{is_null, StoredType, ValueType};
