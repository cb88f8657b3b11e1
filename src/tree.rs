//! The value-tree boundary shared with the external JSON layer.
//!
//! The engine never touches JSON text itself: it consumes and produces
//! [`Value`] trees, and [`serde_json`] does the encoding/decoding at the
//! edges ([`Saver::save_to_string`], [`Loader::load_from_str`]).
//!
//! Key order in [`ObjectNode`] is insertion order (serde_json's
//! `preserve_order` feature), so members save in table order and load in
//! document order.
//!
//! [`Saver::save_to_string`]: crate::Saver::save_to_string
//! [`Loader::load_from_str`]: crate::Loader::load_from_str

pub use serde_json::Value;

/// An Object node: an ordered `string -> Value` mapping.
pub type ObjectNode = serde_json::Map<String, Value>;

/// The reserved key carrying a value's type tag inside an Object node.
///
/// Written by the [`Saver`](crate::Saver) next to member entries, consumed
/// (and skipped during member population) by the [`Loader`](crate::Loader).
/// A member with this name would be shadowed by the tag.
pub const TYPE_KEY: &str = "type";
