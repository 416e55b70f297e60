//! Deep merge of TOML values with per-field source tracking.
//!
//! The merge operates on raw [`toml::Value`] trees rather than deserialized
//! structs. This correctly handles "absent vs default": a missing key in a
//! TOML table will not override the base layer.

mod deep;
mod path;
mod types;

pub use deep::{apply_layer, record_leaves};
#[cfg(test)]
pub(crate) use path::get_nested;
pub(crate) use path::set_nested;
pub use types::{ConfigLayer, FieldSources};

#[cfg(test)]
mod tests;
