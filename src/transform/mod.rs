//! Transforms - named value conversions applied by field-spec pipelines
//!
//! A pipeline such as `price:strip|float` runs each named transform in
//! order. Names resolve through a [`TransformRegistry`]; there is no
//! reflective fallback, so an unregistered name is a configuration error.

pub mod builtins;
pub mod datetime;
pub mod registry;

pub use builtins::sort_items;
pub use registry::{CastError, TransformFn, TransformRegistry, MARKERS};
