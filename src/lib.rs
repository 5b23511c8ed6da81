//! # Dotset - Nested Document Toolkit
//!
//! Project, reshape and merge JSON-like documents addressed by dotted paths.
//!
//! ## Modules
//!
//! - **path**: flatten documents into dotted paths and rebuild them
//! - **fields**: compile field specs (`a.b`, `-c`, `x__as__y:int`, ...)
//! - **project**: `subset` and `extract` documents through field specs
//! - **merge**: fill-gaps `merge` and the list-aware `update_with`
//! - **transform**: the cast/transform registry used by field specs
//! - **ops**: validation, masking and other helpers
//!
//! ## Quick Start
//!
//! ### Projection
//!
//! ```rust
//! use dotset::{extract, subset, to_document};
//! use serde_json::{json, Value};
//!
//! # fn main() -> dotset::Result<()> {
//! let doc = to_document(&json!({"c": "123", "b": "345", "skip": true}))?;
//!
//! let picked = subset(&doc, ["b", "c"])?;
//! assert_eq!(Value::Object(picked), json!({"b": "345", "c": "123"}));
//!
//! let shaped = extract(&doc, "c__as__a.c:float,b__as__a.b:float,a.dd:=dd", None)?;
//! assert_eq!(
//!     Value::Object(shaped),
//!     json!({"a": {"c": 123.0, "b": 345.0, "dd": "dd"}})
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ### Merging
//!
//! ```rust
//! use dotset::{to_document, update_with, UpdateOptions};
//! use serde_json::json;
//!
//! # fn main() -> dotset::Result<()> {
//! let people = to_document(&json!({"people": [{"id": 1, "n": "old"}]}))?;
//! let update = to_document(&json!({"people": [{"id": 1, "n": "new"}, {"id": 2}]}))?;
//!
//! let merged = update_with(&people, &update, &UpdateOptions::new().append_to_set(["people:id"]))?;
//! assert_eq!(merged["people"], json!([{"id": 1, "n": "new"}, {"id": 2}]));
//! # Ok(())
//! # }
//! ```
//!
//! ### Flattening
//!
//! ```rust
//! use dotset::path::{flatten, unflatten};
//! use dotset::to_document;
//! use serde_json::json;
//!
//! let doc = to_document(&json!({"a": {"b": [1, 2]}})).unwrap();
//! let flat = flatten(&doc, false);
//! assert_eq!(flat["a.b.1"], json!(2));
//! assert_eq!(unflatten(&flat).unwrap(), doc);
//! ```

pub mod error;
pub mod fields;
pub mod merge;
pub mod ops;
pub mod path;
pub mod project;
pub mod transform;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{DocError, ErrorKind, ErrorPolicy, Result, StrictPolicy};
pub use fields::{compile, FieldSpec, Projection};
pub use merge::{merge, merge_with, update_with, KeySelection, Merger, UpdateOptions};
pub use path::{flatten, unflatten, unflatten_only};
pub use project::{extract, subset, ExtractConfig, Extractor};
pub use transform::{CastError, TransformRegistry};
pub use types::{document_from_value, to_document, Document, FlatMap, JsonType};
