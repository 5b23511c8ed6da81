//! Projector - evaluate field specs against documents
//!
//! [`subset`] keeps or drops parts of a document. [`extract`] goes further
//! and runs every stage of a spec, each on the output of the one before:
//!
//! 1. base selection (or the whole document for `*`)
//! 2. `flat` / `flatall` requests
//! 3. renames
//! 4. assignments
//! 5. transform pipelines
//! 6. `unflat` requests
//! 7. defaults for anything still absent
//! 8. the envelope
//!
//! Use an [`Extractor`] directly to configure the transform registry, the
//! error policy or projection caching.

pub mod extractor;
mod select;

pub use extractor::{ExtractConfig, Extractor};

use crate::error::Result;
use crate::fields::FieldSpec;
use crate::types::Document;

/// Keep only the parts of `doc` named by `spec`.
pub fn subset(doc: &Document, spec: impl Into<FieldSpec>) -> Result<Document> {
    Extractor::default().subset(doc, spec)
}

/// Project `doc` through `spec`, filling gaps from `defaults`.
pub fn extract(
    doc: &Document,
    spec: impl Into<FieldSpec>,
    defaults: Option<&Document>,
) -> Result<Document> {
    Extractor::default().extract(doc, spec, defaults)
}
