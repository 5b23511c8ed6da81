//! Field-spec compiler
//!
//! A field spec is a small mini-language describing which parts of a
//! document to keep and how to reshape them:
//!
//! | token                      | meaning                                      |
//! |----------------------------|----------------------------------------------|
//! | `a.b`                      | include the nested path                      |
//! | `-a`                       | exclude                                      |
//! | `*`                        | include everything                           |
//! | `a.b*`                     | wildcard, re-rooted at the last separator    |
//! | `a__as__b`, `a.b.c__as__`  | rename (an empty new name keeps the leaf)    |
//! | `__as__name`               | wrap the result in `{name: ...}`             |
//! | `a:int\|str`               | transform pipeline                           |
//! | `a:=literal[:pipeline]`    | assign a value                               |
//! | `list..field`              | collect `field` from each element            |
//!
//! Specs compile into an immutable [`Projection`] that the projector
//! evaluates against documents.

pub mod parser;
pub mod projection;
pub mod spec;

pub use parser::{compile_tokens, parse_token, Directive};
pub use projection::{Assignment, FlattenMode, Pipeline, Projection, Selector, Step};
pub use spec::FieldSpec;

use crate::error::Result;

/// Compile any field-spec input into a [`Projection`].
pub fn compile(spec: impl Into<FieldSpec>) -> Result<Projection> {
    compile_tokens(&spec.into().tokens())
}
