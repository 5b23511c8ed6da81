//! Path codec - linearize nested documents into dotted paths and back
//!
//! Paths are segments joined by `.`. A segment made only of decimal digits
//! addresses a position in a sequence; any other segment is a mapping key.

pub mod access;
pub mod flatten;
pub mod unflatten;

pub use access::{get_path, get_path_mut, remove_path, remove_path_pruned, set_path};
pub use flatten::{flatten, flatten_keys, flatten_value, join_path};
pub use unflatten::{unflatten, unflatten_only};

/// Separator between path segments.
pub const SEPARATOR: char = '.';

/// Largest sequence position a path may address when rebuilding lists.
pub const MAX_INDEX: usize = 1 << 20;

/// Whether a segment addresses a sequence position.
pub fn is_index(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// Whether `path` equals `prefix` or lies underneath it.
///
/// Matching is per segment: `ab.c` is not under `a`. A prefix ending in the
/// separator matches literally.
pub fn path_starts_with(path: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with(SEPARATOR) || prefix.ends_with(SEPARATOR),
        None => false,
    }
}
