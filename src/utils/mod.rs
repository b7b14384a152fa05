//! Shared helpers: MIME detection, path normalization, directory walks.

pub mod fs;
pub mod mime;
pub mod path;
