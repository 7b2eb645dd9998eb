//! Public facade crate for `docxmart`.
//!
//! This crate intentionally contains no IO or provider-specific logic.
//! It re-exports the backend-agnostic types/traits from `docxmart-core`.

pub use docxmart_core::*;
