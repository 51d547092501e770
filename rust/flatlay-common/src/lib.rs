//! Core definitions (error type and result helpers) shared by all flatlay-* crates.

pub mod error;
pub mod result;

pub use result::Result;
