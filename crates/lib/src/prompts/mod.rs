//! # Prompt Templates
//!
//! All prompt templates used by the library, with `{placeholder}` slots
//! filled by simple string replacement at the call sites.

pub mod core;
