//! Capstan Engine - manifest templating for capabilities
//!
//! This crate provides:
//! - Placeholder substitution (`{{ id }}`) over JSON documents, preserving
//!   native types for full placeholders
//! - Key-path expansion of dotted keys into chart value trees
//! - An `Engine` that materializes a capability source from resolved values

pub mod engine;
pub mod error;
pub mod expand;
pub mod placeholder;

pub use engine::{Engine, EngineBuilder, Rendered};
pub use error::{EngineError, Result};
pub use expand::{expand, expand_values, KEY_SEPARATOR};
pub use placeholder::{full_placeholder, substitute};
