#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Layered configuration for the filter engine.
//!
//! Layout: `defaults.rs` (built-in values and variable names), `model.rs`
//! (`EngineConfig` and its derived settings), `loader.rs` (defaults, JSON
//! file, environment), `validate.rs` (field checks), `error.rs`.

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load, load_with};
pub use model::EngineConfig;
