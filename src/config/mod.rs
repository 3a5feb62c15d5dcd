//! Configuration module for the `pxsmooth` command
//!
//! Provides types and parsing for the optional `pxsmooth.toml` file.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
