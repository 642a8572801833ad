//! Infrastructure layer module
//!
//! Currently configuration management; the JSON file stores and the model
//! subprocess live under `adapters` against the domain port traits.

pub mod config;
