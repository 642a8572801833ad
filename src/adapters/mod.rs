//! Adapter implementations of the domain ports.

pub mod jsonstore;
pub mod model;
