//! CLI command implementations.

pub mod cluster;
pub mod conflict;
pub mod health;
pub mod init;
pub mod root_cause;
pub mod scope;
