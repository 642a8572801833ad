//! External model adapters.

pub mod command_model;

pub use command_model::CommandModel;
