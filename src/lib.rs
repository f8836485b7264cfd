pub mod command;
pub mod config;
pub mod config_store;
pub mod constants;
pub mod engine;
pub mod error;
pub mod registry;
pub mod types;
