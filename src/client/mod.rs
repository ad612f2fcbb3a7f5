pub mod cli;
pub mod config;
pub mod error;
pub mod local_store;
pub mod services;
pub mod transport;
pub mod utils;
