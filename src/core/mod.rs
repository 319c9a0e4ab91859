pub mod client;
pub mod config;
pub mod converter;
pub mod errors;
pub mod kernel;
pub mod traits;
pub mod types;
