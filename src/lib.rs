// Library crate - exports shared types and the analysis pipeline

pub mod config;
pub mod data;
pub mod errors;
pub mod trading_core;
pub mod types;

// Re-export commonly used types
pub use config::SentinelConfig;
pub use data::{CsvDataSource, InMemoryDataSource, MarketDataSource};
pub use errors::SentinelError;
pub use types::*;
