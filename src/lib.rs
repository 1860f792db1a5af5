#![deny(unreachable_pub)]

// Core modules
pub mod consts;
mod errors;
pub mod helpers;
mod prelude;
mod req;

// Shared utilities
pub mod logging;
pub mod serde_utils;
pub mod types;

// Feature modules
pub mod allocation;
pub mod chain;
pub mod config;
pub mod cycle;
pub mod gateway;
pub mod holders;
pub mod scheduler;
pub mod server;

// Re-exports
pub use allocation::allocate;
pub use chain::ChainClient;
pub use config::AppConfig;
pub use cycle::{BalanceOracle, CycleConfig, CycleController, HolderSource};
pub use errors::{Error, OrderError, OrderErrorKind, TransportError};
pub use gateway::{OrderGateway, OrderSubmitter};
pub use req::HttpClient;
pub use scheduler::{run_batches, BatchConfig};
pub use types::*;
