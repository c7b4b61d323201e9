//! Shared types for the Kaspa faucet: amounts, network parameters,
//! storage traits and ambient utilities (logging, configuration loading).

pub mod error;
pub mod network;
pub mod traits;
pub mod types;
pub mod utils;

pub use error::{StoreError, StoreResult};
pub use network::{NetworkParams, NetworkType};
