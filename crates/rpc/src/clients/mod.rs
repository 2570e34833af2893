pub mod eth;

pub use eth::{EthClient, Overrides, errors as eth_errors};
