pub mod calldata;
pub mod clients;
pub mod types;
pub mod utils;

pub use clients::{EthClient, eth_errors};
pub use types::receipt::RpcReceipt;
