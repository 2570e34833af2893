use ethereum_types::{Address, H256, U64};
use serde::{Deserialize, Serialize};

/// Subset of an `eth_getTransactionReceipt` result the gas harness consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReceipt {
    pub transaction_hash: H256,
    pub gas_used: U64,
    /// `0x1` on success, `0x0` on revert. Absent only on pre-Byzantium chains.
    #[serde(default)]
    pub status: Option<U64>,
    #[serde(default)]
    pub contract_address: Option<Address>,
}

impl RpcReceipt {
    pub fn succeeded(&self) -> bool {
        self.status.is_none_or(|status| !status.is_zero())
    }

    pub fn gas_used(&self) -> u64 {
        self.gas_used.as_u64()
    }
}
