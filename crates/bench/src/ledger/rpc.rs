use async_trait::async_trait;
use bytes::Bytes;
use erc20gas_rpc::{EthClient, RpcReceipt, clients::Overrides};
use ethereum_types::{Address, H256};

use super::{Ledger, Receipt, TxRequest};
use crate::error::LedgerError;

impl From<RpcReceipt> for Receipt {
    fn from(receipt: RpcReceipt) -> Self {
        Self {
            tx_hash: receipt.transaction_hash,
            success: receipt.succeeded(),
            gas_used: receipt.gas_used(),
            contract_address: receipt.contract_address,
        }
    }
}

/// JSON-RPC dev node with unlocked signers (Hardhat, Anvil, `geth --dev`).
#[async_trait]
impl Ledger for EthClient {
    async fn accounts(&self) -> Result<Vec<Address>, LedgerError> {
        Ok(self.get_accounts().await?)
    }

    async fn send_transaction(&self, tx: TxRequest) -> Result<H256, LedgerError> {
        Ok(EthClient::send_transaction(self, tx.from, tx.to, &tx.data).await?)
    }

    async fn wait_for_receipt(&self, tx_hash: H256) -> Result<Receipt, LedgerError> {
        Ok(self.wait_for_transaction_receipt(tx_hash).await?.into())
    }

    async fn call(&self, tx: TxRequest) -> Result<Bytes, LedgerError> {
        let to = tx
            .to
            .ok_or_else(|| LedgerError::Custom("eth_call needs a target address".to_owned()))?;
        let overrides = Overrides {
            from: Some(tx.from),
        };
        Ok(EthClient::call(self, to, &tx.data, overrides).await?)
    }
}
