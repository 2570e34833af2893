use async_trait::async_trait;
use bytes::Bytes;
use erc20gas_rpc::calldata::{Value, decode_u256, encode_calldata};
use ethereum_types::{Address, H256, U256};
use tracing::debug;

use crate::error::LedgerError;

mod rpc;

/// A state-mutating call that has not been submitted yet.
///
/// `to == None` is a contract creation with `data` as init code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub from: Address,
    pub to: Option<Address>,
    pub data: Bytes,
}

impl TxRequest {
    pub fn call(from: Address, to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            from,
            to: Some(to),
            data: data.into(),
        }
    }

    pub fn create(from: Address, init_code: impl Into<Bytes>) -> Self {
        Self {
            from,
            to: None,
            data: init_code.into(),
        }
    }
}

/// Confirmed outcome of a submitted [`TxRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: H256,
    pub success: bool,
    pub gas_used: u64,
    pub contract_address: Option<Address>,
}

/// The execution environment the contracts live in.
///
/// Implementations must confirm transactions in submission order and must
/// never resubmit on their own.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Signer accounts, administrator first.
    async fn accounts(&self) -> Result<Vec<Address>, LedgerError>;

    async fn send_transaction(&self, tx: TxRequest) -> Result<H256, LedgerError>;

    async fn wait_for_receipt(&self, tx_hash: H256) -> Result<Receipt, LedgerError>;

    /// Read-only call against the latest state.
    async fn call(&self, tx: TxRequest) -> Result<Bytes, LedgerError>;

    /// Submits `tx` and waits for its confirmation. A reverted receipt is an error.
    async fn transact(&self, tx: TxRequest) -> Result<Receipt, LedgerError> {
        let tx_hash = self.send_transaction(tx).await?;
        debug!(tx_hash = %format!("{tx_hash:#x}"), "Transaction submitted");
        let receipt = self.wait_for_receipt(tx_hash).await?;
        debug!(
            tx_hash = %format!("{tx_hash:#x}"),
            gas_used = receipt.gas_used,
            success = receipt.success,
            "Transaction confirmed"
        );
        if !receipt.success {
            return Err(LedgerError::Reverted {
                tx_hash,
                gas_used: receipt.gas_used,
            });
        }
        Ok(receipt)
    }

    /// `balanceOf(account)` on the token at `token`.
    async fn balance_of(&self, token: Address, account: Address) -> Result<U256, LedgerError> {
        let data = encode_calldata("balanceOf(address)", &[Value::Address(account)])?;
        let output = self.call(TxRequest::call(account, token, data)).await?;
        Ok(decode_u256(&output)?)
    }
}
