use erc20gas_rpc::calldata::encode_tuple;
use ethereum_types::Address;
use tracing::debug;

use crate::{
    artifacts::ArtifactSource,
    error::LedgerError,
    ledger::{Ledger, Receipt, TxRequest},
    variant::Variant,
};

/// A live, independently deployed token instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub address: Address,
    pub deploy_receipt: Receipt,
}

/// Deploys a fresh instance of `variant` from `admin`. Every call creates a
/// new contract, so instances never share storage.
pub async fn instantiate(
    ledger: &dyn Ledger,
    artifacts: &dyn ArtifactSource,
    variant: &Variant,
    admin: Address,
) -> Result<Instance, LedgerError> {
    let deployment = &variant.deployment;
    let mut init_code = artifacts.init_code(&deployment.contract)?.to_vec();
    init_code.extend_from_slice(&encode_tuple(&deployment.constructor_args(admin)));

    let receipt = ledger.transact(TxRequest::create(admin, init_code)).await?;
    let address = receipt
        .contract_address
        .ok_or(LedgerError::MissingContractAddress(receipt.tx_hash))?;
    debug!(
        variant = %variant.name,
        contract = %deployment.contract,
        address = %format!("{address:#x}"),
        gas_used = receipt.gas_used,
        "Deployed instance"
    );

    Ok(Instance {
        address,
        deploy_receipt: receipt,
    })
}
