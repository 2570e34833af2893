use erc20gas_rpc::calldata::{Value, encode_calldata};
use ethereum_types::{Address, U256};
use strum::IntoEnumIterator;
use tracing::debug;

use crate::{
    deploy::Instance,
    error::LedgerError,
    fixtures::Roles,
    ledger::{Ledger, TxRequest},
    protocol::{CREDIT_AMOUNT, Costs, Operation, TRANSFER_AMOUNT, units},
    variant::Variant,
};

/// Runs the timed credit, transfer and drain steps against `instance`.
///
/// Each step is submitted only after the previous receipt is confirmed, and
/// its cost is the receipt's `gasUsed`. On failure the failing operation is
/// returned alongside the error and no costs are kept.
pub async fn measure(
    ledger: &dyn Ledger,
    variant: &Variant,
    instance: &Instance,
    admin: Address,
    roles: Roles,
) -> Result<Costs, (Operation, LedgerError)> {
    let mut costs = Costs::default();

    for operation in Operation::iter() {
        let cost = step(ledger, variant, instance, admin, roles, operation)
            .await
            .map_err(|err| (operation, err))?;
        debug!(variant = %variant.name, %operation, gas_used = cost, "Measured step");
        costs.set(operation, cost);
    }

    Ok(costs)
}

async fn step(
    ledger: &dyn Ledger,
    variant: &Variant,
    instance: &Instance,
    admin: Address,
    roles: Roles,
    operation: Operation,
) -> Result<u64, LedgerError> {
    let token = instance.address;
    let tx = match operation {
        Operation::Credit => {
            variant
                .credit
                .request(token, admin, roles.payer, units(CREDIT_AMOUNT))?
        }
        Operation::Transfer => {
            transfer(token, roles.payer, roles.recipient, units(TRANSFER_AMOUNT))?
        }
        Operation::Drain => {
            // Queried right before the call so the transfer empties the slot exactly.
            let remaining = ledger.balance_of(token, roles.payer).await?;
            transfer(token, roles.payer, roles.drain_target, remaining)?
        }
    };
    Ok(ledger.transact(tx).await?.gas_used)
}

fn transfer(
    token: Address,
    from: Address,
    to: Address,
    amount: U256,
) -> Result<TxRequest, LedgerError> {
    let data = encode_calldata(
        "transfer(address,uint256)",
        &[Value::Address(to), Value::Uint(amount)],
    )?;
    Ok(TxRequest::call(from, token, data))
}
