use tracing::debug;

use crate::{
    deploy::Instance,
    error::LedgerError,
    fixtures::Fixture,
    ledger::Ledger,
    protocol::{Condition, PRIME_AMOUNT, units},
    variant::Variant,
};

/// Brings `instance` into the state `condition` requires.
///
/// Clean leaves the just-deployed storage untouched. Dirty runs the variant's
/// priming call (if any) and then a [`PRIME_AMOUNT`] credit for every
/// participant, one confirmed transaction at a time and in fixture order.
pub async fn prepare(
    ledger: &dyn Ledger,
    variant: &Variant,
    instance: &Instance,
    fixture: &Fixture,
    condition: Condition,
) -> Result<(), LedgerError> {
    if condition == Condition::Clean {
        return Ok(());
    }

    for &account in &fixture.participants {
        if let Some(prime) = variant.prime {
            ledger
                .transact(prime.request(instance.address, account)?)
                .await?;
        }
        ledger
            .transact(variant.credit.request(
                instance.address,
                fixture.admin,
                account,
                units(PRIME_AMOUNT),
            )?)
            .await?;
        debug!(variant = %variant.name, account = %format!("{account:#x}"), "Primed account");
    }
    Ok(())
}
