use strum::IntoEnumIterator;
use tracing::{info, warn};

use crate::{
    artifacts::ArtifactSource,
    deploy,
    error::{CaseError, ConfigError, LedgerError, Stage},
    executor,
    fixtures::AccountFixtures,
    initializer,
    ledger::Ledger,
    protocol::{Condition, Costs, Operation},
    registry::Registry,
    report::Reporter,
    variant::Variant,
};

/// Drives every registered variant through both conditions, one case at a
/// time, and hands each outcome to the reporter.
pub struct Harness<'a> {
    ledger: &'a dyn Ledger,
    artifacts: &'a dyn ArtifactSource,
}

impl<'a> Harness<'a> {
    pub fn new(ledger: &'a dyn Ledger, artifacts: &'a dyn ArtifactSource) -> Self {
        Self { ledger, artifacts }
    }

    /// Runs the whole (variant x condition) matrix.
    ///
    /// Only configuration problems abort the run; a failing case is recorded
    /// and the remaining cases still execute.
    pub async fn run(
        &self,
        registry: &Registry,
        reporter: &mut Reporter,
    ) -> Result<(), ConfigError> {
        if registry.is_empty() {
            warn!("No variants registered, nothing to measure");
            return Ok(());
        }
        // Surface fixture problems before the first measurement.
        AccountFixtures::acquire(self.ledger).await?;

        for variant in registry {
            for condition in Condition::iter() {
                info!(variant = %variant.name, %condition, "Running case");
                let result = self.run_case(variant, condition).await;
                match &result {
                    Ok(costs) => info!(
                        variant = %variant.name,
                        %condition,
                        credit = costs.get(Operation::Credit),
                        transfer = costs.get(Operation::Transfer),
                        drain = costs.get(Operation::Drain),
                        "Case finished"
                    ),
                    Err(err) => warn!(%err, "Case failed"),
                }
                reporter.record(&variant.name, condition, result);
            }
        }
        Ok(())
    }

    /// One isolated case: fresh accounts, fresh instance, optional priming,
    /// then the timed protocol.
    pub async fn run_case(
        &self,
        variant: &Variant,
        condition: Condition,
    ) -> Result<Costs, CaseError> {
        let fail = |stage: Stage, source: LedgerError| CaseError {
            variant: variant.name.clone(),
            condition,
            stage,
            source,
        };

        let fixture = AccountFixtures::acquire(self.ledger)
            .await
            .map_err(|err| fail(Stage::Fixture, LedgerError::Fixture(Box::new(err))))?;

        let instance = deploy::instantiate(self.ledger, self.artifacts, variant, fixture.admin)
            .await
            .map_err(|err| fail(Stage::Instantiate, err))?;

        initializer::prepare(self.ledger, variant, &instance, &fixture, condition)
            .await
            .map_err(|err| fail(Stage::Prime, err))?;

        executor::measure(self.ledger, variant, &instance, fixture.admin, fixture.roles())
            .await
            .map_err(|(operation, err)| fail(Stage::Measure(operation), err))
    }
}
