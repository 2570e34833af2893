use std::collections::HashSet;

use tracing::debug;

use crate::{
    error::ConfigError,
    variant::{CreditMethod, CtorArg, Deployment, PrimeMethod, Variant},
};

/// Ordered set of uniquely named variants. Iteration order is registration
/// order, which drives both execution and report row order.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    variants: Vec<Variant>,
    names: HashSet<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, variant: Variant) -> Result<&mut Self, ConfigError> {
        if variant.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if !self.names.insert(variant.name.clone()) {
            return Err(ConfigError::DuplicateVariant(variant.name));
        }
        debug!(variant = %variant.name, "Registered variant");
        self.variants.push(variant);
        Ok(self)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variant> {
        self.variants.iter()
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Keeps only the named variants, preserving registration order.
    pub fn retain_named<S: AsRef<str>>(&mut self, names: &[S]) -> Result<(), ConfigError> {
        for name in names {
            if !self.names.contains(name.as_ref()) {
                return Err(ConfigError::UnknownVariant(name.as_ref().to_owned()));
            }
        }
        self.variants
            .retain(|variant| names.iter().any(|name| name.as_ref() == variant.name));
        self.names = self.variants.iter().map(|v| v.name.clone()).collect();
        Ok(())
    }

    /// The OpenZeppelin and Compound tokens, plain and with self-delegation.
    pub fn standard() -> Result<Self, ConfigError> {
        let oz = |contract: &str| {
            Deployment::new(contract, vec![CtorArg::string("name"), CtorArg::string("symbol")])
        };
        let comp = || Deployment::new("Comp", vec![CtorArg::Admin]);

        let mut registry = Self::new();
        for flavor in ["ERC20Mock", "ERC20SnapshotEveryBlockMock", "ERC20VotesMock"] {
            registry.register(
                Variant::builder(flavor)
                    .deploy(oz(flavor))
                    .credit(CreditMethod::Mint)
                    .build()?,
            )?;
        }
        registry
            .register(
                Variant::builder("Comp")
                    .deploy(comp())
                    .credit(CreditMethod::Transfer)
                    .build()?,
            )?
            .register(
                Variant::builder("ERC20VotesMock-delegated")
                    .deploy(oz("ERC20VotesMock"))
                    .credit(CreditMethod::Mint)
                    .prime(PrimeMethod::Delegate)
                    .build()?,
            )?
            .register(
                Variant::builder("Comp-delegated")
                    .deploy(comp())
                    .credit(CreditMethod::Transfer)
                    .prime(PrimeMethod::Delegate)
                    .build()?,
            )?;
        Ok(registry)
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a Variant;
    type IntoIter = std::slice::Iter<'a, Variant>;

    fn into_iter(self) -> Self::IntoIter {
        self.variants.iter()
    }
}
