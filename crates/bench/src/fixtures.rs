use std::collections::HashSet;

use ethereum_types::Address;

use crate::{error::ConfigError, ledger::Ledger};

/// Participants needed to fill the payer, recipient and drain-target roles.
pub const MIN_PARTICIPANTS: usize = 3;

/// Accounts for one (variant, condition) case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    pub admin: Address,
    /// Every account except the administrator, in ledger order.
    pub participants: Vec<Address>,
}

/// Role assignment for the timed sequence. The three roles never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roles {
    pub payer: Address,
    pub recipient: Address,
    pub drain_target: Address,
}

impl Fixture {
    pub fn from_accounts(accounts: Vec<Address>) -> Result<Self, ConfigError> {
        let not_enough = ConfigError::NotEnoughAccounts {
            needed: MIN_PARTICIPANTS,
            available: accounts.len().saturating_sub(1),
        };
        let Some((&admin, participants)) = accounts.split_first() else {
            return Err(not_enough);
        };
        if participants.len() < MIN_PARTICIPANTS {
            return Err(not_enough);
        }
        let participants = participants.to_vec();

        let mut seen = HashSet::with_capacity(participants.len() + 1);
        for account in std::iter::once(&admin).chain(participants.iter()) {
            if !seen.insert(*account) {
                return Err(ConfigError::DuplicateAccount(*account));
            }
        }

        Ok(Self {
            admin,
            participants,
        })
    }

    pub fn roles(&self) -> Roles {
        // `from_accounts` guarantees at least MIN_PARTICIPANTS entries.
        Roles {
            payer: self.participants[0],
            recipient: self.participants[1],
            drain_target: self.participants[2],
        }
    }
}

/// Supplies a fresh [`Fixture`] per case by querying the ledger every time.
pub struct AccountFixtures;

impl AccountFixtures {
    pub async fn acquire(ledger: &dyn Ledger) -> Result<Fixture, ConfigError> {
        let accounts = ledger.accounts().await.map_err(ConfigError::Accounts)?;
        Fixture::from_accounts(accounts)
    }
}
