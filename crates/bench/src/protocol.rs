use ethereum_types::U256;
use serde::Serialize;
use strum::{Display, EnumIter};

/// Amount the administrator credits to the payer in the timed sequence.
pub const CREDIT_AMOUNT: u64 = 100;
/// Partial amount the payer sends to the recipient.
pub const TRANSFER_AMOUNT: u64 = 10;
/// Amount credited to every participant while warming the dirty condition.
pub const PRIME_AMOUNT: u64 = 1;

/// Account-state condition a variant is measured under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    /// Just-deployed storage for every account.
    Clean,
    /// Every participant primed and credited before measuring.
    Dirty,
}

/// The timed steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Credit,
    Transfer,
    /// Transfer of the payer's whole balance, zeroing its balance slot.
    Drain,
}

impl Operation {
    pub const COUNT: usize = 3;

    pub const fn index(self) -> usize {
        match self {
            Self::Credit => 0,
            Self::Transfer => 1,
            Self::Drain => 2,
        }
    }
}

/// Gas used by each timed step of one (variant, condition) case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Costs([u64; Operation::COUNT]);

impl Costs {
    pub fn new(credit: u64, transfer: u64, drain: u64) -> Self {
        Self([credit, transfer, drain])
    }

    pub fn get(&self, operation: Operation) -> u64 {
        self.0[operation.index()]
    }

    pub(crate) fn set(&mut self, operation: Operation, cost: u64) {
        self.0[operation.index()] = cost;
    }
}

pub fn units(amount: u64) -> U256 {
    U256::from(amount)
}
