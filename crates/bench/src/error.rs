use erc20gas_rpc::eth_errors::{CalldataEncodeError, EthClientError};
use ethereum_types::H256;

use crate::{
    artifacts::ArtifactError,
    protocol::{Condition, Operation},
};

/// Failures of the execution environment behind [`crate::Ledger`].
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("RPC error: {0}")]
    Rpc(#[from] EthClientError),
    #[error("transaction {tx_hash:#x} reverted after using {gas_used} gas")]
    Reverted { tx_hash: H256, gas_used: u64 },
    #[error("creation transaction {0:#x} returned no contract address")]
    MissingContractAddress(H256),
    #[error("Failed to encode calldata: {0}")]
    Calldata(#[from] CalldataEncodeError),
    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),
    #[error("Fixture error: {0}")]
    Fixture(#[source] Box<ConfigError>),
    #[error("{0}")]
    Custom(String),
}

/// Registration and fixture problems. These abort the whole run before any
/// measurement starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("variant name must not be empty")]
    EmptyName,
    #[error("variant `{0}` is registered twice")]
    DuplicateVariant(String),
    #[error("variant `{variant}` is missing its {field}")]
    MissingField {
        variant: String,
        field: &'static str,
    },
    #[error("unknown variant `{0}`")]
    UnknownVariant(String),
    #[error("need an administrator and at least {needed} participants, found {available}")]
    NotEnoughAccounts { needed: usize, available: usize },
    #[error("account {0:#x} appears more than once in the fixture")]
    DuplicateAccount(ethereum_types::Address),
    #[error("could not query accounts: {0}")]
    Accounts(#[source] LedgerError),
}

/// Where in a (variant, condition) case a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fixture,
    Instantiate,
    Prime,
    Measure(Operation),
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixture => write!(f, "fixture"),
            Self::Instantiate => write!(f, "instantiate"),
            Self::Prime => write!(f, "prime"),
            Self::Measure(operation) => write!(f, "{operation}"),
        }
    }
}

/// A failed (variant, condition) case, attributed to its matrix cell.
#[derive(Debug, thiserror::Error)]
#[error("{variant} ({condition}) failed at {stage}: {source}")]
pub struct CaseError {
    pub variant: String,
    pub condition: Condition,
    pub stage: Stage,
    #[source]
    pub source: LedgerError,
}
