//! Gas comparison harness for interchangeable ERC20 token variants.
//!
//! Every registered [`variant::Variant`] is deployed once per account
//! [`protocol::Condition`] and driven through the same three-step protocol
//! (credit, transfer, drain). The gas reported by each confirmed receipt is
//! collected by a [`report::Reporter`] and rendered as a single table.

pub mod artifacts;
pub mod deploy;
pub mod error;
pub mod executor;
pub mod fixtures;
pub mod harness;
pub mod initializer;
pub mod ledger;
pub mod protocol;
pub mod registry;
pub mod report;
pub mod variant;

#[cfg(test)]
mod testing;

pub use error::{CaseError, ConfigError, LedgerError, Stage};
pub use harness::Harness;
pub use ledger::{Ledger, Receipt, TxRequest};
pub use protocol::{Condition, Operation};
pub use registry::Registry;
pub use report::{FailurePolicy, ReportOptions, Reporter};
pub use variant::Variant;
