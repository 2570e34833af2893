use erc20gas_rpc::{
    calldata::{Value, encode_calldata},
    eth_errors::CalldataEncodeError,
};
use ethereum_types::{Address, U256};

use crate::{error::ConfigError, ledger::TxRequest};

/// Constructor argument of a [`Deployment`].
#[derive(Debug, Clone, PartialEq)]
pub enum CtorArg {
    /// The administrative account of the case being run.
    Admin,
    Value(Value),
}

impl CtorArg {
    pub fn string(value: &str) -> Self {
        Self::Value(Value::String(value.to_owned()))
    }

    fn resolve(&self, admin: Address) -> Value {
        match self {
            Self::Admin => Value::Address(admin),
            Self::Value(value) => value.clone(),
        }
    }
}

/// How to instantiate a variant: a compiled contract plus constructor arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Deployment {
    pub contract: String,
    pub args: Vec<CtorArg>,
}

impl Deployment {
    pub fn new(contract: &str, args: Vec<CtorArg>) -> Self {
        Self {
            contract: contract.to_owned(),
            args,
        }
    }

    pub fn constructor_args(&self, admin: Address) -> Vec<Value> {
        self.args.iter().map(|arg| arg.resolve(admin)).collect()
    }
}

/// The mint-equivalent operation, always signed by the administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditMethod {
    /// `mint(address,uint256)`.
    Mint,
    /// `transfer(address,uint256)` out of a supply minted to the administrator
    /// at construction.
    Transfer,
}

impl CreditMethod {
    pub fn request(
        self,
        token: Address,
        admin: Address,
        to: Address,
        amount: U256,
    ) -> Result<TxRequest, CalldataEncodeError> {
        let signature = match self {
            Self::Mint => "mint(address,uint256)",
            Self::Transfer => "transfer(address,uint256)",
        };
        let data = encode_calldata(signature, &[Value::Address(to), Value::Uint(amount)])?;
        Ok(TxRequest::call(admin, token, data))
    }
}

/// Optional warm-up applied to every participant in the dirty condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimeMethod {
    /// `delegate(address)` to itself, signed by the account.
    Delegate,
}

impl PrimeMethod {
    pub fn request(
        self,
        token: Address,
        account: Address,
    ) -> Result<TxRequest, CalldataEncodeError> {
        match self {
            Self::Delegate => {
                let data = encode_calldata("delegate(address)", &[Value::Address(account)])?;
                Ok(TxRequest::call(account, token, data))
            }
        }
    }
}

/// Descriptor of one token implementation under comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub name: String,
    pub deployment: Deployment,
    pub credit: CreditMethod,
    pub prime: Option<PrimeMethod>,
}

impl Variant {
    pub fn builder(name: &str) -> VariantBuilder {
        VariantBuilder {
            name: name.to_owned(),
            deployment: None,
            credit: None,
            prime: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VariantBuilder {
    name: String,
    deployment: Option<Deployment>,
    credit: Option<CreditMethod>,
    prime: Option<PrimeMethod>,
}

impl VariantBuilder {
    pub fn deploy(mut self, deployment: Deployment) -> Self {
        self.deployment = Some(deployment);
        self
    }

    pub fn credit(mut self, credit: CreditMethod) -> Self {
        self.credit = Some(credit);
        self
    }

    pub fn prime(mut self, prime: PrimeMethod) -> Self {
        self.prime = Some(prime);
        self
    }

    pub fn build(self) -> Result<Variant, ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        let deployment = self.deployment.ok_or_else(|| ConfigError::MissingField {
            variant: self.name.clone(),
            field: "deployment",
        })?;
        let credit = self.credit.ok_or_else(|| ConfigError::MissingField {
            variant: self.name.clone(),
            field: "credit operation",
        })?;
        Ok(Variant {
            name: self.name,
            deployment,
            credit,
            prime: self.prime,
        })
    }
}
