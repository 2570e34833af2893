//! Deterministic in-memory ledger with an EVM-like storage cost schedule.
//!
//! The simulated tokens keep only the slots that drive gas differences
//! between the variants: balances, total supply, delegation, vote totals and
//! per-block snapshots. Every transaction is mined on submission, in its own
//! block.

use std::{
    collections::{HashMap, HashSet},
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use bytes::Bytes;
use erc20gas_rpc::calldata::compute_function_selector;
use ethereum_types::{Address, H256, U256};

use crate::{
    artifacts::{ArtifactError, ArtifactSource},
    error::LedgerError,
    ledger::{Ledger, Receipt, TxRequest},
};

pub const TX_BASE_COST: u64 = 21_000;
pub const CREATE_BASE_COST: u64 = 32_000;
pub const CALLDATA_ZERO_BYTE_COST: u64 = 4;
pub const CALLDATA_NON_ZERO_BYTE_COST: u64 = 16;
/// Flat cost standing in for dispatch, memory and event emission.
pub const EXECUTION_OVERHEAD: u64 = 3_000;
pub const DEPLOYMENT_OVERHEAD: u64 = 400_000;

pub const SLOAD_COLD: u64 = 2_100;
pub const SLOAD_WARM: u64 = 100;
pub const SSTORE_COLD_DYNAMIC: u64 = 2_100;
pub const SSTORE_DEFAULT_DYNAMIC: u64 = 100;
pub const SSTORE_STORAGE_CREATION: u64 = 20_000;
pub const SSTORE_STORAGE_MODIFICATION: u64 = 2_900;
const REMOVE_SLOT_REFUND: i64 = 4_800;
const RESTORE_EMPTY_SLOT_REFUND: i64 = 19_900;
const RESTORE_SLOT_REFUND: i64 = 2_800;
/// EIP-3529: refunds are capped at a fifth of the gas used.
pub const MAX_REFUND_QUOTIENT: u64 = 5;

const SIM_CODE_MAGIC: &[u8] = b"SIM";
/// Supply minted to the deployer of a `Comp` instance.
pub const COMP_INITIAL_SUPPLY: u64 = 10_000_000;

/// Token models the simulator understands, keyed by contract name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Plain mintable ERC20.
    Plain,
    /// Mintable ERC20 recording a balance snapshot on every block.
    SnapshotEveryBlock,
    /// Mintable ERC20 with delegated vote tracking.
    Votes,
    /// Fixed supply minted to the deployer, with delegated vote tracking.
    Comp,
}

impl TokenKind {
    pub fn from_contract(contract: &str) -> Option<Self> {
        match contract {
            "ERC20Mock" => Some(Self::Plain),
            "ERC20SnapshotEveryBlockMock" => Some(Self::SnapshotEveryBlock),
            "ERC20VotesMock" => Some(Self::Votes),
            "Comp" => Some(Self::Comp),
            _ => None,
        }
    }

    fn mintable(self) -> bool {
        self != Self::Comp
    }

    fn tracks_votes(self) -> bool {
        matches!(self, Self::Votes | Self::Comp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Slot {
    Balance(Address),
    TotalSupply,
    Delegate(Address),
    Votes(Address),
    Snapshot(Address, u64),
    SupplySnapshot(u64),
}

#[derive(Debug, Clone)]
struct SimToken {
    kind: TokenKind,
    storage: HashMap<Slot, U256>,
}

impl SimToken {
    fn read(&self, slot: Slot) -> U256 {
        self.storage.get(&slot).copied().unwrap_or_default()
    }
}

/// Gas accounting for a single transaction.
struct TxMeter {
    gas: u64,
    refund: i64,
    warm: HashSet<Slot>,
    original: HashMap<Slot, U256>,
}

impl TxMeter {
    fn new(intrinsic: u64) -> Self {
        Self {
            gas: intrinsic,
            refund: 0,
            warm: HashSet::new(),
            original: HashMap::new(),
        }
    }

    fn touch(&mut self, token: &SimToken, slot: Slot) -> bool {
        self.original.entry(slot).or_insert_with(|| token.read(slot));
        self.warm.insert(slot)
    }

    fn sload(&mut self, token: &SimToken, slot: Slot) -> U256 {
        let was_cold = self.touch(token, slot);
        self.gas += if was_cold { SLOAD_COLD } else { SLOAD_WARM };
        token.read(slot)
    }

    fn sstore(&mut self, token: &mut SimToken, slot: Slot, new_value: U256) {
        let was_cold = self.touch(token, slot);
        let current_value = token.read(slot);
        let original_value = self.original.get(&slot).copied().unwrap_or_default();

        if new_value != current_value {
            if current_value == original_value {
                if !original_value.is_zero() && new_value.is_zero() {
                    self.refund += REMOVE_SLOT_REFUND;
                }
            } else {
                if !original_value.is_zero() {
                    if current_value.is_zero() {
                        self.refund -= REMOVE_SLOT_REFUND;
                    } else if new_value.is_zero() {
                        self.refund += REMOVE_SLOT_REFUND;
                    }
                }
                if new_value == original_value {
                    if original_value.is_zero() {
                        self.refund += RESTORE_EMPTY_SLOT_REFUND;
                    } else {
                        self.refund += RESTORE_SLOT_REFUND;
                    }
                }
            }
        }

        let mut dynamic = if new_value == current_value {
            SSTORE_DEFAULT_DYNAMIC
        } else if current_value == original_value {
            if original_value.is_zero() {
                SSTORE_STORAGE_CREATION
            } else {
                SSTORE_STORAGE_MODIFICATION
            }
        } else {
            SSTORE_DEFAULT_DYNAMIC
        };
        if was_cold {
            dynamic += SSTORE_COLD_DYNAMIC;
        }
        self.gas += dynamic;

        if new_value.is_zero() {
            token.storage.remove(&slot);
        } else {
            token.storage.insert(slot, new_value);
        }
    }

    fn finish(self) -> u64 {
        let refund = u64::try_from(self.refund.max(0)).unwrap_or_default();
        self.gas - refund.min(self.gas / MAX_REFUND_QUOTIENT)
    }
}

fn calldata_cost(data: &[u8]) -> u64 {
    data.iter()
        .map(|byte| {
            if *byte == 0 {
                CALLDATA_ZERO_BYTE_COST
            } else {
                CALLDATA_NON_ZERO_BYTE_COST
            }
        })
        .sum()
}

fn selector(name: &str, params: &[&str]) -> [u8; 4] {
    let params: Vec<String> = params.iter().map(|param| (*param).to_owned()).collect();
    compute_function_selector(name, &params)
}

fn word(data: &[u8], index: usize) -> Option<U256> {
    let start = 4 + index * 32;
    data.get(start..start + 32).map(U256::from_big_endian)
}

fn address_arg(data: &[u8], index: usize) -> Option<Address> {
    let start = 4 + index * 32;
    data.get(start + 12..start + 32).map(Address::from_slice)
}

/// Why a simulated call reverted.
#[derive(Debug)]
struct Revert;

#[derive(Default)]
struct SimState {
    block: u64,
    next_account: u64,
    next_contract: u64,
    tx_count: u64,
    contracts: HashMap<Address, SimToken>,
    receipts: HashMap<H256, Receipt>,
    submitted: Vec<TxRequest>,
}

/// In-memory [`Ledger`] handing out a fresh set of accounts on every
/// [`Ledger::accounts`] call.
pub struct SimLedger {
    accounts_per_fixture: usize,
    reverting_contracts: HashSet<String>,
    state: Mutex<SimState>,
}

impl SimLedger {
    pub fn new(accounts_per_fixture: usize) -> Self {
        Self {
            accounts_per_fixture,
            reverting_contracts: HashSet::new(),
            state: Mutex::new(SimState::default()),
        }
    }

    /// Deployments of `contract` always revert.
    pub fn with_reverting_constructor(mut self, contract: &str) -> Self {
        self.reverting_contracts.insert(contract.to_owned());
        self
    }

    fn state(&self) -> Result<MutexGuard<'_, SimState>, LedgerError> {
        self.state
            .lock()
            .map_err(|_| LedgerError::Custom("simulated ledger poisoned".to_owned()))
    }

    /// Every transaction submitted so far, in submission order.
    pub fn submitted(&self) -> Vec<TxRequest> {
        self.state
            .lock()
            .map(|state| state.submitted.clone())
            .unwrap_or_default()
    }

    fn deploy(&self, state: &mut SimState, tx: &TxRequest) -> (bool, u64, Option<Address>) {
        let intrinsic = TX_BASE_COST + CREATE_BASE_COST + calldata_cost(&tx.data);
        let gas = intrinsic + DEPLOYMENT_OVERHEAD;

        let contract = decode_sim_code(&tx.data);
        let Some((contract, kind)) = contract
            .and_then(|name| TokenKind::from_contract(name).map(|kind| (name, kind)))
        else {
            return (false, intrinsic, None);
        };
        if self.reverting_contracts.contains(contract) {
            return (false, gas, None);
        }

        let mut token = SimToken {
            kind,
            storage: HashMap::new(),
        };
        if kind == TokenKind::Comp {
            let supply = U256::from(COMP_INITIAL_SUPPLY);
            token.storage.insert(Slot::Balance(tx.from), supply);
            token.storage.insert(Slot::TotalSupply, supply);
        }

        state.next_contract += 1;
        let address = Address::from_low_u64_be(0xc0_0000 + state.next_contract);
        state.contracts.insert(address, token);
        (true, gas, Some(address))
    }

    fn execute(state: &mut SimState, tx: &TxRequest, to: Address) -> (bool, u64) {
        let block = state.block;
        let mut meter = TxMeter::new(TX_BASE_COST + calldata_cost(&tx.data) + EXECUTION_OVERHEAD);
        let Some(token) = state.contracts.get_mut(&to) else {
            // Plain value transfer to an account without code.
            return (true, meter.finish());
        };

        // Run against a scratch copy so a revert leaves storage untouched.
        let mut scratch = token.clone();
        match dispatch(&mut scratch, &mut meter, tx, block) {
            Ok(()) => {
                *token = scratch;
                (true, meter.finish())
            }
            Err(Revert) => (false, meter.gas),
        }
    }
}

fn dispatch(
    token: &mut SimToken,
    meter: &mut TxMeter,
    tx: &TxRequest,
    block: u64,
) -> Result<(), Revert> {
    let data = tx.data.as_ref();
    let selector_bytes = data.get(..4).ok_or(Revert)?;

    if selector_bytes == selector("mint", &["address", "uint256"]) {
        if !token.kind.mintable() {
            return Err(Revert);
        }
        let to = address_arg(data, 0).ok_or(Revert)?;
        let amount = word(data, 1).ok_or(Revert)?;
        mint(token, meter, to, amount, block)
    } else if selector_bytes == selector("transfer", &["address", "uint256"]) {
        let to = address_arg(data, 0).ok_or(Revert)?;
        let amount = word(data, 1).ok_or(Revert)?;
        transfer(token, meter, tx.from, to, amount, block)
    } else if selector_bytes == selector("delegate", &["address"]) {
        if !token.kind.tracks_votes() {
            return Err(Revert);
        }
        let delegatee = address_arg(data, 0).ok_or(Revert)?;
        delegate(token, meter, tx.from, delegatee)
    } else {
        Err(Revert)
    }
}

fn mint(
    token: &mut SimToken,
    meter: &mut TxMeter,
    to: Address,
    amount: U256,
    block: u64,
) -> Result<(), Revert> {
    let supply = meter.sload(token, Slot::TotalSupply);
    let supply = supply.checked_add(amount).ok_or(Revert)?;
    meter.sstore(token, Slot::TotalSupply, supply);
    let balance = meter.sload(token, Slot::Balance(to));
    let balance = balance.checked_add(amount).ok_or(Revert)?;
    meter.sstore(token, Slot::Balance(to), balance);

    if token.kind == TokenKind::SnapshotEveryBlock {
        meter.sstore(token, Slot::SupplySnapshot(block), supply);
        meter.sstore(token, Slot::Snapshot(to, block), balance);
    }
    if token.kind.tracks_votes() {
        let delegatee = address_from_word(meter.sload(token, Slot::Delegate(to)));
        move_votes(token, meter, None, delegatee, amount)?;
    }
    Ok(())
}

fn transfer(
    token: &mut SimToken,
    meter: &mut TxMeter,
    from: Address,
    to: Address,
    amount: U256,
    block: u64,
) -> Result<(), Revert> {
    let from_balance = meter.sload(token, Slot::Balance(from));
    let from_balance = from_balance.checked_sub(amount).ok_or(Revert)?;
    meter.sstore(token, Slot::Balance(from), from_balance);
    let to_balance = meter.sload(token, Slot::Balance(to));
    let to_balance = to_balance.checked_add(amount).ok_or(Revert)?;
    meter.sstore(token, Slot::Balance(to), to_balance);

    if token.kind == TokenKind::SnapshotEveryBlock {
        meter.sstore(token, Slot::Snapshot(from, block), from_balance);
        meter.sstore(token, Slot::Snapshot(to, block), to_balance);
    }
    if token.kind.tracks_votes() {
        let source = address_from_word(meter.sload(token, Slot::Delegate(from)));
        let target = address_from_word(meter.sload(token, Slot::Delegate(to)));
        move_votes(token, meter, source, target, amount)?;
    }
    Ok(())
}

fn delegate(
    token: &mut SimToken,
    meter: &mut TxMeter,
    account: Address,
    delegatee: Address,
) -> Result<(), Revert> {
    let previous = address_from_word(meter.sload(token, Slot::Delegate(account)));
    meter.sstore(token, Slot::Delegate(account), address_to_word(delegatee));
    let balance = meter.sload(token, Slot::Balance(account));
    let next = (!delegatee.is_zero()).then_some(delegatee);
    move_votes(token, meter, previous, next, balance)
}

fn move_votes(
    token: &mut SimToken,
    meter: &mut TxMeter,
    source: Option<Address>,
    target: Option<Address>,
    amount: U256,
) -> Result<(), Revert> {
    if source == target || amount.is_zero() {
        return Ok(());
    }
    if let Some(source) = source {
        let votes = meter.sload(token, Slot::Votes(source));
        meter.sstore(token, Slot::Votes(source), votes.checked_sub(amount).ok_or(Revert)?);
    }
    if let Some(target) = target {
        let votes = meter.sload(token, Slot::Votes(target));
        meter.sstore(token, Slot::Votes(target), votes.checked_add(amount).ok_or(Revert)?);
    }
    Ok(())
}

fn address_to_word(address: Address) -> U256 {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    U256::from_big_endian(&word)
}

fn address_from_word(word: U256) -> Option<Address> {
    let bytes = word.to_big_endian();
    let address = Address::from_slice(&bytes[12..]);
    (!address.is_zero()).then_some(address)
}

fn decode_sim_code(init_code: &[u8]) -> Option<&str> {
    let rest = init_code.strip_prefix(SIM_CODE_MAGIC)?;
    let (&len, rest) = rest.split_first()?;
    std::str::from_utf8(rest.get(..usize::from(len))?).ok()
}

#[async_trait]
impl Ledger for SimLedger {
    async fn accounts(&self) -> Result<Vec<Address>, LedgerError> {
        let mut state = self.state()?;
        let start = state.next_account;
        state.next_account += self.accounts_per_fixture as u64;
        Ok((start..state.next_account)
            .map(|n| Address::from_low_u64_be(0xa0_0000 + n))
            .collect())
    }

    async fn send_transaction(&self, tx: TxRequest) -> Result<H256, LedgerError> {
        let mut state = self.state()?;
        state.block += 1;
        state.tx_count += 1;
        let tx_hash = H256::from_low_u64_be(state.tx_count);

        let (success, gas_used, contract_address) = match tx.to {
            None => self.deploy(&mut state, &tx),
            Some(to) => {
                let (success, gas_used) = Self::execute(&mut state, &tx, to);
                (success, gas_used, None)
            }
        };
        state.receipts.insert(
            tx_hash,
            Receipt {
                tx_hash,
                success,
                gas_used,
                contract_address,
            },
        );
        state.submitted.push(tx);
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: H256) -> Result<Receipt, LedgerError> {
        self.state()?
            .receipts
            .get(&tx_hash)
            .cloned()
            .ok_or_else(|| LedgerError::Custom(format!("unknown transaction {tx_hash:#x}")))
    }

    async fn call(&self, tx: TxRequest) -> Result<Bytes, LedgerError> {
        let state = self.state()?;
        let token = tx
            .to
            .and_then(|to| state.contracts.get(&to))
            .ok_or_else(|| LedgerError::Custom("call to an address without code".to_owned()))?;
        let data = tx.data.as_ref();
        if data.get(..4) != Some(&selector("balanceOf", &["address"])[..]) {
            return Err(LedgerError::Custom("unsupported read-only call".to_owned()));
        }
        let account = address_arg(data, 0)
            .ok_or_else(|| LedgerError::Custom("malformed balanceOf call".to_owned()))?;
        Ok(Bytes::from(token.read(Slot::Balance(account)).to_big_endian().to_vec()))
    }
}

/// Artifact source producing init code the [`SimLedger`] recognizes.
#[derive(Debug, Default, Clone)]
pub struct SimArtifacts;

impl ArtifactSource for SimArtifacts {
    fn init_code(&self, contract: &str) -> Result<Bytes, ArtifactError> {
        let len = u8::try_from(contract.len())
            .map_err(|_| ArtifactError::InvalidBytecode(contract.to_owned()))?;
        let mut code = SIM_CODE_MAGIC.to_vec();
        code.push(len);
        code.extend_from_slice(contract.as_bytes());
        Ok(Bytes::from(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erc20gas_rpc::calldata::{Value, encode_calldata};

    fn call(from: Address, to: Address, signature: &str, args: &[Value]) -> TxRequest {
        TxRequest::call(from, to, encode_calldata(signature, args).unwrap())
    }

    async fn deploy(ledger: &SimLedger, contract: &str, admin: Address) -> Address {
        let code = SimArtifacts.init_code(contract).unwrap();
        ledger
            .transact(TxRequest::create(admin, code))
            .await
            .unwrap()
            .contract_address
            .unwrap()
    }

    #[tokio::test]
    async fn accounts_are_fresh_on_every_query() {
        let ledger = SimLedger::new(4);
        let first = ledger.accounts().await.unwrap();
        let second = ledger.accounts().await.unwrap();
        assert_eq!(first.len(), 4);
        assert!(first.iter().all(|a| !second.contains(a)));
    }

    #[tokio::test]
    async fn zero_to_nonzero_write_costs_more_than_an_update() {
        let ledger = SimLedger::new(3);
        let accounts = ledger.accounts().await.unwrap();
        let token = deploy(&ledger, "ERC20Mock", accounts[0]).await;
        let mint = |amount: u64| {
            call(
                accounts[0],
                token,
                "mint(address,uint256)",
                &[Value::Address(accounts[1]), Value::Uint(U256::from(amount))],
            )
        };
        let first = ledger.transact(mint(1)).await.unwrap().gas_used;
        let second = ledger.transact(mint(1)).await.unwrap().gas_used;
        assert_eq!(
            first - second,
            2 * (SSTORE_STORAGE_CREATION - SSTORE_STORAGE_MODIFICATION)
        );
    }

    #[tokio::test]
    async fn clearing_a_balance_earns_a_refund() {
        let ledger = SimLedger::new(4);
        let accounts = ledger.accounts().await.unwrap();
        let token = deploy(&ledger, "ERC20Mock", accounts[0]).await;
        ledger
            .transact(call(
                accounts[0],
                token,
                "mint(address,uint256)",
                &[Value::Address(accounts[1]), Value::Uint(U256::from(100))],
            ))
            .await
            .unwrap();
        let send = |to: Address, amount: u64| {
            call(
                accounts[1],
                token,
                "transfer(address,uint256)",
                &[Value::Address(to), Value::Uint(U256::from(amount))],
            )
        };
        let partial = ledger.transact(send(accounts[2], 10)).await.unwrap().gas_used;
        let empty = ledger.transact(send(accounts[3], 90)).await.unwrap().gas_used;
        assert!(empty < partial, "{empty} >= {partial}");
        assert_eq!(
            ledger.balance_of(token, accounts[1]).await.unwrap(),
            U256::zero()
        );
    }

    #[tokio::test]
    async fn reverted_transfer_leaves_storage_untouched() {
        let ledger = SimLedger::new(3);
        let accounts = ledger.accounts().await.unwrap();
        let token = deploy(&ledger, "ERC20Mock", accounts[0]).await;
        let err = ledger
            .transact(call(
                accounts[1],
                token,
                "transfer(address,uint256)",
                &[Value::Address(accounts[2]), Value::Uint(U256::from(1))],
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Reverted { .. }));
        assert_eq!(
            ledger.balance_of(token, accounts[2]).await.unwrap(),
            U256::zero()
        );
    }

    #[tokio::test]
    async fn comp_supply_belongs_to_the_deployer_and_cannot_be_minted() {
        let ledger = SimLedger::new(2);
        let accounts = ledger.accounts().await.unwrap();
        let token = deploy(&ledger, "Comp", accounts[0]).await;
        assert_eq!(
            ledger.balance_of(token, accounts[0]).await.unwrap(),
            U256::from(COMP_INITIAL_SUPPLY)
        );
        let err = ledger
            .transact(call(
                accounts[0],
                token,
                "mint(address,uint256)",
                &[Value::Address(accounts[1]), Value::Uint(U256::one())],
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Reverted { .. }));
    }

    #[tokio::test]
    async fn reverting_constructor_yields_failed_receipt() {
        let ledger = SimLedger::new(1).with_reverting_constructor("ERC20Mock");
        let admin = ledger.accounts().await.unwrap()[0];
        let code = SimArtifacts.init_code("ERC20Mock").unwrap();
        let tx_hash = ledger
            .send_transaction(TxRequest::create(admin, code))
            .await
            .unwrap();
        let receipt = ledger.wait_for_receipt(tx_hash).await.unwrap();
        assert!(!receipt.success);
        assert_eq!(receipt.contract_address, None);
    }
}
