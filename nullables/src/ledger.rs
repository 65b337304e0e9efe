//! Nullable ledger: an in-memory staking contract.
//!
//! Answers the same reads as the real contracts and applies submitted
//! calls to its own state, so a full sync → stage → submit → re-sync cycle
//! runs without a network. Failures are injected programmatically.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;

use stakeline_crypto::{blake2b_256_multi, signing_bytes, verify_transaction};
use stakeline_ledger_client::reader::{methods, WireReStake, WireSubStake, WireWorker};
use stakeline_ledger_client::{LedgerClient, LedgerError};
use stakeline_types::{
    Contract, Period, ReceiptStatus, RestakeState, SignedTransaction, StakingAddress,
    StakingCall, TokenAmount, TransactionReceipt, TxHash, WorkerBinding,
};

/// A sub-stake as the simulated escrow stores it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimStake {
    pub value: TokenAmount,
    pub start_period: Period,
    pub end_period: Period,
}

impl SimStake {
    pub fn new(value: TokenAmount, start: u64, end: u64) -> Self {
        Self {
            value,
            start_period: Period::new(start),
            end_period: Period::new(end),
        }
    }
}

#[derive(Default)]
struct StakerRecord {
    stakes: Vec<SimStake>,
    worker: Option<WorkerBinding>,
    restake: RestakeState,
    wind_down: bool,
    staking_reward: TokenAmount,
    policy_reward: TokenAmount,
}

#[derive(Default)]
struct SimState {
    period: Period,
    balances: HashMap<StakingAddress, TokenAmount>,
    stakers: HashMap<StakingAddress, StakerRecord>,
    /// Preallocation contract → (beneficiary, unlocked tokens).
    preallocations: HashMap<StakingAddress, (StakingAddress, TokenAmount)>,
    receipts: HashMap<TxHash, TransactionReceipt>,
    submitted: Vec<SignedTransaction>,
    block: u64,
    // Failure injection
    fail_reads: bool,
    hold_receipts: bool,
    reject_at: HashMap<usize, String>,
    revert_methods: HashMap<String, String>,
}

/// In-memory staking ledger for tests.
/// Thread-safe for use with tokio's multi-threaded runtime.
pub struct NullLedger {
    state: Mutex<SimState>,
}

impl NullLedger {
    pub fn new(period: Period) -> Self {
        Self {
            state: Mutex::new(SimState {
                period,
                ..SimState::default()
            }),
        }
    }

    // ── Setup ──────────────────────────────────────────────────────────

    pub fn set_balance(&self, address: &StakingAddress, amount: TokenAmount) {
        self.state.lock().balances.insert(address.clone(), amount);
    }

    pub fn balance(&self, address: &StakingAddress) -> TokenAmount {
        balance_of(&self.state.lock(), address)
    }

    pub fn add_stake(&self, staker: &StakingAddress, stake: SimStake) {
        self.state
            .lock()
            .stakers
            .entry(staker.clone())
            .or_default()
            .stakes
            .push(stake);
    }

    pub fn stakes(&self, staker: &StakingAddress) -> Vec<SimStake> {
        self.state
            .lock()
            .stakers
            .get(staker)
            .map(|r| r.stakes.clone())
            .unwrap_or_default()
    }

    pub fn set_worker(&self, staker: &StakingAddress, worker: StakingAddress, since: Period) {
        self.state.lock().stakers.entry(staker.clone()).or_default().worker =
            Some(WorkerBinding {
                worker,
                bonded_since: since,
            });
    }

    pub fn set_restake(&self, staker: &StakingAddress, restake: RestakeState) {
        self.state.lock().stakers.entry(staker.clone()).or_default().restake = restake;
    }

    pub fn set_rewards(&self, staker: &StakingAddress, staking: TokenAmount, policy: TokenAmount) {
        let mut state = self.state.lock();
        let record = state.stakers.entry(staker.clone()).or_default();
        record.staking_reward = staking;
        record.policy_reward = policy;
    }

    /// Register `contract` as a preallocation signed for by `beneficiary`.
    pub fn add_preallocation(
        &self,
        contract: &StakingAddress,
        beneficiary: &StakingAddress,
        unlocked: TokenAmount,
    ) {
        self.state
            .lock()
            .preallocations
            .insert(contract.clone(), (beneficiary.clone(), unlocked));
    }

    /// Move the ledger forward. Stakes that are not winding down keep
    /// their remaining duration.
    pub fn advance_periods(&self, periods: u64) {
        let mut state = self.state.lock();
        let current = state.period;
        state.period = Period::new(current.index() + periods);
        for record in state.stakers.values_mut() {
            if record.wind_down {
                continue;
            }
            for stake in record.stakes.iter_mut().filter(|s| s.end_period > current) {
                stake.end_period = Period::new(stake.end_period.index() + periods);
            }
        }
    }

    // ── Failure injection ──────────────────────────────────────────────

    /// Make every read fail with a transport error.
    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().fail_reads = fail;
    }

    /// Reject the `nth` submission (0-based, counted over the ledger's
    /// lifetime) at broadcast.
    pub fn reject_submission(&self, nth: usize, reason: &str) {
        self.state.lock().reject_at.insert(nth, reason.to_string());
    }

    /// Include every transaction calling `method` but revert it.
    pub fn revert_method(&self, method: &str, reason: &str) {
        self.state
            .lock()
            .revert_methods
            .insert(method.to_string(), reason.to_string());
    }

    /// Keep receipts pending until released.
    pub fn hold_receipts(&self, hold: bool) {
        self.state.lock().hold_receipts = hold;
    }

    // ── Assertions ─────────────────────────────────────────────────────

    /// Every `submit` call, including rejected ones.
    pub fn submission_count(&self) -> usize {
        self.state.lock().submitted.len()
    }

    pub fn submitted_methods(&self) -> Vec<String> {
        self.state
            .lock()
            .submitted
            .iter()
            .map(|tx| tx.transaction.call.method().to_string())
            .collect()
    }

    pub fn is_winding_down(&self, staker: &StakingAddress) -> bool {
        self.state
            .lock()
            .stakers
            .get(staker)
            .map(|r| r.wind_down)
            .unwrap_or(false)
    }
}

impl Default for NullLedger {
    fn default() -> Self {
        Self::new(Period::ZERO)
    }
}

fn balance_of(state: &SimState, address: &StakingAddress) -> TokenAmount {
    state.balances.get(address).copied().unwrap_or_default()
}

fn credit(state: &mut SimState, address: &StakingAddress, amount: TokenAmount) {
    let entry = state.balances.entry(address.clone()).or_default();
    *entry = entry.checked_add(amount).unwrap_or(*entry);
}

fn debit(state: &mut SimState, address: &StakingAddress, amount: TokenAmount) -> Result<(), String> {
    let balance = balance_of(state, address);
    let rest = balance
        .checked_sub(amount)
        .ok_or_else(|| format!("insufficient balance: {balance} < {amount}"))?;
    state.balances.insert(address.clone(), rest);
    Ok(())
}

fn amount_str(amount: TokenAmount) -> Value {
    Value::String(amount.raw().to_string())
}

fn address_arg(args: &Value) -> Result<StakingAddress, LedgerError> {
    args.get(0)
        .and_then(Value::as_str)
        .and_then(|s| StakingAddress::parse(s).ok())
        .ok_or_else(|| LedgerError::Rpc(format!("expected an address argument, got {args}")))
}

impl SimState {
    fn read(&self, contract: &Contract, method: &str, args: &Value) -> Result<Value, LedgerError> {
        if let Contract::Preallocation(addr) = contract {
            return match method {
                methods::WITHDRAWABLE => self
                    .preallocations
                    .get(addr)
                    .map(|(_, unlocked)| amount_str(*unlocked))
                    .ok_or_else(|| LedgerError::Rpc(format!("{addr} is not a preallocation"))),
                other => Err(LedgerError::Rpc(format!("unknown method {other}"))),
            };
        }

        let addr = address_arg(args)?;
        let empty = StakerRecord::default();
        let record = self.stakers.get(&addr).unwrap_or(&empty);
        let value = match (contract, method) {
            (Contract::Token, methods::BALANCE_OF) => amount_str(balance_of(self, &addr)),
            (Contract::StakingEscrow, methods::SUB_STAKES) => {
                let stakes: Vec<WireSubStake> = record
                    .stakes
                    .iter()
                    .enumerate()
                    .map(|(i, s)| WireSubStake {
                        index: i as u32,
                        value: s.value.raw().to_string(),
                        start_period: s.start_period.index(),
                        end_period: s.end_period.index(),
                    })
                    .collect();
                json!(stakes)
            }
            (Contract::StakingEscrow, methods::WORKER) => {
                let wire = match &record.worker {
                    Some(b) => WireWorker {
                        worker: b.worker.clone(),
                        start_period: b.bonded_since.index(),
                    },
                    None => WireWorker {
                        worker: StakingAddress::null(),
                        start_period: 0,
                    },
                };
                json!(wire)
            }
            (Contract::StakingEscrow, methods::RESTAKE_INFO) => json!(WireReStake {
                enabled: record.restake.enabled,
                lock_until: record.restake.lock_until.map(|p| p.index()).unwrap_or(0),
            }),
            (Contract::StakingEscrow, methods::WIND_DOWN) => json!(record.wind_down),
            (Contract::StakingEscrow, methods::STAKING_REWARD) => amount_str(record.staking_reward),
            (Contract::PolicyManager, methods::POLICY_REWARD) => amount_str(record.policy_reward),
            (contract, method) => {
                return Err(LedgerError::Rpc(format!("unknown method {contract}.{method}")))
            }
        };
        Ok(value)
    }

    /// The staker a transaction acts for, after checking the signer may
    /// act for it.
    fn staker_for(&self, tx: &SignedTransaction) -> Result<StakingAddress, String> {
        let from = &tx.transaction.from;
        match &tx.transaction.call.contract {
            Contract::Preallocation(contract) => match self.preallocations.get(contract) {
                Some((beneficiary, _)) if beneficiary == from => Ok(contract.clone()),
                Some(_) => Err("caller is not the beneficiary".to_string()),
                None => Err(format!("{contract} is not a preallocation")),
            },
            _ => Ok(from.clone()),
        }
    }

    fn apply(&mut self, tx: &SignedTransaction) -> Result<(), String> {
        let staker = self.staker_for(tx)?;
        let period = self.period;
        let call = &tx.transaction.call.call;

        match call {
            StakingCall::Deposit { value, periods } => {
                debit(self, &staker, *value)?;
                let start = period.next();
                let end = start.checked_add(*periods).ok_or("period overflow")?;
                self.stakers.entry(staker).or_default().stakes.push(SimStake {
                    value: *value,
                    start_period: start,
                    end_period: end,
                });
            }
            StakingCall::DivideStake {
                index,
                target_value,
                extra_periods,
            } => {
                let record = self.stakers.entry(staker).or_default();
                let stake = record
                    .stakes
                    .get_mut(*index as usize)
                    .ok_or("no such stake")?;
                if stake.end_period <= period {
                    return Err("stake expired".to_string());
                }
                let rest = stake
                    .value
                    .checked_sub(*target_value)
                    .filter(|r| !r.is_zero() && !target_value.is_zero())
                    .ok_or("invalid target value")?;
                stake.value = rest;
                let new = SimStake {
                    value: *target_value,
                    start_period: stake.start_period,
                    end_period: stake
                        .end_period
                        .checked_add(*extra_periods)
                        .ok_or("period overflow")?,
                };
                record.stakes.push(new);
            }
            StakingCall::ProlongStake { index, periods } => {
                let record = self.stakers.entry(staker).or_default();
                let stake = record
                    .stakes
                    .get_mut(*index as usize)
                    .ok_or("no such stake")?;
                stake.end_period = stake.end_period.checked_add(*periods).ok_or("period overflow")?;
            }
            StakingCall::SetWindDown { enabled } => {
                self.stakers.entry(staker).or_default().wind_down = *enabled;
            }
            StakingCall::BondWorker { worker } => {
                self.stakers.entry(staker).or_default().worker =
                    worker.clone().map(|worker| WorkerBinding {
                        worker,
                        bonded_since: period,
                    });
            }
            StakingCall::SetReStake { enabled } => {
                let restake = &mut self.stakers.entry(staker).or_default().restake;
                if !enabled && restake.is_locked(period) {
                    return Err("re-stake is locked".to_string());
                }
                restake.enabled = *enabled;
            }
            StakingCall::LockReStake { until } => {
                if *until <= period {
                    return Err("lock must be in the future".to_string());
                }
                self.stakers.entry(staker).or_default().restake.lock_until = Some(*until);
            }
            StakingCall::WithdrawStakingReward { amount } => {
                let record = self.stakers.entry(staker.clone()).or_default();
                record.staking_reward = record
                    .staking_reward
                    .checked_sub(*amount)
                    .ok_or("reward exceeded")?;
                credit(self, &staker, *amount);
            }
            StakingCall::WithdrawPolicyReward { to } => {
                let record = self.stakers.entry(staker).or_default();
                let amount = std::mem::take(&mut record.policy_reward);
                credit(self, to, amount);
            }
            StakingCall::WithdrawTokens { amount } => {
                let (beneficiary, unlocked) = self
                    .preallocations
                    .get_mut(&staker)
                    .ok_or("not a preallocation")?;
                *unlocked = unlocked.checked_sub(*amount).ok_or("amount exceeds unlocked")?;
                let beneficiary = beneficiary.clone();
                debit(self, &staker, *amount)?;
                credit(self, &beneficiary, *amount);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerClient for NullLedger {
    async fn call(
        &self,
        contract: &Contract,
        method: &str,
        args: Value,
    ) -> Result<Value, LedgerError> {
        let state = self.state.lock();
        if state.fail_reads {
            return Err(LedgerError::Transport("null ledger offline".to_string()));
        }
        state.read(contract, method, &args)
    }

    async fn submit(&self, tx: &SignedTransaction) -> Result<TxHash, LedgerError> {
        let mut state = self.state.lock();
        let nth = state.submitted.len();
        state.submitted.push(tx.clone());

        if let Some(reason) = state.reject_at.get(&nth) {
            return Err(LedgerError::Rejected(reason.clone()));
        }
        if !verify_transaction(tx) {
            return Err(LedgerError::Rejected("invalid signature".to_string()));
        }

        let bytes = signing_bytes(&tx.transaction).map_err(|e| LedgerError::Rejected(e.to_string()))?;
        let hash = TxHash::new(blake2b_256_multi(&[&bytes, &(nth as u64).to_le_bytes()]));

        let method = tx.transaction.call.method();
        let revert = state.revert_methods.get(method).cloned();
        let status = match revert {
            Some(reason) => ReceiptStatus::Reverted { reason },
            None => match state.apply(tx) {
                Ok(()) => ReceiptStatus::Success,
                Err(reason) => ReceiptStatus::Reverted { reason },
            },
        };

        state.block += 1;
        let receipt = TransactionReceipt {
            tx_hash: hash,
            block_number: state.block,
            gas_used: tx.transaction.gas_limit,
            status,
        };
        state.receipts.insert(hash, receipt);
        Ok(hash)
    }

    async fn receipt(&self, tx_hash: &TxHash) -> Result<Option<TransactionReceipt>, LedgerError> {
        let state = self.state.lock();
        if state.hold_receipts {
            return Ok(None);
        }
        Ok(state.receipts.get(tx_hash).cloned())
    }

    async fn current_period(&self) -> Result<Period, LedgerError> {
        let state = self.state.lock();
        if state.fail_reads {
            return Err(LedgerError::Transport("null ledger offline".to_string()));
        }
        Ok(state.period)
    }
}
