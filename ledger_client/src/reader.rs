//! Typed reads of staking-contract state.
//!
//! Wire format: amounts are decimal strings (u128 does not fit JSON numbers),
//! periods are plain integers, addresses are `0x` hex with the all-zero address
//! standing for "none".

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;

use stakeline_types::{
    Contract, Period, RestakeState, Stake, StakeHolder, StakingAddress, TokenAmount,
    WorkerBinding,
};

use crate::client::LedgerClient;
use crate::error::LedgerError;

/// Read-only method names.
pub mod methods {
    pub const BALANCE_OF: &str = "balanceOf";
    pub const SUB_STAKES: &str = "getSubStakes";
    pub const WORKER: &str = "getWorkerFromStaker";
    pub const RESTAKE_INFO: &str = "getReStakeInfo";
    pub const WIND_DOWN: &str = "isWindingDown";
    pub const STAKING_REWARD: &str = "getAvailableReward";
    pub const POLICY_REWARD: &str = "getAvailableReward";
    pub const WITHDRAWABLE: &str = "availableForWithdraw";
}

/// One sub-stake as the escrow reports it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireSubStake {
    pub index: u32,
    pub value: String,
    pub start_period: u64,
    pub end_period: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireWorker {
    pub worker: StakingAddress,
    pub start_period: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireReStake {
    pub enabled: bool,
    /// Zero when no lock is set.
    pub lock_until: u64,
}

/// Everything the lifecycle engine needs to know about one staker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderState {
    pub holder: StakeHolder,
    /// Ledger period at the time of the read.
    pub period: Period,
    /// Ordered by `index`.
    pub stakes: Vec<Stake>,
    /// Unstaked token balance of the staking address.
    pub balance: TokenAmount,
    pub worker: Option<WorkerBinding>,
    pub restake: RestakeState,
    pub wind_down: bool,
    pub staking_reward: TokenAmount,
    pub policy_reward: TokenAmount,
    /// Tokens the beneficiary may withdraw from a preallocation contract.
    pub unlocked_tokens: Option<TokenAmount>,
}

impl HolderState {
    pub fn stake(&self, index: u32) -> Option<&Stake> {
        self.stakes.iter().find(|s| s.index == index)
    }

    pub fn total_staked(&self, current: Period) -> TokenAmount {
        self.stakes
            .iter()
            .filter(|s| s.is_active(current))
            .map(|s| s.value)
            .sum()
    }
}

/// Typed view over a [`LedgerClient`].
pub struct StakingReader<'a, L: LedgerClient + ?Sized> {
    ledger: &'a L,
}

impl<'a, L: LedgerClient + ?Sized> StakingReader<'a, L> {
    pub fn new(ledger: &'a L) -> Self {
        Self { ledger }
    }

    /// Read the full staker state.
    ///
    /// The reads are issued concurrently; they are not a consistent snapshot
    /// of one block, which callers reconcile through the period stamp.
    pub async fn fetch_holder_state(&self, holder: &StakeHolder) -> Result<HolderState, LedgerError> {
        let addr = &holder.staking_address;
        let (period, balance, raw_stakes, worker, restake, wind_down, staking_reward, policy_reward) =
            tokio::try_join!(
                self.ledger.current_period(),
                self.token_balance(addr),
                self.sub_stakes(addr),
                self.worker(addr),
                self.restake_info(addr),
                self.wind_down(addr),
                self.staking_reward(addr),
                self.policy_reward(addr),
            )?;

        let unlocked_tokens = if holder.is_preallocation() {
            Some(self.withdrawable(addr).await?)
        } else {
            None
        };

        let stakes = build_stakes(addr, period, raw_stakes, worker.as_ref(), &restake)?;

        Ok(HolderState {
            holder: holder.clone(),
            period,
            stakes,
            balance,
            worker,
            restake,
            wind_down,
            staking_reward,
            policy_reward,
            unlocked_tokens,
        })
    }

    pub async fn token_balance(&self, addr: &StakingAddress) -> Result<TokenAmount, LedgerError> {
        let v = self
            .ledger
            .call(&Contract::Token, methods::BALANCE_OF, json!([addr.as_str()]))
            .await?;
        parse_amount(&v)
    }

    pub async fn sub_stakes(&self, addr: &StakingAddress) -> Result<Vec<WireSubStake>, LedgerError> {
        let v = self
            .ledger
            .call(&Contract::StakingEscrow, methods::SUB_STAKES, json!([addr.as_str()]))
            .await?;
        decode(v, "sub-stakes")
    }

    pub async fn worker(&self, addr: &StakingAddress) -> Result<Option<WorkerBinding>, LedgerError> {
        let v = self
            .ledger
            .call(&Contract::StakingEscrow, methods::WORKER, json!([addr.as_str()]))
            .await?;
        let wire: WireWorker = decode(v, "worker")?;
        if wire.worker.is_null() {
            return Ok(None);
        }
        Ok(Some(WorkerBinding {
            worker: wire.worker,
            bonded_since: Period::new(wire.start_period),
        }))
    }

    pub async fn restake_info(&self, addr: &StakingAddress) -> Result<RestakeState, LedgerError> {
        let v = self
            .ledger
            .call(&Contract::StakingEscrow, methods::RESTAKE_INFO, json!([addr.as_str()]))
            .await?;
        let wire: WireReStake = decode(v, "re-stake info")?;
        Ok(RestakeState {
            enabled: wire.enabled,
            lock_until: (wire.lock_until > 0).then(|| Period::new(wire.lock_until)),
        })
    }

    pub async fn wind_down(&self, addr: &StakingAddress) -> Result<bool, LedgerError> {
        let v = self
            .ledger
            .call(&Contract::StakingEscrow, methods::WIND_DOWN, json!([addr.as_str()]))
            .await?;
        v.as_bool()
            .ok_or_else(|| LedgerError::InvalidResponse(format!("wind-down flag: {v}")))
    }

    pub async fn staking_reward(&self, addr: &StakingAddress) -> Result<TokenAmount, LedgerError> {
        let v = self
            .ledger
            .call(&Contract::StakingEscrow, methods::STAKING_REWARD, json!([addr.as_str()]))
            .await?;
        parse_amount(&v)
    }

    pub async fn policy_reward(&self, addr: &StakingAddress) -> Result<TokenAmount, LedgerError> {
        let v = self
            .ledger
            .call(&Contract::PolicyManager, methods::POLICY_REWARD, json!([addr.as_str()]))
            .await?;
        parse_amount(&v)
    }

    pub async fn withdrawable(&self, contract: &StakingAddress) -> Result<TokenAmount, LedgerError> {
        let v = self
            .ledger
            .call(
                &Contract::Preallocation(contract.clone()),
                methods::WITHDRAWABLE,
                json!([]),
            )
            .await?;
        parse_amount(&v)
    }
}

fn decode<T: serde::de::DeserializeOwned>(v: Value, what: &str) -> Result<T, LedgerError> {
    serde_json::from_value(v).map_err(|e| LedgerError::InvalidResponse(format!("{what}: {e}")))
}

/// Accepts a decimal string or a JSON integer.
pub fn parse_amount(v: &Value) -> Result<TokenAmount, LedgerError> {
    let raw = match v {
        Value::String(s) => s.parse::<u128>().ok(),
        Value::Number(n) => n.as_u64().map(u128::from),
        _ => None,
    };
    raw.map(TokenAmount::new)
        .ok_or_else(|| LedgerError::InvalidResponse(format!("amount: {v}")))
}

fn build_stakes(
    staker: &StakingAddress,
    period: Period,
    raw: Vec<WireSubStake>,
    worker: Option<&WorkerBinding>,
    restake: &RestakeState,
) -> Result<Vec<Stake>, LedgerError> {
    let mut seen = HashSet::new();
    let mut stakes = Vec::with_capacity(raw.len());
    for w in raw {
        if !seen.insert(w.index) {
            return Err(LedgerError::InvalidResponse(format!(
                "duplicate stake index {}",
                w.index
            )));
        }
        let stake = Stake {
            staker: staker.clone(),
            worker: worker.map(|b| b.worker.clone()),
            index: w.index,
            value: parse_amount(&Value::String(w.value))?,
            start_period: Period::new(w.start_period),
            end_period: Period::new(w.end_period),
            restaking: restake.enabled,
            restake_lock_until: restake.lock_until,
        };
        if !stake.is_well_formed(period) {
            return Err(LedgerError::InvalidResponse(format!(
                "malformed stake {}: value {} periods {}..{}",
                stake.index, stake.value, stake.start_period, stake.end_period
            )));
        }
        stakes.push(stake);
    }
    stakes.sort_by_key(|s| s.index);
    Ok(stakes)
}
