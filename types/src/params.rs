//! Staking parameters: contract constants the client validates against.
//!
//! These mirror values enforced by the staking contracts. They are supplied
//! by configuration rather than hard-coded so a client can follow a network
//! whose contracts were deployed with different constants.

use serde::{Deserialize, Serialize};

/// Contract constants and period clock parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StakingParams {
    // ── Stake constraints ────────────────────────────────────────────────
    /// Minimum lock duration of a new stake, in periods.
    pub min_stake_duration: u64,

    /// Minimum number of periods a worker stays bonded before it can be
    /// replaced or detached.
    pub min_worker_periods: u64,

    // ── Period clock ─────────────────────────────────────────────────────
    /// Length of one period in seconds. Default: 24 hours.
    pub period_length_secs: u64,

    /// Unix timestamp at which period 0 begins.
    pub epoch_secs: u64,

    // ── Cost estimates ───────────────────────────────────────────────────
    pub gas: GasSchedule,
}

impl StakingParams {
    /// Live network defaults.
    pub fn mainnet_defaults() -> Self {
        Self {
            min_stake_duration: 30,
            min_worker_periods: 2,
            period_length_secs: 24 * 3600,
            epoch_secs: 0,
            gas: GasSchedule::default(),
        }
    }

    /// Short periods so a testnet staker can watch stakes expire in hours.
    pub fn testnet_defaults() -> Self {
        Self {
            period_length_secs: 3600,
            ..Self::mainnet_defaults()
        }
    }
}

impl Default for StakingParams {
    fn default() -> Self {
        Self::mainnet_defaults()
    }
}

/// Estimated gas per staking-contract method.
///
/// Used only to show the cost of a staged plan before it is published; the
/// ledger charges the real amount.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasSchedule {
    pub deposit: u64,
    pub divide_stake: u64,
    pub prolong_stake: u64,
    pub set_wind_down: u64,
    pub bond_worker: u64,
    pub set_restake: u64,
    pub lock_restake: u64,
    pub withdraw_staking_reward: u64,
    pub withdraw_policy_reward: u64,
    pub withdraw_tokens: u64,
    /// Extra gas for routing a call through a preallocation contract.
    pub preallocation_overhead: u64,
}

impl Default for GasSchedule {
    fn default() -> Self {
        Self {
            deposit: 250_000,
            divide_stake: 200_000,
            prolong_stake: 90_000,
            set_wind_down: 60_000,
            bond_worker: 120_000,
            set_restake: 50_000,
            lock_restake: 55_000,
            withdraw_staking_reward: 110_000,
            withdraw_policy_reward: 80_000,
            withdraw_tokens: 70_000,
            preallocation_overhead: 30_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn testnet_only_shortens_periods() {
        let main = StakingParams::mainnet_defaults();
        let test = StakingParams::testnet_defaults();
        assert_eq!(test.min_stake_duration, main.min_stake_duration);
        assert!(test.period_length_secs < main.period_length_secs);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let params: StakingParams = serde_json::from_str(r#"{"min_stake_duration": 10}"#).unwrap();
        assert_eq!(params.min_stake_duration, 10);
        assert_eq!(params.min_worker_periods, 2);
        assert_eq!(params.gas, GasSchedule::default());
    }
}
