//! Validation rules for each stake action, evaluated against one holder
//! snapshot at one period.
//!
//! Nothing here performs I/O; [`StakeLifecycleEngine`](crate::StakeLifecycleEngine)
//! supplies the snapshot and current period.

use stakeline_ledger_client::HolderState;
use stakeline_types::{
    Contract, ContractCall, Period, Stake, StakeHolder, StakingAddress, StakingCall,
    StakingParams, TokenAmount,
};

use crate::error::StageError;
use crate::plan::{PlanKind, PlannedOperation, TransactionPlan};

/// A holder snapshot paired with the period and constants to validate at.
pub struct Staging<'a> {
    state: &'a HolderState,
    current: Period,
    params: &'a StakingParams,
}

impl<'a> Staging<'a> {
    pub fn new(state: &'a HolderState, current: Period, params: &'a StakingParams) -> Self {
        Self {
            state,
            current,
            params,
        }
    }

    fn holder(&self) -> &StakeHolder {
        &self.state.holder
    }

    /// Route `call` to the escrow or through the holder's preallocation
    /// contract, signed by whoever signs for the holder.
    fn operation(&self, call: StakingCall) -> PlannedOperation {
        let holder = self.holder();
        let mut estimated_gas = call.estimated_gas(&self.params.gas);
        let contract = if holder.is_preallocation() {
            estimated_gas = estimated_gas.saturating_add(self.params.gas.preallocation_overhead);
            Contract::Preallocation(holder.staking_address.clone())
        } else {
            call.direct_contract()
        };
        PlannedOperation {
            call: ContractCall::new(contract, call),
            signer: holder.signer().clone(),
            estimated_gas,
        }
    }

    fn plan(
        &self,
        kind: PlanKind,
        operations: Vec<PlannedOperation>,
        projected: Vec<Stake>,
    ) -> Result<TransactionPlan, StageError> {
        TransactionPlan::new(
            kind,
            self.holder().staking_address.clone(),
            self.current,
            operations,
            projected,
        )
    }

    /// One past the highest index on record; indices are never reused.
    fn next_index(&self) -> Result<u32, StageError> {
        match self.state.stakes.iter().map(|s| s.index).max() {
            Some(last) => last.checked_add(1).ok_or(StageError::Overflow),
            None => Ok(0),
        }
    }

    fn active_stake(&self, index: u32) -> Result<&'a Stake, StageError> {
        let stake = self
            .state
            .stake(index)
            .ok_or(StageError::StakeNotFound(index))?;
        if !stake.is_active(self.current) {
            return Err(StageError::StakeExpired {
                index,
                end_period: stake.end_period,
            });
        }
        Ok(stake)
    }

    pub fn create(&self, value: TokenAmount, duration: u64) -> Result<TransactionPlan, StageError> {
        if value.is_zero() {
            return Err(StageError::ZeroValue);
        }
        if duration < self.params.min_stake_duration {
            return Err(StageError::DurationTooShort {
                requested: duration,
                minimum: self.params.min_stake_duration,
            });
        }
        if value > self.state.balance {
            return Err(StageError::InsufficientBalance {
                needed: value,
                available: self.state.balance,
            });
        }

        // A deposit starts locking from the next period.
        let start_period = self.current.next();
        let end_period = start_period
            .checked_add(duration)
            .ok_or(StageError::Overflow)?;

        let mut projected = self.state.stakes.clone();
        projected.push(Stake {
            staker: self.holder().staking_address.clone(),
            worker: self.state.worker.as_ref().map(|b| b.worker.clone()),
            index: self.next_index()?,
            value,
            start_period,
            end_period,
            restaking: self.state.restake.enabled,
            restake_lock_until: self.state.restake.lock_until,
        });

        let op = self.operation(StakingCall::Deposit {
            value,
            periods: duration,
        });
        self.plan(PlanKind::Create, vec![op], projected)
    }

    pub fn divide(
        &self,
        index: u32,
        target_value: TokenAmount,
        extra_periods: u64,
    ) -> Result<TransactionPlan, StageError> {
        let stake = self.active_stake(index)?;
        if target_value.is_zero() || target_value >= stake.value {
            return Err(StageError::InvalidTargetValue {
                target: target_value,
                stake_value: stake.value,
            });
        }
        if extra_periods == 0 {
            return Err(StageError::NonPositiveExtension);
        }

        let remaining = stake
            .value
            .checked_sub(target_value)
            .ok_or(StageError::Overflow)?;
        let new_end = stake
            .end_period
            .checked_add(extra_periods)
            .ok_or(StageError::Overflow)?;

        let mut projected = self.state.stakes.clone();
        for s in projected.iter_mut().filter(|s| s.index == index) {
            s.value = remaining;
        }
        projected.push(Stake {
            index: self.next_index()?,
            value: target_value,
            end_period: new_end,
            ..stake.clone()
        });

        let op = self.operation(StakingCall::DivideStake {
            index,
            target_value,
            extra_periods,
        });
        self.plan(PlanKind::Divide, vec![op], projected)
    }

    pub fn prolong(&self, index: u32, extra_periods: u64) -> Result<TransactionPlan, StageError> {
        let stake = self.active_stake(index)?;
        if extra_periods == 0 {
            return Err(StageError::NonPositiveExtension);
        }
        let new_end = stake
            .end_period
            .checked_add(extra_periods)
            .ok_or(StageError::Overflow)?;

        let mut projected = self.state.stakes.clone();
        for s in projected.iter_mut().filter(|s| s.index == index) {
            s.end_period = new_end;
        }

        let op = self.operation(StakingCall::ProlongStake {
            index,
            periods: extra_periods,
        });
        self.plan(PlanKind::Prolong, vec![op], projected)
    }

    pub fn winddown(&self, enable: bool) -> Result<TransactionPlan, StageError> {
        let op = self.operation(StakingCall::SetWindDown { enabled: enable });
        self.plan(PlanKind::WindDown, vec![op], self.state.stakes.clone())
    }

    /// Bond `worker`, or detach the current worker when `worker` is `None`
    /// or the null address.
    pub fn set_worker(&self, worker: Option<StakingAddress>) -> Result<TransactionPlan, StageError> {
        let worker = worker.filter(|w| !w.is_null());
        let min = self.params.min_worker_periods;

        match (&self.state.worker, &worker) {
            (None, None) => return Err(StageError::NoWorkerBonded),
            (Some(bond), Some(requested)) if &bond.worker == requested => {
                return Err(StageError::WorkerUnchanged(requested.clone()));
            }
            (Some(bond), _) if !bond.cooldown_elapsed(self.current, min) => {
                return Err(StageError::WorkerAlreadyBonded {
                    worker: bond.worker.clone(),
                    bonded_since: bond.bonded_since,
                    available_at: bond
                        .bonded_since
                        .checked_add(min)
                        .ok_or(StageError::Overflow)?,
                });
            }
            _ => {}
        }

        let kind = if worker.is_some() {
            PlanKind::SetWorker
        } else {
            PlanKind::DetachWorker
        };
        let projected = self
            .state
            .stakes
            .iter()
            .cloned()
            .map(|s| Stake {
                worker: worker.clone(),
                ..s
            })
            .collect();
        let op = self.operation(StakingCall::BondWorker { worker });
        self.plan(kind, vec![op], projected)
    }

    pub fn restake(
        &self,
        enable: bool,
        lock_until: Option<Period>,
    ) -> Result<TransactionPlan, StageError> {
        let restake = &self.state.restake;
        if !enable && restake.is_locked(self.current) {
            return Err(StageError::ReStakeLocked {
                lock_until: restake.lock_until.unwrap_or(self.current),
                current: self.current,
            });
        }
        if let Some(lock) = lock_until {
            if !enable || lock <= self.current {
                return Err(StageError::InvalidLockPeriod {
                    lock_until: lock,
                    current: self.current,
                });
            }
        }

        let mut operations = vec![self.operation(StakingCall::SetReStake { enabled: enable })];
        if let Some(until) = lock_until {
            operations.push(self.operation(StakingCall::LockReStake { until }));
        }

        let lock = lock_until.or(restake.lock_until);
        let projected = self
            .state
            .stakes
            .iter()
            .cloned()
            .map(|s| Stake {
                restaking: enable,
                restake_lock_until: lock,
                ..s
            })
            .collect();
        self.plan(PlanKind::Restake, operations, projected)
    }

    /// Withdraw claimable rewards. Components with nothing to claim are
    /// left out, so the plan may be empty.
    pub fn collect_reward(
        &self,
        include_staking: bool,
        include_policy: bool,
        withdraw_address: Option<StakingAddress>,
    ) -> Result<TransactionPlan, StageError> {
        let holder = self.holder();
        let own = holder.staking_address.clone();
        let to = match withdraw_address {
            Some(requested) if holder.is_preallocation() && requested != own => {
                return Err(StageError::InvalidWithdrawAddress {
                    requested,
                    required: own,
                });
            }
            Some(requested) => requested,
            None => own,
        };

        let mut operations = Vec::with_capacity(2);
        if include_staking && !self.state.staking_reward.is_zero() {
            operations.push(self.operation(StakingCall::WithdrawStakingReward {
                amount: self.state.staking_reward,
            }));
        }
        if include_policy && !self.state.policy_reward.is_zero() {
            operations.push(self.operation(StakingCall::WithdrawPolicyReward { to }));
        }
        self.plan(PlanKind::CollectReward, operations, self.state.stakes.clone())
    }

    /// Release unlocked tokens from a preallocation contract to its
    /// beneficiary.
    pub fn withdraw_tokens(&self, amount: TokenAmount) -> Result<TransactionPlan, StageError> {
        let holder = self.holder();
        let unlocked = match self.state.unlocked_tokens {
            Some(unlocked) if holder.is_preallocation() => unlocked,
            _ => return Err(StageError::NotPreallocation(holder.staking_address.clone())),
        };
        if amount.is_zero() {
            return Err(StageError::ZeroValue);
        }
        if amount > unlocked {
            return Err(StageError::InsufficientBalance {
                needed: amount,
                available: unlocked,
            });
        }
        let op = self.operation(StakingCall::WithdrawTokens { amount });
        self.plan(PlanKind::WithdrawTokens, vec![op], self.state.stakes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stakeline_types::{RestakeState, WorkerBinding};

    fn addr(n: u8) -> StakingAddress {
        StakingAddress::from_bytes([n; 20])
    }

    fn stake(index: u32, value: u128, start: u64, end: u64) -> Stake {
        Stake {
            staker: addr(1),
            worker: None,
            index,
            value: TokenAmount::new(value),
            start_period: Period::new(start),
            end_period: Period::new(end),
            restaking: false,
            restake_lock_until: None,
        }
    }

    fn state(holder: StakeHolder, stakes: Vec<Stake>) -> HolderState {
        HolderState {
            holder,
            period: Period::new(100),
            stakes,
            balance: TokenAmount::new(30_000),
            worker: None,
            restake: RestakeState::default(),
            wind_down: false,
            staking_reward: TokenAmount::ZERO,
            policy_reward: TokenAmount::ZERO,
            unlocked_tokens: None,
        }
    }

    fn direct(stakes: Vec<Stake>) -> HolderState {
        state(StakeHolder::direct(addr(1)), stakes)
    }

    fn prealloc(stakes: Vec<Stake>) -> HolderState {
        let mut s = state(StakeHolder::preallocation(addr(1), addr(7)), stakes);
        s.unlocked_tokens = Some(TokenAmount::new(500));
        s
    }

    fn at<'a>(state: &'a HolderState, params: &'a StakingParams) -> Staging<'a> {
        Staging::new(state, Period::new(100), params)
    }

    #[test]
    fn create_projects_from_next_period() {
        let params = StakingParams::default();
        let st = direct(vec![]);
        let plan = at(&st, &params).create(TokenAmount::new(30_000), 90).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.operations()[0].call.call.value(), Some(TokenAmount::new(30_000)));
        assert_eq!(plan.operations()[0].method(), "deposit");
        let new = &plan.projected_stakes()[0];
        assert_eq!(new.start_period, Period::new(101));
        assert_eq!(new.end_period, Period::new(191));
        assert_eq!(new.duration(), 90);
    }

    #[test]
    fn new_stake_index_follows_highest_on_record() {
        let params = StakingParams::default();
        let st = direct(vec![stake(0, 100, 90, 150), stake(4, 100, 90, 160)]);
        let plan = at(&st, &params).create(TokenAmount::new(1_000), 30).unwrap();
        assert_eq!(plan.projected_stakes().last().unwrap().index, 5);

        let full = direct(vec![stake(u32::MAX, 100, 90, 150)]);
        assert_eq!(
            at(&full, &params).create(TokenAmount::new(1_000), 30).unwrap_err(),
            StageError::Overflow
        );
    }

    #[test]
    fn create_validation_order() {
        let params = StakingParams::default();
        let st = direct(vec![]);
        let s = at(&st, &params);
        assert_eq!(s.create(TokenAmount::ZERO, 10).unwrap_err(), StageError::ZeroValue);
        assert!(matches!(
            s.create(TokenAmount::new(1), 29).unwrap_err(),
            StageError::DurationTooShort { requested: 29, minimum: 30 }
        ));
        assert!(matches!(
            s.create(TokenAmount::new(30_001), 30).unwrap_err(),
            StageError::InsufficientBalance { .. }
        ));
    }

    #[test]
    fn divide_scenario() {
        let params = StakingParams::default();
        let st = direct(vec![stake(0, 30_000, 101, 191)]);
        let plan = at(&st, &params)
            .divide(0, TokenAmount::new(15_000), 30)
            .unwrap();
        let p = plan.projected_stakes();
        assert_eq!((p[0].value.raw(), p[0].duration()), (15_000, 90));
        assert_eq!((p[1].value.raw(), p[1].duration()), (15_000, 120));
        assert_eq!(p[1].index, 1);
    }

    #[test]
    fn divide_rejections() {
        let params = StakingParams::default();
        let st = direct(vec![stake(0, 100, 50, 150), stake(1, 100, 10, 90)]);
        let s = at(&st, &params);
        assert_eq!(s.divide(5, TokenAmount::new(1), 1).unwrap_err(), StageError::StakeNotFound(5));
        assert!(matches!(s.divide(1, TokenAmount::new(1), 1).unwrap_err(), StageError::StakeExpired { .. }));
        assert!(matches!(s.divide(0, TokenAmount::new(100), 1).unwrap_err(), StageError::InvalidTargetValue { .. }));
        assert!(matches!(s.divide(0, TokenAmount::ZERO, 1).unwrap_err(), StageError::InvalidTargetValue { .. }));
        assert_eq!(s.divide(0, TokenAmount::new(10), 0).unwrap_err(), StageError::NonPositiveExtension);
    }

    #[test]
    fn prolong_extends_end_only() {
        let params = StakingParams::default();
        let st = direct(vec![stake(0, 100, 50, 150)]);
        let plan = at(&st, &params).prolong(0, 10).unwrap();
        let p = &plan.projected_stakes()[0];
        assert_eq!(p.end_period, Period::new(160));
        assert_eq!(p.value, TokenAmount::new(100));
        assert_eq!(at(&st, &params).prolong(0, 0).unwrap_err(), StageError::NonPositiveExtension);
    }

    #[test]
    fn worker_rules() {
        let params = StakingParams::default();
        let mut st = direct(vec![stake(0, 100, 50, 150)]);
        assert_eq!(at(&st, &params).set_worker(None).unwrap_err(), StageError::NoWorkerBonded);
        assert_eq!(
            at(&st, &params).set_worker(Some(addr(9))).unwrap().kind(),
            PlanKind::SetWorker
        );

        st.worker = Some(WorkerBinding {
            worker: addr(9),
            bonded_since: Period::new(99),
        });
        assert_eq!(
            at(&st, &params).set_worker(Some(addr(9))).unwrap_err(),
            StageError::WorkerUnchanged(addr(9))
        );
        assert!(matches!(
            at(&st, &params).set_worker(Some(addr(8))).unwrap_err(),
            StageError::WorkerAlreadyBonded { available_at, .. } if available_at == Period::new(101)
        ));
        assert!(matches!(
            at(&st, &params).set_worker(Some(StakingAddress::null())).unwrap_err(),
            StageError::WorkerAlreadyBonded { .. }
        ));

        st.worker = Some(WorkerBinding {
            worker: addr(9),
            bonded_since: Period::new(98),
        });
        let plan = at(&st, &params).set_worker(None).unwrap();
        assert_eq!(plan.kind(), PlanKind::DetachWorker);
        assert_eq!(plan.projected_stakes()[0].worker, None);
    }

    #[test]
    fn restake_locked_scenario() {
        let params = StakingParams::default();
        let mut st = direct(vec![]);
        st.restake = RestakeState {
            enabled: true,
            lock_until: Some(Period::new(500)),
        };
        let s = Staging::new(&st, Period::new(400), &params);
        assert_eq!(
            s.restake(false, None).unwrap_err(),
            StageError::ReStakeLocked {
                lock_until: Period::new(500),
                current: Period::new(400)
            }
        );
        let s = Staging::new(&st, Period::new(500), &params);
        assert!(s.restake(false, None).is_ok());
    }

    #[test]
    fn restake_with_lock_is_two_operations() {
        let params = StakingParams::default();
        let st = direct(vec![stake(0, 100, 50, 150)]);
        let s = at(&st, &params);
        let plan = s.restake(true, Some(Period::new(300))).unwrap();
        let methods: Vec<_> = plan.operations().iter().map(|o| o.method()).collect();
        assert_eq!(methods, vec!["setReStake", "lockReStake"]);
        assert_eq!(plan.projected_stakes()[0].restake_lock_until, Some(Period::new(300)));
        assert!(matches!(s.restake(true, Some(Period::new(100))).unwrap_err(), StageError::InvalidLockPeriod { .. }));
        assert!(matches!(s.restake(false, Some(Period::new(300))).unwrap_err(), StageError::InvalidLockPeriod { .. }));
    }

    #[test]
    fn collect_reward_skips_empty_components() {
        let params = StakingParams::default();
        let mut st = direct(vec![]);
        assert!(at(&st, &params).collect_reward(true, true, None).unwrap().is_empty());

        st.staking_reward = TokenAmount::new(40);
        st.policy_reward = TokenAmount::new(7);
        let plan = at(&st, &params).collect_reward(true, true, Some(addr(3))).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.operations()[0].call.contract, Contract::StakingEscrow);
        assert_eq!(plan.operations()[1].call.contract, Contract::PolicyManager);
        assert_eq!(
            plan.operations()[1].call.call,
            StakingCall::WithdrawPolicyReward { to: addr(3) }
        );
        assert_eq!(at(&st, &params).collect_reward(false, true, None).unwrap().len(), 1);
    }

    #[test]
    fn preallocation_routes_through_contract() {
        let params = StakingParams::default();
        let mut st = prealloc(vec![]);
        st.policy_reward = TokenAmount::new(5);
        let s = at(&st, &params);

        let plan = s.create(TokenAmount::new(1_000), 30).unwrap();
        let op = &plan.operations()[0];
        assert_eq!(op.method(), "depositAsStaker");
        assert_eq!(op.signer, addr(7));
        assert_eq!(op.call.contract, Contract::Preallocation(addr(1)));
        assert_eq!(
            op.estimated_gas,
            params.gas.deposit + params.gas.preallocation_overhead
        );

        assert!(matches!(
            s.collect_reward(false, true, Some(addr(3))).unwrap_err(),
            StageError::InvalidWithdrawAddress { .. }
        ));
        let plan = s.collect_reward(false, true, Some(addr(1))).unwrap();
        assert_eq!(plan.operations()[0].method(), "withdrawPolicyReward");
    }

    #[test]
    fn withdraw_tokens_rules() {
        let params = StakingParams::default();
        let st = direct(vec![]);
        assert_eq!(
            at(&st, &params).withdraw_tokens(TokenAmount::new(1)).unwrap_err(),
            StageError::NotPreallocation(addr(1))
        );
        let st = prealloc(vec![]);
        let s = at(&st, &params);
        assert_eq!(s.withdraw_tokens(TokenAmount::ZERO).unwrap_err(), StageError::ZeroValue);
        assert!(matches!(s.withdraw_tokens(TokenAmount::new(501)).unwrap_err(), StageError::InsufficientBalance { .. }));
        assert_eq!(s.withdraw_tokens(TokenAmount::new(500)).unwrap().operations()[0].method(), "withdrawTokens");
    }
}
