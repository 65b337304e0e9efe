use std::sync::Arc;

use stakeline_cache::{HolderSnapshot, StakeLedgerCache};
use stakeline_ledger_client::LedgerClient;
use stakeline_periods::PeriodCalculator;
use stakeline_types::{Period, StakingAddress, StakingParams, Timestamp, TokenAmount};

use crate::error::StageError;
use crate::plan::TransactionPlan;
use crate::rules::Staging;

/// Validates stake actions against the cache and stages plans.
///
/// Every `stage_*` call takes the caller's notion of `now`, derives the
/// current period from it and refuses to stage against a snapshot that is
/// invalidated or older than that period.
pub struct StakeLifecycleEngine<L: LedgerClient + ?Sized> {
    cache: Arc<StakeLedgerCache<L>>,
    params: StakingParams,
    periods: PeriodCalculator,
}

impl<L: LedgerClient + ?Sized> StakeLifecycleEngine<L> {
    pub fn new(cache: Arc<StakeLedgerCache<L>>, params: StakingParams) -> Result<Self, StageError> {
        let periods = PeriodCalculator::from_params(&params)?;
        Ok(Self {
            cache,
            params,
            periods,
        })
    }

    pub fn params(&self) -> &StakingParams {
        &self.params
    }

    pub fn periods(&self) -> &PeriodCalculator {
        &self.periods
    }

    pub fn cache(&self) -> &Arc<StakeLedgerCache<L>> {
        &self.cache
    }

    pub fn current_period(&self, now: Timestamp) -> Result<Period, StageError> {
        Ok(self.periods.period_at(now)?)
    }

    fn staged<F>(
        &self,
        address: &StakingAddress,
        now: Timestamp,
        stage: F,
    ) -> Result<TransactionPlan, StageError>
    where
        F: FnOnce(&Staging<'_>) -> Result<TransactionPlan, StageError>,
    {
        let clock = self.current_period(now)?;
        let snapshot: Arc<HolderSnapshot> = self.cache.fresh_snapshot(address, clock)?;
        // The ledger may be ahead of the local clock; validate at the later period.
        let current = clock.max(snapshot.state.period);
        let plan = stage(&Staging::new(&snapshot.state, current, &self.params))?
            .with_generation(snapshot.generation);
        tracing::debug!(
            address = %address,
            plan = %plan.id().short(),
            kind = %plan.kind(),
            operations = plan.len(),
            gas = plan.total_gas(),
            "plan staged"
        );
        Ok(plan)
    }

    pub fn stage_create(
        &self,
        address: &StakingAddress,
        value: TokenAmount,
        duration: u64,
        now: Timestamp,
    ) -> Result<TransactionPlan, StageError> {
        self.staged(address, now, |s| s.create(value, duration))
    }

    pub fn stage_divide(
        &self,
        address: &StakingAddress,
        index: u32,
        target_value: TokenAmount,
        extra_periods: u64,
        now: Timestamp,
    ) -> Result<TransactionPlan, StageError> {
        self.staged(address, now, |s| s.divide(index, target_value, extra_periods))
    }

    pub fn stage_prolong(
        &self,
        address: &StakingAddress,
        index: u32,
        extra_periods: u64,
        now: Timestamp,
    ) -> Result<TransactionPlan, StageError> {
        self.staged(address, now, |s| s.prolong(index, extra_periods))
    }

    pub fn stage_winddown(
        &self,
        address: &StakingAddress,
        enable: bool,
        now: Timestamp,
    ) -> Result<TransactionPlan, StageError> {
        self.staged(address, now, |s| s.winddown(enable))
    }

    /// `worker = None` (or the null address) detaches.
    pub fn stage_set_worker(
        &self,
        address: &StakingAddress,
        worker: Option<StakingAddress>,
        now: Timestamp,
    ) -> Result<TransactionPlan, StageError> {
        self.staged(address, now, |s| s.set_worker(worker))
    }

    pub fn stage_detach_worker(
        &self,
        address: &StakingAddress,
        now: Timestamp,
    ) -> Result<TransactionPlan, StageError> {
        self.stage_set_worker(address, None, now)
    }

    pub fn stage_restake(
        &self,
        address: &StakingAddress,
        enable: bool,
        lock_until: Option<Period>,
        now: Timestamp,
    ) -> Result<TransactionPlan, StageError> {
        self.staged(address, now, |s| s.restake(enable, lock_until))
    }

    pub fn stage_collect_reward(
        &self,
        address: &StakingAddress,
        include_staking: bool,
        include_policy: bool,
        withdraw_address: Option<StakingAddress>,
        now: Timestamp,
    ) -> Result<TransactionPlan, StageError> {
        self.staged(address, now, |s| {
            s.collect_reward(include_staking, include_policy, withdraw_address)
        })
    }

    pub fn stage_withdraw_tokens(
        &self,
        address: &StakingAddress,
        amount: TokenAmount,
        now: Timestamp,
    ) -> Result<TransactionPlan, StageError> {
        self.staged(address, now, |s| s.withdraw_tokens(amount))
    }
}
