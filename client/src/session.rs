use std::sync::Arc;

use tracing::Instrument;

use stakeline_cache::{AddressGuard, CacheError, Freshness, HolderSnapshot, StaleReason};
use stakeline_engine::{StageError, TransactionPlan};
use stakeline_ledger_client::LedgerClient;
use stakeline_sequencer::SequenceReport;
use stakeline_types::{Period, Stake, StakeHolder, StakingAddress, TokenAmount};

use crate::client::StakerClient;
use crate::error::ClientError;
use crate::spans::{stage_span, submit_span, sync_span};

/// Exclusive access to one staker.
///
/// Dropping the session releases the staker's operation lock.
pub struct HolderSession<'a, L: LedgerClient + ?Sized> {
    client: &'a StakerClient<L>,
    holder: StakeHolder,
    _guard: AddressGuard,
}

impl<'a, L: LedgerClient + ?Sized> HolderSession<'a, L> {
    pub(crate) fn new(client: &'a StakerClient<L>, holder: StakeHolder, guard: AddressGuard) -> Self {
        Self {
            client,
            holder,
            _guard: guard,
        }
    }

    pub fn holder(&self) -> &StakeHolder {
        &self.holder
    }

    fn address(&self) -> &StakingAddress {
        &self.holder.staking_address
    }

    pub async fn sync(&self) -> Result<Arc<HolderSnapshot>, ClientError> {
        let span = sync_span(self.address().as_str());
        let snapshot = self
            .client
            .cache
            .sync(&self.holder, self.client.now())
            .instrument(span)
            .await?;
        tracing::info!(
            address = %self.address(),
            period = %snapshot.state.period,
            stakes = snapshot.state.stakes.len(),
            "synced"
        );
        Ok(snapshot)
    }

    /// Last-synced snapshot and whether it is still fresh. Never syncs.
    pub fn snapshot(&self) -> Result<(Arc<HolderSnapshot>, Freshness), ClientError> {
        Ok(self.client.cache.snapshot(self.address())?)
    }

    pub fn list(&self) -> Result<Vec<Stake>, ClientError> {
        Ok(self.client.cache.list(self.address())?)
    }

    pub fn current_period(&self) -> Result<Period, ClientError> {
        Ok(self.client.engine.current_period(self.client.now())?)
    }

    fn stage<F>(&self, action: &str, stage: F) -> Result<TransactionPlan, ClientError>
    where
        F: FnOnce() -> Result<TransactionPlan, StageError>,
    {
        let span = stage_span(self.address().as_str(), action);
        let _enter = span.enter();
        stage().map_err(|e| {
            tracing::warn!(address = %self.address(), action, error = %e, "staging rejected");
            ClientError::from(e)
        })
    }

    pub fn stage_create(
        &self,
        value: TokenAmount,
        duration: u64,
    ) -> Result<TransactionPlan, ClientError> {
        let now = self.client.now();
        self.stage("create", || {
            self.client
                .engine
                .stage_create(self.address(), value, duration, now)
        })
    }

    pub fn stage_divide(
        &self,
        index: u32,
        target_value: TokenAmount,
        extra_periods: u64,
    ) -> Result<TransactionPlan, ClientError> {
        let now = self.client.now();
        self.stage("divide", || {
            self.client.engine.stage_divide(
                self.address(),
                index,
                target_value,
                extra_periods,
                now,
            )
        })
    }

    pub fn stage_prolong(
        &self,
        index: u32,
        extra_periods: u64,
    ) -> Result<TransactionPlan, ClientError> {
        let now = self.client.now();
        self.stage("prolong", || {
            self.client
                .engine
                .stage_prolong(self.address(), index, extra_periods, now)
        })
    }

    pub fn stage_winddown(&self, enable: bool) -> Result<TransactionPlan, ClientError> {
        let now = self.client.now();
        self.stage("winddown", || {
            self.client.engine.stage_winddown(self.address(), enable, now)
        })
    }

    pub fn stage_set_worker(
        &self,
        worker: Option<StakingAddress>,
    ) -> Result<TransactionPlan, ClientError> {
        let now = self.client.now();
        self.stage("set-worker", || {
            self.client
                .engine
                .stage_set_worker(self.address(), worker, now)
        })
    }

    pub fn stage_detach_worker(&self) -> Result<TransactionPlan, ClientError> {
        let now = self.client.now();
        self.stage("detach-worker", || {
            self.client.engine.stage_detach_worker(self.address(), now)
        })
    }

    pub fn stage_restake(
        &self,
        enable: bool,
        lock_until: Option<Period>,
    ) -> Result<TransactionPlan, ClientError> {
        let now = self.client.now();
        self.stage("restake", || {
            self.client
                .engine
                .stage_restake(self.address(), enable, lock_until, now)
        })
    }

    pub fn stage_collect_reward(
        &self,
        include_staking: bool,
        include_policy: bool,
        withdraw_address: Option<StakingAddress>,
    ) -> Result<TransactionPlan, ClientError> {
        let now = self.client.now();
        self.stage("collect-reward", || {
            self.client.engine.stage_collect_reward(
                self.address(),
                include_staking,
                include_policy,
                withdraw_address,
                now,
            )
        })
    }

    pub fn stage_withdraw_tokens(&self, amount: TokenAmount) -> Result<TransactionPlan, ClientError> {
        let now = self.client.now();
        self.stage("withdraw-tokens", || {
            self.client
                .engine
                .stage_withdraw_tokens(self.address(), amount, now)
        })
    }

    /// Publish `plan`, then re-sync so the next stage sees the outcome.
    ///
    /// The plan must have been staged from the snapshot the cache still
    /// holds; a plan staged before another submission or a period change
    /// is refused with a stale-cache error before anything is signed.
    ///
    /// The snapshot is invalidated before the first broadcast. If the
    /// re-sync fails it stays invalidated and the next stage call reports
    /// a stale cache.
    pub async fn submit(&self, plan: TransactionPlan) -> Result<SequenceReport, ClientError> {
        if plan.holder() != self.address() {
            return Err(ClientError::PlanHolderMismatch {
                plan: plan.holder().clone(),
                session: self.address().clone(),
            });
        }

        let current = self.current_period()?;
        let snapshot = self.client.cache.fresh_snapshot(self.address(), current)?;
        if snapshot.generation != plan.generation() {
            return Err(CacheError::StaleCache {
                address: self.address().clone(),
                reason: StaleReason::Superseded {
                    staged: plan.generation(),
                    current: snapshot.generation,
                },
            }
            .into());
        }

        let span = submit_span(self.address().as_str(), &plan.id().short());
        self.client.cache.invalidate(self.address());
        let report = self
            .client
            .sequencer
            .submit(plan, self.client.confirmation_timeout)
            .instrument(span.clone())
            .await;

        if let Err(e) = self
            .client
            .cache
            .sync(&self.holder, self.client.now())
            .instrument(span)
            .await
        {
            tracing::warn!(address = %self.address(), error = %e, "re-sync after submit failed");
        }
        Ok(report)
    }
}
