//! End-to-end staker flows against the in-memory ledger.

use std::sync::Arc;
use std::time::Duration;

use stakeline_cache::{CacheError, Freshness, StaleReason};
use stakeline_client::{ClientConfig, ClientError, StakerClient};
use stakeline_engine::{PlanKind, StageError};
use stakeline_nullables::{NullClock, NullLedger, NullSigner, SimStake};
use stakeline_sequencer::{OperationOutcome, SequencerError};
use stakeline_types::{
    Period, RestakeState, StakeHolder, StakingAddress, StakingParams, TokenAmount,
};

const PERIOD_SECS: u64 = 60;
const START: u64 = 400;

struct Harness {
    ledger: Arc<NullLedger>,
    clock: Arc<NullClock>,
    client: StakerClient<NullLedger>,
    staker: StakingAddress,
}

impl Harness {
    fn new(seed: u8) -> Self {
        let signer = NullSigner::from_seed([seed; 32]);
        let staker = signer.address();
        let ledger = Arc::new(NullLedger::new(Period::new(START)));
        let clock = Arc::new(NullClock::new(START * PERIOD_SECS + 1));
        let config = ClientConfig {
            params: StakingParams {
                period_length_secs: PERIOD_SECS,
                ..StakingParams::default()
            },
            confirmation_timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(5),
        };
        let client = StakerClient::new(ledger.clone(), Arc::new(signer), config)
            .unwrap()
            .with_clock(clock.clone());
        Self {
            ledger,
            clock,
            client,
            staker,
        }
    }

    fn direct(&self) -> StakeHolder {
        StakeHolder::direct(self.staker.clone())
    }

    fn advance(&self, periods: u64) {
        self.ledger.advance_periods(periods);
        self.clock.advance(periods * PERIOD_SECS);
    }
}

fn values_and_durations(stakes: &[stakeline_types::Stake]) -> Vec<(u128, u64)> {
    stakes.iter().map(|s| (s.value.raw(), s.duration())).collect()
}

#[tokio::test]
async fn create_then_divide() {
    let h = Harness::new(1);
    h.ledger.set_balance(&h.staker, TokenAmount::new(30_000));
    let session = h.client.holder(h.direct()).await;
    session.sync().await.unwrap();

    let plan = session.stage_create(TokenAmount::new(30_000), 90).unwrap();
    assert_eq!(plan.len(), 1);
    assert_eq!(
        plan.operations()[0].call.call.value(),
        Some(TokenAmount::new(30_000))
    );
    session.submit(plan).await.unwrap().into_result().unwrap();

    let stakes = session.list().unwrap();
    assert_eq!(values_and_durations(&stakes), vec![(30_000, 90)]);

    let plan = session
        .stage_divide(0, TokenAmount::new(15_000), 30)
        .unwrap();
    let projected = values_and_durations(plan.projected_stakes());
    session.submit(plan).await.unwrap().into_result().unwrap();

    let stakes = session.list().unwrap();
    assert_eq!(
        values_and_durations(&stakes),
        vec![(15_000, 90), (15_000, 120)]
    );
    assert_eq!(values_and_durations(&stakes), projected);
    assert_eq!(h.ledger.balance(&h.staker), TokenAmount::ZERO);
}

#[tokio::test]
async fn submit_resyncs_snapshot() {
    let h = Harness::new(2);
    h.ledger.set_balance(&h.staker, TokenAmount::new(1_000));
    let session = h.client.holder(h.direct()).await;
    let before = session.sync().await.unwrap();

    let plan = session.stage_winddown(true).unwrap();
    session.submit(plan).await.unwrap();

    let (after, freshness) = session.snapshot().unwrap();
    assert_eq!(freshness, Freshness::Fresh);
    assert!(after.generation > before.generation);
    assert!(after.state.wind_down);
}

#[tokio::test]
async fn discarded_plan_changes_nothing() {
    let h = Harness::new(3);
    h.ledger.set_balance(&h.staker, TokenAmount::new(500));
    h.ledger
        .add_stake(&h.staker, SimStake::new(TokenAmount::new(100), 390, 450));
    let session = h.client.holder(h.direct()).await;
    session.sync().await.unwrap();
    let (before, _) = session.snapshot().unwrap();

    let plan = session.stage_prolong(0, 25).unwrap();
    drop(plan);

    let (after, freshness) = session.snapshot().unwrap();
    assert_eq!(freshness, Freshness::Fresh);
    assert_eq!(after.state, before.state);
    assert_eq!(h.ledger.submission_count(), 0);
    assert_eq!(
        h.ledger.stakes(&h.staker),
        vec![SimStake::new(TokenAmount::new(100), 390, 450)]
    );
}

#[tokio::test]
async fn plan_staged_before_another_submit_is_refused() {
    let h = Harness::new(12);
    h.ledger.set_balance(&h.staker, TokenAmount::new(1_000));
    let session = h.client.holder(h.direct()).await;
    session.sync().await.unwrap();

    let first = session.stage_create(TokenAmount::new(400), 30).unwrap();
    let second = session.stage_create(TokenAmount::new(400), 30).unwrap();
    assert!(session.submit(first).await.unwrap().is_complete());

    let err = session.submit(second).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Cache(CacheError::StaleCache {
            reason: StaleReason::Superseded { .. },
            ..
        })
    ));
    assert_eq!(h.ledger.submission_count(), 1);
    assert_eq!(h.ledger.stakes(&h.staker).len(), 1);
    assert_eq!(h.ledger.balance(&h.staker), TokenAmount::new(600));
}

#[tokio::test]
async fn plan_from_previous_period_is_refused() {
    let h = Harness::new(13);
    h.ledger.set_balance(&h.staker, TokenAmount::new(1_000));
    let session = h.client.holder(h.direct()).await;
    session.sync().await.unwrap();
    let plan = session.stage_winddown(true).unwrap();

    h.advance(1);
    let err = session.submit(plan).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Cache(CacheError::StaleCache {
            reason: StaleReason::PeriodAdvanced { .. },
            ..
        })
    ));
    assert_eq!(h.ledger.submission_count(), 0);
}

#[tokio::test]
async fn terminal_stake_does_not_block_sync() {
    let h = Harness::new(14);
    h.ledger.set_balance(&h.staker, TokenAmount::new(1_000));
    h.ledger
        .add_stake(&h.staker, SimStake::new(TokenAmount::ZERO, 10, 50));
    let session = h.client.holder(h.direct()).await;
    let snapshot = session.sync().await.unwrap();
    assert_eq!(snapshot.state.stakes.len(), 1);
    assert!(snapshot.state.stakes[0].value.is_zero());

    let err = session.stage_prolong(0, 10).unwrap_err();
    assert!(matches!(
        err,
        ClientError::Stage(StageError::StakeExpired { index: 0, .. })
    ));

    let plan = session.stage_create(TokenAmount::new(500), 30).unwrap();
    assert_eq!(plan.projected_stakes()[1].index, 1);
    session.submit(plan).await.unwrap().into_result().unwrap();
    assert_eq!(session.list().unwrap().len(), 2);
}

#[tokio::test]
async fn new_period_requires_sync() {
    let h = Harness::new(4);
    h.ledger.set_balance(&h.staker, TokenAmount::new(500));
    let session = h.client.holder(h.direct()).await;
    session.sync().await.unwrap();

    h.advance(1);
    let err = session.stage_create(TokenAmount::new(100), 30).unwrap_err();
    assert!(matches!(err, ClientError::Stage(ref e) if e.needs_sync()));

    session.sync().await.unwrap();
    let plan = session.stage_create(TokenAmount::new(100), 30).unwrap();
    assert_eq!(plan.staged_at(), Period::new(START + 1));
}

#[tokio::test]
async fn restake_lock_blocks_disable() {
    let h = Harness::new(5);
    h.ledger.set_restake(
        &h.staker,
        RestakeState {
            enabled: true,
            lock_until: Some(Period::new(500)),
        },
    );
    let session = h.client.holder(h.direct()).await;
    session.sync().await.unwrap();

    let err = session.stage_restake(false, None).unwrap_err();
    assert!(matches!(
        err,
        ClientError::Stage(StageError::ReStakeLocked { .. })
    ));
}

#[tokio::test]
async fn worker_cooldown_then_rebond() {
    let h = Harness::new(6);
    let first = StakingAddress::from_bytes([0xaa; 20]);
    let second = StakingAddress::from_bytes([0xbb; 20]);
    let session = h.client.holder(h.direct()).await;
    session.sync().await.unwrap();

    let plan = session.stage_set_worker(Some(first.clone())).unwrap();
    session.submit(plan).await.unwrap().into_result().unwrap();

    let err = session.stage_set_worker(Some(second.clone())).unwrap_err();
    assert!(matches!(
        err,
        ClientError::Stage(StageError::WorkerAlreadyBonded { .. })
    ));

    h.advance(2);
    session.sync().await.unwrap();
    let plan = session.stage_set_worker(Some(second.clone())).unwrap();
    session.submit(plan).await.unwrap().into_result().unwrap();
    let (snapshot, _) = session.snapshot().unwrap();
    assert_eq!(snapshot.state.worker.as_ref().map(|b| &b.worker), Some(&second));

    h.advance(2);
    session.sync().await.unwrap();
    let plan = session.stage_detach_worker().unwrap();
    assert_eq!(plan.kind(), PlanKind::DetachWorker);
    session.submit(plan).await.unwrap().into_result().unwrap();
    assert!(session.snapshot().unwrap().0.state.worker.is_none());
}

#[tokio::test]
async fn partial_failure_keeps_confirmed_prefix() {
    let h = Harness::new(7);
    h.ledger.revert_method("lockReStake", "paused");
    let session = h.client.holder(h.direct()).await;
    session.sync().await.unwrap();

    let plan = session
        .stage_restake(true, Some(Period::new(START + 50)))
        .unwrap();
    let report = session.submit(plan).await.unwrap();
    assert!(matches!(
        report.receipts[1].outcome,
        OperationOutcome::Failed { .. }
    ));
    assert!(matches!(
        report.into_result(),
        Err(SequencerError::PartialSequenceFailure {
            confirmed: 1,
            failed_index: 1,
            ..
        })
    ));
    assert_eq!(h.ledger.submission_count(), 2);

    let (snapshot, freshness) = session.snapshot().unwrap();
    assert_eq!(freshness, Freshness::Fresh);
    assert!(snapshot.state.restake.enabled);
    assert_eq!(snapshot.state.restake.lock_until, None);
}

#[tokio::test]
async fn collect_rewards_to_other_address() {
    let h = Harness::new(8);
    let payout = StakingAddress::from_bytes([0xcc; 20]);
    h.ledger
        .set_rewards(&h.staker, TokenAmount::new(70), TokenAmount::new(30));
    let session = h.client.holder(h.direct()).await;
    session.sync().await.unwrap();

    let plan = session
        .stage_collect_reward(true, true, Some(payout.clone()))
        .unwrap();
    assert_eq!(plan.len(), 2);
    session.submit(plan).await.unwrap().into_result().unwrap();

    assert_eq!(h.ledger.balance(&h.staker), TokenAmount::new(70));
    assert_eq!(h.ledger.balance(&payout), TokenAmount::new(30));
    let plan = session.stage_collect_reward(true, true, None).unwrap();
    assert!(plan.is_empty());
}

#[tokio::test]
async fn preallocation_flow() {
    let h = Harness::new(9);
    let contract = StakingAddress::from_bytes([0x77; 20]);
    h.ledger
        .add_preallocation(&contract, &h.staker, TokenAmount::new(400));
    h.ledger.set_balance(&contract, TokenAmount::new(5_000));
    let holder = StakeHolder::preallocation(contract.clone(), h.staker.clone());
    let session = h.client.holder(holder).await;
    session.sync().await.unwrap();

    let plan = session.stage_create(TokenAmount::new(4_000), 60).unwrap();
    assert_eq!(plan.operations()[0].method(), "depositAsStaker");
    session.submit(plan).await.unwrap().into_result().unwrap();
    assert_eq!(h.ledger.stakes(&contract).len(), 1);

    let plan = session.stage_withdraw_tokens(TokenAmount::new(400)).unwrap();
    session.submit(plan).await.unwrap().into_result().unwrap();
    assert_eq!(h.ledger.balance(&h.staker), TokenAmount::new(400));
    assert_eq!(h.ledger.balance(&contract), TokenAmount::new(600));
}

#[tokio::test]
async fn plan_for_another_holder_is_refused() {
    let h = Harness::new(10);
    let other = StakingAddress::from_bytes([0x42; 20]);
    let plan = {
        let session = h.client.holder(StakeHolder::direct(other.clone())).await;
        session.sync().await.unwrap();
        session.stage_winddown(true).unwrap()
    };
    let session = h.client.holder(h.direct()).await;
    let err = session.submit(plan).await.unwrap_err();
    assert!(matches!(err, ClientError::PlanHolderMismatch { .. }));
    assert_eq!(h.ledger.submission_count(), 0);
}

#[tokio::test]
async fn sessions_serialize_per_address() {
    let h = Harness::new(11);
    let session = h.client.holder(h.direct()).await;

    let same = tokio::time::timeout(Duration::from_millis(50), h.client.holder(h.direct())).await;
    assert!(same.is_err(), "second session on the same staker must wait");

    let other = StakeHolder::direct(StakingAddress::from_bytes([0x55; 20]));
    let other_session =
        tokio::time::timeout(Duration::from_millis(50), h.client.holder(other)).await;
    assert!(other_session.is_ok());

    drop(session);
    let again = tokio::time::timeout(Duration::from_millis(50), h.client.holder(h.direct())).await;
    assert!(again.is_ok());
}
