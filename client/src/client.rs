use std::sync::Arc;
use std::time::Duration;

use stakeline_cache::StakeLedgerCache;
use stakeline_engine::StakeLifecycleEngine;
use stakeline_ledger_client::{LedgerClient, Signer};
use stakeline_sequencer::{Sequencer, DEFAULT_POLL_INTERVAL};
use stakeline_types::{Clock, StakeHolder, StakingParams, SystemClock, Timestamp};

use crate::error::ClientError;
use crate::session::HolderSession;

/// Default bound on each confirmation wait.
const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub params: StakingParams,
    pub confirmation_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            params: StakingParams::default(),
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Owns the cache, engine and sequencer for every staker it serves.
pub struct StakerClient<L: LedgerClient + ?Sized> {
    pub(crate) cache: Arc<StakeLedgerCache<L>>,
    pub(crate) engine: StakeLifecycleEngine<L>,
    pub(crate) sequencer: Sequencer<L>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) confirmation_timeout: Duration,
}

impl<L: LedgerClient + ?Sized> StakerClient<L> {
    pub fn new(
        ledger: Arc<L>,
        signer: Arc<dyn Signer>,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        let cache = Arc::new(StakeLedgerCache::new(ledger.clone()));
        let engine = StakeLifecycleEngine::new(cache.clone(), config.params)?;
        let sequencer = Sequencer::new(ledger, signer).with_poll_interval(config.poll_interval);
        Ok(Self {
            cache,
            engine,
            sequencer,
            clock: Arc::new(SystemClock),
            confirmation_timeout: config.confirmation_timeout,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn cache(&self) -> &Arc<StakeLedgerCache<L>> {
        &self.cache
    }

    pub fn engine(&self) -> &StakeLifecycleEngine<L> {
        &self.engine
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Open a session on `holder`, waiting for any other session on the
    /// same staking address to end.
    pub async fn holder(&self, holder: StakeHolder) -> HolderSession<'_, L> {
        let guard = self.cache.lock(&holder.staking_address).await;
        HolderSession::new(self, holder, guard)
    }
}
