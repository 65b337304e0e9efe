use stakeline_cache::CacheError;
use stakeline_engine::StageError;
use stakeline_types::StakingAddress;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Stage(#[from] StageError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("plan for {plan} cannot be submitted in a session for {session}")]
    PlanHolderMismatch {
        plan: StakingAddress,
        session: StakingAddress,
    },
}
