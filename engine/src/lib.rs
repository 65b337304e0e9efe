//! Stake lifecycle engine.
//!
//! Every stake action is two-phase: a `stage_*` call validates the request
//! against a fresh cache snapshot and returns an immutable
//! [`TransactionPlan`]; publishing the plan is a separate step owned by the
//! sequencer. Staging never touches the ledger.

pub mod engine;
pub mod error;
pub mod plan;
pub mod rules;

pub use engine::StakeLifecycleEngine;
pub use error::StageError;
pub use plan::{PlanId, PlanKind, PlannedOperation, TransactionPlan};
pub use rules::Staging;
