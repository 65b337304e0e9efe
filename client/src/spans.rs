//! Pre-built [`tracing::Span`] constructors for staker operations.
//!
//! Consistent span names and fields make one staker's sync, stage and
//! submit events easy to correlate in logs.

use tracing::{info_span, Span};

/// Span covering one cache sync of a staker.
pub fn sync_span(address: &str) -> Span {
    info_span!("sync", address = %address)
}

/// Span covering the validation and staging of one action.
pub fn stage_span(address: &str, action: &str) -> Span {
    info_span!("stage", address = %address, action = %action)
}

/// Span covering the submission of one staged plan.
pub fn submit_span(address: &str, plan: &str) -> Span {
    info_span!("submit", address = %address, plan = %plan)
}
