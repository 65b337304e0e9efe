//! Plain-text output for stake listings and publish reports.

use std::fmt::Write;

use stakeline_cache::HolderSnapshot;
use stakeline_periods::PeriodCalculator;
use stakeline_sequencer::{OperationOutcome, SequenceReport};
use stakeline_types::{HolderKind, Period, Stake, Timestamp};
use stakeline_utils::format_duration;

pub fn holder(
    snapshot: &HolderSnapshot,
    current: Period,
    periods: &PeriodCalculator,
    now: Timestamp,
) -> String {
    let state = &snapshot.state;
    let mut out = String::new();

    let _ = match &state.holder.kind {
        HolderKind::Direct => writeln!(out, "staker {}", state.holder.staking_address),
        HolderKind::Preallocation { beneficiary } => writeln!(
            out,
            "staker {} (preallocation, beneficiary {})",
            state.holder.staking_address, beneficiary
        ),
    };
    let _ = writeln!(
        out,
        "period {}  balance {}  staked {}",
        current.index(),
        state.balance,
        state.total_staked(current)
    );
    let _ = match &state.worker {
        Some(bond) => writeln!(out, "worker {} since period {}", bond.worker, bond.bonded_since.index()),
        None => writeln!(out, "worker none"),
    };
    let _ = match state.restake.lock_until {
        Some(lock) if state.restake.is_locked(current) => writeln!(
            out,
            "re-stake {} (locked until period {})",
            on_off(state.restake.enabled),
            lock.index()
        ),
        _ => writeln!(out, "re-stake {}", on_off(state.restake.enabled)),
    };
    let _ = writeln!(out, "wind-down {}", on_off(state.wind_down));
    let _ = writeln!(
        out,
        "rewards staking {}  policy {}",
        state.staking_reward, state.policy_reward
    );
    if let Some(unlocked) = state.unlocked_tokens {
        let _ = writeln!(out, "unlocked {unlocked}");
    }

    if state.stakes.is_empty() {
        let _ = writeln!(out, "no stakes");
    } else {
        let _ = writeln!(out, "stakes:");
        for stake in &state.stakes {
            let _ = writeln!(out, "  {}", stake_line(stake, current, periods, now));
        }
    }
    out
}

/// Projected stake records of a staged plan.
pub fn projected(stakes: &[Stake], current: Period, periods: &PeriodCalculator, now: Timestamp) -> String {
    let mut out = String::from("projected stakes:\n");
    for stake in stakes {
        let _ = writeln!(out, "  {}", stake_line(stake, current, periods, now));
    }
    out
}

fn stake_line(stake: &Stake, current: Period, periods: &PeriodCalculator, now: Timestamp) -> String {
    let span = format!(
        "#{} {} periods {}..{}",
        stake.index,
        stake.value,
        stake.start_period.index(),
        stake.end_period.index()
    );
    if !stake.is_active(current) {
        return format!("{span} expired");
    }
    match periods.secs_until(stake.end_period, now) {
        Ok(secs) => format!(
            "{span} {} periods left, unlocks in {}",
            stake.remaining_periods(current),
            format_duration(secs)
        ),
        Err(_) => format!("{span} {} periods left", stake.remaining_periods(current)),
    }
}

pub fn report(report: &SequenceReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "plan {}: {}/{} confirmed",
        report.plan.short(),
        report.confirmed_count(),
        report.receipts.len()
    );
    for r in &report.receipts {
        let status = match &r.outcome {
            OperationOutcome::Confirmed { receipt } => format!(
                "confirmed in block {} (tx {}, gas {})",
                receipt.block_number, receipt.tx_hash, receipt.gas_used
            ),
            OperationOutcome::Failed {
                tx_hash: Some(tx),
                reason,
            } => format!("failed (tx {tx}): {reason}"),
            OperationOutcome::Failed {
                tx_hash: None,
                reason,
            } => format!("failed before broadcast: {reason}"),
            OperationOutcome::TimedOut { tx_hash } => {
                format!("broadcast as {tx_hash}, not confirmed yet")
            }
            OperationOutcome::NotAttempted => "not attempted".to_string(),
        };
        let _ = writeln!(out, "  {}. {} {}", r.index + 1, r.method, status);
    }
    out
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}
