//! Staged transaction plans.

use serde::Serialize;
use std::fmt;

use stakeline_crypto::blake2b_256;
use stakeline_types::{ContractCall, Period, Stake, StakingAddress, UnsignedTransaction};

use crate::error::StageError;

/// Content id of a plan: Blake2b-256 over the bincode encoding of its
/// operations.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PlanId([u8; 32]);

impl PlanId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// First four bytes in hex, for log lines and prompts.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlanId({})", self.short())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanKind {
    Create,
    Divide,
    Prolong,
    WindDown,
    SetWorker,
    DetachWorker,
    Restake,
    CollectReward,
    WithdrawTokens,
}

impl PlanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Divide => "divide",
            Self::Prolong => "prolong",
            Self::WindDown => "winddown",
            Self::SetWorker => "set-worker",
            Self::DetachWorker => "detach-worker",
            Self::Restake => "restake",
            Self::CollectReward => "collect-reward",
            Self::WithdrawTokens => "withdraw-tokens",
        }
    }
}

impl fmt::Display for PlanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One atomic, independently confirmed transaction of a plan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlannedOperation {
    pub call: ContractCall,
    /// Account that must sign.
    pub signer: StakingAddress,
    pub estimated_gas: u64,
}

impl PlannedOperation {
    pub fn method(&self) -> &'static str {
        self.call.method()
    }

    /// Transaction to hand to the signer.
    pub fn to_unsigned(&self) -> UnsignedTransaction {
        UnsignedTransaction {
            from: self.signer.clone(),
            call: self.call.clone(),
            gas_limit: self.estimated_gas,
        }
    }
}

/// An immutable, reviewable sequence of operations.
///
/// Built only by the engine. Publishing consumes it; dropping it discards
/// the staged action with no side effect. Not `Clone`: a plan is published
/// at most once.
#[derive(Debug, Serialize)]
pub struct TransactionPlan {
    id: PlanId,
    kind: PlanKind,
    holder: StakingAddress,
    staged_at: Period,
    /// Generation of the snapshot the plan was validated against.
    generation: u64,
    operations: Vec<PlannedOperation>,
    projected: Vec<Stake>,
}

impl TransactionPlan {
    pub(crate) fn new(
        kind: PlanKind,
        holder: StakingAddress,
        staged_at: Period,
        operations: Vec<PlannedOperation>,
        projected: Vec<Stake>,
    ) -> Result<Self, StageError> {
        let encoded =
            bincode::serialize(&operations).map_err(|e| StageError::Encoding(e.to_string()))?;
        Ok(Self {
            id: PlanId(blake2b_256(&encoded)),
            kind,
            holder,
            staged_at,
            generation: 0,
            operations,
            projected,
        })
    }

    pub(crate) fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    pub fn id(&self) -> PlanId {
        self.id
    }

    pub fn kind(&self) -> PlanKind {
        self.kind
    }

    /// Staking address the plan acts on.
    pub fn holder(&self) -> &StakingAddress {
        &self.holder
    }

    pub fn staged_at(&self) -> Period {
        self.staged_at
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn operations(&self) -> &[PlannedOperation] {
        &self.operations
    }

    /// Stake records as they would read once every operation confirms.
    pub fn projected_stakes(&self) -> &[Stake] {
        &self.projected
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn total_gas(&self) -> u64 {
        self.operations
            .iter()
            .fold(0u64, |acc, op| acc.saturating_add(op.estimated_gas))
    }

    /// Consume the plan for publishing.
    pub fn into_operations(self) -> (PlanId, Vec<PlannedOperation>) {
        (self.id, self.operations)
    }
}

impl fmt::Display for TransactionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} plan {} for {} (staged at period {})",
            self.kind,
            self.id.short(),
            self.holder,
            self.staged_at
        )?;
        if self.operations.is_empty() {
            return writeln!(f, "  nothing to do");
        }
        for (i, op) in self.operations.iter().enumerate() {
            writeln!(
                f,
                "  {}. {}.{}{} signed by {} (gas ~{})",
                i + 1,
                op.call.contract,
                op.method(),
                op.call.call.args(),
                op.signer.short(),
                op.estimated_gas
            )?;
        }
        write!(f, "  estimated gas: {}", self.total_gas())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stakeline_types::{Contract, StakingCall};

    fn op(enabled: bool) -> PlannedOperation {
        PlannedOperation {
            call: ContractCall::new(Contract::StakingEscrow, StakingCall::SetWindDown { enabled }),
            signer: StakingAddress::from_bytes([1; 20]),
            estimated_gas: 60_000,
        }
    }

    fn plan(ops: Vec<PlannedOperation>) -> TransactionPlan {
        TransactionPlan::new(
            PlanKind::WindDown,
            StakingAddress::from_bytes([1; 20]),
            Period::new(7),
            ops,
            Vec::new(),
        )
        .unwrap()
    }

    #[test]
    fn id_depends_only_on_operations() {
        assert_eq!(plan(vec![op(true)]).id(), plan(vec![op(true)]).id());
        assert_ne!(plan(vec![op(true)]).id(), plan(vec![op(false)]).id());
    }

    #[test]
    fn total_gas_sums_operations() {
        let p = plan(vec![op(true), op(false)]);
        assert_eq!(p.total_gas(), 120_000);
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn unsigned_uses_signer_and_gas() {
        let tx = op(true).to_unsigned();
        assert_eq!(tx.from, StakingAddress::from_bytes([1; 20]));
        assert_eq!(tx.gas_limit, 60_000);
    }

    #[test]
    fn display_lists_operations() {
        let text = plan(vec![op(true)]).to_string();
        assert!(text.contains("setWindDown"));
        assert!(text.contains("winddown plan"));
    }
}
