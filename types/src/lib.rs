//! Fundamental types for the Stakeline staking client.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! addresses, token amounts, periods, timestamps, transaction hashes, staking
//! parameters, stake records and the staking-contract call model.

pub mod address;
pub mod amount;
pub mod contract;
pub mod error;
pub mod hash;
pub mod keys;
pub mod network;
pub mod params;
pub mod period;
pub mod stake;
pub mod time;
pub mod transaction;

pub use address::StakingAddress;
pub use amount::TokenAmount;
pub use contract::{Contract, ContractCall, StakingCall};
pub use error::TypesError;
pub use hash::TxHash;
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use network::NetworkId;
pub use params::{GasSchedule, StakingParams};
pub use period::Period;
pub use stake::{HolderKind, RestakeState, Stake, StakeHolder, WorkerBinding};
pub use time::{Clock, SystemClock, Timestamp};
pub use transaction::{ReceiptStatus, SignedTransaction, TransactionReceipt, UnsignedTransaction};
