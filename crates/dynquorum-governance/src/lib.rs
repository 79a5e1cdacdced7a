//! dynquorum governance - dynamic quorum engine.
//!
//! This crate provides:
//! - Dynamic quorum computation from against votes and supply
//! - Block-indexed quorum parameter checkpoints
//! - Proposal records and client-side state resolution
//! - An event indexer folding governor events into proposals

pub mod quorum;
pub mod params;
pub mod proposal;
pub mod indexer;
pub mod error;

pub use quorum::{dynamic_quorum_votes, DynamicQuorumParams, ProposalVoteSnapshot, COEFFICIENT_SCALE};
pub use params::{ParamsCheckpoint, QuorumParamsHistory};
pub use proposal::{resolve_state, ChainView, ProposalRecord, ProposalRegistry, ProposalState, ProposalStatus, VoteSupport};
pub use indexer::{GovernanceEvent, GovernanceIndexer, IndexedEvent};
pub use error::GovernanceError;
