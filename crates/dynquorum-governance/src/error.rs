use dynquorum_types::TypesError;
use thiserror::Error;

/// Errors that can occur in governance operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GovernanceError {
    #[error("Invalid quorum parameters: {0}")]
    InvalidParameters(String),

    #[error("Arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),

    #[error("Checkpoint out of order: block {block} precedes latest checkpoint at {latest}")]
    CheckpointOutOfOrder { block: u64, latest: u64 },

    #[error("Invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("Proposal not found: {0}")]
    ProposalNotFound(u64),

    #[error("Already voted")]
    AlreadyVoted,

    #[error("Invalid vote support value: {0}")]
    InvalidVoteSupport(u8),

    #[error("Unknown proposal state: {0}")]
    UnknownProposalState(String),

    #[error(transparent)]
    Types(#[from] TypesError),
}
