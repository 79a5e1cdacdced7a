//! Block-indexed history of dynamic quorum parameters.
//!
//! Every parameter change writes a checkpoint; a proposal's quorum uses the
//! parameters in force at its creation block.

use dynquorum_types::{BlockNumber, Bps, U256};
use tracing::debug;
use crate::error::GovernanceError;
use crate::quorum::DynamicQuorumParams;

/// Parameters in force from `from_block` onwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamsCheckpoint {
    pub from_block: BlockNumber,
    pub params: DynamicQuorumParams,
}

/// Checkpoints ordered by block.
#[derive(Debug, Clone, Default)]
pub struct QuorumParamsHistory {
    checkpoints: Vec<ParamsCheckpoint>,
}

impl QuorumParamsHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a history with `params` in force from `from_block`.
    pub fn with_initial(
        from_block: BlockNumber,
        params: DynamicQuorumParams,
    ) -> Result<Self, GovernanceError> {
        let mut history = Self::new();
        history.write_checkpoint(from_block, params)?;
        Ok(history)
    }

    /// Record `params` as in force from `block`.
    ///
    /// Writing at the block of the latest checkpoint replaces it; writing
    /// before it is rejected.
    pub fn write_checkpoint(
        &mut self,
        block: BlockNumber,
        params: DynamicQuorumParams,
    ) -> Result<(), GovernanceError> {
        params.validate()?;
        self.record(block, params)
    }

    fn record(
        &mut self,
        block: BlockNumber,
        params: DynamicQuorumParams,
    ) -> Result<(), GovernanceError> {
        let checkpoint = ParamsCheckpoint {
            from_block: block,
            params,
        };
        match self.checkpoints.last().map(|cp| cp.from_block) {
            Some(latest) if block < latest => {
                return Err(GovernanceError::CheckpointOutOfOrder { block, latest });
            }
            Some(latest) if block == latest => {
                let last = self.checkpoints.len() - 1;
                self.checkpoints[last] = checkpoint;
            }
            _ => self.checkpoints.push(checkpoint),
        }

        debug!(
            block,
            min_bps = params.min_quorum_votes_bps.get(),
            max_bps = params.max_quorum_votes_bps.get(),
            coefficient = %params.quorum_coefficient,
            "Quorum params checkpoint written"
        );
        Ok(())
    }

    /// Parameters in force at `block`, or `None` before the first checkpoint.
    pub fn params_at(&self, block: BlockNumber) -> Option<DynamicQuorumParams> {
        let idx = self.checkpoints.partition_point(|cp| cp.from_block <= block);
        idx.checked_sub(1).map(|i| self.checkpoints[i].params)
    }

    pub fn latest(&self) -> Option<&ParamsCheckpoint> {
        self.checkpoints.last()
    }

    pub fn checkpoints(&self) -> &[ParamsCheckpoint] {
        &self.checkpoints
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    // The field setters mirror governor events one at a time, so the bounds
    // may be briefly inverted between a min and a max update in the same
    // block. Consumers validate the params they read back.

    /// Change the quorum floor from `block`.
    pub fn set_min_quorum_votes_bps(
        &mut self,
        block: BlockNumber,
        bps: Bps,
    ) -> Result<(), GovernanceError> {
        self.update(block, |params| params.min_quorum_votes_bps = bps)
    }

    /// Change the quorum ceiling from `block`.
    pub fn set_max_quorum_votes_bps(
        &mut self,
        block: BlockNumber,
        bps: Bps,
    ) -> Result<(), GovernanceError> {
        self.update(block, |params| params.max_quorum_votes_bps = bps)
    }

    /// Change the quorum coefficient from `block`.
    pub fn set_quorum_coefficient(
        &mut self,
        block: BlockNumber,
        coefficient: U256,
    ) -> Result<(), GovernanceError> {
        self.update(block, |params| params.quorum_coefficient = coefficient)
    }

    fn update(
        &mut self,
        block: BlockNumber,
        change: impl FnOnce(&mut DynamicQuorumParams),
    ) -> Result<(), GovernanceError> {
        let mut params = self.latest().map(|cp| cp.params).unwrap_or_default();
        change(&mut params);
        self.record(block, params)
    }
}
