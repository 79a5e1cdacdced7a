//! Governance event indexer.
//!
//! Folds governor events, in chain order, into proposal records and the
//! quorum parameter history. Proposals created while a dynamic quorum is
//! configured capture those parameters and have their quorum recomputed on
//! every against vote.

use dynquorum_types::{Address, BlockNumber, Bps, U256};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use crate::error::GovernanceError;
use crate::params::QuorumParamsHistory;
use crate::proposal::{ProposalRecord, ProposalRegistry, ProposalStatus, VoteSupport};

/// Events emitted by the governor that the indexer understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GovernanceEvent {
    ProposalCreated {
        id: u64,
        proposer: Address,
        start_block: BlockNumber,
        end_block: BlockNumber,
        #[serde(default)]
        update_period_end_block: BlockNumber,
        /// Block voting power and supply are read at; defaults to `start_block`
        #[serde(default)]
        vote_snapshot_block: Option<BlockNumber>,
        /// Quorum reported by the governor at creation
        quorum_votes: U256,
        /// Supply at the vote snapshot block, for dynamic-quorum governors
        #[serde(default)]
        total_supply: Option<U256>,
        #[serde(default)]
        on_timelock_v1: bool,
    },
    VoteCast {
        voter: Address,
        proposal_id: u64,
        support: VoteSupport,
        votes: U256,
    },
    MinQuorumVotesBpsSet {
        old_bps: Bps,
        new_bps: Bps,
    },
    MaxQuorumVotesBpsSet {
        old_bps: Bps,
        new_bps: Bps,
    },
    QuorumCoefficientSet {
        old_coefficient: U256,
        new_coefficient: U256,
    },
    ProposalObjectionPeriodSet {
        id: u64,
        objection_period_end_block: BlockNumber,
    },
    ProposalCanceled {
        id: u64,
    },
    ProposalVetoed {
        id: u64,
    },
    ProposalQueued {
        id: u64,
        eta: u64,
    },
    ProposalExecuted {
        id: u64,
    },
}

/// An event with the block it was emitted in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedEvent {
    pub block_number: BlockNumber,
    #[serde(default)]
    pub block_timestamp: u64,
    pub event: GovernanceEvent,
}

impl IndexedEvent {
    pub fn new(block_number: BlockNumber, event: GovernanceEvent) -> Self {
        Self {
            block_number,
            block_timestamp: 0,
            event,
        }
    }
}

/// In-memory store of indexed governance state.
#[derive(Debug, Default, Clone)]
pub struct GovernanceIndexer {
    params: QuorumParamsHistory,
    proposals: ProposalRegistry,
    events_handled: u64,
}

impl GovernanceIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing parameter history, e.g. the governor's
    /// parameters at deployment.
    pub fn with_params(params: QuorumParamsHistory) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    pub fn params(&self) -> &QuorumParamsHistory {
        &self.params
    }

    pub fn proposals(&self) -> &ProposalRegistry {
        &self.proposals
    }

    pub fn proposal(&self, id: u64) -> Option<&ProposalRecord> {
        self.proposals.get(id)
    }

    pub fn events_handled(&self) -> u64 {
        self.events_handled
    }

    /// Apply every event in order, stopping at the first failure.
    pub fn handle_all<'a>(
        &mut self,
        events: impl IntoIterator<Item = &'a IndexedEvent>,
    ) -> Result<(), GovernanceError> {
        events.into_iter().try_for_each(|event| self.handle(event))
    }

    /// Apply a single event.
    pub fn handle(&mut self, indexed: &IndexedEvent) -> Result<(), GovernanceError> {
        let block = indexed.block_number;
        match self.apply(block, &indexed.event) {
            Ok(()) => {
                self.events_handled += 1;
                Ok(())
            }
            Err(e) => {
                warn!(block, error = %e, event = ?indexed.event, "Rejected governance event");
                Err(e)
            }
        }
    }

    fn apply(&mut self, block: BlockNumber, event: &GovernanceEvent) -> Result<(), GovernanceError> {
        match event {
            GovernanceEvent::ProposalCreated {
                id,
                proposer,
                start_block,
                end_block,
                update_period_end_block,
                vote_snapshot_block,
                quorum_votes,
                total_supply,
                on_timelock_v1,
            } => {
                let mut proposal =
                    ProposalRecord::new(*id, *proposer, block, *start_block, *end_block, *quorum_votes)
                        .with_update_period(*update_period_end_block)
                        .with_vote_snapshot_block(vote_snapshot_block.unwrap_or(*start_block));
                proposal.on_timelock_v1 = *on_timelock_v1;

                if let Some(supply) = total_supply {
                    proposal.total_supply = *supply;
                    if let Some(params) = self.params.params_at(block).filter(|p| p.is_dynamic()) {
                        proposal = proposal.with_dynamic_quorum(*supply, params)?;
                    }
                }

                debug!(
                    id,
                    block,
                    quorum_votes = %proposal.quorum_votes,
                    dynamic = proposal.quorum_params.is_some(),
                    "Proposal created"
                );
                self.proposals.insert(proposal)
            }
            GovernanceEvent::VoteCast {
                voter,
                proposal_id,
                support,
                votes,
            } => self.on_vote(*proposal_id, *voter, *support, *votes),
            GovernanceEvent::MinQuorumVotesBpsSet { new_bps, .. } => {
                self.params.set_min_quorum_votes_bps(block, *new_bps)
            }
            GovernanceEvent::MaxQuorumVotesBpsSet { new_bps, .. } => {
                self.params.set_max_quorum_votes_bps(block, *new_bps)
            }
            GovernanceEvent::QuorumCoefficientSet {
                new_coefficient, ..
            } => self.params.set_quorum_coefficient(block, *new_coefficient),
            GovernanceEvent::ProposalObjectionPeriodSet {
                id,
                objection_period_end_block,
            } => {
                self.proposals.get_mut(*id)?.objection_period_end_block =
                    *objection_period_end_block;
                Ok(())
            }
            GovernanceEvent::ProposalCanceled { id } => {
                self.set_status(*id, ProposalStatus::Cancelled)
            }
            GovernanceEvent::ProposalVetoed { id } => self.set_status(*id, ProposalStatus::Vetoed),
            GovernanceEvent::ProposalQueued { id, eta } => {
                let proposal = self.proposals.get_mut(*id)?;
                proposal.status = ProposalStatus::Queued;
                proposal.execution_eta = Some(*eta);
                Ok(())
            }
            GovernanceEvent::ProposalExecuted { id } => {
                self.set_status(*id, ProposalStatus::Executed)
            }
        }
    }

    fn on_vote(
        &mut self,
        proposal_id: u64,
        voter: Address,
        support: VoteSupport,
        votes: U256,
    ) -> Result<(), GovernanceError> {
        let proposal = self.proposals.get_mut(proposal_id)?;
        let quorum_before = proposal.quorum_votes;
        proposal.record_vote(voter, support, votes)?;

        if proposal.status == ProposalStatus::Pending {
            proposal.status = ProposalStatus::Active;
        }
        if proposal.quorum_votes != quorum_before {
            debug!(
                proposal_id,
                against_votes = %proposal.against_votes,
                quorum_votes = %proposal.quorum_votes,
                "Dynamic quorum updated"
            );
        }
        Ok(())
    }

    fn set_status(&mut self, id: u64, status: ProposalStatus) -> Result<(), GovernanceError> {
        self.proposals.get_mut(id)?.status = status;
        Ok(())
    }
}
