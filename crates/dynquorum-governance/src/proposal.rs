//! Indexed proposals and their resolved state.
//!
//! The stored status only changes on lifecycle events (cancel, queue, ...).
//! Whether a pending or active proposal is actually updatable, in its
//! objection period, defeated or succeeded depends on the current block, so
//! [`resolve_state`] derives it from a [`ChainView`].

use std::collections::{BTreeMap, HashSet};
use dynquorum_types::{Address, BlockNumber, U256};
use serde::{Deserialize, Serialize};
use crate::error::GovernanceError;
use crate::quorum::{DynamicQuorumParams, ProposalVoteSnapshot};

/// Seconds in a day.
const DAY: u64 = 24 * 60 * 60;

/// Window after the execution ETA in which a queued proposal may execute.
pub const GRACE_PERIOD_V3: u64 = 21 * DAY;
/// Grace period for pre-v3 governors and proposals on the v1 timelock.
pub const GRACE_PERIOD_LEGACY: u64 = 14 * DAY;

/// Status as last recorded from governance events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    Pending,
    Active,
    Cancelled,
    Vetoed,
    Queued,
    Executed,
}

/// Status as presented to users at a given block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalState {
    /// Not enough chain context to decide
    Undetermined,
    Pending,
    Active,
    Cancelled,
    Defeated,
    Succeeded,
    Queued,
    Expired,
    Executed,
    Vetoed,
    /// Voting ended but a last-minute flip opened an objection window
    ObjectionPeriod,
    /// Proposer may still edit the proposal
    Updatable,
}

impl std::str::FromStr for ProposalState {
    type Err = GovernanceError;

    /// Parse a state name such as `active` or `objection-period`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let state = match s.to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "undetermined" => ProposalState::Undetermined,
            "pending" => ProposalState::Pending,
            "active" => ProposalState::Active,
            "cancelled" | "canceled" => ProposalState::Cancelled,
            "defeated" => ProposalState::Defeated,
            "succeeded" => ProposalState::Succeeded,
            "queued" => ProposalState::Queued,
            "expired" => ProposalState::Expired,
            "executed" => ProposalState::Executed,
            "vetoed" => ProposalState::Vetoed,
            "objection_period" | "objectionperiod" => ProposalState::ObjectionPeriod,
            "updatable" => ProposalState::Updatable,
            _ => return Err(GovernanceError::UnknownProposalState(s.to_string())),
        };
        Ok(state)
    }
}

impl std::fmt::Display for ProposalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ProposalState::Undetermined => "Undetermined",
            ProposalState::Pending => "Pending",
            ProposalState::Active => "Active",
            ProposalState::Cancelled => "Cancelled",
            ProposalState::Defeated => "Defeated",
            ProposalState::Succeeded => "Succeeded",
            ProposalState::Queued => "Queued",
            ProposalState::Expired => "Expired",
            ProposalState::Executed => "Executed",
            ProposalState::Vetoed => "Vetoed",
            ProposalState::ObjectionPeriod => "Objection period",
            ProposalState::Updatable => "Updatable",
        };
        f.write_str(label)
    }
}

/// Vote support options, with their on-chain encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum VoteSupport {
    Against = 0,
    For = 1,
    Abstain = 2,
}

impl TryFrom<u8> for VoteSupport {
    type Error = GovernanceError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(VoteSupport::Against),
            1 => Ok(VoteSupport::For),
            2 => Ok(VoteSupport::Abstain),
            other => Err(GovernanceError::InvalidVoteSupport(other)),
        }
    }
}

impl From<VoteSupport> for u8 {
    fn from(support: VoteSupport) -> Self {
        support as u8
    }
}

/// Chain context a proposal state is resolved against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChainView {
    /// Current block, if known
    pub block_number: Option<BlockNumber>,
    /// Timestamp of the current block in seconds, if known
    pub block_timestamp: Option<u64>,
    /// Governor supports update and objection periods
    pub dao_v3: bool,
}

impl ChainView {
    pub fn at(block_number: BlockNumber, block_timestamp: u64, dao_v3: bool) -> Self {
        Self {
            block_number: Some(block_number),
            block_timestamp: Some(block_timestamp),
            dao_v3,
        }
    }
}

/// A proposal as folded from governance events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalRecord {
    pub id: u64,
    pub proposer: Address,
    pub created_block: BlockNumber,
    pub start_block: BlockNumber,
    pub end_block: BlockNumber,
    /// Last block the proposer may edit; 0 when the governor has no update period
    pub update_period_end_block: BlockNumber,
    /// Last block of the objection period; 0 when none was triggered
    pub objection_period_end_block: BlockNumber,
    pub vote_snapshot_block: BlockNumber,
    pub for_votes: U256,
    pub against_votes: U256,
    pub abstain_votes: U256,
    /// Supply at the vote snapshot block; zero when not indexed
    pub total_supply: U256,
    pub quorum_votes: U256,
    /// Parameters captured at creation, for governors with a dynamic quorum
    pub quorum_params: Option<DynamicQuorumParams>,
    /// Execution ETA in seconds, set once queued
    pub execution_eta: Option<u64>,
    pub status: ProposalStatus,
    pub on_timelock_v1: bool,
    pub voters: HashSet<Address>,
}

impl ProposalRecord {
    /// Create a pending proposal with a fixed quorum.
    pub fn new(
        id: u64,
        proposer: Address,
        created_block: BlockNumber,
        start_block: BlockNumber,
        end_block: BlockNumber,
        quorum_votes: U256,
    ) -> Self {
        Self {
            id,
            proposer,
            created_block,
            start_block,
            end_block,
            update_period_end_block: 0,
            objection_period_end_block: 0,
            vote_snapshot_block: start_block,
            for_votes: U256::ZERO,
            against_votes: U256::ZERO,
            abstain_votes: U256::ZERO,
            total_supply: U256::ZERO,
            quorum_votes,
            quorum_params: None,
            execution_eta: None,
            status: ProposalStatus::Pending,
            on_timelock_v1: false,
            voters: HashSet::new(),
        }
    }

    pub fn with_update_period(mut self, update_period_end_block: BlockNumber) -> Self {
        self.update_period_end_block = update_period_end_block;
        self
    }

    pub fn with_vote_snapshot_block(mut self, block: BlockNumber) -> Self {
        self.vote_snapshot_block = block;
        self
    }

    /// Attach the supply and quorum parameters, recomputing the quorum from
    /// the current against votes.
    pub fn with_dynamic_quorum(
        mut self,
        total_supply: U256,
        params: DynamicQuorumParams,
    ) -> Result<Self, GovernanceError> {
        params.validate()?;
        self.total_supply = total_supply;
        self.quorum_params = Some(params);
        self.refresh_quorum()?;
        Ok(self)
    }

    /// Count a vote. Each address votes once.
    ///
    /// The record is left untouched when the vote is rejected.
    pub fn record_vote(
        &mut self,
        voter: Address,
        support: VoteSupport,
        votes: U256,
    ) -> Result<(), GovernanceError> {
        if self.voters.contains(&voter) {
            return Err(GovernanceError::AlreadyVoted);
        }

        let current = match support {
            VoteSupport::For => self.for_votes,
            VoteSupport::Against => self.against_votes,
            VoteSupport::Abstain => self.abstain_votes,
        };
        let tally = current
            .checked_add(&votes)
            .ok_or(GovernanceError::ArithmeticOverflow("vote tally"))?;

        let quorum = match support {
            VoteSupport::Against => self.dynamic_quorum_at(tally)?,
            _ => None,
        };

        match support {
            VoteSupport::For => self.for_votes = tally,
            VoteSupport::Against => self.against_votes = tally,
            VoteSupport::Abstain => self.abstain_votes = tally,
        }
        if let Some(quorum) = quorum {
            self.quorum_votes = quorum;
        }
        self.voters.insert(voter);
        Ok(())
    }

    /// Recompute `quorum_votes` when the proposal uses a dynamic quorum.
    /// Returns whether it changed.
    pub fn refresh_quorum(&mut self) -> Result<bool, GovernanceError> {
        let Some(quorum) = self.dynamic_quorum_at(self.against_votes)? else {
            return Ok(false);
        };
        let changed = quorum != self.quorum_votes;
        self.quorum_votes = quorum;
        Ok(changed)
    }

    fn dynamic_quorum_at(&self, against_votes: U256) -> Result<Option<U256>, GovernanceError> {
        let Some(params) = self.quorum_params.filter(|p| p.is_dynamic()) else {
            return Ok(None);
        };
        let snapshot = ProposalVoteSnapshot::new(against_votes, self.total_supply);
        params.quorum_votes(&snapshot).map(Some)
    }

    pub fn vote_snapshot(&self) -> ProposalVoteSnapshot {
        ProposalVoteSnapshot::new(self.against_votes, self.total_supply)
    }

    pub fn has_voted(&self, voter: &Address) -> bool {
        self.voters.contains(voter)
    }

    pub fn total_votes(&self) -> Option<U256> {
        self.for_votes
            .checked_add(&self.against_votes)?
            .checked_add(&self.abstain_votes)
    }

    pub fn quorum_reached(&self) -> bool {
        self.for_votes >= self.quorum_votes
    }

    /// Outcome once voting has closed.
    pub fn is_defeated(&self) -> bool {
        self.for_votes <= self.against_votes || !self.quorum_reached()
    }
}

/// Resolve the state shown for `proposal` at the chain position in `view`.
pub fn resolve_state(proposal: &ProposalRecord, view: &ChainView) -> ProposalState {
    match proposal.status {
        ProposalStatus::Pending | ProposalStatus::Active => resolve_open(proposal, view),
        ProposalStatus::Queued => resolve_queued(proposal, view),
        ProposalStatus::Cancelled => ProposalState::Cancelled,
        ProposalStatus::Vetoed => ProposalState::Vetoed,
        ProposalStatus::Executed => ProposalState::Executed,
    }
}

fn resolve_open(proposal: &ProposalRecord, view: &ChainView) -> ProposalState {
    let Some(block) = view.block_number else {
        return ProposalState::Undetermined;
    };

    if view.dao_v3
        && proposal.update_period_end_block > 0
        && block <= proposal.update_period_end_block
    {
        return ProposalState::Updatable;
    }

    if block <= proposal.start_block {
        return ProposalState::Pending;
    }

    let objection_end = proposal.objection_period_end_block;
    if view.dao_v3 && block > proposal.end_block && objection_end > 0 && block <= objection_end {
        return ProposalState::ObjectionPeriod;
    }

    // Voting is over even if no event has moved the stored status yet.
    if block > proposal.end_block && block > objection_end {
        if proposal.is_defeated() {
            return ProposalState::Defeated;
        }
        if proposal.execution_eta.is_none() {
            return ProposalState::Succeeded;
        }
    }

    ProposalState::Active
}

fn resolve_queued(proposal: &ProposalRecord, view: &ChainView) -> ProposalState {
    let (Some(now), Some(eta)) = (view.block_timestamp, proposal.execution_eta) else {
        return ProposalState::Undetermined;
    };

    let grace = if view.dao_v3 && !proposal.on_timelock_v1 {
        GRACE_PERIOD_V3
    } else {
        GRACE_PERIOD_LEGACY
    };

    if now >= eta.saturating_add(grace) {
        ProposalState::Expired
    } else {
        ProposalState::Queued
    }
}

/// Proposals by id.
#[derive(Debug, Default, Clone)]
pub struct ProposalRegistry {
    proposals: BTreeMap<u64, ProposalRecord>,
}

impl ProposalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a proposal; ids are unique.
    pub fn insert(&mut self, proposal: ProposalRecord) -> Result<(), GovernanceError> {
        if self.proposals.contains_key(&proposal.id) {
            return Err(GovernanceError::InvalidProposal(format!(
                "Proposal {} already exists",
                proposal.id
            )));
        }
        self.proposals.insert(proposal.id, proposal);
        Ok(())
    }

    pub fn get(&self, id: u64) -> Option<&ProposalRecord> {
        self.proposals.get(&id)
    }

    pub fn get_mut(&mut self, id: u64) -> Result<&mut ProposalRecord, GovernanceError> {
        self.proposals
            .get_mut(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))
    }

    /// All proposals in id order.
    pub fn iter(&self) -> impl Iterator<Item = &ProposalRecord> {
        self.proposals.values()
    }

    /// Proposals whose resolved state at `view` equals `state`.
    pub fn in_state(&self, state: ProposalState, view: &ChainView) -> Vec<&ProposalRecord> {
        self.iter()
            .filter(|p| resolve_state(p, view) == state)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voter(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    fn proposal() -> ProposalRecord {
        ProposalRecord::new(1, voter(9), 100, 203, 303, U256::from(20u64))
    }

    fn view(block: BlockNumber) -> ChainView {
        ChainView::at(block, 1_700_000_000, true)
    }

    #[test]
    fn test_vote_support_encoding() {
        assert_eq!(VoteSupport::try_from(0).unwrap(), VoteSupport::Against);
        assert_eq!(VoteSupport::try_from(1).unwrap(), VoteSupport::For);
        assert_eq!(VoteSupport::try_from(2).unwrap(), VoteSupport::Abstain);
        assert_eq!(VoteSupport::try_from(3), Err(GovernanceError::InvalidVoteSupport(3)));
        assert_eq!(u8::from(VoteSupport::Abstain), 2);
    }

    #[test]
    fn test_record_vote() {
        let mut p = proposal();
        p.record_vote(voter(1), VoteSupport::For, U256::from(30u64)).unwrap();
        p.record_vote(voter(2), VoteSupport::Against, U256::from(5u64)).unwrap();
        p.record_vote(voter(3), VoteSupport::Abstain, U256::from(2u64)).unwrap();

        assert_eq!(p.for_votes, U256::from(30u64));
        assert_eq!(p.against_votes, U256::from(5u64));
        assert_eq!(p.total_votes(), Some(U256::from(37u64)));
        assert!(p.has_voted(&voter(2)));
        assert_eq!(
            p.record_vote(voter(1), VoteSupport::Against, U256::ONE),
            Err(GovernanceError::AlreadyVoted)
        );
    }

    #[test]
    fn test_rejected_vote_leaves_record_unchanged() {
        let params = DynamicQuorumParams::from_raw(1000, 4000, U256::from(1_000_000u64)).unwrap();
        let mut p = proposal().with_dynamic_quorum(U256::from(200u64), params).unwrap();
        p.record_vote(voter(1), VoteSupport::Against, U256::from(18u64)).unwrap();

        // against * 10000 no longer fits in 256 bits
        let huge = U256::MAX.checked_div(&U256::from(1_000u64)).unwrap();
        assert_eq!(
            p.record_vote(voter(2), VoteSupport::Against, huge),
            Err(GovernanceError::ArithmeticOverflow("against votes share"))
        );
        assert_eq!(p.against_votes, U256::from(18u64));
        assert_eq!(p.quorum_votes, U256::from(38u64));
        assert!(!p.has_voted(&voter(2)));
        assert_eq!(p.voters.len(), 1);

        // The same voter can still cast a valid vote afterwards
        p.record_vote(voter(2), VoteSupport::Against, U256::from(2u64)).unwrap();
        assert_eq!(p.against_votes, U256::from(20u64));
        assert_eq!(p.quorum_votes, U256::from(40u64));
    }

    #[test]
    fn test_tally_overflow_leaves_record_unchanged() {
        let mut p = proposal();
        p.record_vote(voter(1), VoteSupport::For, U256::MAX).unwrap();
        assert_eq!(
            p.record_vote(voter(2), VoteSupport::For, U256::ONE),
            Err(GovernanceError::ArithmeticOverflow("vote tally"))
        );
        assert_eq!(p.for_votes, U256::MAX);
        assert!(!p.has_voted(&voter(2)));
    }

    #[test]
    fn test_parse_state_names() {
        assert_eq!("Active".parse::<ProposalState>().unwrap(), ProposalState::Active);
        assert_eq!(
            "objection-period".parse::<ProposalState>().unwrap(),
            ProposalState::ObjectionPeriod
        );
        assert_eq!("canceled".parse::<ProposalState>().unwrap(), ProposalState::Cancelled);
        assert!(matches!(
            "open".parse::<ProposalState>(),
            Err(GovernanceError::UnknownProposalState(_))
        ));
    }

    #[test]
    fn test_static_quorum_ignores_against_votes() {
        let mut p = proposal();
        p.record_vote(voter(1), VoteSupport::Against, U256::from(100u64)).unwrap();
        assert_eq!(p.quorum_votes, U256::from(20u64));
    }

    #[test]
    fn test_dynamic_quorum_follows_against_votes() {
        let params = DynamicQuorumParams::from_raw(1000, 4000, U256::from(1_000_000u64)).unwrap();
        let mut p = proposal().with_dynamic_quorum(U256::from(200u64), params).unwrap();
        assert_eq!(p.quorum_votes, U256::from(20u64));

        p.record_vote(voter(1), VoteSupport::Against, U256::from(18u64)).unwrap();
        assert_eq!(p.quorum_votes, U256::from(38u64));

        // For votes leave the quorum alone
        p.record_vote(voter(2), VoteSupport::For, U256::from(50u64)).unwrap();
        assert_eq!(p.quorum_votes, U256::from(38u64));
    }

    #[test]
    fn test_resolve_without_block_is_undetermined() {
        let p = proposal();
        assert_eq!(resolve_state(&p, &ChainView::default()), ProposalState::Undetermined);
    }

    #[test]
    fn test_resolve_open_timeline() {
        let mut p = proposal().with_update_period(150);
        assert_eq!(resolve_state(&p, &view(120)), ProposalState::Updatable);
        assert_eq!(resolve_state(&p, &view(203)), ProposalState::Pending);
        assert_eq!(resolve_state(&p, &view(250)), ProposalState::Active);
        // No votes: for (0) <= against (0)
        assert_eq!(resolve_state(&p, &view(304)), ProposalState::Defeated);

        p.record_vote(voter(1), VoteSupport::For, U256::from(25u64)).unwrap();
        assert_eq!(resolve_state(&p, &view(304)), ProposalState::Succeeded);
    }

    #[test]
    fn test_update_period_only_on_v3() {
        let p = proposal().with_update_period(150);
        let legacy = ChainView::at(120, 0, false);
        assert_eq!(resolve_state(&p, &legacy), ProposalState::Pending);
    }

    #[test]
    fn test_resolve_defeated_below_quorum() {
        let mut p = proposal();
        p.record_vote(voter(1), VoteSupport::For, U256::from(19u64)).unwrap();
        assert_eq!(resolve_state(&p, &view(304)), ProposalState::Defeated);
    }

    #[test]
    fn test_resolve_objection_period() {
        let mut p = proposal();
        p.record_vote(voter(1), VoteSupport::For, U256::from(25u64)).unwrap();
        p.objection_period_end_block = 320;
        assert_eq!(resolve_state(&p, &view(310)), ProposalState::ObjectionPeriod);
        assert_eq!(resolve_state(&p, &view(320)), ProposalState::ObjectionPeriod);
        assert_eq!(resolve_state(&p, &view(321)), ProposalState::Succeeded);

        // Without v3 support the window is not shown, and voting is still
        // considered open until it has passed.
        let legacy = ChainView::at(310, 0, false);
        assert_eq!(resolve_state(&p, &legacy), ProposalState::Active);
    }

    #[test]
    fn test_resolve_queued_expiry() {
        let mut p = proposal();
        p.status = ProposalStatus::Queued;
        assert_eq!(resolve_state(&p, &view(400)), ProposalState::Undetermined);

        let eta = 1_000_000;
        p.execution_eta = Some(eta);
        let at = |ts| ChainView::at(400, ts, true);
        assert_eq!(resolve_state(&p, &at(eta + GRACE_PERIOD_V3 - 1)), ProposalState::Queued);
        assert_eq!(resolve_state(&p, &at(eta + GRACE_PERIOD_V3)), ProposalState::Expired);

        p.on_timelock_v1 = true;
        assert_eq!(resolve_state(&p, &at(eta + GRACE_PERIOD_LEGACY)), ProposalState::Expired);
    }

    #[test]
    fn test_resolve_terminal_statuses() {
        let mut p = proposal();
        for (status, state) in [
            (ProposalStatus::Cancelled, ProposalState::Cancelled),
            (ProposalStatus::Vetoed, ProposalState::Vetoed),
            (ProposalStatus::Executed, ProposalState::Executed),
        ] {
            p.status = status;
            assert_eq!(resolve_state(&p, &view(1)), state);
        }
    }

    #[test]
    fn test_registry() {
        let mut registry = ProposalRegistry::new();
        registry.insert(proposal()).unwrap();
        registry
            .insert(ProposalRecord::new(2, voter(9), 100, 500, 600, U256::ONE))
            .unwrap();

        assert!(matches!(
            registry.insert(proposal()),
            Err(GovernanceError::InvalidProposal(_))
        ));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(registry.in_state(ProposalState::Pending, &view(300)).len(), 1);
        assert_eq!(registry.get_mut(7).unwrap_err(), GovernanceError::ProposalNotFound(7));
    }
}
