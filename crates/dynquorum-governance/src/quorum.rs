//! Dynamic quorum computation.
//!
//! The quorum a proposal needs grows with the share of supply voting against
//! it, starting at a floor and capped at a ceiling:
//!
//! ```text
//! against_bps    = against_votes * 10000 / total_supply
//! adjustment_bps = quorum_coefficient * against_bps / 1e6
//! quorum_bps     = min(max_bps, min_bps + adjustment_bps)
//! quorum_votes   = quorum_bps * total_supply / 10000
//! ```
//!
//! Integer arithmetic throughout, truncating, each product taken before the
//! division of its step so results match the governor contract bit for bit.

use dynquorum_types::{Bps, U256};
use serde::{Deserialize, Serialize};
use crate::error::GovernanceError;

/// Fixed-point scale of `quorum_coefficient`: 1_000_000 means "one extra
/// basis point of quorum per basis point of supply voting against".
pub const COEFFICIENT_SCALE: u64 = 1_000_000;

/// Governance parameters driving the dynamic quorum.
///
/// Invariant: `min_quorum_votes_bps <= max_quorum_votes_bps`. Constructors and
/// deserialization enforce it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ParamsRepr")]
pub struct DynamicQuorumParams {
    /// Quorum floor, as a share of total supply
    pub min_quorum_votes_bps: Bps,
    /// Quorum ceiling, as a share of total supply
    pub max_quorum_votes_bps: Bps,
    /// Linear growth factor, scaled by [`COEFFICIENT_SCALE`]
    pub quorum_coefficient: U256,
}

#[derive(Deserialize)]
struct ParamsRepr {
    min_quorum_votes_bps: Bps,
    max_quorum_votes_bps: Bps,
    quorum_coefficient: U256,
}

impl TryFrom<ParamsRepr> for DynamicQuorumParams {
    type Error = GovernanceError;

    fn try_from(repr: ParamsRepr) -> Result<Self, Self::Error> {
        Self::new(repr.min_quorum_votes_bps, repr.max_quorum_votes_bps, repr.quorum_coefficient)
    }
}

impl Default for DynamicQuorumParams {
    fn default() -> Self {
        Self {
            min_quorum_votes_bps: Bps::ZERO,
            max_quorum_votes_bps: Bps::ZERO,
            quorum_coefficient: U256::ZERO,
        }
    }
}

impl DynamicQuorumParams {
    /// Create validated parameters.
    pub fn new(
        min_quorum_votes_bps: Bps,
        max_quorum_votes_bps: Bps,
        quorum_coefficient: U256,
    ) -> Result<Self, GovernanceError> {
        let params = Self {
            min_quorum_votes_bps,
            max_quorum_votes_bps,
            quorum_coefficient,
        };
        params.validate()?;
        Ok(params)
    }

    /// Create from raw integers as read from chain state.
    pub fn from_raw(
        min_quorum_votes_bps: u16,
        max_quorum_votes_bps: u16,
        quorum_coefficient: U256,
    ) -> Result<Self, GovernanceError> {
        let to_bps = |raw: u16, name: &str| {
            Bps::new(raw).map_err(|e| GovernanceError::InvalidParameters(format!("{name}: {e}")))
        };
        Self::new(
            to_bps(min_quorum_votes_bps, "min_quorum_votes_bps")?,
            to_bps(max_quorum_votes_bps, "max_quorum_votes_bps")?,
            quorum_coefficient,
        )
    }

    pub fn validate(&self) -> Result<(), GovernanceError> {
        if self.max_quorum_votes_bps < self.min_quorum_votes_bps {
            return Err(GovernanceError::InvalidParameters(format!(
                "max_quorum_votes_bps {} is below min_quorum_votes_bps {}",
                self.max_quorum_votes_bps.get(),
                self.min_quorum_votes_bps.get()
            )));
        }
        Ok(())
    }

    /// Whether against votes move the quorum at all.
    pub fn is_dynamic(&self) -> bool {
        !self.quorum_coefficient.is_zero()
    }

    /// Quorum floor in votes.
    pub fn min_quorum_votes(&self, total_supply: &U256) -> Result<U256, GovernanceError> {
        bps_to_votes(self.min_quorum_votes_bps, total_supply)
    }

    /// Quorum ceiling in votes.
    pub fn max_quorum_votes(&self, total_supply: &U256) -> Result<U256, GovernanceError> {
        bps_to_votes(self.max_quorum_votes_bps, total_supply)
    }

    /// Quorum in basis points for the given snapshot, before conversion to votes.
    pub fn quorum_bps(&self, snapshot: &ProposalVoteSnapshot) -> Result<Bps, GovernanceError> {
        if snapshot.total_supply.is_zero() {
            return Ok(self.min_quorum_votes_bps);
        }

        let against_bps = snapshot
            .against_votes
            .checked_mul(&U256::from(Bps::DENOMINATOR))
            .ok_or(GovernanceError::ArithmeticOverflow("against votes share"))?
            .checked_div(&snapshot.total_supply)
            .ok_or(GovernanceError::ArithmeticOverflow("against votes share"))?;

        // A product past 256 bits lies far beyond any ceiling, so it clamps.
        let adjusted = self
            .quorum_coefficient
            .checked_mul(&against_bps)
            .and_then(|scaled| scaled.checked_div(&U256::from(COEFFICIENT_SCALE)))
            .and_then(|adjustment| adjustment.checked_add(&self.min_quorum_votes_bps.to_u256()));

        match adjusted {
            Some(bps) if bps < self.max_quorum_votes_bps.to_u256() => {
                let raw = u16::try_from(u64::try_from(bps)?)
                    .map_err(|_| GovernanceError::ArithmeticOverflow("quorum bps"))?;
                Ok(Bps::new(raw)?)
            }
            _ => Ok(self.max_quorum_votes_bps),
        }
    }

    /// Votes required for the proposal to reach quorum.
    pub fn quorum_votes(&self, snapshot: &ProposalVoteSnapshot) -> Result<U256, GovernanceError> {
        bps_to_votes(self.quorum_bps(snapshot)?, &snapshot.total_supply)
    }
}

/// Vote totals a quorum is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProposalVoteSnapshot {
    /// Votes cast against the proposal so far
    pub against_votes: U256,
    /// Token supply at the proposal's vote snapshot block
    pub total_supply: U256,
}

impl ProposalVoteSnapshot {
    pub fn new(against_votes: U256, total_supply: U256) -> Self {
        Self {
            against_votes,
            total_supply,
        }
    }
}

/// Convert a basis-point share of `total_supply` into votes, truncating.
pub fn bps_to_votes(bps: Bps, total_supply: &U256) -> Result<U256, GovernanceError> {
    bps.apply(total_supply)
        .ok_or(GovernanceError::ArithmeticOverflow("bps to votes"))
}

/// Compute the dynamic quorum from raw governance values.
///
/// `total_supply` is the token supply at the proposal's vote snapshot block;
/// both bounds are resolved from it. Out-of-range basis points or
/// `max_quorum_votes_bps < min_quorum_votes_bps` yield
/// [`GovernanceError::InvalidParameters`].
pub fn dynamic_quorum_votes(
    against_votes: U256,
    total_supply: U256,
    min_quorum_votes_bps: u16,
    max_quorum_votes_bps: u16,
    quorum_coefficient: U256,
) -> Result<U256, GovernanceError> {
    DynamicQuorumParams::from_raw(min_quorum_votes_bps, max_quorum_votes_bps, quorum_coefficient)?
        .quorum_votes(&ProposalVoteSnapshot::new(against_votes, total_supply))
}
