//! Output formatting utilities.

use colored::Colorize;
use dynquorum_governance::{resolve_state, ChainView, DynamicQuorumParams, ProposalRecord, ProposalState};
use dynquorum_types::U256;
use tabled::{Table, Tabled};

/// Print success message.
pub fn print_success(msg: &str) {
    println!("{}", format!("✓ {}", msg).green());
}

/// Print error message.
pub fn print_error(msg: &str) {
    eprintln!("{}", format!("✗ {}", msg).red());
}

/// Print warning message.
pub fn print_warning(msg: &str) {
    println!("{}", format!("⚠ {}", msg).yellow());
}

/// Print info message.
pub fn print_info(msg: &str) {
    println!("{}", format!("ℹ {}", msg).blue());
}

/// Print a section header.
pub fn print_header(title: &str) {
    println!("{}", title.bold());
    println!("{}", "=".repeat(50));
}

/// Print the parameters and result of a quorum computation.
pub fn print_quorum(
    params: &DynamicQuorumParams,
    against_votes: &U256,
    total_supply: &U256,
    quorum_votes: &U256,
) {
    print_header("Dynamic Quorum");
    println!("Against votes:    {}", against_votes);
    println!("Total supply:     {}", total_supply);
    println!("Min quorum:       {}", params.min_quorum_votes_bps);
    println!("Max quorum:       {}", params.max_quorum_votes_bps);
    println!("Coefficient:      {}", params.quorum_coefficient);
    println!();
    println!("Quorum votes:     {}", quorum_votes.to_string().green().bold());
}

#[derive(Tabled)]
struct ProposalRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Proposer")]
    proposer: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "For")]
    for_votes: String,
    #[tabled(rename = "Against")]
    against_votes: String,
    #[tabled(rename = "Abstain")]
    abstain_votes: String,
    #[tabled(rename = "Quorum")]
    quorum_votes: String,
    #[tabled(rename = "Dynamic")]
    dynamic: String,
}

impl ProposalRow {
    fn new(proposal: &ProposalRecord, view: &ChainView) -> Self {
        Self {
            id: proposal.id,
            proposer: proposal.proposer.short(),
            state: resolve_state(proposal, view).to_string(),
            for_votes: proposal.for_votes.to_string(),
            against_votes: proposal.against_votes.to_string(),
            abstain_votes: proposal.abstain_votes.to_string(),
            quorum_votes: proposal.quorum_votes.to_string(),
            dynamic: if proposal.quorum_params.is_some() { "yes" } else { "no" }.to_string(),
        }
    }
}

/// Render proposals as a table, with states resolved against `view`.
pub fn proposal_table<'a>(
    proposals: impl IntoIterator<Item = &'a ProposalRecord>,
    view: &ChainView,
) -> String {
    let rows: Vec<ProposalRow> = proposals
        .into_iter()
        .map(|proposal| ProposalRow::new(proposal, view))
        .collect();
    Table::new(rows).to_string()
}

/// Colour a proposal state for terminal output.
pub fn format_state(state: ProposalState) -> String {
    let label = state.to_string();
    match state {
        ProposalState::Succeeded | ProposalState::Executed | ProposalState::Queued => {
            label.green().to_string()
        }
        ProposalState::Defeated | ProposalState::Vetoed | ProposalState::Expired => {
            label.red().to_string()
        }
        ProposalState::Active | ProposalState::ObjectionPeriod => label.yellow().to_string(),
        _ => label.dimmed().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynquorum_types::Address;

    #[test]
    fn test_proposal_table_lists_each_proposal() {
        let mut first = ProposalRecord::new(1, Address::ZERO, 10, 20, 120, U256::from(20u64));
        first.for_votes = U256::from(30u64);
        let second = ProposalRecord::new(2, Address::ZERO, 11, 21, 121, U256::from(20u64));

        let table = proposal_table([&first, &second], &ChainView::at(200, 0, true));
        assert!(table.contains("Quorum"));
        assert!(table.contains("Succeeded"));
        assert!(table.contains("Defeated"));
    }

    #[test]
    fn test_format_state_keeps_label() {
        colored::control::set_override(false);
        assert_eq!(format_state(ProposalState::Active), "Active");
    }
}
