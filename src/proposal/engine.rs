use tracing::{
    info,
    warn,
};

use super::store::{
    ProposalState,
    ProposalStore,
    VisualState,
    APPLIED,
    APPLY_FAILED,
    DENIED,
    REVERSED,
};
use crate::{
    api::{
        ApplyResponse,
        DeckSnapshot,
    },
    core::{
        Card,
        CardId,
    },
    settings::AcceptPolicy,
};

/// Everything the apply request needs, captured when the user approves.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyTicket {
    pub proposal_id: String,
    pub accepted_indexes: Vec<usize>,
    pub snapshot: DeckSnapshot,
}

/// Opens the apply lane for a proposal. `None` when the proposal is unknown, not awaiting
/// a decision, or already being applied.
pub fn prepare_apply(
    store: &mut ProposalStore,
    cards: &[Card],
    proposal_id: &str,
    policy: &AcceptPolicy,
) -> Option<ApplyTicket> {
    let proposal = store.proposal(proposal_id)?;
    if proposal.state != ProposalState::Proposed || store.is_applying(proposal_id) {
        return None;
    }

    if !anchors_in_place(&proposal.anchors, cards) {
        warn!(proposal_id, "cards moved since the proposal was made; positional ids may target other cards");
    }

    let accepted_indexes = policy.accepted_indexes(proposal.commands.len());
    store.mark_applying(proposal_id);

    Some(ApplyTicket {
        proposal_id: proposal_id.to_string(),
        accepted_indexes,
        snapshot: DeckSnapshot::from_cards(cards),
    })
}

/// Finishes an apply. On success the server's deck replaces `cards`, the replaced cards are
/// recorded for reversal and the proposal is marked applied. On failure nothing but the
/// transcript changes.
pub fn complete_apply(
    store: &mut ProposalStore,
    cards: &mut Vec<Card>,
    proposal_id: &str,
    outcome: Result<ApplyResponse, String>,
) -> bool {
    store.clear_applying(proposal_id);

    match outcome {
        Ok(response) => {
            let mut next = response.new_deck.into_cards();
            carry_identities(cards, &mut next);
            let previous = std::mem::replace(cards, next);
            info!(proposal_id, before = previous.len(), after = cards.len(), "proposal applied");

            store.record_reversal(proposal_id, previous);
            store.set_state(proposal_id, ProposalState::Applied);
            store.set_visual_state(proposal_id, VisualState { show_buttons: false, is_applied: true });
            store.push_assistant(APPLIED);
            true
        }
        Err(error) => {
            warn!(proposal_id, %error, "apply failed");
            store.push_assistant(APPLY_FAILED);
            false
        }
    }
}

/// Restores the cards recorded when `proposal_id` was applied. No-op without a snapshot.
pub fn reverse(store: &mut ProposalStore, cards: &mut Vec<Card>, proposal_id: &str) -> bool {
    let Some(previous) = store.take_reversal(proposal_id) else {
        return false;
    };

    *cards = previous;
    store.set_state(proposal_id, ProposalState::Proposed);
    store.set_visual_state(proposal_id, VisualState { show_buttons: true, is_applied: false });
    store.push_assistant(REVERSED);
    info!(proposal_id, "proposal reversed");
    true
}

/// Declines a pending proposal. Local only.
pub fn deny(store: &mut ProposalStore, proposal_id: &str) -> bool {
    let pending = store
        .proposal(proposal_id)
        .is_some_and(|p| p.state == ProposalState::Proposed);
    if !pending || store.is_applying(proposal_id) {
        return false;
    }

    store.hide_buttons(proposal_id);
    store.set_state(proposal_id, ProposalState::Denied);
    store.push_assistant(DENIED);
    true
}

/// Gives server-confirmed cards the identities of the cards they replace: an unchanged card
/// keeps its id wherever it landed, an edited card keeps the id of the card at its position.
fn carry_identities(previous: &[Card], next: &mut [Card]) {
    let mut taken = vec![false; previous.len()];
    let mut matched = vec![false; next.len()];

    for (index, card) in next.iter_mut().enumerate() {
        let same_content = |i: usize| !taken[i] && previous[i].content() == card.content();
        let found = if index < previous.len() && same_content(index) {
            Some(index)
        } else {
            (0..previous.len()).find(|&i| same_content(i))
        };
        if let Some(i) = found {
            card.id = previous[i].id;
            taken[i] = true;
            matched[index] = true;
        }
    }

    for (index, card) in next.iter_mut().enumerate() {
        if !matched[index] && index < previous.len() && !taken[index] {
            card.id = previous[index].id;
            taken[index] = true;
        }
    }
}

fn anchors_in_place(anchors: &[CardId], cards: &[Card]) -> bool {
    anchors.is_empty()
        || (anchors.len() == cards.len() && anchors.iter().zip(cards).all(|(a, c)| *a == c.id))
}
