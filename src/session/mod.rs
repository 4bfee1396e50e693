//! Page-level deck editing: owns the card collection and drives every backend call
//! through the task lanes.

use std::time::{
    Duration,
    Instant,
};

use chrono::{
    DateTime,
    Local,
};
use tracing::{
    debug,
    error,
    info,
};

use crate::{
    api::{
        ApiClient,
        DeckSnapshot,
    },
    core::{
        models::filter_blank_cards,
        tasks::{
            TaskManager,
            TaskResult,
        },
        Card,
        CardField,
        Deck,
        FlashdeckError,
    },
    proposal::{
        self,
        ChangePreview,
        ProposalStore,
    },
    settings::AcceptPolicy,
};

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Loading,
    Ready,
    /// Blocking error; the view offers `retry_load`.
    Failed(String),
}

/// Transient save feedback for the view to render.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveStatus {
    Idle,
    Saving,
    Saved { at: DateTime<Local> },
    /// Dismissible banner. Local edits are kept.
    Failed(String),
}

pub struct EditSession {
    deck_id: u64,
    name: String,
    description: String,
    cards: Vec<Card>,
    load_state: LoadState,
    save_status: SaveStatus,
    proposals: ProposalStore,
    acceptance: AcceptPolicy,
    tasks: TaskManager,
}

impl EditSession {
    /// Opens a session and starts loading the deck.
    pub fn open(
        api: ApiClient,
        deck_id: u64,
        acceptance: AcceptPolicy,
    ) -> Result<Self, FlashdeckError> {
        let session = Self {
            deck_id,
            name: String::new(),
            description: String::new(),
            cards: Vec::new(),
            load_state: LoadState::Loading,
            save_status: SaveStatus::Idle,
            proposals: ProposalStore::new(),
            acceptance,
            tasks: TaskManager::new(api)?,
        };
        session.tasks.load_deck(deck_id);
        Ok(session)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn save_status(&self) -> &SaveStatus {
        &self.save_status
    }

    pub fn proposals(&self) -> &ProposalStore {
        &self.proposals
    }

    pub fn acceptance(&self) -> &AcceptPolicy {
        &self.acceptance
    }

    pub fn set_acceptance(&mut self, acceptance: AcceptPolicy) {
        self.acceptance = acceptance;
    }

    pub fn is_ready(&self) -> bool {
        self.load_state == LoadState::Ready
    }

    /// True while any lane has a request outstanding.
    pub fn is_busy(&self) -> bool {
        self.load_state == LoadState::Loading
            || self.save_status == SaveStatus::Saving
            || self.proposals.is_thinking()
            || self.proposals.any_applying()
    }

    pub fn retry_load(&mut self) {
        if self.load_state == LoadState::Loading {
            return;
        }
        self.load_state = LoadState::Loading;
        self.tasks.load_deck(self.deck_id);
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn add_card(&mut self) {
        self.cards.push(Card::blank());
    }

    /// Removes the card at zero-based `index`.
    pub fn remove_card(&mut self, index: usize) -> Option<Card> {
        (index < self.cards.len()).then(|| self.cards.remove(index))
    }

    pub fn edit_card(&mut self, index: usize, field: CardField, value: impl Into<String>) -> bool {
        let Some(card) = self.cards.get_mut(index) else {
            return false;
        };
        match field {
            CardField::Question => card.question = value.into(),
            CardField::Answer => card.answer = value.into(),
        }
        true
    }

    /// Sends the deck with trimmed metadata and blank cards dropped. Ignored until the deck
    /// has loaded and while a save is already in flight.
    pub fn save(&mut self) {
        if !self.is_ready() || self.save_status == SaveStatus::Saving {
            return;
        }

        let deck = Deck {
            id: self.deck_id,
            name: self.name.trim().to_string(),
            description: Some(self.description.trim().to_string()),
            cards: filter_blank_cards(&self.cards),
        };
        debug!(deck_id = deck.id, cards = deck.cards.len(), "saving deck");
        self.save_status = SaveStatus::Saving;
        self.tasks.save_deck(deck);
    }

    pub fn dismiss_save_status(&mut self) {
        if self.save_status != SaveStatus::Saving {
            self.save_status = SaveStatus::Idle;
        }
    }

    /// Submits a chat message. Blank input, an unloaded deck or a chat already in flight is a
    /// silent no-op.
    pub fn submit_message(&mut self, text: &str) -> bool {
        if !self.is_ready() {
            return false;
        }
        let Some(message) = self.proposals.begin_chat(text) else {
            return false;
        };

        let snapshot = DeckSnapshot::from_cards(&self.cards);
        let anchors = self.cards.iter().map(|card| card.id).collect();
        self.tasks.send_chat(message, snapshot, anchors);
        true
    }

    pub fn approve(&mut self, proposal_id: &str) -> bool {
        if !self.is_ready() {
            return false;
        }
        match proposal::prepare_apply(&mut self.proposals, &self.cards, proposal_id, &self.acceptance)
        {
            Some(ticket) => {
                self.tasks.apply_proposal(ticket);
                true
            }
            None => false,
        }
    }

    pub fn deny(&mut self, proposal_id: &str) -> bool {
        proposal::deny(&mut self.proposals, proposal_id)
    }

    pub fn reverse(&mut self, proposal_id: &str) -> bool {
        proposal::reverse(&mut self.proposals, &mut self.cards, proposal_id)
    }

    /// Preview of a proposal against the current cards, following cards that moved since
    /// the proposal was requested.
    pub fn preview(&self, proposal_id: &str) -> Option<Vec<ChangePreview>> {
        let proposal = self.proposals.proposal(proposal_id)?;
        Some(proposal::preview_anchored(&proposal.commands, &self.cards, &proposal.anchors))
    }

    /// Applies finished tasks in arrival order. Returns whether anything changed.
    pub fn poll(&mut self) -> bool {
        let results = self.tasks.poll_results();
        let updated = !results.is_empty();
        for result in results {
            self.handle_task_result(result);
        }
        updated
    }

    /// Blocks until every lane is idle or `timeout` elapses. Returns whether the session
    /// settled.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        self.poll();

        while self.is_busy() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            if let Some(result) = self.tasks.wait_for_result(remaining) {
                self.handle_task_result(result);
            }
        }
        true
    }

    pub fn handle_task_result(&mut self, result: TaskResult) {
        match result {
            TaskResult::DeckLoaded(Ok(deck)) => {
                info!(deck_id = deck.id, cards = deck.cards.len(), "deck loaded");
                self.name = deck.name;
                self.description = deck.description.unwrap_or_default();
                self.cards = deck.cards;
                self.load_state = LoadState::Ready;
            }
            TaskResult::DeckLoaded(Err(e)) => {
                error!(deck_id = self.deck_id, error = %e, "deck load failed");
                self.load_state = LoadState::Failed(format!("Failed to load deck data: {e}"));
            }
            TaskResult::DeckSaved(Ok(_)) => {
                info!(deck_id = self.deck_id, "deck saved");
                self.save_status = SaveStatus::Saved { at: Local::now() };
            }
            TaskResult::DeckSaved(Err(e)) => {
                error!(deck_id = self.deck_id, error = %e, "deck save failed");
                self.save_status = SaveStatus::Failed(format!("Failed to save deck: {e}"));
            }
            TaskResult::ChatReplied { anchors, result } => {
                self.proposals.finish_chat(result, anchors);
            }
            TaskResult::ProposalApplied { proposal_id, result } => {
                proposal::complete_apply(&mut self.proposals, &mut self.cards, &proposal_id, result);
            }
        }
    }
}
