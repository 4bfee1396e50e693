use std::collections::{
    HashMap,
    HashSet,
};

use tracing::{
    debug,
    info,
};

use crate::{
    api::{
        Command,
        ProposalPacket,
    },
    core::{
        Card,
        CardId,
    },
};

pub const GREETING: &str = "Hello! How can I help you with your flashcards?";
pub const PROPOSAL_INTRO: &str = "I can help you with that! Here's what I propose:";
pub const NO_CHANGES: &str =
    "I understand your request, but I don't have any specific changes to suggest right now.";
pub const CHAT_FAILED: &str = "Sorry, I encountered an error processing your request.";
pub const BE_MORE_SPECIFIC: &str = "I need more specific instructions. Try saying things like:\n\
     • \"Make card 1 more challenging\"\n\
     • \"Add harder questions to all cards\"\n\
     • \"Update the definitions to be more detailed\"";
pub const APPLIED: &str = "Changes applied successfully! Your flashcards have been updated.";
pub const APPLY_FAILED: &str =
    "Sorry, I encountered an error applying the changes. Please try again.";
pub const REVERSED: &str =
    "Changes have been reversed. Your flashcards are back to their previous state.";
pub const DENIED: &str = "No problem! Feel free to ask for other suggestions or modifications.";

const NOT_UNDERSTOOD_MARKER: &str = "AI couldn't understand";
const BE_SPECIFIC_MARKER: &str = "Try being more specific";

pub type ProposalId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// What the view should offer on a proposal message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisualState {
    pub show_buttons: bool,
    pub is_applied: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub proposal_id: Option<ProposalId>,
    pub commands: Vec<Command>,
    pub visual_state: VisualState,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            proposal_id: None,
            commands: Vec::new(),
            visual_state: VisualState::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalState {
    Proposed,
    Applied,
    Denied,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    pub proposal_id: ProposalId,
    pub commands: Vec<Command>,
    pub summary: Vec<String>,
    pub state: ProposalState,
    /// Card identities in snapshot order when the proposal was requested.
    pub anchors: Vec<CardId>,
}

/// Transcript, proposal table, reversal table and the busy flags of both lanes.
#[derive(Debug, Clone)]
pub struct ProposalStore {
    messages: Vec<ChatMessage>,
    proposals: HashMap<ProposalId, Proposal>,
    reversals: HashMap<ProposalId, Vec<Card>>,
    chat_in_flight: bool,
    applying: HashSet<ProposalId>,
}

impl ProposalStore {
    pub fn new() -> Self {
        Self {
            messages: vec![ChatMessage::assistant(GREETING)],
            proposals: HashMap::new(),
            reversals: HashMap::new(),
            chat_in_flight: false,
            applying: HashSet::new(),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn proposal(&self, proposal_id: &str) -> Option<&Proposal> {
        self.proposals.get(proposal_id)
    }

    /// Most recent proposal still awaiting a decision.
    pub fn latest_pending(&self) -> Option<&Proposal> {
        self.messages
            .iter()
            .rev()
            .filter_map(|m| m.proposal_id.as_deref())
            .filter_map(|id| self.proposals.get(id))
            .find(|p| p.state == ProposalState::Proposed)
    }

    /// Most recent applied proposal that still has a reversal snapshot.
    pub fn latest_applied(&self) -> Option<&Proposal> {
        self.messages
            .iter()
            .rev()
            .filter_map(|m| m.proposal_id.as_deref())
            .filter(|id| self.reversals.contains_key(*id))
            .find_map(|id| self.proposals.get(id))
    }

    /// True while a chat request is outstanding ("thinking").
    pub fn is_thinking(&self) -> bool {
        self.chat_in_flight
    }

    pub fn is_applying(&self, proposal_id: &str) -> bool {
        self.applying.contains(proposal_id)
    }

    pub fn any_applying(&self) -> bool {
        !self.applying.is_empty()
    }

    pub fn reversal_snapshot(&self, proposal_id: &str) -> Option<&[Card]> {
        self.reversals.get(proposal_id).map(Vec::as_slice)
    }

    /// Starts a chat submission. Returns the trimmed text to send, or `None` (and changes
    /// nothing) when the input is blank or a chat request is already in flight.
    pub fn begin_chat(&mut self, text: &str) -> Option<String> {
        let text = text.trim();
        if text.is_empty() || self.chat_in_flight {
            return None;
        }

        self.messages.push(ChatMessage::user(text));
        self.chat_in_flight = true;
        Some(text.to_string())
    }

    /// Completes a chat submission with exactly one assistant message.
    pub fn finish_chat(&mut self, result: Result<ProposalPacket, String>, anchors: Vec<CardId>) {
        self.chat_in_flight = false;

        let packet = match result {
            Ok(packet) => packet,
            Err(error) => {
                self.messages.push(ChatMessage::assistant(chat_failure_message(&error)));
                return;
            }
        };

        if packet.summary().is_empty() {
            self.messages.push(ChatMessage::assistant(NO_CHANGES));
            return;
        }

        let summary = packet.summary().to_vec();
        info!(proposal_id = %packet.proposal_id, commands = packet.commands.len(), "proposal received");

        self.messages.push(ChatMessage {
            role: Role::Assistant,
            content: format!("{PROPOSAL_INTRO}\n\n{}", summary.join("\n")),
            proposal_id: Some(packet.proposal_id.clone()),
            commands: packet.commands.clone(),
            visual_state: VisualState { show_buttons: true, is_applied: false },
        });
        self.proposals.insert(
            packet.proposal_id.clone(),
            Proposal {
                proposal_id: packet.proposal_id,
                commands: packet.commands,
                summary,
                state: ProposalState::Proposed,
                anchors,
            },
        );
    }

    pub(crate) fn push_assistant(&mut self, content: &str) {
        self.messages.push(ChatMessage::assistant(content));
    }

    pub(crate) fn set_visual_state(&mut self, proposal_id: &str, visual_state: VisualState) {
        for message in &mut self.messages {
            if message.proposal_id.as_deref() == Some(proposal_id) {
                message.visual_state = visual_state;
            }
        }
    }

    pub(crate) fn hide_buttons(&mut self, proposal_id: &str) {
        for message in &mut self.messages {
            if message.proposal_id.as_deref() == Some(proposal_id) {
                message.visual_state.show_buttons = false;
            }
        }
    }

    pub(crate) fn set_state(&mut self, proposal_id: &str, state: ProposalState) {
        if let Some(proposal) = self.proposals.get_mut(proposal_id) {
            debug!(proposal_id, from = ?proposal.state, to = ?state, "proposal transition");
            proposal.state = state;
        }
    }

    pub(crate) fn mark_applying(&mut self, proposal_id: &str) -> bool {
        self.applying.insert(proposal_id.to_string())
    }

    pub(crate) fn clear_applying(&mut self, proposal_id: &str) {
        self.applying.remove(proposal_id);
    }

    pub(crate) fn record_reversal(&mut self, proposal_id: &str, cards: Vec<Card>) {
        self.reversals.insert(proposal_id.to_string(), cards);
    }

    pub(crate) fn take_reversal(&mut self, proposal_id: &str) -> Option<Vec<Card>> {
        self.reversals.remove(proposal_id)
    }
}

impl Default for ProposalStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Assistant copy for a failed chat request, chosen by substring match on the error text.
pub fn chat_failure_message(error: &str) -> String {
    if error.contains(NOT_UNDERSTOOD_MARKER) {
        error.to_string()
    } else if error.contains(BE_SPECIFIC_MARKER) {
        BE_MORE_SPECIFIC.to_string()
    } else {
        CHAT_FAILED.to_string()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn packet(id: &str, summary: &[&str]) -> ProposalPacket {
        ProposalPacket {
            human_summary: Some(summary.iter().map(|s| s.to_string()).collect()),
            proposal_id: id.to_string(),
            commands: vec![Command::DeleteCard { id: "1".into() }],
        }
    }

    fn assistant_count(store: &ProposalStore) -> usize {
        store.messages().iter().filter(|m| m.role == Role::Assistant).count()
    }

    #[test]
    fn transcript_opens_with_greeting() {
        let store = ProposalStore::new();
        assert_eq!(store.messages(), &[ChatMessage::assistant(GREETING)]);
    }

    #[test]
    fn blank_input_is_ignored() {
        let mut store = ProposalStore::new();
        assert_eq!(store.begin_chat("   \n"), None);
        assert_eq!(store.messages().len(), 1);
        assert!(!store.is_thinking());
    }

    #[test]
    fn second_submission_while_thinking_is_ignored() {
        let mut store = ProposalStore::new();
        assert_eq!(store.begin_chat("  make it harder "), Some("make it harder".to_string()));
        assert!(store.is_thinking());
        assert_eq!(store.begin_chat("again"), None);
        assert_eq!(store.messages().len(), 2);
    }

    #[test]
    fn summary_creates_pending_proposal() {
        let mut store = ProposalStore::new();
        store.begin_chat("delete card 1");
        store.finish_chat(Ok(packet("p1", &["Delete card 1", "Add new card"])), Vec::new());

        let last = store.messages().last().unwrap();
        assert_eq!(last.content, format!("{PROPOSAL_INTRO}\n\nDelete card 1\nAdd new card"));
        assert_eq!(last.proposal_id.as_deref(), Some("p1"));
        assert_eq!(last.visual_state, VisualState { show_buttons: true, is_applied: false });
        assert_eq!(store.proposal("p1").unwrap().state, ProposalState::Proposed);
        assert_eq!(store.latest_pending().unwrap().proposal_id, "p1");
        assert!(!store.is_thinking());
    }

    #[test]
    fn empty_summary_means_no_changes() {
        let mut store = ProposalStore::new();
        store.begin_chat("hi");
        store.finish_chat(Ok(packet("p1", &[])), Vec::new());
        assert_eq!(store.messages().last().unwrap(), &ChatMessage::assistant(NO_CHANGES));
        assert!(store.proposal("p1").is_none());
    }

    #[test]
    fn each_submission_appends_exactly_one_assistant_message() {
        let mut store = ProposalStore::new();
        let outcomes: Vec<Result<ProposalPacket, String>> = vec![
            Ok(packet("a", &["x"])),
            Ok(packet("b", &[])),
            Err("HTTP 500".into()),
            Err("AI couldn't understand your request.".into()),
        ];

        for outcome in outcomes {
            let before = assistant_count(&store);
            store.begin_chat("request").unwrap();
            store.finish_chat(outcome, Vec::new());
            assert_eq!(assistant_count(&store), before + 1);
        }
    }

    #[test]
    fn failure_copy_is_pattern_matched() {
        let not_understood =
            "AI couldn't understand your request. Try being more specific like 'make card 1 harder'";
        assert_eq!(chat_failure_message(not_understood), not_understood);
        assert_eq!(chat_failure_message("Please. Try being more specific"), BE_MORE_SPECIFIC);
        assert_eq!(chat_failure_message("HTTP 500: boom"), CHAT_FAILED);
    }
}
