use crate::{
    api::{
        ApplyResponse,
        ProposalPacket,
    },
    core::{
        CardId,
        Deck,
    },
};

#[derive(Debug, Clone)]
pub enum TaskResult {
    DeckLoaded(Result<Deck, String>),
    DeckSaved(Result<Deck, String>),

    ChatReplied { anchors: Vec<CardId>, result: Result<ProposalPacket, String> },
    ProposalApplied { proposal_id: String, result: Result<ApplyResponse, String> },
}

impl TaskResult {
    pub fn task_type(&self) -> &'static str {
        match self {
            TaskResult::DeckLoaded(_) => "deck_loaded",
            TaskResult::DeckSaved(_) => "deck_saved",
            TaskResult::ChatReplied { .. } => "chat_replied",
            TaskResult::ProposalApplied { .. } => "proposal_applied",
        }
    }
}
