//! AI-assisted deck edits: the chat transcript, previews of proposed commands, and
//! approval with single-level undo.

pub mod engine;
pub mod preview;
pub mod store;

pub use engine::{
    complete_apply,
    deny,
    prepare_apply,
    reverse,
    ApplyTicket,
};
pub use preview::{
    preview_anchored,
    preview_commands,
    ChangePreview,
    FieldChange,
};
pub use store::{
    ChatMessage,
    Proposal,
    ProposalId,
    ProposalState,
    ProposalStore,
    Role,
    VisualState,
};
