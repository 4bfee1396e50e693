//! Read-only rendering of proposed commands against the live card collection.

use std::fmt;

use crate::{
    api::Command,
    core::{
        Card,
        CardId,
    },
};

/// Shown in place of an old value that is missing or empty.
pub const EMPTY_PLACEHOLDER: &str = "Empty";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub old: String,
    pub new: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangePreview {
    Update { card_id: String, front: Option<FieldChange>, back: Option<FieldChange> },
    Add { front: String, back: String },
    Delete { card_id: String, front: String, back: String },
}

impl fmt::Display for ChangePreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangePreview::Update { card_id, front, back } => {
                write!(f, "Update card {card_id}")?;
                if let Some(change) = front {
                    write!(f, "\n  Question: {} -> {}", change.old, change.new)?;
                }
                if let Some(change) = back {
                    write!(f, "\n  Answer: {} -> {}", change.old, change.new)?;
                }
                Ok(())
            }
            ChangePreview::Add { front, back } => {
                write!(f, "Add new card\n  + Question: {front}\n  + Answer: {back}")
            }
            ChangePreview::Delete { card_id, front, back } => {
                write!(f, "Delete card {card_id}\n  - Question: {front}\n  - Answer: {back}")
            }
        }
    }
}

/// Previews commands by positional lookup: a command id `"n"` is the n-th current card.
pub fn preview_commands(commands: &[Command], cards: &[Card]) -> Vec<ChangePreview> {
    render(commands, |id| positional(cards, id))
}

/// Previews commands by following the card identities captured when the proposal was
/// requested, so edits made since then do not shift which card is shown. Ids whose anchor
/// no longer names a current card fall back to positional lookup.
pub fn preview_anchored(
    commands: &[Command],
    cards: &[Card],
    anchors: &[CardId],
) -> Vec<ChangePreview> {
    render(commands, |id| anchored(cards, anchors, id).or_else(|| positional(cards, id)))
}

fn render<'a>(
    commands: &[Command],
    lookup: impl Fn(&str) -> Option<&'a Card>,
) -> Vec<ChangePreview> {
    commands
        .iter()
        .filter_map(|command| match command {
            Command::UpdateCard { id, front, back } => {
                let current = lookup(id);
                Some(ChangePreview::Update {
                    card_id: id.clone(),
                    front: field_change(current.map(|c| c.question.as_str()), front.as_deref()),
                    back: field_change(current.map(|c| c.answer.as_str()), back.as_deref()),
                })
            }
            Command::AddCard { front, back } => {
                Some(ChangePreview::Add { front: front.clone(), back: back.clone() })
            }
            Command::DeleteCard { id } => {
                let current = lookup(id);
                Some(ChangePreview::Delete {
                    card_id: id.clone(),
                    front: or_placeholder(current.map(|c| c.question.as_str())),
                    back: or_placeholder(current.map(|c| c.answer.as_str())),
                })
            }
            Command::Unsupported { .. } => None,
        })
        .collect()
}

fn field_change(old: Option<&str>, new: Option<&str>) -> Option<FieldChange> {
    match new {
        Some(new) if !new.is_empty() => {
            Some(FieldChange { old: or_placeholder(old), new: new.to_string() })
        }
        _ => None,
    }
}

fn or_placeholder(value: Option<&str>) -> String {
    match value {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => EMPTY_PLACEHOLDER.to_string(),
    }
}

/// Zero-based index for a canonical 1-based snapshot id ("1", "2", ...).
fn snapshot_index(id: &str) -> Option<usize> {
    let position: usize = id.parse().ok()?;
    if position == 0 || position.to_string() != id {
        return None;
    }
    Some(position - 1)
}

fn anchored<'a>(cards: &'a [Card], anchors: &[CardId], id: &str) -> Option<&'a Card> {
    let anchor = anchors.get(snapshot_index(id)?)?;
    cards.iter().find(|card| card.id == *anchor)
}

fn positional<'a>(cards: &'a [Card], id: &str) -> Option<&'a Card> {
    cards.get(snapshot_index(id)?)
}
