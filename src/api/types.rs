use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;

use crate::core::Card;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotCard {
    pub id: String,
    pub front: String,
    pub back: String,
}

/// Positional wire copy of the card collection. Built at request time, never stored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeckSnapshot {
    pub cards: Vec<SnapshotCard>,
}

impl DeckSnapshot {
    pub fn from_cards(cards: &[Card]) -> Self {
        let cards = cards
            .iter()
            .enumerate()
            .map(|(index, card)| SnapshotCard {
                id: (index + 1).to_string(),
                front: card.question.clone(),
                back: card.answer.clone(),
            })
            .collect();
        Self { cards }
    }
}

/// An edit command as proposed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawCommand", into = "RawCommand")]
pub enum Command {
    AddCard { front: String, back: String },
    UpdateCard { id: String, front: Option<String>, back: Option<String> },
    DeleteCard { id: String },
    /// Any other command name (`bulk_add`, `change_difficulty`, ...) or arguments that did not
    /// fit the known shapes. Kept verbatim.
    Unsupported { name: String, arguments: Value },
}

impl Command {
    pub fn name(&self) -> &str {
        match self {
            Command::AddCard { .. } => "add_card",
            Command::UpdateCard { .. } => "update_card",
            Command::DeleteCard { .. } => "delete_card",
            Command::Unsupported { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawCommand {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Serialize, Deserialize)]
struct AddCardArgs {
    #[serde(default)]
    front: String,
    #[serde(default)]
    back: String,
}

#[derive(Serialize, Deserialize)]
struct UpdateCardArgs {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    front: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    back: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct DeleteCardArgs {
    id: String,
}

impl From<RawCommand> for Command {
    fn from(raw: RawCommand) -> Self {
        let parsed = match raw.name.as_str() {
            "add_card" => serde_json::from_value::<AddCardArgs>(raw.arguments.clone())
                .ok()
                .map(|args| Command::AddCard { front: args.front, back: args.back }),
            "update_card" => serde_json::from_value::<UpdateCardArgs>(raw.arguments.clone())
                .ok()
                .map(|args| Command::UpdateCard { id: args.id, front: args.front, back: args.back }),
            "delete_card" => serde_json::from_value::<DeleteCardArgs>(raw.arguments.clone())
                .ok()
                .map(|args| Command::DeleteCard { id: args.id }),
            _ => None,
        };

        parsed.unwrap_or(Command::Unsupported { name: raw.name, arguments: raw.arguments })
    }
}

impl From<Command> for RawCommand {
    fn from(command: Command) -> Self {
        let name = command.name().to_string();
        let arguments = match command {
            Command::AddCard { front, back } => serde_json::to_value(AddCardArgs { front, back }),
            Command::UpdateCard { id, front, back } => {
                serde_json::to_value(UpdateCardArgs { id, front, back })
            }
            Command::DeleteCard { id } => serde_json::to_value(DeleteCardArgs { id }),
            Command::Unsupported { arguments, .. } => Ok(arguments),
        };
        RawCommand { name, arguments: arguments.unwrap_or(Value::Null) }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest<'a> {
    pub message: &'a str,
    pub deck_snapshot: &'a DeckSnapshot,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalPacket {
    #[serde(default)]
    pub human_summary: Option<Vec<String>>,
    #[serde(default)]
    pub proposal_id: String,
    #[serde(default)]
    pub commands: Vec<Command>,
}

impl ProposalPacket {
    /// Summary lines, empty when the backend had nothing actionable.
    pub fn summary(&self) -> &[String] {
        self.human_summary.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest<'a> {
    pub proposal_id: &'a str,
    pub accepted_indexes: &'a [usize],
    pub deck_snapshot: &'a DeckSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedCard {
    #[serde(default)]
    pub front: String,
    #[serde(default)]
    pub back: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewDeck {
    #[serde(default)]
    pub cards: Vec<ProposedCard>,
}

impl NewDeck {
    /// Maps the server-confirmed deck back into local cards, each with a fresh identity.
    pub fn into_cards(self) -> Vec<Card> {
        self.cards.into_iter().map(|card| Card::new(card.front, card.back)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResponse {
    pub new_deck: NewDeck,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn snapshot_ids_are_one_based_positions() {
        let cards = vec![Card::new("A", "B"), Card::new("C", "")];
        let snapshot = DeckSnapshot::from_cards(&cards);
        assert_eq!(
            serde_json::to_value(&snapshot).unwrap(),
            json!({ "cards": [
                { "id": "1", "front": "A", "back": "B" },
                { "id": "2", "front": "C", "back": "" }
            ]})
        );
    }

    #[test]
    fn known_commands_decode_from_name_and_arguments() {
        let commands: Vec<Command> = serde_json::from_value(json!([
            { "name": "add_card", "arguments": { "front": "F", "back": "B" } },
            { "name": "update_card", "arguments": { "id": "2", "back": "new" } },
            { "name": "delete_card", "arguments": { "id": "3" } }
        ]))
        .unwrap();

        assert_eq!(
            commands,
            vec![
                Command::AddCard { front: "F".into(), back: "B".into() },
                Command::UpdateCard { id: "2".into(), front: None, back: Some("new".into()) },
                Command::DeleteCard { id: "3".into() },
            ]
        );
    }

    #[test]
    fn unknown_commands_keep_their_raw_arguments() {
        let raw = json!({ "name": "bulk_delete", "arguments": { "ids": ["1", "2"] } });
        let command: Command = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(command.name(), "bulk_delete");
        assert_eq!(serde_json::to_value(&command).unwrap(), raw);
    }

    #[test]
    fn malformed_known_command_is_unsupported() {
        let command: Command =
            serde_json::from_value(json!({ "name": "delete_card", "arguments": {} })).unwrap();
        assert!(matches!(command, Command::Unsupported { .. }));
    }

    #[test]
    fn update_command_omits_absent_fields_on_the_wire() {
        let command = Command::UpdateCard { id: "1".into(), front: Some("A2".into()), back: None };
        assert_eq!(
            serde_json::to_value(&command).unwrap(),
            json!({ "name": "update_card", "arguments": { "id": "1", "front": "A2" } })
        );
    }

    #[test]
    fn packet_without_summary_has_nothing_actionable() {
        let packet: ProposalPacket =
            serde_json::from_value(json!({ "proposalId": "p", "humanSummary": null })).unwrap();
        assert!(packet.summary().is_empty());
        assert!(packet.commands.is_empty());
    }

    #[test]
    fn apply_request_uses_camel_case_keys() {
        let snapshot = DeckSnapshot::from_cards(&[Card::new("A", "B")]);
        let request =
            ApplyRequest { proposal_id: "p1", accepted_indexes: &[0], deck_snapshot: &snapshot };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "proposalId": "p1",
                "acceptedIndexes": [0],
                "deckSnapshot": { "cards": [{ "id": "1", "front": "A", "back": "B" }] }
            })
        );
    }
}
