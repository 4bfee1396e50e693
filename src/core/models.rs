use std::fmt;

use serde::{
    Deserialize,
    Serialize,
};
use uuid::Uuid;

/// Local, persistent card identity. Assigned when a card is created and never sent on the
/// wire; the backend only ever sees positional ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CardId(Uuid);

impl CardId {
    pub fn new() -> Self {
        CardId(Uuid::new_v4())
    }
}

impl Default for CardId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    #[serde(skip, default = "CardId::new")]
    pub id: CardId,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
}

impl Card {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self { id: CardId::new(), question: question.into(), answer: answer.into() }
    }

    pub fn blank() -> Self {
        Self::new("", "")
    }

    pub fn is_blank(&self) -> bool {
        self.question.trim().is_empty() && self.answer.trim().is_empty()
    }

    /// The `(question, answer)` pair, ignoring local identity.
    pub fn content(&self) -> (&str, &str) {
        (&self.question, &self.answer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardField {
    Question,
    Answer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cards: Vec<Card>,
}

/// Drops cards whose question and answer are both blank.
pub fn filter_blank_cards(cards: &[Card]) -> Vec<Card> {
    cards.iter().filter(|card| !card.is_blank()).cloned().collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn blank_cards_are_dropped_before_save() {
        let cards = vec![Card::new(" ", ""), Card::new("Q", "A")];
        let kept = filter_blank_cards(&cards);
        let pairs: Vec<_> = kept.iter().map(Card::content).collect();
        assert_eq!(pairs, vec![("Q", "A")]);
    }

    #[test]
    fn half_filled_card_survives_filter() {
        let cards = vec![Card::new("", "only an answer")];
        assert_eq!(filter_blank_cards(&cards).len(), 1);
    }

    #[test]
    fn deck_wire_shape_omits_local_ids() {
        let deck = Deck {
            id: 7,
            name: "Bio".to_string(),
            description: None,
            cards: vec![Card::new("Cell?", "Unit of life")],
        };
        let json = serde_json::to_value(&deck).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 7,
                "name": "Bio",
                "description": null,
                "cards": [{ "question": "Cell?", "answer": "Unit of life" }]
            })
        );
    }

    #[test]
    fn server_card_ids_are_ignored_on_decode() {
        let deck: Deck = serde_json::from_str(
            r#"{"id": 1, "name": "n", "description": "d",
                "cards": [{"id": 12, "question": "q", "answer": "a"}]}"#,
        )
        .unwrap();
        assert_eq!(deck.cards[0].content(), ("q", "a"));
    }
}
