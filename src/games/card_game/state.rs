//! State key of the card game.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rl::env::GameState;

/// A card value in `1..=deck_size`.
pub type Card = u8;

/// What the agent sees of the opponent's next card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Signal {
    /// The opponent won the visibility coin flip; nothing is shown.
    Hidden,
    /// The opponent's next card is shown.
    Shown(Card),
}

impl Signal {
    /// The shown card, if any.
    pub fn shown_card(&self) -> Option<Card> {
        match self {
            Signal::Hidden => None,
            Signal::Shown(card) => Some(*card),
        }
    }

    /// Whether a card is shown.
    pub fn is_shown(&self) -> bool {
        matches!(self, Signal::Shown(_))
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Hidden => write!(f, "?"),
            Signal::Shown(card) => write!(f, "{}", card),
        }
    }
}

/// Complete state of the card game as seen by the value tables.
///
/// The agent's deck is always sorted ascending, so action `i` plays the
/// `i`-th smallest card the agent holds. The opponent's deck is in play
/// order (top card first).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CardState {
    agent: Vec<Card>,
    opponent: Vec<Card>,
    signal: Signal,
}

impl CardState {
    /// Build a state, normalizing the agent's deck to sorted order.
    pub fn new(mut agent: Vec<Card>, opponent: Vec<Card>, signal: Signal) -> Self {
        agent.sort_unstable();
        Self {
            agent,
            opponent,
            signal,
        }
    }

    /// The agent's cards, sorted ascending.
    pub fn agent(&self) -> &[Card] {
        &self.agent
    }

    /// The opponent's cards in play order.
    pub fn opponent(&self) -> &[Card] {
        &self.opponent
    }

    /// The visibility signal.
    pub fn signal(&self) -> Signal {
        self.signal
    }

    /// Rounds left to play.
    pub fn rounds_left(&self) -> usize {
        self.opponent.len()
    }
}

impl GameState for CardState {
    fn is_terminal(&self) -> bool {
        self.opponent.is_empty()
    }

    fn num_actions(&self) -> usize {
        if self.is_terminal() {
            0
        } else {
            self.agent.len()
        }
    }

    fn key(&self) -> String {
        let join = |cards: &[Card]| {
            cards
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(",")
        };
        format!("{}|{}|{}", join(&self.agent), join(&self.opponent), self.signal)
    }
}

impl fmt::Display for CardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Agent:{:?} Opponent:{:?} Shown:{}",
            self.agent, self.opponent, self.signal
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_deck_is_normalized() {
        let a = CardState::new(vec![4, 1], vec![3, 2], Signal::Shown(3));
        let b = CardState::new(vec![1, 4], vec![3, 2], Signal::Shown(3));
        assert_eq!(a, b);
        assert_eq!(a.agent(), &[1, 4]);
    }

    #[test]
    fn test_opponent_order_matters() {
        let a = CardState::new(vec![1, 4], vec![3, 2], Signal::Hidden);
        let b = CardState::new(vec![1, 4], vec![2, 3], Signal::Hidden);
        assert_ne!(a, b);
    }

    #[test]
    fn test_terminal_and_actions() {
        let live = CardState::new(vec![1, 4], vec![3, 2], Signal::Hidden);
        assert!(!live.is_terminal());
        assert_eq!(live.num_actions(), 2);

        let done = CardState::new(vec![], vec![], Signal::Hidden);
        assert!(done.is_terminal());
        assert_eq!(done.num_actions(), 0);

        // Odd decks leave the agent one unplayable card.
        let odd_done = CardState::new(vec![5], vec![], Signal::Hidden);
        assert!(odd_done.is_terminal());
        assert_eq!(odd_done.num_actions(), 0);
    }

    #[test]
    fn test_signal_accessors() {
        assert_eq!(Signal::Shown(3).shown_card(), Some(3));
        assert!(Signal::Shown(3).is_shown());
        assert_eq!(Signal::Hidden.shown_card(), None);
        assert!(!Signal::Hidden.is_shown());
    }

    #[test]
    fn test_rounds_left_tracks_opponent_deck() {
        assert_eq!(CardState::new(vec![1, 4], vec![3, 2], Signal::Hidden).rounds_left(), 2);
        // The agent's spare card in odd decks does not count.
        assert_eq!(CardState::new(vec![1, 5], vec![3], Signal::Hidden).rounds_left(), 1);
    }

    #[test]
    fn test_key_format() {
        let state = CardState::new(vec![4, 1], vec![3, 2], Signal::Shown(3));
        assert_eq!(state.key(), "1,4|3,2|3");
        let hidden = CardState::new(vec![], vec![], Signal::Hidden);
        assert_eq!(hidden.key(), "||?");
    }
}
