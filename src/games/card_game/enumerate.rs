//! Exhaustive enumeration of card game states.
//!
//! For every number of rounds left `k` in `0..=n/2` the enumerator produces
//! every sorted agent hand of `k + n % 2` cards, every ordered opponent deck of
//! `k` of the remaining cards, and every visibility signal (hidden, or the
//! opponent's top card when `k > 0`). The count grows roughly as
//! `C(n, n/2) * (n/2)!`, so only small decks are practical.

use crate::error::{GameError, Result};
use crate::games::card_game::state::{Card, CardState, Signal};
use crate::rl::config::validate_deck_size;
use crate::rl::env::StateSpace;

/// Largest state space [`enumerate_states`] will build.
///
/// A deck of 13 cards (about 16 million states) is the largest that fits.
pub const MAX_ENUMERATED_STATES: u128 = 50_000_000;

/// Enumerate every state reachable with a deck of `deck_size` cards.
///
/// # Errors
/// `GameError::InvalidConfiguration` if the deck cannot be dealt, or if it
/// has more than [`MAX_ENUMERATED_STATES`] states.
pub fn enumerate_states(deck_size: usize) -> Result<StateSpace<CardState>> {
    validate_deck_size(deck_size)?;

    let count = match expected_state_count(deck_size) {
        Some(count) if count <= MAX_ENUMERATED_STATES => count as usize,
        _ => {
            return Err(GameError::InvalidConfiguration {
                deck_size,
                reason: format!("state space exceeds {} states", MAX_ENUMERATED_STATES),
            })
        }
    };

    let cards: Vec<Card> = (1..=deck_size as Card).collect();
    let extra = deck_size % 2;
    let mut states = Vec::with_capacity(count);

    for k in 0..=deck_size / 2 {
        for agent in combinations(&cards, k + extra) {
            let remaining: Vec<Card> = cards
                .iter()
                .copied()
                .filter(|card| !agent.contains(card))
                .collect();

            for opponent in permutations(&remaining, k) {
                if let Some(&top) = opponent.first() {
                    states.push(CardState::new(agent.clone(), opponent.clone(), Signal::Shown(top)));
                }
                states.push(CardState::new(agent.clone(), opponent, Signal::Hidden));
            }
        }
    }

    Ok(StateSpace::new(deck_size, states))
}

/// Closed-form number of states [`enumerate_states`] produces.
///
/// `None` if the count overflows `u128`.
pub fn expected_state_count(deck_size: usize) -> Option<u128> {
    let n = deck_size as u128;
    let extra = n % 2;
    let mut total: u128 = 0;

    for k in 0..=n / 2 {
        let agent_len = k + extra;
        let signals = if k == 0 { 1 } else { 2 };
        let count = binomial(n, agent_len)?
            .checked_mul(falling_factorial(n - agent_len, k)?)?
            .checked_mul(signals)?;
        total = total.checked_add(count)?;
    }

    Some(total)
}

fn binomial(n: u128, k: u128) -> Option<u128> {
    if k > n {
        return Some(0);
    }
    let k = k.min(n - k);
    let mut result: u128 = 1;
    for i in 0..k {
        // Exact at every step: the product of i+1 consecutive integers is divisible by (i+1)!.
        result = result.checked_mul(n - i)? / (i + 1);
    }
    Some(result)
}

fn falling_factorial(n: u128, k: u128) -> Option<u128> {
    if k > n {
        return Some(0);
    }
    (0..k).try_fold(1u128, |acc, i| acc.checked_mul(n - i))
}

/// All `k`-subsets of `items` in lexicographic order.
fn combinations(items: &[Card], k: usize) -> Vec<Vec<Card>> {
    fn recurse(items: &[Card], k: usize, start: usize, current: &mut Vec<Card>, out: &mut Vec<Vec<Card>>) {
        if current.len() == k {
            out.push(current.clone());
            return;
        }
        let needed = k - current.len();
        for i in start..items.len() {
            if items.len() - i < needed {
                break;
            }
            current.push(items[i]);
            recurse(items, k, i + 1, current, out);
            current.pop();
        }
    }

    let mut out = Vec::new();
    if k <= items.len() {
        recurse(items, k, 0, &mut Vec::with_capacity(k), &mut out);
    }
    out
}

/// All ordered `k`-permutations of `items`.
fn permutations(items: &[Card], k: usize) -> Vec<Vec<Card>> {
    fn recurse(items: &[Card], k: usize, used: &mut [bool], current: &mut Vec<Card>, out: &mut Vec<Vec<Card>>) {
        if current.len() == k {
            out.push(current.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            current.push(items[i]);
            recurse(items, k, used, current, out);
            current.pop();
            used[i] = false;
        }
    }

    let mut out = Vec::new();
    if k <= items.len() {
        let mut used = vec![false; items.len()];
        recurse(items, k, &mut used, &mut Vec::with_capacity(k), &mut out);
    }
    out
}
