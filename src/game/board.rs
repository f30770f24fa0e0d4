use std::collections::HashSet;

use crate::game::validator::has_valid_sets;
use crate::models::card::Card;

/// Maximum number of simultaneously selected cards.
pub const SELECTION_CAP: usize = 3;

/// How matched cards leave the board after a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalPolicy {
    /// Server-session mode: matched cards are spliced out and the
    /// remainder re-indexed, mirroring the server's board.
    Splice,
    /// No-session mode: cards stay in place and are marked cleared, so
    /// offline play keeps stable indices.
    MarkCleared,
}

/// Mutable store of the current card layout, selection and cleared set.
///
/// Holds no network or persistence concerns; callers snapshot it for
/// rendering and persistence.
#[derive(Debug, Clone, Default)]
pub struct BoardState {
    cards: Vec<Card>,
    selected: Vec<usize>,
    cleared: HashSet<usize>,
}

impl BoardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Selection in insertion order.
    pub fn selected(&self) -> &[usize] {
        &self.selected
    }

    pub fn cleared(&self) -> &HashSet<usize> {
        &self.cleared
    }

    /// Adopts an authoritative board, dropping the current selection.
    /// The cleared set is left alone; callers reset it when the server is
    /// the source of truth.
    pub fn adopt(&mut self, cards: Vec<Card>) {
        self.cards = cards;
        self.selected.clear();
    }

    /// Restores a persisted layout.
    pub fn restore(&mut self, cards: Vec<Card>, cleared: Vec<usize>) {
        self.cards = cards;
        self.selected.clear();
        self.cleared = cleared.into_iter().collect();
    }

    pub fn reset_cleared(&mut self) {
        self.cleared.clear();
    }

    /// Toggles selection of a board index.
    ///
    /// Cleared and out-of-range indices are ignored. Toggling a selected
    /// index deselects it. A fourth distinct selection is a silent no-op;
    /// the cap is a guard, not an error.
    pub fn toggle_select(&mut self, index: usize) {
        if self.cleared.contains(&index) || index >= self.cards.len() {
            return;
        }
        if let Some(position) = self.selected.iter().position(|&i| i == index) {
            self.selected.remove(position);
            return;
        }
        if self.selected.len() >= SELECTION_CAP {
            return;
        }
        self.selected.push(index);
    }

    /// The selected triplet, if exactly three cards are selected.
    pub fn selected_triplet(&self) -> Option<[usize; 3]> {
        match self.selected.as_slice() {
            &[i, j, k] => Some([i, j, k]),
            _ => None,
        }
    }

    /// The cards behind the selected triplet, if all indices are in range.
    pub fn selected_cards(&self) -> Option<[Card; 3]> {
        let [i, j, k] = self.selected_triplet()?;
        if i >= self.cards.len() || j >= self.cards.len() || k >= self.cards.len() {
            return None;
        }
        Some([self.cards[i], self.cards[j], self.cards[k]])
    }

    /// Applies a successful match and resets the selection.
    pub fn apply_match(&mut self, indices: [usize; 3], policy: RemovalPolicy) {
        match policy {
            RemovalPolicy::Splice => {
                // Descending order so earlier removals cannot shift the
                // indices still pending removal.
                let mut ordered = indices;
                ordered.sort_unstable_by(|a, b| b.cmp(a));
                for index in ordered {
                    if index < self.cards.len() {
                        self.cards.remove(index);
                    }
                }
            }
            RemovalPolicy::MarkCleared => {
                self.cleared.extend(indices);
            }
        }
        self.selected.clear();
    }

    /// Whether at least one valid set remains among non-cleared cards.
    pub fn has_remaining_sets(&self) -> bool {
        has_valid_sets(&self.cards, &self.cleared)
    }
}
