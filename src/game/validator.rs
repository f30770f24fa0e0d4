use std::collections::HashSet;

use crate::models::card::Card;

/// Canonical rule of the game: a triplet is a set iff every attribute
/// position holds either one distinct value (all same) or three distinct
/// values (all different). Exactly two distinct values at any position
/// invalidates the whole triplet.
pub fn is_valid_set(a: &Card, b: &Card, c: &Card) -> bool {
    for position in 0..Card::ATTRIBUTES {
        let x = a.attribute(position);
        let y = b.attribute(position);
        let z = c.attribute(position);
        let all_same = x == y && y == z;
        let all_different = x != y && y != z && x != z;
        if !all_same && !all_different {
            return false;
        }
    }
    true
}

/// Whether any valid set exists among board indices not in `excluded`.
///
/// Short-circuits on the first match. Evaluates up to C(n, 3) triplets;
/// fine for the board sizes this game deals in, and makes no assumption
/// about n.
pub fn has_valid_sets(board: &[Card], excluded: &HashSet<usize>) -> bool {
    if board.len() < 3 {
        return false;
    }
    let eligible: Vec<usize> = (0..board.len())
        .filter(|index| !excluded.contains(index))
        .collect();
    if eligible.len() < 3 {
        return false;
    }
    for i in 0..eligible.len() - 2 {
        for j in (i + 1)..eligible.len() - 1 {
            for k in (j + 1)..eligible.len() {
                if is_valid_set(&board[eligible[i]], &board[eligible[j]], &board[eligible[k]]) {
                    return true;
                }
            }
        }
    }
    false
}
