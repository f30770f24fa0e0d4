use serde::{Deserialize, Serialize};

/// A puzzle card: an ordered tuple of `(shape, color, shading, count)`.
///
/// Serializes to the wire format used by the backend, a flat JSON array of
/// four small integers. Identity on the board is positional, never by
/// value, so duplicate tuples may coexist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card(pub [u8; 4]);

impl Card {
    /// Number of attribute positions on every card.
    pub const ATTRIBUTES: usize = 4;

    pub fn new(shape: u8, color: u8, shading: u8, count: u8) -> Self {
        Self([shape, color, shading, count])
    }

    /// Attribute value at `position` (0 = shape, 1 = color, 2 = shading, 3 = count).
    pub fn attribute(&self, position: usize) -> u8 {
        self.0[position]
    }

    pub fn shape(&self) -> u8 {
        self.0[0]
    }

    pub fn color(&self) -> u8 {
        self.0[1]
    }

    pub fn shading(&self) -> u8 {
        self.0[2]
    }

    pub fn count(&self) -> u8 {
        self.0[3]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_card_serializes_as_flat_array() {
        let card = Card::new(1, 2, 0, 3);
        let json = serde_json::to_string(&card).unwrap();
        // The backend speaks flat 4-tuples, not objects
        assert_eq!(json, "[1,2,0,3]");
    }

    #[test]
    fn test_card_deserializes_from_flat_array() {
        let card: Card = serde_json::from_str("[0,1,2,1]").unwrap();
        assert_eq!(card, Card::new(0, 1, 2, 1));
        assert_eq!(card.shading(), 2);
        assert_eq!(card.count(), 1);
    }
}
