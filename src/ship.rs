use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::Orientation;

/// One ship of a player's fleet.
///
/// Serde field names match the persisted snapshot layout, so a saved
/// game written by an older server deserializes unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ship {
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(rename = "taille")]
    pub size: usize,
    pub x: usize,
    pub y: usize,
    pub orientation: Orientation,
    /// Footprint cells that have been hit. Never exceeds `size`.
    #[serde(rename = "cases_touchees")]
    pub hits: BTreeSet<(usize, usize)>,
    #[serde(rename = "positionne")]
    pub placed: bool,
}

impl Ship {
    /// A new, unplaced ship at the grid origin.
    pub fn new(name: &str, size: usize) -> Self {
        Ship {
            name: name.to_string(),
            size,
            x: 0,
            y: 0,
            orientation: Orientation::Horizontal,
            hits: BTreeSet::new(),
            placed: false,
        }
    }

    /// Anchor the ship at (x, y) with the given orientation.
    pub fn place(&mut self, x: usize, y: usize, orientation: Orientation) {
        self.x = x;
        self.y = y;
        self.orientation = orientation;
        self.placed = true;
    }

    /// Every cell the ship occupies; empty until the ship is placed.
    pub fn cells(&self) -> Vec<(usize, usize)> {
        if !self.placed {
            return Vec::new();
        }

        (0..self.size)
            .map(|i| match self.orientation {
                Orientation::Horizontal => (self.x + i, self.y),
                Orientation::Vertical => (self.x, self.y + i),
            })
            .collect()
    }

    /// Record a hit if (x, y) lies on the footprint. Returns whether it did.
    pub fn register_hit(&mut self, x: usize, y: usize) -> bool {
        if self.cells().contains(&(x, y)) {
            self.hits.insert((x, y));
            return true;
        }

        false
    }

    /// A ship sinks exactly when its whole footprint has been hit.
    pub fn is_sunk(&self) -> bool {
        self.hits.len() == self.size
    }
}

/// A requested ship position, as carried by `PLACEMENT_NAVIRES`.
///
/// Coordinates are signed on the wire; bounds are checked when the
/// placement is applied to a grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipPlacement {
    pub name: String,
    pub size: usize,
    pub x: i32,
    pub y: i32,
    pub orientation: Orientation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unplaced_ship_occupies_nothing() {
        let ship = Ship::new("Torpilleur", 2);
        assert!(ship.cells().is_empty());
        assert!(!ship.is_sunk());
    }

    #[test]
    fn footprint_follows_orientation() {
        let mut ship = Ship::new("Croiseur", 4);
        ship.place(2, 5, Orientation::Horizontal);
        assert_eq!(ship.cells(), vec![(2, 5), (3, 5), (4, 5), (5, 5)]);

        ship.place(2, 5, Orientation::Vertical);
        assert_eq!(ship.cells(), vec![(2, 5), (2, 6), (2, 7), (2, 8)]);
    }

    #[test]
    fn hits_only_register_on_the_footprint() {
        let mut ship = Ship::new("Torpilleur", 2);
        ship.place(0, 0, Orientation::Horizontal);

        assert!(!ship.register_hit(5, 5));
        assert!(ship.hits.is_empty());

        assert!(ship.register_hit(0, 0));
        assert!(ship.register_hit(0, 0));
        assert_eq!(ship.hits.len(), 1);
        assert!(!ship.is_sunk());

        assert!(ship.register_hit(1, 0));
        assert!(ship.is_sunk());
    }

    #[test]
    fn snapshot_round_trip() {
        let mut ship = Ship::new("Sous-marin", 3);
        ship.place(4, 4, Orientation::Vertical);
        ship.register_hit(4, 5);

        let json = serde_json::to_string(&ship).unwrap();
        assert!(json.contains("\"nom\""));
        assert!(json.contains("\"cases_touchees\""));

        let back: Ship = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ship);
    }
}
