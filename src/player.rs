use std::convert::TryFrom;
use std::error::Error;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ship::{Ship, ShipPlacement};
use crate::{Orientation, ShotResult};

/// State of one grid cell. Persisted as the integers 0..=3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Cell {
    Water,
    Ship,
    Hit,
    Miss,
}

impl From<Cell> for u8 {
    fn from(cell: Cell) -> u8 {
        match cell {
            Cell::Water => 0,
            Cell::Ship => 1,
            Cell::Hit => 2,
            Cell::Miss => 3,
        }
    }
}

impl TryFrom<u8> for Cell {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Cell::Water),
            1 => Ok(Cell::Ship),
            2 => Ok(Cell::Hit),
            3 => Ok(Cell::Miss),
            other => Err(format!("invalid cell value: {}", other)),
        }
    }
}

/// A square grid, indexed `grid[y][x]`: x is the column, y the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grid(Vec<Vec<Cell>>);

impl Grid {
    pub fn new(size: usize) -> Self {
        Grid(vec![vec![Cell::Water; size]; size])
    }

    pub fn size(&self) -> usize {
        self.0.len()
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        let size = self.size() as i32;
        x >= 0 && x < size && y >= 0 && y < size
    }

    pub fn get(&self, x: usize, y: usize) -> Cell {
        self.0[y][x]
    }

    pub fn set(&mut self, x: usize, y: usize, cell: Cell) {
        self.0[y][x] = cell;
    }

    /// Number of cells currently holding `cell`.
    pub fn count(&self, cell: Cell) -> usize {
        self.0
            .iter()
            .map(|row| row.iter().filter(|c| **c == cell).count())
            .sum()
    }
}

/// Raised when random placement cannot fit a ship after 1000 attempts.
/// This is a server-fatal condition; it cannot occur with the default
/// fleet on a 10x10 grid.
#[derive(Debug)]
pub struct PlacementExhausted {
    pub ship: String,
}

impl fmt::Display for PlacementExhausted {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unable to place ship {} after 1000 attempts", self.ship)
    }
}

impl Error for PlacementExhausted {}

/// One side of a game: the player's own grid, the tracking grid
/// recording shots aimed at the opponent, and the fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(rename = "grille")]
    pub grid: Grid,
    #[serde(rename = "grille_suivi")]
    pub tracking: Grid,
    #[serde(rename = "navires")]
    pub ships: Vec<Ship>,
}

impl Player {
    /// A fresh player with empty grids and one unplaced ship per fleet entry.
    pub fn new(name: &str, grid_size: usize, fleet: &[(&str, usize)]) -> Self {
        Player {
            name: name.to_string(),
            grid: Grid::new(grid_size),
            tracking: Grid::new(grid_size),
            ships: fleet.iter().map(|(n, s)| Ship::new(n, *s)).collect(),
        }
    }

    /// Whether a ship of `size` fits at (x, y) without leaving the grid
    /// or overlapping an already placed ship.
    pub fn placement_is_valid(
        &self,
        size: usize,
        x: i32,
        y: i32,
        orientation: Orientation,
    ) -> bool {
        if x < 0 || y < 0 {
            return false;
        }

        let (last_x, last_y) = match orientation {
            Orientation::Horizontal => (x + size as i32 - 1, y),
            Orientation::Vertical => (x, y + size as i32 - 1),
        };
        if !self.grid.in_bounds(last_x, last_y) {
            return false;
        }

        (0..size).all(|i| {
            let (cx, cy) = match orientation {
                Orientation::Horizontal => (x as usize + i, y as usize),
                Orientation::Vertical => (x as usize, y as usize + i),
            };
            self.grid.get(cx, cy) == Cell::Water
        })
    }

    /// Place the ship at `index`, stamping its footprint on the grid.
    pub fn place_ship(&mut self, index: usize, x: i32, y: i32, orientation: Orientation) -> bool {
        let size = self.ships[index].size;
        if !self.placement_is_valid(size, x, y, orientation) {
            return false;
        }

        self.ships[index].place(x as usize, y as usize, orientation);
        for (cx, cy) in self.ships[index].cells() {
            self.grid.set(cx, cy, Cell::Ship);
        }

        true
    }

    /// Apply a client-requested placement of the whole fleet.
    ///
    /// The request must cover exactly the configured fleet (same names
    /// and sizes); any bounds or overlap violation rejects the whole
    /// request and leaves the previous state intact.
    pub fn place_from_positions(&mut self, positions: &[ShipPlacement]) -> bool {
        if positions.len() != self.ships.len() {
            return false;
        }

        let mut expected: Vec<(String, usize)> = self
            .ships
            .iter()
            .map(|s| (s.name.clone(), s.size))
            .collect();
        expected.sort();
        let mut requested: Vec<(String, usize)> = positions
            .iter()
            .map(|p| (p.name.clone(), p.size))
            .collect();
        requested.sort();
        if expected != requested {
            return false;
        }

        let mut staged = Player::new(
            &self.name,
            self.grid.size(),
            &positions
                .iter()
                .map(|p| (p.name.as_str(), p.size))
                .collect::<Vec<_>>(),
        );
        for (i, pos) in positions.iter().enumerate() {
            if !staged.place_ship(i, pos.x, pos.y, pos.orientation) {
                return false;
            }
        }

        self.grid = staged.grid;
        self.ships = staged.ships;
        true
    }

    /// Randomly place every ship that is not placed yet.
    pub fn auto_place<R: Rng>(&mut self, rng: &mut R) -> Result<(), PlacementExhausted> {
        let size = self.grid.size();

        for index in 0..self.ships.len() {
            if self.ships[index].placed {
                continue;
            }

            let mut placed = false;
            for _ in 0..1000 {
                let x = rng.gen_range(0..size) as i32;
                let y = rng.gen_range(0..size) as i32;
                let orientation = if rng.gen_bool(0.5) {
                    Orientation::Horizontal
                } else {
                    Orientation::Vertical
                };

                if self.place_ship(index, x, y, orientation) {
                    placed = true;
                    break;
                }
            }

            if !placed {
                return Err(PlacementExhausted {
                    ship: self.ships[index].name.clone(),
                });
            }
        }

        Ok(())
    }

    /// Resolve a shot aimed at this player's grid.
    ///
    /// Out-of-bounds coordinates count as a miss without touching any
    /// state. A cell that already resolved returns `AlreadyFired` and
    /// changes nothing.
    pub fn receive_shot(&mut self, x: i32, y: i32) -> (ShotResult, Option<String>) {
        if !self.grid.in_bounds(x, y) {
            return (ShotResult::Miss, None);
        }
        let (x, y) = (x as usize, y as usize);

        match self.grid.get(x, y) {
            Cell::Hit | Cell::Miss => (ShotResult::AlreadyFired, None),
            Cell::Water => {
                self.grid.set(x, y, Cell::Miss);
                (ShotResult::Miss, None)
            }
            Cell::Ship => {
                self.grid.set(x, y, Cell::Hit);

                for ship in self.ships.iter_mut() {
                    if ship.register_hit(x, y) {
                        if ship.is_sunk() {
                            return (ShotResult::Sunk, Some(ship.name.clone()));
                        }
                        return (ShotResult::Hit, None);
                    }
                }

                (ShotResult::Hit, None)
            }
        }
    }

    /// Record the outcome of this player's own shot on the tracking grid.
    pub fn record_shot(&mut self, x: i32, y: i32, result: ShotResult) {
        if !self.tracking.in_bounds(x, y) {
            return;
        }

        let cell = match result {
            ShotResult::Miss => Cell::Miss,
            _ => Cell::Hit,
        };
        self.tracking.set(x as usize, y as usize, cell);
    }

    pub fn all_ships_sunk(&self) -> bool {
        self.ships.iter().all(Ship::is_sunk)
    }

    /// A random cell this player has not fired at yet, for the AI
    /// opponent. Falls back to (0, 0) after 1000 attempts.
    pub fn random_untried<R: Rng>(&self, rng: &mut R) -> (i32, i32) {
        let size = self.tracking.size();

        for _ in 0..1000 {
            let x = rng.gen_range(0..size);
            let y = rng.gen_range(0..size);
            if self.tracking.get(x, y) == Cell::Water {
                return (x as i32, y as i32);
            }
        }

        (0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_FLEET;

    fn player() -> Player {
        Player::new("alice", 10, DEFAULT_FLEET)
    }

    #[test]
    fn placement_rejects_out_of_bounds_and_overlap() {
        let mut p = player();
        assert!(!p.placement_is_valid(2, 9, 0, Orientation::Horizontal));
        assert!(!p.placement_is_valid(2, 0, 9, Orientation::Vertical));
        assert!(!p.placement_is_valid(2, -1, 0, Orientation::Horizontal));

        assert!(p.place_ship(0, 0, 0, Orientation::Horizontal));
        assert!(!p.placement_is_valid(2, 1, 0, Orientation::Vertical));
    }

    #[test]
    fn fleet_placement_must_match_configuration() {
        let mut p = player();

        // Wrong ship entirely.
        assert!(!p.place_from_positions(&[ShipPlacement {
            name: "Croiseur".into(),
            size: 4,
            x: 0,
            y: 0,
            orientation: Orientation::Horizontal,
        }]));

        // Right ship, bad coordinates.
        assert!(!p.place_from_positions(&[ShipPlacement {
            name: "Torpilleur".into(),
            size: 2,
            x: 9,
            y: 0,
            orientation: Orientation::Horizontal,
        }]));
        assert_eq!(p.grid.count(Cell::Ship), 0);

        assert!(p.place_from_positions(&[ShipPlacement {
            name: "Torpilleur".into(),
            size: 2,
            x: 0,
            y: 0,
            orientation: Orientation::Horizontal,
        }]));
        assert_eq!(p.grid.count(Cell::Ship), 2);
        assert_eq!(p.grid.get(0, 0), Cell::Ship);
        assert_eq!(p.grid.get(1, 0), Cell::Ship);
    }

    #[test]
    fn shots_resolve_per_cell_state() {
        let mut p = player();
        assert!(p.place_ship(0, 3, 3, Orientation::Vertical));

        // Out of bounds is a miss that changes nothing.
        assert_eq!(p.receive_shot(42, 0), (ShotResult::Miss, None));
        assert_eq!(p.grid.count(Cell::Miss), 0);

        assert_eq!(p.receive_shot(0, 0), (ShotResult::Miss, None));
        assert_eq!(p.grid.get(0, 0), Cell::Miss);

        assert_eq!(p.receive_shot(3, 3), (ShotResult::Hit, None));
        assert_eq!(
            p.receive_shot(3, 4),
            (ShotResult::Sunk, Some("Torpilleur".into()))
        );
        assert!(p.all_ships_sunk());
    }

    #[test]
    fn duplicate_shot_changes_nothing() {
        let mut p = player();
        assert!(p.place_ship(0, 0, 0, Orientation::Horizontal));

        assert_eq!(p.receive_shot(0, 0), (ShotResult::Hit, None));
        let before = p.clone();

        assert_eq!(p.receive_shot(0, 0), (ShotResult::AlreadyFired, None));
        assert_eq!(p, before);
    }

    #[test]
    fn hit_cells_match_ship_hit_sets() {
        let mut p = player();
        assert!(p.place_ship(0, 2, 2, Orientation::Horizontal));

        p.receive_shot(2, 2);
        p.receive_shot(5, 5);
        p.receive_shot(3, 2);

        let total_hits: usize = p.ships.iter().map(|s| s.hits.len()).sum();
        assert_eq!(p.grid.count(Cell::Hit), total_hits);
    }

    #[test]
    fn auto_place_fits_the_classic_fleet() {
        let mut p = Player::new("bob", 10, crate::CLASSIC_FLEET);
        p.auto_place(&mut rand::thread_rng()).unwrap();

        assert!(p.ships.iter().all(|s| s.placed));
        let expected: usize = crate::CLASSIC_FLEET.iter().map(|(_, s)| s).sum();
        assert_eq!(p.grid.count(Cell::Ship), expected);
    }

    #[test]
    fn tracking_grid_records_own_shots() {
        let mut p = player();
        p.record_shot(1, 1, ShotResult::Miss);
        p.record_shot(2, 2, ShotResult::Hit);
        p.record_shot(42, 42, ShotResult::Hit);

        assert_eq!(p.tracking.get(1, 1), Cell::Miss);
        assert_eq!(p.tracking.get(2, 2), Cell::Hit);

        let (x, y) = p.random_untried(&mut rand::thread_rng());
        assert_ne!((x, y), (1, 1));
        assert_ne!((x, y), (2, 2));
    }

    #[test]
    fn snapshot_round_trip() {
        let mut p = player();
        assert!(p.place_ship(0, 4, 4, Orientation::Horizontal));
        p.receive_shot(4, 4);
        p.record_shot(7, 7, ShotResult::Miss);

        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("\"grille\""));
        assert!(json.contains("\"grille_suivi\""));

        let back: Player = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
