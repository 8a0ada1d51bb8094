use serde::{Deserialize, Serialize};
use std::fmt;

pub mod game;
pub mod player;
pub mod protocol;
pub mod ship;

pub use game::{Game, GameState, ShotOutcome};
pub use player::{Cell, Grid, Player};
pub use ship::{Ship, ShipPlacement};

/// Side length of the default square grid.
pub const DEFAULT_GRID_SIZE: usize = 10;

/// Default UDP port for the authentication exchange.
pub const DEFAULT_AUTH_PORT: u16 = 5554;

/// Default TCP port for the gameplay stream.
pub const DEFAULT_GAME_PORT: u16 = 5555;

/// Minimum accepted password length at registration.
pub const DEFAULT_MIN_PASSWORD: usize = 4;

/// Name under which the random-target opponent plays solo games.
pub const AI_NAME: &str = "SERVEUR_IA";

/// The reduced fleet used by default: a single two-cell ship.
pub const DEFAULT_FLEET: &[(&str, usize)] = &[("Torpilleur", 2)];

/// The full classic fleet, selectable through server configuration.
pub const CLASSIC_FLEET: &[(&str, usize)] = &[
    ("Porte-avions", 5),
    ("Croiseur", 4),
    ("Contre-torpilleur", 3),
    ("Sous-marin", 3),
    ("Torpilleur", 2),
];

/// Orientation of a ship on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    #[serde(rename = "H")]
    Horizontal,
    #[serde(rename = "V")]
    Vertical,
}

/// Outcome of a single shot, as reported on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShotResult {
    /// The shot landed in the water (or outside the grid).
    #[serde(rename = "RATE")]
    Miss,
    /// A ship was hit but not sunk.
    #[serde(rename = "TOUCHE")]
    Hit,
    /// The hit completed a ship.
    #[serde(rename = "COULE")]
    Sunk,
    /// The cell was already resolved; nothing changed.
    #[serde(rename = "DEJA_TIRE")]
    AlreadyFired,
}

/// The two ways of playing a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    /// Against the server's random-target opponent.
    #[serde(rename = "VS_SERVEUR")]
    VsServer,
    /// Against another connected player.
    #[serde(rename = "VS_JOUEUR")]
    VsPlayer,
}

impl fmt::Display for ShotResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ShotResult::Miss => write!(f, "RATE"),
            ShotResult::Hit => write!(f, "TOUCHE"),
            ShotResult::Sunk => write!(f, "COULE"),
            ShotResult::AlreadyFired => write!(f, "DEJA_TIRE"),
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GameMode::VsServer => write!(f, "VS_SERVEUR"),
            GameMode::VsPlayer => write!(f, "VS_JOUEUR"),
        }
    }
}
