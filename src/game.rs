use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::player::{PlacementExhausted, Player};
use crate::ShotResult;

/// Lifecycle of a game. Persisted under the historical state strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    #[serde(rename = "EN_ATTENTE")]
    Pending,
    #[serde(rename = "EN_COURS")]
    InProgress,
    #[serde(rename = "MIS_EN_PAUSE")]
    Paused,
    #[serde(rename = "TERMINEE")]
    Finished,
    #[serde(rename = "ABANDONNEE")]
    Abandoned,
}

/// What a resolved shot did to the game.
#[derive(Debug, Clone, PartialEq)]
pub struct ShotOutcome {
    pub result: ShotResult,
    /// Name of the ship the shot sank, if any.
    pub sunk: Option<String>,
    /// Whether the shot ended the game.
    pub finished: bool,
}

/// A full game between two players.
///
/// The struct is pure data and rules; all I/O and locking live with the
/// caller. `player1_turn` is the single authoritative turn flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    #[serde(rename = "joueur1")]
    pub player1: Player,
    #[serde(rename = "joueur2")]
    pub player2: Player,
    #[serde(rename = "etat")]
    pub state: GameState,
    #[serde(rename = "tour_joueur1")]
    pub player1_turn: bool,
    #[serde(rename = "gagnant")]
    pub winner: Option<String>,
}

impl Game {
    pub fn new(player1: Player, player2: Player) -> Self {
        Game {
            player1,
            player2,
            state: GameState::Pending,
            player1_turn: true,
            winner: None,
        }
    }

    /// Move the game to `InProgress`, randomly placing any ship that
    /// was not placed manually. A no-op for fully placed fleets.
    pub fn start<R: Rng>(&mut self, rng: &mut R) -> Result<(), PlacementExhausted> {
        if !self.player1.ships.iter().all(|s| s.placed) {
            self.player1.auto_place(rng)?;
        }
        if !self.player2.ships.iter().all(|s| s.placed) {
            self.player2.auto_place(rng)?;
        }

        self.state = GameState::InProgress;
        Ok(())
    }

    /// Resolve a shot by the current player against the other side.
    ///
    /// Returns `None` when the game is not in progress. The turn flips
    /// only when the result is not `AlreadyFired` and the shot did not
    /// end the game.
    pub fn apply_shot(&mut self, x: i32, y: i32) -> Option<ShotOutcome> {
        if self.state != GameState::InProgress {
            return None;
        }

        let (result, sunk) = if self.player1_turn {
            self.player2.receive_shot(x, y)
        } else {
            self.player1.receive_shot(x, y)
        };

        if result == ShotResult::AlreadyFired {
            return Some(ShotOutcome {
                result,
                sunk,
                finished: false,
            });
        }

        let target_defeated = if self.player1_turn {
            self.player1.record_shot(x, y, result);
            self.player2.all_ships_sunk()
        } else {
            self.player2.record_shot(x, y, result);
            self.player1.all_ships_sunk()
        };

        if target_defeated {
            self.state = GameState::Finished;
            self.winner = Some(self.current_player_name().to_string());
            return Some(ShotOutcome {
                result,
                sunk,
                finished: true,
            });
        }

        self.player1_turn = !self.player1_turn;
        Some(ShotOutcome {
            result,
            sunk,
            finished: false,
        })
    }

    /// Forfeit by `loser`; the other player wins.
    pub fn abandon(&mut self, loser: &str) {
        self.state = GameState::Abandoned;
        self.winner = if self.player1.name == loser {
            Some(self.player2.name.clone())
        } else {
            Some(self.player1.name.clone())
        };
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, GameState::Finished | GameState::Abandoned)
    }

    pub fn current_player_name(&self) -> &str {
        if self.player1_turn {
            &self.player1.name
        } else {
            &self.player2.name
        }
    }

    pub fn is_turn_of(&self, name: &str) -> bool {
        self.current_player_name() == name
    }

    /// The opponent of `name`, if `name` plays in this game.
    pub fn opponent_of(&self, name: &str) -> Option<&Player> {
        if self.player1.name == name {
            Some(&self.player2)
        } else if self.player2.name == name {
            Some(&self.player1)
        } else {
            None
        }
    }

    pub fn side_of(&self, name: &str) -> Option<&Player> {
        if self.player1.name == name {
            Some(&self.player1)
        } else if self.player2.name == name {
            Some(&self.player2)
        } else {
            None
        }
    }
}
