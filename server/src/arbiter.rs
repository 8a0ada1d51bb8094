use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use battleship::game::{Game, GameState};
use battleship::player::Player;
use battleship::protocol::Message;
use battleship::{ShipPlacement, ShotResult};

use crate::error::ServerError;
use crate::hub::{Hub, Notice};
use crate::store::UserStore;
use crate::Config;

/// Outcome of a placement request against the arbiter's ledger.
#[derive(Debug, PartialEq, Eq)]
pub enum PlacementStatus {
    /// Placement stored; `PLACEMENT_OK` queued, game may have started.
    Accepted,
    /// Bounds, overlap or fleet mismatch; the session stays in placement.
    Invalid,
    /// The player has no registered game.
    NoGame,
}

/// A player waiting for the other side of a saved game to come back.
struct ResumeEntry {
    name: String,
    opponent: String,
    game: Game,
}

#[derive(Default)]
struct ArbiterState {
    /// FIFO of players waiting for a fresh opponent.
    queue: VecDeque<String>,
    /// Players waiting to resume a saved two-player game.
    resume_queue: Vec<ResumeEntry>,
    games: HashMap<u64, Game>,
    by_player: HashMap<String, u64>,
    /// Placement-ready flags per game: (player1, player2).
    ready: HashMap<u64, (bool, bool)>,
}

/// Registry of active two-player games and the matchmaking queue.
///
/// The arbiter owns every player-versus-player game for its lifetime
/// and linearizes shots through its lock. All notifications are sent
/// while the lock is held, so neither client can observe the new turn
/// owner before the shot result.
pub struct Arbiter {
    hub: Arc<Hub>,
    config: Arc<Config>,
    state: Mutex<ArbiterState>,
    next_game_id: AtomicU64,
}

impl Arbiter {
    pub fn new(hub: Arc<Hub>, config: Arc<Config>) -> Self {
        Arbiter {
            hub,
            config,
            state: Mutex::new(ArbiterState::default()),
            next_game_id: AtomicU64::new(1),
        }
    }

    /// Queue `name` for matchmaking, pairing it with the queue head if
    /// one is waiting. Dequeue and game creation are atomic; both
    /// players learn of the match before the lock is released, and only
    /// an unmatched newcomer is told to wait.
    pub async fn enqueue(&self, name: &str) {
        let mut state = self.state.lock().await;

        let head_waits = matches!(state.queue.front(), Some(head) if head != name);
        if head_waits {
            let head = state.queue.pop_front().unwrap_or_default();
            let id = self.next_game_id.fetch_add(1, Ordering::Relaxed);

            let fleet = self.config.fleet_refs();
            let player1 = Player::new(&head, self.config.grid_size, &fleet);
            let player2 = Player::new(name, self.config.grid_size, &fleet);
            state.games.insert(id, Game::new(player1, player2));
            state.by_player.insert(head.clone(), id);
            state.by_player.insert(name.to_string(), id);
            state.ready.insert(id, (false, false));

            tracing::info!(game = id, player1 = %head, player2 = %name, "match formed");
            self.hub.send(
                &head,
                Notice::MatchFound {
                    opponent: name.to_string(),
                },
            );
            self.hub.send(
                name,
                Notice::MatchFound {
                    opponent: head,
                },
            );
        } else {
            state.queue.push_back(name.to_string());
            self.hub
                .send(name, Notice::Relay(Message::AttenteAdversaire {}));
            tracing::info!(player = %name, "queued for matchmaking");
        }
    }

    /// Queue `name` to resume `game` against a human opponent. When the
    /// opponent's matching entry is already waiting, the earlier
    /// snapshot is restored and both sides are started with the
    /// preserved turn flag; placement is skipped.
    pub async fn enqueue_resume(&self, name: &str, game: Game) {
        let opponent = match game.opponent_of(name) {
            Some(player) => player.name.clone(),
            None => return,
        };

        let mut state = self.state.lock().await;

        let matching = state
            .resume_queue
            .iter()
            .position(|entry| entry.name == opponent && entry.opponent == name);
        match matching {
            Some(index) => {
                let entry = state.resume_queue.remove(index);
                let mut game = entry.game;
                game.state = GameState::InProgress;

                let id = self.next_game_id.fetch_add(1, Ordering::Relaxed);
                state.by_player.insert(game.player1.name.clone(), id);
                state.by_player.insert(game.player2.name.clone(), id);

                tracing::info!(game = id, player1 = %game.player1.name, player2 = %game.player2.name, "saved game resumed");
                for player in [&game.player1.name, &game.player2.name] {
                    self.hub.send(
                        player,
                        Notice::GameStart {
                            opponent: game
                                .opponent_of(player)
                                .map(|p| p.name.clone())
                                .unwrap_or_default(),
                            your_turn: game.is_turn_of(player),
                        },
                    );
                }
                state.games.insert(id, game);
            }
            None => {
                state.resume_queue.push(ResumeEntry {
                    name: name.to_string(),
                    opponent,
                    game,
                });
                self.hub
                    .send(name, Notice::Relay(Message::AttenteAdversaire {}));
                tracing::info!(player = %name, "waiting to resume against opponent");
            }
        }
    }

    /// Apply a manual placement and mark the player ready. When both
    /// sides are ready the game starts and both sessions are notified
    /// of the first turn.
    pub async fn place_ready(
        &self,
        name: &str,
        ships: &[ShipPlacement],
    ) -> Result<PlacementStatus, ServerError> {
        let mut state = self.state.lock().await;

        let id = match state.by_player.get(name) {
            Some(id) => *id,
            None => return Ok(PlacementStatus::NoGame),
        };
        let game = match state.games.get_mut(&id) {
            Some(game) => game,
            None => return Ok(PlacementStatus::NoGame),
        };

        let is_player1 = game.player1.name == name;
        let side = if is_player1 {
            &mut game.player1
        } else {
            &mut game.player2
        };
        if !side.place_from_positions(ships) {
            return Ok(PlacementStatus::Invalid);
        }

        self.hub.send(name, Notice::Relay(Message::PlacementOk {}));

        let flags = state.ready.entry(id).or_insert((false, false));
        if is_player1 {
            flags.0 = true;
        } else {
            flags.1 = true;
        }

        if *flags == (true, true) {
            state.ready.remove(&id);
            let game = match state.games.get_mut(&id) {
                Some(game) => game,
                None => return Ok(PlacementStatus::NoGame),
            };
            game.start(&mut rand::thread_rng())?;

            tracing::info!(game = id, "both fleets placed, game starting");
            for player in [&game.player1.name, &game.player2.name] {
                self.hub.send(
                    player,
                    Notice::GameStart {
                        opponent: game
                            .opponent_of(player)
                            .map(|p| p.name.clone())
                            .unwrap_or_default(),
                        your_turn: game.is_turn_of(player),
                    },
                );
            }
        }

        Ok(PlacementStatus::Accepted)
    }

    /// Resolve a shot from `name` against its registered game.
    ///
    /// Every resulting frame, including the rejection cases, is queued
    /// through the hub so a client's stream stays ordered.
    pub async fn handle_shot(&self, name: &str, x: i32, y: i32) {
        let mut state = self.state.lock().await;

        let id = match state.by_player.get(name) {
            Some(id) => *id,
            None => {
                self.hub
                    .send(name, Notice::Relay(Message::erreur("no active game")));
                return;
            }
        };
        let game = match state.games.get_mut(&id) {
            Some(game) => game,
            None => {
                self.hub
                    .send(name, Notice::Relay(Message::erreur("no active game")));
                return;
            }
        };

        if !game.is_turn_of(name) {
            self.hub
                .send(name, Notice::Relay(Message::erreur("not your turn")));
            return;
        }

        let outcome = match game.apply_shot(x, y) {
            Some(outcome) => outcome,
            None => {
                self.hub
                    .send(name, Notice::Relay(Message::erreur("game is not in progress")));
                return;
            }
        };
        let opponent = game
            .opponent_of(name)
            .map(|p| p.name.clone())
            .unwrap_or_default();

        self.hub.send(
            name,
            Notice::Relay(Message::ReponseTir {
                resultat: outcome.result,
                x,
                y,
                bateau_coule: outcome.sunk.clone(),
            }),
        );

        if outcome.result == ShotResult::AlreadyFired {
            return;
        }

        let opponent_alive = self.hub.send(
            &opponent,
            Notice::Relay(Message::ReponseTirRecu {
                resultat: outcome.result,
                x,
                y,
                adversaire: name.to_string(),
                bateau_coule: outcome.sunk.clone(),
            }),
        );
        if !opponent_alive {
            // The peer is gone; the shooter wins by forfeit.
            tracing::warn!(game = id, player = %opponent, "write to opponent failed, closing game");
            remove_game(&mut state, id);
            self.hub.send(
                name,
                Notice::GameOver(Message::FinPartie {
                    gagnant: None,
                    status: Some("VICTOIRE".to_string()),
                    message: "opponent disconnected".to_string(),
                }),
            );
            return;
        }

        if outcome.finished {
            tracing::info!(game = id, winner = %name, "game finished");
            remove_game(&mut state, id);
            self.hub.send(
                name,
                Notice::GameOver(Message::FinPartie {
                    gagnant: None,
                    status: Some("VICTOIRE".to_string()),
                    message: "all opposing ships sunk".to_string(),
                }),
            );
            self.hub.send(
                &opponent,
                Notice::GameOver(Message::FinPartie {
                    gagnant: None,
                    status: Some("DEFAITE".to_string()),
                    message: "your fleet was sunk".to_string(),
                }),
            );
        } else {
            // The turn flipped: the opponent plays next.
            self.hub.send(&opponent, Notice::Relay(Message::VotreTour {}));
            self.hub
                .send(name, Notice::Relay(Message::TourAdversaire {}));
        }
    }

    /// Relay a chat line to the opponent. The sender renders its own
    /// copy locally; no self-echo. Dropped when there is no game.
    pub async fn relay_chat(&self, name: &str, text: &str) {
        let state = self.state.lock().await;

        let opponent = state
            .by_player
            .get(name)
            .and_then(|id| state.games.get(id))
            .and_then(|game| game.opponent_of(name))
            .map(|player| player.name.clone());

        if let Some(opponent) = opponent {
            self.hub.send(
                &opponent,
                Notice::Relay(Message::ChatGlobal {
                    envoyeur: name.to_string(),
                    message: text.to_string(),
                }),
            );
        }
    }

    /// Snapshot the player's live game into the store. Returns false
    /// when there is no game or the store has no record for `name`.
    pub async fn save_game(&self, name: &str, store: &UserStore) -> Result<bool, ServerError> {
        let state = self.state.lock().await;

        let game = state
            .by_player
            .get(name)
            .and_then(|id| state.games.get(id));
        match game {
            Some(game) => store.save_game(name, game),
            None => Ok(false),
        }
    }

    /// Forfeit by `name`: the opponent is declared winner and the game
    /// is removed.
    pub async fn abandon(&self, name: &str) {
        let mut state = self.state.lock().await;

        if let Some(id) = state.by_player.get(name).copied() {
            if let Some(game) = state.games.get_mut(&id) {
                game.abandon(name);
                let opponent = game
                    .opponent_of(name)
                    .map(|p| p.name.clone())
                    .unwrap_or_default();

                tracing::info!(game = id, player = %name, "game abandoned");
                self.hub.send(
                    &opponent,
                    Notice::GameOver(Message::FinPartie {
                        gagnant: None,
                        status: Some("VICTOIRE".to_string()),
                        message: "opponent abandoned the game".to_string(),
                    }),
                );
            }
            remove_game(&mut state, id);
        }
    }

    /// Clean up after a vanished session: drop it from the queues and,
    /// if it was in a live game, hand the victory to the survivor.
    /// Saved snapshots are untouched. Idempotent.
    pub async fn handle_disconnect(&self, name: &str) {
        let mut state = self.state.lock().await;

        state.queue.retain(|queued| queued != name);
        state.resume_queue.retain(|entry| entry.name != name);

        if let Some(id) = state.by_player.get(name).copied() {
            if let Some(game) = state.games.get_mut(&id) {
                if !game.is_finished() {
                    game.abandon(name);
                    let opponent = game
                        .opponent_of(name)
                        .map(|p| p.name.clone())
                        .unwrap_or_default();

                    tracing::info!(game = id, player = %name, "player disconnected mid-game");
                    self.hub.send(
                        &opponent,
                        Notice::GameOver(Message::FinPartie {
                            gagnant: None,
                            status: Some("VICTOIRE".to_string()),
                            message: "opponent disconnected".to_string(),
                        }),
                    );
                }
            }
            remove_game(&mut state, id);
        }
    }
}

/// Drop a game and every index entry pointing at it. Idempotent.
fn remove_game(state: &mut ArbiterState, id: u64) {
    state.ready.remove(&id);
    if let Some(game) = state.games.remove(&id) {
        state.by_player.remove(&game.player1.name);
        state.by_player.remove(&game.player2.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::Rx;
    use battleship::{Orientation, DEFAULT_FLEET, DEFAULT_GRID_SIZE};

    fn config() -> Arc<Config> {
        Arc::new(Config {
            grid_size: DEFAULT_GRID_SIZE,
            fleet: DEFAULT_FLEET
                .iter()
                .map(|(n, s)| (n.to_string(), *s))
                .collect(),
        })
    }

    fn setup(names: &[&str]) -> (Arc<Hub>, Arbiter, Vec<Rx>) {
        let hub = Arc::new(Hub::new());
        let receivers = names
            .iter()
            .map(|name| {
                let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
                hub.register(name, tx);
                rx
            })
            .collect();
        let arbiter = Arbiter::new(hub.clone(), config());
        (hub, arbiter, receivers)
    }

    fn placement() -> Vec<ShipPlacement> {
        vec![ShipPlacement {
            name: "Torpilleur".into(),
            size: 2,
            x: 0,
            y: 0,
            orientation: Orientation::Horizontal,
        }]
    }

    fn drain(rx: &mut Rx) -> Vec<Notice> {
        let mut notices = Vec::new();
        while let Ok(notice) = rx.try_recv() {
            notices.push(notice);
        }
        notices
    }

    #[tokio::test]
    async fn matchmaking_pairs_fifo() {
        let (_hub, arbiter, mut rxs) = setup(&["alice", "bob"]);

        arbiter.enqueue("alice").await;
        let notices = drain(&mut rxs[0]);
        assert!(matches!(
            notices.as_slice(),
            [Notice::Relay(Message::AttenteAdversaire {})]
        ));

        arbiter.enqueue("bob").await;

        // Bob is paired immediately, without an intervening wait notice.
        let notices = drain(&mut rxs[1]);
        match notices.as_slice() {
            [Notice::MatchFound { opponent }] => assert_eq!(opponent, "alice"),
            other => panic!("unexpected notices: {:?}", other),
        }
        let notices = drain(&mut rxs[0]);
        match notices.as_slice() {
            [Notice::MatchFound { opponent }] => assert_eq!(opponent, "bob"),
            other => panic!("unexpected notices: {:?}", other),
        }
    }

    #[tokio::test]
    async fn game_starts_when_both_sides_are_ready() {
        let (_hub, arbiter, mut rxs) = setup(&["alice", "bob"]);
        arbiter.enqueue("alice").await;
        arbiter.enqueue("bob").await;
        drain(&mut rxs[0]);
        drain(&mut rxs[1]);

        let status = arbiter.place_ready("alice", &placement()).await.unwrap();
        assert_eq!(status, PlacementStatus::Accepted);
        assert!(matches!(
            drain(&mut rxs[0]).as_slice(),
            [Notice::Relay(Message::PlacementOk {})]
        ));

        arbiter.place_ready("bob", &placement()).await.unwrap();

        // Alice queued first, so she is player1 and plays first.
        match drain(&mut rxs[0]).as_slice() {
            [Notice::GameStart { opponent, your_turn }] => {
                assert_eq!(opponent, "bob");
                assert!(*your_turn);
            }
            other => panic!("unexpected notices: {:?}", other),
        }
        match drain(&mut rxs[1]).as_slice() {
            [Notice::Relay(Message::PlacementOk {}), Notice::GameStart { opponent, your_turn }] => {
                assert_eq!(opponent, "alice");
                assert!(!*your_turn);
            }
            other => panic!("unexpected notices: {:?}", other),
        }
    }

    #[tokio::test]
    async fn invalid_placement_is_rejected() {
        let (_hub, arbiter, mut rxs) = setup(&["alice", "bob"]);
        arbiter.enqueue("alice").await;
        arbiter.enqueue("bob").await;
        drain(&mut rxs[0]);

        let bad = vec![ShipPlacement {
            name: "Torpilleur".into(),
            size: 2,
            x: 9,
            y: 0,
            orientation: Orientation::Horizontal,
        }];
        let status = arbiter.place_ready("alice", &bad).await.unwrap();
        assert_eq!(status, PlacementStatus::Invalid);
        assert!(drain(&mut rxs[0]).is_empty());

        let status = arbiter.place_ready("nobody", &placement()).await.unwrap();
        assert_eq!(status, PlacementStatus::NoGame);
    }

    async fn started_pair(arbiter: &Arbiter, rxs: &mut Vec<Rx>) {
        arbiter.enqueue("alice").await;
        arbiter.enqueue("bob").await;
        arbiter.place_ready("alice", &placement()).await.unwrap();
        arbiter.place_ready("bob", &placement()).await.unwrap();
        drain(&mut rxs[0]);
        drain(&mut rxs[1]);
    }

    #[tokio::test]
    async fn shots_out_of_turn_are_rejected() {
        let (_hub, arbiter, mut rxs) = setup(&["alice", "bob"]);
        started_pair(&arbiter, &mut rxs).await;

        arbiter.handle_shot("bob", 0, 0).await;
        match drain(&mut rxs[1]).as_slice() {
            [Notice::Relay(Message::Erreur { message })] => {
                assert!(message.contains("not your turn"));
            }
            other => panic!("unexpected notices: {:?}", other),
        }
        // Alice saw nothing; the turn is still hers.
        assert!(drain(&mut rxs[0]).is_empty());
    }

    #[tokio::test]
    async fn a_resolved_shot_notifies_both_sides_and_flips_the_turn() {
        let (_hub, arbiter, mut rxs) = setup(&["alice", "bob"]);
        started_pair(&arbiter, &mut rxs).await;

        arbiter.handle_shot("alice", 5, 5).await;

        match drain(&mut rxs[0]).as_slice() {
            [Notice::Relay(Message::ReponseTir {
                resultat: ShotResult::Miss,
                x: 5,
                y: 5,
                ..
            }), Notice::Relay(Message::TourAdversaire {})] => {}
            other => panic!("unexpected notices: {:?}", other),
        }
        match drain(&mut rxs[1]).as_slice() {
            [Notice::Relay(Message::ReponseTirRecu {
                resultat: ShotResult::Miss,
                adversaire,
                ..
            }), Notice::Relay(Message::VotreTour {})] => assert_eq!(adversaire, "alice"),
            other => panic!("unexpected notices: {:?}", other),
        }
    }

    #[tokio::test]
    async fn duplicate_shots_do_not_reach_the_opponent() {
        let (_hub, arbiter, mut rxs) = setup(&["alice", "bob"]);
        started_pair(&arbiter, &mut rxs).await;

        arbiter.handle_shot("alice", 5, 5).await;
        arbiter.handle_shot("bob", 5, 5).await;
        drain(&mut rxs[0]);
        drain(&mut rxs[1]);

        // Alice repeats her own earlier shot.
        arbiter.handle_shot("alice", 5, 5).await;
        match drain(&mut rxs[0]).as_slice() {
            [Notice::Relay(Message::ReponseTir {
                resultat: ShotResult::AlreadyFired,
                ..
            })] => {}
            other => panic!("unexpected notices: {:?}", other),
        }
        assert!(drain(&mut rxs[1]).is_empty());

        // Still alice's turn.
        arbiter.handle_shot("alice", 6, 6).await;
        assert!(!drain(&mut rxs[0]).is_empty());
    }

    #[tokio::test]
    async fn sinking_the_fleet_ends_and_removes_the_game() {
        let (_hub, arbiter, mut rxs) = setup(&["alice", "bob"]);
        started_pair(&arbiter, &mut rxs).await;

        arbiter.handle_shot("alice", 0, 0).await;
        arbiter.handle_shot("bob", 9, 9).await;
        arbiter.handle_shot("alice", 1, 0).await;

        let notices = drain(&mut rxs[0]);
        match notices.last() {
            Some(Notice::GameOver(Message::FinPartie { status, .. })) => {
                assert_eq!(status.as_deref(), Some("VICTOIRE"));
            }
            other => panic!("unexpected notice: {:?}", other),
        }
        let notices = drain(&mut rxs[1]);
        match notices.last() {
            Some(Notice::GameOver(Message::FinPartie { status, .. })) => {
                assert_eq!(status.as_deref(), Some("DEFAITE"));
            }
            other => panic!("unexpected notice: {:?}", other),
        }

        // The registry forgot the game.
        arbiter.handle_shot("alice", 2, 2).await;
        match drain(&mut rxs[0]).as_slice() {
            [Notice::Relay(Message::Erreur { .. })] => {}
            other => panic!("unexpected notices: {:?}", other),
        }
    }

    #[tokio::test]
    async fn chat_reaches_the_opponent_only() {
        let (_hub, arbiter, mut rxs) = setup(&["alice", "bob"]);
        started_pair(&arbiter, &mut rxs).await;

        arbiter.relay_chat("alice", "bonjour").await;
        assert!(drain(&mut rxs[0]).is_empty());
        match drain(&mut rxs[1]).as_slice() {
            [Notice::Relay(Message::ChatGlobal { envoyeur, message })] => {
                assert_eq!(envoyeur, "alice");
                assert_eq!(message, "bonjour");
            }
            other => panic!("unexpected notices: {:?}", other),
        }

        // Chat without a game is dropped.
        arbiter.relay_chat("nobody", "hello?").await;
    }

    #[tokio::test]
    async fn disconnect_hands_the_victory_to_the_survivor() {
        let (_hub, arbiter, mut rxs) = setup(&["alice", "bob"]);
        started_pair(&arbiter, &mut rxs).await;

        arbiter.handle_disconnect("bob").await;

        match drain(&mut rxs[0]).as_slice() {
            [Notice::GameOver(Message::FinPartie { status, message, .. })] => {
                assert_eq!(status.as_deref(), Some("VICTOIRE"));
                assert!(message.contains("disconnected"));
            }
            other => panic!("unexpected notices: {:?}", other),
        }

        // Idempotent.
        arbiter.handle_disconnect("bob").await;
        assert!(drain(&mut rxs[0]).is_empty());
    }

    #[tokio::test]
    async fn waiting_players_are_dropped_on_disconnect() {
        let (_hub, arbiter, mut rxs) = setup(&["alice", "bob"]);

        arbiter.enqueue("alice").await;
        arbiter.handle_disconnect("alice").await;

        // Bob now waits instead of pairing with a ghost.
        arbiter.enqueue("bob").await;
        match drain(&mut rxs[1]).as_slice() {
            [Notice::Relay(Message::AttenteAdversaire {})] => {}
            other => panic!("unexpected notices: {:?}", other),
        }
    }

    #[tokio::test]
    async fn resume_waits_for_the_matching_opponent() {
        let (_hub, arbiter, mut rxs) = setup(&["alice", "bob"]);

        let mut p1 = Player::new("alice", DEFAULT_GRID_SIZE, DEFAULT_FLEET);
        let mut p2 = Player::new("bob", DEFAULT_GRID_SIZE, DEFAULT_FLEET);
        assert!(p1.place_ship(0, 0, 0, Orientation::Horizontal));
        assert!(p2.place_ship(0, 0, 0, Orientation::Horizontal));
        let mut saved = Game::new(p1, p2);
        saved.start(&mut rand::thread_rng()).unwrap();
        saved.apply_shot(0, 0).unwrap();
        saved.state = GameState::Paused;

        arbiter.enqueue_resume("alice", saved.clone()).await;
        assert!(matches!(
            drain(&mut rxs[0]).as_slice(),
            [Notice::Relay(Message::AttenteAdversaire {})]
        ));

        arbiter.enqueue_resume("bob", saved).await;

        // Alice hit at (0, 0) before the save, so bob plays next.
        match drain(&mut rxs[0]).as_slice() {
            [Notice::GameStart { opponent, your_turn }] => {
                assert_eq!(opponent, "bob");
                assert!(!*your_turn);
            }
            other => panic!("unexpected notices: {:?}", other),
        }
        match drain(&mut rxs[1]).as_slice() {
            [Notice::GameStart { opponent, your_turn }] => {
                assert_eq!(opponent, "alice");
                assert!(*your_turn);
            }
            other => panic!("unexpected notices: {:?}", other),
        }

        // The restored game is live and bob can shoot immediately.
        arbiter.handle_shot("bob", 5, 5).await;
        match drain(&mut rxs[1]).as_slice() {
            [Notice::Relay(Message::ReponseTir { .. }), Notice::Relay(Message::TourAdversaire {})] => {}
            other => panic!("unexpected notices: {:?}", other),
        }
    }
}
