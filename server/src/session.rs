use std::net::SocketAddr;

use futures::{sink::SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use battleship::game::{Game, GameState};
use battleship::player::Player;
use battleship::protocol::{self, Message};
use battleship::{GameMode, ShipPlacement, ShotResult, AI_NAME};

use crate::arbiter::PlacementStatus;
use crate::error::ServerError;
use crate::hub::{Notice, Rx, Tx};
use crate::Shared;

/// Local phase of the per-connection state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Waiting for `CONNEXION`.
    Handshake,
    /// A saved game exists; waiting for resume or discard.
    ResumePrompt,
    /// Waiting for `CHOIX_MODE`.
    ModeSelect,
    /// Waiting for `PLACEMENT_NAVIRES`.
    Placement,
    /// Queued; the arbiter will wake us up.
    AttendingOpponent,
    /// The game is on.
    Playing,
    Closed,
}

/// What this session is playing. Solo games are owned and arbitrated
/// here; player-versus-player games live in the arbiter.
enum SessionMode {
    Idle,
    VsAi(Box<Game>),
    VsPlayer,
}

/// The state of one connected client.
pub struct Session {
    shared: Shared,
    /// Length-prefixed frames over the client socket.
    frames: Framed<TcpStream, LengthDelimitedCodec>,
    /// Our own notification channel, registered with the hub at handshake.
    tx: Tx,
    rx: Rx,
    name: Option<String>,
    phase: Phase,
    mode: SessionMode,
}

/// Process an individual client connection from handshake to close.
pub async fn process(shared: Shared, stream: TcpStream, addr: SocketAddr) -> Result<(), ServerError> {
    let frames = Framed::new(stream, protocol::frame_codec());
    let (tx, rx) = mpsc::unbounded_channel();

    let mut session = Session {
        shared,
        frames,
        tx,
        rx,
        name: None,
        phase: Phase::Handshake,
        mode: SessionMode::Idle,
    };

    let result = session.run(addr).await;
    session.cleanup().await;
    result
}

impl Session {
    /// Drive the session until the client leaves, the game ends, or an
    /// error tears the connection down.
    async fn run(&mut self, addr: SocketAddr) -> Result<(), ServerError> {
        tracing::debug!(peer = %addr, "session started");

        while self.phase != Phase::Closed {
            tokio::select! {
                // A notification from the arbiter or another session.
                notice = self.rx.recv() => match notice {
                    Some(notice) => self.handle_notice(notice).await?,
                    None => break,
                },

                frame = self.frames.next() => match frame {
                    Some(Ok(bytes)) => self.handle_frame(&bytes).await?,
                    Some(Err(e)) => {
                        tracing::warn!(peer = %addr, error = %e, "frame error, dropping session");
                        break;
                    }
                    // The client closed its socket.
                    None => break,
                },
            }
        }

        Ok(())
    }

    /// Unregister and let the arbiter settle any game we were part of.
    async fn cleanup(&mut self) {
        if let Some(name) = self.name.take() {
            self.shared.hub.unregister(&name, &self.tx);
            self.shared.arbiter.handle_disconnect(&name).await;
            tracing::info!(player = %name, "session closed");
        }
    }

    async fn send(&mut self, message: &Message) -> Result<(), ServerError> {
        let bytes = protocol::encode(message)?;
        self.frames.send(bytes).await?;
        Ok(())
    }

    fn player_name(&self) -> String {
        self.name.clone().unwrap_or_default()
    }

    /// Reply with `ERREUR` if the socket still accepts writes, then
    /// close. Used for every protocol violation.
    async fn violation(&mut self, reason: &str) -> Result<(), ServerError> {
        let _ = self.send(&Message::erreur(reason)).await;
        self.phase = Phase::Closed;
        Ok(())
    }

    async fn handle_frame(&mut self, bytes: &[u8]) -> Result<(), ServerError> {
        let message = match protocol::decode(bytes) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "undecodable frame");
                return self.violation("malformed message").await;
            }
        };

        // An orderly goodbye is honored in every phase.
        if let Message::Deconnexion {} = message {
            self.phase = Phase::Closed;
            return Ok(());
        }

        match self.phase {
            Phase::Handshake => self.on_handshake(message).await,
            Phase::ResumePrompt => self.on_resume_prompt(message).await,
            Phase::ModeSelect => self.on_mode_select(message).await,
            Phase::Placement => self.on_placement(message).await,
            Phase::AttendingOpponent => self.on_attending(message).await,
            Phase::Playing => self.on_playing(message).await,
            Phase::Closed => Ok(()),
        }
    }

    async fn handle_notice(&mut self, notice: Notice) -> Result<(), ServerError> {
        match notice {
            Notice::Relay(message) => self.send(&message).await,
            Notice::MatchFound { opponent } => {
                self.send(&Message::AdversaireTrouve {
                    adversaire: opponent,
                })
                .await?;
                self.phase = Phase::Placement;
                Ok(())
            }
            Notice::GameStart { opponent, your_turn } => {
                self.send(&Message::DebutPartie {
                    adversaire: Some(opponent),
                    mode: Some(GameMode::VsPlayer),
                })
                .await?;
                if your_turn {
                    self.send(&Message::VotreTour {}).await?;
                } else {
                    self.send(&Message::TourAdversaire {}).await?;
                }
                self.phase = Phase::Playing;
                Ok(())
            }
            Notice::GameOver(message) => {
                self.send(&message).await?;
                self.phase = Phase::Closed;
                Ok(())
            }
        }
    }

    async fn on_handshake(&mut self, message: Message) -> Result<(), ServerError> {
        let name = match message {
            Message::Connexion { name } if !name.is_empty() => name,
            _ => return self.violation("expected CONNEXION").await,
        };

        tracing::info!(player = %name, "player connected");
        self.shared.hub.register(&name, self.tx.clone());
        self.name = Some(name.clone());

        if self.shared.store.has_saved_game(&name) {
            self.send(&Message::ConnexionOk {
                message: format!("Welcome back, {}. A saved game is waiting.", name),
                reprise: Some(true),
            })
            .await?;
            self.phase = Phase::ResumePrompt;
        } else {
            self.send(&Message::ConnexionOk {
                message: format!("Welcome, {}.", name),
                reprise: None,
            })
            .await?;
            self.phase = Phase::ModeSelect;
        }

        Ok(())
    }

    async fn on_resume_prompt(&mut self, message: Message) -> Result<(), ServerError> {
        match message {
            Message::ReprendrePartie {} => self.resume_saved_game().await,
            Message::NouvellePartie {} => {
                let name = self.player_name();
                if let Err(e) = self.shared.store.delete_saved_game(&name) {
                    tracing::error!(player = %name, error = %e, "failed to delete saved game");
                }

                self.send(&Message::ConnexionOk {
                    message: "Starting fresh.".to_string(),
                    reprise: None,
                })
                .await?;
                self.send(&Message::NouvellePartie {}).await?;
                self.phase = Phase::ModeSelect;
                Ok(())
            }
            _ => {
                self.violation("expected REPRENDRE_PARTIE or NOUVELLE_PARTIE")
                    .await
            }
        }
    }

    /// Rebuild the saved game and route it to the right arbitration:
    /// solo games restart immediately, two-player games wait for the
    /// opponent to come back.
    async fn resume_saved_game(&mut self) -> Result<(), ServerError> {
        let name = self.player_name();

        let mut game = match self.shared.store.load_game(&name) {
            Some(game) => game,
            None => {
                self.send(&Message::erreur("no saved game to resume")).await?;
                self.phase = Phase::ModeSelect;
                return Ok(());
            }
        };
        let me = match game.side_of(&name) {
            Some(player) => player.clone(),
            None => {
                self.send(&Message::erreur("saved game does not include you"))
                    .await?;
                self.phase = Phase::ModeSelect;
                return Ok(());
            }
        };
        let opponent = game
            .opponent_of(&name)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        let my_turn = game.is_turn_of(&name);

        self.send(&Message::PartieReprise {
            joueur_etat: me,
            est_mon_tour: my_turn,
            nom_adversaire: opponent.clone(),
        })
        .await?;

        if opponent == AI_NAME {
            game.state = GameState::InProgress;
            self.mode = SessionMode::VsAi(Box::new(game));
            self.phase = Phase::Playing;
            tracing::info!(player = %name, "solo game resumed");

            if !my_turn {
                self.run_ai_turn().await?;
            }
        } else {
            self.mode = SessionMode::VsPlayer;
            self.phase = Phase::AttendingOpponent;
            self.shared.arbiter.enqueue_resume(&name, game).await;
            tracing::info!(player = %name, opponent = %opponent, "two-player game resume pending");
        }

        Ok(())
    }

    async fn on_mode_select(&mut self, message: Message) -> Result<(), ServerError> {
        let mode = match message {
            Message::ChoixMode { mode } => mode,
            _ => return self.violation("expected CHOIX_MODE").await,
        };
        let name = self.player_name();

        match mode {
            GameMode::VsServer => {
                let grid_size = self.shared.config.grid_size;
                let fleet = self.shared.config.fleet_refs();
                let me = Player::new(&name, grid_size, &fleet);
                let ai = Player::new(AI_NAME, grid_size, &fleet);

                self.mode = SessionMode::VsAi(Box::new(Game::new(me, ai)));
                self.send(&Message::DebutPartie {
                    adversaire: None,
                    mode: None,
                })
                .await?;
                self.phase = Phase::Placement;
                tracing::info!(player = %name, "solo game created, awaiting placement");
            }
            GameMode::VsPlayer => {
                self.mode = SessionMode::VsPlayer;
                self.phase = Phase::AttendingOpponent;
                self.shared.arbiter.enqueue(&name).await;
            }
        }

        Ok(())
    }

    async fn on_placement(&mut self, message: Message) -> Result<(), ServerError> {
        let ships = match message {
            Message::PlacementNavires { ships } => ships,
            _ => return self.violation("expected PLACEMENT_NAVIRES").await,
        };

        if matches!(self.mode, SessionMode::VsAi(_)) {
            self.solo_placement(ships).await
        } else if matches!(self.mode, SessionMode::VsPlayer) {
            self.pvp_placement(ships).await
        } else {
            self.violation("no game to place ships in").await
        }
    }

    async fn solo_placement(&mut self, ships: Vec<ShipPlacement>) -> Result<(), ServerError> {
        let placed = match &mut self.mode {
            SessionMode::VsAi(game) => {
                if game.player1.place_from_positions(&ships) {
                    // Random-places the AI fleet and opens the game.
                    game.start(&mut rand::thread_rng())?;
                    Some(game.player1_turn)
                } else {
                    None
                }
            }
            _ => return Ok(()),
        };

        match placed {
            None => self.send(&Message::erreur("invalid placement")).await,
            Some(your_turn) => {
                self.send(&Message::PlacementOk {}).await?;
                self.phase = Phase::Playing;

                if your_turn {
                    self.send(&Message::VotreTour {}).await
                } else {
                    self.send(&Message::TourAdversaire {}).await?;
                    self.run_ai_turn().await
                }
            }
        }
    }

    async fn pvp_placement(&mut self, ships: Vec<ShipPlacement>) -> Result<(), ServerError> {
        let name = self.player_name();
        match self.shared.arbiter.place_ready(&name, &ships).await? {
            // PLACEMENT_OK and the start notices arrive over the hub.
            PlacementStatus::Accepted => Ok(()),
            PlacementStatus::Invalid => self.send(&Message::erreur("invalid placement")).await,
            PlacementStatus::NoGame => self.violation("no game to place ships in").await,
        }
    }

    async fn on_attending(&mut self, message: Message) -> Result<(), ServerError> {
        tracing::debug!(message = ?message, "client message while waiting for an opponent");
        self.violation("no game in progress yet").await
    }

    async fn on_playing(&mut self, message: Message) -> Result<(), ServerError> {
        match message {
            Message::Tir { x, y } => {
                if matches!(self.mode, SessionMode::VsAi(_)) {
                    self.solo_shot(x, y).await
                } else if matches!(self.mode, SessionMode::VsPlayer) {
                    let name = self.player_name();
                    self.shared.arbiter.handle_shot(&name, x, y).await;
                    Ok(())
                } else {
                    self.violation("no game in progress").await
                }
            }
            Message::Chat { message } => {
                if matches!(self.mode, SessionMode::VsPlayer) {
                    let name = self.player_name();
                    self.shared.arbiter.relay_chat(&name, &message).await;
                } else {
                    // Solo chat has no audience.
                    tracing::debug!(chat = %message, "chat dropped in solo game");
                }
                Ok(())
            }
            Message::SauvegarderPartie {} => self.save_current_game().await,
            Message::Abandon {} => self.abandon_current_game().await,
            _ => self.violation("unexpected message during play").await,
        }
    }

    /// Arbitrate a shot in a solo game: resolve the player's shot, then
    /// let the AI answer unless the shot was a duplicate or terminal.
    async fn solo_shot(&mut self, x: i32, y: i32) -> Result<(), ServerError> {
        let outcome = match &mut self.mode {
            SessionMode::VsAi(game) => game.apply_shot(x, y),
            _ => return Ok(()),
        };
        let outcome = match outcome {
            Some(outcome) => outcome,
            None => return self.send(&Message::erreur("game is not in progress")).await,
        };

        self.send(&Message::ReponseTir {
            resultat: outcome.result,
            x,
            y,
            bateau_coule: outcome.sunk.clone(),
        })
        .await?;

        if outcome.finished {
            let winner = self.player_name();
            tracing::info!(player = %winner, "solo game won");
            self.send(&Message::FinPartie {
                gagnant: Some(winner),
                status: None,
                message: "all opposing ships sunk".to_string(),
            })
            .await?;
            self.phase = Phase::Closed;
            return Ok(());
        }

        // A duplicate shot costs the player another try; the AI only
        // answers resolved shots.
        if outcome.result != ShotResult::AlreadyFired {
            self.run_ai_turn().await?;
        }

        Ok(())
    }

    /// The AI fires at a random untried cell and the client is told the
    /// result, then handed back the turn.
    async fn run_ai_turn(&mut self) -> Result<(), ServerError> {
        let (x, y, outcome) = match &mut self.mode {
            SessionMode::VsAi(game) => {
                let (x, y) = {
                    let mut rng = rand::thread_rng();
                    game.player2.random_untried(&mut rng)
                };
                (x, y, game.apply_shot(x, y))
            }
            _ => return Ok(()),
        };
        let outcome = match outcome {
            Some(outcome) => outcome,
            None => return Ok(()),
        };

        self.send(&Message::ReponseTirRecu {
            resultat: outcome.result,
            x,
            y,
            adversaire: AI_NAME.to_string(),
            bateau_coule: outcome.sunk.clone(),
        })
        .await?;

        if outcome.finished {
            tracing::info!(player = %self.player_name(), "solo game lost");
            self.send(&Message::FinPartie {
                gagnant: Some(AI_NAME.to_string()),
                status: None,
                message: "your fleet was sunk".to_string(),
            })
            .await?;
            self.phase = Phase::Closed;
        } else {
            self.send(&Message::VotreTour {}).await?;
        }

        Ok(())
    }

    async fn save_current_game(&mut self) -> Result<(), ServerError> {
        let name = self.player_name();
        let result = match &self.mode {
            SessionMode::VsAi(game) => self.shared.store.save_game(&name, game),
            SessionMode::VsPlayer => self.shared.arbiter.save_game(&name, &self.shared.store).await,
            SessionMode::Idle => Ok(false),
        };

        match result {
            Ok(true) => {
                tracing::info!(player = %name, "game saved");
                Ok(())
            }
            Ok(false) => {
                // Either no live game, or the name was never registered
                // with the auth endpoint.
                self.send(&Message::erreur("no game or registered player to save for"))
                    .await
            }
            Err(e) => {
                tracing::error!(player = %name, error = %e, "saving the game failed");
                self.send(&Message::erreur("saving the game failed")).await
            }
        }
    }

    /// Forfeit: the opponent (if human) is told it won, the saved
    /// snapshot is discarded, and the session closes.
    async fn abandon_current_game(&mut self) -> Result<(), ServerError> {
        let name = self.player_name();

        if let SessionMode::VsAi(game) = &mut self.mode {
            game.abandon(&name);
        } else if matches!(self.mode, SessionMode::VsPlayer) {
            self.shared.arbiter.abandon(&name).await;
        }

        if let Err(e) = self.shared.store.delete_saved_game(&name) {
            tracing::error!(player = %name, error = %e, "failed to delete saved game");
        }

        tracing::info!(player = %name, "game abandoned");
        self.phase = Phase::Closed;
        Ok(())
    }
}
