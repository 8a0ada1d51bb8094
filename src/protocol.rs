use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_util::codec::LengthDelimitedCodec;

use crate::player::Player;
use crate::ship::ShipPlacement;
use crate::{GameMode, ShotResult};

/// Hard cap on a single frame's payload.
pub const MAX_FRAME: usize = 64 * 1024;

/// Separator of the textual auth datagrams.
pub const AUTH_SEPARATOR: char = '|';

pub const AUTH_LOGIN: &str = "AUTH_LOGIN";
pub const AUTH_REGISTER: &str = "AUTH_REGISTER";
pub const AUTH_SUCCESS: &str = "AUTH_SUCCESS";
pub const AUTH_FAILED: &str = "AUTH_FAILED";

/// Trailing token of a successful auth reply: a saved game awaits.
pub const SAVED_GAME_FLAG: &str = "PARTIE_SAUVEGARDEE_EXISTE";
/// Trailing token of a successful auth reply: nothing saved.
pub const NEW_GAME_FLAG: &str = "NOUVELLE_PARTIE";

/// The length-prefixed framing of the gameplay stream: a 4-byte
/// big-endian length header followed by that many payload bytes.
pub fn frame_codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_length(4)
        .max_frame_length(MAX_FRAME)
        .new_codec()
}

/// Serialize a message into one frame payload.
pub fn encode(message: &Message) -> Result<Bytes, serde_json::Error> {
    serde_json::to_vec(message).map(Bytes::from)
}

/// Parse one frame payload back into a message.
pub fn decode(payload: &[u8]) -> Result<Message, serde_json::Error> {
    serde_json::from_slice(payload)
}

/// Every message of the gameplay protocol, client- and server-sent.
///
/// Frames carry `{"type": TAG, "data": {...}}`; the serde attributes
/// below pin both the tags and the payload field names to the wire
/// contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Message {
    /// C -> S. First message after connecting: the authenticated name.
    #[serde(rename = "CONNEXION")]
    Connexion { name: String },
    /// S -> C. Handshake accepted; `reprise` flags a resumable game.
    #[serde(rename = "CONNEXION_OK")]
    ConnexionOk {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reprise: Option<bool>,
    },
    /// C -> S. Picked a game mode.
    #[serde(rename = "CHOIX_MODE")]
    ChoixMode { mode: GameMode },
    /// S -> C. Queued; waiting for a second player.
    #[serde(rename = "ATTENTE_ADVERSAIRE")]
    AttenteAdversaire {},
    /// S -> C. Matched against `adversaire`.
    #[serde(rename = "ADVERSAIRE_TROUVE")]
    AdversaireTrouve { adversaire: String },
    /// C -> S. Requested fleet placement.
    #[serde(rename = "PLACEMENT_NAVIRES")]
    PlacementNavires { ships: Vec<ShipPlacement> },
    /// S -> C. Placement accepted.
    #[serde(rename = "PLACEMENT_OK")]
    PlacementOk {},
    /// S -> C. The game begins.
    #[serde(rename = "DEBUT_PARTIE")]
    DebutPartie {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        adversaire: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mode: Option<GameMode>,
    },
    /// S -> C. It is this client's turn.
    #[serde(rename = "VOTRE_TOUR")]
    VotreTour {},
    /// S -> C. The opponent is playing.
    #[serde(rename = "TOUR_ADVERSAIRE")]
    TourAdversaire {},
    /// C -> S. A shot at (x, y); x is the column, y the row.
    #[serde(rename = "TIR")]
    Tir { x: i32, y: i32 },
    /// S -> C. Result of this client's own shot.
    #[serde(rename = "REPONSE_TIR")]
    ReponseTir {
        resultat: ShotResult,
        x: i32,
        y: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bateau_coule: Option<String>,
    },
    /// S -> C. The opponent fired at this client.
    #[serde(rename = "REPONSE_TIR_RECU")]
    ReponseTirRecu {
        resultat: ShotResult,
        x: i32,
        y: i32,
        adversaire: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bateau_coule: Option<String>,
    },
    /// S -> C. The game is over, by victory, defeat or abandon.
    #[serde(rename = "FIN_PARTIE")]
    FinPartie {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        gagnant: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<String>,
        message: String,
    },
    /// C -> S. Forfeit the current game.
    #[serde(rename = "ABANDON")]
    Abandon {},
    /// C -> S. Chat line for the opponent.
    #[serde(rename = "CHAT")]
    Chat { message: String },
    /// S -> C. Relayed chat line; the sender renders its own copy.
    #[serde(rename = "CHAT_GLOBAL")]
    ChatGlobal { envoyeur: String, message: String },
    /// C -> S. Resume the saved game.
    #[serde(rename = "REPRENDRE_PARTIE")]
    ReprendrePartie {},
    /// B. Client: discard the save and start fresh. Server: confirms it.
    #[serde(rename = "NOUVELLE_PARTIE")]
    NouvellePartie {},
    /// S -> C. The reconstructed state of a resumed game.
    #[serde(rename = "PARTIE_REPRISE")]
    PartieReprise {
        joueur_etat: Player,
        est_mon_tour: bool,
        nom_adversaire: String,
    },
    /// C -> S. Snapshot the current game to the store.
    #[serde(rename = "SAUVEGARDER_PARTIE")]
    SauvegarderPartie {},
    /// C -> S. Orderly goodbye.
    #[serde(rename = "DECONNEXION")]
    Deconnexion {},
    /// S -> C. A rejected operation, with a human-readable reason.
    #[serde(rename = "ERREUR")]
    Erreur { message: String },
}

impl Message {
    pub fn erreur(message: impl Into<String>) -> Self {
        Message::Erreur {
            message: message.into(),
        }
    }
}

/// A parsed auth datagram: `TYPE|NAME|PASSWORD`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRequest {
    Login { name: String, password: String },
    Register { name: String, password: String },
}

impl AuthRequest {
    /// Parse one datagram. The error string is suitable for an
    /// `AUTH_FAILED` reply.
    pub fn parse(line: &str) -> Result<Self, String> {
        let trimmed = line.trim_end_matches(|c| c == '\r' || c == '\n');
        let mut parts = trimmed.splitn(3, AUTH_SEPARATOR);
        let kind = parts.next().unwrap_or_default();
        let name = parts.next();
        let password = parts.next();

        let (name, password) = match (name, password) {
            (Some(n), Some(p)) if !n.is_empty() => (n.to_string(), p.to_string()),
            _ => return Err("invalid request format".to_string()),
        };

        match kind {
            AUTH_LOGIN => Ok(AuthRequest::Login { name, password }),
            AUTH_REGISTER => Ok(AuthRequest::Register { name, password }),
            other => Err(format!("unknown auth request: {}", other)),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AuthRequest::Login { name, .. } | AuthRequest::Register { name, .. } => name,
        }
    }
}

/// The datagram sent back for every auth request:
/// `STATUS|MESSAGE[|HOST|PORT|FLAG]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthReply {
    pub success: bool,
    pub message: String,
    /// TCP rendezvous info, present on success only: advertised host,
    /// gameplay port, and whether a saved game exists.
    pub rendezvous: Option<(String, u16, bool)>,
}

impl AuthReply {
    pub fn failure(message: impl Into<String>) -> Self {
        AuthReply {
            success: false,
            message: message.into(),
            rendezvous: None,
        }
    }

    pub fn success(message: impl Into<String>, host: &str, port: u16, saved_game: bool) -> Self {
        AuthReply {
            success: true,
            message: message.into(),
            rendezvous: Some((host.to_string(), port, saved_game)),
        }
    }

    pub fn to_line(&self) -> String {
        let status = if self.success { AUTH_SUCCESS } else { AUTH_FAILED };
        match &self.rendezvous {
            Some((host, port, saved)) => {
                let flag = if *saved { SAVED_GAME_FLAG } else { NEW_GAME_FLAG };
                format!(
                    "{}{sep}{}{sep}{}{sep}{}{sep}{}",
                    status,
                    self.message,
                    host,
                    port,
                    flag,
                    sep = AUTH_SEPARATOR
                )
            }
            None => format!("{}{}{}", status, AUTH_SEPARATOR, self.message),
        }
    }

    /// Parse a reply line; used by clients and the test suite.
    pub fn parse(line: &str) -> Result<Self, String> {
        let parts: Vec<&str> = line.split(AUTH_SEPARATOR).collect();
        match parts.as_slice() {
            [status, message] if *status == AUTH_FAILED => Ok(AuthReply::failure(*message)),
            [status, message, host, port, flag] if *status == AUTH_SUCCESS => {
                let port: u16 = port
                    .parse()
                    .map_err(|_| format!("invalid port: {}", port))?;
                Ok(AuthReply::success(
                    *message,
                    host,
                    port,
                    *flag == SAVED_GAME_FLAG,
                ))
            }
            _ => Err(format!("unrecognized auth reply: {}", line)),
        }
    }
}
