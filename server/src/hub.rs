use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc;

use battleship::protocol::Message;

/// Sender half of a session's notification channel.
pub type Tx = mpsc::UnboundedSender<Notice>;

/// Receiver half of a session's notification channel.
pub type Rx = mpsc::UnboundedReceiver<Notice>;

/// The narrow interface the arbiter has to a session: a handful of
/// notifications delivered over its channel. Sessions and the arbiter
/// never hold each other; both hold the hub.
#[derive(Debug, Clone)]
pub enum Notice {
    /// Write this frame to the client.
    Relay(Message),
    /// Matched with `opponent`; the session moves to placement.
    MatchFound { opponent: String },
    /// The game started; the session moves to playing.
    GameStart { opponent: String, your_turn: bool },
    /// Write this final frame, then close the session.
    GameOver(Message),
}

/// Guarded map of connected player name to session channel.
#[derive(Default)]
pub struct Hub {
    sessions: Mutex<HashMap<String, Tx>>,
}

impl Hub {
    pub fn new() -> Self {
        Hub::default()
    }

    /// Register a session under its player name, replacing any stale
    /// entry left by a dead connection.
    pub fn register(&self, name: &str, tx: Tx) {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.insert(name.to_string(), tx);
    }

    /// Remove `name`, but only while it still maps to `tx`: a client
    /// that reconnected quickly has already replaced the entry, and the
    /// old session must not tear the new one down.
    pub fn unregister(&self, name: &str, tx: &Tx) {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(existing) = sessions.get(name) {
            if existing.same_channel(tx) {
                sessions.remove(name);
            }
        }
    }

    /// Deliver a notice to `name`. Returns false when the session is
    /// unknown or its channel is closed; the caller treats that as a
    /// disconnected peer.
    pub fn send(&self, name: &str, notice: Notice) -> bool {
        let sessions = self.sessions.lock().unwrap();
        match sessions.get(name) {
            Some(tx) => tx.send(notice).is_ok(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_reaches_registered_sessions_only() {
        let hub = Hub::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        hub.register("alice", tx.clone());

        assert!(hub.send("alice", Notice::Relay(Message::VotreTour {})));
        assert!(!hub.send("bob", Notice::Relay(Message::VotreTour {})));

        match rx.try_recv() {
            Ok(Notice::Relay(Message::VotreTour {})) => {}
            other => panic!("unexpected notice: {:?}", other),
        }

        hub.unregister("alice", &tx);
        assert!(!hub.send("alice", Notice::Relay(Message::VotreTour {})));
    }

    #[test]
    fn unregister_spares_a_replacement_session() {
        let hub = Hub::new();
        let (old_tx, _old_rx) = mpsc::unbounded_channel();
        let (new_tx, mut new_rx) = mpsc::unbounded_channel();

        hub.register("alice", old_tx.clone());
        hub.register("alice", new_tx);

        // The stale session unregisters after the reconnect.
        hub.unregister("alice", &old_tx);

        assert!(hub.send("alice", Notice::Relay(Message::VotreTour {})));
        assert!(new_rx.try_recv().is_ok());
    }

    #[test]
    fn send_fails_once_the_receiver_is_gone() {
        let hub = Hub::new();
        let (tx, rx) = mpsc::unbounded_channel();
        hub.register("alice", tx);

        drop(rx);
        assert!(!hub.send("alice", Notice::Relay(Message::PlacementOk {})));
    }
}
