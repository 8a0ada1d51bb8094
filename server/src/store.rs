use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use battleship::game::{Game, GameState};

use crate::error::ServerError;

/// Persistent mapping of username to credentials and saved game.
///
/// The store keeps an in-memory mirror of a single JSON document and is
/// its only mutator. Every write is flushed through a temp file and an
/// atomic rename, so a crash never leaves a half-written document.
pub struct UserStore {
    path: PathBuf,
    min_password: usize,
    data: Mutex<StoreData>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreData {
    users: HashMap<String, UserRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserRecord {
    #[serde(rename = "mdp_hash")]
    hash: String,
    /// Per-user random salt, hex-encoded. Records written before salting
    /// was introduced deserialize with an empty salt and keep verifying.
    #[serde(default)]
    salt: String,
    #[serde(rename = "partie_sauvegardee")]
    saved_game: Option<Game>,
}

impl UserStore {
    /// Open the store at `path`, reading any existing document.
    /// A malformed document is logged and treated as an empty store.
    pub fn open(path: PathBuf, min_password: usize) -> Self {
        let data = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(data) => data,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "user store unreadable, starting empty");
                    StoreData::default()
                }
            },
            Err(_) => StoreData::default(),
        };

        UserStore {
            path,
            min_password,
            data: Mutex::new(data),
        }
    }

    /// Create a new user. Returns false when the name is taken or the
    /// password is shorter than the configured minimum.
    pub fn register(&self, name: &str, password: &str) -> Result<bool, ServerError> {
        if password.len() < self.min_password {
            return Ok(false);
        }

        let mut data = self.data.lock().unwrap();
        if data.users.contains_key(name) {
            return Ok(false);
        }

        let salt: [u8; 16] = rand::thread_rng().gen();
        let salt = hex::encode(salt);
        let record = UserRecord {
            hash: hash_password(&salt, password),
            salt,
            saved_game: None,
        };
        data.users.insert(name.to_string(), record);
        self.persist(&data)?;

        Ok(true)
    }

    /// Whether `name` exists and `password` matches its stored hash.
    pub fn verify(&self, name: &str, password: &str) -> bool {
        let data = self.data.lock().unwrap();
        match data.users.get(name) {
            Some(record) => record.hash == hash_password(&record.salt, password),
            None => false,
        }
    }

    /// Snapshot `game` under `name`, replacing any prior save. A game
    /// still in progress is stored as paused. Returns false when `name`
    /// has no user record, so nothing was persisted.
    pub fn save_game(&self, name: &str, game: &Game) -> Result<bool, ServerError> {
        let mut data = self.data.lock().unwrap();
        let record = match data.users.get_mut(name) {
            Some(record) => record,
            None => return Ok(false),
        };

        let mut snapshot = game.clone();
        if snapshot.state == GameState::InProgress {
            snapshot.state = GameState::Paused;
        }
        record.saved_game = Some(snapshot);
        self.persist(&data)?;

        Ok(true)
    }

    pub fn load_game(&self, name: &str) -> Option<Game> {
        let data = self.data.lock().unwrap();
        data.users.get(name).and_then(|r| r.saved_game.clone())
    }

    pub fn has_saved_game(&self, name: &str) -> bool {
        let data = self.data.lock().unwrap();
        data.users
            .get(name)
            .map(|r| r.saved_game.is_some())
            .unwrap_or(false)
    }

    pub fn delete_saved_game(&self, name: &str) -> Result<(), ServerError> {
        let mut data = self.data.lock().unwrap();
        match data.users.get_mut(name) {
            Some(record) => {
                record.saved_game = None;
                self.persist(&data)
            }
            None => Ok(()),
        }
    }

    /// Flush the document: write to a sibling temp file, then rename
    /// over the real path.
    fn persist(&self, data: &StoreData) -> Result<(), ServerError> {
        let contents = serde_json::to_string_pretty(data)?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, contents).map_err(|source| ServerError::StoreError { source })?;
        fs::rename(&tmp, &self.path).map_err(|source| ServerError::StoreError { source })
    }
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use battleship::{Player, DEFAULT_FLEET, DEFAULT_GRID_SIZE};

    fn store(dir: &tempfile::TempDir) -> UserStore {
        UserStore::open(dir.path().join("users.json"), 4)
    }

    fn sample_game() -> Game {
        let p1 = Player::new("alice", DEFAULT_GRID_SIZE, DEFAULT_FLEET);
        let p2 = Player::new("bob", DEFAULT_GRID_SIZE, DEFAULT_FLEET);
        let mut game = Game::new(p1, p2);
        game.start(&mut rand::thread_rng()).unwrap();
        game
    }

    #[test]
    fn register_then_verify() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        assert!(store.register("alice", "secret").unwrap());
        assert!(store.verify("alice", "secret"));
        assert!(!store.verify("alice", "wrong"));
        assert!(!store.verify("nobody", "secret"));

        // Name taken, password too short.
        assert!(!store.register("alice", "other").unwrap());
        assert!(!store.register("bob", "abc").unwrap());
    }

    #[test]
    fn salts_differ_between_users() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        store.register("alice", "secret").unwrap();
        store.register("bob", "secret").unwrap();

        let data = store.data.lock().unwrap();
        let alice = &data.users["alice"];
        let bob = &data.users["bob"];
        assert_ne!(alice.salt, bob.salt);
        assert_ne!(alice.hash, bob.hash);
    }

    #[test]
    fn save_pauses_an_in_progress_game() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        store.register("alice", "secret").unwrap();

        assert!(!store.has_saved_game("alice"));
        assert!(store.save_game("alice", &sample_game()).unwrap());
        assert!(store.has_saved_game("alice"));

        let loaded = store.load_game("alice").unwrap();
        assert_eq!(loaded.state, GameState::Paused);

        store.delete_saved_game("alice").unwrap();
        assert!(!store.has_saved_game("alice"));
    }

    #[test]
    fn saving_for_an_unknown_user_persists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        assert!(!store.save_game("ghost", &sample_game()).unwrap());
        assert!(!store.has_saved_game("ghost"));
        assert!(store.load_game("ghost").is_none());
    }

    #[test]
    fn saved_games_survive_a_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");

        let game = sample_game();
        {
            let store = UserStore::open(path.clone(), 4);
            store.register("alice", "secret").unwrap();
            store.save_game("alice", &game).unwrap();
        }

        let store = UserStore::open(path, 4);
        assert!(store.verify("alice", "secret"));
        let mut expected = game;
        expected.state = GameState::Paused;
        assert_eq!(store.load_game("alice"), Some(expected));
    }

    #[test]
    fn malformed_document_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        fs::write(&path, "{ not json").unwrap();

        let store = UserStore::open(path, 4);
        assert!(!store.verify("alice", "secret"));
        assert!(store.register("alice", "secret").unwrap());
    }
}
