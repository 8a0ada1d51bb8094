use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use structopt::StructOpt;
use tokio::net::{TcpListener, TcpSocket, UdpSocket};

use battleship::{CLASSIC_FLEET, DEFAULT_FLEET};

use crate::arbiter::Arbiter;
use crate::error::ServerError;
use crate::hub::Hub;
use crate::store::UserStore;

pub mod arbiter;
pub mod auth;
pub mod error;
pub mod hub;
pub mod session;
pub mod store;

/// Listen backlog of the gameplay socket.
const BACKLOG: u32 = 5;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "battleship-server",
    about = "Server core for networked games of Battleship."
)]
pub enum Server {
    Start(Params),
}

/// CLI Params that the server accepts from the user.
#[derive(Debug, StructOpt)]
pub struct Params {
    /// The address of the gameplay TCP listener.
    #[structopt(long, default_value = "0.0.0.0:5555")]
    pub game_addr: SocketAddr,
    /// The address of the authentication UDP listener.
    #[structopt(long, default_value = "0.0.0.0:5554")]
    pub auth_addr: SocketAddr,
    /// Host advertised to clients for the TCP rendezvous.
    #[structopt(long, default_value = "127.0.0.1")]
    pub advertised_host: String,
    /// Path of the user-store JSON document.
    #[structopt(long, default_value = "donnees_utilisateurs.json", parse(from_os_str))]
    pub store_path: PathBuf,
    /// Minimum password length accepted at registration.
    #[structopt(long, default_value = "4")]
    pub min_password: usize,
    /// Side length of the game grid.
    #[structopt(long, default_value = "10")]
    pub grid_size: usize,
    /// Play with the full five-ship fleet instead of the single Torpilleur.
    #[structopt(long)]
    pub full_fleet: bool,
}

/// Game parameters shared by sessions and the arbiter.
pub struct Config {
    pub grid_size: usize,
    pub fleet: Vec<(String, usize)>,
}

impl Config {
    pub fn fleet_refs(&self) -> Vec<(&str, usize)> {
        self.fleet
            .iter()
            .map(|(name, size)| (name.as_str(), *size))
            .collect()
    }
}

/// Handles shared by every session.
#[derive(Clone)]
pub struct Shared {
    pub store: Arc<UserStore>,
    pub hub: Arc<Hub>,
    pub arbiter: Arc<Arbiter>,
    pub config: Arc<Config>,
}

/// The assembled server: both sockets bound, components wired.
pub struct GameServer {
    listener: TcpListener,
    auth_socket: UdpSocket,
    game_addr: SocketAddr,
    auth_addr: SocketAddr,
    advertised_host: String,
    shared: Shared,
}

impl GameServer {
    /// Bind both listening sockets and wire the components together.
    /// A failed bind is fatal; nothing is left half-started.
    pub async fn bind(params: Params) -> Result<Self, ServerError> {
        let listener = bind_game_socket(params.game_addr).map_err(|source| {
            ServerError::BindError {
                addr: params.game_addr,
                source,
            }
        })?;
        let game_addr = listener.local_addr()?;

        let auth_socket =
            UdpSocket::bind(params.auth_addr)
                .await
                .map_err(|source| ServerError::BindError {
                    addr: params.auth_addr,
                    source,
                })?;
        let auth_addr = auth_socket.local_addr()?;

        let fleet = if params.full_fleet {
            CLASSIC_FLEET
        } else {
            DEFAULT_FLEET
        };
        let config = Arc::new(Config {
            grid_size: params.grid_size,
            fleet: fleet.iter().map(|(n, s)| (n.to_string(), *s)).collect(),
        });

        let store = Arc::new(UserStore::open(params.store_path, params.min_password));
        let hub = Arc::new(Hub::new());
        let arbiter = Arc::new(Arbiter::new(Arc::clone(&hub), Arc::clone(&config)));

        Ok(GameServer {
            listener,
            auth_socket,
            game_addr,
            auth_addr,
            advertised_host: params.advertised_host,
            shared: Shared {
                store,
                hub,
                arbiter,
                config,
            },
        })
    }

    /// The bound gameplay address; differs from the requested one when
    /// binding port 0.
    pub fn game_addr(&self) -> SocketAddr {
        self.game_addr
    }

    pub fn auth_addr(&self) -> SocketAddr {
        self.auth_addr
    }

    /// Run the auth endpoint and the accept loop, spawning one session
    /// task per connection.
    pub async fn run(self) -> Result<(), ServerError> {
        let GameServer {
            listener,
            auth_socket,
            game_addr,
            advertised_host,
            shared,
            ..
        } = self;

        tokio::spawn(auth::run(
            auth_socket,
            Arc::clone(&shared.store),
            advertised_host,
            game_addr.port(),
        ));

        loop {
            let (stream, addr) = listener.accept().await?;
            let shared = shared.clone();

            tokio::spawn(async move {
                tracing::debug!(peer = %addr, "connection accepted");

                if let Err(e) = session::process(shared, stream, addr).await {
                    tracing::warn!(peer = %addr, error = %e, "session ended with error");
                }
            });
        }
    }
}

/// Bind the gameplay listener with address reuse and a small backlog.
fn bind_game_socket(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(BACKLOG)
}
