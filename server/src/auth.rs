use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time;

use battleship::protocol::{AuthReply, AuthRequest};

use crate::store::UserStore;

/// Receive timeout applied to the auth socket between datagrams.
const RECV_TIMEOUT: Duration = Duration::from_secs(1);

/// Drive the datagram authentication endpoint.
///
/// Credentials travel in clear text by design; the exchange only gates
/// access to the TCP rendezvous. Every request gets exactly one reply
/// datagram, sent by a short-lived worker so a slow disk write never
/// blocks the receive loop.
pub async fn run(socket: UdpSocket, store: Arc<UserStore>, advertised_host: String, game_port: u16) {
    let socket = Arc::new(socket);
    let advertised_host = Arc::new(advertised_host);
    let mut buf = vec![0u8; 1024];

    loop {
        let received = match time::timeout(RECV_TIMEOUT, socket.recv_from(&mut buf)).await {
            Ok(Ok((len, peer))) => (buf[..len].to_vec(), peer),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "auth receive failed");
                continue;
            }
            // Timeout between datagrams; keep listening.
            Err(_) => continue,
        };

        let socket = Arc::clone(&socket);
        let store = Arc::clone(&store);
        let advertised_host = Arc::clone(&advertised_host);
        tokio::spawn(async move {
            let (datagram, peer) = received;
            let reply = handle_request(&datagram, &store, &advertised_host, game_port);

            if let Err(e) = socket.send_to(reply.to_line().as_bytes(), peer).await {
                tracing::warn!(peer = %peer, error = %e, "auth reply failed");
            } else {
                tracing::debug!(peer = %peer, success = reply.success, "auth reply sent");
            }
        });
    }
}

/// Resolve one auth datagram into its reply.
fn handle_request(
    datagram: &[u8],
    store: &UserStore,
    advertised_host: &str,
    game_port: u16,
) -> AuthReply {
    let text = String::from_utf8_lossy(datagram);
    let request = match AuthRequest::parse(&text) {
        Ok(request) => request,
        Err(reason) => return AuthReply::failure(reason),
    };

    let (accepted, message) = match &request {
        AuthRequest::Login { name, password } => {
            tracing::info!(player = %name, "login attempt");
            if store.verify(name, password) {
                (true, "authentication succeeded")
            } else {
                (false, "unknown user or wrong password")
            }
        }
        AuthRequest::Register { name, password } => {
            tracing::info!(player = %name, "registration attempt");
            match store.register(name, password) {
                Ok(true) => (true, "registration succeeded"),
                Ok(false) => (false, "name already taken or password too short"),
                Err(e) => {
                    tracing::error!(player = %name, error = %e, "registration write failed");
                    (false, "internal server error")
                }
            }
        }
    };

    if accepted {
        let saved = store.has_saved_game(request.name());
        AuthReply::success(message, advertised_host, game_port, saved)
    } else {
        AuthReply::failure(message)
    }
}
