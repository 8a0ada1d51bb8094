use std::error::Error;
use std::fmt;
use std::io;
use std::net::SocketAddr;

use battleship::player::PlacementExhausted;
use serde_json::Error as JsonError;

#[derive(Debug)]
pub enum ServerError {
    /// A listening socket could not be bound at startup.
    BindError { addr: SocketAddr, source: io::Error },
    /// An I/O error occurred on a client socket.
    IoError { source: io::Error },
    /// An error occurred while serializing or deserializing.
    SerializationError { source: JsonError },
    /// The client broke the wire protocol.
    ProtocolError { message: String },
    /// Random placement could not fit a ship on the grid.
    PlacementError { source: PlacementExhausted },
    /// The user store could not be read or written.
    StoreError { source: io::Error },
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ServerError::BindError { addr, source } => {
                write!(f, "Failed to bind {}: {}", addr, source)
            }
            ServerError::IoError { source } => write!(f, "An I/O error occurred: {}", source),
            ServerError::SerializationError { source } => write!(
                f,
                "An error occurred while serializing or deserializing: {}",
                source
            ),
            ServerError::ProtocolError { message } => {
                write!(f, "Protocol violation: {}", message)
            }
            ServerError::PlacementError { source } => {
                write!(f, "Fatal placement error: {}", source)
            }
            ServerError::StoreError { source } => {
                write!(f, "An error occurred with the user store: {}", source)
            }
        }
    }
}

impl From<io::Error> for ServerError {
    fn from(source: io::Error) -> Self {
        Self::IoError { source }
    }
}

impl From<JsonError> for ServerError {
    fn from(source: JsonError) -> Self {
        Self::SerializationError { source }
    }
}

impl From<PlacementExhausted> for ServerError {
    fn from(source: PlacementExhausted) -> Self {
        Self::PlacementError { source }
    }
}

impl Error for ServerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::BindError { source, .. } => Some(source),
            Self::IoError { source } => Some(source),
            Self::SerializationError { source } => Some(source),
            Self::PlacementError { source } => Some(source),
            Self::StoreError { source } => Some(source),
            _ => None,
        }
    }
}
