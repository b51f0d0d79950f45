use std::io;

use thiserror::Error;

use super::{architecture::Architecture, registry::GraftHandle};

/// Everything that can go wrong while talking to grafts.
#[derive(Debug, Error)]
pub enum Error {
    /// The TCP connection to the graft could not be established.
    #[error("could not connect to {address}:{port}: {source}")]
    Connect {
        address: String,
        port: u16,
        #[source]
        source: io::Error,
    },
    /// Connected, but the initial payload could not be delivered.
    #[error("could not send initial payload to {address}:{port}: {source}")]
    Handshake {
        address: String,
        port: u16,
        #[source]
        source: io::Error,
    },
    #[error("no payload registered for architecture {0}")]
    MissingPayload(Architecture),
    /// The handle is not (or no longer) in the registry.
    #[error("no graft with handle {0}")]
    NotFound(GraftHandle),
    /// Operator input rejected before it reached the registry.
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("channel is closed")]
    ChannelClosed,
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Whether this error means the connection was never established, as
    /// opposed to a problem with an existing graft.
    pub fn is_connect_error(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::Handshake { .. })
    }
}
