use std::{io, net::SocketAddr, path::PathBuf};

use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("could not read payload file {}: {source}", path.display())]
    Payload {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),
}
