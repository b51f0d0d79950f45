use std::{borrow::Cow, io};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    select,
    sync::{watch, Mutex},
    time::timeout,
};
use tracing::{debug, debug_span, trace, Instrument};

use super::{
    architecture::{Architecture, PayloadTable},
    config::ChannelConfig,
    error::Error,
};
use crate::hex::HexDisplayExt;

const READ_CHUNK: usize = 4096;
const EXIT_COMMAND: &[u8] = b"exit\n";
const PAYLOAD_PREVIEW_BYTES: usize = 16;

/// Where a channel is in its life. Connecting and failing both happen inside
/// [`Channel::open`], which only ever hands out a `Ready` channel, so those
/// states are never observable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelState {
    Ready,
    Closed,
}

/// A TCP connection to one graft.
///
/// Commands are serialized: only one command is on the wire at a time, and a
/// command owns the socket until its response has been framed. There is no
/// terminator in the protocol, so a response ends when the graft has been
/// quiet for `idle_timeout` or has hung up.
pub struct Channel {
    address: String,
    port: u16,
    architecture: Architecture,
    config: ChannelConfig,
    /// `None` once the socket has been dropped. Holding this lock is what
    /// makes a command exclusive.
    stream: Mutex<Option<TcpStream>>,
    state: watch::Sender<ChannelState>,
}

impl Channel {
    /// Connects to the graft and writes the payload registered for
    /// `architecture`. No acknowledgment is expected; once the payload is
    /// written the channel is ready for commands.
    pub async fn open(
        address: &str,
        port: u16,
        architecture: Architecture,
        payloads: &PayloadTable,
        config: ChannelConfig,
    ) -> Result<Self, Error> {
        let span = debug_span!("channel", address, port, %architecture);
        async move {
            let payload = payloads
                .get(architecture)
                .ok_or(Error::MissingPayload(architecture))?;

            debug!("connecting");
            let connect = TcpStream::connect((address, port));
            let connected = match config.connect_timeout {
                Some(limit) => timeout(limit, connect).await.unwrap_or_else(|_| {
                    Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        "connect timed out",
                    ))
                }),
                None => connect.await,
            };
            let mut stream = connected.map_err(|source| Error::Connect {
                address: address.to_owned(),
                port,
                source,
            })?;
            debug!("connected");

            trace!(
                len = payload.len(),
                payload = %payload.hex_preview(PAYLOAD_PREVIEW_BYTES),
                "sending initial payload"
            );
            stream
                .write_all(&payload)
                .await
                .map_err(|source| Error::Handshake {
                    address: address.to_owned(),
                    port,
                    source,
                })?;
            debug!("channel ready");

            let (state, _) = watch::channel(ChannelState::Ready);
            Ok(Channel {
                address: address.to_owned(),
                port,
                architecture,
                config,
                stream: Mutex::new(Some(stream)),
                state,
            })
        }
        .instrument(span)
        .await
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    pub fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    pub fn is_closed(&self) -> bool {
        self.state() == ChannelState::Closed
    }

    /// The command as it will be written, following this channel's
    /// terminator setting.
    pub fn prepare_command<'a>(&self, command: &'a str) -> Cow<'a, str> {
        if self.config.ensure_terminator {
            with_terminator(command)
        } else {
            Cow::Borrowed(command)
        }
    }

    /// Sends one command and collects everything the graft says back.
    ///
    /// Waits for any command already in flight on this channel. Reading stops
    /// when the graft goes quiet for the idle timeout, closes the connection,
    /// or the read fails; whatever arrived until then is returned, possibly
    /// nothing. Only a failed write or an already closed channel is an error.
    ///
    /// The idle timeout and whether a `\n` gets appended come from the
    /// channel's [`ChannelConfig`].
    pub async fn send_command(&self, command: &str) -> Result<String, Error> {
        let command = self.prepare_command(command);
        let span = debug_span!("command", address = %self.address, port = self.port);
        async move {
            let mut state = self.state.subscribe();
            let mut guard = self.stream.lock().await;
            if self.is_closed() {
                guard.take();
            }
            let Some(stream) = guard.as_mut() else {
                return Err(Error::ChannelClosed);
            };

            stream.write_all(command.as_bytes()).await?;
            debug!(len = command.len(), "command sent");

            let mut response = Vec::new();
            loop {
                response.reserve(READ_CHUNK);
                select! {
                    _ = wait_closed(&mut state) => {
                        debug!("channel closed while reading");
                        break;
                    }
                    read = timeout(self.config.idle_timeout, stream.read_buf(&mut response)) => {
                        match read {
                            Err(_) => {
                                trace!("graft went quiet");
                                break;
                            }
                            Ok(Ok(0)) => {
                                debug!("graft closed the connection");
                                break;
                            }
                            Ok(Ok(n)) => trace!(n, "read"),
                            Ok(Err(error)) => {
                                debug!(%error, "read failed");
                                break;
                            }
                        }
                    }
                }
            }

            // a forced close could not take the socket while we held it
            if self.is_closed() {
                guard.take();
            }
            debug!(len = response.len(), "response complete");
            Ok(String::from_utf8_lossy(&response).into_owned())
        }
        .instrument(span)
        .await
    }

    /// Closes the connection.
    ///
    /// A graceful close waits for the command in flight, tells the graft to
    /// `exit`, then shuts the socket down. A forced close drops the socket
    /// right away; a command in flight stops reading and returns what it has.
    /// Closing a closed channel does nothing.
    pub async fn close(&self, graceful: bool) -> Result<(), Error> {
        let span = debug_span!("close", address = %self.address, port = self.port, graceful);
        async move {
            if !graceful {
                self.state.send_replace(ChannelState::Closed);
                if let Ok(mut guard) = self.stream.try_lock() {
                    guard.take();
                }
                debug!("channel closed");
                return Ok(());
            }

            let mut guard = self.stream.lock().await;
            self.state.send_replace(ChannelState::Closed);
            let Some(mut stream) = guard.take() else {
                return Ok(());
            };
            stream.write_all(EXIT_COMMAND).await?;
            stream.shutdown().await?;
            debug!("channel closed");
            Ok(())
        }
        .instrument(span)
        .await
    }
}

/// Appends `\n` unless the command already ends with one.
pub fn with_terminator(command: &str) -> Cow<'_, str> {
    if command.ends_with('\n') {
        Cow::Borrowed(command)
    } else {
        Cow::Owned(format!("{command}\n"))
    }
}

/// Resolves once the channel has been marked closed.
async fn wait_closed(state: &mut watch::Receiver<ChannelState>) {
    loop {
        if *state.borrow_and_update() == ChannelState::Closed {
            return;
        }
        if state.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("whoami", "whoami\n")]
    #[case("whoami\n", "whoami\n")]
    #[case("", "\n")]
    #[case("a\nb", "a\nb\n")]
    #[case("crlf\r\n", "crlf\r\n")]
    fn appends_terminator_only_when_missing(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(with_terminator(input), expected);
    }

    #[test]
    fn terminated_commands_are_borrowed() {
        assert!(matches!(with_terminator("ls\n"), Cow::Borrowed(_)));
    }
}
