use std::{fmt, sync::Arc};

use hashbrown::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{
    architecture::{Architecture, PayloadTable},
    channel::Channel,
    config::ChannelConfig,
    error::Error,
    record::{CommandRecord, PendingCommand},
};

/// Identifies one graft for the lifetime of its registry. Handles count up
/// from zero and are never reused, even after a graft is deleted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraftHandle(pub u64);

impl fmt::Display for GraftHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What [`Registry::list_grafts`] reports for each graft.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraftSummary {
    pub handle: GraftHandle,
    pub address: String,
    pub port: u16,
    pub architecture: Architecture,
}

struct Graft {
    channel: Arc<Channel>,
    history: Vec<CommandRecord>,
}

struct Grafts {
    next_handle: u64,
    entries: HashMap<GraftHandle, Graft>,
}

/// The set of live grafts and what they have answered so far.
///
/// One lock covers the whole map, but it is only ever held for lookups and
/// bookkeeping. Network round trips happen on the channels, each behind its
/// own lock, so a slow graft never holds up another.
///
/// Cloning a registry gives another handle to the same set of grafts.
#[derive(Clone)]
pub struct Registry {
    grafts: Arc<Mutex<Grafts>>,
    payloads: Arc<PayloadTable>,
    config: ChannelConfig,
}

impl Registry {
    pub fn new(payloads: PayloadTable, config: ChannelConfig) -> Self {
        Self {
            grafts: Arc::new(Mutex::new(Grafts {
                next_handle: 0,
                entries: HashMap::new(),
            })),
            payloads: Arc::new(payloads),
            config,
        }
    }

    /// Architectures a graft can be added with.
    pub fn architectures(&self) -> Vec<Architecture> {
        self.payloads.architectures()
    }

    /// Connects to a new graft and registers it.
    ///
    /// The connect and payload upload happen before the registry is touched,
    /// so a graft that fails to come up is never visible.
    pub async fn add_graft(
        &self,
        address: &str,
        port: u16,
        architecture: Architecture,
    ) -> Result<GraftHandle, Error> {
        let channel = Channel::open(
            address,
            port,
            architecture,
            &self.payloads,
            self.config.clone(),
        )
        .await?;

        let mut grafts = self.grafts.lock().await;
        let handle = GraftHandle(grafts.next_handle);
        grafts.next_handle += 1;
        grafts.entries.insert(
            handle,
            Graft {
                channel: Arc::new(channel),
                history: Vec::new(),
            },
        );
        info!(%handle, address, port, %architecture, "graft added");
        Ok(handle)
    }

    /// Unregisters a graft, then closes it gracefully once any command in
    /// flight on it has finished. Close failures are logged, not returned:
    /// the graft is gone from the registry either way.
    pub async fn delete_graft(&self, handle: GraftHandle) -> Result<(), Error> {
        let graft = self
            .grafts
            .lock()
            .await
            .entries
            .remove(&handle)
            .ok_or(Error::NotFound(handle))?;
        info!(%handle, "graft removed");

        if let Err(error) = graft.channel.close(true).await {
            warn!(%handle, %error, "failed to close graft cleanly");
        }
        Ok(())
    }

    /// Snapshot of all grafts, ordered by handle.
    pub async fn list_grafts(&self) -> Vec<GraftSummary> {
        let grafts = self.grafts.lock().await;
        let mut summaries: Vec<_> = grafts
            .entries
            .iter()
            .map(|(handle, graft)| GraftSummary {
                handle: *handle,
                address: graft.channel.address().to_owned(),
                port: graft.channel.port(),
                architecture: graft.channel.architecture(),
            })
            .collect();
        summaries.sort_by_key(|summary| summary.handle);
        summaries
    }

    /// Sends a command to a graft in the background and returns without
    /// waiting for the response.
    ///
    /// Every call spawns its own task, and nothing limits how many of those
    /// run at once. Commands to the same graft queue up on its channel and
    /// land in its history in the order they get the channel, which is not
    /// necessarily the order they were issued in. If the graft is deleted
    /// before the response is in, the response is dropped.
    pub async fn command_graft(
        &self,
        handle: GraftHandle,
        command: &str,
    ) -> Result<(), Error> {
        let channel = self
            .grafts
            .lock()
            .await
            .entries
            .get(&handle)
            .map(|graft| Arc::clone(&graft.channel))
            .ok_or(Error::NotFound(handle))?;

        let grafts = Arc::clone(&self.grafts);
        let pending = PendingCommand::new(channel.prepare_command(command).into_owned());
        debug!(%handle, "dispatching command");
        tokio::spawn(async move {
            let response = match channel.send_command(pending.command()).await {
                Ok(response) => response,
                Err(error) => {
                    // a graft deleted under the command is not worth a warning
                    if grafts.lock().await.entries.contains_key(&handle) {
                        warn!(%handle, %error, "command failed");
                    }
                    return;
                }
            };
            let record = pending.complete(response);

            if let Some(graft) = grafts.lock().await.entries.get_mut(&handle) {
                graft.history.push(record);
            }
        });
        Ok(())
    }

    /// Snapshot of a graft's completed commands, oldest first.
    pub async fn list_responses(
        &self,
        handle: GraftHandle,
    ) -> Result<Vec<CommandRecord>, Error> {
        self.grafts
            .lock()
            .await
            .entries
            .get(&handle)
            .map(|graft| graft.history.clone())
            .ok_or(Error::NotFound(handle))
    }

    /// Removes every graft and closes them all. Meant for shutdown: with
    /// `graceful` unset, commands still in flight are cut short.
    pub async fn close_all(&self, graceful: bool) {
        let drained: Vec<_> = self.grafts.lock().await.entries.drain().collect();
        for (handle, graft) in drained {
            if let Err(error) = graft.channel.close(graceful).await {
                warn!(%handle, %error, "failed to close graft");
            }
        }
    }
}
