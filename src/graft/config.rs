use std::time::Duration;

use typed_builder::TypedBuilder;

/// How long a response may go quiet before it is considered finished.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(4);

/// Tuning for every channel a registry opens.
#[derive(Clone, Debug, TypedBuilder)]
pub struct ChannelConfig {
    /// Maximum gap between two reads of one response. This does not bound
    /// the total length of a command: a peer that keeps trickling bytes
    /// keeps the command alive.
    #[builder(default = DEFAULT_IDLE_TIMEOUT)]
    pub idle_timeout: Duration,
    /// Append `\n` to commands that lack one.
    #[builder(default = true)]
    pub ensure_terminator: bool,
    /// Upper bound on the TCP connect. `None` waits as long as the OS does.
    #[builder(default, setter(strip_option))]
    pub connect_timeout: Option<Duration>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
