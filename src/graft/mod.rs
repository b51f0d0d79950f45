mod architecture;
mod channel;
mod config;
mod error;
mod record;
mod registry;

pub use architecture::{Architecture, PayloadTable, UnknownArchitecture};
pub use channel::{with_terminator, Channel, ChannelState};
pub use config::{ChannelConfig, DEFAULT_IDLE_TIMEOUT};
pub use error::Error;
pub use record::{CommandRecord, PendingCommand};
pub use registry::{GraftHandle, GraftSummary, Registry};
