use chrono::{DateTime, Utc};

/// A command that has been handed to a channel but has no response yet.
#[derive(Clone, Debug)]
pub struct PendingCommand {
    command: String,
    command_time: DateTime<Utc>,
}

impl PendingCommand {
    /// Stamps `command` with the current time.
    pub fn new(command: String) -> Self {
        Self {
            command,
            command_time: Utc::now(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Stamps the response time and freezes the pair.
    pub fn complete(self, response: String) -> CommandRecord {
        CommandRecord {
            command: self.command,
            command_time: self.command_time,
            response,
            response_time: Utc::now(),
        }
    }
}

/// One command sent to a graft and everything it answered with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandRecord {
    command: String,
    command_time: DateTime<Utc>,
    response: String,
    response_time: DateTime<Utc>,
}

impl CommandRecord {
    /// The command exactly as written to the socket.
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn command_time(&self) -> DateTime<Utc> {
        self.command_time
    }

    /// May be empty if the graft stayed quiet or hung up.
    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn response_time(&self) -> DateTime<Utc> {
        self.response_time
    }
}
