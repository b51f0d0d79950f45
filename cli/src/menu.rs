//! The interactive text menu.

use grafter::{GraftHandle, Registry};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};

use crate::{error::CliError, input};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Clone, Copy, Debug)]
enum Action {
    Add,
    List,
    Command,
    ShowResponses,
    Quit,
}

fn main_menu() -> Vec<(String, Action)> {
    [
        ("Add graft", Action::Add),
        ("List grafts", Action::List),
        ("Command graft", Action::Command),
        ("Show command responses", Action::ShowResponses),
        ("Quit", Action::Quit),
    ]
    .into_iter()
    .map(|(label, action)| (label.to_owned(), action))
    .collect()
}

pub struct Menu<R, W> {
    input: Lines<R>,
    output: W,
    registry: Registry,
}

impl<R, W> Menu<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(input: R, output: W, registry: Registry) -> Self {
        Self {
            input: input.lines(),
            output,
            registry,
        }
    }

    /// Runs until the operator quits or input ends. Grafts are left open;
    /// closing them is up to the caller.
    pub async fn run(mut self) -> Result<W, CliError> {
        while let Some(action) = self.choose("Main Menu", &main_menu()).await? {
            match action {
                Action::Add => self.add().await?,
                Action::List => self.list().await?,
                Action::Command => self.command().await?,
                Action::ShowResponses => self.show_responses().await?,
                Action::Quit => break,
            }
        }
        Ok(self.output)
    }

    async fn say(&mut self, line: &str) -> Result<(), CliError> {
        self.output.write_all(line.as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        self.output.flush().await?;
        Ok(())
    }

    /// `None` once input has ended.
    async fn prompt(&mut self, text: &str) -> Result<Option<String>, CliError> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.flush().await?;
        Ok(self.input.next_line().await?)
    }

    /// Like [`Menu::prompt`], but blank input cancels too.
    async fn field(&mut self, label: &str) -> Result<Option<String>, CliError> {
        match self.prompt(&format!("{label} (blank to cancel): ")).await? {
            Some(value) if !value.trim().is_empty() => Ok(Some(value)),
            _ => {
                self.say("CANCELLED").await?;
                Ok(None)
            }
        }
    }

    /// Shows `items` until one is picked. `None` once input has ended.
    async fn choose<T: Copy>(
        &mut self,
        header: &str,
        items: &[(String, T)],
    ) -> Result<Option<T>, CliError> {
        loop {
            self.say("").await?;
            self.say(header).await?;
            for (index, (label, _)) in items.iter().enumerate() {
                self.say(&format!("{index}: {label}")).await?;
            }

            let Some(line) = self.prompt("Enter a selection index: ").await? else {
                return Ok(None);
            };
            let Ok(index) = line.trim().parse::<i64>() else {
                self.say("ERROR: input an integer").await?;
                continue;
            };
            match usize::try_from(index).ok().and_then(|index| items.get(index)) {
                Some((_, item)) => return Ok(Some(*item)),
                None => self.say("ERROR: select something on the menu").await?,
            }
        }
    }

    async fn select_graft(&mut self, header: &str) -> Result<Option<GraftHandle>, CliError> {
        let mut items: Vec<_> = self
            .registry
            .list_grafts()
            .await
            .into_iter()
            .map(|graft| {
                let label = format!("{}: {} port {}", graft.handle, graft.address, graft.port);
                (label, Some(graft.handle))
            })
            .collect();
        items.push(("Back".to_owned(), None));

        let selected = self.choose(header, &items).await?.flatten();
        if selected.is_none() {
            self.say("CANCELLED").await?;
        }
        Ok(selected)
    }

    async fn add(&mut self) -> Result<(), CliError> {
        self.say("").await?;
        let Some(raw_address) = self.field("Address").await? else {
            return Ok(());
        };
        let Some(raw_port) = self.field("Port").await? else {
            return Ok(());
        };
        let Some(raw_architecture) = self.prompt("Architecture (blank for X64): ").await? else {
            return Ok(());
        };

        let parsed = input::address(&raw_address).and_then(|address| {
            Ok((
                address,
                input::port(&raw_port)?,
                input::architecture(&raw_architecture)?,
            ))
        });
        let (address, port, architecture) = match parsed {
            Ok(parsed) => parsed,
            Err(error) => return self.say(&format!("ERROR: {error} - cancelling")).await,
        };

        match self.registry.add_graft(&address, port, architecture).await {
            Ok(handle) => self.say(&format!("Added graft index: {handle}")).await,
            Err(error) => self.say(&format!("ERROR: {error}")).await,
        }
    }

    async fn list(&mut self) -> Result<(), CliError> {
        self.say("").await?;
        self.say("Available grafts:").await?;
        for graft in self.registry.list_grafts().await {
            self.say(&format!(
                "{}: {} port {} ({})",
                graft.handle, graft.address, graft.port, graft.architecture
            ))
            .await?;
        }
        Ok(())
    }

    async fn command(&mut self) -> Result<(), CliError> {
        let Some(handle) = self.select_graft("Send Command to Graft: ").await? else {
            return Ok(());
        };
        let Some(command) = self.field("Command").await? else {
            return Ok(());
        };

        match self.registry.command_graft(handle, &command).await {
            Ok(()) => {
                self.say("Command sent - response will be received in background")
                    .await
            }
            Err(error) => self.say(&format!("ERROR: {error}")).await,
        }
    }

    async fn show_responses(&mut self) -> Result<(), CliError> {
        let Some(handle) = self.select_graft("Show Response From Graft: ").await? else {
            return Ok(());
        };

        let records = match self.registry.list_responses(handle).await {
            Ok(records) => records,
            Err(error) => return self.say(&format!("ERROR: {error}")).await,
        };
        self.say("").await?;
        if records.is_empty() {
            return self.say("No responses yet").await;
        }
        for record in records {
            self.say(&format!(
                "[{}] {}",
                record.command_time().format(TIME_FORMAT),
                record.command().trim_end()
            ))
            .await?;
            self.say(&format!(
                "[{}] {}",
                record.response_time().format(TIME_FORMAT),
                record.response().trim_end()
            ))
            .await?;
        }
        Ok(())
    }
}
