use std::{net::SocketAddr, path::PathBuf, process::ExitCode, time::Duration};

use clap::{Args, Parser, Subcommand};
use grafter::{Architecture, ChannelConfig, PayloadTable, Registry};
use tokio::io::{self, BufReader};
use tracing::{debug, info};

mod error;
mod http;
mod input;
mod menu;
mod telemetry;

use error::CliError;
use telemetry::LogFormat;

#[derive(Parser, Debug)]
#[command(
    name = "grafter",
    about = "Send commands to grafts over TCP and collect what they answer",
    version
)]
struct Cli {
    #[command(flatten)]
    logging: LoggingArgs,

    /// How long a graft may stay quiet before its response counts as done.
    #[arg(
        long,
        env = "GRAFTER_IDLE_TIMEOUT_MS",
        value_name = "MS",
        default_value_t = 4000
    )]
    idle_timeout_ms: u64,

    /// Give up connecting to a graft after this long.
    #[arg(long, env = "GRAFTER_CONNECT_TIMEOUT_MS", value_name = "MS")]
    connect_timeout_ms: Option<u64>,

    /// Payload sent to grafts of an architecture on connect, read from a
    /// file. May be repeated; architectures without one get an empty
    /// payload.
    #[arg(long = "payload", value_name = "ARCH=PATH", value_parser = parse_payload_arg)]
    payloads: Vec<(Architecture, PathBuf)>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args, Debug)]
struct LoggingArgs {
    #[arg(
        long = "log-filter",
        env = "GRAFTER_LOG",
        default_value = "info",
        value_name = "FILTER"
    )]
    filter: String,

    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Compact)]
    format: LogFormat,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive text menu (default)
    Menu,
    /// Serve the admin page over HTTP
    Serve {
        #[arg(long, default_value = "127.0.0.1:8000")]
        bind: SocketAddr,
    },
}

fn parse_payload_arg(raw: &str) -> Result<(Architecture, PathBuf), String> {
    let (arch, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ARCH=PATH, got '{raw}'"))?;
    let arch = arch.parse::<Architecture>().map_err(|error| error.to_string())?;
    Ok((arch, PathBuf::from(path)))
}

impl Cli {
    fn channel_config(&self) -> ChannelConfig {
        let idle_timeout = Duration::from_millis(self.idle_timeout_ms);
        match self.connect_timeout_ms {
            Some(ms) => ChannelConfig::builder()
                .idle_timeout(idle_timeout)
                .connect_timeout(Duration::from_millis(ms))
                .build(),
            None => ChannelConfig::builder().idle_timeout(idle_timeout).build(),
        }
    }

    async fn payload_table(&self) -> Result<PayloadTable, CliError> {
        let mut table = PayloadTable::default();
        for (arch, path) in &self.payloads {
            let payload = tokio::fs::read(path)
                .await
                .map_err(|source| CliError::Payload {
                    path: path.clone(),
                    source,
                })?;
            debug!(%arch, path = %path.display(), len = payload.len(), "loaded payload");
            table = table.with_payload(*arch, payload);
        }
        Ok(table)
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    telemetry::initialise(&cli.logging.filter, cli.logging.format)?;
    let registry = Registry::new(cli.payload_table().await?, cli.channel_config());

    match cli.command.unwrap_or(Command::Menu) {
        Command::Menu => {
            let menu = menu::Menu::new(BufReader::new(io::stdin()), io::stdout(), registry.clone());
            menu.run().await?;
        }
        Command::Serve { bind } => http::serve(registry.clone(), bind).await?,
    }

    info!("shutting down");
    registry.close_all(false).await;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("grafter: {error}");
            ExitCode::FAILURE
        }
    }
}
