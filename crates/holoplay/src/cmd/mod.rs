use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use holoplay_cbor::Value;
use holoplay_client::{
    Client, ClientConfig, ClientError, CloseBehavior, CorrelatorConfig, Message, RequestError,
};
use holoplay_transport::{DEFAULT_SUBPROTOCOL, DEFAULT_URL};
use tracing::debug;

use crate::exit::{client_error, request_error, CliError, CliResult, SUCCESS, TIMEOUT, USAGE};
use crate::output::{print_value, OutputFormat};

pub mod info;
pub mod send;
pub mod show;
pub mod version;
pub mod wipe;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect and print the driver's info reply.
    Info(InfoArgs),
    /// Send one command and print the reply.
    Send(SendArgs),
    /// Clear a display back to its background.
    Wipe(WipeArgs),
    /// Show a quilt image.
    Show(ShowArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Info(args) => block_on(info::run(args, format)),
        Command::Send(args) => block_on(send::run(args, format)),
        Command::Wipe(args) => block_on(wipe::run(args, format)),
        Command::Show(args) => block_on(show::run(args, format)),
        Command::Version(args) => version::run(args, format),
    }
}

fn block_on(command: impl Future<Output = CliResult<i32>>) -> CliResult<i32> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| crate::exit::io_error("failed to start runtime", err))?;
    runtime.block_on(command)
}

/// Close behavior as accepted on the command line.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OnClose {
    Wipe,
    Hide,
    None,
}

impl From<OnClose> for CloseBehavior {
    fn from(value: OnClose) -> Self {
        match value {
            OnClose::Wipe => CloseBehavior::Wipe,
            OnClose::Hide => CloseBehavior::Hide,
            OnClose::None => CloseBehavior::None,
        }
    }
}

/// Options shared by every command that talks to the driver.
#[derive(Args, Debug, Clone)]
pub struct ConnectArgs {
    /// Driver WebSocket URL.
    #[arg(long, env = "HOLOPLAY_URL", default_value = DEFAULT_URL)]
    pub url: String,
    /// How long to wait for the connection and for each reply (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    /// Retransmit interval for unanswered requests (e.g. 1s).
    #[arg(long, default_value = "60s")]
    pub retry_after: String,
    /// Application id to register with.
    #[arg(long)]
    pub app_id: Option<String>,
    /// Take over the display.
    #[arg(long)]
    pub greedy: bool,
    /// What the driver does with the display when this client disconnects.
    #[arg(long, value_enum)]
    pub on_close: Option<OnClose>,
    /// Ask the driver for verbose replies.
    #[arg(long)]
    pub debug: bool,
}

impl ConnectArgs {
    pub fn timeout(&self) -> CliResult<Duration> {
        parse_duration(&self.timeout)
    }

    pub fn client_config(&self, fetch_info: bool) -> CliResult<ClientConfig> {
        Ok(ClientConfig {
            url: self.url.clone(),
            subprotocol: Some(DEFAULT_SUBPROTOCOL.to_string()),
            app_id: self.app_id.clone(),
            greedy: self.greedy,
            on_close: self.on_close.map(CloseBehavior::from),
            debug: self.debug,
            fetch_info,
            correlator: CorrelatorConfig {
                default_timeout: parse_duration(&self.retry_after)?,
                ..CorrelatorConfig::default()
            },
            id_seed: None,
        })
    }

    /// True when connecting registers with `init` instead of fetching info.
    pub fn registers(&self) -> bool {
        self.app_id.is_some() || self.greedy || self.on_close.is_some()
    }

    /// Connect within the configured timeout.
    pub async fn connect(&self, fetch_info: bool) -> CliResult<Client> {
        let timeout = self.timeout()?;
        let config = self.client_config(fetch_info)?;
        match tokio::time::timeout(timeout, Client::connect(config)).await {
            Ok(Ok(client)) => Ok(client),
            Ok(Err(err)) => Err(client_error("connect failed", err)),
            Err(_) => Err(CliError::new(
                TIMEOUT,
                format!("no answer from {} after {timeout:?}", self.url),
            )),
        }
    }
}

/// Send one message, wait for its reply, print it, and disconnect.
///
/// A rejected reply is printed too, then reported as a failure.
pub async fn exchange(
    client: Client,
    message: &Message,
    wait: Duration,
    context: &str,
    format: OutputFormat,
) -> CliResult<i32> {
    debug!(command = message.name().unwrap_or_default(), "sending");
    let result = client.request_within(message.to_value(), wait).await;
    client.disconnect().await;
    report(result, context, format)
}

pub fn report(
    result: Result<Value, ClientError>,
    context: &str,
    format: OutputFormat,
) -> CliResult<i32> {
    match result {
        Ok(reply) => {
            print_value(&reply, format);
            Ok(SUCCESS)
        }
        Err(ClientError::Request(RequestError::Rejected(reply))) => {
            print_value(&reply, format);
            Err(request_error(context, RequestError::Rejected(reply)))
        }
        Err(err) => Err(client_error(context, err)),
    }
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Command map as JSON, e.g. '{"check":{"name":"scene"}}'.
    #[arg(long)]
    pub json: String,
    /// File attached as the binary part of the message.
    #[arg(long, value_name = "FILE")]
    pub bin: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct WipeArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Display index. The driver's default display when omitted.
    #[arg(long)]
    pub display: Option<u32>,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Quilt image file.
    pub file: PathBuf,
    /// Views across.
    #[arg(long, default_value_t = 5)]
    pub vx: u32,
    /// Views down.
    #[arg(long, default_value_t = 9)]
    pub vy: u32,
    /// Aspect ratio of one view.
    #[arg(long, default_value_t = 1.6)]
    pub aspect: f64,
    /// Views in use, when fewer than vx * vy.
    #[arg(long)]
    pub vtotal: Option<u32>,
    /// Display index.
    #[arg(long)]
    pub display: Option<u32>,
    /// Cache the quilt under this name and show it on the default display.
    #[arg(long, conflicts_with = "display")]
    pub cache_as: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(match unit {
        "ms" => Duration::from_millis(value),
        _ => Duration::from_secs(value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert_eq!(parse_duration("0s").unwrap_err().code, USAGE);
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn connect_args_build_client_config() {
        let args = ConnectArgs {
            url: "ws://127.0.0.1:9/driver".into(),
            timeout: "1s".into(),
            retry_after: "250ms".into(),
            app_id: Some("cli".into()),
            greedy: false,
            on_close: Some(OnClose::Hide),
            debug: true,
        };
        let config = args.client_config(false).unwrap();
        assert_eq!(config.url, "ws://127.0.0.1:9/driver");
        assert_eq!(config.on_close, Some(CloseBehavior::Hide));
        assert_eq!(config.correlator.default_timeout, Duration::from_millis(250));
        assert!(config.needs_init());
        assert!(!config.fetch_info);
    }
}
