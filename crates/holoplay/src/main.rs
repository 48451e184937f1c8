mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "holoplay", version, about = "Talk to HoloPlay Service")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    match cmd::run(cli.command, format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_send_subcommand() {
        let cli = Cli::try_parse_from([
            "holoplay",
            "send",
            "--json",
            r#"{"info":{}}"#,
            "--url",
            "ws://127.0.0.1:11222/driver",
        ])
        .expect("send args should parse");

        match cli.command {
            Command::Send(args) => {
                assert_eq!(args.connect.url, "ws://127.0.0.1:11222/driver");
                assert!(args.bin.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn send_requires_json() {
        let err = Cli::try_parse_from(["holoplay", "send"]).expect_err("missing --json");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_wipe_with_display_and_init_options() {
        let cli = Cli::try_parse_from([
            "holoplay",
            "--log-level",
            "debug",
            "wipe",
            "--display",
            "1",
            "--app-id",
            "cli",
            "--on-close",
            "hide",
        ])
        .expect("wipe args should parse");
        assert_eq!(cli.log_level, LogLevel::Debug);
        match cli.command {
            Command::Wipe(args) => {
                assert_eq!(args.display, Some(1));
                assert!(args.connect.registers());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_close_behavior() {
        let err = Cli::try_parse_from(["holoplay", "info", "--on-close", "explode"])
            .expect_err("bad value should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }

    #[test]
    fn parses_info_subcommand() {
        let cli = Cli::try_parse_from(["holoplay", "info", "--timeout", "3s"])
            .expect("info args should parse");
        assert!(matches!(cli.command, Command::Info(_)));
    }
}
