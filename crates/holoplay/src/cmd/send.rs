use std::fs;

use bytes::Bytes;
use holoplay_cbor::Value;
use holoplay_client::Message;

use crate::cmd::{exchange, SendArgs};
use crate::exit::{io_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub async fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait = args.connect.timeout()?;
    let message = resolve_message(&args)?;
    let client = args.connect.connect(false).await?;
    exchange(client, &message, wait, "send failed", format).await
}

fn resolve_message(args: &SendArgs) -> CliResult<Message> {
    let cmd = parse_command(&args.json)?;
    let bin = match &args.bin {
        Some(path) => Some(Bytes::from(fs::read(path).map_err(|err| {
            io_error(&format!("failed reading {}", path.display()), err)
        })?)),
        None => None,
    };
    Ok(Message::new(cmd, bin))
}

/// The command must be a JSON object, e.g. `{"info":{}}`.
fn parse_command(json: &str) -> CliResult<Value> {
    let parsed: serde_json::Value = serde_json::from_str(json)
        .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
    if !parsed.is_object() {
        return Err(CliError::new(USAGE, "--json must be an object"));
    }
    Ok(Value::from(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command_object() {
        let cmd = parse_command(r#"{"check":{"name":"scene"}}"#).unwrap();
        assert_eq!(
            cmd,
            Value::map([("check", Value::map([("name", "scene")]))])
        );
    }

    #[test]
    fn rejects_invalid_or_non_object_json() {
        assert_eq!(parse_command("{nope").unwrap_err().code, USAGE);
        assert_eq!(parse_command("[1,2]").unwrap_err().code, USAGE);
    }
}
