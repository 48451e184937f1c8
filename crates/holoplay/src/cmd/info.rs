use holoplay_client::Message;

use crate::cmd::{exchange, InfoArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_value, OutputFormat};

pub async fn run(args: InfoArgs, format: OutputFormat) -> CliResult<i32> {
    let wait = args.connect.timeout()?;
    let client = args.connect.connect(true).await?;

    // Without init options the handshake already was an info request.
    if !args.connect.registers() {
        if let Some(reply) = client.handshake_reply().cloned() {
            client.disconnect().await;
            print_value(&reply, format);
            return Ok(SUCCESS);
        }
    }
    exchange(client, &Message::info(), wait, "info failed", format).await
}
