use holoplay_client::Message;

use crate::cmd::{exchange, WipeArgs};
use crate::exit::CliResult;
use crate::output::OutputFormat;

pub async fn run(args: WipeArgs, format: OutputFormat) -> CliResult<i32> {
    let wait = args.connect.timeout()?;
    let client = args.connect.connect(false).await?;
    exchange(client, &Message::wipe(args.display), wait, "wipe failed", format).await
}
