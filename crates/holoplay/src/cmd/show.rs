use std::fs;

use bytes::Bytes;
use holoplay_client::{Message, QuiltSettings};

use crate::cmd::{exchange, ShowArgs};
use crate::exit::{io_error, CliResult};
use crate::output::OutputFormat;

pub async fn run(args: ShowArgs, format: OutputFormat) -> CliResult<i32> {
    let wait = args.connect.timeout()?;
    let image = fs::read(&args.file)
        .map_err(|err| io_error(&format!("failed reading {}", args.file.display()), err))?;
    let message = build_message(&args, Bytes::from(image));

    let client = args.connect.connect(false).await?;
    exchange(client, &message, wait, "show failed", format).await
}

fn build_message(args: &ShowArgs, image: Bytes) -> Message {
    let settings = QuiltSettings {
        vx: args.vx,
        vy: args.vy,
        aspect: args.aspect,
        vtotal: args.vtotal,
    };
    match &args.cache_as {
        Some(name) => Message::cache(name, settings, image, true),
        None => Message::show(settings, image, args.display),
    }
}
