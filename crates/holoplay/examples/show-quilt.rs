//! Show a quilt image on the first Looking Glass display.
//!
//! ```text
//! cargo run -p holoplay --example show-quilt -- quilt.png
//! ```

use holoplay::client::ConnectionEvent;
use holoplay::{Client, ClientConfig, Message, QuiltSettings, Value};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .ok_or("usage: show-quilt <quilt-image>")?;
    let image = std::fs::read(&path)?;

    let config = ClientConfig {
        app_id: Some("show-quilt".into()),
        ..ClientConfig::default()
    };
    let mut client = Client::connect(config).await?;
    let mut events = client.events().ok_or("event stream already taken")?;

    if let Some(reply) = client.handshake_reply() {
        println!("driver: {:?}", reply.get("version").and_then(Value::as_str));
    }

    let message = Message::show(QuiltSettings::default(), image.into(), None);
    let reply = client.send_message(&message)?.await?;
    println!("shown: {}", reply.get("error").is_some_and(Value::is_zero));

    client.disconnect().await;
    while let Some(event) = events.recv().await {
        if event == ConnectionEvent::Closed {
            break;
        }
    }
    Ok(())
}
