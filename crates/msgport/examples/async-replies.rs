//! Consume a streamed reply as an async `Stream`.
//!
//! Run with:
//!   cargo run --example async-replies --features async

use futures_util::StreamExt;
use msgport::port::{wrap, Message, MessageChannel};
use msgport::transport::EventLoop;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (client_end, server_end) = MessageChannel::new().into_ports();
    let client = wrap(client_end);
    let server = wrap(server_end);

    let _server = server.subscribe_and_post_replies(
        |event| {
            let n = event.data.as_u64().unwrap_or(0);
            (0..n)
                .map(|i| Message::new(format!("chunk {i}")))
                .collect::<Vec<_>>()
        },
        false,
    );

    let reply = client.post_message_with_reply(Message::new(3))?;
    // A closed reply channel does not end the stream, so stop after the
    // chunks we asked for.
    let mut chunks = reply.message_stream().take(3);
    EventLoop::current().run_until_idle();

    while let Some(item) = chunks.next().await {
        match item {
            Ok(event) => eprintln!("received {}", event.data),
            Err(event) => {
                eprintln!("reply failed: {}", event.data);
                break;
            }
        }
    }
    Ok(())
}
