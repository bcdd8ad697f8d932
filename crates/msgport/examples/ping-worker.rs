//! Worker-style ping/pong, plus a second channel handed to the worker as a
//! transferable.
//!
//! Run with:
//!   cargo run --example ping-worker

use msgport::port::{wrap, Message, MessageChannel, Response};
use msgport::transport::EventLoop;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (host_end, worker_end) = MessageChannel::new().into_ports();
    let host = wrap(host_end);
    let worker = wrap(worker_end);

    let _worker = worker.subscribe_and_post_replies(
        |event| match event.data.as_str() {
            Some("ping") => Response::from("pong"),
            Some("connect") => match event.ports.get(1) {
                Some(extra) => {
                    let side = wrap(extra.clone());
                    if let Err(err) = side.post_message("hello over the side channel") {
                        eprintln!("side channel post failed: {err}");
                    }
                    Response::from("connected")
                }
                None => Response::error("connect needs a port"),
            },
            _ => Response::Empty,
        },
        false,
    );

    let ping = host.post_message_with_reply("ping")?;
    ping.subscribe_next(|event| eprintln!("ping -> {}", event.data));

    let (ours, theirs) = MessageChannel::new().into_ports();
    let side = wrap(ours);
    side.subscribe_next(|event| eprintln!("side channel: {}", event.data));
    let connect = host.post_message_with_reply(Message::new("connect").with_transfer(theirs))?;
    connect.subscribe_next(|event| eprintln!("connect -> {}", event.data));

    EventLoop::current().run_until_idle();
    Ok(())
}
