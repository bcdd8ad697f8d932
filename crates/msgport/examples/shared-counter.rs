//! Shared counter: one server port, two filtered views answering `inc` and
//! `dec`, each request answered on its own reply channel.
//!
//! Run with:
//!   cargo run --example shared-counter

use std::cell::Cell;
use std::rc::Rc;

use msgport::port::{wrap, MessageChannel};
use msgport::transport::EventLoop;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (client_end, server_end) = MessageChannel::new().into_ports();
    let client = wrap(client_end);
    let server = wrap(server_end);

    let count = Rc::new(Cell::new(1));
    let inc = Rc::clone(&count);
    let inc_handler = server
        .filter(|event| event.data == "inc")
        .subscribe_and_post_replies(
            move |_| {
                inc.set(inc.get() + 1);
                format!("inc {}", inc.get())
            },
            false,
        );
    let dec = Rc::clone(&count);
    let dec_handler = server
        .filter(|event| event.data == "dec")
        .subscribe_and_post_replies(
            move |_| {
                dec.set(dec.get() - 1);
                format!("dec {}", dec.get())
            },
            false,
        );
    // Views never autostart the endpoint they share.
    server.start()?;

    let mut replies = Vec::new();
    for op in ["inc", "inc", "dec"] {
        let reply = client.post_message_with_reply(op)?;
        replies.push(reply.subscribe_next(move |event| eprintln!("{op} -> {}", event.data)));
    }

    EventLoop::current().run_until_idle();
    eprintln!("final count: {}", count.get());
    for subscription in replies.iter().chain([&inc_handler, &dec_handler]) {
        subscription.unsubscribe();
    }
    Ok(())
}
