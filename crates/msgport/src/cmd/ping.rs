use std::cell::{Cell, RefCell};
use std::rc::Rc;

use msgport_port::{MessageChannel, MessageEvent, Port, PortConfig, Subscription};
use msgport_transport::EventLoop;
use serde_json::json;

use crate::cmd::PingArgs;
use crate::exit::{expect_replies, port_error, CliResult, SUCCESS};
use crate::output::{print_events, EventRecord, OutputFormat};

pub fn run(args: PingArgs, format: OutputFormat) -> CliResult<i32> {
    let event_loop = EventLoop::new();
    let config = PortConfig::default().with_event_loop(event_loop.clone());
    let (near, far) = MessageChannel::with_event_loop(&event_loop).into_ports();
    let client = Port::with_config(near, config.clone());
    let worker = Port::with_config(far, config);

    let pongs = Rc::new(Cell::new(0u32));
    let worker_subscription = answer_pings(&worker, &pongs);

    let records = Rc::new(RefCell::new(Vec::new()));
    let subscriptions = send_pings(&client, args.count, &records)?;

    event_loop.run_until_idle();
    tracing::info!(pongs = pongs.get(), "ping finished");
    for subscription in subscriptions.iter().chain([&worker_subscription]) {
        subscription.unsubscribe();
    }

    let records = records.borrow();
    print_events(&records, format);
    expect_replies("ping", args.count as usize, records.len())?;
    Ok(SUCCESS)
}

fn answer_pings(worker: &Port, pongs: &Rc<Cell<u32>>) -> Subscription {
    let counter = Rc::clone(pongs);
    worker.subscribe_and_post_replies(
        move |event: &MessageEvent| {
            (event.data == "ping").then(|| {
                counter.set(counter.get() + 1);
                format!("pong {}", counter.get())
            })
        },
        false,
    )
}

/// Posts `count` pings, recording each reply. The returned subscriptions
/// hold the reply ports open until unsubscribed.
fn send_pings(
    client: &Port,
    count: u32,
    records: &Rc<RefCell<Vec<EventRecord>>>,
) -> CliResult<Vec<Subscription>> {
    let mut subscriptions = Vec::new();
    for _ in 0..count {
        let reply = client
            .post_message_with_reply("ping")
            .map_err(|err| port_error("post ping", err))?;
        let sink = Rc::clone(records);
        subscriptions.push(reply.subscribe_next(move |event| {
            sink.borrow_mut()
                .push(EventRecord::new("client", Some(json!("ping")), &event));
        }));
    }
    Ok(subscriptions)
}
