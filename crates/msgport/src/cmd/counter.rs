use std::cell::{Cell, RefCell};
use std::rc::Rc;

use msgport_port::{
    FnObserver, HandlerError, MessageChannel, MessageEvent, Port, PortConfig, Subscription,
};
use msgport_transport::EventLoop;
use serde_json::json;

use crate::cmd::CounterArgs;
use crate::exit::{expect_replies, port_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{preview, print_events, EventRecord, OutputFormat};

pub fn run(args: CounterArgs, format: OutputFormat) -> CliResult<i32> {
    let event_loop = EventLoop::new();
    let config = PortConfig::default().with_event_loop(event_loop.clone());
    let count = Rc::new(Cell::new(args.start));
    let records = Rc::new(RefCell::new(Vec::new()));

    let mut clients = Vec::new();
    let mut servers = Vec::new();
    let mut subscriptions = Vec::new();
    for _ in 0..args.clients {
        let (near, far) = MessageChannel::with_event_loop(&event_loop).into_ports();
        let server = Port::with_config(far, config.clone());
        subscriptions.extend(serve(&server, &count));
        server
            .start()
            .map_err(|err| port_error("start server port", err))?;
        clients.push(Port::with_config(near, config.clone()));
        servers.push(server);
    }

    let mut expected = 0;
    for round in 0..args.rounds {
        for (index, client) in clients.iter().enumerate() {
            let op = if index % 2 == 0 { "inc" } else { "dec" };
            let peer = format!("client-{index}");
            let sink = Rc::clone(&records);
            let record = Rc::new(move |event: MessageEvent| {
                sink.borrow_mut()
                    .push(EventRecord::new(peer.clone(), Some(json!(op)), &event));
            });
            let on_error = Rc::clone(&record);
            client
                .post_message_with_reply_to(op, |reply| {
                    subscriptions.push(reply.subscribe(
                        FnObserver::new()
                            .on_next(move |event: MessageEvent| record(event))
                            .on_error(move |event: MessageEvent| on_error(event)),
                    ));
                })
                .map_err(|err| port_error("post request", err))?;
            expected += 1;
            tracing::debug!(client = index, round, op, "request posted");
        }
    }

    let delivered = event_loop.run_until_idle();
    tracing::info!(delivered, final_count = count.get(), "counter demo finished");

    for subscription in &subscriptions {
        subscription.unsubscribe();
    }

    let records = records.borrow();
    print_events(&records, format);
    expect_replies("counter", expected, records.len())?;
    if let Some(failure) = records.iter().find(|record| record.is_error()) {
        return Err(CliError::new(
            FAILURE,
            format!("counter: {}", preview(&failure.data)),
        ));
    }
    Ok(SUCCESS)
}

/// Installs one handler per operation on its own filtered view of `server`.
fn serve(server: &Port, count: &Rc<Cell<i64>>) -> [Subscription; 2] {
    let inc = Rc::clone(count);
    let dec = Rc::clone(count);
    [
        server
            .filter(|event| event.data == "inc")
            .subscribe_and_post_replies(move |_| step(&inc, "inc", 1), false),
        server
            .filter(|event| event.data == "dec")
            .subscribe_and_post_replies(move |_| step(&dec, "dec", -1), false),
    ]
}

/// Applies `delta`, failing the request instead of wrapping around.
fn step(count: &Cell<i64>, op: &str, delta: i64) -> Result<String, HandlerError> {
    let next = count
        .get()
        .checked_add(delta)
        .ok_or_else(|| HandlerError::new(format!("{op}: counter out of range")))?;
    count.set(next);
    Ok(format!("{op} {next}"))
}
