use std::cell::RefCell;
use std::rc::Rc;

use msgport_port::{
    FnObserver, HandlerError, MessageChannel, MessageEvent, Observable, Port, PortConfig,
};
use msgport_stream::{SubscriptionObserver, Teardown};
use msgport_transport::EventLoop;
use serde_json::{json, Value};

use crate::cmd::StreamArgs;
use crate::exit::{port_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{preview, print_events, EventRecord, OutputFormat};

pub fn run(args: StreamArgs, format: OutputFormat) -> CliResult<i32> {
    let event_loop = EventLoop::new();
    let config = PortConfig::default().with_event_loop(event_loop.clone());
    let (near, far) = MessageChannel::with_event_loop(&event_loop).into_ports();
    let client = Port::with_config(near, config.clone());
    let server = Port::with_config(far, config);

    let records = Rc::new(RefCell::new(Vec::new()));
    let uploads = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&records);
    let open_uploads = Rc::clone(&uploads);
    let server_subscription = server.subscribe_with_port(move |event, upload| {
        let Some(upload) = upload else {
            tracing::warn!("request without an upload channel ignored");
            return;
        };
        let request = Some(event.data.clone());
        let on_item = Rc::clone(&sink);
        let on_error = Rc::clone(&sink);
        let item_request = request.clone();
        let subscription = upload.subscribe(
            FnObserver::new()
                .on_next(move |item: MessageEvent| {
                    on_item.borrow_mut().push(EventRecord::new(
                        "server",
                        item_request.clone(),
                        &item,
                    ));
                })
                .on_error(move |failure: MessageEvent| {
                    on_error
                        .borrow_mut()
                        .push(EventRecord::new("server", request.clone(), &failure));
                }),
        );
        open_uploads.borrow_mut().push(subscription);
    });

    let upload = client
        .post_message_with_observable("upload", counting(args.count, args.fail_at), false)
        .map_err(|err| port_error("start upload", err))?;

    event_loop.run_until_idle();
    for subscription in uploads.borrow().iter() {
        subscription.unsubscribe();
    }
    upload.unsubscribe();
    server_subscription.unsubscribe();

    let records = records.borrow();
    print_events(&records, format);
    tracing::info!(received = records.len(), "stream finished");

    if let Some(failure) = records.iter().find(|record| record.is_error()) {
        return Err(CliError::new(
            FAILURE,
            format!("stream: upload failed: {}", preview(&failure.data)),
        ));
    }
    Ok(SUCCESS)
}

/// Emits `0..count`, failing instead of emitting `fail_at`.
fn counting(count: u32, fail_at: Option<u32>) -> Observable<Value, HandlerError> {
    Observable::new(move |observer: SubscriptionObserver<Value, HandlerError>| {
        for n in 0..count {
            if fail_at == Some(n) {
                observer.error(HandlerError::new(format!("aborted at {n}")));
                return Teardown::noop();
            }
            observer.next(json!(n));
        }
        observer.complete();
        Teardown::noop()
    })
}
