use std::cell::Cell;
use std::rc::Rc;

use msgport_port::{MessageChannel, MessageEvent, Port, PortConfig};
use msgport_transport::{EventLoop, EventType};
use serde::Serialize;

use crate::build_info::BuildInfo;
use crate::cmd::EnvinfoArgs;
use crate::exit::{port_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

const SCHEMA_ID: &str = "https://schemas.3leaps.dev/msgport/cli/v1/envinfo.schema.json";

/// Settings read from the environment by the CLI itself.
const ENV_VARS: [&str; 2] = ["MSGPORT_LOG_LEVEL", "MSGPORT_LOG_FORMAT"];

#[derive(Serialize)]
struct EnvInfo {
    schema_id: &'static str,
    build: BuildInfo,
    port: PortDefaults,
    channel: ChannelDefaults,
    loopback: Loopback,
    environment: Vec<EnvVar>,
}

/// What `Port::with_config(target, PortConfig::default())` behaves like.
#[derive(Serialize)]
struct PortDefaults {
    autostart: bool,
    wrap_factory: &'static str,
    event_loop: &'static str,
}

#[derive(Serialize)]
struct ChannelDefaults {
    max_pending: usize,
    event_types: Vec<&'static str>,
}

/// One request/reply exchange over a fresh channel and event loop.
#[derive(Serialize)]
struct Loopback {
    replies: usize,
    tasks_run: usize,
}

#[derive(Serialize)]
struct EnvVar {
    name: &'static str,
    value: Option<String>,
}

impl PortDefaults {
    fn from_config(config: &PortConfig) -> Self {
        Self {
            autostart: config.autostart,
            wrap_factory: config.wrap_port.as_ref().map_or("plain", |_| "custom"),
            event_loop: config.event_loop.as_ref().map_or("thread-current", |_| "configured"),
        }
    }
}

pub fn run(_args: EnvinfoArgs, format: OutputFormat) -> CliResult<i32> {
    let defaults = PortConfig::default();
    let info = EnvInfo {
        schema_id: SCHEMA_ID,
        build: BuildInfo::current(),
        port: PortDefaults::from_config(&defaults),
        channel: ChannelDefaults {
            max_pending: defaults.channel.max_pending,
            event_types: EventType::ALL.into_iter().map(EventType::as_str).collect(),
        },
        loopback: loopback()?,
        environment: ENV_VARS
            .into_iter()
            .map(|name| EnvVar {
                name,
                value: std::env::var(name).ok(),
            })
            .collect(),
    };

    match format {
        OutputFormat::Json => match serde_json::to_string(&info) {
            Ok(line) => println!("{line}"),
            Err(err) => tracing::error!(error = %err, "envinfo did not serialize"),
        },
        OutputFormat::Table | OutputFormat::Pretty => print_sections(&info),
        OutputFormat::Raw => println!("{}", info.build.version),
    }
    Ok(SUCCESS)
}

/// Echoes one message through a reply channel and counts what came back.
fn loopback() -> CliResult<Loopback> {
    let event_loop = EventLoop::new();
    let config = PortConfig::default().with_event_loop(event_loop.clone());
    let (near, far) = MessageChannel::with_event_loop(&event_loop).into_ports();
    let echo = Port::with_config(far, config.clone())
        .subscribe_and_post_replies(|event: &MessageEvent| event.data.clone(), false);

    let replies = Rc::new(Cell::new(0));
    let counted = Rc::clone(&replies);
    let reply = Port::with_config(near, config)
        .post_message_with_reply("envinfo")
        .map_err(|err| port_error("loopback", err))?;
    let listening = reply.subscribe_next(move |_| counted.set(counted.get() + 1));

    let tasks_run = event_loop.run_until_idle();
    listening.unsubscribe();
    echo.unsubscribe();
    tracing::debug!(replies = replies.get(), tasks_run, "loopback finished");

    Ok(Loopback {
        replies: replies.get(),
        tasks_run,
    })
}

fn print_sections(info: &EnvInfo) {
    let build = &info.build;
    println!("msgport {} ({}, {})", build.version, build.target, build.profile);
    println!("features: {}", build.features.join(", "));

    println!("\nport defaults");
    println!("  autostart      {}", info.port.autostart);
    println!("  wrap factory   {}", info.port.wrap_factory);
    println!("  event loop     {}", info.port.event_loop);

    println!("\nchannel defaults");
    println!("  max pending    {}", info.channel.max_pending);
    println!("  event types    {}", info.channel.event_types.join(", "));

    println!("\nloopback");
    println!("  replies        {}", info.loopback.replies);
    println!("  tasks run      {}", info.loopback.tasks_run);

    println!("\nenvironment");
    for var in &info.environment {
        println!("  {:<20} {}", var.name, var.value.as_deref().unwrap_or("(not set)"));
    }
}

#[cfg(test)]
mod tests {
    use msgport_port::{WrapPortFn, Wrapped};

    use super::*;

    #[test]
    fn loopback_gets_exactly_one_reply() {
        let result = loopback().expect("loopback should post");
        assert_eq!(result.replies, 1);
        assert!(result.tasks_run >= 2, "tasks run: {}", result.tasks_run);
    }

    #[test]
    fn port_defaults_describe_the_config() {
        let plain = PortDefaults::from_config(&PortConfig::default());
        assert!(plain.autostart);
        assert_eq!(plain.wrap_factory, "plain");
        assert_eq!(plain.event_loop, "thread-current");

        let factory: WrapPortFn =
            Rc::new(|target: Wrapped| Port::with_config(target, PortConfig::default()));
        let custom = PortConfig::default()
            .with_autostart(false)
            .with_wrap_port(factory)
            .with_event_loop(EventLoop::new());
        let custom = PortDefaults::from_config(&custom);
        assert!(!custom.autostart);
        assert_eq!(custom.wrap_factory, "custom");
        assert_eq!(custom.event_loop, "configured");
    }
}
