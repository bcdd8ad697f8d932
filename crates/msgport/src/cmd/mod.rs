use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod counter;
pub mod envinfo;
pub mod ping;
pub mod stream;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the shared-counter demo: clients send inc/dec over one channel,
    /// each request answered on its own reply port.
    Counter(CounterArgs),
    /// Ping a worker-style port and print the pongs.
    Ping(PingArgs),
    /// Stream values to a server over a transferred channel.
    Stream(StreamArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Print build and environment diagnostics.
    Envinfo(EnvinfoArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Counter(args) => counter::run(args, format),
        Command::Ping(args) => ping::run(args, format),
        Command::Stream(args) => stream::run(args, format),
        Command::Version(args) => version::run(args),
        Command::Envinfo(args) => envinfo::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct CounterArgs {
    /// Number of clients sharing the counter.
    #[arg(long, default_value = "2", value_parser = clap::value_parser!(u32).range(1..))]
    pub clients: u32,
    /// Requests each client sends.
    #[arg(long, default_value = "1")]
    pub rounds: u32,
    /// Starting counter value.
    #[arg(long, default_value = "1", allow_negative_numbers = true)]
    pub start: i64,
}

#[derive(Args, Debug)]
pub struct PingArgs {
    /// Number of pings to send.
    #[arg(long, short = 'n', default_value = "3")]
    pub count: u32,
}

#[derive(Args, Debug)]
pub struct StreamArgs {
    /// Number of values to stream.
    #[arg(long, short = 'n', default_value = "5")]
    pub count: u32,
    /// Fail the stream instead of sending this value (0-based).
    #[arg(long, value_name = "INDEX")]
    pub fail_at: Option<u32>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct EnvinfoArgs {}
