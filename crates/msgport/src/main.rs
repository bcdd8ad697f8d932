mod build_info;
mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "msgport", version, about = "Message port demos and diagnostics")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(
        long,
        value_name = "FORMAT",
        default_value = "text",
        env = "MSGPORT_LOG_FORMAT",
        global = true
    )]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        env = "MSGPORT_LOG_LEVEL",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_counter_subcommand() {
        let cli = Cli::try_parse_from(["msgport", "counter", "--clients", "3", "--rounds", "2"])
            .expect("counter args should parse");

        match cli.command {
            Command::Counter(args) => {
                assert_eq!(args.clients, 3);
                assert_eq!(args.rounds, 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn stream_fail_at_is_optional() {
        let cli = Cli::try_parse_from(["msgport", "stream", "--count", "4"])
            .expect("stream args should parse");
        assert!(matches!(
            cli.command,
            Command::Stream(ref args) if args.count == 4 && args.fail_at.is_none()
        ));
    }

    #[test]
    fn rejects_zero_clients() {
        let err = Cli::try_parse_from(["msgport", "counter", "--clients", "0"])
            .expect_err("zero clients should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let args = ["msgport", "ping", "--format", "json", "--log-level", "warn"];
        let cli = Cli::try_parse_from(args).expect("global flags should parse after subcommands");
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
        assert_eq!(cli.log_level, LogLevel::Warn);
    }
}
