use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use msgport_transport::{EventType, MessageEvent};
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One event observed by a demo participant.
#[derive(Clone, Debug, Serialize)]
pub struct EventRecord {
    /// Who saw the event, e.g. `client-0` or `server`.
    pub peer: String,
    /// What that participant had sent to provoke it, if anything.
    pub request: Option<Value>,
    pub kind: &'static str,
    pub data: Value,
    pub ports: usize,
}

impl EventRecord {
    pub fn new(peer: impl Into<String>, request: Option<Value>, event: &MessageEvent) -> Self {
        Self {
            peer: peer.into(),
            request,
            kind: event.kind.as_str(),
            data: event.data.clone(),
            ports: event.ports.len(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == EventType::MessageError.as_str()
    }
}

#[derive(Serialize)]
struct EventOutput<'a> {
    schema_id: &'a str,
    #[serde(flatten)]
    record: &'a EventRecord,
    timestamp: String,
}

pub fn print_events(records: &[EventRecord], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let timestamp = now_unix_seconds();
            for record in records {
                let out = EventOutput {
                    schema_id:
                        "https://schemas.3leaps.dev/msgport/cli/v1/event-received.schema.json",
                    record,
                    timestamp: timestamp.clone(),
                };
                println!(
                    "{}",
                    serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PEER", "REQUEST", "KIND", "DATA"]);
            for record in records {
                table.add_row(vec![
                    record.peer.clone(),
                    record.request.as_ref().map(preview).unwrap_or_default(),
                    record.kind.to_string(),
                    preview(&record.data),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for record in records {
                match &record.request {
                    Some(request) => println!(
                        "{} {} -> {} {}",
                        record.peer,
                        preview(request),
                        record.kind,
                        preview(&record.data)
                    ),
                    None => println!(
                        "{} {} {}",
                        record.peer,
                        record.kind,
                        preview(&record.data)
                    ),
                }
            }
        }
        OutputFormat::Raw => {
            for record in records {
                println!("{}", preview(&record.data));
            }
        }
    }
}

/// Strings print bare, everything else as compact JSON.
pub fn preview(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
