use bytes::Bytes;
use msgport_transport::Transferable;
use serde_json::Value;

/// An outgoing message: data plus the objects transferred with it.
#[derive(Debug, Clone, Default)]
pub struct Message {
    pub data: Value,
    pub transfer: Vec<Transferable>,
}

impl Message {
    pub fn new(data: impl Into<Value>) -> Self {
        Self {
            data: data.into(),
            transfer: Vec::new(),
        }
    }

    /// Append a transferable.
    pub fn with_transfer(mut self, item: impl Into<Transferable>) -> Self {
        self.transfer.push(item.into());
        self
    }

    /// Append a buffer transferable.
    pub fn with_buffer(self, buffer: impl Into<Bytes>) -> Self {
        self.with_transfer(buffer.into())
    }
}

impl From<Value> for Message {
    fn from(data: Value) -> Self {
        Self::new(data)
    }
}

impl From<&str> for Message {
    fn from(data: &str) -> Self {
        Self::new(data)
    }
}

impl From<String> for Message {
    fn from(data: String) -> Self {
        Self::new(data)
    }
}

impl From<(Value, Vec<Transferable>)> for Message {
    fn from((data, transfer): (Value, Vec<Transferable>)) -> Self {
        Self { data, transfer }
    }
}
