//! Direct message types shared by the session client, history store and
//! profile file.
//!
//! Field names match the persisted `.dsu` layout: the body is stored under
//! `message`, the sender of a received message under `from`.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Current wall-clock time as fractional seconds since the Unix epoch.
///
/// This is the timestamp format the server expects in direct-message frames.
pub fn unix_timestamp() -> f64 {
    let now = chrono::Utc::now();
    now.timestamp_micros() as f64 / 1_000_000.0
}

/// A message timestamp in fractional seconds since the Unix epoch.
///
/// Keeps the JSON form it was read in: the server echoes timestamps back as
/// strings, and older profile files store them that way or as integers.
/// Writing a loaded timestamp back produces the same JSON value.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Timestamp {
    Number(Number),
    Text(String),
}

impl Timestamp {
    pub fn as_f64(&self) -> f64 {
        match self {
            Timestamp::Number(n) => n.as_f64().unwrap_or(f64::NAN),
            Timestamp::Text(s) => s.trim().parse().unwrap_or(f64::NAN),
        }
    }
}

impl From<f64> for Timestamp {
    fn from(secs: f64) -> Self {
        match Number::from_f64(secs) {
            Some(n) => Timestamp::Number(n),
            None => Timestamp::Text(secs.to_string()),
        }
    }
}

/// Equal when they denote the same instant, whatever the JSON form.
impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.as_f64() == other.as_f64()
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum NumberOrString {
            Number(Number),
            Text(String),
        }

        match NumberOrString::deserialize(deserializer)? {
            NumberOrString::Number(n) => Ok(Timestamp::Number(n)),
            NumberOrString::Text(s) => match s.trim().parse::<f64>() {
                Ok(secs) if secs.is_finite() => Ok(Timestamp::Text(s)),
                _ => Err(de::Error::custom(format!("invalid timestamp '{}'", s))),
            },
        }
    }
}

/// A message this client sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub recipient: String,
    #[serde(rename = "message")]
    pub body: String,
    pub timestamp: Timestamp,
}

/// A message retrieved from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingMessage {
    #[serde(rename = "from")]
    pub sender: String,
    #[serde(rename = "message")]
    pub body: String,
    pub timestamp: Timestamp,
}

/// One entry of the merged history.
///
/// Untagged on disk: the variant is recognised by which of `recipient` or
/// `from` is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageRecord {
    Sent(OutgoingMessage),
    Received(IncomingMessage),
}

impl MessageRecord {
    /// The other party of the conversation this record belongs to.
    pub fn counterpart(&self) -> &str {
        match self {
            MessageRecord::Sent(m) => &m.recipient,
            MessageRecord::Received(m) => &m.sender,
        }
    }

    pub fn body(&self) -> &str {
        match self {
            MessageRecord::Sent(m) => &m.body,
            MessageRecord::Received(m) => &m.body,
        }
    }

    pub fn timestamp(&self) -> &Timestamp {
        match self {
            MessageRecord::Sent(m) => &m.timestamp,
            MessageRecord::Received(m) => &m.timestamp,
        }
    }
}

impl From<OutgoingMessage> for MessageRecord {
    fn from(message: OutgoingMessage) -> Self {
        MessageRecord::Sent(message)
    }
}

impl From<IncomingMessage> for MessageRecord {
    fn from(message: IncomingMessage) -> Self {
        MessageRecord::Received(message)
    }
}
