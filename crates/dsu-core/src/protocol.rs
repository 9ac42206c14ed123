//! Wire codec for the DSU direct-messaging protocol.
//!
//! The server speaks line-delimited JSON over TCP. Each request and response
//! is a single JSON object; the transport appends the CRLF terminator.
//!
//! Requests:
//! ```json
//! {"join": {"username": "...", "password": "...", "token": ""}}
//! {"token": "...", "directmessage": {"entry": "...", "recipient": "...", "timestamp": 1603167689.39}}
//! {"token": "...", "directmessage": "new"}
//! {"token": "...", "directmessage": "all"}
//! ```
//!
//! Responses:
//! ```json
//! {"response": {"type": "ok", "message": "...", "token": "..."}}
//! {"response": {"type": "ok", "messages": [{"from": "...", "message": "...", "timestamp": "..."}]}}
//! ```
//!
//! Everything here is pure. Timestamps and tokens are passed in by the caller
//! and extracted tokens are returned, never stashed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::message::{IncomingMessage, Timestamp};

/// Errors produced while decoding a server frame.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Empty response from server")]
    EmptyFrame,

    #[error("Malformed response: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Response is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Response is not valid UTF-8: {0}")]
    InvalidUtf8(#[source] std::string::FromUtf8Error),

    #[error("Response exceeds {0} bytes without a line terminator")]
    FrameTooLarge(u64),

    #[error("Failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Outcome reported in `response.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    Ok,
    Error,
}

/// Which slice of the inbox a list request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListScope {
    New,
    All,
}

#[derive(Serialize)]
struct JoinFrame<'a> {
    join: JoinBody<'a>,
}

#[derive(Serialize)]
struct JoinBody<'a> {
    username: &'a str,
    password: &'a str,
    token: &'a str,
}

#[derive(Serialize)]
struct DirectMessageFrame<'a> {
    token: &'a str,
    directmessage: DirectMessageBody<'a>,
}

#[derive(Serialize)]
struct DirectMessageBody<'a> {
    entry: &'a str,
    recipient: &'a str,
    timestamp: f64,
}

#[derive(Serialize)]
struct ListFrame<'a> {
    token: &'a str,
    directmessage: ListScope,
}

fn to_frame<T: Serialize>(frame: &T) -> Result<String, CodecError> {
    serde_json::to_string(frame).map_err(CodecError::Encode)
}

/// Encode a join request. The token placeholder is always empty.
pub fn encode_join(username: &str, password: &str) -> Result<String, CodecError> {
    to_frame(&JoinFrame {
        join: JoinBody {
            username,
            password,
            token: "",
        },
    })
}

/// Encode a direct message send request.
pub fn encode_direct_message(
    token: &str,
    body: &str,
    recipient: &str,
    timestamp: f64,
) -> Result<String, CodecError> {
    to_frame(&DirectMessageFrame {
        token,
        directmessage: DirectMessageBody {
            entry: body,
            recipient,
            timestamp,
        },
    })
}

/// Encode a request for unread messages.
pub fn encode_list_new(token: &str) -> Result<String, CodecError> {
    encode_list(token, ListScope::New)
}

/// Encode a request for every message addressed to this user.
pub fn encode_list_all(token: &str) -> Result<String, CodecError> {
    encode_list(token, ListScope::All)
}

pub fn encode_list(token: &str, scope: ListScope) -> Result<String, CodecError> {
    to_frame(&ListFrame {
        token,
        directmessage: scope,
    })
}

#[derive(Deserialize)]
struct Envelope<T> {
    response: T,
}

#[derive(Deserialize)]
struct SingleBody {
    #[serde(rename = "type")]
    kind: ResponseKind,
    message: Option<String>,
    token: Option<String>,
}

#[derive(Deserialize)]
struct ListBody {
    #[serde(rename = "type")]
    kind: ResponseKind,
    message: Option<String>,
    messages: Option<Vec<RawMessage>>,
}

/// Response to join or send.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub kind: ResponseKind,
    pub message: String,
    /// Present when the server issued a session token (join only).
    pub token: Option<String>,
}

/// Response to a list request.
#[derive(Debug, Clone, PartialEq)]
pub struct ListReply {
    pub kind: ResponseKind,
    /// Empty when the server rejected the request.
    pub messages: Vec<RawMessage>,
    /// Server text, present on rejection.
    pub message: Option<String>,
}

/// A message element as it appears in a list response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawMessage {
    pub from: String,
    pub message: String,
    pub timestamp: Timestamp,
}

impl From<RawMessage> for IncomingMessage {
    fn from(raw: RawMessage) -> Self {
        IncomingMessage {
            sender: raw.from,
            body: raw.message,
            timestamp: raw.timestamp,
        }
    }
}

fn parse_envelope<'a, T: Deserialize<'a>>(line: &'a str) -> Result<T, CodecError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Err(CodecError::EmptyFrame);
    }
    let envelope: Envelope<T> = serde_json::from_str(line).map_err(CodecError::Malformed)?;
    Ok(envelope.response)
}

/// Decode a join or send response.
pub fn decode_single(line: &str) -> Result<Reply, CodecError> {
    let body: SingleBody = parse_envelope(line)?;
    let message = body.message.ok_or(CodecError::MissingField("message"))?;
    Ok(Reply {
        kind: body.kind,
        message,
        token: body.token,
    })
}

/// Decode a list response.
///
/// `messages` is required on success; a rejection must carry `message`.
pub fn decode_list(line: &str) -> Result<ListReply, CodecError> {
    let body: ListBody = parse_envelope(line)?;
    match body.kind {
        ResponseKind::Ok => Ok(ListReply {
            kind: ResponseKind::Ok,
            messages: body.messages.ok_or(CodecError::MissingField("messages"))?,
            message: body.message,
        }),
        ResponseKind::Error => Ok(ListReply {
            kind: ResponseKind::Error,
            messages: Vec::new(),
            message: Some(body.message.ok_or(CodecError::MissingField("message"))?),
        }),
    }
}
