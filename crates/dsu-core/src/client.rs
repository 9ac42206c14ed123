//! Session client for the DSU server.
//!
//! Holds the credentials and the session token issued at join time. Every
//! operation is a single round trip through a [`Transport`].
//!
//! CHANGELOG:
//! - 03/02/2026 - Token and timestamp returned explicitly instead of via shared state
//! - 02/26/2026 - Initial implementation

use std::fmt;
use std::io;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::message::{unix_timestamp, IncomingMessage, OutgoingMessage};
use crate::protocol::{self, CodecError, ListScope, ResponseKind};
use crate::transport::{Endpoint, TcpTransport, Transport};

/// Errors that can occur while talking to the server.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Not joined to the server")]
    NotAuthenticated,

    #[error("Server rejected the request: {0}")]
    Rejected(String),

    #[error("Server unreachable: {0}")]
    Unreachable(#[from] io::Error),

    #[error("Invalid server endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Bad response from server: {0}")]
    Decode(#[from] CodecError),
}

/// Server address plus login.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub server: String,
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(
        server: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Opaque session token issued by the server on join.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(<redacted>)")
    }
}

/// A client bound to one set of credentials.
///
/// Starts unauthenticated. [`SessionClient::join`] must succeed before any
/// other call; until then every other call fails with
/// [`SessionError::NotAuthenticated`] without touching the network.
pub struct SessionClient<T: Transport = TcpTransport> {
    credentials: Credentials,
    endpoint: Endpoint,
    transport: T,
    token: Option<Token>,
}

impl SessionClient<TcpTransport> {
    /// Create a TCP-backed client using the port and timeout from `config`.
    pub fn connect_with(
        credentials: Credentials,
        config: &ClientConfig,
    ) -> Result<Self, SessionError> {
        Self::with_transport(credentials, config.port, TcpTransport::new(config.timeout))
    }
}

impl<T: Transport> SessionClient<T> {
    /// Create a client over an arbitrary transport.
    ///
    /// Fails with `InvalidEndpoint` if the server address cannot be parsed.
    pub fn with_transport(
        credentials: Credentials,
        default_port: u16,
        transport: T,
    ) -> Result<Self, SessionError> {
        let endpoint = Endpoint::parse(&credentials.server, default_port)?;
        Ok(Self {
            credentials,
            endpoint,
            transport,
            token: None,
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Join the server and store the issued token.
    ///
    /// On any failure the previous token (if any) is kept.
    pub fn join(&mut self) -> Result<Token, SessionError> {
        let frame = protocol::encode_join(&self.credentials.username, &self.credentials.password)?;
        let line = self.round_trip(&frame)?;
        let reply = protocol::decode_single(&line)?;

        if reply.kind == ResponseKind::Error {
            warn!(user = %self.credentials.username, reason = %reply.message, "join rejected");
            return Err(SessionError::Rejected(reply.message));
        }

        let token = match reply.token {
            Some(t) if !t.is_empty() => Token(t),
            _ => return Err(SessionError::Decode(CodecError::MissingField("token"))),
        };

        info!(user = %self.credentials.username, endpoint = %self.endpoint, "joined server");
        self.token = Some(token.clone());
        Ok(token)
    }

    /// Send `body` to `recipient`.
    ///
    /// The returned message carries exactly the timestamp written into the
    /// frame.
    pub fn send_message(
        &self,
        body: &str,
        recipient: &str,
    ) -> Result<OutgoingMessage, SessionError> {
        let token = self.require_token()?;
        let timestamp = unix_timestamp();
        let frame = protocol::encode_direct_message(token.as_str(), body, recipient, timestamp)?;
        let line = self.round_trip(&frame)?;
        let reply = protocol::decode_single(&line)?;

        if reply.kind == ResponseKind::Error {
            warn!(recipient, reason = %reply.message, "send rejected");
            return Err(SessionError::Rejected(reply.message));
        }

        info!(recipient, "message sent");
        Ok(OutgoingMessage {
            recipient: recipient.to_string(),
            body: body.to_string(),
            timestamp: timestamp.into(),
        })
    }

    /// Fetch messages the server has not delivered before.
    pub fn retrieve_new(&self) -> Result<Vec<IncomingMessage>, SessionError> {
        self.retrieve(ListScope::New)
    }

    /// Fetch every message addressed to this user.
    pub fn retrieve_all(&self) -> Result<Vec<IncomingMessage>, SessionError> {
        self.retrieve(ListScope::All)
    }

    fn retrieve(&self, scope: ListScope) -> Result<Vec<IncomingMessage>, SessionError> {
        let token = self.require_token()?;
        let frame = protocol::encode_list(token.as_str(), scope)?;
        let line = self.round_trip(&frame)?;
        let reply = protocol::decode_list(&line)?;

        if reply.kind == ResponseKind::Error {
            let reason = reply.message.unwrap_or_default();
            warn!(?scope, %reason, "retrieve rejected");
            return Err(SessionError::Rejected(reason));
        }

        let messages: Vec<IncomingMessage> =
            reply.messages.into_iter().map(IncomingMessage::from).collect();
        debug!(?scope, count = messages.len(), "retrieved messages");
        Ok(messages)
    }

    fn require_token(&self) -> Result<&Token, SessionError> {
        self.token.as_ref().ok_or(SessionError::NotAuthenticated)
    }

    fn round_trip(&self, frame: &str) -> Result<String, SessionError> {
        debug!(endpoint = %self.endpoint, bytes = frame.len(), "sending frame");
        let line = self.transport.exchange(&self.endpoint, frame)?;
        debug!(bytes = line.len(), "received response");
        Ok(line)
    }
}
