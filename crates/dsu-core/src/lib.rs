//! Core library for the DSU direct-messaging client.
//!
//! Provides the line-delimited JSON wire codec, the per-request TCP session
//! client, the message history store and `.dsu` profile persistence. Front
//! ends drive everything through [`Messenger`].

pub mod client;
pub mod config;
pub mod contacts;
pub mod history;
pub mod message;
pub mod messenger;
pub mod profile;
pub mod protocol;
pub mod transport;

// Re-export commonly used types
pub use client::{Credentials, SessionClient, SessionError, Token};
pub use config::ClientConfig;
pub use contacts::ContactList;
pub use history::{ConversationLine, Direction, History};
pub use message::{IncomingMessage, MessageRecord, OutgoingMessage, Timestamp};
pub use messenger::{Messenger, MessengerError};
pub use profile::{create_profile_file, PersistenceError, Profile};
pub use protocol::CodecError;
pub use transport::{Endpoint, TcpTransport, Transport};
