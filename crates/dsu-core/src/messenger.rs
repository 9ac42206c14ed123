//! Front-end facing messenger: one open profile plus a lazily joined session.
//!
//! This is the surface a UI drives. Every operation returns a typed result;
//! errors display as status-bar text. Nothing here prints.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::client::{SessionClient, SessionError};
use crate::config::ClientConfig;
use crate::history::ConversationLine;
use crate::message::{IncomingMessage, OutgoingMessage};
use crate::profile::{PersistenceError, Profile};
use crate::transport::{TcpTransport, Transport};

/// Errors surfaced to the front end. `Display` gives the status text.
#[derive(Error, Debug)]
pub enum MessengerError {
    #[error("ERROR: No file loaded. Open or create a file to continue.")]
    NoProfile,

    #[error("ERROR: '{0}' is not in your contacts. Add it first.")]
    UnknownContact(String),

    #[error("ERROR: '{query}' is not in your contacts. Did you mean '{suggestion}'?")]
    SimilarContact { query: String, suggestion: String },

    #[error("ERROR: Profile has no server address.")]
    NoServerAddress,

    #[error("{}", session_status(.0))]
    Session(#[from] SessionError),

    #[error("ERROR: {0}")]
    Persistence(#[from] PersistenceError),
}

fn session_status(err: &SessionError) -> String {
    match err {
        SessionError::NotAuthenticated => "ERROR: Not joined to the server.".to_string(),
        SessionError::Rejected(reason) => format!("ERROR: {}", reason),
        SessionError::Unreachable(_) => {
            "ERROR: Host is unreachable. Check WiFi, IP address, and port.".to_string()
        }
        SessionError::InvalidEndpoint(_) => "ERROR: IP address or port is invalid.".to_string(),
        SessionError::Decode(_) => "ERROR: Unexpected response from the server.".to_string(),
    }
}

pub struct Messenger<T: Transport + Clone = TcpTransport> {
    config: ClientConfig,
    transport: T,
    profile: Option<Profile>,
    path: Option<PathBuf>,
    session: Option<SessionClient<T>>,
}

impl Messenger<TcpTransport> {
    pub fn new(config: ClientConfig) -> Self {
        let transport = TcpTransport::new(config.timeout);
        Self::with_transport(config, transport)
    }
}

impl<T: Transport + Clone> Messenger<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            profile: None,
            path: None,
            session: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn profile_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Status line for the current profile.
    pub fn status(&self) -> String {
        match &self.profile {
            Some(profile) => format!("{} - Ready", profile.username),
            None => "No file loaded. Open or create a file to continue.".to_string(),
        }
    }

    /// Create a new profile file at `path` and make it current.
    pub fn new_profile(
        &mut self,
        path: impl AsRef<Path>,
        server: &str,
        username: &str,
        password: &str,
    ) -> Result<&Profile, MessengerError> {
        let profile = Profile::new(server, username, password);
        let path = profile.save_new(path)?;
        info!(path = %path.display(), user = username, "created profile");
        Ok(self.install(profile, path))
    }

    /// Load the profile at `path` and make it current.
    pub fn open_profile(&mut self, path: impl AsRef<Path>) -> Result<&Profile, MessengerError> {
        let path = path.as_ref();
        let profile = Profile::load(path)?;
        Ok(self.install(profile, path.to_path_buf()))
    }

    /// Write the current profile to an existing file at `path`, which then
    /// becomes the profile's path.
    pub fn save_profile(&mut self, path: impl AsRef<Path>) -> Result<(), MessengerError> {
        let path = path.as_ref();
        self.current()?.save(path)?;
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    /// Add a contact. Returns `false` if it was empty or already present.
    pub fn add_contact(&mut self, name: &str) -> Result<bool, MessengerError> {
        let profile = self.current_mut()?;
        if !profile.contacts.add(name) {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Map user input to the contact a message should go to.
    ///
    /// Only exact or case-insensitive matches are accepted. A near miss is
    /// reported with the closest contact as a suggestion.
    pub fn resolve_recipient(&self, query: &str) -> Result<String, MessengerError> {
        let contacts = &self.current()?.contacts;
        if let Some(name) = contacts.find(query) {
            return Ok(name.to_string());
        }
        let query = query.trim().to_string();
        match contacts.resolve(&query) {
            Some(suggestion) => Err(MessengerError::SimilarContact {
                query,
                suggestion: suggestion.to_string(),
            }),
            None => Err(MessengerError::UnknownContact(query)),
        }
    }

    /// Map user input to a stored contact name, allowing approximate input.
    pub fn resolve_contact(&self, query: &str) -> Result<String, MessengerError> {
        self.current()?
            .contacts
            .resolve(query)
            .map(str::to_string)
            .ok_or_else(|| MessengerError::UnknownContact(query.trim().to_string()))
    }

    /// Send `body` to `contact`, record it and save.
    pub fn send_message(
        &mut self,
        body: &str,
        contact: &str,
    ) -> Result<OutgoingMessage, MessengerError> {
        let message = self.session()?.send_message(body, contact)?;
        self.current_mut()?.history.record_sent(message.clone());
        self.persist()?;
        Ok(message)
    }

    /// Fetch unread messages, record them and save if any arrived.
    pub fn poll_new_messages(&mut self) -> Result<Vec<IncomingMessage>, MessengerError> {
        let messages = self.session()?.retrieve_new()?;
        if !messages.is_empty() {
            info!(count = messages.len(), "new messages");
            self.current_mut()?
                .history
                .record_received(messages.iter().cloned());
            self.persist()?;
        }
        Ok(messages)
    }

    /// Fetch the full inbox and record anything not already in history.
    ///
    /// Returns the number of messages added.
    pub fn sync_all(&mut self) -> Result<usize, MessengerError> {
        let messages = self.session()?.retrieve_all()?;
        let added = self.current_mut()?.history.merge_received(messages);
        if added > 0 {
            self.persist()?;
        }
        Ok(added)
    }

    pub fn conversation(&self, contact: &str) -> Result<Vec<ConversationLine>, MessengerError> {
        Ok(self.current()?.history.conversation_with(contact))
    }

    fn install(&mut self, profile: Profile, path: PathBuf) -> &Profile {
        self.session = None;
        self.path = Some(path);
        self.profile.insert(profile)
    }

    fn current(&self) -> Result<&Profile, MessengerError> {
        self.profile.as_ref().ok_or(MessengerError::NoProfile)
    }

    fn current_mut(&mut self) -> Result<&mut Profile, MessengerError> {
        self.profile.as_mut().ok_or(MessengerError::NoProfile)
    }

    fn persist(&self) -> Result<(), MessengerError> {
        if let (Some(profile), Some(path)) = (&self.profile, &self.path) {
            if let Err(e) = profile.save(path) {
                warn!(path = %path.display(), error = %e, "failed to save profile");
                return Err(e.into());
            }
        }
        Ok(())
    }

    /// Joined session for the current profile, joining on first use.
    fn session(&mut self) -> Result<&SessionClient<T>, MessengerError> {
        let profile = self.current()?;
        if profile.dsuserver.trim().is_empty() {
            return Err(MessengerError::NoServerAddress);
        }

        let joined = self
            .session
            .as_ref()
            .is_some_and(|s| s.is_authenticated() && *s.credentials() == profile.credentials());
        if !joined {
            let mut client = SessionClient::with_transport(
                profile.credentials(),
                self.config.port,
                self.transport.clone(),
            )?;
            client.join()?;
            self.session = Some(client);
        }

        self.session
            .as_ref()
            .ok_or(MessengerError::Session(SessionError::NotAuthenticated))
    }
}
