//! Subcommand implementations on top of [`Messenger`].

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use dsu_core::config::default_profile_dir;
use dsu_core::Messenger;
use serde_json::json;
use tracing::warn;

use crate::output::OutputMode;

/// Expand `~` and environment variables in a user-supplied path.
pub fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded =
        shellexpand::full(raw).with_context(|| format!("Failed to expand path: {}", raw))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Create a profile file and print its status.
pub fn new(
    messenger: &mut Messenger,
    path: Option<&str>,
    server: &str,
    username: &str,
    password: &str,
    output: OutputMode,
) -> Result<()> {
    let path = match path {
        Some(p) => expand_path(p)?,
        None => default_profile_dir().join(format!("{}.dsu", username)),
    };
    messenger.new_profile(&path, server, username, password)?;
    output.report(
        &json!({"success": true, "path": path, "username": username}),
        &format!("Created {}\n{}", path.display(), messenger.status()),
    );
    Ok(())
}

pub fn show(messenger: &mut Messenger, path: &Path, output: OutputMode) -> Result<()> {
    let profile = messenger.open_profile(path)?;
    let history = &profile.history;
    let summary = json!({
        "username": profile.username,
        "dsuserver": profile.dsuserver,
        "contacts": profile.contacts.all(),
        "sent": history.sent().len(),
        "received": history.received().len(),
    });

    let mut text = format!(
        "{} @ {}\nSent: {}  Received: {}\nContacts ({}):",
        profile.username,
        profile.dsuserver,
        history.sent().len(),
        history.received().len(),
        profile.contacts.len()
    );
    for contact in profile.contacts.all() {
        text.push_str(&format!("\n  {}", contact));
    }
    output.report(&summary, &text);
    Ok(())
}

pub fn add_contact(
    messenger: &mut Messenger,
    path: &Path,
    name: &str,
    output: OutputMode,
) -> Result<()> {
    messenger.open_profile(path)?;
    let added = messenger.add_contact(name)?;
    let text = if added {
        format!("Added contact: {}", name.trim())
    } else {
        format!("Contact '{}' already exists or is empty", name.trim())
    };
    output.report(&json!({"success": added, "contact": name.trim()}), &text);
    Ok(())
}

pub fn send(
    messenger: &mut Messenger,
    path: &Path,
    contact: &str,
    message: &str,
    output: OutputMode,
) -> Result<()> {
    messenger.open_profile(path)?;
    let recipient = messenger.resolve_recipient(contact)?;
    let sent = messenger.send_message(message, &recipient)?;
    output.report(
        &json!({"success": true, "message": sent}),
        &format!("Message sent to {}", sent.recipient),
    );
    Ok(())
}

/// Fetch new messages once, or repeatedly with `watch`.
pub fn poll(
    messenger: &mut Messenger,
    path: &Path,
    watch: bool,
    interval: Duration,
    output: OutputMode,
) -> Result<()> {
    messenger.open_profile(path)?;
    loop {
        match messenger.poll_new_messages() {
            Ok(messages) => {
                let text = messages
                    .iter()
                    .map(|m| format!("{}: {}", m.sender.to_uppercase(), m.body))
                    .collect::<Vec<_>>()
                    .join("\n");
                if !watch || !messages.is_empty() {
                    output.report(&messages, &text);
                }
            }
            Err(e) if watch => warn!(error = %e, "poll failed"),
            Err(e) => return Err(e.into()),
        }
        if !watch {
            return Ok(());
        }
        thread::sleep(interval);
    }
}

pub fn sync(messenger: &mut Messenger, path: &Path, output: OutputMode) -> Result<()> {
    messenger.open_profile(path)?;
    let added = messenger.sync_all()?;
    output.report(
        &json!({"success": true, "added": added}),
        &format!("{} message(s) added", added),
    );
    Ok(())
}

pub fn conversation(
    messenger: &mut Messenger,
    path: &Path,
    contact: &str,
    output: OutputMode,
) -> Result<()> {
    messenger.open_profile(path)?;
    let contact = messenger.resolve_contact(contact)?;
    let lines = messenger.conversation(&contact)?;
    let text = lines
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n");
    output.report(&lines, &text);
    Ok(())
}
