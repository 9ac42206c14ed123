//! Message history: sent, received and merged sequences.
//!
//! All three are append-only. The merged sequence interleaves sent and
//! received messages in the order they were recorded and drives
//! conversation display.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::message::{IncomingMessage, MessageRecord, OutgoingMessage};

/// The three history sequences, under their `.dsu` key names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    #[serde(rename = "_sentmsgs")]
    sent: Vec<OutgoingMessage>,
    #[serde(rename = "_newmsgs")]
    received: Vec<IncomingMessage>,
    #[serde(rename = "_retrievedmsgs")]
    merged: Vec<MessageRecord>,
}

/// Who wrote a conversation line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
}

/// One line of a conversation view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationLine {
    pub direction: Direction,
    /// Contact the line was exchanged with.
    pub contact: String,
    pub body: String,
    pub timestamp: f64,
}

impl fmt::Display for ConversationLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::Outgoing => write!(f, "YOU: {}", self.body),
            Direction::Incoming => write!(f, "{}: {}", self.contact.to_uppercase(), self.body),
        }
    }
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> &[OutgoingMessage] {
        &self.sent
    }

    pub fn received(&self) -> &[IncomingMessage] {
        &self.received
    }

    pub fn merged(&self) -> &[MessageRecord] {
        &self.merged
    }

    pub fn record_sent(&mut self, message: OutgoingMessage) {
        self.merged.push(MessageRecord::Sent(message.clone()));
        self.sent.push(message);
    }

    /// Append each message, in order, to the received and merged sequences.
    pub fn record_received<I>(&mut self, messages: I)
    where
        I: IntoIterator<Item = IncomingMessage>,
    {
        for message in messages {
            self.merged.push(MessageRecord::Received(message.clone()));
            self.received.push(message);
        }
    }

    /// Like [`History::record_received`], but skips messages already in the
    /// received sequence (same sender, body and timestamp).
    ///
    /// Returns how many were appended.
    pub fn merge_received<I>(&mut self, messages: I) -> usize
    where
        I: IntoIterator<Item = IncomingMessage>,
    {
        let mut added = 0;
        for message in messages {
            if self.received.contains(&message) {
                continue;
            }
            self.merged.push(MessageRecord::Received(message.clone()));
            self.received.push(message);
            added += 1;
        }
        added
    }

    /// Merged history filtered to one contact, oldest first.
    pub fn conversation_with(&self, contact: &str) -> Vec<ConversationLine> {
        self.merged
            .iter()
            .filter(|record| record.counterpart() == contact)
            .map(|record| ConversationLine {
                direction: match record {
                    MessageRecord::Sent(_) => Direction::Outgoing,
                    MessageRecord::Received(_) => Direction::Incoming,
                },
                contact: record.counterpart().to_string(),
                body: record.body().to_string(),
                timestamp: record.timestamp().as_f64(),
            })
            .collect()
    }

    /// Conversation rendered for display, one line per message.
    pub fn render_conversation(&self, contact: &str) -> String {
        self.conversation_with(contact)
            .iter()
            .map(|line| format!("{}\n", line))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outgoing(to: &str, body: &str, ts: f64) -> OutgoingMessage {
        OutgoingMessage {
            recipient: to.to_string(),
            body: body.to_string(),
            timestamp: ts.into(),
        }
    }

    fn incoming(from: &str, body: &str, ts: f64) -> IncomingMessage {
        IncomingMessage {
            sender: from.to_string(),
            body: body.to_string(),
            timestamp: ts.into(),
        }
    }

    #[test]
    fn test_record_keeps_insertion_order() {
        let mut history = History::new();
        history.record_sent(outgoing("bob", "hi", 1.0));
        history.record_received(vec![incoming("bob", "hey", 2.0), incoming("carol", "yo", 3.0)]);
        history.record_sent(outgoing("carol", "sup", 4.0));

        assert_eq!(history.sent().len(), 2);
        assert_eq!(history.received().len(), 2);
        let order: Vec<&str> = history.merged().iter().map(|r| r.body()).collect();
        assert_eq!(order, vec!["hi", "hey", "yo", "sup"]);
    }

    #[test]
    fn test_conversation_filters_by_contact() {
        let mut history = History::new();
        history.record_sent(outgoing("bob", "hi", 1.0));
        history.record_received(vec![incoming("carol", "yo", 2.0)]);
        history.record_received(vec![incoming("bob", "hey", 3.0)]);

        let lines = history.conversation_with("bob");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].direction, Direction::Outgoing);
        assert_eq!(lines[1].direction, Direction::Incoming);
        assert_eq!(lines[1].body, "hey");
        assert!(history.conversation_with("dave").is_empty());
    }

    #[test]
    fn test_render_conversation() {
        let mut history = History::new();
        history.record_sent(outgoing("bob", "hi", 1.0));
        history.record_received(vec![incoming("bob", "hey", 2.0)]);
        assert_eq!(history.render_conversation("bob"), "YOU: hi\nBOB: hey\n");
    }

    #[test]
    fn test_merge_received_skips_known() {
        let mut history = History::new();
        history.record_received(vec![incoming("bob", "hey", 2.0)]);
        let added = history.merge_received(vec![
            incoming("bob", "hey", 2.0),
            incoming("bob", "again", 5.0),
        ]);
        assert_eq!(added, 1);
        assert_eq!(history.received().len(), 2);
        assert_eq!(history.merged().len(), 2);
    }

    #[test]
    fn test_missing_sequence_is_rejected() {
        let result = serde_json::from_str::<History>(r#"{"_sentmsgs": [], "_newmsgs": []}"#);
        assert!(result.is_err());
    }
}
