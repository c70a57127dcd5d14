//! Message and room roster domain types.
//!
//! A [`Message`] is the immutable unit flowing through the pipeline:
//! host receives it → mediator analyzes it → delivery layer acts on the verdict.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Receiver identity used when a room has no other participant on record.
pub const UNKNOWN_RECEIVER: &str = "unknown";

/// A single chat message submitted for analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Identity of the author
    pub sender_id: String,

    /// The text content
    pub text: String,

    /// When the host received the message
    pub timestamp: DateTime<Utc>,

    /// The room (co-parent pair) this message belongs to
    pub room_id: String,
}

impl Message {
    /// Create a new message stamped with the current time.
    pub fn new(
        room_id: impl Into<String>,
        sender_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender_id: sender_id.into(),
            text: text.into(),
            timestamp: Utc::now(),
            room_id: room_id.into(),
        }
    }

    /// Override the timestamp (history replay, tests).
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// A room participant as known to the message source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Participant {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// A relationship entry from the sender's contact list (child, partner, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub name: String,

    /// Free-form relationship label ("child", "my partner", "co-parent")
    pub relationship: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Contact {
    pub fn is_child(&self) -> bool {
        let rel = self.relationship.to_lowercase();
        ["child", "son", "daughter", "kid"]
            .iter()
            .any(|k| rel.contains(k))
    }
}

/// Everything the message source knows about who is in a room.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRoster {
    #[serde(default)]
    pub participants: Vec<Participant>,

    #[serde(default)]
    pub contacts: Vec<Contact>,
}

impl RoomRoster {
    pub fn new(participants: Vec<Participant>) -> Self {
        Self {
            participants,
            contacts: Vec::new(),
        }
    }

    pub fn with_contacts(mut self, contacts: Vec<Contact>) -> Self {
        self.contacts = contacts;
        self
    }

    /// The receiver of a message: the first participant who is not the
    /// sender, or [`UNKNOWN_RECEIVER`].
    pub fn receiver_for(&self, sender_id: &str) -> String {
        self.participants
            .iter()
            .find(|p| p.id != sender_id)
            .map(|p| p.id.clone())
            .unwrap_or_else(|| UNKNOWN_RECEIVER.to_string())
    }

    /// Display name for a participant, falling back to the identity itself.
    pub fn display_name(&self, id: &str) -> String {
        self.participants
            .iter()
            .find(|p| p.id == id)
            .and_then(|p| p.display_name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Names of contacts recorded as children.
    pub fn child_names(&self) -> Vec<String> {
        self.contacts
            .iter()
            .filter(|c| c.is_child())
            .map(|c| c.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> RoomRoster {
        RoomRoster::new(vec![
            Participant::new("alice").with_display_name("Alice"),
            Participant::new("bob"),
        ])
    }

    #[test]
    fn receiver_is_first_other_participant() {
        assert_eq!(roster().receiver_for("alice"), "bob");
        assert_eq!(roster().receiver_for("bob"), "alice");
    }

    #[test]
    fn receiver_unknown_when_alone() {
        let solo = RoomRoster::new(vec![Participant::new("alice")]);
        assert_eq!(solo.receiver_for("alice"), UNKNOWN_RECEIVER);
        assert_eq!(RoomRoster::default().receiver_for("x"), UNKNOWN_RECEIVER);
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let r = roster();
        assert_eq!(r.display_name("alice"), "Alice");
        assert_eq!(r.display_name("bob"), "bob");
    }

    #[test]
    fn child_contacts_are_detected() {
        let r = roster().with_contacts(vec![
            Contact {
                name: "Mia".into(),
                relationship: "My Daughter".into(),
                notes: None,
            },
            Contact {
                name: "Sam".into(),
                relationship: "partner".into(),
                notes: None,
            },
        ]);
        assert_eq!(r.child_names(), vec!["Mia".to_string()]);
    }

    #[test]
    fn message_uses_camel_case_on_the_wire() {
        let msg = Message::new("room-1", "alice", "hello");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["senderId"], "alice");
        assert_eq!(json["roomId"], "room-1");
    }
}
