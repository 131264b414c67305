//! Chat messaging between profiles
//!
//! Sends go through an outbox: a message is enqueued under a client-side
//! correlation id, shown immediately, and reconciled or evicted once the
//! backend answers. Reads and conversation listings are plain table queries;
//! live updates arrive through the realtime channel built in
//! [`crate::realtime`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Error;
use crate::models::{Message, NewMessage, Profile};
use crate::realtime::{Channel, ChangeEvent};
use crate::Backend;

/// A message sent locally but not yet confirmed by the backend.
#[derive(Debug, Clone)]
pub struct PendingMessage {
    pub correlation_id: Uuid,
    pub message: NewMessage,
    pub queued_at: DateTime<Utc>,
}

/// Locally queued sends keyed by correlation id.
#[derive(Debug, Default)]
pub struct Outbox {
    pending: HashMap<Uuid, PendingMessage>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a message for sending and return its correlation id.
    pub fn enqueue(&mut self, message: NewMessage) -> Uuid {
        let correlation_id = Uuid::new_v4();
        self.pending.insert(
            correlation_id,
            PendingMessage {
                correlation_id,
                message,
                queued_at: Utc::now(),
            },
        );
        correlation_id
    }

    /// The backend confirmed this send; drop the pending entry and hand the
    /// caller the confirmed row to swap in.
    pub fn reconcile(&mut self, correlation_id: Uuid, confirmed: Message) -> Option<Message> {
        self.pending.remove(&correlation_id).map(|_| confirmed)
    }

    /// The send failed; drop the entry and return it so the caller can
    /// surface a retry affordance.
    pub fn evict(&mut self, correlation_id: Uuid) -> Option<PendingMessage> {
        self.pending.remove(&correlation_id)
    }

    /// Pending sends, oldest first.
    pub fn pending(&self) -> Vec<&PendingMessage> {
        let mut entries: Vec<&PendingMessage> = self.pending.values().collect();
        entries.sort_by_key(|entry| entry.queued_at);
        entries
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Message and conversation operations.
pub struct ChatService<'a> {
    backend: &'a Backend,
}

impl<'a> ChatService<'a> {
    pub fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    /// Persist a message and return the stored row.
    pub async fn send_message(&self, message: &NewMessage) -> Result<Message, Error> {
        let rows: Vec<Message> = self
            .backend
            .from("messages")
            .insert(message)
            .execute()
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| Error::general("insert returned no message row"))
    }

    /// All messages between two profiles, oldest first.
    pub async fn messages_between(&self, a: Uuid, b: Uuid) -> Result<Vec<Message>, Error> {
        let expression = format!(
            "and(sender_id.eq.{a},receiver_id.eq.{b}),and(sender_id.eq.{b},receiver_id.eq.{a})"
        );

        self.backend
            .from("messages")
            .select("*")
            .or_filter(&expression)
            .order("created_at", true)
            .execute()
            .await
    }

    /// Mark every message from `sender` to `receiver` as read.
    pub async fn mark_read(&self, sender: Uuid, receiver: Uuid) -> Result<(), Error> {
        self.backend
            .from("messages")
            .update(&serde_json::json!({ "read": true }))
            .eq("sender_id", sender)
            .eq("receiver_id", receiver)
            .execute_no_return()
            .await
    }

    /// The realtime subscription delivering new messages addressed to a
    /// user. Transport is up to the consumer; see [`crate::realtime`].
    pub fn message_channel(&self, user_id: Uuid) -> Channel {
        self.backend
            .realtime()
            .channel("messages")
            .table("messages")
            .event(ChangeEvent::Insert)
            .eq("receiver_id", &user_id.to_string())
            .build()
    }

    /// Every profile the given user could chat with (everyone but
    /// themselves), ordered by first name.
    pub async fn chat_partners(&self, user_id: Uuid) -> Result<Vec<Profile>, Error> {
        self.backend
            .from("profiles")
            .select("*")
            .neq("id", user_id)
            .order("first_name", true)
            .execute()
            .await
    }
}
