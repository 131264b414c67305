//! Realtime subscription interface
//!
//! The chat UI receives new-message pushes through the hosted backend's
//! realtime channel. This crate treats that channel as an external
//! collaborator: it builds the subscription address and topic, and types the
//! change events, but transport is left to the consumer.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Client for realtime subscriptions
#[derive(Debug, Clone)]
pub struct RealtimeClient {
    url: String,
    key: String,
}

/// Database change event types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeEvent {
    #[serde(rename = "INSERT")]
    Insert,
    #[serde(rename = "UPDATE")]
    Update,
    #[serde(rename = "DELETE")]
    Delete,
}

/// A change notification for rows matching a subscription
#[derive(Debug, Clone, Deserialize)]
pub struct ChangePayload<T> {
    pub schema: String,
    pub table: String,
    #[serde(rename = "eventType")]
    pub event_type: ChangeEvent,
    pub new: Option<T>,
    pub old: Option<T>,
}

/// A built subscription: topic plus row filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub name: String,
    pub topic: String,
    pub event: Option<ChangeEvent>,
    pub filter: Option<String>,
}

impl RealtimeClient {
    /// Create a new RealtimeClient
    pub fn new(url: &str, key: &str) -> Self {
        Self {
            url: url.to_string(),
            key: key.to_string(),
        }
    }

    /// The WebSocket URL for the realtime service
    pub fn socket_url(&self) -> String {
        let url = self
            .url
            .replace("http://", "ws://")
            .replace("https://", "wss://");
        format!("{}/realtime/v1/websocket?apikey={}", url, self.key)
    }

    /// Start building a channel subscription
    pub fn channel(&self, name: &str) -> ChannelBuilder {
        ChannelBuilder {
            name: name.to_string(),
            schema: "public".to_string(),
            table: None,
            event: None,
            filters: HashMap::new(),
        }
    }
}

/// Builder for a postgres-changes channel subscription
pub struct ChannelBuilder {
    name: String,
    schema: String,
    table: Option<String>,
    event: Option<ChangeEvent>,
    filters: HashMap<String, String>,
}

impl ChannelBuilder {
    /// Subscribe to changes on a specific table
    pub fn table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    /// Restrict to one change event type
    pub fn event(mut self, event: ChangeEvent) -> Self {
        self.event = Some(event);
        self
    }

    /// Restrict to rows where `column = value`
    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.filters
            .insert(column.to_string(), format!("eq.{}", value));
        self
    }

    /// Build the channel
    pub fn build(self) -> Channel {
        let table = self.table.unwrap_or_else(|| "*".to_string());
        let topic = format!("realtime:{}:{}", self.schema, table);

        let filter = {
            let mut parts: Vec<String> = self
                .filters
                .iter()
                .map(|(column, predicate)| format!("{}={}", column, predicate))
                .collect();
            parts.sort();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join("&"))
            }
        };

        Channel {
            name: self.name,
            topic,
            event: self.event,
            filter,
        }
    }
}
