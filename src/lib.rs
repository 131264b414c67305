//! Rehabilitation-center management backend
//!
//! Thin services over a hosted Supabase-compatible backend (auth, PostgREST
//! tables, object storage, realtime pub/sub): participant and course
//! management, lead intake, document storage, chat, dashboard queries, and
//! the schema-repair workflow that keeps the hosted tables healthy.

pub mod api;
pub mod auth;
pub mod backfill;
pub mod chat;
pub mod config;
pub mod dashboard;
pub mod documents;
pub mod error;
pub mod fetch;
pub mod kurse;
pub mod leads;
pub mod models;
pub mod postgrest;
pub mod realtime;
pub mod repair;
pub mod schema;
pub mod seed;
pub mod storage;
pub mod teilnehmer;

use reqwest::Client;

use crate::auth::AdminAuth;
use crate::config::Config;
use crate::error::Error;
use crate::postgrest::{RpcBuilder, TableClient};
use crate::realtime::RealtimeClient;
use crate::storage::StorageClient;

/// Handle to the hosted backend: one configuration, one shared HTTP client.
///
/// Constructed once at process start and passed by reference to every
/// component that needs backend access.
#[derive(Debug, Clone)]
pub struct Backend {
    config: Config,
    http_client: Client,
}

impl Backend {
    /// Create a new backend handle from a configuration.
    pub fn new(config: Config) -> Result<Self, Error> {
        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// The configuration this backend was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// A table client authenticated with the low-privilege anon key.
    pub fn from(&self, table: &str) -> TableClient {
        TableClient::new(
            &self.config.base_url,
            &self.config.anon_key,
            table,
            self.http_client.clone(),
        )
    }

    /// A table client authenticated with the service-role key when one is
    /// configured, falling back to the anon key otherwise.
    pub fn from_privileged(&self, table: &str) -> TableClient {
        TableClient::new(
            &self.config.base_url,
            self.config.privileged_key(),
            table,
            self.http_client.clone(),
        )
    }

    /// A privileged RPC call to a stored procedure.
    pub fn rpc<T: serde::Serialize>(&self, function: &str, params: T) -> RpcBuilder<T> {
        RpcBuilder::new(
            &self.config.base_url,
            self.config.privileged_key(),
            function,
            params,
            self.http_client.clone(),
        )
    }

    /// The admin identity client (GoTrue admin API).
    pub fn auth_admin(&self) -> AdminAuth {
        AdminAuth::new(
            &self.config.base_url,
            self.config.privileged_key(),
            self.http_client.clone(),
        )
    }

    /// The object storage client.
    pub fn storage(&self) -> StorageClient {
        StorageClient::new(
            &self.config.base_url,
            self.config.privileged_key(),
            self.http_client.clone(),
        )
    }

    /// The realtime subscription interface.
    pub fn realtime(&self) -> RealtimeClient {
        RealtimeClient::new(&self.config.base_url, &self.config.anon_key)
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::Error;
    pub use crate::Backend;
}
