//! Database operations through the PostgREST API

mod query;

use reqwest::Client;
use serde::Serialize;

pub use query::*;

/// Client for database operations on a single table or view
pub struct TableClient {
    /// The base URL for the hosted backend project
    url: String,

    /// The API key used for this client's requests
    key: String,

    /// The table or view name
    table: String,

    /// HTTP client
    client: Client,
}

impl TableClient {
    /// Create a new TableClient
    pub fn new(url: &str, key: &str, table: &str, client: Client) -> Self {
        Self {
            url: url.to_string(),
            key: key.to_string(),
            table: table.to_string(),
            client,
        }
    }

    /// Get the base URL for REST API requests
    fn get_url(&self) -> String {
        format!("{}/rest/v1/{}", self.url, self.table)
    }

    /// Select specific columns from the table
    pub fn select(&self, columns: &str) -> SelectBuilder {
        SelectBuilder::new(self.get_url(), self.key.clone(), columns, self.client.clone())
    }

    /// Insert data into the table
    pub fn insert<T: Serialize>(&self, values: T) -> InsertBuilder<T> {
        InsertBuilder::new(self.get_url(), self.key.clone(), values, self.client.clone())
    }

    /// Update data in the table
    pub fn update<T: Serialize>(&self, values: T) -> UpdateBuilder<T> {
        UpdateBuilder::new(self.get_url(), self.key.clone(), values, self.client.clone())
    }

    /// Delete data from the table
    pub fn delete(&self) -> DeleteBuilder {
        DeleteBuilder::new(self.get_url(), self.key.clone(), self.client.clone())
    }
}
