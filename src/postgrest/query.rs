//! Query builders for [`TableClient`](super::TableClient)

use std::collections::HashMap;

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::Error;
use crate::fetch::Fetch;

/// Base query builder holding accumulated query parameters
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    params: HashMap<String, String>,
}

impl QueryBuilder {
    /// Create a new QueryBuilder
    pub fn new() -> Self {
        Self {
            params: HashMap::new(),
        }
    }

    /// Add a parameter to the query
    pub fn add_param(&mut self, key: &str, value: &str) {
        self.params.insert(key.to_string(), value.to_string());
    }

    /// Get the query parameters
    pub fn get_params(&self) -> &HashMap<String, String> {
        &self.params
    }
}

/// Parse the total from a PostgREST `Content-Range` header (`0-0/42`, `*/0`).
fn parse_content_range(value: &str) -> Option<u64> {
    value.rsplit('/').next()?.parse().ok()
}

/// Builder for SELECT queries
pub struct SelectBuilder {
    url: String,
    key: String,
    client: Client,
    query: QueryBuilder,
}

impl SelectBuilder {
    /// Create a new SelectBuilder
    pub fn new(url: String, key: String, columns: &str, client: Client) -> Self {
        let mut query = QueryBuilder::new();
        query.add_param("select", columns);

        Self {
            url,
            key,
            client,
            query,
        }
    }

    /// Filter rows where column equals a value
    pub fn eq<T: ToString>(mut self, column: &str, value: T) -> Self {
        self.query
            .add_param(column, &format!("eq.{}", value.to_string()));
        self
    }

    /// Filter rows where column does not equal a value
    pub fn neq<T: ToString>(mut self, column: &str, value: T) -> Self {
        self.query
            .add_param(column, &format!("neq.{}", value.to_string()));
        self
    }

    /// Filter rows where column is greater than or equal to a value
    pub fn gte<T: ToString>(mut self, column: &str, value: T) -> Self {
        self.query
            .add_param(column, &format!("gte.{}", value.to_string()));
        self
    }

    /// Filter rows where column is less than or equal to a value
    pub fn lte<T: ToString>(mut self, column: &str, value: T) -> Self {
        self.query
            .add_param(column, &format!("lte.{}", value.to_string()));
        self
    }

    /// Filter rows where column is in a list of values
    pub fn in_list<T: ToString>(mut self, column: &str, values: &[T]) -> Self {
        let values_str: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        self.query
            .add_param(column, &format!("in.({})", values_str.join(",")));
        self
    }

    /// Combine filters disjunctively. The expression uses PostgREST's `or`
    /// syntax, e.g. `and(sender_id.eq.A,receiver_id.eq.B),and(...)`.
    pub fn or_filter(mut self, expression: &str) -> Self {
        self.query.add_param("or", &format!("({})", expression));
        self
    }

    /// Limit the number of rows returned
    pub fn limit(mut self, count: i32) -> Self {
        self.query.add_param("limit", &count.to_string());
        self
    }

    /// Return rows `from..=to` (zero-based, inclusive)
    pub fn range(mut self, from: i64, to: i64) -> Self {
        self.query.add_param("offset", &from.to_string());
        self.query.add_param("limit", &(to - from + 1).to_string());
        self
    }

    /// Order the results by a column
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.query
            .add_param("order", &format!("{}.{}", column, direction));
        self
    }

    /// Execute the query and return the results
    pub async fn execute<T: DeserializeOwned>(&self) -> Result<Vec<T>, Error> {
        let fetch = Fetch::get(&self.client, &self.url)
            .api_key(&self.key)
            .query(self.query.get_params().clone());

        let result = fetch.execute::<Vec<T>>().await?;
        Ok(result)
    }

    /// Execute as a single-object request. Returns `Ok(None)` when no row
    /// matches (PostgREST signals this with code `PGRST116`).
    pub async fn execute_single<T: DeserializeOwned>(&self) -> Result<Option<T>, Error> {
        let fetch = Fetch::get(&self.client, &self.url)
            .api_key(&self.key)
            .header("Accept", "application/vnd.pgrst.object+json")
            .query(self.query.get_params().clone());

        match fetch.execute::<T>().await {
            Ok(row) => Ok(Some(row)),
            Err(err) if err.is_no_rows() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Count matching rows without transferring them, via
    /// `Prefer: count=exact` and the `Content-Range` response header.
    pub async fn count(&self) -> Result<u64, Error> {
        let fetch = Fetch::head(&self.client, &self.url)
            .api_key(&self.key)
            .header("Prefer", "count=exact")
            .query(self.query.get_params().clone());

        let response = fetch.execute_raw().await?;
        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| Error::general("count response carried no usable Content-Range header"))
    }
}

/// Builder for INSERT queries
pub struct InsertBuilder<T: Serialize> {
    url: String,
    key: String,
    values: T,
    client: Client,
}

impl<T: Serialize> InsertBuilder<T> {
    /// Create a new InsertBuilder
    pub fn new(url: String, key: String, values: T, client: Client) -> Self {
        Self {
            url,
            key,
            values,
            client,
        }
    }

    /// Execute the query and return the inserted rows
    pub async fn execute<R: DeserializeOwned>(&self) -> Result<R, Error> {
        let fetch = Fetch::post(&self.client, &self.url)
            .api_key(&self.key)
            .header("Prefer", "return=representation")
            .json(&self.values)?;

        let result = fetch.execute::<R>().await?;
        Ok(result)
    }

    /// Execute the query without returning the inserted data
    pub async fn execute_no_return(&self) -> Result<(), Error> {
        let fetch = Fetch::post(&self.client, &self.url)
            .api_key(&self.key)
            .header("Prefer", "return=minimal")
            .json(&self.values)?;

        fetch.execute_raw().await?;
        Ok(())
    }
}

/// Builder for UPDATE queries
pub struct UpdateBuilder<T: Serialize> {
    url: String,
    key: String,
    values: T,
    client: Client,
    query: QueryBuilder,
}

impl<T: Serialize> UpdateBuilder<T> {
    /// Create a new UpdateBuilder
    pub fn new(url: String, key: String, values: T, client: Client) -> Self {
        Self {
            url,
            key,
            values,
            client,
            query: QueryBuilder::new(),
        }
    }

    /// Filter rows where column equals a value
    pub fn eq<V: ToString>(mut self, column: &str, value: V) -> Self {
        self.query
            .add_param(column, &format!("eq.{}", value.to_string()));
        self
    }

    /// Execute the query and return the updated rows
    pub async fn execute<R: DeserializeOwned>(&self) -> Result<R, Error> {
        let fetch = Fetch::patch(&self.client, &self.url)
            .api_key(&self.key)
            .header("Prefer", "return=representation")
            .query(self.query.get_params().clone())
            .json(&self.values)?;

        let result = fetch.execute::<R>().await?;
        Ok(result)
    }

    /// Execute the query without returning the updated data
    pub async fn execute_no_return(&self) -> Result<(), Error> {
        let fetch = Fetch::patch(&self.client, &self.url)
            .api_key(&self.key)
            .header("Prefer", "return=minimal")
            .query(self.query.get_params().clone())
            .json(&self.values)?;

        fetch.execute_raw().await?;
        Ok(())
    }
}

/// Builder for DELETE queries
pub struct DeleteBuilder {
    url: String,
    key: String,
    client: Client,
    query: QueryBuilder,
}

impl DeleteBuilder {
    /// Create a new DeleteBuilder
    pub fn new(url: String, key: String, client: Client) -> Self {
        Self {
            url,
            key,
            client,
            query: QueryBuilder::new(),
        }
    }

    /// Filter rows where column equals a value
    pub fn eq<V: ToString>(mut self, column: &str, value: V) -> Self {
        self.query
            .add_param(column, &format!("eq.{}", value.to_string()));
        self
    }

    /// Execute the query without returning the deleted data
    pub async fn execute_no_return(&self) -> Result<(), Error> {
        let fetch = Fetch::delete(&self.client, &self.url)
            .api_key(&self.key)
            .header("Prefer", "return=minimal")
            .query(self.query.get_params().clone());

        fetch.execute_raw().await?;
        Ok(())
    }
}

/// Builder for RPC (stored procedure) calls
pub struct RpcBuilder<T: Serialize> {
    url: String,
    key: String,
    params: T,
    client: Client,
}

impl<T: Serialize> RpcBuilder<T> {
    /// Create a new RpcBuilder
    pub fn new(base_url: &str, key: &str, function: &str, params: T, client: Client) -> Self {
        Self {
            url: format!("{}/rest/v1/rpc/{}", base_url, function),
            key: key.to_string(),
            params,
            client,
        }
    }

    /// Execute the RPC call and return the results
    pub async fn execute<R: DeserializeOwned>(&self) -> Result<R, Error> {
        let fetch = Fetch::post(&self.client, &self.url)
            .api_key(&self.key)
            .json(&self.params)?;

        let result = fetch.execute::<R>().await?;
        Ok(result)
    }

    /// Execute the RPC call and discard the response body
    pub async fn execute_no_return(&self) -> Result<(), Error> {
        let fetch = Fetch::post(&self.client, &self.url)
            .api_key(&self.key)
            .json(&self.params)?;

        fetch.execute_raw().await?;
        Ok(())
    }
}
