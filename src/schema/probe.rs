//! Read-only schema probing

use log::debug;
use serde_json::Value;

use crate::error::Error;
use crate::schema::{TableSpec, KNOWN_TABLES};
use crate::Backend;

/// Health of one table, as observed through the REST interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableStatus {
    /// The table exists and every probed column is selectable.
    ExistsOk,
    /// The table does not exist (`42P01`).
    Missing,
    /// The table exists but a probed column does not (`42703`).
    Malformed { column: String },
}

impl TableStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, TableStatus::ExistsOk)
    }
}

/// Per-table probe results for a whole run.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub tables: Vec<(&'static str, TableStatus)>,
}

impl ProbeReport {
    /// True when every probed table is present and well-formed.
    pub fn all_healthy(&self) -> bool {
        self.tables.iter().all(|(_, status)| status.is_healthy())
    }

    /// The status recorded for a table, if it was probed.
    pub fn status_of(&self, table: &str) -> Option<&TableStatus> {
        self.tables
            .iter()
            .find(|(name, _)| *name == table)
            .map(|(_, status)| status)
    }
}

/// Probes application tables without modifying anything.
pub struct SchemaProber<'a> {
    backend: &'a Backend,
}

impl<'a> SchemaProber<'a> {
    pub fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    /// Probe a single table. Backend schema errors are absorbed into the
    /// returned status; only transport and configuration failures surface
    /// as `Err`.
    pub async fn probe(&self, spec: &TableSpec) -> Result<TableStatus, Error> {
        let columns = spec.probe_columns.join(",");
        let result = self
            .backend
            .from_privileged(spec.name)
            .select(&columns)
            .limit(1)
            .execute::<Value>()
            .await;

        match result {
            Ok(_) => Ok(TableStatus::ExistsOk),
            Err(err) if err.is_undefined_table() => Ok(TableStatus::Missing),
            Err(err) if err.is_undefined_column() => {
                let column = self.identify_missing_column(spec).await?;
                Ok(TableStatus::Malformed { column })
            }
            Err(err) => Err(err),
        }
    }

    /// Probe every known table. Schema problems never abort the sweep.
    pub async fn probe_all(&self) -> Result<ProbeReport, Error> {
        let mut tables = Vec::with_capacity(KNOWN_TABLES.len());
        for spec in KNOWN_TABLES {
            let status = self.probe(spec).await?;
            debug!("probed table {}: {:?}", spec.name, status);
            tables.push((spec.name, status));
        }
        Ok(ProbeReport { tables })
    }

    /// A combined select failed with an undefined-column error; re-probe one
    /// column at a time to name the culprit.
    async fn identify_missing_column(&self, spec: &TableSpec) -> Result<String, Error> {
        for column in spec.probe_columns {
            let result = self
                .backend
                .from_privileged(spec.name)
                .select(column)
                .limit(1)
                .execute::<Value>()
                .await;

            match result {
                Ok(_) => continue,
                Err(err) if err.is_undefined_column() => return Ok((*column).to_string()),
                Err(err) => return Err(err),
            }
        }
        // The combined probe failed but no single column reproduces it.
        Ok("unknown".to_string())
    }
}
