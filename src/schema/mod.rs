//! Schema health: probing and versioned repair
//!
//! The hosted backend owns the tables, but nothing guarantees they exist or
//! carry the columns this application writes. [`SchemaProber`] detects
//! missing or drifted tables without side effects; [`SchemaRepairer`] brings
//! them to the expected shape through ordered, recorded migrations.

mod migrate;
mod probe;

pub use migrate::{
    Migration, RepairOutcome, SchemaRepairer, EXEC_FUNCTION, HISTORY_TABLE, MIGRATIONS,
};
pub use probe::{ProbeReport, SchemaProber, TableStatus};

/// The expected shape of one application table, as far as probing needs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    /// Columns whose absence the prober should detect individually.
    pub probe_columns: &'static [&'static str],
}

/// Every table the application writes, with the columns it depends on.
pub const KNOWN_TABLES: &[TableSpec] = &[
    TableSpec {
        name: "profiles",
        probe_columns: &[
            "id",
            "email",
            "first_name",
            "last_name",
            "avatar_url",
            "role",
            "is_demo",
        ],
    },
    TableSpec {
        name: "messages",
        probe_columns: &["id", "sender_id", "receiver_id", "content", "read"],
    },
    TableSpec {
        name: "teilnehmer",
        probe_columns: &["id", "vorname", "nachname", "aktiv", "kurs_id"],
    },
    TableSpec {
        name: "kurse",
        probe_columns: &["id", "name", "max_teilnehmer", "aktiv"],
    },
    TableSpec {
        name: "kurs_teilnehmer",
        probe_columns: &["kurs_id", "teilnehmer_id"],
    },
    TableSpec {
        name: "leads",
        probe_columns: &["id", "name", "email", "status"],
    },
    TableSpec {
        name: "dokumente",
        probe_columns: &["id", "teilnehmer_id", "dateiname", "storage_path"],
    },
];

/// Look up a table spec by name.
pub fn table_spec(name: &str) -> Option<&'static TableSpec> {
    KNOWN_TABLES.iter().find(|spec| spec.name == name)
}
