//! Versioned schema migrations
//!
//! Repairs are expressed as an ordered list of idempotent migrations. Each
//! applied version is recorded in a history table, so reruns skip completed
//! work and concurrent runs converge on the same end state.

use std::collections::HashSet;

use log::{info, warn};
use serde::Deserialize;
use serde_json::json;

use crate::error::Error;
use crate::Backend;

/// Table recording which migration versions have been applied.
pub const HISTORY_TABLE: &str = "schema_migrations";

/// Stored procedure that executes one DDL statement. Must be installed
/// manually with elevated rights before the repairer can run.
pub const EXEC_FUNCTION: &str = "execute_sql";

/// One schema change, applied at most once per deployment.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub sql: &'static str,
}

/// Every migration, in application order. Each statement is written to be
/// safe to re-execute (`IF NOT EXISTS` / guarded DO blocks).
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_profiles",
        sql: r#"
CREATE TABLE IF NOT EXISTS public.profiles (
    id UUID PRIMARY KEY REFERENCES auth.users(id) ON DELETE CASCADE,
    email TEXT,
    first_name TEXT DEFAULT '',
    last_name TEXT DEFAULT '',
    avatar_url TEXT DEFAULT '',
    role TEXT DEFAULT 'user',
    is_demo BOOLEAN DEFAULT FALSE,
    created_at TIMESTAMPTZ DEFAULT NOW(),
    updated_at TIMESTAMPTZ DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_profiles_email ON public.profiles(email);
CREATE INDEX IF NOT EXISTS idx_profiles_role ON public.profiles(role);
"#,
    },
    Migration {
        version: 2,
        name: "create_messages",
        sql: r#"
CREATE TABLE IF NOT EXISTS public.messages (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    sender_id UUID NOT NULL REFERENCES public.profiles(id) ON DELETE CASCADE,
    receiver_id UUID NOT NULL REFERENCES public.profiles(id) ON DELETE CASCADE,
    content TEXT NOT NULL,
    read BOOLEAN DEFAULT FALSE,
    created_at TIMESTAMPTZ DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_messages_sender ON public.messages(sender_id);
CREATE INDEX IF NOT EXISTS idx_messages_receiver ON public.messages(receiver_id);
CREATE INDEX IF NOT EXISTS idx_messages_created ON public.messages(created_at);
"#,
    },
    Migration {
        version: 3,
        name: "create_profile_trigger",
        sql: r#"
CREATE OR REPLACE FUNCTION public.handle_new_user()
RETURNS TRIGGER AS $$
BEGIN
    INSERT INTO public.profiles (id, email, first_name, last_name, role)
    VALUES (
        NEW.id,
        NEW.email,
        COALESCE(NEW.raw_user_meta_data->>'first_name', ''),
        COALESCE(NEW.raw_user_meta_data->>'last_name', ''),
        COALESCE(NEW.raw_user_meta_data->>'role', 'user')
    )
    ON CONFLICT (id) DO NOTHING;
    RETURN NEW;
END;
$$ LANGUAGE plpgsql SECURITY DEFINER;
DROP TRIGGER IF EXISTS on_auth_user_created ON auth.users;
CREATE TRIGGER on_auth_user_created
    AFTER INSERT ON auth.users
    FOR EACH ROW EXECUTE FUNCTION public.handle_new_user();
"#,
    },
    Migration {
        version: 4,
        name: "create_teilnehmer_and_kurse",
        sql: r#"
CREATE TABLE IF NOT EXISTS public.kurse (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name TEXT NOT NULL,
    beschreibung TEXT,
    max_teilnehmer INTEGER NOT NULL DEFAULT 10,
    start_datum DATE,
    end_datum DATE,
    aktiv BOOLEAN DEFAULT TRUE,
    trainer_id UUID REFERENCES public.profiles(id)
);
CREATE TABLE IF NOT EXISTS public.teilnehmer (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    vorname TEXT NOT NULL,
    nachname TEXT NOT NULL,
    email TEXT,
    telefon TEXT,
    geburtsdatum DATE,
    strasse TEXT,
    plz TEXT,
    ort TEXT,
    aktiv BOOLEAN DEFAULT TRUE,
    kurs_id UUID REFERENCES public.kurse(id),
    notizen TEXT,
    created_at TIMESTAMPTZ DEFAULT NOW(),
    updated_at TIMESTAMPTZ DEFAULT NOW()
);
CREATE TABLE IF NOT EXISTS public.kurs_teilnehmer (
    kurs_id UUID NOT NULL REFERENCES public.kurse(id) ON DELETE CASCADE,
    teilnehmer_id UUID NOT NULL REFERENCES public.teilnehmer(id) ON DELETE CASCADE,
    PRIMARY KEY (kurs_id, teilnehmer_id)
);
"#,
    },
    Migration {
        version: 5,
        name: "create_leads_and_dokumente",
        sql: r#"
CREATE TABLE IF NOT EXISTS public.leads (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    interest TEXT,
    source TEXT,
    status TEXT NOT NULL DEFAULT 'neu',
    created_at TIMESTAMPTZ DEFAULT NOW()
);
CREATE TABLE IF NOT EXISTS public.dokumente (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    teilnehmer_id UUID NOT NULL REFERENCES public.teilnehmer(id) ON DELETE CASCADE,
    dokument_typ TEXT NOT NULL,
    dateiname TEXT NOT NULL,
    storage_path TEXT NOT NULL,
    mime_type TEXT,
    file_size BIGINT,
    uploaded_at TIMESTAMPTZ DEFAULT NOW()
);
"#,
    },
    Migration {
        version: 6,
        name: "rename_recipient_id_to_receiver_id",
        sql: r#"
DO $$
BEGIN
    IF EXISTS (
        SELECT 1 FROM information_schema.columns
        WHERE table_schema = 'public'
          AND table_name = 'messages'
          AND column_name = 'recipient_id'
    ) AND NOT EXISTS (
        SELECT 1 FROM information_schema.columns
        WHERE table_schema = 'public'
          AND table_name = 'messages'
          AND column_name = 'receiver_id'
    ) THEN
        ALTER TABLE public.messages RENAME COLUMN recipient_id TO receiver_id;
    END IF;
END $$;
"#,
    },
];

#[derive(Debug, Deserialize)]
struct HistoryRow {
    version: i64,
}

/// Outcome of one repair run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairOutcome {
    /// Versions applied by this run.
    pub applied: Vec<i64>,
    /// Versions already recorded before this run.
    pub skipped: Vec<i64>,
}

/// Applies pending migrations through the `execute_sql` stored procedure.
pub struct SchemaRepairer<'a> {
    backend: &'a Backend,
}

impl<'a> SchemaRepairer<'a> {
    pub fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    /// Run every pending migration, oldest first. Already-applied versions
    /// are skipped; a second concurrent run recording the same version is
    /// treated as success.
    pub async fn run(&self) -> Result<RepairOutcome, Error> {
        self.ensure_history_table().await?;
        let applied_before = self.applied_versions().await?;

        let mut outcome = RepairOutcome::default();
        for migration in MIGRATIONS {
            if applied_before.contains(&migration.version) {
                outcome.skipped.push(migration.version);
                continue;
            }

            info!(
                "applying migration v{} ({})",
                migration.version, migration.name
            );
            self.exec(migration.sql).await.map_err(|err| {
                Error::migration(format!(
                    "migration v{} ({}) failed: {}",
                    migration.version, migration.name, err
                ))
            })?;
            self.record(migration).await?;
            outcome.applied.push(migration.version);
        }

        Ok(outcome)
    }

    async fn ensure_history_table(&self) -> Result<(), Error> {
        let sql = format!(
            r#"CREATE TABLE IF NOT EXISTS public.{} (
    version BIGINT PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TIMESTAMPTZ DEFAULT NOW()
);"#,
            HISTORY_TABLE
        );
        self.exec(&sql).await
    }

    /// Versions already recorded in the history table. A missing history
    /// table reads as an empty set.
    async fn applied_versions(&self) -> Result<HashSet<i64>, Error> {
        let result = self
            .backend
            .from_privileged(HISTORY_TABLE)
            .select("version")
            .execute::<HistoryRow>()
            .await;

        match result {
            Ok(rows) => Ok(rows.into_iter().map(|row| row.version).collect()),
            Err(err) if err.is_undefined_table() => Ok(HashSet::new()),
            Err(err) => Err(err),
        }
    }

    async fn record(&self, migration: &Migration) -> Result<(), Error> {
        let row = json!({ "version": migration.version, "name": migration.name });
        let result = self
            .backend
            .from_privileged(HISTORY_TABLE)
            .insert(&row)
            .execute_no_return()
            .await;

        match result {
            Ok(()) => Ok(()),
            // Another run recorded this version first; the schema change is
            // idempotent, so converge silently.
            Err(err) if err.is_unique_violation() => {
                warn!(
                    "migration v{} was recorded concurrently by another run",
                    migration.version
                );
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Execute one SQL statement through the installed helper function.
    async fn exec(&self, sql: &str) -> Result<(), Error> {
        let params = json!({ "sql": sql });
        let result = self
            .backend
            .rpc(EXEC_FUNCTION, params)
            .execute_no_return()
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(err) if err.is_undefined_function() => Err(Error::migration(format!(
                "stored procedure '{}' is not installed; create it once with \
                 elevated rights before running repairs",
                EXEC_FUNCTION
            ))),
            Err(err) => Err(err),
        }
    }
}
