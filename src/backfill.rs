//! Profile backfill
//!
//! The `profiles` table denormalizes the authentication subsystem's user
//! records; rows go missing when signups predate the profile trigger or a
//! repair recreated the table. The backfiller lists every identity, diffs it
//! against the existing profile ids, and inserts what is absent. Failures
//! are isolated per identity so one bad row never aborts the sweep.

use std::collections::HashSet;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Identity;
use crate::error::Error;
use crate::models::NewProfile;
use crate::Backend;

/// What happened to one identity during a backfill run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "detail")]
pub enum BackfillOutcome {
    /// A profile row was inserted.
    Created,
    /// A row for this identity already existed.
    AlreadyExists,
    /// The insert failed; the run continued with the next identity.
    Failed(String),
}

/// Per-identity record in a backfill report.
#[derive(Debug, Clone, Serialize)]
pub struct BackfillResult {
    pub id: Uuid,
    pub email: Option<String>,
    #[serde(flatten)]
    pub outcome: BackfillOutcome,
}

/// Aggregate counts plus per-identity results for one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BackfillSummary {
    pub total_identities: usize,
    pub created: usize,
    pub already_existed: usize,
    pub failed: usize,
    pub results: Vec<BackfillResult>,
}

impl BackfillSummary {
    /// True when no insert failed. An all-skipped run is a success.
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }

    fn push(&mut self, result: BackfillResult) {
        match &result.outcome {
            BackfillOutcome::Created => self.created += 1,
            BackfillOutcome::AlreadyExists => self.already_existed += 1,
            BackfillOutcome::Failed(_) => self.failed += 1,
        }
        self.results.push(result);
    }
}

#[derive(Debug, Deserialize)]
struct ProfileId {
    id: Uuid,
}

/// Ids of identities with no corresponding profile row.
fn missing_identity_ids(identities: &[Identity], existing_ids: &HashSet<Uuid>) -> HashSet<Uuid> {
    identities
        .iter()
        .filter(|identity| !existing_ids.contains(&identity.id))
        .map(|identity| identity.id)
        .collect()
}

/// Creates missing profile rows for known identities.
pub struct ProfileBackfiller<'a> {
    backend: &'a Backend,
}

impl<'a> ProfileBackfiller<'a> {
    pub fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    /// Run one backfill sweep. Identities that already have a profile are
    /// reported as such; per-row insert failures are captured in the summary
    /// instead of aborting.
    pub async fn run(&self) -> Result<BackfillSummary, Error> {
        let identities = self.backend.auth_admin().list_identities().await?;

        let existing: HashSet<Uuid> = self
            .backend
            .from_privileged("profiles")
            .select("id")
            .execute::<ProfileId>()
            .await?
            .into_iter()
            .map(|row| row.id)
            .collect();

        let missing = missing_identity_ids(&identities, &existing);
        let mut summary = BackfillSummary {
            total_identities: identities.len(),
            ..Default::default()
        };

        for identity in &identities {
            if !missing.contains(&identity.id) {
                summary.push(BackfillResult {
                    id: identity.id,
                    email: identity.email.clone(),
                    outcome: BackfillOutcome::AlreadyExists,
                });
                continue;
            }

            let outcome = self.insert_profile(identity).await;
            summary.push(BackfillResult {
                id: identity.id,
                email: identity.email.clone(),
                outcome,
            });
        }

        info!(
            "backfill finished: {} created, {} existing, {} failed of {} identities",
            summary.created, summary.already_existed, summary.failed, summary.total_identities
        );
        Ok(summary)
    }

    async fn insert_profile(&self, identity: &Identity) -> BackfillOutcome {
        let profile = NewProfile::from_identity(identity);
        let result = self
            .backend
            .from_privileged("profiles")
            .insert(&profile)
            .execute_no_return()
            .await;

        match result {
            Ok(()) => BackfillOutcome::Created,
            // A trigger or concurrent run beat us to it.
            Err(err) if err.is_unique_violation() => BackfillOutcome::AlreadyExists,
            Err(err) => {
                warn!("backfill failed for identity {}: {}", identity.id, err);
                BackfillOutcome::Failed(err.to_string())
            }
        }
    }
}
