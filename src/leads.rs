//! Lead intake from the public contact form

use uuid::Uuid;

use crate::error::Error;
use crate::models::{Lead, LeadStatus, NewLead};
use crate::Backend;

/// User-facing message shown when an email address was already submitted.
const DUPLICATE_EMAIL_MESSAGE: &str = "Diese E-Mail-Adresse ist bereits registriert.";

/// Lead capture and pipeline management.
pub struct LeadService<'a> {
    backend: &'a Backend,
}

impl<'a> LeadService<'a> {
    pub fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    /// Store a new lead. A repeated email address becomes a friendly
    /// duplicate error rather than a raw constraint violation.
    pub async fn create(&self, lead: &NewLead) -> Result<Lead, Error> {
        let result: Result<Vec<Lead>, Error> =
            self.backend.from("leads").insert(lead).execute().await;

        match result {
            Ok(rows) => rows
                .into_iter()
                .next()
                .ok_or_else(|| Error::general("insert returned no lead row")),
            Err(err) if err.is_unique_violation() => {
                Err(Error::Duplicate(DUPLICATE_EMAIL_MESSAGE.to_string()))
            }
            Err(err) => Err(err),
        }
    }

    /// All leads, newest first.
    pub async fn list(&self) -> Result<Vec<Lead>, Error> {
        self.backend
            .from_privileged("leads")
            .select("*")
            .order("created_at", false)
            .execute()
            .await
    }

    /// Move a lead to a new pipeline status.
    pub async fn update_status(&self, id: Uuid, status: LeadStatus) -> Result<Lead, Error> {
        let payload = serde_json::json!({ "status": status });
        let rows: Vec<Lead> = self
            .backend
            .from_privileged("leads")
            .update(&payload)
            .eq("id", id)
            .execute()
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| Error::general(format!("no lead with id {}", id)))
    }
}
