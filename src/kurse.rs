//! Course management

use serde_json::json;
use uuid::Uuid;

use crate::error::Error;
use crate::models::{Kurs, KursTeilnehmer, NewKurs, Teilnehmer};
use crate::Backend;

/// Courses plus their membership join table.
pub struct KursService<'a> {
    backend: &'a Backend,
}

impl<'a> KursService<'a> {
    pub fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    /// All courses, active first, then by name.
    pub async fn list(&self) -> Result<Vec<Kurs>, Error> {
        self.backend
            .from("kurse")
            .select("*")
            .order("name", true)
            .execute()
            .await
    }

    /// Fetch one course, or `None` when the id is unknown.
    pub async fn get(&self, id: Uuid) -> Result<Option<Kurs>, Error> {
        self.backend
            .from("kurse")
            .select("*")
            .eq("id", id)
            .execute_single()
            .await
    }

    /// Create a course and return the stored row.
    pub async fn create(&self, kurs: &NewKurs) -> Result<Kurs, Error> {
        let rows: Vec<Kurs> = self.backend.from("kurse").insert(kurs).execute().await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| Error::general("insert returned no course row"))
    }

    /// Update a course from a partial JSON payload.
    pub async fn update(&self, id: Uuid, update: &serde_json::Value) -> Result<Kurs, Error> {
        let rows: Vec<Kurs> = self
            .backend
            .from("kurse")
            .update(update)
            .eq("id", id)
            .execute()
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| Error::general(format!("no course with id {}", id)))
    }

    /// Members of a course, resolved through the join table.
    pub async fn members(&self, kurs_id: Uuid) -> Result<Vec<Teilnehmer>, Error> {
        let links: Vec<KursTeilnehmer> = self
            .backend
            .from("kurs_teilnehmer")
            .select("*")
            .eq("kurs_id", kurs_id)
            .execute()
            .await?;

        if links.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = links.iter().map(|link| link.teilnehmer_id).collect();
        self.backend
            .from("teilnehmer")
            .select("*")
            .in_list("id", &ids)
            .order("nachname", true)
            .execute()
            .await
    }

    /// Active participants not yet enrolled in the course.
    pub async fn available_teilnehmer(&self, kurs_id: Uuid) -> Result<Vec<Teilnehmer>, Error> {
        let links: Vec<KursTeilnehmer> = self
            .backend
            .from("kurs_teilnehmer")
            .select("*")
            .eq("kurs_id", kurs_id)
            .execute()
            .await?;

        let active: Vec<Teilnehmer> = self
            .backend
            .from("teilnehmer")
            .select("*")
            .eq("aktiv", true)
            .order("nachname", true)
            .execute()
            .await?;

        let enrolled: Vec<Uuid> = links.iter().map(|link| link.teilnehmer_id).collect();
        Ok(active
            .into_iter()
            .filter(|t| !enrolled.contains(&t.id))
            .collect())
    }

    /// Enroll a participant, rejecting the request when the course is full.
    ///
    /// The count/insert pair is not atomic; two concurrent adds can overshoot
    /// the limit by one.
    pub async fn add_member(&self, kurs_id: Uuid, teilnehmer_id: Uuid) -> Result<(), Error> {
        let kurs = self
            .get(kurs_id)
            .await?
            .ok_or_else(|| Error::general(format!("no course with id {}", kurs_id)))?;

        let current = self
            .backend
            .from("kurs_teilnehmer")
            .select("kurs_id")
            .eq("kurs_id", kurs_id)
            .count()
            .await?;

        if current >= kurs.max_teilnehmer as u64 {
            return Err(Error::Validation(format!(
                "Der Kurs '{}' ist bereits voll ({} Plätze).",
                kurs.name, kurs.max_teilnehmer
            )));
        }

        self.backend
            .from("kurs_teilnehmer")
            .insert(&json!({ "kurs_id": kurs_id, "teilnehmer_id": teilnehmer_id }))
            .execute_no_return()
            .await
    }

    /// Remove a participant from a course.
    pub async fn remove_member(&self, kurs_id: Uuid, teilnehmer_id: Uuid) -> Result<(), Error> {
        self.backend
            .from("kurs_teilnehmer")
            .delete()
            .eq("kurs_id", kurs_id)
            .eq("teilnehmer_id", teilnehmer_id)
            .execute_no_return()
            .await
    }
}
