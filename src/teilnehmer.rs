//! Participant management

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::error::Error;
use crate::models::{NewTeilnehmer, Teilnehmer, TeilnehmerUpdate};
use crate::Backend;

/// CRUD and search over the `teilnehmer` table.
pub struct TeilnehmerService<'a> {
    backend: &'a Backend,
}

impl<'a> TeilnehmerService<'a> {
    pub fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    /// One page of participants, ordered by last name.
    pub async fn list(&self, offset: i64, page_size: i64) -> Result<Vec<Teilnehmer>, Error> {
        self.backend
            .from("teilnehmer")
            .select("*")
            .order("nachname", true)
            .range(offset, offset + page_size - 1)
            .execute()
            .await
    }

    /// Fetch one participant, or `None` when the id is unknown.
    pub async fn get(&self, id: Uuid) -> Result<Option<Teilnehmer>, Error> {
        self.backend
            .from("teilnehmer")
            .select("*")
            .eq("id", id)
            .execute_single()
            .await
    }

    /// Case-insensitive substring search over name and email.
    pub async fn search(&self, term: &str) -> Result<Vec<Teilnehmer>, Error> {
        let pattern = format!("*{}*", term);
        let expression = format!(
            "vorname.ilike.{pattern},nachname.ilike.{pattern},email.ilike.{pattern}"
        );

        self.backend
            .from("teilnehmer")
            .select("*")
            .or_filter(&expression)
            .order("nachname", true)
            .execute()
            .await
    }

    /// All participants filtered by active flag.
    pub async fn by_status(&self, aktiv: bool) -> Result<Vec<Teilnehmer>, Error> {
        self.backend
            .from("teilnehmer")
            .select("*")
            .eq("aktiv", aktiv)
            .order("nachname", true)
            .execute()
            .await
    }

    /// All participants directly assigned to a course.
    pub async fn by_kurs(&self, kurs_id: Uuid) -> Result<Vec<Teilnehmer>, Error> {
        self.backend
            .from("teilnehmer")
            .select("*")
            .eq("kurs_id", kurs_id)
            .order("nachname", true)
            .execute()
            .await
    }

    /// Create a participant and return the stored row.
    pub async fn create(&self, teilnehmer: &NewTeilnehmer) -> Result<Teilnehmer, Error> {
        let rows: Vec<Teilnehmer> = self
            .backend
            .from("teilnehmer")
            .insert(teilnehmer)
            .execute()
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| Error::general("insert returned no participant row"))
    }

    /// Apply a partial update and bump `updated_at`.
    pub async fn update(&self, id: Uuid, update: &TeilnehmerUpdate) -> Result<Teilnehmer, Error> {
        let mut payload = serde_json::to_value(update)?;
        if let Some(object) = payload.as_object_mut() {
            object.insert("updated_at".to_string(), json!(Utc::now()));
        }

        let rows: Vec<Teilnehmer> = self
            .backend
            .from("teilnehmer")
            .update(&payload)
            .eq("id", id)
            .execute()
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| Error::general(format!("no participant with id {}", id)))
    }

    /// Delete a participant.
    pub async fn delete(&self, id: Uuid) -> Result<(), Error> {
        self.backend
            .from("teilnehmer")
            .delete()
            .eq("id", id)
            .execute_no_return()
            .await
    }
}
