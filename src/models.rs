//! Domain row types for the application-owned tables

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Identity;

/// Default role written to backfilled profiles.
pub const DEFAULT_ROLE: &str = "user";

/// Application-owned projection of an [`Identity`]; one row per identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub is_demo: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Insert shape for a profile row
#[derive(Debug, Clone, Serialize)]
pub struct NewProfile {
    pub id: Uuid,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: String,
    pub role: String,
    pub is_demo: bool,
}

impl NewProfile {
    /// Project an identity into a profile row, defaulting absent metadata to
    /// empty strings and the role to [`DEFAULT_ROLE`].
    pub fn from_identity(identity: &Identity) -> Self {
        let meta = &identity.user_metadata;
        Self {
            id: identity.id,
            email: identity.email.clone(),
            first_name: meta.first_name.clone().unwrap_or_default(),
            last_name: meta.last_name.clone().unwrap_or_default(),
            avatar_url: meta.avatar_url.clone().unwrap_or_default(),
            role: meta
                .role
                .clone()
                .unwrap_or_else(|| DEFAULT_ROLE.to_string()),
            is_demo: false,
        }
    }
}

/// A chat message. `receiver_id` is the canonical column name; the drifted
/// `recipient_id` variant is handled only as a migration target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub read: bool,
    pub created_at: Option<DateTime<Utc>>,
}

/// Insert shape for a chat message
#[derive(Debug, Clone, Serialize)]
pub struct NewMessage {
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
}

/// A participant of the rehabilitation center
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Teilnehmer {
    pub id: Uuid,
    pub vorname: String,
    pub nachname: String,
    pub email: Option<String>,
    pub telefon: Option<String>,
    pub geburtsdatum: Option<NaiveDate>,
    pub strasse: Option<String>,
    pub plz: Option<String>,
    pub ort: Option<String>,
    #[serde(default)]
    pub aktiv: bool,
    pub kurs_id: Option<Uuid>,
    pub notizen: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Insert shape for a participant
#[derive(Debug, Clone, Serialize)]
pub struct NewTeilnehmer {
    pub vorname: String,
    pub nachname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telefon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geburtsdatum: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strasse: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plz: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ort: Option<String>,
    pub aktiv: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kurs_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notizen: Option<String>,
}

/// Partial update for a participant; only set fields are written
#[derive(Debug, Clone, Default, Serialize)]
pub struct TeilnehmerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vorname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nachname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telefon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geburtsdatum: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strasse: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plz: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aktiv: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kurs_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notizen: Option<String>,
}

/// A course offered by the center
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Kurs {
    pub id: Uuid,
    pub name: String,
    pub beschreibung: Option<String>,
    pub max_teilnehmer: i32,
    pub start_datum: Option<NaiveDate>,
    pub end_datum: Option<NaiveDate>,
    #[serde(default)]
    pub aktiv: bool,
    pub trainer_id: Option<Uuid>,
}

/// Insert shape for a course
#[derive(Debug, Clone, Serialize)]
pub struct NewKurs {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beschreibung: Option<String>,
    pub max_teilnehmer: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_datum: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_datum: Option<NaiveDate>,
    pub aktiv: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trainer_id: Option<Uuid>,
}

/// Join row linking courses and participants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KursTeilnehmer {
    pub kurs_id: Uuid,
    pub teilnehmer_id: Uuid,
}

/// Processing state of a sales lead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    Neu,
    Kontaktiert,
    Qualifiziert,
    Gewonnen,
    Verloren,
}

/// A lead captured through the public contact form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub interest: Option<String>,
    pub source: Option<String>,
    pub status: LeadStatus,
    pub created_at: Option<DateTime<Utc>>,
}

/// Insert shape for a lead; status defaults to `neu` in the table definition
#[derive(Debug, Clone, Serialize)]
pub struct NewLead {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest: Option<String>,
    pub source: Option<String>,
}

/// Metadata row for a stored document; the blob lives in object storage
/// under `storage_path`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dokument {
    pub id: Uuid,
    pub teilnehmer_id: Uuid,
    pub dokument_typ: String,
    pub dateiname: String,
    pub storage_path: String,
    pub mime_type: Option<String>,
    pub file_size: Option<i64>,
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// Insert shape for a document metadata row
#[derive(Debug, Clone, Serialize)]
pub struct NewDokument {
    pub teilnehmer_id: Uuid,
    pub dokument_typ: String,
    pub dateiname: String,
    pub storage_path: String,
    pub mime_type: Option<String>,
    pub file_size: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::IdentityMetadata;

    #[test]
    fn profile_from_identity_applies_defaults() {
        let identity = Identity {
            id: Uuid::new_v4(),
            email: Some("a@x.com".into()),
            user_metadata: IdentityMetadata::default(),
        };

        let profile = NewProfile::from_identity(&identity);
        assert_eq!(profile.id, identity.id);
        assert_eq!(profile.role, DEFAULT_ROLE);
        assert_eq!(profile.first_name, "");
        assert!(!profile.is_demo);
    }

    #[test]
    fn profile_from_identity_keeps_metadata() {
        let identity = Identity {
            id: Uuid::new_v4(),
            email: Some("trainer@x.com".into()),
            user_metadata: IdentityMetadata {
                first_name: Some("Anna".into()),
                last_name: Some("Schmidt".into()),
                avatar_url: None,
                role: Some("trainer".into()),
            },
        };

        let profile = NewProfile::from_identity(&identity);
        assert_eq!(profile.first_name, "Anna");
        assert_eq!(profile.role, "trainer");
    }

    #[test]
    fn lead_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&LeadStatus::Kontaktiert).unwrap(),
            "\"kontaktiert\""
        );
    }
}
