//! Document storage for participants
//!
//! Each document is a blob in object storage plus a metadata row in
//! `dokumente`. Uploads write the blob first and clean it up when the
//! metadata insert fails, so the table never points at nothing.

use log::warn;
use uuid::Uuid;

use crate::error::Error;
use crate::models::{Dokument, NewDokument};
use crate::Backend;

/// Bucket holding all participant documents.
pub const DOCUMENTS_BUCKET: &str = "teilnehmer-dokumente";

/// Default lifetime of a download link, in seconds.
const SIGNED_URL_TTL: i64 = 60;

/// Outcome of a delete, which touches two systems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Blob and metadata row are both gone.
    Complete,
    /// The metadata row is gone but the blob removal failed; the orphaned
    /// blob path is returned for later cleanup.
    RowOnly { orphaned_path: String },
}

/// Upload, download and delete operations for participant documents.
pub struct DocumentService<'a> {
    backend: &'a Backend,
}

impl<'a> DocumentService<'a> {
    pub fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    /// All documents for a participant, newest first.
    pub async fn list(&self, teilnehmer_id: Uuid) -> Result<Vec<Dokument>, Error> {
        self.backend
            .from("dokumente")
            .select("*")
            .eq("teilnehmer_id", teilnehmer_id)
            .order("uploaded_at", false)
            .execute()
            .await
    }

    /// Upload a document: blob first, then the metadata row. When the row
    /// insert fails the blob is removed again on a best-effort basis.
    pub async fn upload(
        &self,
        teilnehmer_id: Uuid,
        dokument_typ: &str,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<Dokument, Error> {
        let storage_path = format!("teilnehmer/{}/{}_{}", teilnehmer_id, Uuid::new_v4(), filename);
        let file_size = data.len() as i64;

        let storage = self.backend.storage();
        let bucket = storage.from(DOCUMENTS_BUCKET);
        bucket.upload(&storage_path, data, content_type).await?;

        let row = NewDokument {
            teilnehmer_id,
            dokument_typ: dokument_typ.to_string(),
            dateiname: filename.to_string(),
            storage_path: storage_path.clone(),
            mime_type: Some(content_type.to_string()),
            file_size: Some(file_size),
        };

        let inserted: Result<Vec<Dokument>, Error> = self
            .backend
            .from_privileged("dokumente")
            .insert(&row)
            .execute()
            .await;

        match inserted {
            Ok(rows) => rows
                .into_iter()
                .next()
                .ok_or_else(|| Error::general("insert returned no document row")),
            Err(err) => {
                if let Err(cleanup_err) = bucket.remove(&[storage_path.as_str()]).await {
                    warn!(
                        "could not remove orphaned blob {}: {}",
                        storage_path, cleanup_err
                    );
                }
                Err(err)
            }
        }
    }

    /// A short-lived download link for a stored document.
    pub async fn signed_url(&self, dokument: &Dokument) -> Result<String, Error> {
        let signed = self
            .backend
            .storage()
            .from(DOCUMENTS_BUCKET)
            .create_signed_url(&dokument.storage_path, SIGNED_URL_TTL)
            .await?;
        Ok(signed.signed_url)
    }

    /// Delete a document. The blob is removed first; when that fails the
    /// metadata row is still deleted and the orphaned path is reported.
    pub async fn delete(&self, dokument: &Dokument) -> Result<DeleteOutcome, Error> {
        let blob_removed = match self
            .backend
            .storage()
            .from(DOCUMENTS_BUCKET)
            .remove(&[dokument.storage_path.as_str()])
            .await
        {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    "blob removal failed for {}: {}",
                    dokument.storage_path, err
                );
                false
            }
        };

        self.backend
            .from_privileged("dokumente")
            .delete()
            .eq("id", dokument.id)
            .execute_no_return()
            .await?;

        if blob_removed {
            Ok(DeleteOutcome::Complete)
        } else {
            Ok(DeleteOutcome::RowOnly {
                orphaned_path: dokument.storage_path.clone(),
            })
        }
    }
}
