//! Object storage operations for document blobs

use reqwest::{multipart, Client};
use serde::Deserialize;

use crate::error::Error;
use crate::fetch::Fetch;

/// Client for the hosted object storage service
pub struct StorageClient {
    /// The base URL for the hosted backend project
    url: String,

    /// The API key used for storage requests
    key: String,

    /// HTTP client used for requests
    client: Client,
}

/// Client for a specific storage bucket
pub struct BucketClient<'a> {
    storage: &'a StorageClient,
    bucket_id: String,
}

/// Response to a signed-URL request
#[derive(Debug, Clone, Deserialize)]
pub struct SignedUrlResponse {
    #[serde(rename = "signedURL")]
    pub signed_url: String,
}

impl StorageClient {
    /// Create a new StorageClient
    pub fn new(url: &str, key: &str, client: Client) -> Self {
        Self {
            url: url.to_string(),
            key: key.to_string(),
            client,
        }
    }

    fn get_url(&self, path: &str) -> String {
        format!("{}/storage/v1{}", self.url, path)
    }

    /// Get a client for a specific bucket
    pub fn from(&self, bucket_id: &str) -> BucketClient {
        BucketClient {
            storage: self,
            bucket_id: bucket_id.to_string(),
        }
    }
}

impl<'a> BucketClient<'a> {
    /// Upload a file to the bucket
    pub async fn upload(
        &self,
        path: &str,
        file_data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), Error> {
        let url = self
            .storage
            .get_url(&format!("/object/{}/{}", self.bucket_id, path));

        let file_name = path.rsplit('/').next().unwrap_or("file").to_string();
        let part = multipart::Part::bytes(file_data)
            .file_name(file_name)
            .mime_str(content_type)
            .map_err(|e| Error::storage(format!("invalid content type: {}", e)))?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .storage
            .client
            .post(&url)
            .header("apikey", &self.storage.key)
            .header("Authorization", format!("Bearer {}", self.storage.key))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::storage(format!(
                "upload failed with status {}: {}",
                status, text
            )));
        }

        Ok(())
    }

    /// Create a signed URL to access a file for a limited time
    pub async fn create_signed_url(
        &self,
        path: &str,
        expires_in: i64,
    ) -> Result<SignedUrlResponse, Error> {
        let url = self
            .storage
            .get_url(&format!("/object/sign/{}/{}", self.bucket_id, path));

        let body = serde_json::json!({ "expiresIn": expires_in });

        let signed = Fetch::post(&self.storage.client, &url)
            .api_key(&self.storage.key)
            .json(&body)?
            .execute::<SignedUrlResponse>()
            .await?;

        Ok(signed)
    }

    /// Delete objects from the bucket by path
    pub async fn remove(&self, paths: &[&str]) -> Result<(), Error> {
        let url = self.storage.get_url(&format!("/object/{}", self.bucket_id));

        let body = serde_json::json!({ "prefixes": paths });

        Fetch::delete(&self.storage.client, &url)
            .api_key(&self.storage.key)
            .json(&body)?
            .execute_raw()
            .await
            .map_err(|e| Error::storage(e.to_string()))?;

        Ok(())
    }
}
