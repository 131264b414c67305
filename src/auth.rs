//! Identity access through the auth subsystem's admin API
//!
//! Identities are authoritative and read-only from this crate's perspective:
//! the repair workflow only ever lists them to reconcile the denormalized
//! `profiles` table.

use reqwest::Client;
use serde::Deserialize;

use crate::error::Error;
use crate::fetch::Fetch;

/// Page size used when listing identities.
const PER_PAGE: u32 = 50;

/// An authoritative user record managed by the authentication subsystem.
#[derive(Debug, Clone, Deserialize)]
pub struct Identity {
    pub id: uuid::Uuid,
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: IdentityMetadata,
}

/// Free-form signup metadata carried on an identity.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentityMetadata {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdentityPage {
    #[serde(default)]
    users: Vec<Identity>,
}

/// Admin client for the identity subsystem
pub struct AdminAuth {
    url: String,
    key: String,
    client: Client,
}

impl AdminAuth {
    /// Create a new AdminAuth client
    pub fn new(url: &str, key: &str, client: Client) -> Self {
        Self {
            url: url.to_string(),
            key: key.to_string(),
            client,
        }
    }

    /// List every identity, paging through the admin API until a short page
    /// signals the end.
    pub async fn list_identities(&self) -> Result<Vec<Identity>, Error> {
        let mut all = Vec::new();
        let mut page = 1u32;

        loop {
            let url = format!(
                "{}/auth/v1/admin/users?page={}&per_page={}",
                self.url, page, PER_PAGE
            );

            let batch = Fetch::get(&self.client, &url)
                .api_key(&self.key)
                .execute::<IdentityPage>()
                .await
                .map_err(|err| match err {
                    Error::Api { .. } | Error::UnparsedApi { .. } => {
                        Error::auth(format!("failed to list identities: {}", err))
                    }
                    other => other,
                })?;

            let len = batch.users.len();
            all.extend(batch.users);

            if (len as u32) < PER_PAGE {
                return Ok(all);
            }
            page += 1;
        }
    }
}
