//! Demo data seeding
//!
//! Fresh deployments get a handful of demo chat contacts so the chat UI is
//! not empty on first login. Seeding is doubly gated: the `SEED_DEMO_DATA`
//! flag must be set, and the profile table must hold no real (non-demo)
//! contacts yet. Demo rows are marked `is_demo` so later runs and cleanup
//! jobs can tell them apart.

use log::info;
use serde::Serialize;
use uuid::Uuid;

use crate::error::Error;
use crate::models::{NewProfile, DEFAULT_ROLE};
use crate::Backend;

/// A demo contact seeded into fresh deployments.
#[derive(Debug, Clone, Copy)]
pub struct DemoContact {
    pub first_name: &'static str,
    pub last_name: &'static str,
    pub email: &'static str,
}

/// The demo contacts every fresh deployment receives.
pub const DEMO_CONTACTS: &[DemoContact] = &[
    DemoContact {
        first_name: "Max",
        last_name: "Mustermann",
        email: "demo1@example.com",
    },
    DemoContact {
        first_name: "Erika",
        last_name: "Musterfrau",
        email: "demo2@example.com",
    },
    DemoContact {
        first_name: "Thomas",
        last_name: "Test",
        email: "demo3@example.com",
    },
];

/// What a seeding run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum SeedReport {
    /// The `SEED_DEMO_DATA` flag is not set.
    Disabled,
    /// Real contacts already exist; nothing was seeded.
    SkippedNonEmpty { existing_contacts: u64 },
    /// Demo contacts were seeded (or confirmed present).
    Seeded { created: usize, skipped: usize },
}

/// Seeds demo chat contacts into empty deployments.
pub struct DemoSeeder<'a> {
    backend: &'a Backend,
}

impl<'a> DemoSeeder<'a> {
    pub fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    /// Run the seeding check and, when both gates pass, insert any demo
    /// contact not already present.
    pub async fn run(&self) -> Result<SeedReport, Error> {
        if !self.backend.config().seed_demo_data {
            return Ok(SeedReport::Disabled);
        }

        let real_contacts = self
            .backend
            .from_privileged("profiles")
            .select("id")
            .eq("is_demo", "false")
            .count()
            .await?;

        if real_contacts > 0 {
            info!(
                "skipping demo seed: {} real contacts already present",
                real_contacts
            );
            return Ok(SeedReport::SkippedNonEmpty {
                existing_contacts: real_contacts,
            });
        }

        let mut created = 0;
        let mut skipped = 0;
        for contact in DEMO_CONTACTS {
            if self.email_exists(contact.email).await? {
                skipped += 1;
                continue;
            }
            self.insert_contact(contact).await?;
            created += 1;
        }

        info!("demo seed finished: {} created, {} skipped", created, skipped);
        Ok(SeedReport::Seeded { created, skipped })
    }

    async fn email_exists(&self, email: &str) -> Result<bool, Error> {
        let count = self
            .backend
            .from_privileged("profiles")
            .select("id")
            .eq("email", email)
            .count()
            .await?;
        Ok(count > 0)
    }

    async fn insert_contact(&self, contact: &DemoContact) -> Result<(), Error> {
        let profile = NewProfile {
            id: Uuid::new_v4(),
            email: Some(contact.email.to_string()),
            first_name: contact.first_name.to_string(),
            last_name: contact.last_name.to_string(),
            avatar_url: String::new(),
            role: DEFAULT_ROLE.to_string(),
            is_demo: true,
        };

        let result = self
            .backend
            .from_privileged("profiles")
            .insert(&profile)
            .execute_no_return()
            .await;

        match result {
            Ok(()) => Ok(()),
            // Concurrent seeding run inserted the same email.
            Err(err) if err.is_unique_violation() => Ok(()),
            Err(err) => Err(err),
        }
    }
}
