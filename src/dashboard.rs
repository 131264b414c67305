//! Dashboard aggregate queries
//!
//! All counts are taken server-side via `Prefer: count=exact`, so no row
//! data crosses the wire.

use chrono::{Datelike, Duration, Utc};
use serde::Serialize;

use crate::error::Error;
use crate::Backend;

/// The numbers shown on the landing dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub aktive_teilnehmer: u64,
    pub kurse_heute: u64,
    pub neue_leads_woche: u64,
}

/// Computes dashboard statistics.
pub struct DashboardService<'a> {
    backend: &'a Backend,
}

impl<'a> DashboardService<'a> {
    pub fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    /// All three dashboard numbers in one call.
    pub async fn stats(&self) -> Result<DashboardStats, Error> {
        Ok(DashboardStats {
            aktive_teilnehmer: self.active_teilnehmer().await?,
            kurse_heute: self.kurse_heute().await?,
            neue_leads_woche: self.neue_leads_this_week().await?,
        })
    }

    /// Number of active participants.
    pub async fn active_teilnehmer(&self) -> Result<u64, Error> {
        self.backend
            .from("teilnehmer")
            .select("id")
            .eq("aktiv", true)
            .count()
            .await
    }

    /// Number of active courses running today.
    pub async fn kurse_heute(&self) -> Result<u64, Error> {
        let today = Utc::now().date_naive();
        self.backend
            .from("kurse")
            .select("id")
            .eq("aktiv", true)
            .lte("start_datum", today)
            .gte("end_datum", today)
            .count()
            .await
    }

    /// Leads created since the start of the current ISO week.
    pub async fn neue_leads_this_week(&self) -> Result<u64, Error> {
        let now = Utc::now();
        let days_into_week = now.weekday().num_days_from_monday() as i64;
        let week_start = (now - Duration::days(days_into_week))
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| Error::general("could not compute week start"))?
            .and_utc();

        self.backend
            .from_privileged("leads")
            .select("id")
            .gte("created_at", week_start.to_rfc3339())
            .count()
            .await
    }
}
