//! HTTP routes for the repair workflow
//!
//! Each repair surface has a GET that diagnoses and a POST that repairs,
//! mirroring how operators use them: look first, then fix. Responses are
//! JSON envelopes with a top-level `success` flag.

use actix_web::{get, post, web, HttpResponse};
use serde_json::json;

use crate::backfill::ProfileBackfiller;
use crate::repair::RepairOrchestrator;
use crate::schema::{table_spec, SchemaProber, SchemaRepairer, TableStatus};
use crate::Backend;

/// Register every route on an actix service config.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(fix_profiles_status)
        .service(fix_profiles_run)
        .service(fix_messages_status)
        .service(fix_messages_run)
        .service(setup_chat_tables);
}

fn error_response(err: impl std::fmt::Display) -> HttpResponse {
    HttpResponse::InternalServerError().json(json!({
        "success": false,
        "error": err.to_string(),
    }))
}

fn status_json(status: &TableStatus) -> serde_json::Value {
    match status {
        TableStatus::ExistsOk => json!({ "status": "ok" }),
        TableStatus::Missing => json!({ "status": "missing" }),
        TableStatus::Malformed { column } => json!({
            "status": "malformed",
            "column": column,
        }),
    }
}

#[get("/health")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// Diagnose the profiles surface: table health plus how many profile rows
/// exist against how many identities the auth subsystem knows.
#[get("/api/fix-profiles")]
async fn fix_profiles_status(backend: web::Data<Backend>) -> HttpResponse {
    let spec = match table_spec("profiles") {
        Some(spec) => spec,
        None => return error_response("profiles table is not registered"),
    };

    let status = match SchemaProber::new(&backend).probe(spec).await {
        Ok(status) => status,
        Err(err) => return error_response(err),
    };

    // A missing table simply has zero rows; other count failures are real.
    let profile_count = match backend.from_privileged("profiles").select("id").count().await {
        Ok(count) => count,
        Err(err) if err.is_undefined_table() => 0,
        Err(err) => return error_response(err),
    };

    let identities = match backend.auth_admin().list_identities().await {
        Ok(identities) => identities,
        Err(err) => return error_response(err),
    };

    HttpResponse::Ok().json(json!({
        "success": true,
        "table": "profiles",
        "profiles": status_json(&status),
        "profileCount": profile_count,
        "authUserCount": identities.len(),
    }))
}

/// Repair the profiles surface: apply pending migrations when the table is
/// unhealthy, then backfill missing profile rows.
#[post("/api/fix-profiles")]
async fn fix_profiles_run(backend: web::Data<Backend>) -> HttpResponse {
    let spec = match table_spec("profiles") {
        Some(spec) => spec,
        None => return error_response("profiles table is not registered"),
    };

    let status = match SchemaProber::new(&backend).probe(spec).await {
        Ok(status) => status,
        Err(err) => return error_response(err),
    };

    if !status.is_healthy() {
        if let Err(err) = SchemaRepairer::new(&backend).run().await {
            return error_response(err);
        }
    }

    match ProfileBackfiller::new(&backend).run().await {
        Ok(summary) => {
            // Nothing to migrate from: an empty identity list means the
            // caller is repairing the wrong project.
            if summary.total_identities == 0 {
                return HttpResponse::NotFound().json(json!({
                    "success": false,
                    "message": "Keine Auth-Benutzer gefunden",
                }));
            }

            let success = summary.is_complete();
            let body = json!({
                "success": success,
                "created": summary.created,
                "already_existed": summary.already_existed,
                "failed": summary.failed,
                "results": summary.results,
            });
            if success {
                HttpResponse::Ok().json(body)
            } else {
                HttpResponse::InternalServerError().json(body)
            }
        }
        Err(err) => error_response(err),
    }
}

/// Diagnose the messages table.
#[get("/api/fix-messages-table")]
async fn fix_messages_status(backend: web::Data<Backend>) -> HttpResponse {
    let spec = match table_spec("messages") {
        Some(spec) => spec,
        None => return error_response("messages table is not registered"),
    };

    match SchemaProber::new(&backend).probe(spec).await {
        Ok(status) => {
            let needs_repair = !status.is_healthy();
            HttpResponse::Ok().json(json!({
                "success": true,
                "table": "messages",
                "messages": status_json(&status),
                "needs_repair": needs_repair,
            }))
        }
        Err(err) => error_response(err),
    }
}

/// Repair the messages table by applying pending migrations, then verify
/// the repaired shape with a fresh probe.
#[post("/api/fix-messages-table")]
async fn fix_messages_run(backend: web::Data<Backend>) -> HttpResponse {
    let spec = match table_spec("messages") {
        Some(spec) => spec,
        None => return error_response("messages table is not registered"),
    };

    let outcome = match SchemaRepairer::new(&backend).run().await {
        Ok(outcome) => outcome,
        Err(err) => return error_response(err),
    };

    let status = match SchemaProber::new(&backend).probe(spec).await {
        Ok(status) => status,
        Err(err) => return error_response(err),
    };

    HttpResponse::Ok().json(json!({
        "success": status.is_healthy(),
        "applied": outcome.applied,
        "skipped": outcome.skipped,
        "messages": status_json(&status),
    }))
}

/// Run the full probe / migrate / backfill / seed pipeline.
#[post("/api/setup-chat-tables")]
async fn setup_chat_tables(backend: web::Data<Backend>) -> HttpResponse {
    match RepairOrchestrator::new(&backend).repair().await {
        Ok(report) => {
            if report.success {
                HttpResponse::Ok().json(&report)
            } else {
                HttpResponse::InternalServerError().json(&report)
            }
        }
        Err(err) => error_response(err),
    }
}
