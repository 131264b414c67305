use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rehaportal::backfill::ProfileBackfiller;
use rehaportal::prelude::{Backend, Config};
use rehaportal::repair::{RepairOrchestrator, RunVerdict};
use rehaportal::schema::{table_spec, SchemaProber, SchemaRepairer, TableStatus, MIGRATIONS};
use rehaportal::seed::{DemoSeeder, SeedReport, DEMO_CONTACTS};

fn test_backend(server: &MockServer) -> Backend {
    let config = Config::new(&server.uri(), "test_anon_key").with_service_key("test_service_key");
    Backend::new(config).expect("backend should build")
}

fn test_backend_with_seeding(server: &MockServer) -> Backend {
    let config = Config::new(&server.uri(), "test_anon_key")
        .with_service_key("test_service_key")
        .with_seed_demo_data(true);
    Backend::new(config).expect("backend should build")
}

// --- probing ---

#[tokio::test]
async fn probe_reports_a_missing_table() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/messages"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": "42P01",
            "message": "relation \"public.messages\" does not exist"
        })))
        .mount(&server)
        .await;

    let backend = test_backend(&server);
    let spec = table_spec("messages").unwrap();
    let status = SchemaProber::new(&backend).probe(spec).await.unwrap();

    assert_eq!(status, TableStatus::Missing);
}

#[tokio::test]
async fn probe_reports_a_healthy_table() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let backend = test_backend(&server);
    let spec = table_spec("profiles").unwrap();
    let status = SchemaProber::new(&backend).probe(spec).await.unwrap();

    assert_eq!(status, TableStatus::ExistsOk);
}

#[tokio::test]
async fn probe_names_the_missing_column() {
    let server = MockServer::start().await;

    // The combined select fails, as does the single-column probe for
    // receiver_id; every other column is selectable.
    Mock::given(method("GET"))
        .and(path("/rest/v1/messages"))
        .and(query_param("select", "id,sender_id,receiver_id,content,read"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "42703",
            "message": "column messages.receiver_id does not exist"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/messages"))
        .and(query_param("select", "receiver_id"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "42703",
            "message": "column messages.receiver_id does not exist"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let backend = test_backend(&server);
    let spec = table_spec("messages").unwrap();
    let status = SchemaProber::new(&backend).probe(spec).await.unwrap();

    assert_eq!(
        status,
        TableStatus::Malformed {
            column: "receiver_id".to_string()
        }
    );
}

// --- backfill ---

#[tokio::test]
async fn backfill_creates_only_the_missing_profiles() {
    let server = MockServer::start().await;
    let existing_id = Uuid::new_v4();
    let missing_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/auth/v1/admin/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [
                { "id": existing_id, "email": "old@example.com" },
                { "id": missing_id, "email": "new@example.com",
                  "user_metadata": { "first_name": "Neu" } }
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("select", "id"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "id": existing_id }])),
        )
        .mount(&server)
        .await;

    // Exactly one insert: the identity that already has a profile must not
    // be written again.
    Mock::given(method("POST"))
        .and(path("/rest/v1/profiles"))
        .and(body_partial_json(json!({ "id": missing_id })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let backend = test_backend(&server);
    let summary = ProfileBackfiller::new(&backend).run().await.unwrap();

    assert_eq!(summary.total_identities, 2);
    assert_eq!(summary.created, 1);
    assert_eq!(summary.already_existed, 1);
    assert_eq!(summary.failed, 0);
    assert!(summary.is_complete());
}

#[tokio::test]
async fn backfill_run_with_nothing_missing_is_a_success() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/auth/v1/admin/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [{ "id": id, "email": "old@example.com" }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": id }])))
        .mount(&server)
        .await;

    let backend = test_backend(&server);
    let summary = ProfileBackfiller::new(&backend).run().await.unwrap();

    assert_eq!(summary.created, 0);
    assert_eq!(summary.already_existed, 1);
    assert!(summary.is_complete());
}

#[tokio::test]
async fn backfill_isolates_per_row_failures() {
    let server = MockServer::start().await;
    let bad_id = Uuid::new_v4();
    let good_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/auth/v1/admin/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [
                { "id": bad_id, "email": "bad@example.com" },
                { "id": good_id, "email": "good@example.com" }
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("select", "id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/profiles"))
        .and(body_partial_json(json!({ "id": bad_id })))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "code": "XX000",
            "message": "internal error"
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/profiles"))
        .and(body_partial_json(json!({ "id": good_id })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let backend = test_backend(&server);
    let summary = ProfileBackfiller::new(&backend).run().await.unwrap();

    // One bad row never aborts the sweep.
    assert_eq!(summary.created, 1);
    assert_eq!(summary.failed, 1);
    assert!(!summary.is_complete());
}

#[tokio::test]
async fn backfill_treats_a_unique_violation_as_existing() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/auth/v1/admin/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [{ "id": id, "email": "raced@example.com" }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint"
        })))
        .mount(&server)
        .await;

    let backend = test_backend(&server);
    let summary = ProfileBackfiller::new(&backend).run().await.unwrap();

    assert_eq!(summary.already_existed, 1);
    assert_eq!(summary.failed, 0);
    assert!(summary.is_complete());
}

// --- demo seeding ---

#[tokio::test]
async fn seeder_is_disabled_without_the_flag() {
    let server = MockServer::start().await;

    let backend = test_backend(&server);
    let report = DemoSeeder::new(&backend).run().await.unwrap();

    assert_eq!(report, SeedReport::Disabled);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn seeder_skips_deployments_with_real_contacts() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("is_demo", "eq.false"))
        .respond_with(ResponseTemplate::new(200).insert_header("Content-Range", "0-1/2"))
        .mount(&server)
        .await;

    let backend = test_backend_with_seeding(&server);
    let report = DemoSeeder::new(&backend).run().await.unwrap();

    assert_eq!(
        report,
        SeedReport::SkippedNonEmpty {
            existing_contacts: 2
        }
    );
}

#[tokio::test]
async fn seeder_inserts_every_demo_contact_into_an_empty_deployment() {
    let server = MockServer::start().await;

    // No real contacts, no demo contacts yet.
    Mock::given(method("HEAD"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(200).insert_header("Content-Range", "*/0"))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/profiles"))
        .and(body_partial_json(json!({ "is_demo": true })))
        .respond_with(ResponseTemplate::new(201))
        .expect(DEMO_CONTACTS.len() as u64)
        .mount(&server)
        .await;

    let backend = test_backend_with_seeding(&server);
    let report = DemoSeeder::new(&backend).run().await.unwrap();

    assert_eq!(
        report,
        SeedReport::Seeded {
            created: DEMO_CONTACTS.len(),
            skipped: 0
        }
    );
}

// --- migrations ---

#[tokio::test]
async fn repairer_applies_every_pending_migration() {
    let server = MockServer::start().await;

    // One call for the history table plus one per migration.
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/execute_sql"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1 + MIGRATIONS.len() as u64)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/schema_migrations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/schema_migrations"))
        .respond_with(ResponseTemplate::new(201))
        .expect(MIGRATIONS.len() as u64)
        .mount(&server)
        .await;

    let backend = test_backend(&server);
    let outcome = SchemaRepairer::new(&backend).run().await.unwrap();

    let expected: Vec<i64> = MIGRATIONS.iter().map(|m| m.version).collect();
    assert_eq!(outcome.applied, expected);
    assert!(outcome.skipped.is_empty());
}

#[tokio::test]
async fn repairer_skips_versions_already_recorded() {
    let server = MockServer::start().await;

    // Only the history-table statement runs; everything is already applied.
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/execute_sql"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let applied: Vec<_> = MIGRATIONS
        .iter()
        .map(|m| json!({ "version": m.version }))
        .collect();
    Mock::given(method("GET"))
        .and(path("/rest/v1/schema_migrations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(applied)))
        .mount(&server)
        .await;

    let backend = test_backend(&server);
    let outcome = SchemaRepairer::new(&backend).run().await.unwrap();

    assert!(outcome.applied.is_empty());
    assert_eq!(outcome.skipped.len(), MIGRATIONS.len());
}

#[tokio::test]
async fn repairer_names_the_helper_function_when_it_is_missing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/execute_sql"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": "42883",
            "message": "function public.execute_sql(sql => text) does not exist"
        })))
        .mount(&server)
        .await;

    let backend = test_backend(&server);
    let err = SchemaRepairer::new(&backend).run().await.unwrap_err();

    assert!(err.to_string().contains("execute_sql"));
}

#[tokio::test]
async fn repairer_tolerates_a_concurrently_recorded_version() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/execute_sql"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/schema_migrations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    // Another run wins the race to record every version.
    Mock::given(method("POST"))
        .and(path("/rest/v1/schema_migrations"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint"
        })))
        .mount(&server)
        .await;

    let backend = test_backend(&server);
    let outcome = SchemaRepairer::new(&backend).run().await.unwrap();

    assert_eq!(outcome.applied.len(), MIGRATIONS.len());
}

// --- orchestration ---

#[tokio::test]
async fn orchestrated_run_reports_partial_when_one_step_fails() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/auth/v1/admin/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [{ "id": id, "email": "only@example.com" }]
        })))
        .mount(&server)
        .await;

    // Backfill insert fails; every probe and select succeeds.
    Mock::given(method("POST"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "code": "XX000",
            "message": "internal error"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex("^/rest/v1/.*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let backend = test_backend(&server);
    let report = RepairOrchestrator::new(&backend).repair().await.unwrap();

    assert!(!report.success);
    assert_eq!(report.outcome, RunVerdict::Partial);

    let backfill = report
        .steps
        .iter()
        .find(|step| step.name == "backfill")
        .unwrap();
    assert!(!backfill.success);
}

#[tokio::test]
async fn orchestrated_probe_never_modifies_anything() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path_regex("^/rest/v1/.*"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": "42P01",
            "message": "relation does not exist"
        })))
        .mount(&server)
        .await;

    let backend = test_backend(&server);
    let report = RepairOrchestrator::new(&backend).probe().await.unwrap();

    let probe = &report.steps[0];
    assert_eq!(probe.name, "probe");
    assert!(!probe.success);

    // Every request during a probe is a read.
    for request in server.received_requests().await.unwrap() {
        assert_eq!(request.method.to_string(), "GET");
    }
}
