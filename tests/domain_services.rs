use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rehaportal::documents::{DeleteOutcome, DocumentService};
use rehaportal::error::Error;
use rehaportal::kurse::KursService;
use rehaportal::leads::LeadService;
use rehaportal::models::{Dokument, NewLead};
use rehaportal::prelude::{Backend, Config};
use rehaportal::teilnehmer::TeilnehmerService;

fn test_backend(server: &MockServer) -> Backend {
    let config = Config::new(&server.uri(), "test_anon_key").with_service_key("test_service_key");
    Backend::new(config).expect("backend should build")
}

fn new_lead(email: &str) -> NewLead {
    NewLead {
        name: "Hans Beispiel".to_string(),
        email: email.to_string(),
        interest: Some("Rückenschule".to_string()),
        source: Some("kontaktformular".to_string()),
    }
}

// --- leads ---

#[tokio::test]
async fn duplicate_lead_email_becomes_a_friendly_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/leads"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"leads_email_key\""
        })))
        .mount(&server)
        .await;

    let backend = test_backend(&server);
    let err = LeadService::new(&backend)
        .create(&new_lead("schon-da@example.com"))
        .await
        .unwrap_err();

    match err {
        Error::Duplicate(message) => {
            assert_eq!(message, "Diese E-Mail-Adresse ist bereits registriert.")
        }
        other => panic!("expected a duplicate error, got {:?}", other),
    }
}

#[tokio::test]
async fn created_lead_comes_back_with_its_row() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/leads"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": id,
            "name": "Hans Beispiel",
            "email": "neu@example.com",
            "interest": "Rückenschule",
            "source": "kontaktformular",
            "status": "neu"
        }])))
        .mount(&server)
        .await;

    let backend = test_backend(&server);
    let lead = LeadService::new(&backend)
        .create(&new_lead("neu@example.com"))
        .await
        .unwrap();

    assert_eq!(lead.id, id);
    assert_eq!(lead.email, "neu@example.com");
}

// --- course capacity ---

#[tokio::test]
async fn full_course_rejects_another_member() {
    let server = MockServer::start().await;
    let kurs_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/kurse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": kurs_id,
            "name": "Wassergymnastik",
            "max_teilnehmer": 2,
            "aktiv": true
        })))
        .mount(&server)
        .await;

    Mock::given(method("HEAD"))
        .and(path("/rest/v1/kurs_teilnehmer"))
        .respond_with(ResponseTemplate::new(200).insert_header("Content-Range", "0-1/2"))
        .mount(&server)
        .await;

    // The join table must never see an insert for a full course.
    Mock::given(method("POST"))
        .and(path("/rest/v1/kurs_teilnehmer"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let backend = test_backend(&server);
    let err = KursService::new(&backend)
        .add_member(kurs_id, Uuid::new_v4())
        .await
        .unwrap_err();

    match err {
        Error::Validation(message) => assert!(message.contains("Wassergymnastik")),
        other => panic!("expected a validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn course_with_a_free_seat_accepts_a_member() {
    let server = MockServer::start().await;
    let kurs_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/kurse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": kurs_id,
            "name": "Wassergymnastik",
            "max_teilnehmer": 2,
            "aktiv": true
        })))
        .mount(&server)
        .await;

    Mock::given(method("HEAD"))
        .and(path("/rest/v1/kurs_teilnehmer"))
        .respond_with(ResponseTemplate::new(200).insert_header("Content-Range", "0-0/1"))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/kurs_teilnehmer"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let backend = test_backend(&server);
    KursService::new(&backend)
        .add_member(kurs_id, Uuid::new_v4())
        .await
        .unwrap();
}

// --- teilnehmer ---

#[tokio::test]
async fn unknown_teilnehmer_id_reads_as_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/teilnehmer"))
        .respond_with(ResponseTemplate::new(406).set_body_json(json!({
            "code": "PGRST116",
            "message": "JSON object requested, multiple (or no) rows returned"
        })))
        .mount(&server)
        .await;

    let backend = test_backend(&server);
    let found = TeilnehmerService::new(&backend)
        .get(Uuid::new_v4())
        .await
        .unwrap();

    assert!(found.is_none());
}

#[tokio::test]
async fn teilnehmer_search_combines_name_and_email() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/teilnehmer"))
        .and(query_param(
            "or",
            "(vorname.ilike.*mueller*,nachname.ilike.*mueller*,email.ilike.*mueller*)",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": id,
            "vorname": "Petra",
            "nachname": "Mueller",
            "aktiv": true
        }])))
        .mount(&server)
        .await;

    let backend = test_backend(&server);
    let hits = TeilnehmerService::new(&backend)
        .search("mueller")
        .await
        .unwrap();

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].nachname, "Mueller");
}

// --- documents ---

fn stored_dokument() -> Dokument {
    Dokument {
        id: Uuid::new_v4(),
        teilnehmer_id: Uuid::new_v4(),
        dokument_typ: "befund".to_string(),
        dateiname: "befund.pdf".to_string(),
        storage_path: "teilnehmer/x/befund.pdf".to_string(),
        mime_type: Some("application/pdf".to_string()),
        file_size: Some(1024),
        uploaded_at: None,
    }
}

#[tokio::test]
async fn document_delete_reports_an_orphaned_blob() {
    let server = MockServer::start().await;
    let dokument = stored_dokument();

    // Blob removal fails; the metadata row must still be deleted.
    Mock::given(method("DELETE"))
        .and(path("/storage/v1/object/teilnehmer-dokumente"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend storage unavailable"))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/dokumente"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let backend = test_backend(&server);
    let outcome = DocumentService::new(&backend)
        .delete(&dokument)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        DeleteOutcome::RowOnly {
            orphaned_path: dokument.storage_path.clone()
        }
    );
}

#[tokio::test]
async fn document_delete_is_complete_when_both_systems_answer() {
    let server = MockServer::start().await;
    let dokument = stored_dokument();

    Mock::given(method("DELETE"))
        .and(path("/storage/v1/object/teilnehmer-dokumente"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/dokumente"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let backend = test_backend(&server);
    let outcome = DocumentService::new(&backend)
        .delete(&dokument)
        .await
        .unwrap();

    assert_eq!(outcome, DeleteOutcome::Complete);
}
